//! Contact sheet output as one JPEG per page.
//!
//! Headers and captions are rasterized with an embedded DejaVu Sans
//! Condensed, so the grid and text match the PDF output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontRef, GlyphId, PxScale, ScaleFont};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use photokit_sheet::{DrawInstruction, PageRenderer, RenderError};

const DEFAULT_DPI: f64 = 150.0;
const DEFAULT_QUALITY: u8 = 90;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const PLACEHOLDER_FILL: Rgb<u8> = Rgb([235, 235, 235]);
const PLACEHOLDER_EDGE: Rgb<u8> = Rgb([140, 140, 140]);
const TEXT_COLOR: Rgb<u8> = Rgb([30, 30, 30]);

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansCondensed.ttf");

pub struct JpegPageRenderer {
    dir: PathBuf,
    stem: String,
    scale: f64,
    quality: u8,
    width_px: u32,
    height_px: u32,
    canvas: Option<(usize, RgbImage)>,
    written: Vec<PathBuf>,
}

impl JpegPageRenderer {
    /// Pages are written as `<dir>/<stem>-001.jpg`, `-002`, ...
    pub fn new(dir: &Path, stem: &str, page_width: f64, page_height: f64) -> Self {
        let mut renderer = Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            scale: 1.0,
            quality: DEFAULT_QUALITY,
            width_px: 1,
            height_px: 1,
            canvas: None,
            written: Vec::new(),
        };
        renderer.set_dpi(DEFAULT_DPI, page_width, page_height);
        renderer
    }

    pub fn with_dpi(mut self, dpi: f64, page_width: f64, page_height: f64) -> Self {
        self.set_dpi(dpi, page_width, page_height);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    fn set_dpi(&mut self, dpi: f64, page_width: f64, page_height: f64) {
        let dpi = if dpi.is_finite() && dpi > 0.0 { dpi } else { DEFAULT_DPI };
        self.scale = dpi / 72.0;
        self.width_px = ((page_width * self.scale).round() as u32).max(1);
        self.height_px = ((page_height * self.scale).round() as u32).max(1);
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn px(&self, points: f64) -> i64 {
        (points * self.scale).round() as i64
    }

    fn canvas(&mut self) -> Result<&mut RgbImage, RenderError> {
        self.canvas
            .as_mut()
            .map(|(_, img)| img)
            .ok_or_else(|| RenderError::Output("drawing outside of a page".to_string()))
    }
}

impl PageRenderer for JpegPageRenderer {
    fn begin_page(&mut self, index: usize) -> Result<(), RenderError> {
        if self.canvas.is_some() {
            return Err(RenderError::Output(format!("page {} begun before the previous one finished", index)));
        }
        self.canvas = Some((index, RgbImage::from_pixel(self.width_px, self.height_px, BACKGROUND)));
        Ok(())
    }

    fn draw_image(&mut self, bytes: &[u8], at: &DrawInstruction) -> Result<(), RenderError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| RenderError::image("", e.to_string()))?;
        let w = (self.px(at.scaled_width).max(1)) as u32;
        let h = (self.px(at.scaled_height).max(1)) as u32;
        let x = self.px(at.offset_x);
        let y = self.px(at.offset_y);
        let tile = decoded.resize_exact(w, h, FilterType::Triangle).to_rgb8();
        imageops::overlay(self.canvas()?, &tile, x, y);
        Ok(())
    }

    fn draw_placeholder(&mut self, at: &DrawInstruction) -> Result<(), RenderError> {
        let x0 = self.px(at.offset_x).max(0) as u32;
        let y0 = self.px(at.offset_y).max(0) as u32;
        let w = self.px(at.scaled_width).max(1) as u32;
        let h = self.px(at.scaled_height).max(1) as u32;
        let canvas = self.canvas()?;
        let x1 = (x0 + w).min(canvas.width());
        let y1 = (y0 + h).min(canvas.height());
        for y in y0..y1 {
            for x in x0..x1 {
                let edge = x == x0 || y == y0 || x + 1 == x1 || y + 1 == y1;
                canvas.put_pixel(x, y, if edge { PLACEHOLDER_EDGE } else { PLACEHOLDER_FILL });
            }
        }
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f64, y_top: f64, size: f64) -> Result<(), RenderError> {
        let font = FontRef::try_from_slice(FONT_DATA)
            .map_err(|e| RenderError::Output(format!("embedded font: {}", e)))?;
        let scale = PxScale::from((size * self.scale) as f32);
        let origin_x = (x * self.scale) as f32;
        let origin_y = (y_top * self.scale) as f32;
        let canvas = self.canvas()?;
        draw_line(canvas, &font, scale, origin_x, origin_y, text);
        Ok(())
    }

    fn finish_page(&mut self) -> Result<(), RenderError> {
        let (index, canvas) = self
            .canvas
            .take()
            .ok_or_else(|| RenderError::Output("finish without an open page".to_string()))?;
        let path = self.dir.join(format!("{}-{:03}.jpg", self.stem, index + 1));
        let file = File::create(&path)
            .map_err(|e| RenderError::Output(format!("{}: {}", path.display(), e)))?;
        let mut out = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&canvas)
            .map_err(|e| RenderError::Output(format!("{}: {}", path.display(), e)))?;
        out.flush()
            .map_err(|e| RenderError::Output(format!("{}: {}", path.display(), e)))?;
        log::debug!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Lay `text` out on one line from the top-left corner (`x`, `y_top`) and
/// blend glyph coverage into `canvas`. Pixels off the canvas are dropped.
fn draw_line(canvas: &mut RgbImage, font: &FontRef<'_>, scale: PxScale, x: f32, y_top: f32, text: &str) {
    let scaled = font.as_scaled(scale);
    let mut caret = point(x, y_top + scaled.ascent());
    let mut previous: Option<GlyphId> = None;
    let (width, height) = canvas.dimensions();

    for c in text.chars() {
        let id = font.glyph_id(c);
        if let Some(prev) = previous {
            caret.x += scaled.kern(prev, id);
        }
        previous = Some(id);
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);

        let Some(outline) = font.outline_glyph(glyph) else { continue };
        let bounds = outline.px_bounds();
        outline.draw(|gx, gy, coverage| {
            let px = bounds.min.x as i64 + gx as i64;
            let py = bounds.min.y as i64 + gy as i64;
            if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                return;
            }
            let pixel = canvas.get_pixel_mut(px as u32, py as u32);
            let alpha = coverage.clamp(0.0, 1.0);
            for (channel, ink) in pixel.0.iter_mut().zip(TEXT_COLOR.0) {
                *channel = (*channel as f32 * (1.0 - alpha) + ink as f32 * alpha).round() as u8;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{probe_image, tests::solid_jpeg};
    use photokit_sheet::{pack, render, ImageSource, Layout};
    use tempfile::TempDir;

    #[test]
    fn numbered_page_files() {
        let layout = Layout { columns: 1, rows: 2, ..Layout::default() };
        let images: Vec<_> = (0..3)
            .map(|i| ImageSource::new(format!("{i}.jpg"), 40.0, 30.0))
            .collect();
        let plan = pack(&images, &layout).unwrap();

        let dir = TempDir::new().unwrap();
        let jpeg = solid_jpeg(40, 30, [0, 0, 0]);
        let mut bytes = |_: &str| -> Result<Vec<u8>, RenderError> { Ok(jpeg.clone()) };
        let mut pages = JpegPageRenderer::new(dir.path(), "trip", layout.page_width, layout.page_height)
            .with_dpi(72.0, layout.page_width, layout.page_height);
        render(&plan, &layout, "", &mut bytes, &mut pages).unwrap();

        let names: Vec<_> = pages
            .written()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["trip-001.jpg", "trip-002.jpg"]);

        let info = probe_image(&std::fs::read(&pages.written()[0]).unwrap()).unwrap();
        assert!(info.is_jpeg());
        assert_eq!(info.width, layout.page_width.round() as u32);
    }

    fn darkest(img: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> u8 {
        let mut min = u8::MAX;
        for y in y0..y1.min(img.height()) {
            for x in x0..x1.min(img.width()) {
                min = min.min(*img.get_pixel(x, y).0.iter().min().unwrap());
            }
        }
        min
    }

    #[test]
    fn text_marks_the_canvas() {
        let dir = TempDir::new().unwrap();
        let mut pages = JpegPageRenderer::new(dir.path(), "p", 200.0, 100.0).with_dpi(144.0, 200.0, 100.0);
        pages.begin_page(0).unwrap();
        pages.draw_text("IMG_0001.JPG", 10.0, 10.0, 12.0).unwrap();
        let (_, canvas) = pages.canvas.as_ref().unwrap();
        // 12pt at 2 px/pt from (20, 20): ink lands within the line box.
        assert!(darkest(canvas, 20, 20, 400, 50) < 128);
        assert_eq!(darkest(canvas, 0, 60, 400, 200), 255);
    }

    #[test]
    fn text_off_canvas_is_clipped() {
        let dir = TempDir::new().unwrap();
        let mut pages = JpegPageRenderer::new(dir.path(), "p", 50.0, 20.0).with_dpi(72.0, 50.0, 20.0);
        pages.begin_page(0).unwrap();
        pages.draw_text("a very long caption that runs past the edge", 40.0, 15.0, 12.0).unwrap();
        pages.draw_text("left", -30.0, -5.0, 12.0).unwrap();
        pages.finish_page().unwrap();
    }

    #[test]
    fn caption_band_carries_filename() {
        let layout = Layout { columns: 2, rows: 2, ..Layout::default() };
        let plan = pack(&[ImageSource::new("IMG_0042.jpg", 400.0, 300.0)], &layout).unwrap();
        let at = plan.pages[0].placements[0].instruction;

        let dir = TempDir::new().unwrap();
        let white = solid_jpeg(400, 300, [255, 255, 255]);
        let mut bytes = |_: &str| -> Result<Vec<u8>, RenderError> { Ok(white.clone()) };
        let dpi = 150.0;
        let mut pages = JpegPageRenderer::new(dir.path(), "trip", layout.page_width, layout.page_height)
            .with_dpi(dpi, layout.page_width, layout.page_height);
        render(&plan, &layout, "India", &mut bytes, &mut pages).unwrap();

        let page = image::open(&pages.written()[0]).unwrap().to_rgb8();
        let px = |points: f64| (points * dpi / 72.0).round() as u32;
        let caption = darkest(
            &page,
            px(at.caption_x),
            px(at.caption_y),
            px(at.caption_x + at.cell_width),
            px(at.caption_y + layout.caption_height),
        );
        assert!(caption < 128, "caption band is blank (darkest {caption})");
        let header = darkest(&page, px(layout.margin), px(layout.margin), px(layout.page_width / 2.0), px(layout.margin + layout.header_height));
        assert!(header < 128, "header band is blank (darkest {header})");
    }

    #[test]
    fn placeholder_stays_inside_canvas() {
        let dir = TempDir::new().unwrap();
        let mut pages = JpegPageRenderer::new(dir.path(), "p", 100.0, 100.0).with_dpi(72.0, 100.0, 100.0);
        pages.begin_page(0).unwrap();
        let at = DrawInstruction {
            slot: photokit_sheet::GridSlot { page: 0, row: 0, column: 0 },
            scaled_width: 500.0,
            scaled_height: 500.0,
            offset_x: 50.0,
            offset_y: 50.0,
            caption_x: 0.0,
            caption_y: 0.0,
            cell_width: 100.0,
        };
        pages.draw_placeholder(&at).unwrap();
        pages.finish_page().unwrap();
        assert_eq!(pages.written().len(), 1);
    }
}
