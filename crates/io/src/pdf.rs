//! PDF contact sheet output via lopdf.
//!
//! Images are decoded, downsampled to the resolution of their cell and
//! embedded as DCTDecode (JPEG) XObjects. Text uses the built-in
//! Helvetica Type1 font with WinAnsi encoding, so no font is embedded.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use photokit_sheet::{DrawInstruction, PageRenderer, RenderError};

/// Pixels per point for embedded images (144 dpi).
const DEFAULT_PIXELS_PER_POINT: f64 = 2.0;
const DEFAULT_QUALITY: u8 = 85;
const FONT_NAME: &str = "F1";

pub struct PdfRenderer {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_width: f64,
    page_height: f64,
    pixels_per_point: f64,
    quality: u8,
    page_ids: Vec<ObjectId>,
    current: Option<PageState>,
    image_counter: usize,
}

struct PageState {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Latin-1 bytes for the WinAnsi Helvetica font. Other characters print as '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 0x100 && !c.is_control() { c as u8 } else { b'?' })
        .collect()
}

impl PdfRenderer {
    pub fn new(page_width: f64, page_height: f64) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            doc,
            pages_id,
            font_id,
            page_width,
            page_height,
            pixels_per_point: DEFAULT_PIXELS_PER_POINT,
            quality: DEFAULT_QUALITY,
            page_ids: Vec::new(),
            current: None,
            image_counter: 0,
        }
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn with_pixels_per_point(mut self, ppp: f64) -> Self {
        if ppp.is_finite() && ppp > 0.0 {
            self.pixels_per_point = ppp;
        }
        self
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page(&mut self) -> Result<&mut PageState, RenderError> {
        self.current
            .as_mut()
            .ok_or_else(|| RenderError::Output("drawing outside of a page".to_string()))
    }

    /// PDF y for the bottom edge of a box whose top is `y_top` (top-left origin).
    fn flip(&self, y_top: f64, height: f64) -> f64 {
        self.page_height - y_top - height
    }

    /// Assemble the document tree and write it to `path`.
    pub fn save(mut self, path: &Path) -> Result<usize, RenderError> {
        if self.current.is_some() {
            return Err(RenderError::Output("last page was never finished".to_string()));
        }
        let pages = self.page_ids.len();
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "MediaBox" => vec![0.into(), 0.into(), real(self.page_width), real(self.page_height)],
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| RenderError::Output(format!("{}: {}", path.display(), e)))?;
        log::info!("wrote {} pages to {}", pages, path.display());
        Ok(pages)
    }
}

impl PageRenderer for PdfRenderer {
    fn begin_page(&mut self, index: usize) -> Result<(), RenderError> {
        if self.current.is_some() {
            return Err(RenderError::Output(format!("page {} begun before the previous one finished", index)));
        }
        self.current = Some(PageState {
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    fn draw_image(&mut self, bytes: &[u8], at: &DrawInstruction) -> Result<(), RenderError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RenderError::image("", e.to_string()))?;

        let target_w = ((at.scaled_width * self.pixels_per_point).round() as u32).clamp(1, decoded.width().max(1));
        let target_h = ((at.scaled_height * self.pixels_per_point).round() as u32).clamp(1, decoded.height().max(1));
        let rgb = decoded.resize_exact(target_w, target_h, FilterType::Triangle).to_rgb8();

        let mut jpeg = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&rgb)
            .map_err(|e| RenderError::image("", e.to_string()))?;

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => rgb.width() as i64,
                "Height" => rgb.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.into_inner(),
        )
        .with_compression(false);
        let image_id = self.doc.add_object(stream);

        self.image_counter += 1;
        let name = format!("Im{}", self.image_counter);
        let y = self.flip(at.offset_y, at.scaled_height);
        let page = self.page()?;
        page.xobjects.set(name.as_bytes(), image_id);
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(at.scaled_width), 0.into(), 0.into(), real(at.scaled_height), real(at.offset_x), real(y)],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_placeholder(&mut self, at: &DrawInstruction) -> Result<(), RenderError> {
        let y = self.flip(at.offset_y, at.scaled_height);
        let page = self.page()?;
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("g", vec![real(0.92)]),
            Operation::new("G", vec![real(0.55)]),
            Operation::new("w", vec![real(0.75)]),
            Operation::new(
                "re",
                vec![real(at.offset_x), real(y), real(at.scaled_width), real(at.scaled_height)],
            ),
            Operation::new("B", vec![]),
            // cross
            Operation::new("m", vec![real(at.offset_x), real(y)]),
            Operation::new("l", vec![real(at.offset_x + at.scaled_width), real(y + at.scaled_height)]),
            Operation::new("m", vec![real(at.offset_x), real(y + at.scaled_height)]),
            Operation::new("l", vec![real(at.offset_x + at.scaled_width), real(y)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: f64, y_top: f64, size: f64) -> Result<(), RenderError> {
        // Baseline sits roughly one cap height below the top of the line.
        let baseline = self.flip(y_top, size * 0.8);
        let page = self.page()?;
        page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_NAME.as_bytes().to_vec()), real(size)]),
            Operation::new("Td", vec![real(x), real(baseline)]),
            Operation::new("Tj", vec![Object::String(win_ansi(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    fn finish_page(&mut self) -> Result<(), RenderError> {
        let state = self
            .current
            .take()
            .ok_or_else(|| RenderError::Output("finish without an open page".to_string()))?;

        let content = Content { operations: state.operations };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Output(format!("cannot encode page content: {}", e)))?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, encoded));

        let resources = dictionary! {
            "Font" => dictionary! { FONT_NAME => self.font_id },
            "XObject" => state.xobjects,
        };
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }
}
