//! Render driver: walks a [`SheetPlan`] and drives a [`PageRenderer`].
//!
//! The driver owns the page lifecycle. Every planned page is begun and
//! finished exactly once, whatever happens to the images on it. An image
//! that cannot be read or drawn becomes a placeholder in its own slot, so
//! the layout never shifts.

use serde::Serialize;

use crate::error::RenderError;
use crate::layout::Layout;
use crate::model::{DrawInstruction, PagePlan, SheetPlan, SheetWarning};

/// Fetches the encoded bytes of an image by key.
pub trait ImageBytes {
    fn read(&mut self, key: &str) -> Result<Vec<u8>, RenderError>;
}

impl<F> ImageBytes for F
where
    F: FnMut(&str) -> Result<Vec<u8>, RenderError>,
{
    fn read(&mut self, key: &str) -> Result<Vec<u8>, RenderError> {
        self(key)
    }
}

/// A page-oriented output surface. Coordinates are points from the
/// top-left of the page; implementations flip axes as their canvas needs.
///
/// `draw_image` may fail with [`RenderError::Image`], which the driver
/// recovers from. Any other error aborts the run.
pub trait PageRenderer {
    fn begin_page(&mut self, index: usize) -> Result<(), RenderError>;
    fn draw_image(&mut self, bytes: &[u8], at: &DrawInstruction) -> Result<(), RenderError>;
    fn draw_placeholder(&mut self, at: &DrawInstruction) -> Result<(), RenderError>;
    /// `y_top` is the top of the text line.
    fn draw_text(&mut self, text: &str, x: f64, y_top: f64, size: f64) -> Result<(), RenderError>;
    fn finish_page(&mut self) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub pages: usize,
    pub images: usize,
    pub placeholders: usize,
    pub warnings: Vec<SheetWarning>,
}

/// Average Helvetica advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f64 = 0.5;
const ELLIPSIS: &str = "...";

pub fn render(
    plan: &SheetPlan,
    layout: &Layout,
    title: &str,
    bytes: &mut dyn ImageBytes,
    renderer: &mut dyn PageRenderer,
) -> Result<RenderReport, RenderError> {
    let mut report = RenderReport::default();
    let total = plan.pages.len();
    let header_size = (layout.header_height * 0.6).min(12.0);
    let caption_size = (layout.caption_height * 0.75).min(9.0);

    for page in &plan.pages {
        renderer.begin_page(page.index)?;
        let outcome = draw_page(page, total, layout, title, header_size, caption_size, bytes, renderer, &mut report);
        // Finish even when a fatal error cut the page short.
        let finished = renderer.finish_page();
        outcome?;
        finished?;
        report.pages += 1;
    }

    log::info!(
        "rendered {} pages, {} images, {} placeholders",
        report.pages,
        report.images,
        report.placeholders
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
fn draw_page(
    page: &PagePlan,
    total: usize,
    layout: &Layout,
    title: &str,
    header_size: f64,
    caption_size: f64,
    bytes: &mut dyn ImageBytes,
    renderer: &mut dyn PageRenderer,
    report: &mut RenderReport,
) -> Result<(), RenderError> {
    if header_size > 0.0 {
        let header = header_text(title, page, total);
        let y = layout.margin + (layout.header_height - header_size) / 2.0;
        renderer.draw_text(&header, layout.margin, y, header_size)?;
    }

    for placement in &page.placements {
        let at = &placement.instruction;
        let drawn = bytes
            .read(&placement.key)
            .and_then(|data| renderer.draw_image(&data, at));

        match drawn {
            Ok(()) => report.images += 1,
            Err(RenderError::Image { message, .. }) => {
                log::warn!("cannot draw {}: {}", placement.key, message);
                report
                    .warnings
                    .push(SheetWarning::render_failure(&placement.key, message));
                renderer.draw_placeholder(at)?;
                report.placeholders += 1;
            }
            Err(fatal) => return Err(fatal),
        }

        if caption_size > 0.0 {
            let caption = fit_caption(&placement.caption, at.cell_width, caption_size);
            let y = at.caption_y + (layout.caption_height - caption_size) / 2.0;
            renderer.draw_text(&caption, at.caption_x + 2.0, y, caption_size)?;
        }
    }
    Ok(())
}

fn header_text(title: &str, page: &PagePlan, total: usize) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    if let Some(group) = &page.group {
        parts.push(group.clone());
    }
    parts.push(format!("page {} of {}", page.index + 1, total));
    parts.join(" - ")
}

/// Truncate `text` so it fits `width` points at `size`, marking the cut.
fn fit_caption(text: &str, width: f64, size: f64) -> String {
    let glyph = size * AVG_GLYPH_WIDTH;
    let max_chars = ((width - 4.0) / glyph).floor().max(0.0) as usize;
    let len = text.chars().count();
    if len <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    out
}
