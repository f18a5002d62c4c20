use crate::error::LayoutError;
use crate::layout::Layout;
use crate::model::{ImageSource, PagePlan, Placement, SheetPlan, SheetWarning};

/// Pack images into grid pages.
///
/// Sources are placed in key order, row-major, page after page. A source
/// with unusable natural dimensions is skipped with a warning and does not
/// consume a slot. Only pages holding at least one image are emitted.
pub fn pack(images: &[ImageSource], layout: &Layout) -> Result<SheetPlan, LayoutError> {
    let grid = layout.grid()?;
    let per_page = grid.slots_per_page();

    let mut ordered: Vec<&ImageSource> = images.iter().collect();
    ordered.sort_by(|a, b| a.key.cmp(&b.key));

    let mut plan = SheetPlan::default();
    let mut current: Option<PagePlan> = None;

    for source in ordered {
        if !source.has_usable_size() {
            log::warn!(
                "skipping {}: unusable dimensions {}x{}",
                source.key,
                source.natural_width,
                source.natural_height
            );
            plan.warnings.push(SheetWarning::unreadable(
                &source.key,
                format!(
                    "unusable dimensions {}x{}",
                    source.natural_width, source.natural_height
                ),
            ));
            continue;
        }

        let needs_new_page = match &current {
            None => true,
            Some(page) => {
                page.placements.len() >= per_page
                    || (layout.break_on_group && page.group != source.group)
            }
        };
        if needs_new_page {
            if let Some(done) = current.take() {
                plan.pages.push(done);
            }
            current = Some(PagePlan {
                index: plan.pages.len(),
                group: source.group.clone(),
                placements: Vec::new(),
            });
        }

        // Always Some here: a page was opened above if none was current.
        let Some(page) = current.as_mut() else { continue };
        let slot = grid.slot(page.index, page.placements.len());
        page.placements.push(Placement {
            key: source.key.clone(),
            caption: source.caption().to_string(),
            instruction: grid.place(slot, source.natural_width, source.natural_height),
        });
    }

    if let Some(last) = current {
        plan.pages.push(last);
    }

    log::debug!(
        "packed {} images onto {} pages ({} skipped)",
        plan.image_count(),
        plan.pages.len(),
        plan.warnings.len()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SheetWarningKind;

    fn numbered(n: usize) -> Vec<ImageSource> {
        (0..n)
            .map(|i| ImageSource::new(format!("img_{i:03}.jpg"), 4000.0, 3000.0))
            .collect()
    }

    fn grouped(entries: &[(&str, usize)]) -> Vec<ImageSource> {
        entries.iter()
            .flat_map(|(group, count)| {
                (0..*count).map(move |i| {
                    ImageSource::new(format!("{group}/img_{i:03}.jpg"), 3000.0, 2000.0).in_group(*group)
                })
            })
            .collect()
    }

    fn page_sizes(plan: &SheetPlan) -> Vec<usize> {
        plan.pages.iter().map(|p| p.placements.len()).collect()
    }

    #[test]
    fn empty_input_no_pages() {
        let plan = pack(&[], &Layout::default()).unwrap();
        assert!(plan.pages.is_empty());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn twenty_four_fill_one_page() {
        let plan = pack(&numbered(24), &Layout::default()).unwrap();
        assert_eq!(page_sizes(&plan), vec![24]);
        let last = &plan.pages[0].placements[23].instruction.slot;
        assert_eq!((last.row, last.column), (5, 3));
    }

    #[test]
    fn twenty_fifth_opens_second_page() {
        let plan = pack(&numbered(25), &Layout::default()).unwrap();
        assert_eq!(page_sizes(&plan), vec![24, 1]);
        let slot = plan.pages[1].placements[0].instruction.slot;
        assert_eq!((slot.page, slot.row, slot.column), (1, 0, 0));
    }

    #[test]
    fn sorted_by_key() {
        let mut images = numbered(5);
        images.reverse();
        let plan = pack(&images, &Layout::default()).unwrap();
        let keys: Vec<_> = plan.pages[0].placements.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, ["img_000.jpg", "img_001.jpg", "img_002.jpg", "img_003.jpg", "img_004.jpg"]);
    }

    #[test]
    fn group_change_mid_page_breaks() {
        let plan = pack(&grouped(&[("a", 5), ("b", 3)]), &Layout::default()).unwrap();
        assert_eq!(page_sizes(&plan), vec![5, 3]);
        assert_eq!(plan.pages[0].group.as_deref(), Some("a"));
        assert_eq!(plan.pages[1].group.as_deref(), Some("b"));
        assert_eq!(plan.pages[1].placements[0].instruction.slot.row, 0);
    }

    #[test]
    fn group_change_after_full_page_no_blank_page() {
        let plan = pack(&grouped(&[("a", 24), ("b", 2)]), &Layout::default()).unwrap();
        assert_eq!(page_sizes(&plan), vec![24, 2]);
    }

    #[test]
    fn group_change_ignored_when_disabled() {
        let layout = Layout { break_on_group: false, ..Layout::default() };
        let plan = pack(&grouped(&[("a", 5), ("b", 3)]), &layout).unwrap();
        assert_eq!(page_sizes(&plan), vec![8]);
        let slot = plan.pages[0].placements[5].instruction.slot;
        assert_eq!((slot.row, slot.column), (1, 1));
    }

    #[test]
    fn first_image_never_forces_break() {
        let plan = pack(&grouped(&[("a", 1)]), &Layout::default()).unwrap();
        assert_eq!(plan.pages.len(), 1);
        assert_eq!(plan.pages[0].index, 0);
    }

    #[test]
    fn degenerate_source_skipped_without_slot() {
        let mut images = numbered(3);
        images.push(ImageSource::new("img_001b.jpg", 0.0, 100.0));
        let plan = pack(&images, &Layout::default()).unwrap();
        assert_eq!(page_sizes(&plan), vec![3]);
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].kind, SheetWarningKind::ItemUnreadable);
        assert_eq!(plan.warnings[0].key, "img_001b.jpg");
        let slot = plan.pages[0].placements[2].instruction.slot;
        assert_eq!(slot.column, 2);
    }

    #[test]
    fn only_degenerate_sources_no_pages() {
        let images = vec![ImageSource::new("x.jpg", f64::NAN, 1.0)];
        let plan = pack(&images, &Layout::default()).unwrap();
        assert!(plan.pages.is_empty());
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn invalid_layout_is_fatal() {
        let layout = Layout { rows: 0, ..Layout::default() };
        assert!(pack(&numbered(3), &layout).is_err());
    }

    #[test]
    fn oversized_grid_rejected_before_packing() {
        let layout = Layout {
            columns: 65536,
            rows: 65536,
            margin: 0.0,
            header_height: 0.0,
            caption_height: 0.0,
            ..Layout::default()
        };
        assert!(matches!(pack(&numbered(1), &layout), Err(LayoutError::TooManySlots { .. })));
    }
}
