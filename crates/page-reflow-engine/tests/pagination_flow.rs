use std::time::{Duration, Instant};

use page_reflow_engine::{
    BlockRect, ChangeNotice, HeadlessSurface, LayoutMetrics, Origin, PaginationConfig, Paginator,
    PassOutcome, SchedulerConfig, SkipReason, Surface,
};
use pretty_assertions::assert_eq;

const FRAME: Duration = Duration::from_millis(16);

/// Every source line is one 100px row, no spacing between blocks
fn metrics() -> LayoutMetrics {
    LayoutMetrics {
        width: 10_000.0,
        char_width: 10.0,
        line_height: 100.0,
        heading_scale: 1.0,
        block_spacing: 0.0,
    }
}

/// A paragraph made of `lines` soft-wrapped source lines
fn tall_paragraph(tag: &str, lines: usize) -> String {
    let body: Vec<String> = (0..lines).map(|i| format!("{tag} line {i}")).collect();
    format!("{}\n\n", body.join("\n"))
}

fn document(heights_in_lines: &[usize]) -> String {
    heights_in_lines
        .iter()
        .enumerate()
        .map(|(i, lines)| tall_paragraph(&format!("block{i}"), *lines))
        .collect()
}

fn paginator(page_height: f64, gap_height: f64) -> Paginator {
    Paginator::new(
        PaginationConfig::new(page_height, gap_height, true).unwrap(),
        SchedulerConfig::default(),
    )
}

fn block_top(surface: &HeadlessSurface, index: usize) -> f64 {
    let blocks = surface.top_level_blocks();
    surface.measure_rect(&blocks[index].element).unwrap().top
}

#[test]
fn two_tall_blocks_on_two_pages() {
    let mut surface = HeadlessSurface::new(&document(&[8, 8]), metrics());
    let mut paginator = paginator(1000.0, 30.0);

    let report = paginator.run_pass(&mut surface, Instant::now());

    assert_eq!(report.outcome, PassOutcome::Applied);
    assert_eq!(report.breaks.len(), 1);
    assert_eq!(report.breaks[0].after_block_index, 0);
    assert_eq!(report.breaks[0].push_pixels, 230.0);
    assert_eq!(report.breaks[0].page_number, 1);
    assert_eq!(block_top(&surface, 1), 1030.0);

    // One margin plus one gap bar
    assert_eq!(surface.decorations().len(), 2);
    assert_eq!(report.page_map.page_count(), 2);
}

#[test]
fn scheduled_pass_spans_three_frames() {
    let md = document(&[8, 8]);
    let mut surface = HeadlessSurface::new(&md, metrics());
    let mut paginator = paginator(1000.0, 30.0);
    let start = Instant::now();

    surface.take_notices();
    surface.append_paragraph("tail");
    for notice in surface.take_notices() {
        paginator.notify(notice, start);
    }

    // Structural debounce is 250ms
    assert!(paginator.tick(&mut surface, start + Duration::from_millis(100)).is_none());
    let due = start + Duration::from_millis(250);
    assert!(paginator.tick(&mut surface, due).is_none());
    assert!(paginator.is_measuring());
    assert!(paginator.tick(&mut surface, due + FRAME).is_none());
    let report = paginator.tick(&mut surface, due + FRAME * 2).unwrap();

    assert_eq!(report.outcome, PassOutcome::Applied);
    assert_eq!(report.breaks.len(), 1);
    assert!(!paginator.is_measuring());
    assert_eq!(paginator.next_deadline(), None);
}

#[test]
fn own_decorations_do_not_trigger_another_pass() {
    let mut surface = HeadlessSurface::new(&document(&[8, 8, 8]), metrics());
    let mut paginator = paginator(1000.0, 30.0);
    let start = Instant::now();
    surface.take_notices();
    paginator.force_recalculate(start);

    let mut now = start;
    let mut reports = 0;
    for _ in 0..40 {
        for notice in surface.take_notices() {
            paginator.notify(notice, now);
        }
        if paginator.tick(&mut surface, now).is_some() {
            reports += 1;
        }
        now += FRAME;
    }

    assert_eq!(reports, 1);
    assert_eq!(paginator.next_deadline(), None);
}

#[test]
fn late_reflow_notices_do_not_trigger_another_pass() {
    let mut surface = HeadlessSurface::new(&document(&[8, 8, 8]), metrics());
    let mut paginator = paginator(1000.0, 30.0);
    let start = Instant::now();
    surface.take_notices();
    paginator.force_recalculate(start);

    // The host sits on the notices and forwards them a second later
    let mut held = Vec::new();
    let mut now = start;
    let mut reports = 0;
    for _ in 0..3 {
        if paginator.tick(&mut surface, now).is_some() {
            reports += 1;
        }
        held.extend(surface.take_notices());
        now += FRAME;
    }
    assert_eq!(reports, 1);

    now += Duration::from_secs(1);
    for notice in held {
        assert!(!paginator.notify(notice, now));
    }
    assert_eq!(paginator.next_deadline(), None);
    for _ in 0..40 {
        assert!(paginator.tick(&mut surface, now).is_none());
        now += FRAME;
    }
}

#[test]
fn page_boundary_between_blocks_starts_a_page() {
    // The third block begins exactly where page 1 ends
    let mut surface = HeadlessSurface::new(&document(&[4, 6, 1, 2]), metrics());
    let mut paginator = paginator(1000.0, 30.0);

    let report = paginator.run_pass(&mut surface, Instant::now());

    assert!(report.breaks.is_empty());
    assert_eq!(report.page_map.page_count(), 2);
    assert_eq!(report.page_map.page_of_block(1), Some(1));
    assert_eq!(report.page_map.page_of_block(2), Some(2));
    assert_eq!(report.page_map.page_of_block(3), Some(2));
    assert_eq!(report.page_map.page_at_offset(block_top(&surface, 2)), Some(2));
}

#[test]
fn edits_between_passes_keep_decorations_anchored() {
    let mut surface = HeadlessSurface::new(&document(&[8, 8]), metrics());
    let mut paginator = paginator(1000.0, 30.0);
    paginator.run_pass(&mut surface, Instant::now());

    let first_block = surface.top_level_blocks()[0].node.range.clone();
    assert_eq!(surface.decorations().margin_for(&first_block), 230.0);

    surface.insert(0, "Intro\n\n");

    // Until the next pass the old push follows its block
    let shifted = surface.top_level_blocks()[1].node.range.clone();
    assert_eq!(shifted.start, first_block.start + 7);
    assert_eq!(surface.decorations().margin_for(&shifted), 230.0);

    let report = paginator.run_pass(&mut surface, Instant::now());

    // Intro 0..100, block0 100..900, block1 straddles 1000
    assert_eq!(report.breaks.len(), 1);
    assert_eq!(report.breaks[0].after_block_index, 1);
    assert_eq!(report.breaks[0].push_pixels, 130.0);
    assert_eq!(surface.decorations().margin_for(&shifted), 130.0);
}

#[test]
fn remote_edits_schedule_like_local_ones() {
    let mut surface = HeadlessSurface::new(&document(&[2]), metrics());
    let mut paginator = paginator(1000.0, 30.0);
    let now = Instant::now();
    surface.take_notices();

    surface.edit_with_origin(0..0, "Remote\n\n", Origin::Remote);
    let scheduled: Vec<bool> = surface
        .take_notices()
        .into_iter()
        .map(|notice| paginator.notify(notice, now))
        .collect();

    assert_eq!(scheduled.first(), Some(&true));
    assert!(paginator.next_deadline().is_some());
}

#[test]
fn pagination_never_touches_document_text() {
    let md = "# Report\n\nIntro paragraph.\n\n- one\n- two\n\n```\nlet x = 1;\n```\n\n> quoted\n";
    let mut surface = HeadlessSurface::new(md, LayoutMetrics::terminal(20));
    let config = PaginationConfig::new(96.0, 24.0, true)
        .unwrap()
        .with_header_template("Page {page}");
    let mut paginator = Paginator::new(config, SchedulerConfig::default());

    let report = paginator.run_pass(&mut surface, Instant::now());

    assert!(report.applied_count() > 0);
    assert_eq!(surface.text(), md);
}

#[test]
fn disabling_strips_every_decoration() {
    let mut surface = HeadlessSurface::new(&document(&[8, 8]), metrics());
    let mut paginator = paginator(1000.0, 30.0);
    paginator.run_pass(&mut surface, Instant::now());
    assert!(!surface.decorations().is_empty());

    let disabled = PaginationConfig {
        enabled: false,
        ..paginator.config().clone()
    };
    paginator
        .configure(disabled, &mut surface, Instant::now())
        .unwrap();

    assert!(surface.decorations().is_empty());
    assert_eq!(block_top(&surface, 1), 800.0);
    assert_eq!(
        paginator.last_report().map(|report| report.outcome.clone()),
        Some(PassOutcome::Skipped(SkipReason::Disabled))
    );
    // Further changes are ignored while disabled
    assert!(!paginator.notify(ChangeNotice::structural(Origin::User), Instant::now()));
}

#[test]
fn narrowing_the_surface_repaginates() {
    let md = "aaaa bbbb cccc dddd\n\neeee ffff gggg hhhh\n";
    let metrics = LayoutMetrics {
        width: 200.0,
        char_width: 10.0,
        line_height: 100.0,
        heading_scale: 1.0,
        block_spacing: 0.0,
    };
    let mut surface = HeadlessSurface::new(md, metrics);
    let mut paginator = paginator(250.0, 10.0);

    let wide = paginator.run_pass(&mut surface, Instant::now());
    assert!(wide.breaks.is_empty());

    // 10 columns: each block wraps onto two lines
    surface.set_width(100.0);
    assert_eq!(surface.take_notices().last(), Some(&ChangeNotice::size()));
    let narrow = paginator.run_pass(&mut surface, Instant::now());

    assert_eq!(narrow.breaks.len(), 1);
    assert_eq!(narrow.breaks[0].push_pixels, 60.0);
    let blocks = surface.top_level_blocks();
    assert_eq!(
        surface.measure_rect(&blocks[1].element),
        Some(BlockRect::new(260.0, 460.0))
    );
}

#[test]
fn page_layout_summary() {
    let mut surface = HeadlessSurface::new(&document(&[3, 4, 5, 2, 6]), metrics());
    let mut paginator = paginator(1000.0, 50.0);
    let report = paginator.run_pass(&mut surface, Instant::now());

    let summary: Vec<String> = report
        .page_map
        .pages
        .iter()
        .map(|page| format!("page {}: block {} at {}", page.number, page.first_block, page.top))
        .collect();

    insta::assert_snapshot!(summary.join("\n"), @r"
    page 1: block 0 at 0
    page 2: block 2 at 1050
    ");
}
