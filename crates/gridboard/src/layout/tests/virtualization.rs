//! Threshold and viewport-driven activation.

use super::{config, fixture, fixture_with, seed, Fixture};
use crate::surface::{ContentState, Viewport};

/// `count` full-width widgets stacked two rows apart (180px per widget).
fn stacked(f: &Fixture, count: u32) {
    for i in 0..count {
        seed(f, &format!("w-{i:02}"), "kpi", 0, i * 2, 12, 2);
    }
}

#[test]
fn test_below_threshold_everything_is_active() {
    let mut f = fixture();
    for (i, y) in [0u32, 10, 20, 30, 40].into_iter().enumerate() {
        seed(&f, &format!("w-{i}"), "kpi", 0, y, 3, 2);
    }
    f.layout.init();
    f.run();

    assert!(!f.layout.is_virtualized());
    assert_eq!(f.layout.active_count(), 5);
    // offscreen widgets are active but not visible
    assert!(f.layout.is_active("w-4"));
    assert!(!f.layout.is_visible("w-4"));
    assert_eq!(f.logged("visible:w-4"), 0);
}

#[test]
fn test_above_threshold_only_visible_widgets_activate() {
    let mut f = fixture();
    stacked(&f, 25);
    f.layout.init();
    f.run();

    assert!(f.layout.is_virtualized());
    assert_eq!(f.layout.mounted_count(), 25);
    // viewport 0..900 padded by 200: tops up to 1100px, widgets 0..=6
    assert_eq!(f.layout.active_count(), 7);
    assert!(f.layout.is_active("w-06"));
    assert!(!f.layout.is_active("w-07"));
    assert_eq!(f.content("w-07"), Some(ContentState::Loading));
}

#[test]
fn test_scrolling_swaps_active_widgets() {
    let mut f = fixture();
    stacked(&f, 25);
    f.layout.init();
    f.run();

    f.layout.handle_viewport_change(Viewport::new(3000.0, 900.0));
    f.run();

    // padded window 2800..4100 covers widgets 15..=22
    assert_eq!(f.layout.active_count(), 8);
    assert!(!f.layout.is_active("w-00"));
    assert!(!f.layout.is_active("w-14"));
    assert!(f.layout.is_active("w-15"));
    assert!(f.layout.is_active("w-22"));
    assert_eq!(f.logged("hidden:w-00"), 1);
    assert_eq!(f.logged("destroy:w-00"), 1);
    assert_eq!(f.content("w-00"), Some(ContentState::Loading));
    assert_eq!(
        f.state.widget_state("w-00").map(|w| w.visible),
        Some(false)
    );

    f.layout.handle_viewport_change(Viewport::new(0.0, 900.0));
    f.run();
    assert!(f.layout.is_active("w-00"));
    assert_eq!(f.logged("mount:w-00"), 2);
}

#[test]
fn test_scroll_out_before_load_drops_activation() {
    let mut f = fixture();
    stacked(&f, 25);
    f.layout.init();
    // nothing has loaded yet
    f.layout.handle_viewport_change(Viewport::new(3000.0, 900.0));
    f.run();

    assert_eq!(f.logged("mount:w-00"), 0);
    assert!(!f.layout.is_active("w-00"));
    assert_eq!(f.layout.active_count(), 8);
}

#[test]
fn test_removal_below_threshold_disengages_virtualization() {
    let mut f = fixture();
    stacked(&f, 21);
    f.layout.init();
    f.run();
    assert!(f.layout.is_virtualized());
    assert!(!f.layout.is_active("w-20"));

    f.layout.remove_widget("w-00").expect("remove");
    f.run();
    assert!(!f.layout.is_virtualized());
    assert_eq!(f.layout.active_count(), 20);
}

#[test]
fn test_failed_widget_retries_on_reentry() {
    let mut cfg = config();
    cfg.performance.virtualization_threshold = 0;
    let mut f = fixture_with(cfg, 1190.0, 900.0);
    seed(&f, "broken-1", "broken", 0, 0, 2, 2);
    f.layout.init();
    f.run();
    assert_eq!(f.broken_attempts.get(), 1);

    f.layout.handle_viewport_change(Viewport::new(5000.0, 900.0));
    f.run();
    assert_eq!(f.broken_attempts.get(), 1);

    f.layout.handle_viewport_change(Viewport::new(0.0, 900.0));
    f.run();
    assert_eq!(f.broken_attempts.get(), 2);
    assert!(matches!(f.content("broken-1"), Some(ContentState::Error(_))));
}

#[test]
fn test_offscreen_types_are_unloaded_while_virtualized() {
    let mut f = fixture();
    f.registry
        .register("far", super::probe_descriptor(&f.log, &f.constructed));
    stacked(&f, 25);
    // 60 rows down is 5400px, well past the last kpi widget
    seed(&f, "far-1", "far", 0, 60, 3, 2);
    f.layout.init();
    f.run();
    assert!(f.registry.is_loaded("kpi"));
    assert!(!f.registry.is_loaded("far"));

    f.layout.handle_viewport_change(Viewport::new(5400.0, 900.0));
    f.run();
    assert!(f.layout.is_active("far-1"));
    assert_eq!(f.layout.active_count(), 1);
    assert!(!f.registry.is_loaded("kpi"));
    assert!(f.registry.is_loaded("far"));

    f.layout.handle_viewport_change(Viewport::new(0.0, 900.0));
    f.run();
    assert!(f.layout.is_active("w-00"));
    assert!(f.registry.is_loaded("kpi"));
    assert!(!f.registry.is_loaded("far"));
}

#[test]
fn test_partial_scroll_keeps_shared_type_loaded() {
    let mut f = fixture();
    stacked(&f, 25);
    f.layout.init();
    f.run();

    f.layout.handle_viewport_change(Viewport::new(3000.0, 900.0));
    f.run();
    assert!(!f.layout.is_active("w-00"));
    assert!(f.registry.is_loaded("kpi"));
}
