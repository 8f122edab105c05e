//! Committed and ephemeral layer tests.

use super::{add, fixture};
use crate::error::StateError;
use crate::grid::{GridPosition, GridSize};
use crate::state::{Notify, WidgetConfig, WidgetPatch};
use serde_json::json;

#[test]
fn test_add_widget_applies_defaults() {
    let f = fixture();
    let state = f
        .state
        .add_widget("kpi-1", WidgetConfig::new("kpi"))
        .expect("add");
    assert_eq!(state.position(), GridPosition::ORIGIN);
    assert_eq!(state.size(), GridSize::new(4, 3));
    assert_eq!(state.data, serde_json::Value::Null);
    assert!(f.state.is_dirty("kpi-1"));
}

#[test]
fn test_add_widget_rejects_duplicate_id() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    let err = f
        .state
        .add_widget("a", WidgetConfig::new("kpi"))
        .expect_err("duplicate");
    assert!(matches!(err, StateError::WidgetExists(id) if id == "a"));
}

#[test]
fn test_set_widget_state_merges_patch() {
    let f = fixture();
    f.state
        .add_widget(
            "a",
            WidgetConfig::new("kpi")
                .at(1, 1)
                .sized(2, 2)
                .with_data(json!({"metric": "revenue"})),
        )
        .expect("add");

    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(5, 0)), Notify::Subscribers)
        .expect("patch");

    let a = f.state.widget_state("a").expect("exists");
    assert_eq!(a.position(), GridPosition::new(5, 0));
    assert_eq!(a.size(), GridSize::new(2, 2));
    assert_eq!(a.data, json!({"metric": "revenue"}));
}

#[test]
fn test_set_widget_state_clamps_sizes() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state
        .set_widget_state("a", WidgetPatch::size(GridSize::new(0, 99)), Notify::Silent)
        .expect("patch");
    assert_eq!(
        f.state.widget_state("a").map(|w| w.size()),
        Some(GridSize::new(1, 12))
    );
}

#[test]
fn test_set_widget_state_unknown_id() {
    let f = fixture();
    let err = f
        .state
        .set_widget_state("ghost", WidgetPatch::default(), Notify::Silent)
        .expect_err("unknown");
    assert!(matches!(err, StateError::WidgetNotFound(_)));
}

#[test]
fn test_ephemeral_write_never_marks_dirty_or_schedules() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state.flush_now().expect("flush");
    assert!(!f.state.is_dirty("a"));
    assert!(!f.state.has_pending_flush());

    for x in 0..10 {
        f.state
            .set_ephemeral_position("a", GridPosition::new(x, 1), Notify::Silent)
            .expect("ephemeral");
    }
    assert!(!f.state.is_dirty("a"));
    assert!(!f.state.has_pending_flush());
    assert_eq!(f.scheduler.pending_idle(), 0);
    assert_eq!(f.state.ephemeral_position("a"), Some(GridPosition::new(9, 1)));
    // committed layer untouched
    assert_eq!(
        f.state.widget_state("a").map(|w| w.position()),
        Some(GridPosition::ORIGIN)
    );
}

#[test]
fn test_current_position_prefers_ephemeral() {
    let f = fixture();
    add(&f.state, "a", 2, 3, 2, 2);
    assert_eq!(f.state.current_position("a"), Some(GridPosition::new(2, 3)));
    f.state
        .set_ephemeral_position("a", GridPosition::new(7, 0), Notify::Silent)
        .expect("ephemeral");
    assert_eq!(f.state.current_position("a"), Some(GridPosition::new(7, 0)));
    assert_eq!(f.state.current_position("ghost"), None);
}

#[test]
fn test_commit_promotes_and_clears_ephemeral() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state.flush_now().expect("flush");
    f.state
        .set_ephemeral_position("a", GridPosition::new(4, 2), Notify::Silent)
        .expect("ephemeral");

    assert!(f.state.commit_ephemeral_state("a").expect("commit"));
    assert_eq!(f.state.ephemeral_position("a"), None);
    assert_eq!(
        f.state.widget_state("a").map(|w| w.position()),
        Some(GridPosition::new(4, 2))
    );
    assert!(f.state.is_dirty("a"));
}

#[test]
fn test_commit_without_ephemeral_is_noop() {
    let f = fixture();
    add(&f.state, "a", 1, 1, 2, 2);
    f.state.flush_now().expect("flush");
    assert!(!f.state.commit_ephemeral_state("a").expect("commit"));
    assert!(!f.state.is_dirty("a"));
    assert_eq!(f.state.current_position("a"), Some(GridPosition::new(1, 1)));
}

#[test]
fn test_discard_reverts_to_committed() {
    let f = fixture();
    add(&f.state, "a", 1, 1, 2, 2);
    f.state
        .set_ephemeral_position("a", GridPosition::new(6, 6), Notify::Silent)
        .expect("ephemeral");
    assert!(f.state.discard_ephemeral_state("a"));
    assert!(!f.state.discard_ephemeral_state("a"));
    assert_eq!(f.state.current_position("a"), Some(GridPosition::new(1, 1)));
}

#[test]
fn test_remove_widget_drops_ephemeral_entry() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state
        .set_ephemeral_position("a", GridPosition::new(3, 3), Notify::Silent)
        .expect("ephemeral");
    let removed = f.state.remove_widget("a").expect("remove");
    assert_eq!(removed.id, "a");
    assert!(!f.state.contains("a"));
    assert_eq!(f.state.ephemeral_position("a"), None);
    assert!(f.state.remove_widget("a").is_err());
}

#[test]
fn test_batch_update_skips_unknown_ids() {
    let f = fixture();
    add(&f.state, "a", 8, 0, 2, 2);
    add(&f.state, "b", 9, 2, 2, 2);
    let changed = f.state.batch_update(vec![
        ("a".into(), WidgetPatch { x: Some(2), ..WidgetPatch::default() }),
        ("ghost".into(), WidgetPatch { x: Some(0), ..WidgetPatch::default() }),
        ("b".into(), WidgetPatch { x: Some(3), ..WidgetPatch::default() }),
    ]);
    assert_eq!(changed, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(f.state.widget_state("a").map(|w| w.x), Some(2));
    assert_eq!(f.state.widget_state("b").map(|w| w.x), Some(3));
}

#[test]
fn test_set_visibility_is_not_persisted_change() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state.flush_now().expect("flush");
    f.state.set_visibility("a", true).expect("visibility");
    assert_eq!(f.state.widget_state("a").map(|w| w.visible), Some(true));
    assert!(!f.state.is_dirty("a"));
    assert!(!f.state.has_pending_flush());
}

#[test]
fn test_fill_data_is_not_persisted_change() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    f.state.flush_now().expect("flush");
    f.state.fill_data("a", json!({"text": "hi"})).expect("fill");
    assert_eq!(
        f.state.widget_state("a").map(|w| w.data),
        Some(json!({"text": "hi"}))
    );
    assert!(!f.state.is_dirty("a"));
    assert!(!f.state.has_pending_flush());
    assert!(f.state.fill_data("missing", json!(1)).is_err());
}
