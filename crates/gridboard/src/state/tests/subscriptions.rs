//! Per-id and global subscription tests.

use super::{add, fixture};
use crate::grid::GridPosition;
use crate::state::{GlobalChange, Notify, StateLayer, WidgetConfig, WidgetPatch};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(u32, StateLayer)>>>;

fn record(log: &Log) -> impl Fn(&crate::state::WidgetState, StateLayer) + 'static {
    let log = log.clone();
    move |w: &crate::state::WidgetState, layer: StateLayer| log.borrow_mut().push((w.x, layer))
}

#[test]
fn test_subscribe_receives_committed_writes() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    let log: Log = Rc::default();
    let _sub = f.state.subscribe("a", record(&log));

    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(3, 0)), Notify::Subscribers)
        .expect("write");
    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(4, 0)), Notify::Silent)
        .expect("write");
    assert_eq!(*log.borrow(), vec![(3, StateLayer::Committed)]);
}

#[test]
fn test_ephemeral_and_discard_notifications() {
    let f = fixture();
    add(&f.state, "a", 1, 0, 2, 2);
    let log: Log = Rc::default();
    let _sub = f.state.subscribe("a", record(&log));

    f.state
        .set_ephemeral_position("a", GridPosition::new(5, 0), Notify::Subscribers)
        .expect("ephemeral");
    f.state
        .set_ephemeral_position("a", GridPosition::new(6, 0), Notify::Silent)
        .expect("ephemeral");
    f.state.discard_ephemeral_state("a");

    assert_eq!(
        *log.borrow(),
        vec![(5, StateLayer::Ephemeral), (1, StateLayer::Committed)]
    );
}

#[test]
fn test_unsubscribe_stops_notifications() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    let log: Log = Rc::default();
    let sub = f.state.subscribe("a", record(&log));
    assert_eq!(f.state.subscriber_count("a"), 1);
    sub.unsubscribe();
    assert_eq!(f.state.subscriber_count("a"), 0);

    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(1, 0)), Notify::Subscribers)
        .expect("write");
    assert!(log.borrow().is_empty());
}

#[test]
fn test_callback_may_write_back_into_store() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 2, 2);
    add(&f.state, "mirror", 0, 5, 2, 2);
    let store = f.state.clone();
    let _sub = f.state.subscribe("a", move |w, _| {
        let _ = store.set_widget_state(
            "mirror",
            WidgetPatch { x: Some(w.x), ..WidgetPatch::default() },
            Notify::Silent,
        );
    });
    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(7, 0)), Notify::Subscribers)
        .expect("write");
    assert_eq!(f.state.widget_state("mirror").map(|w| w.x), Some(7));
}

#[test]
fn test_global_subscribers_see_structural_changes_only() {
    let f = fixture();
    let changes: Rc<RefCell<Vec<GlobalChange>>> = Rc::default();
    let sink = changes.clone();
    let sub = f
        .state
        .subscribe_global(move |c| sink.borrow_mut().push(c.clone()));

    f.state
        .add_widget("a", WidgetConfig::new("kpi"))
        .expect("add");
    f.state
        .set_widget_state("a", WidgetPatch::position(GridPosition::new(1, 1)), Notify::Subscribers)
        .expect("write");
    f.state.batch_update(vec![(
        "a".into(),
        WidgetPatch { x: Some(0), ..WidgetPatch::default() },
    )]);
    f.state.remove_widget("a").expect("remove");
    f.state.import_json(r#"{"v":2,"widgets":{}}"#).expect("import");

    assert_eq!(
        *changes.borrow(),
        vec![
            GlobalChange::Added("a".into()),
            GlobalChange::Batch(vec!["a".into()]),
            GlobalChange::Removed("a".into()),
            GlobalChange::Imported,
        ]
    );

    sub.unsubscribe();
    add(&f.state, "b", 0, 0, 1, 1);
    assert_eq!(changes.borrow().len(), 4);
}

#[test]
fn test_batch_update_skips_per_id_subscribers() {
    let f = fixture();
    add(&f.state, "a", 4, 0, 2, 2);
    let log: Log = Rc::default();
    let _sub = f.state.subscribe("a", record(&log));

    f.state.batch_update(vec![(
        "a".into(),
        WidgetPatch { x: Some(0), ..WidgetPatch::default() },
    )]);
    assert!(log.borrow().is_empty());
    assert_eq!(f.state.widget_state("a").map(|w| w.x), Some(0));
}

#[test]
fn test_batch_update_notifies_global_once() {
    let f = fixture();
    add(&f.state, "a", 0, 0, 1, 1);
    add(&f.state, "b", 1, 0, 1, 1);
    add(&f.state, "c", 2, 0, 1, 1);
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    let _sub = f.state.subscribe_global(move |_| *sink.borrow_mut() += 1);

    f.state.batch_update(
        ["a", "b", "c"]
            .iter()
            .map(|id| (id.to_string(), WidgetPatch { y: Some(4), ..WidgetPatch::default() }))
            .collect(),
    );
    assert_eq!(*count.borrow(), 1);
    assert_eq!(f.scheduler.pending_idle(), 1);
}
