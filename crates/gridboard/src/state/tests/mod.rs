//! Tests for the StateManager.
//!
//! - `layers`: committed and ephemeral writes, structural changes
//! - `persistence`: coalesced flushes, storage failures, restore
//! - `subscriptions`: per-id and global notifications

mod layers;
mod subscriptions;

use super::{MemoryStorage, StateManager, WidgetConfig};
use crate::config::Config;
use crate::scheduler::EventLoopScheduler;
use std::rc::Rc;

pub(super) struct Fixture {
    pub state: StateManager,
    pub scheduler: Rc<EventLoopScheduler>,
    pub storage: Rc<MemoryStorage>,
}

pub(super) fn fixture() -> Fixture {
    fixture_with(Config::default())
}

pub(super) fn fixture_with(config: Config) -> Fixture {
    let scheduler = Rc::new(EventLoopScheduler::new());
    let storage = Rc::new(MemoryStorage::new());
    let state = StateManager::new(Rc::new(config), scheduler.clone(), storage.clone());
    Fixture {
        state,
        scheduler,
        storage,
    }
}

/// Adds a widget at `(x, y)` with size `w x h`.
pub(super) fn add(state: &StateManager, id: &str, x: u32, y: u32, w: u32, h: u32) {
    state
        .add_widget(id, WidgetConfig::new("kpi").at(x, y).sized(w, h))
        .expect("add widget");
}
