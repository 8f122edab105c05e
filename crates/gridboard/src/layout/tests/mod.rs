//! Tests for the LayoutManager.
//!
//! - `activation`: lazy loading, failures, stale completions, data sources
//! - `placement`: adding widgets, ids, default sizes, free-spot search
//! - `resize`: throttled live resize, debounced breakpoint reflow
//! - `virtualization`: threshold and viewport-driven activation
//! - `interaction`: drag integration, data updates, teardown

mod virtualization;

use super::LayoutManager;
use crate::config::{Breakpoint, Config};
use crate::error::WidgetError;
use crate::grid::GridSize;
use crate::registry::{WidgetDescriptor, WidgetModule, WidgetRegistry};
use crate::scheduler::EventLoopScheduler;
use crate::state::{MemoryStorage, StateManager, WidgetConfig};
use crate::surface::{ContentState, RecordingSurface};
use crate::widgets::{ContainerInfo, Widget, WidgetProps};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use ratatui::text::Text;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared lifecycle log, one `"event:id"` entry per hook call.
pub(super) type Log = Rc<RefCell<Vec<String>>>;

/// Widget that records its lifecycle and renders `"id:data"`.
struct Probe {
    id: String,
    log: Log,
}

impl Probe {
    fn record(&self, event: &str) {
        self.log.borrow_mut().push(format!("{}:{}", event, self.id));
    }
}

impl Widget for Probe {
    fn mount(&mut self, _container: &ContainerInfo) -> Result<(), WidgetError> {
        self.record("mount");
        Ok(())
    }

    fn render(&mut self, props: &WidgetProps) -> Result<Text<'static>, WidgetError> {
        self.record("render");
        Ok(Text::raw(format!("{}:{}", self.id, props.data)))
    }

    fn on_visible(&mut self) {
        self.record("visible");
    }

    fn on_hidden(&mut self) {
        self.record("hidden");
    }

    fn on_resize(&mut self, _width: f32, _height: f32) {
        self.record("resize");
    }

    fn on_resize_end(&mut self, _width: f32, _height: f32) {
        self.record("resize_end");
    }

    fn on_destroy(&mut self) {
        self.record("destroy");
    }
}

fn probe_descriptor(log: &Log, constructed: &Rc<Cell<u32>>) -> WidgetDescriptor {
    let log = log.clone();
    let constructed = constructed.clone();
    WidgetDescriptor::new("KPI", "metrics", GridSize::new(3, 2), 1, move || {
        let log = log.clone();
        let constructed = constructed.clone();
        async move {
            Ok(WidgetModule::with_default(move |id: &str, _data: &Value| {
                constructed.set(constructed.get() + 1);
                Ok(Box::new(Probe {
                    id: id.to_string(),
                    log: log.clone(),
                }) as Box<dyn Widget>)
            }))
        }
    })
}

fn broken_descriptor(attempts: &Rc<Cell<u32>>) -> WidgetDescriptor {
    let attempts = attempts.clone();
    WidgetDescriptor::new("Broken", "test", GridSize::new(2, 2), 5, move || {
        let attempts = attempts.clone();
        async move {
            Ok(WidgetModule::with_default(move |_id: &str, _data: &Value| {
                attempts.set(attempts.get() + 1);
                Err(WidgetError::Construct("bad data".into()))
            }))
        }
    })
}

pub(super) struct Fixture {
    pub layout: LayoutManager,
    pub state: StateManager,
    pub registry: WidgetRegistry,
    pub scheduler: Rc<EventLoopScheduler>,
    pub storage: Rc<MemoryStorage>,
    pub surface: Rc<RefCell<RecordingSurface>>,
    pub pool: LocalPool,
    pub log: Log,
    /// Probe constructor calls.
    pub constructed: Rc<Cell<u32>>,
    /// Broken constructor calls.
    pub broken_attempts: Rc<Cell<u32>>,
}

impl Fixture {
    /// Drives the activation tasks until none can make progress.
    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    pub fn content(&self, id: &str) -> Option<ContentState> {
        self.surface.borrow().container(id).map(|c| c.content.clone())
    }

    pub fn logged(&self, entry: &str) -> usize {
        self.log.borrow().iter().filter(|e| *e == entry).count()
    }
}

/// Test grid: 12 columns from 1100px, 6 from 600px, 4 below. Row height 80,
/// gap 10. At 1190px wide a column step is exactly 100px.
pub(super) fn config() -> Config {
    let mut config = Config::default();
    config.grid.breakpoints = vec![
        Breakpoint::new("lg", 1100, 12),
        Breakpoint::new("sm", 600, 6),
        Breakpoint::new("xs", 0, 4),
    ];
    config
}

pub(super) fn fixture() -> Fixture {
    fixture_with(config(), 1190.0, 900.0)
}

/// Builds every service but does not call `init`.
pub(super) fn fixture_with(config: Config, width: f32, height: f32) -> Fixture {
    let config = Rc::new(config);
    let scheduler = Rc::new(EventLoopScheduler::new());
    let storage = Rc::new(MemoryStorage::new());
    let state = StateManager::new(config.clone(), scheduler.clone(), storage.clone());
    let surface = Rc::new(RefCell::new(RecordingSurface::new(width, height)));
    let pool = LocalPool::new();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let constructed = Rc::new(Cell::new(0));
    let broken_attempts = Rc::new(Cell::new(0));

    let registry = WidgetRegistry::new();
    registry.register("kpi", probe_descriptor(&log, &constructed));
    registry.register("broken", broken_descriptor(&broken_attempts));

    let layout = LayoutManager::new(
        config,
        registry.clone(),
        state.clone(),
        scheduler.clone(),
        surface.clone(),
        Rc::new(pool.spawner()),
    );
    Fixture {
        layout,
        state,
        registry,
        scheduler,
        storage,
        surface,
        pool,
        log,
        constructed,
        broken_attempts,
    }
}

/// Puts a widget straight into state.
pub(super) fn seed(f: &Fixture, id: &str, widget_type: &str, x: u32, y: u32, w: u32, h: u32) {
    f.state
        .add_widget(id, WidgetConfig::new(widget_type).at(x, y).sized(w, h))
        .expect("seed widget");
}

/// Registers `"gated"`, whose module load waits for the returned sender.
pub(super) fn register_gated(f: &Fixture) -> oneshot::Sender<()> {
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Rc::new(RefCell::new(Some(rx)));
    let log = f.log.clone();
    let constructed = f.constructed.clone();
    f.registry.register(
        "gated",
        WidgetDescriptor::new("Gated", "test", GridSize::new(2, 2), 9, move || {
            let rx = gate.borrow_mut().take();
            let log = log.clone();
            let constructed = constructed.clone();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok(WidgetModule::with_default(move |id: &str, _data: &Value| {
                    constructed.set(constructed.get() + 1);
                    Ok(Box::new(Probe {
                        id: id.to_string(),
                        log: log.clone(),
                    }) as Box<dyn Widget>)
                }))
            }
        }),
    );
    tx
}
