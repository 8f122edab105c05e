//! Application state and main event loop for the terminal host.
//!
//! Owns the engine services, manages terminal setup/teardown and the
//! panic hook, and pumps the scheduler and the activation executor on
//! every event.

mod update;

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::layout::{DataSource, LayoutManager};
use crate::registry::WidgetRegistry;
use crate::scheduler::{EventLoopScheduler, Scheduler};
use crate::state::{StateManager, Storage, WidgetConfig};
use crate::surface::SharedSurface;
use crate::tui::event::{handle_key_event, handle_mouse_event, Action, Event, EventHandler};
use crate::tui::surface::TerminalSurface;
use crate::tui::ui;
use crate::widgets::{self, clock, note};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::executor::LocalPool;
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use ratatui::prelude::{CrosstermBackend, Terminal};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::io::{self, stdout};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Event loop tick. Drag frames and timers run at this granularity.
const TICK_RATE: Duration = Duration::from_millis(33);

/// How often clock widgets re-render.
const CLOCK_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Widget types with priority at or below this are loaded at startup.
const PRELOAD_PRIORITY: u32 = 1;

const WELCOME_TEXT: &str = "Welcome to gridboard.\n\nDrag a title bar to move a widget.\nTab selects, d deletes, c and a add.";

/// Supplies starter content for widgets added without data.
struct DemoData;

impl DataSource for DemoData {
    fn fetch(&self, id: &str, widget_type: &str) -> LocalBoxFuture<'static, Result<Value, String>> {
        let value = match widget_type {
            note::TYPE => json!({ "text": format!("{id}\n\nAn empty note.") }),
            _ => json!({}),
        };
        future::ready(Ok(value)).boxed_local()
    }
}

/// Terminal dashboard application.
pub struct App {
    /// Scheduler driven by the event loop.
    pub scheduler: Rc<EventLoopScheduler>,
    /// Executor running widget activations and preloads.
    pub pool: LocalPool,
    /// Widget type registry.
    pub registry: WidgetRegistry,
    /// Layout state store.
    pub state: StateManager,
    /// Layout orchestrator.
    pub layout: LayoutManager,
    /// Terminal-backed surface.
    pub surface: Rc<RefCell<TerminalSurface>>,
    /// Selected widget id.
    pub selected: Option<String>,
    /// Transient status bar message and its expiry in scheduler time.
    pub status_message: Option<(String, Duration)>,
    /// Whether the event loop should exit.
    pub should_quit: bool,
    last_clock_refresh: Duration,
}

impl App {
    /// Builds the engine for a `columns x rows` terminal. Nothing is
    /// mounted until [`start`](Self::start).
    pub fn new(config: Config, storage: Rc<dyn Storage>, columns: u16, rows: u16) -> Self {
        let config = Rc::new(config);
        let scheduler = Rc::new(EventLoopScheduler::new());
        let pool = LocalPool::new();
        let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());

        let registry = WidgetRegistry::new();
        widgets::register_builtin(&registry);
        let state = StateManager::new(config.clone(), scheduler.clone(), storage);
        let surface = Rc::new(RefCell::new(TerminalSurface::new(columns, rows)));
        let shared: SharedSurface = surface.clone();
        let layout = LayoutManager::new(
            config,
            registry.clone(),
            state.clone(),
            scheduler.clone(),
            shared,
            spawner,
        );
        layout.set_data_source(Rc::new(DemoData));

        Self {
            scheduler,
            pool,
            registry,
            state,
            layout,
            surface,
            selected: None,
            status_message: None,
            should_quit: false,
            last_clock_refresh: Duration::ZERO,
        }
    }

    /// Restores the saved layout, mounts it and kicks off preloading.
    ///
    /// An empty layout is seeded with a clock and a welcome note.
    pub fn start(&mut self) {
        let registry = self.registry.clone();
        if let Err(e) = self.pool.spawner().spawn_local(async move {
            let loaded = registry.preload_priority(PRELOAD_PRIORITY).await;
            tracing::debug!("Preloaded {} widget types", loaded);
        }) {
            tracing::warn!("Widget preload not started: {}", e);
        }

        self.state.restore();
        self.layout.init();
        if self.state.is_empty() {
            self.seed_default_layout();
        }
        tracing::info!("Dashboard started with {} widgets", self.state.len());
    }

    fn seed_default_layout(&mut self) {
        let seeds = [
            WidgetConfig::new(clock::TYPE),
            WidgetConfig::new(note::TYPE).with_data(json!({ "text": WELCOME_TEXT })),
        ];
        for config in seeds {
            if let Err(e) = self.layout.add_widget(config) {
                tracing::warn!("Could not seed default layout: {}", e);
            }
        }
    }

    /// Advances the scheduler clock by `elapsed` and runs everything that
    /// became due: timers, one animation frame, pending activations,
    /// clock refreshes and idle work. Returns whether anything ran.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        let mut changed = self.scheduler.advance(elapsed) > 0;
        changed |= self.scheduler.run_frame() > 0;
        while self.pool.try_run_one() {
            changed = true;
        }

        let now = self.scheduler.now();
        if now.saturating_sub(self.last_clock_refresh) >= CLOCK_REFRESH_INTERVAL {
            self.last_clock_refresh = now;
            changed |= self.refresh_clocks();
        }

        changed |= self.scheduler.run_idle() > 0;
        changed |= self.expire_status_message();
        changed
    }

    fn refresh_clocks(&self) -> bool {
        let clocks: Vec<String> = self
            .state
            .all_widget_states()
            .into_iter()
            .filter(|w| w.widget_type == clock::TYPE && self.layout.is_active(&w.id))
            .map(|w| w.id)
            .collect();
        for id in &clocks {
            self.layout.refresh(id);
        }
        !clocks.is_empty()
    }

    /// Shows `message` in the status bar for a few seconds.
    pub fn set_status(&mut self, message: impl Into<String>) {
        let expiry = self.scheduler.now() + STATUS_MESSAGE_TTL;
        self.status_message = Some((message.into(), expiry));
    }

    /// Clears the status message if its expiry time has passed.
    pub fn expire_status_message(&mut self) -> bool {
        let expired = matches!(
            &self.status_message,
            Some((_, expiry)) if self.scheduler.now() >= *expiry
        );
        if expired {
            self.status_message = None;
        }
        expired
    }

    /// Tears the layout down, flushing unsaved changes.
    pub fn shutdown(&mut self) {
        self.layout.destroy();
        tracing::info!("Dashboard stopped");
    }

    /// Runs the TUI application: sets up terminal, enters event loop, restores on exit.
    pub async fn run(&mut self) -> io::Result<()> {
        // Install panic hook that restores terminal before printing panic info
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = restore_terminal();
            original_hook(panic_info);
        }));

        setup_terminal()?;

        let result = self.event_loop().await;
        self.shutdown();

        restore_terminal()?;
        result
    }

    /// Main event loop: processes events, pumps the engine and renders.
    async fn event_loop(&mut self) -> io::Result<()> {
        let backend = CrosstermBackend::new(stdout());
        let mut terminal = Terminal::new(backend)?;
        let mut event_handler = EventHandler::new(TICK_RATE);
        let mut reader = EventStream::new();

        let area = terminal.size()?;
        self.surface.borrow_mut().resize(area.width, area.height);
        self.layout.handle_container_resize();

        let mut last_pump = Instant::now();
        let mut should_render = true;
        loop {
            if should_render {
                let status = self
                    .status_message
                    .as_ref()
                    .map(|(message, _)| message.as_str())
                    .unwrap_or("");
                let surface = self.surface.borrow();
                let selected = self.selected.as_deref();
                terminal.draw(|frame| ui::render(frame, &surface, selected, status))?;
            }

            let event = event_handler.next(&mut reader).await?;
            let input = match event {
                Event::Key(key) => {
                    self.apply_action(handle_key_event(key));
                    true
                }
                Event::Mouse(mouse) => {
                    let action = handle_mouse_event(mouse, &self.surface.borrow());
                    self.apply_action(action);
                    true
                }
                Event::Resize(columns, rows) => {
                    self.surface.borrow_mut().resize(columns, rows);
                    self.layout.handle_container_resize();
                    true
                }
                Event::Tick => false,
            };
            if self.should_quit {
                return Ok(());
            }

            let pumped = self.tick(last_pump.elapsed());
            last_pump = Instant::now();
            should_render = input || pumped;
        }
    }
}

/// Enables raw mode and switches to the alternate screen.
fn setup_terminal() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    Ok(())
}

/// Restores the terminal to its original state.
fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}
