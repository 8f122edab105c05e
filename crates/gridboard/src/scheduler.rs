//! Cooperative scheduling primitives.
//!
//! The engine relies on three scheduling mechanisms, each for one purpose:
//!
//! - **animation frames** for drag updates (at most one visual write per
//!   rendered frame),
//! - **idle callbacks with a timeout** for persistence (storage writes wait
//!   until the host is otherwise idle, but never longer than the timeout),
//! - **timers** for debounced resize handling.
//!
//! Everything runs on one thread. Callbacks are plain `FnOnce` closures and
//! run to completion, so they can freely call back into the services that
//! scheduled them.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

/// A scheduled callback.
pub type Callback = Box<dyn FnOnce()>;

/// Identifies a scheduled callback so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Host scheduling interface.
///
/// Methods take `&self`; implementations use interior mutability so that
/// callbacks may schedule further work while the host is running them.
pub trait Scheduler {
    /// Monotonic time since the scheduler started.
    fn now(&self) -> Duration;

    /// Runs `callback` before the next rendered frame.
    fn request_frame(&self, callback: Callback) -> TaskHandle;

    /// Runs `callback` when the host is idle, or once `timeout` has elapsed,
    /// whichever comes first.
    fn request_idle(&self, callback: Callback, timeout: Duration) -> TaskHandle;

    /// Runs `callback` after `delay`.
    fn set_timeout(&self, callback: Callback, delay: Duration) -> TaskHandle;

    /// Cancels a pending callback. Unknown or already-run handles are ignored.
    fn cancel(&self, handle: TaskHandle);
}

struct Timed {
    handle: TaskHandle,
    due: Duration,
    callback: Callback,
}

#[derive(Default)]
struct Queues {
    next_id: u64,
    now: Duration,
    frames: Vec<(TaskHandle, Callback)>,
    idle: Vec<Timed>,
    timers: Vec<Timed>,
}

impl Queues {
    fn next_handle(&mut self) -> TaskHandle {
        self.next_id += 1;
        TaskHandle(self.next_id)
    }
}

/// A [`Scheduler`] driven explicitly by the host's event loop.
///
/// The host decides when a frame is rendered ([`run_frame`](Self::run_frame)),
/// when it is idle ([`run_idle`](Self::run_idle)) and how far the clock moves
/// ([`advance`](Self::advance)). The terminal host drives it from its tick;
/// tests drive it step by step for deterministic timing.
#[derive(Default)]
pub struct EventLoopScheduler {
    queues: RefCell<Queues>,
}

impl fmt::Debug for EventLoopScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.queues.borrow();
        f.debug_struct("EventLoopScheduler")
            .field("now", &q.now)
            .field("frames", &q.frames.len())
            .field("idle", &q.idle.len())
            .field("timers", &q.timers.len())
            .finish()
    }
}

impl EventLoopScheduler {
    /// Creates a scheduler with an empty queue and the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every frame callback queued before this call.
    ///
    /// Callbacks requested while the frame runs land in the next frame.
    /// Returns the number of callbacks run.
    pub fn run_frame(&self) -> usize {
        let frames = std::mem::take(&mut self.queues.borrow_mut().frames);
        let count = frames.len();
        for (_, callback) in frames {
            callback();
        }
        count
    }

    /// Runs every idle callback queued before this call.
    pub fn run_idle(&self) -> usize {
        let idle = std::mem::take(&mut self.queues.borrow_mut().idle);
        let count = idle.len();
        for task in idle {
            (task.callback)();
        }
        count
    }

    /// Moves the clock forward by `elapsed`, then runs due timers (in due
    /// order) and idle callbacks whose timeout has expired.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let now = {
            let mut q = self.queues.borrow_mut();
            q.now += elapsed;
            q.now
        };
        let mut count = 0;
        while let Some(task) = self.take_due(now) {
            (task.callback)();
            count += 1;
        }
        count
    }

    fn take_due(&self, now: Duration) -> Option<Timed> {
        let mut q = self.queues.borrow_mut();
        let timer = q
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.handle.0))
            .map(|(i, _)| i);
        if let Some(i) = timer {
            return Some(q.timers.remove(i));
        }
        let idle = q.idle.iter().position(|t| t.due <= now);
        idle.map(|i| q.idle.remove(i))
    }

    /// Number of queued frame callbacks.
    pub fn pending_frames(&self) -> usize {
        self.queues.borrow().frames.len()
    }

    /// Number of queued idle callbacks.
    pub fn pending_idle(&self) -> usize {
        self.queues.borrow().idle.len()
    }

    /// Number of queued timers.
    pub fn pending_timers(&self) -> usize {
        self.queues.borrow().timers.len()
    }
}

impl Scheduler for EventLoopScheduler {
    fn now(&self) -> Duration {
        self.queues.borrow().now
    }

    fn request_frame(&self, callback: Callback) -> TaskHandle {
        let mut q = self.queues.borrow_mut();
        let handle = q.next_handle();
        q.frames.push((handle, callback));
        handle
    }

    fn request_idle(&self, callback: Callback, timeout: Duration) -> TaskHandle {
        let mut q = self.queues.borrow_mut();
        let handle = q.next_handle();
        let due = q.now + timeout;
        q.idle.push(Timed {
            handle,
            due,
            callback,
        });
        handle
    }

    fn set_timeout(&self, callback: Callback, delay: Duration) -> TaskHandle {
        let mut q = self.queues.borrow_mut();
        let handle = q.next_handle();
        let due = q.now + delay;
        q.timers.push(Timed {
            handle,
            due,
            callback,
        });
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut q = self.queues.borrow_mut();
        q.frames.retain(|(h, _)| *h != handle);
        q.idle.retain(|t| t.handle != handle);
        q.timers.retain(|t| t.handle != handle);
    }
}
