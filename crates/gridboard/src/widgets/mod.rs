//! Widget contract for the dashboard.
//!
//! This module defines the [`Widget`] trait that every widget type
//! implements, and [`WidgetInstance`], the wrapper the layout orchestrator
//! uses to drive a widget through its lifecycle.
//!
//! # Architecture
//!
//! A widget type is registered with the [`WidgetRegistry`](crate::registry::WidgetRegistry)
//! as a deferred loader. Once loaded, the registry hands out a
//! [`WidgetConstructor`], which the orchestrator calls with the widget id and
//! its initial `data` payload. The resulting boxed [`Widget`] is wrapped in a
//! [`WidgetInstance`] that owns the memoization state (previous props) and
//! calls the optional lifecycle hooks in the right order.
//!
//! Widgets render into a ratatui [`Text`], which the host surface places in
//! the widget's content region.
//!
//! # Example
//!
//! ```
//! use gridboard::widgets::{ContainerInfo, Widget, WidgetInstance, WidgetProps};
//! use gridboard::error::WidgetError;
//! use ratatui::text::Text;
//!
//! struct Hello;
//!
//! impl Widget for Hello {
//!     fn mount(&mut self, _container: &ContainerInfo) -> Result<(), WidgetError> {
//!         Ok(())
//!     }
//!     fn render(&mut self, _props: &WidgetProps) -> Result<Text<'static>, WidgetError> {
//!         Ok(Text::raw("hello"))
//!     }
//! }
//!
//! let mut instance = WidgetInstance::new("hello-1", "hello", Box::new(Hello));
//! instance.mount(&ContainerInfo::default()).unwrap();
//! assert!(instance.update(WidgetProps::default()).unwrap());
//! ```

pub mod clock;
pub mod note;

use crate::error::WidgetError;
use crate::grid::{GridSize, PixelRect};
use crate::registry::{WidgetDescriptor, WidgetModule, WidgetRegistry};
use ratatui::text::Text;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Properties passed to a widget on every update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WidgetProps {
    /// Opaque payload owned by the widget type.
    pub data: Value,
    /// Content region width in logical pixels.
    pub width: f32,
    /// Content region height in logical pixels.
    pub height: f32,
}

impl WidgetProps {
    /// Creates props for `data` at the given pixel size.
    pub fn new(data: Value, width: f32, height: f32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// Snapshot of the container a widget is mounted into.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerInfo {
    /// Widget id.
    pub id: String,
    /// Widget type identifier.
    pub widget_type: String,
    /// Container rectangle at mount time.
    pub rect: PixelRect,
}

/// Trait for dashboard widgets.
///
/// # Required Methods
///
/// - [`mount`](Widget::mount): attach to a container.
/// - [`render`](Widget::render): produce the content for the given props.
///
/// Every other method has a default: lifecycle hooks are no-ops and
/// [`should_update`](Widget::should_update) compares a hash of `data`.
pub trait Widget {
    /// Attaches the widget to its container.
    fn mount(&mut self, container: &ContainerInfo) -> Result<(), WidgetError>;

    /// Renders the widget content.
    fn render(&mut self, props: &WidgetProps) -> Result<Text<'static>, WidgetError>;

    /// Whether `next` requires a re-render.
    ///
    /// Always `true` when there were no previous props.
    fn should_update(&self, prev: Option<&WidgetProps>, next: &WidgetProps) -> bool {
        match prev {
            None => true,
            Some(prev) => data_hash(&prev.data) != data_hash(&next.data),
        }
    }

    /// Called once after a successful [`mount`](Widget::mount).
    fn on_mount(&mut self) {}

    /// Called when the widget enters the viewport. Allocate lazy resources here.
    fn on_visible(&mut self) {}

    /// Called when the widget leaves the viewport. Release resources here.
    fn on_hidden(&mut self) {}

    /// Called while the container is being resized.
    fn on_resize(&mut self, _width: f32, _height: f32) {}

    /// Called once a resize has settled.
    fn on_resize_end(&mut self, _width: f32, _height: f32) {}

    /// Called before the widget is dropped.
    fn on_destroy(&mut self) {}
}

/// Constructs a widget from its id and initial data.
///
/// Handed out by the registry once a type's module has loaded. The `Rc`
/// identity is the identity of the loaded implementation.
pub type WidgetConstructor = Rc<dyn Fn(&str, &Value) -> Result<Box<dyn Widget>, WidgetError>>;

/// Stable hash of a data payload, used for update memoization.
pub fn data_hash(data: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.to_string().hash(&mut hasher);
    hasher.finish()
}

/// A live widget together with its lifecycle bookkeeping.
pub struct WidgetInstance {
    id: String,
    widget_type: String,
    widget: Box<dyn Widget>,
    prev_props: Option<WidgetProps>,
    output: Option<Text<'static>>,
    mounted: bool,
    visible: bool,
}

impl std::fmt::Debug for WidgetInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetInstance")
            .field("id", &self.id)
            .field("widget_type", &self.widget_type)
            .field("mounted", &self.mounted)
            .field("visible", &self.visible)
            .finish()
    }
}

impl WidgetInstance {
    /// Wraps a freshly constructed widget.
    pub fn new(id: &str, widget_type: &str, widget: Box<dyn Widget>) -> Self {
        Self {
            id: id.to_string(),
            widget_type: widget_type.to_string(),
            widget,
            prev_props: None,
            output: None,
            mounted: false,
            visible: false,
        }
    }

    /// Widget id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Widget type identifier.
    pub fn widget_type(&self) -> &str {
        &self.widget_type
    }

    /// Whether [`mount`](Self::mount) succeeded.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether the widget is currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Latest rendered content.
    pub fn output(&self) -> Option<&Text<'static>> {
        self.output.as_ref()
    }

    /// Mounts the widget, then runs its `on_mount` hook.
    pub fn mount(&mut self, container: &ContainerInfo) -> Result<(), WidgetError> {
        self.widget.mount(container)?;
        self.mounted = true;
        self.widget.on_mount();
        Ok(())
    }

    /// Renders `props` if the widget's memoization check asks for it.
    ///
    /// Returns whether a render happened.
    pub fn update(&mut self, props: WidgetProps) -> Result<bool, WidgetError> {
        if !self.widget.should_update(self.prev_props.as_ref(), &props) {
            return Ok(false);
        }
        let text = self.widget.render(&props)?;
        self.output = Some(text);
        self.prev_props = Some(props);
        Ok(true)
    }

    /// Marks the widget visible, running `on_visible` on the transition.
    pub fn show(&mut self) {
        if !self.visible {
            self.visible = true;
            self.widget.on_visible();
        }
    }

    /// Marks the widget hidden, running `on_hidden` on the transition.
    pub fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.widget.on_hidden();
        }
    }

    /// Forwards a live resize.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.widget.on_resize(width, height);
    }

    /// Forwards a settled resize.
    pub fn resize_end(&mut self, width: f32, height: f32) {
        self.widget.on_resize_end(width, height);
    }

    /// Runs `on_destroy` and drops the widget.
    pub fn destroy(mut self) {
        self.widget.on_destroy();
        self.mounted = false;
    }
}

/// Registers the demo widget types shipped with the terminal host.
pub fn register_builtin(registry: &WidgetRegistry) {
    registry.register(
        clock::TYPE,
        WidgetDescriptor::new("Clock", "time", GridSize::new(3, 2), 1, || async {
            Ok(WidgetModule::with_default(clock::ClockWidget::create))
        }),
    );
    registry.register(
        note::TYPE,
        WidgetDescriptor::new("Note", "text", GridSize::new(4, 3), 5, || async {
            Ok(WidgetModule::new().export(note::TYPE, note::NoteWidget::create))
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// Records every hook call into a shared log.
    struct Probe {
        log: Rc<RefCell<Vec<String>>>,
        fail_mount: bool,
    }

    impl Probe {
        fn boxed(log: &Rc<RefCell<Vec<String>>>) -> Box<dyn Widget> {
            Box::new(Probe {
                log: log.clone(),
                fail_mount: false,
            })
        }

        fn push(&self, s: &str) {
            self.log.borrow_mut().push(s.to_string());
        }
    }

    impl Widget for Probe {
        fn mount(&mut self, _container: &ContainerInfo) -> Result<(), WidgetError> {
            if self.fail_mount {
                return Err(WidgetError::Mount("boom".into()));
            }
            self.push("mount");
            Ok(())
        }
        fn render(&mut self, props: &WidgetProps) -> Result<Text<'static>, WidgetError> {
            self.push("render");
            Ok(Text::raw(props.data.to_string()))
        }
        fn on_mount(&mut self) {
            self.push("on_mount");
        }
        fn on_visible(&mut self) {
            self.push("on_visible");
        }
        fn on_hidden(&mut self) {
            self.push("on_hidden");
        }
        fn on_destroy(&mut self) {
            self.push("on_destroy");
        }
    }

    #[test]
    fn mount_runs_on_mount_after_mount() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = WidgetInstance::new("p-1", "probe", Probe::boxed(&log));
        w.mount(&ContainerInfo::default()).expect("mount");
        assert!(w.is_mounted());
        assert_eq!(*log.borrow(), vec!["mount", "on_mount"]);
    }

    #[test]
    fn failed_mount_skips_on_mount() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = WidgetInstance::new(
            "p-1",
            "probe",
            Box::new(Probe {
                log: log.clone(),
                fail_mount: true,
            }),
        );
        assert!(w.mount(&ContainerInfo::default()).is_err());
        assert!(!w.is_mounted());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn update_without_previous_props_always_renders() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = WidgetInstance::new("p-1", "probe", Probe::boxed(&log));
        assert!(w.update(WidgetProps::default()).expect("update"));
        assert!(w.output().is_some());
    }

    #[test]
    fn update_with_same_data_is_memoized() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = WidgetInstance::new("p-1", "probe", Probe::boxed(&log));
        let props = WidgetProps::new(json!({"value": 1}), 100.0, 50.0);
        assert!(w.update(props.clone()).expect("first"));
        assert!(!w.update(props).expect("second"));
        assert!(w
            .update(WidgetProps::new(json!({"value": 2}), 100.0, 50.0))
            .expect("third"));
        let renders = log.borrow().iter().filter(|s| *s == "render").count();
        assert_eq!(renders, 2);
    }

    #[test]
    fn show_and_hide_fire_only_on_transitions() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = WidgetInstance::new("p-1", "probe", Probe::boxed(&log));
        w.show();
        w.show();
        w.hide();
        w.hide();
        assert_eq!(*log.borrow(), vec!["on_visible", "on_hidden"]);
    }

    #[test]
    fn destroy_runs_on_destroy() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let w = WidgetInstance::new("p-1", "probe", Probe::boxed(&log));
        w.destroy();
        assert_eq!(*log.borrow(), vec!["on_destroy"]);
    }

    #[test]
    fn data_hash_is_stable_and_content_sensitive() {
        assert_eq!(data_hash(&json!({"a": 1})), data_hash(&json!({"a": 1})));
        assert_ne!(data_hash(&json!({"a": 1})), data_hash(&json!({"a": 2})));
    }

    #[test]
    fn builtin_types_are_registered() {
        let registry = WidgetRegistry::new();
        register_builtin(&registry);
        assert!(registry.has(clock::TYPE));
        assert!(registry.has(note::TYPE));
        assert!(!registry.is_loaded(clock::TYPE));
    }
}
