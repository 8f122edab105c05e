//! Viewport visibility tracking for mounted containers.

use crate::grid::PixelRect;
use crate::surface::Viewport;
use std::collections::HashMap;

/// Containers that changed visibility in one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityChange {
    /// Became visible.
    pub entered: Vec<String>,
    /// Stopped being visible.
    pub left: Vec<String>,
}

/// Tracks which observed containers intersect the padded viewport.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    padding: f32,
    observed: HashMap<String, bool>,
}

impl VisibilityTracker {
    /// A tracker treating `padding` pixels above and below the viewport as
    /// visible.
    pub fn new(padding: f32) -> Self {
        Self {
            padding,
            observed: HashMap::new(),
        }
    }

    /// Starts observing `id`. New entries start hidden.
    pub fn observe(&mut self, id: &str) {
        self.observed.entry(id.to_string()).or_insert(false);
    }

    /// Stops observing `id`.
    pub fn unobserve(&mut self, id: &str) {
        self.observed.remove(id);
    }

    /// Whether `id` was visible at the last update.
    pub fn is_visible(&self, id: &str) -> bool {
        self.observed.get(id).copied().unwrap_or(false)
    }

    /// Number of visible containers.
    pub fn visible_count(&self) -> usize {
        self.observed.values().filter(|v| **v).count()
    }

    /// Recomputes visibility from the current rectangles.
    ///
    /// Ids that are not observed are ignored. Results are sorted by id.
    pub fn update<'a, I>(&mut self, viewport: Viewport, rects: I) -> VisibilityChange
    where
        I: IntoIterator<Item = (&'a str, PixelRect)>,
    {
        let mut change = VisibilityChange::default();
        for (id, rect) in rects {
            let Some(visible) = self.observed.get_mut(id) else {
                continue;
            };
            let now = viewport.contains(&rect, self.padding);
            if now != *visible {
                *visible = now;
                if now {
                    change.entered.push(id.to_string());
                } else {
                    change.left.push(id.to_string());
                }
            }
        }
        change.entered.sort();
        change.left.sort();
        change
    }
}
