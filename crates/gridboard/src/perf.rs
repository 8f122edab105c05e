//! Render timing per widget type.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Aggregated render timings of one widget type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderTiming {
    /// Renders measured.
    pub count: u64,
    /// Sum of all render times.
    pub total: Duration,
    /// Slowest render.
    pub max: Duration,
    /// Renders slower than the budget.
    pub over_budget: u64,
}

impl RenderTiming {
    /// Mean render time, zero before the first render.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Render timings keyed by widget type, checked against a frame budget.
#[derive(Debug, Clone)]
pub struct RenderStats {
    budget: Duration,
    by_type: BTreeMap<String, RenderTiming>,
}

impl RenderStats {
    /// Creates empty stats with `budget` as the per-render limit.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            by_type: BTreeMap::new(),
        }
    }

    /// Per-render limit.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Records one render. Returns `true` if it exceeded the budget.
    pub fn record(&mut self, widget_type: &str, elapsed: Duration) -> bool {
        let timing = self.by_type.entry(widget_type.to_string()).or_default();
        timing.count += 1;
        timing.total += elapsed;
        timing.max = timing.max.max(elapsed);
        let over = elapsed > self.budget;
        if over {
            timing.over_budget += 1;
            tracing::warn!(
                "Render of '{}' took {:?}, over the {:?} budget",
                widget_type,
                elapsed,
                self.budget
            );
        }
        over
    }

    /// Runs `f`, recording its wall-clock time under `widget_type`.
    pub fn measure<T>(&mut self, widget_type: &str, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let value = f();
        self.record(widget_type, started.elapsed());
        value
    }

    /// Timings for `widget_type`.
    pub fn get(&self, widget_type: &str) -> Option<&RenderTiming> {
        self.by_type.get(widget_type)
    }

    /// All timings, ordered by type.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RenderTiming)> {
        self.by_type.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renders recorded across every type.
    pub fn total_renders(&self) -> u64 {
        self.by_type.values().map(|t| t.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_aggregates_per_type() {
        let mut stats = RenderStats::new(Duration::from_millis(16));
        assert!(!stats.record("kpi", Duration::from_millis(4)));
        assert!(!stats.record("kpi", Duration::from_millis(8)));
        assert!(stats.record("chart", Duration::from_millis(20)));

        let kpi = stats.get("kpi").expect("kpi");
        assert_eq!(kpi.count, 2);
        assert_eq!(kpi.max, Duration::from_millis(8));
        assert_eq!(kpi.average(), Duration::from_millis(6));
        assert_eq!(kpi.over_budget, 0);
        assert_eq!(stats.get("chart").map(|t| t.over_budget), Some(1));
        assert_eq!(stats.total_renders(), 3);
    }

    #[test]
    fn test_measure_returns_closure_value() {
        let mut stats = RenderStats::new(Duration::from_secs(1));
        let value = stats.measure("note", || 42);
        assert_eq!(value, 42);
        assert_eq!(stats.get("note").map(|t| t.count), Some(1));
    }

    #[test]
    fn test_average_with_count_past_u32_range() {
        let timing = RenderTiming {
            count: 1 << 32,
            total: Duration::from_secs(1 << 32),
            ..RenderTiming::default()
        };
        assert_eq!(timing.average(), Duration::from_secs(1));
    }

    #[test]
    fn test_average_of_empty_timing_is_zero() {
        assert_eq!(RenderTiming::default().average(), Duration::ZERO);
    }
}
