//! Sampling window and guarded derivation helpers.

/// Per-resource derivation state.
///
/// Holds the values captured on the previous tick. Before the first tick the
/// previous value is `T::default()`, so deltas on the first sample are taken
/// against a zero baseline.
#[derive(Debug, Clone, Default)]
pub struct SampleWindow<T> {
    previous: T,
}

impl<T: Default + Clone> SampleWindow<T> {
    pub fn new() -> Self {
        Self {
            previous: T::default(),
        }
    }

    /// Values from the previous tick, or the zero baseline.
    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// Replace the previous values with `current`, returning the old ones.
    pub fn advance(&mut self, current: T) -> T {
        std::mem::replace(&mut self.previous, current)
    }
}

/// `100 * part / whole`, truncated. Non-finite results (zero `whole`) are 0.
pub fn percent(part: u64, whole: u64) -> i64 {
    let p = part as f64 / whole as f64 * 100.0;
    if p.is_finite() {
        p as i64
    } else {
        0
    }
}

/// Convert a raw counter into a gauge value, saturating at `i64::MAX`.
pub fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
