//! Slew-rate limiting between consecutive cycles.

/// Bound `target` to within `max_rate` of `previous_achieved`.
///
/// Returns `target` unchanged when it is already within the bound,
/// otherwise steps `max_rate` from `previous_achieved` toward it.
pub fn clamp(target: f64, previous_achieved: f64, max_rate: f64) -> f64 {
    let delta = target - previous_achieved;
    if delta.abs() <= max_rate {
        target
    } else if delta > 0.0 {
        previous_achieved + max_rate
    } else {
        previous_achieved - max_rate
    }
}

/// [`clamp`] with a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiter {
    max_rate: f64,
}

impl RateLimiter {
    pub fn new(max_rate: f64) -> Self {
        Self { max_rate }
    }

    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }

    pub fn clamp(&self, target: f64, previous_achieved: f64) -> f64 {
        clamp(target, previous_achieved, self.max_rate)
    }
}
