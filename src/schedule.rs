//! Threshold schedules: how the acceptance threshold moves toward the goal each round.
//!
//! Direction and slack are always explicit. Every schedule clamps its proposal at the goal,
//! so the threshold never overshoots it.

use crate::error::GwwError;

/// Which way fitness improves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Lower fitness is better; thresholds fall.
    Minimize,
    /// Higher fitness is better; thresholds rise.
    Maximize,
}

impl Direction {
    /// Whether `candidate` is strictly better than `current`.
    #[inline]
    pub fn improves(self, candidate: f64, current: f64) -> bool {
        match self {
            Direction::Minimize => candidate < current,
            Direction::Maximize => candidate > current,
        }
    }

    /// Whether a particle of fitness `fitness` survives a cull at `threshold`.
    #[inline]
    pub fn passes(self, fitness: f64, threshold: f64) -> bool {
        match self {
            Direction::Minimize => fitness <= threshold,
            Direction::Maximize => fitness >= threshold,
        }
    }

    /// Whether `threshold` has reached or passed `goal`.
    #[inline]
    pub fn reached(self, threshold: f64, goal: f64) -> bool {
        self.passes(threshold, goal)
    }

    /// The threshold every particle passes.
    #[inline]
    pub fn loosest(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }

    /// `value` moved by `amount` in the improving direction.
    #[inline]
    pub fn advance(self, value: f64, amount: f64) -> f64 {
        match self {
            Direction::Minimize => value - amount,
            Direction::Maximize => value + amount,
        }
    }

    /// `value`, or `goal` if `value` is already past it.
    #[inline]
    pub fn clamp_to_goal(self, value: f64, goal: f64) -> f64 {
        if self.reached(value, goal) { goal } else { value }
    }
}

/// Median of `values`; the mean of the two middle values for even lengths.
/// Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// A strategy for the next acceptance threshold.
pub trait ThresholdSchedule: Send + Sync {
    /// Which way the threshold moves.
    fn direction(&self) -> Direction;

    /// Threshold at which the search succeeds.
    fn goal(&self) -> f64;

    /// Threshold in force before the first round.
    fn initial(&self) -> f64;

    /// Proposes the next threshold given the current one and the population's fitness after
    /// mixing. The search stalls if the proposal does not strictly improve on `current`.
    fn propose(&self, current: f64, fitness: &[f64]) -> f64;

    /// # Errors
    /// Returns [`GwwError::Validation`] for parameters that would break monotonicity.
    fn validate(&self) -> Result<(), GwwError>;
}

/// Checks shared by every schedule: finite goal, initial threshold not already at the goal.
fn validate_common(direction: Direction, goal: f64, initial: Option<f64>) -> Result<(), GwwError> {
    if !goal.is_finite() {
        return Err(GwwError::validation(format!("goal must be finite, got {goal}")));
    }
    if let Some(t) = initial {
        if t.is_nan() {
            return Err(GwwError::validation("initial threshold is NaN"));
        }
        if direction.reached(t, goal) {
            return Err(GwwError::validation(format!(
                "initial threshold {t} is already at or past the goal {goal}"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Median + slack
// ============================================================================

/// Next threshold = population median moved `slack` toward the goal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MedianSchedule {
    /// Which way fitness improves.
    pub direction: Direction,
    /// Success threshold; proposals are clamped here.
    pub goal: f64,
    /// Non-negative distance past the median.
    pub slack: f64,
    /// Threshold before the first round; unbounded when `None`.
    pub initial: Option<f64>,
}

impl MedianSchedule {
    /// Plain median schedule: no slack, unbounded start.
    pub fn new(direction: Direction, goal: f64) -> Self {
        Self {
            direction,
            goal,
            slack: 0.0,
            initial: None,
        }
    }

    /// Sets the slack.
    pub fn with_slack(mut self, slack: f64) -> Self {
        self.slack = slack;
        self
    }

    /// Starts from a finite threshold.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }
}

impl ThresholdSchedule for MedianSchedule {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn goal(&self) -> f64 {
        self.goal
    }

    fn initial(&self) -> f64 {
        self.initial.unwrap_or(self.direction.loosest())
    }

    fn propose(&self, current: f64, fitness: &[f64]) -> f64 {
        let Some(m) = median(fitness) else {
            return current;
        };
        self.direction
            .clamp_to_goal(self.direction.advance(m, self.slack), self.goal)
    }

    fn validate(&self) -> Result<(), GwwError> {
        validate_common(self.direction, self.goal, self.initial)?;
        if !(self.slack.is_finite() && self.slack >= 0.0) {
            return Err(GwwError::validation(format!(
                "slack must be finite and non-negative, got {}",
                self.slack
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Fixed step
// ============================================================================

/// Next threshold = current threshold moved by a constant `step`.
///
/// While the threshold is still unbounded (before the first cull) the step is taken from
/// the population median instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedStepSchedule {
    /// Which way fitness improves.
    pub direction: Direction,
    /// Success threshold; proposals are clamped here.
    pub goal: f64,
    /// Positive distance moved per round.
    pub step: f64,
    /// Threshold before the first round; unbounded when `None`.
    pub initial: Option<f64>,
}

impl FixedStepSchedule {
    /// Moves `step` per round from an unbounded start.
    pub fn new(direction: Direction, goal: f64, step: f64) -> Self {
        Self {
            direction,
            goal,
            step,
            initial: None,
        }
    }

    /// Starts from a finite threshold.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }
}

impl ThresholdSchedule for FixedStepSchedule {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn goal(&self) -> f64 {
        self.goal
    }

    fn initial(&self) -> f64 {
        self.initial.unwrap_or(self.direction.loosest())
    }

    fn propose(&self, current: f64, fitness: &[f64]) -> f64 {
        let base = if current.is_finite() {
            current
        } else {
            match median(fitness) {
                Some(m) => m,
                None => return current,
            }
        };
        self.direction
            .clamp_to_goal(self.direction.advance(base, self.step), self.goal)
    }

    fn validate(&self) -> Result<(), GwwError> {
        validate_common(self.direction, self.goal, self.initial)?;
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(GwwError::validation(format!(
                "step must be finite and positive, got {}",
                self.step
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Fraction of the remaining gap
// ============================================================================

/// Next threshold = current + `fraction` of the remaining distance to the goal.
///
/// The gap is measured from the population median while the threshold is unbounded. A
/// proposal within `GOAL_SNAP` of the goal is snapped onto it so the run can terminate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FractionSchedule {
    /// Which way fitness improves.
    pub direction: Direction,
    /// Success threshold; proposals are clamped here.
    pub goal: f64,
    /// Share of the remaining gap closed per round, in `(0, 1]`.
    pub fraction: f64,
    /// Threshold before the first round; unbounded when `None`.
    pub initial: Option<f64>,
}

const GOAL_SNAP: f64 = 1e-9;

impl FractionSchedule {
    /// Closes `fraction` of the gap per round from an unbounded start.
    pub fn new(direction: Direction, goal: f64, fraction: f64) -> Self {
        Self {
            direction,
            goal,
            fraction,
            initial: None,
        }
    }

    /// Starts from a finite threshold.
    pub fn with_initial(mut self, initial: f64) -> Self {
        self.initial = Some(initial);
        self
    }
}

impl ThresholdSchedule for FractionSchedule {
    fn direction(&self) -> Direction {
        self.direction
    }

    fn goal(&self) -> f64 {
        self.goal
    }

    fn initial(&self) -> f64 {
        self.initial.unwrap_or(self.direction.loosest())
    }

    fn propose(&self, current: f64, fitness: &[f64]) -> f64 {
        let base = if current.is_finite() {
            current
        } else {
            match median(fitness) {
                Some(m) => m,
                None => return current,
            }
        };
        let next = base + self.fraction * (self.goal - base);
        if (next - self.goal).abs() < GOAL_SNAP {
            self.goal
        } else {
            self.direction.clamp_to_goal(next, self.goal)
        }
    }

    fn validate(&self) -> Result<(), GwwError> {
        validate_common(self.direction, self.goal, self.initial)?;
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(GwwError::validation(format!(
                "fraction must lie in (0, 1], got {}",
                self.fraction
            )));
        }
        Ok(())
    }
}
