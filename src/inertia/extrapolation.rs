//! Closed-form per-axis extrapolation under constant deceleration.

use crate::geometry::is_zero;

/// What an axis asks of the extrapolator: a release velocity and either a
/// distance to travel or a deceleration to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisMotion {
    pub velocity: Option<f64>,
    pub offset: Option<f64>,
    pub deceleration: Option<f64>,
}

impl AxisMotion {
    pub const DISABLED: Self = Self {
        velocity: None,
        offset: None,
        deceleration: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    pub initial_value: f64,
    pub motion: AxisMotion,
    pub min_bound: f64,
    pub max_bound: f64,
}

impl InitialState {
    pub fn unbounded(initial_value: f64, motion: AxisMotion) -> Self {
        Self {
            initial_value,
            motion,
            min_bound: -f64::MAX,
            max_bound: f64::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrapolationResult {
    /// The axis has no velocity and takes no part.
    Skip,
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub value: f64,
    pub delta: f64,
    pub result: ExtrapolationResult,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrapolationState {
    initial_value: f64,
    initial_velocity: f64,
    /// Milliseconds until the axis comes to rest; infinite without deceleration.
    duration: f64,
    /// Same sign as the velocity; subtracted in the motion equation.
    deceleration: f64,
    final_value: f64,
    previous_value: f64,
    min_bound: f64,
    max_bound: f64,
    result: ExtrapolationResult,
}

impl ExtrapolationState {
    pub fn prepare(init: &InitialState) -> Self {
        let mut state = Self {
            initial_value: init.initial_value,
            initial_velocity: 0.0,
            duration: 0.0,
            deceleration: 0.0,
            final_value: init.initial_value,
            previous_value: init.initial_value,
            min_bound: init.min_bound,
            max_bound: init.max_bound,
            result: ExtrapolationResult::Skip,
        };

        let Some(velocity) = init.motion.velocity else {
            return state;
        };
        if is_zero(velocity) {
            state.result = ExtrapolationResult::Stop;
            return state;
        }

        let speed = velocity.abs();
        let sign = velocity.signum();
        let mut offset = init.motion.offset.map(f64::abs);
        let mut deceleration;
        let duration;

        match offset {
            Some(o) => {
                duration = 2.0 * (o / velocity).abs();
                deceleration = if duration > 0.0 {
                    speed / duration
                } else {
                    f64::INFINITY
                };
            }
            None => {
                deceleration = init.motion.deceleration.map_or(0.0, f64::abs);
                duration = if is_zero(deceleration) {
                    f64::INFINITY
                } else {
                    speed / deceleration
                };
            }
        }

        if is_zero(deceleration) {
            deceleration = 0.0;
            state.duration = f64::INFINITY;
            offset = Some(f64::INFINITY);
        } else {
            state.duration = duration;
        }
        let offset = offset.unwrap_or(speed * state.duration / 2.0);

        state.initial_velocity = velocity;
        state.deceleration = sign * deceleration;
        state.final_value = init.initial_value + sign * offset;
        state.result = ExtrapolationResult::Continue;
        state
    }

    pub fn result(&self) -> ExtrapolationResult {
        self.result
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn deceleration(&self) -> f64 {
        self.deceleration
    }

    pub fn final_value(&self) -> f64 {
        self.final_value
    }

    pub fn initial_value(&self) -> f64 {
        self.initial_value
    }

    pub fn previous_value(&self) -> f64 {
        self.previous_value
    }

    /// Advances the axis to `elapsed_ms` since inertia started.
    pub fn extrapolate(&mut self, elapsed_ms: f64) -> AxisSample {
        if self.result != ExtrapolationResult::Continue {
            return AxisSample {
                value: self.previous_value,
                delta: 0.0,
                result: self.result,
            };
        }

        let mut result = ExtrapolationResult::Continue;
        let mut value = if elapsed_ms >= self.duration {
            result = ExtrapolationResult::Stop;
            self.final_value
        } else {
            let t = elapsed_ms;
            self.initial_value + (self.initial_velocity - self.deceleration * t / 2.0) * t
        };

        if value.is_nan() {
            value = self.previous_value;
            result = ExtrapolationResult::Stop;
        }
        if value < self.min_bound {
            value = self.min_bound;
            result = ExtrapolationResult::Stop;
        } else if value > self.max_bound {
            value = self.max_bound;
            result = ExtrapolationResult::Stop;
        }

        let delta = value - self.previous_value;
        self.previous_value = value;
        self.result = result;
        AxisSample {
            value,
            delta,
            result,
        }
    }

    /// Velocity per millisecond at `elapsed_ms`, zero once the axis stopped.
    pub fn velocity_at(&self, elapsed_ms: f64) -> f64 {
        if self.result != ExtrapolationResult::Continue {
            return 0.0;
        }
        self.initial_velocity - self.deceleration * elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion(velocity: f64, offset: Option<f64>, deceleration: Option<f64>) -> AxisMotion {
        AxisMotion {
            velocity: Some(velocity),
            offset,
            deceleration,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn deceleration_gives_duration_and_offset() {
        let s = ExtrapolationState::prepare(&InitialState::unbounded(
            0.0,
            motion(1.0, None, Some(0.001)),
        ));
        assert!(close(s.duration(), 1000.0));
        assert!(close(s.final_value(), 500.0));
        assert_eq!(s.result(), ExtrapolationResult::Continue);
    }

    #[test]
    fn offset_gives_duration_and_deceleration() {
        let s = ExtrapolationState::prepare(&InitialState::unbounded(
            10.0,
            motion(-2.0, Some(100.0), None),
        ));
        assert!(close(s.duration(), 100.0));
        assert!(close(s.deceleration(), -0.02));
        assert!(close(s.final_value(), -90.0));
    }

    #[test]
    fn zero_velocity_stops_immediately() {
        let mut s = ExtrapolationState::prepare(&InitialState::unbounded(
            3.0,
            motion(0.0, None, Some(0.001)),
        ));
        assert_eq!(s.result(), ExtrapolationResult::Stop);
        let sample = s.extrapolate(10.0);
        assert_eq!(sample.value, 3.0);
        assert_eq!(sample.delta, 0.0);
    }

    #[test]
    fn missing_velocity_skips_axis() {
        let mut s = ExtrapolationState::prepare(&InitialState::unbounded(7.0, AxisMotion::DISABLED));
        assert_eq!(s.extrapolate(5.0).result, ExtrapolationResult::Skip);
        assert_eq!(s.velocity_at(5.0), 0.0);
    }

    #[test]
    fn zero_deceleration_never_finishes() {
        let mut s = ExtrapolationState::prepare(&InitialState::unbounded(
            0.0,
            motion(2.0, None, Some(0.0)),
        ));
        assert_eq!(s.duration(), f64::INFINITY);
        assert_eq!(s.final_value(), f64::INFINITY);
        let sample = s.extrapolate(1_000.0);
        assert_eq!(sample.value, 2_000.0);
        assert_eq!(sample.result, ExtrapolationResult::Continue);
    }

    #[test]
    fn motion_follows_kinematics_then_clamps() {
        let mut s = ExtrapolationState::prepare(&InitialState::unbounded(
            0.0,
            motion(1.0, None, Some(0.001)),
        ));
        let mid = s.extrapolate(500.0);
        assert!(close(mid.value, 375.0));
        assert!(close(s.velocity_at(500.0), 0.5));

        let end = s.extrapolate(2_000.0);
        assert!(close(end.value, 500.0));
        assert!(close(end.delta, 125.0));
        assert_eq!(end.result, ExtrapolationResult::Stop);

        let after = s.extrapolate(3_000.0);
        assert_eq!(after.delta, 0.0);
        assert_eq!(s.velocity_at(3_000.0), 0.0);
    }

    #[test]
    fn bound_collision_stops_axis() {
        let mut s = ExtrapolationState::prepare(&InitialState {
            initial_value: 0.0,
            motion: motion(-1.0, None, Some(0.001)),
            min_bound: -10.0,
            max_bound: f64::MAX,
        });
        assert_eq!(s.extrapolate(5.0).result, ExtrapolationResult::Continue);
        let hit = s.extrapolate(100.0);
        assert_eq!(hit.value, -10.0);
        assert_eq!(hit.result, ExtrapolationResult::Stop);
    }

    #[test]
    fn zero_offset_finishes_at_once() {
        let mut s = ExtrapolationState::prepare(&InitialState::unbounded(
            4.0,
            motion(1.0, Some(0.0), None),
        ));
        let sample = s.extrapolate(0.0);
        assert_eq!(sample.value, 4.0);
        assert_eq!(sample.result, ExtrapolationResult::Stop);
    }
}
