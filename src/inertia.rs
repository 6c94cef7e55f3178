//! Post-release inertia: extrapolates translation, rotation and expansion
//! under constant deceleration until every axis comes to rest.

pub mod behavior;
pub mod extrapolation;

use kurbo::Point;
use log::debug;

use crate::error::{ManipulationError, Result, check_timestamp, require_finite};
use crate::events::{ManipulationDelta, ManipulationEvent, ManipulationVelocities};
use crate::geometry::{TICKS_PER_MS, is_zero};

pub use behavior::{
    InertiaExpansionBehavior, InertiaRotationBehavior, InertiaTranslationBehavior, MINIMUM_RADIUS,
};
use extrapolation::{ExtrapolationResult, ExtrapolationState, InitialState};

pub const DEFAULT_TRANSLATION_DECELERATION: f64 = 0.00096;
pub const DEFAULT_ROTATION_DECELERATION: f64 = 0.0000125;
pub const DEFAULT_EXPANSION_DECELERATION: f64 = 0.0001;

/// Decelerations applied when inertia starts from release velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaDefaults {
    /// Units per millisecond squared.
    pub translation_deceleration: f64,
    /// Radians per millisecond squared.
    pub rotation_deceleration: f64,
    pub expansion_deceleration: f64,
}

impl Default for InertiaDefaults {
    fn default() -> Self {
        Self {
            translation_deceleration: DEFAULT_TRANSLATION_DECELERATION,
            rotation_deceleration: DEFAULT_ROTATION_DECELERATION,
            expansion_deceleration: DEFAULT_EXPANSION_DECELERATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertiaState {
    NotInitialized,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct Axes {
    translation_x: ExtrapolationState,
    translation_y: ExtrapolationState,
    rotation: ExtrapolationState,
    expansion: ExtrapolationState,
}

#[derive(Debug, Clone, Copy)]
struct Run {
    axes: Axes,
    initial_timestamp: i64,
    previous_timestamp: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InertiaProcessor {
    initial_origin: Point,
    translation: InertiaTranslationBehavior,
    rotation: InertiaRotationBehavior,
    expansion: InertiaExpansionBehavior,
    run: Option<Run>,
    completed: bool,
}

impl InertiaProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a processor with the velocities a manipulation ended with.
    ///
    /// Axes released at rest get no velocity and take no part.
    pub fn from_release(
        origin: Point,
        velocities: &ManipulationVelocities,
        defaults: &InertiaDefaults,
        initial_radius: f64,
    ) -> Result<Self> {
        let mut p = Self::new();
        p.set_initial_origin(origin)?;

        let mut translation = InertiaTranslationBehavior::default();
        if !is_zero(velocities.linear_x) || !is_zero(velocities.linear_y) {
            translation.set_initial_velocity(velocities.linear_x, velocities.linear_y)?;
            translation.set_desired_deceleration(defaults.translation_deceleration)?;
        }

        let mut rotation = InertiaRotationBehavior::default();
        if !is_zero(velocities.angular) {
            rotation.set_initial_velocity(velocities.angular)?;
            rotation.set_desired_deceleration(defaults.rotation_deceleration)?;
        }

        let mut expansion = InertiaExpansionBehavior::default();
        expansion.set_initial_radius(initial_radius.max(MINIMUM_RADIUS))?;
        if !is_zero(velocities.expansion_x) || !is_zero(velocities.expansion_y) {
            expansion.set_initial_velocity(velocities.expansion_x, velocities.expansion_y)?;
            expansion.set_desired_deceleration(defaults.expansion_deceleration)?;
        }

        p.set_translation_behavior(translation)?;
        p.set_rotation_behavior(rotation)?;
        p.set_expansion_behavior(expansion)?;
        Ok(p)
    }

    pub fn state(&self) -> InertiaState {
        match (&self.run, self.completed) {
            (_, true) => InertiaState::Completed,
            (Some(_), false) => InertiaState::Running,
            (None, false) => InertiaState::NotInitialized,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == InertiaState::Running
    }

    pub fn initial_origin_x(&self) -> f64 {
        self.initial_origin.x
    }

    pub fn initial_origin_y(&self) -> f64 {
        self.initial_origin.y
    }

    pub fn translation_behavior(&self) -> &InertiaTranslationBehavior {
        &self.translation
    }

    pub fn rotation_behavior(&self) -> &InertiaRotationBehavior {
        &self.rotation
    }

    pub fn expansion_behavior(&self) -> &InertiaExpansionBehavior {
        &self.expansion
    }

    pub fn set_initial_origin_x(&mut self, x: f64) -> Result<()> {
        self.ensure_idle("initial_origin_x")?;
        require_finite("initial_origin_x", x)?;
        self.initial_origin.x = x;
        self.reset();
        Ok(())
    }

    pub fn set_initial_origin_y(&mut self, y: f64) -> Result<()> {
        self.ensure_idle("initial_origin_y")?;
        require_finite("initial_origin_y", y)?;
        self.initial_origin.y = y;
        self.reset();
        Ok(())
    }

    pub fn set_initial_origin(&mut self, origin: Point) -> Result<()> {
        self.ensure_idle("initial_origin")?;
        require_finite("initial_origin_x", origin.x)?;
        require_finite("initial_origin_y", origin.y)?;
        self.initial_origin = origin;
        self.reset();
        Ok(())
    }

    pub fn set_translation_behavior(&mut self, behavior: InertiaTranslationBehavior) -> Result<()> {
        self.ensure_idle("translation_behavior")?;
        self.translation = behavior;
        self.reset();
        Ok(())
    }

    pub fn set_rotation_behavior(&mut self, behavior: InertiaRotationBehavior) -> Result<()> {
        self.ensure_idle("rotation_behavior")?;
        self.rotation = behavior;
        self.reset();
        Ok(())
    }

    pub fn set_expansion_behavior(&mut self, behavior: InertiaExpansionBehavior) -> Result<()> {
        self.ensure_idle("expansion_behavior")?;
        self.expansion = behavior;
        self.reset();
        Ok(())
    }

    /// Advances inertia to `timestamp` (100ns ticks).
    ///
    /// The first call validates the behaviors and starts the run. Returns
    /// `None` once inertia has completed.
    pub fn process(&mut self, timestamp: i64) -> Result<Option<ManipulationEvent>> {
        self.advance(timestamp, false)
    }

    /// Stops inertia at `timestamp`. Always yields `Completed` unless the run
    /// already finished.
    pub fn complete(&mut self, timestamp: i64) -> Result<Option<ManipulationEvent>> {
        self.advance(timestamp, true)
    }

    fn ensure_idle(&self, property: &'static str) -> Result<()> {
        if self.is_running() {
            return Err(ManipulationError::CannotChangeWhileRunning(property));
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.run = None;
        self.completed = false;
    }

    fn prepare(&self, timestamp: i64) -> Result<Run> {
        let (tx, ty) = self.translation.axis_motions()?;
        let rotation = self.rotation.axis_motion()?;
        let expansion = self.expansion.axis_motion()?;

        let radius = self.expansion.initial_radius();
        let axes = Axes {
            translation_x: ExtrapolationState::prepare(&InitialState::unbounded(
                self.initial_origin.x,
                tx,
            )),
            translation_y: ExtrapolationState::prepare(&InitialState::unbounded(
                self.initial_origin.y,
                ty,
            )),
            rotation: ExtrapolationState::prepare(&InitialState::unbounded(0.0, rotation)),
            expansion: ExtrapolationState::prepare(&InitialState {
                initial_value: 0.0,
                motion: expansion,
                min_bound: MINIMUM_RADIUS - radius,
                max_bound: f64::MAX,
            }),
        };
        Ok(Run {
            axes,
            initial_timestamp: timestamp,
            previous_timestamp: timestamp,
        })
    }

    fn advance(&mut self, timestamp: i64, force: bool) -> Result<Option<ManipulationEvent>> {
        if self.completed {
            return Ok(None);
        }

        let mut run = match self.run {
            Some(run) => {
                check_timestamp(timestamp, run.previous_timestamp)?;
                run
            }
            None => {
                let run = self.prepare(timestamp)?;
                debug!(
                    "inertia started at ({:.2}, {:.2}) t={}",
                    self.initial_origin.x, self.initial_origin.y, timestamp
                );
                run
            }
        };

        let mut force = force;
        let mut elapsed = timestamp.wrapping_sub(run.initial_timestamp);
        if elapsed < 0 {
            elapsed = i64::MAX;
            force = true;
        }
        let elapsed_ms = elapsed as f64 / TICKS_PER_MS;

        let axes = &mut run.axes;
        let tx = axes.translation_x.extrapolate(elapsed_ms);
        let ty = axes.translation_y.extrapolate(elapsed_ms);
        let rot = axes.rotation.extrapolate(elapsed_ms);
        let exp = axes.expansion.extrapolate(elapsed_ms);
        let velocities = ManipulationVelocities {
            linear_x: axes.translation_x.velocity_at(elapsed_ms),
            linear_y: axes.translation_y.velocity_at(elapsed_ms),
            angular: axes.rotation.velocity_at(elapsed_ms),
            expansion_x: axes.expansion.velocity_at(elapsed_ms),
            expansion_y: axes.expansion.velocity_at(elapsed_ms),
        };
        run.previous_timestamp = timestamp;

        let radius = self.expansion.initial_radius();
        let origin = Point::new(tx.value, ty.value);
        let total = ManipulationDelta::new(
            tx.value - self.initial_origin.x,
            ty.value - self.initial_origin.y,
            rot.value,
            (radius + exp.value) / radius,
            exp.value,
        );

        let done = force
            || [tx, ty, rot, exp]
                .iter()
                .all(|s| s.result != ExtrapolationResult::Continue);
        if done {
            self.run = Some(run);
            self.completed = true;
            debug!(
                "inertia completed after {:.1}ms: translation=({:.2}, {:.2}) rotation={:.4}",
                elapsed_ms, total.translation_x, total.translation_y, total.rotation
            );
            return Ok(Some(ManipulationEvent::Completed {
                origin_x: origin.x,
                origin_y: origin.y,
                velocities,
                total,
            }));
        }

        let current_radius = radius + exp.value;
        let previous_radius = current_radius - exp.delta;
        let delta = ManipulationDelta {
            translation_x: tx.delta,
            translation_y: ty.delta,
            rotation: rot.delta,
            scale_x: current_radius / previous_radius,
            scale_y: current_radius / previous_radius,
            expansion_x: exp.delta,
            expansion_y: exp.delta,
        };
        self.run = Some(run);
        Ok(Some(ManipulationEvent::Delta {
            origin_x: origin.x,
            origin_y: origin.y,
            velocities,
            delta,
            cumulative: total,
        }))
    }
}
