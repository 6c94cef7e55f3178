//! Inertia parameters for translation, rotation and expansion.
//!
//! Setters validate each value as it is assigned. Whether the combination is
//! complete is only checked when inertia starts, so parameters may be filled
//! in any order. For every behavior the target amount and the deceleration
//! exclude each other: setting one clears the other.

use crate::error::{ManipulationError, Result, require_finite, require_finite_non_negative};
use crate::inertia::extrapolation::AxisMotion;

/// Radius an expansion may never shrink below.
pub const MINIMUM_RADIUS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InertiaTranslationBehavior {
    initial_velocity_x: Option<f64>,
    initial_velocity_y: Option<f64>,
    desired_deceleration: Option<f64>,
    desired_displacement: Option<f64>,
}

impl InertiaTranslationBehavior {
    pub fn initial_velocity_x(&self) -> Option<f64> {
        self.initial_velocity_x
    }

    pub fn initial_velocity_y(&self) -> Option<f64> {
        self.initial_velocity_y
    }

    pub fn desired_deceleration(&self) -> Option<f64> {
        self.desired_deceleration
    }

    pub fn desired_displacement(&self) -> Option<f64> {
        self.desired_displacement
    }

    /// Velocity in units per millisecond.
    pub fn set_initial_velocity(&mut self, x: f64, y: f64) -> Result<()> {
        require_finite("initial_velocity_x", x)?;
        require_finite("initial_velocity_y", y)?;
        self.initial_velocity_x = Some(x);
        self.initial_velocity_y = Some(y);
        Ok(())
    }

    pub fn set_initial_velocity_x(&mut self, x: f64) -> Result<()> {
        require_finite("initial_velocity_x", x)?;
        self.initial_velocity_x = Some(x);
        Ok(())
    }

    pub fn set_initial_velocity_y(&mut self, y: f64) -> Result<()> {
        require_finite("initial_velocity_y", y)?;
        self.initial_velocity_y = Some(y);
        Ok(())
    }

    /// Deceleration in units per millisecond squared.
    pub fn set_desired_deceleration(&mut self, deceleration: f64) -> Result<()> {
        require_finite_non_negative("desired_deceleration", deceleration)?;
        self.desired_deceleration = Some(deceleration);
        self.desired_displacement = None;
        Ok(())
    }

    pub fn set_desired_displacement(&mut self, displacement: f64) -> Result<()> {
        require_finite_non_negative("desired_displacement", displacement)?;
        self.desired_displacement = Some(displacement);
        self.desired_deceleration = None;
        Ok(())
    }

    fn has_velocity(&self) -> bool {
        self.initial_velocity_x.is_some() || self.initial_velocity_y.is_some()
    }

    /// Splits the scalar target along the velocity direction.
    pub(crate) fn axis_motions(&self) -> Result<(AxisMotion, AxisMotion)> {
        if !self.has_velocity() {
            return Ok((AxisMotion::DISABLED, AxisMotion::DISABLED));
        }
        if self.desired_deceleration.is_none() && self.desired_displacement.is_none() {
            return Err(ManipulationError::configuration(
                "translation inertia needs a desired deceleration or a desired displacement",
            ));
        }

        let vx = self.initial_velocity_x.unwrap_or(0.0);
        let vy = self.initial_velocity_y.unwrap_or(0.0);
        let (rx, ry) = absolute_ratios(vx, vy);

        let split = |ratio: f64, velocity: Option<f64>| AxisMotion {
            velocity,
            offset: self.desired_displacement.map(|d| d * ratio),
            deceleration: self.desired_deceleration.map(|d| d * ratio),
        };
        Ok((
            split(rx, self.initial_velocity_x),
            split(ry, self.initial_velocity_y),
        ))
    }
}

/// Share of a vector's length carried by each absolute component.
fn absolute_ratios(x: f64, y: f64) -> (f64, f64) {
    let length = x.hypot(y);
    if length == 0.0 || !length.is_finite() {
        return (0.0, 0.0);
    }
    (x.abs() / length, y.abs() / length)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InertiaRotationBehavior {
    initial_velocity: Option<f64>,
    desired_deceleration: Option<f64>,
    desired_rotation: Option<f64>,
}

impl InertiaRotationBehavior {
    pub fn initial_velocity(&self) -> Option<f64> {
        self.initial_velocity
    }

    pub fn desired_deceleration(&self) -> Option<f64> {
        self.desired_deceleration
    }

    pub fn desired_rotation(&self) -> Option<f64> {
        self.desired_rotation
    }

    /// Angular velocity in radians per millisecond.
    pub fn set_initial_velocity(&mut self, velocity: f64) -> Result<()> {
        require_finite("initial_velocity", velocity)?;
        self.initial_velocity = Some(velocity);
        Ok(())
    }

    pub fn set_desired_deceleration(&mut self, deceleration: f64) -> Result<()> {
        require_finite_non_negative("desired_deceleration", deceleration)?;
        self.desired_deceleration = Some(deceleration);
        self.desired_rotation = None;
        Ok(())
    }

    pub fn set_desired_rotation(&mut self, rotation: f64) -> Result<()> {
        require_finite_non_negative("desired_rotation", rotation)?;
        self.desired_rotation = Some(rotation);
        self.desired_deceleration = None;
        Ok(())
    }

    pub(crate) fn axis_motion(&self) -> Result<AxisMotion> {
        if self.initial_velocity.is_none() {
            return Ok(AxisMotion::DISABLED);
        }
        if self.desired_deceleration.is_none() && self.desired_rotation.is_none() {
            return Err(ManipulationError::configuration(
                "rotation inertia needs a desired deceleration or a desired rotation",
            ));
        }
        Ok(AxisMotion {
            velocity: self.initial_velocity,
            offset: self.desired_rotation,
            deceleration: self.desired_deceleration,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertiaExpansionBehavior {
    initial_velocity_x: Option<f64>,
    initial_velocity_y: Option<f64>,
    desired_deceleration: Option<f64>,
    desired_expansion_x: Option<f64>,
    desired_expansion_y: Option<f64>,
    initial_radius: f64,
}

impl Default for InertiaExpansionBehavior {
    fn default() -> Self {
        Self {
            initial_velocity_x: None,
            initial_velocity_y: None,
            desired_deceleration: None,
            desired_expansion_x: None,
            desired_expansion_y: None,
            initial_radius: MINIMUM_RADIUS,
        }
    }
}

impl InertiaExpansionBehavior {
    pub fn initial_velocity_x(&self) -> Option<f64> {
        self.initial_velocity_x
    }

    pub fn initial_velocity_y(&self) -> Option<f64> {
        self.initial_velocity_y
    }

    pub fn desired_deceleration(&self) -> Option<f64> {
        self.desired_deceleration
    }

    pub fn desired_expansion_x(&self) -> Option<f64> {
        self.desired_expansion_x
    }

    pub fn desired_expansion_y(&self) -> Option<f64> {
        self.desired_expansion_y
    }

    pub fn initial_radius(&self) -> f64 {
        self.initial_radius
    }

    /// Expansion velocity in units per millisecond.
    pub fn set_initial_velocity(&mut self, x: f64, y: f64) -> Result<()> {
        require_finite("initial_velocity_x", x)?;
        require_finite("initial_velocity_y", y)?;
        self.initial_velocity_x = Some(x);
        self.initial_velocity_y = Some(y);
        Ok(())
    }

    pub fn set_initial_velocity_x(&mut self, x: f64) -> Result<()> {
        require_finite("initial_velocity_x", x)?;
        self.initial_velocity_x = Some(x);
        Ok(())
    }

    pub fn set_initial_velocity_y(&mut self, y: f64) -> Result<()> {
        require_finite("initial_velocity_y", y)?;
        self.initial_velocity_y = Some(y);
        Ok(())
    }

    pub fn set_desired_deceleration(&mut self, deceleration: f64) -> Result<()> {
        require_finite_non_negative("desired_deceleration", deceleration)?;
        self.desired_deceleration = Some(deceleration);
        self.desired_expansion_x = None;
        self.desired_expansion_y = None;
        Ok(())
    }

    pub fn set_desired_expansion(&mut self, x: f64, y: f64) -> Result<()> {
        require_finite_non_negative("desired_expansion_x", x)?;
        require_finite_non_negative("desired_expansion_y", y)?;
        self.desired_expansion_x = Some(x);
        self.desired_expansion_y = Some(y);
        self.desired_deceleration = None;
        Ok(())
    }

    pub fn set_initial_radius(&mut self, radius: f64) -> Result<()> {
        require_finite("initial_radius", radius)?;
        if radius < MINIMUM_RADIUS {
            return Err(ManipulationError::invalid_argument(
                "initial_radius",
                format!("must be at least {MINIMUM_RADIUS}, got {radius}"),
            ));
        }
        self.initial_radius = radius;
        Ok(())
    }

    pub(crate) fn axis_motion(&self) -> Result<AxisMotion> {
        let velocity = proportional(
            "expansion velocity",
            self.initial_velocity_x,
            self.initial_velocity_y,
        )?;
        let expansion = proportional(
            "desired expansion",
            self.desired_expansion_x,
            self.desired_expansion_y,
        )?;
        if velocity.is_none() {
            return Ok(AxisMotion::DISABLED);
        }
        if self.desired_deceleration.is_none() && expansion.is_none() {
            return Err(ManipulationError::configuration(
                "expansion inertia needs a desired deceleration or a desired expansion",
            ));
        }
        Ok(AxisMotion {
            velocity,
            offset: expansion,
            deceleration: self.desired_deceleration,
        })
    }
}

/// Only uniform expansion is supported: both components must agree.
fn proportional(what: &str, x: Option<f64>, y: Option<f64>) -> Result<Option<f64>> {
    match (x, y) {
        (None, None) => Ok(None),
        (Some(x), Some(y)) if x == y => Ok(Some(x)),
        _ => Err(ManipulationError::configuration(format!(
            "{what} must be proportional: x={x:?} y={y:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_deceleration_exclude_each_other() {
        let mut t = InertiaTranslationBehavior::default();
        t.set_desired_displacement(50.0).unwrap();
        t.set_desired_deceleration(0.01).unwrap();
        assert_eq!(t.desired_displacement(), None);
        assert_eq!(t.desired_deceleration(), Some(0.01));

        let mut r = InertiaRotationBehavior::default();
        r.set_desired_deceleration(0.01).unwrap();
        r.set_desired_rotation(1.0).unwrap();
        assert_eq!(r.desired_deceleration(), None);
    }

    #[test]
    fn setters_reject_bad_values() {
        let mut t = InertiaTranslationBehavior::default();
        assert!(t.set_initial_velocity(f64::NAN, 0.0).is_err());
        assert!(t.set_desired_deceleration(-1.0).is_err());
        assert_eq!(t, InertiaTranslationBehavior::default());

        let mut e = InertiaExpansionBehavior::default();
        assert!(e.set_initial_radius(0.5).is_err());
        assert_eq!(e.initial_radius(), MINIMUM_RADIUS);
    }

    #[test]
    fn no_velocity_means_disabled() {
        let t = InertiaTranslationBehavior::default();
        assert_eq!(
            t.axis_motions().unwrap(),
            (AxisMotion::DISABLED, AxisMotion::DISABLED)
        );
        assert_eq!(
            InertiaRotationBehavior::default().axis_motion().unwrap(),
            AxisMotion::DISABLED
        );
    }

    #[test]
    fn velocity_without_target_is_a_configuration_error() {
        let mut t = InertiaTranslationBehavior::default();
        t.set_initial_velocity(1.0, 0.0).unwrap();
        assert!(matches!(
            t.axis_motions(),
            Err(ManipulationError::InvalidConfiguration(_))
        ));

        let mut r = InertiaRotationBehavior::default();
        r.set_initial_velocity(0.1).unwrap();
        assert!(r.axis_motion().is_err());
    }

    #[test]
    fn translation_target_follows_velocity_direction() {
        let mut t = InertiaTranslationBehavior::default();
        t.set_initial_velocity(3.0, -4.0).unwrap();
        t.set_desired_displacement(10.0).unwrap();
        let (x, y) = t.axis_motions().unwrap();
        assert!((x.offset.unwrap() - 6.0).abs() < 1e-12);
        assert!((y.offset.unwrap() - 8.0).abs() < 1e-12);
        assert_eq!(y.velocity, Some(-4.0));
        assert_eq!(x.deceleration, None);
    }

    #[test]
    fn expansion_must_be_proportional() {
        let mut e = InertiaExpansionBehavior::default();
        e.set_initial_velocity(2.0, 3.0).unwrap();
        e.set_desired_deceleration(0.001).unwrap();
        let err = e.axis_motion().unwrap_err();
        assert!(err.to_string().contains("must be proportional"));

        e.set_initial_velocity(2.0, 2.0).unwrap();
        assert_eq!(e.axis_motion().unwrap().velocity, Some(2.0));

        let mut half = InertiaExpansionBehavior::default();
        half.set_initial_velocity_x(1.0).unwrap();
        assert!(half.axis_motion().is_err());
    }
}
