//! Processor settings consumed by the manipulation sequence.

use kurbo::Point;
use std::ops::{BitOr, BitOrAssign};

use crate::error::{ManipulationError, Result, require_finite, require_finite_non_negative};

/// Default minimum distance from the composite origin for a contact to take
/// part in rotation and scale.
pub const DEFAULT_MINIMUM_SCALE_ROTATE_RADIUS: f64 = 20.0;

/// Smallest pivot radius accepted.
pub const MINIMUM_PIVOT_RADIUS: f64 = 1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SupportedManipulations(u8);

impl SupportedManipulations {
    pub const NONE: Self = Self(0);
    pub const TRANSLATE_X: Self = Self(0b0001);
    pub const TRANSLATE_Y: Self = Self(0b0010);
    pub const TRANSLATE: Self = Self(0b0011);
    pub const ROTATE: Self = Self(0b0100);
    pub const SCALE: Self = Self(0b1000);
    pub const ALL: Self = Self(0b1111);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Parses a profile-style name such as `"translate_x"` or `"all"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let flag = match name.trim().to_ascii_lowercase().as_str() {
            "none" => Self::NONE,
            "translate_x" => Self::TRANSLATE_X,
            "translate_y" => Self::TRANSLATE_Y,
            "translate" => Self::TRANSLATE,
            "rotate" => Self::ROTATE,
            "scale" => Self::SCALE,
            "all" => Self::ALL,
            _ => return None,
        };
        Some(flag)
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut out = Self::NONE;
        for name in names {
            let name = name.as_ref();
            out |= Self::from_name(name).ok_or_else(|| {
                ManipulationError::invalid_argument(
                    "supported_manipulations",
                    format!("unknown manipulation '{name}'"),
                )
            })?;
        }
        Ok(out)
    }
}

impl BitOr for SupportedManipulations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SupportedManipulations {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Fixed point used for single-contact rotation.
///
/// Either part may be unset: without a position there is no pivot rotation,
/// without a radius the rotation is never dampened.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManipulationPivot {
    position: Option<Point>,
    radius: Option<f64>,
}

impl ManipulationPivot {
    pub fn new(x: f64, y: f64, radius: f64) -> Result<Self> {
        let mut pivot = Self::default();
        pivot.set_position(Some(Point::new(x, y)))?;
        pivot.set_radius(Some(radius))?;
        Ok(pivot)
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn radius(&self) -> Option<f64> {
        self.radius
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn set_position(&mut self, position: Option<Point>) -> Result<()> {
        if let Some(p) = position {
            require_finite("pivot.x", p.x)?;
            require_finite("pivot.y", p.y)?;
        }
        self.position = position;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: Option<f64>) -> Result<()> {
        if let Some(r) = radius {
            require_finite("pivot.radius", r)?;
            if r < MINIMUM_PIVOT_RADIUS {
                return Err(ManipulationError::invalid_argument(
                    "pivot.radius",
                    format!("must be at least {MINIMUM_PIVOT_RADIUS}, got {r}"),
                ));
            }
        }
        self.radius = radius;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationSettings {
    supported: SupportedManipulations,
    pivot: Option<ManipulationPivot>,
    minimum_scale_rotate_radius: f64,
}

impl Default for ManipulationSettings {
    fn default() -> Self {
        Self::new(SupportedManipulations::ALL)
    }
}

impl ManipulationSettings {
    pub fn new(supported: SupportedManipulations) -> Self {
        Self {
            supported,
            pivot: None,
            minimum_scale_rotate_radius: DEFAULT_MINIMUM_SCALE_ROTATE_RADIUS,
        }
    }

    pub fn supported(&self) -> SupportedManipulations {
        self.supported
    }

    pub fn pivot(&self) -> Option<&ManipulationPivot> {
        self.pivot.as_ref()
    }

    pub fn minimum_scale_rotate_radius(&self) -> f64 {
        self.minimum_scale_rotate_radius
    }

    pub fn set_supported(&mut self, supported: SupportedManipulations) {
        self.supported = supported;
    }

    pub fn set_pivot(&mut self, pivot: Option<ManipulationPivot>) {
        self.pivot = pivot;
    }

    pub fn set_minimum_scale_rotate_radius(&mut self, radius: f64) -> Result<()> {
        require_finite_non_negative("minimum_scale_rotate_radius", radius)?;
        self.minimum_scale_rotate_radius = radius;
        Ok(())
    }

    /// Pinned: no translation allowed and a pivot position to rotate around.
    pub fn is_pinned(&self) -> bool {
        !self.supported.intersects(SupportedManipulations::TRANSLATE)
            && self.pivot.is_some_and(|p| p.has_position())
    }
}
