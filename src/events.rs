//! Event payloads produced by the manipulation and inertia processors.
//!
//! Every payload is a plain value copy; nothing here refers back into the
//! processor that produced it.

use serde::Serialize;

/// Velocities in coordinate units (or radians) per millisecond.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ManipulationVelocities {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular: f64,
    pub expansion_x: f64,
    pub expansion_y: f64,
}

impl ManipulationVelocities {
    pub const ZERO: Self = Self {
        linear_x: 0.0,
        linear_y: 0.0,
        angular: 0.0,
        expansion_x: 0.0,
        expansion_y: 0.0,
    };
}

/// A transform increment or total.
///
/// Scale is multiplicative, everything else is additive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ManipulationDelta {
    pub translation_x: f64,
    pub translation_y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub expansion_x: f64,
    pub expansion_y: f64,
}

impl Default for ManipulationDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ManipulationDelta {
    pub const IDENTITY: Self = Self {
        translation_x: 0.0,
        translation_y: 0.0,
        rotation: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        expansion_x: 0.0,
        expansion_y: 0.0,
    };

    pub fn new(translation_x: f64, translation_y: f64, rotation: f64, scale: f64, expansion: f64) -> Self {
        Self {
            translation_x,
            translation_y,
            rotation,
            scale_x: scale,
            scale_y: scale,
            expansion_x: expansion,
            expansion_y: expansion,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManipulationEvent {
    Started {
        origin_x: f64,
        origin_y: f64,
    },
    Delta {
        origin_x: f64,
        origin_y: f64,
        velocities: ManipulationVelocities,
        delta: ManipulationDelta,
        cumulative: ManipulationDelta,
    },
    Completed {
        origin_x: f64,
        origin_y: f64,
        velocities: ManipulationVelocities,
        total: ManipulationDelta,
    },
}

impl ManipulationEvent {
    pub fn origin(&self) -> (f64, f64) {
        match *self {
            Self::Started { origin_x, origin_y }
            | Self::Delta {
                origin_x, origin_y, ..
            }
            | Self::Completed {
                origin_x, origin_y, ..
            } => (origin_x, origin_y),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Delta { .. } => "delta",
            Self::Completed { .. } => "completed",
        }
    }
}
