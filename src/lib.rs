//! Converts multi-touch contact batches into composite 2-D transforms and
//! extrapolates the motion after release.

pub mod config;
pub mod contacts;
pub mod error;
pub mod events;
pub mod geometry;
pub mod inertia;
pub mod processor;
pub mod queues;
pub mod replay;
pub mod sequence;
pub mod settings;

pub use contacts::Contact;
pub use error::{ManipulationError, Result};
pub use events::{ManipulationDelta, ManipulationEvent, ManipulationVelocities};
pub use inertia::{
    InertiaDefaults, InertiaExpansionBehavior, InertiaProcessor, InertiaRotationBehavior,
    InertiaState, InertiaTranslationBehavior,
};
pub use processor::ManipulationProcessor;
pub use sequence::{ManipulationSequence, SequenceState};
pub use settings::{ManipulationPivot, ManipulationSettings, SupportedManipulations};
