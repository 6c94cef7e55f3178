use crate::contacts::Contact;
use crate::error::Result;
use crate::events::ManipulationEvent;
use crate::sequence::ManipulationSequence;
use crate::settings::{ManipulationPivot, ManipulationSettings, SupportedManipulations};

/// Owns the settings and the running sequence for one manipulated element.
#[derive(Debug, Default)]
pub struct ManipulationProcessor {
    settings: ManipulationSettings,
    sequence: ManipulationSequence,
}

impl ManipulationProcessor {
    pub fn new(supported: SupportedManipulations) -> Self {
        Self::with_settings(ManipulationSettings::new(supported))
    }

    pub fn with_settings(settings: ManipulationSettings) -> Self {
        Self {
            settings,
            sequence: ManipulationSequence::new(),
        }
    }

    pub fn settings(&self) -> &ManipulationSettings {
        &self.settings
    }

    pub fn sequence(&self) -> &ManipulationSequence {
        &self.sequence
    }

    pub fn supported_manipulations(&self) -> SupportedManipulations {
        self.settings.supported()
    }

    pub fn set_supported_manipulations(&mut self, supported: SupportedManipulations) {
        self.settings.set_supported(supported);
    }

    pub fn pivot(&self) -> Option<&ManipulationPivot> {
        self.settings.pivot()
    }

    pub fn set_pivot(&mut self, pivot: Option<ManipulationPivot>) {
        self.settings.set_pivot(pivot);
    }

    pub fn minimum_scale_rotate_radius(&self) -> f64 {
        self.settings.minimum_scale_rotate_radius()
    }

    pub fn set_minimum_scale_rotate_radius(&mut self, radius: f64) -> Result<()> {
        self.settings.set_minimum_scale_rotate_radius(radius)
    }

    pub fn is_active(&self) -> bool {
        self.sequence.is_manipulating()
    }

    pub fn process_manipulators(
        &mut self,
        timestamp: i64,
        contacts: &[Contact],
    ) -> Result<Option<ManipulationEvent>> {
        self.sequence
            .process_manipulators(timestamp, contacts, &self.settings)
    }

    pub fn complete_manipulation(&mut self, timestamp: i64) -> Result<Option<ManipulationEvent>> {
        self.sequence.complete_manipulation(timestamp)
    }
}
