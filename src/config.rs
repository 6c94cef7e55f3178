use anyhow::{Result, anyhow};
use directories::UserDirs;
use kurbo::Point;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::inertia::{
    DEFAULT_EXPANSION_DECELERATION, DEFAULT_ROTATION_DECELERATION,
    DEFAULT_TRANSLATION_DECELERATION, InertiaDefaults,
};
use crate::settings::{
    DEFAULT_MINIMUM_SCALE_ROTATE_RADIUS, ManipulationPivot, ManipulationSettings,
    SupportedManipulations,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotSection {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManipulationSection {
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,
    #[serde(default = "default_minimum_radius")]
    pub minimum_scale_rotate_radius: f64,
    #[serde(default)]
    pub pivot: Option<PivotSection>,
}

impl Default for ManipulationSection {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            minimum_scale_rotate_radius: default_minimum_radius(),
            pivot: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InertiaSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_translation_deceleration")]
    pub translation_deceleration: f64,
    #[serde(default = "default_rotation_deceleration")]
    pub rotation_deceleration: f64,
    #[serde(default = "default_expansion_deceleration")]
    pub expansion_deceleration: f64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for InertiaSection {
    fn default() -> Self {
        Self {
            enabled: true,
            translation_deceleration: DEFAULT_TRANSLATION_DECELERATION,
            rotation_deceleration: DEFAULT_ROTATION_DECELERATION,
            expansion_deceleration: DEFAULT_EXPANSION_DECELERATION,
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_supported() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_minimum_radius() -> f64 {
    DEFAULT_MINIMUM_SCALE_ROTATE_RADIUS
}

fn default_true() -> bool {
    true
}

fn default_translation_deceleration() -> f64 {
    DEFAULT_TRANSLATION_DECELERATION
}

fn default_rotation_deceleration() -> f64 {
    DEFAULT_ROTATION_DECELERATION
}

fn default_expansion_deceleration() -> f64 {
    DEFAULT_EXPANSION_DECELERATION
}

fn default_tick_ms() -> u64 {
    16
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub manipulation: ManipulationSection,
    #[serde(default)]
    pub inertia: InertiaSection,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn builtin_default() -> Result<Self> {
        Self::parse(default_profile_text())
    }

    pub fn manipulation_settings(&self) -> Result<ManipulationSettings> {
        let m = &self.manipulation;
        let supported = SupportedManipulations::from_names(m.supported.as_slice())?;
        let mut settings = ManipulationSettings::new(supported);
        settings.set_minimum_scale_rotate_radius(m.minimum_scale_rotate_radius)?;

        if let Some(p) = &m.pivot {
            let position = match (p.x, p.y) {
                (Some(x), Some(y)) => Some(Point::new(x, y)),
                (None, None) => None,
                _ => return Err(anyhow!("manipulation.pivot needs both x and y, or neither")),
            };
            let mut pivot = ManipulationPivot::default();
            pivot.set_position(position)?;
            pivot.set_radius(p.radius)?;
            settings.set_pivot(Some(pivot));
        }
        Ok(settings)
    }

    pub fn inertia_defaults(&self) -> InertiaDefaults {
        InertiaDefaults {
            translation_deceleration: self.inertia.translation_deceleration,
            rotation_deceleration: self.inertia.rotation_deceleration,
            expansion_deceleration: self.inertia.expansion_deceleration,
        }
    }
}

/// Profiles on disk plus the pointer naming the active one.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profile: Profile,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot resolve home directory"))?;
    Ok(dirs.home_dir().join(".config").join("touchmanip"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ProfileStore {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open(config_dir()?)
    }

    /// Opens the store rooted at `cfgdir`, installing the default profile and
    /// the active pointer when missing.
    pub fn open(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn profile_named(&self, name: &str) -> Result<Profile> {
        load_profile(&self.profiles_dir, name)
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    if !path.exists() {
        return Err(anyhow!("profile not found: {}", path.display()));
    }
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to load {}: {e}", path.display()))
}

fn validate_profile(p: &Profile) -> Result<()> {
    p.manipulation_settings()?;

    let i = &p.inertia;
    if i.tick_ms == 0 {
        return Err(anyhow!("inertia.tick_ms must be a positive duration"));
    }
    for (key, v) in [
        ("translation_deceleration", i.translation_deceleration),
        ("rotation_deceleration", i.rotation_deceleration),
        ("expansion_deceleration", i.expansion_deceleration),
    ] {
        if !v.is_finite() || v < 0.0 {
            return Err(anyhow!("inertia.{key} must be finite and >= 0, got {v}"));
        }
    }
    Ok(())
}
