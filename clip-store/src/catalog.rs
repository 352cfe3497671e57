use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{AssetError, ClipAsset};

/// Where a clip's audio data comes from.
#[derive(Debug, Clone)]
pub enum ClipSource {
    /// WAV file decoded on load.
    Wav(PathBuf),
    /// Already-decoded data, used by tests, tools and generated tones.
    Memory(Arc<ClipAsset>),
}

/// Static per-clip playback metadata. Identity is the case-insensitive name;
/// the catalog owns descriptors behind `Arc`.
#[derive(Debug, Clone)]
pub struct ClipDescriptor {
    pub name: String,
    pub volume: f32,
    pub pitch: f32,
    pub looped: bool,
    pub source: ClipSource,
}

impl ClipDescriptor {
    pub fn new(name: impl Into<String>, source: ClipSource) -> Self {
        Self {
            name: name.into(),
            volume: 1.0,
            pitch: 1.0,
            looped: false,
            source,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch.clamp(0.3, 3.0);
        self
    }

    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Case-insensitive identity check.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestEntry {
    name: String,
    path: PathBuf,
    #[serde(default = "default_gain")]
    volume: f32,
    #[serde(default = "default_gain")]
    pitch: f32,
    #[serde(default)]
    looped: bool,
}

fn default_gain() -> f32 {
    1.0
}

/// Name-to-descriptor registry. Lookups are a case-insensitive linear scan;
/// catalogs hold tens of clips, not thousands.
#[derive(Default)]
pub struct ClipCatalog {
    clips: Vec<Arc<ClipDescriptor>>,
}

impl ClipCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Names must be unique ignoring case.
    pub fn register(&mut self, clip: ClipDescriptor) -> Result<(), AssetError> {
        if self.clips.iter().any(|c| c.matches(&clip.name)) {
            return Err(AssetError::Duplicate(clip.name));
        }
        self.clips.push(Arc::new(clip));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ClipDescriptor>> {
        self.clips.iter().find(|c| c.matches(name)).cloned()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Build a catalog from a JSON manifest: a list of
    /// `{ "name", "path", "volume"?, "pitch"?, "looped"? }` entries.
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        let entries: Vec<ManifestEntry> =
            serde_json::from_str(json).map_err(|e| AssetError::Manifest(e.to_string()))?;
        let mut catalog = Self::new();
        for entry in entries {
            catalog.register(
                ClipDescriptor::new(entry.name, ClipSource::Wav(entry.path))
                    .with_volume(entry.volume)
                    .with_pitch(entry.pitch)
                    .with_loop(entry.looped),
            )?;
        }
        Ok(catalog)
    }

    pub fn load_manifest(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent(name: &str) -> ClipDescriptor {
        let asset = Arc::new(ClipAsset::from_samples(vec![0.0; 480], 48_000, 1));
        ClipDescriptor::new(name, ClipSource::Memory(asset))
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut catalog = ClipCatalog::new();
        catalog.register(silent("Explosion_Big")).unwrap();

        assert!(catalog.lookup("explosion_big").is_some());
        assert!(catalog.lookup("EXPLOSION_BIG").is_some());
        assert!(catalog.lookup("explosion_small").is_none());
    }

    #[test]
    fn duplicate_names_rejected_ignoring_case() {
        let mut catalog = ClipCatalog::new();
        catalog.register(silent("Jump")).unwrap();
        assert!(matches!(
            catalog.register(silent("jump")),
            Err(AssetError::Duplicate(_))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn descriptor_params_are_clamped() {
        let clip = silent("x").with_volume(2.0).with_pitch(9.0);
        assert_eq!(clip.volume, 1.0);
        assert_eq!(clip.pitch, 3.0);
        let clip = silent("y").with_volume(-1.0).with_pitch(0.0);
        assert_eq!(clip.volume, 0.0);
        assert_eq!(clip.pitch, 0.3);
    }

    #[test]
    fn manifest_roundtrip() {
        let json = r#"[
            { "name": "ui_click", "path": "sfx/click.wav" },
            { "name": "theme", "path": "music/theme.wav", "volume": 0.8, "looped": true }
        ]"#;
        let catalog = ClipCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let theme = catalog.lookup("THEME").unwrap();
        assert!(theme.looped);
        assert!((theme.volume - 0.8).abs() < 1e-6);
        assert_eq!(theme.pitch, 1.0);
    }

    #[test]
    fn bad_manifest_is_an_error() {
        assert!(matches!(
            ClipCatalog::from_json("{ not json"),
            Err(AssetError::Manifest(_))
        ));
    }
}
