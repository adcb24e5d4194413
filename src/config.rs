//! Settings module.
//!
//! Handles loading, validating, and merging `shoebox.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top, so a config
//! file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "/files"          # Prefix for every blob URL
//!
//! [thumbnails]
//! width = 162
//! height = 132
//!
//! [index]
//! icon_size = 48               # Miniature edge length
//! tilt = 351.0                 # Counter-clockwise degrees
//! offset = [2, 3]              # Where the miniature lands on the icon
//! # icon = "assets/index.png"  # Replace the built-in icon
//!
//! [images]
//! jpeg_quality = 90
//! resize_presets = [[1280, 1024], [1024, 768], [800, 600], [640, 480]]
//!
//! [captions]
//! max_label = 13               # Truncation length unless caption_full
//!
//! [editing]
//! disabled = []                # e.g. ["rotate", "flip"]
//!
//! [display]
//! date_format = "%d/%m/%y, %H:%M"
//!
//! [gallery]                    # Gallery record used by the CLI
//! id = "default"
//! sort = "by-filename"
//! per_page = 0
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::types::{EditKind, Gallery};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `shoebox.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Prefix for image, thumbnail and index URLs.
    pub base_url: String,
    pub thumbnails: ThumbnailsConfig,
    pub index: IndexConfig,
    pub images: ImagesConfig,
    pub captions: CaptionsConfig,
    pub editing: EditingConfig,
    pub display: DisplayConfig,
    /// Gallery record the CLI operates on.
    pub gallery: Gallery,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "/files".to_string(),
            thumbnails: ThumbnailsConfig::default(),
            index: IndexConfig::default(),
            images: ImagesConfig::default(),
            captions: CaptionsConfig::default(),
            editing: EditingConfig::default(),
            display: DisplayConfig::default(),
            gallery: Gallery::default(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height must be non-zero".into(),
            ));
        }
        if self.index.icon_size == 0 {
            return Err(ConfigError::Validation(
                "index.icon_size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.images.resize_presets.is_empty() {
            return Err(ConfigError::Validation(
                "images.resize_presets must not be empty".into(),
            ));
        }
        if self
            .images
            .resize_presets
            .iter()
            .any(|[w, h]| *w == 0 || *h == 0)
        {
            return Err(ConfigError::Validation(
                "images.resize_presets entries must be non-zero".into(),
            ));
        }
        if self.captions.max_label == 0 {
            return Err(ConfigError::Validation(
                "captions.max_label must be non-zero".into(),
            ));
        }
        if StrftimeItems::new(&self.display.date_format).any(|i| matches!(i, Item::Error)) {
            return Err(ConfigError::Validation(format!(
                "display.date_format '{}' is not a valid strftime format",
                self.display.date_format
            )));
        }
        if self.resize_preset(self.gallery.resize_preset).is_none() {
            return Err(ConfigError::Validation(format!(
                "gallery.resize_preset must be between 1 and {}",
                self.images.resize_presets.len()
            )));
        }
        Ok(())
    }

    /// Target size for a 1-based preset index.
    pub fn resize_preset(&self, index: usize) -> Option<(u32, u32)> {
        index
            .checked_sub(1)
            .and_then(|i| self.images.resize_presets.get(i))
            .map(|[w, h]| (*w, *h))
    }

    pub fn jpeg_quality(&self) -> Quality {
        Quality::new(self.images.jpeg_quality)
    }

    pub fn thumbnail_size(&self) -> (u32, u32) {
        (self.thumbnails.width, self.thumbnails.height)
    }
}

/// Thumbnail geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 162,
            height: 132,
        }
    }
}

/// Gallery index composite settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Edge length of the square miniature.
    pub icon_size: u32,
    /// Counter-clockwise tilt in degrees.
    pub tilt: f64,
    /// Top-left of the miniature on the base icon.
    pub offset: [i64; 2],
    /// Base icon file. When absent the built-in icon is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            icon_size: 48,
            tilt: 351.0,
            offset: [2, 3],
            icon: None,
        }
    }
}

/// Encoding and resize settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    pub jpeg_quality: u32,
    /// `[width, height]` targets selectable by 1-based index.
    pub resize_presets: Vec<[u32; 2]>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            resize_presets: vec![[1280, 1024], [1024, 768], [800, 600], [640, 480]],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionsConfig {
    pub max_label: usize,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self { max_label: 13 }
    }
}

/// Edits hidden from the edit menu.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditingConfig {
    pub disabled: Vec<EditKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// `chrono` format string for the extra-info timestamp.
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%y, %H:%M".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default settings as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Settings::default()).expect("default settings must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a settings file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_settings(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_settings(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Settings, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let settings: Settings = merged.try_into()?;
    settings.validate()?;
    Ok(settings)
}

/// Load settings from `path`, falling back to stock defaults when it is absent.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    resolve_settings(stock_defaults_value(), load_raw_settings(path)?)
}

/// Returns a fully-commented stock `shoebox.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shoebox Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Prefix for image, thumbnail and index URLs:
#   <base_url>/<container>/<area>/<item><path><name>?mtime=<unix>
base_url = "/files"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Fixed thumbnail size. Sources are center-cropped to this aspect ratio.
width = 162
height = 132

# ---------------------------------------------------------------------------
# Gallery index image
# ---------------------------------------------------------------------------
[index]
# Edge length of the square miniature stamped onto the icon.
icon_size = 48
# Counter-clockwise tilt of the miniature, in degrees.
tilt = 351.0
# Position of the miniature on the icon.
offset = [2, 3]
# Custom base icon. The colour of its top-left pixel becomes transparent.
# icon = "index.png"

# ---------------------------------------------------------------------------
# Images
# ---------------------------------------------------------------------------
[images]
# JPEG quality for re-encoded images (1-100).
jpeg_quality = 90
# Targets for "resize preset N" (1-based).
resize_presets = [[1280, 1024], [1024, 768], [800, 600], [640, 480]]

# ---------------------------------------------------------------------------
# Captions
# ---------------------------------------------------------------------------
[captions]
# Captions longer than this are cut and suffixed with "..." unless the
# gallery shows full captions.
max_label = 13

# ---------------------------------------------------------------------------
# Editing
# ---------------------------------------------------------------------------
[editing]
# Edits hidden from the edit menu: caption, delete, flip, resize, rotate,
# tag, thumbnail.
disabled = []

# ---------------------------------------------------------------------------
# Display
# ---------------------------------------------------------------------------
[display]
# Timestamp format for the extra-info line (strftime syntax).
date_format = "%d/%m/%y, %H:%M"

# ---------------------------------------------------------------------------
# Gallery used by the command line tool
# ---------------------------------------------------------------------------
[gallery]
id = "default"
# by-filename | by-caption | by-filename-natural
sort = "by-filename"
# Images per page, 0 = everything on one page.
per_page = 0
# bottom | top | hidden
caption_position = "bottom"
caption_full = false
ext_info = false
# none | screen | upload | both
auto_resize = "none"
resize_preset = 1
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SortPolicy;
    use tempfile::TempDir;

    #[test]
    fn default_settings() {
        let s = Settings::default();
        assert_eq!(s.thumbnail_size(), (162, 132));
        assert_eq!(s.index.icon_size, 48);
        assert_eq!(s.index.tilt, 351.0);
        assert_eq!(s.index.offset, [2, 3]);
        assert_eq!(s.jpeg_quality().value(), 90);
        assert_eq!(s.captions.max_label, 13);
        assert!(s.editing.disabled.is_empty());
    }

    #[test]
    fn resize_presets_are_one_based() {
        let s = Settings::default();
        assert_eq!(s.resize_preset(0), None);
        assert_eq!(s.resize_preset(1), Some((1280, 1024)));
        assert_eq!(s.resize_preset(4), Some((640, 480)));
        assert_eq!(s.resize_preset(5), None);
    }

    #[test]
    fn parse_partial_settings() {
        let toml = r#"
[editing]
disabled = ["rotate", "flip"]

[gallery]
sort = "by-caption"
"#;
        let s: Settings = toml::from_str(toml).unwrap();
        assert_eq!(
            s.editing.disabled,
            vec![EditKind::Rotate, EditKind::Flip]
        );
        assert_eq!(s.gallery.sort, SortPolicy::ByCaption);
        // Unspecified defaults preserved
        assert_eq!(s.thumbnails.width, 162);
        assert_eq!(s.base_url, "/files");
    }

    // =========================================================================
    // load_settings tests
    // =========================================================================

    #[test]
    fn load_settings_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let s = load_settings(&tmp.path().join("shoebox.toml")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn load_settings_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shoebox.toml");
        fs::write(
            &path,
            r#"
base_url = "https://cdn.example.org"

[thumbnails]
width = 200
"#,
        )
        .unwrap();

        let s = load_settings(&path).unwrap();
        assert_eq!(s.base_url, "https://cdn.example.org");
        assert_eq!(s.thumbnails.width, 200);
        assert_eq!(s.thumbnails.height, 132);
    }

    #[test]
    fn load_settings_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shoebox.toml");
        fs::write(&path, "this is not = [valid").unwrap();
        assert!(matches!(load_settings(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shoebox.toml");
        fs::write(&path, "[thumbnails]\ndepth = 3\n").unwrap();
        assert!(matches!(load_settings(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_edit_kind_rejected() {
        let result: Result<Settings, _> = toml::from_str("[editing]\ndisabled = [\"crop\"]\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // validation tests
    // =========================================================================

    #[test]
    fn validate_default_passes() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_thumbnail() {
        let mut s = Settings::default();
        s.thumbnails.height = 0;
        assert!(matches!(s.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_quality_range() {
        let mut s = Settings::default();
        s.images.jpeg_quality = 0;
        assert!(s.validate().is_err());
        s.images.jpeg_quality = 101;
        assert!(s.validate().is_err());
        s.images.jpeg_quality = 100;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_date_format() {
        let mut s = Settings::default();
        s.display.date_format = "%Y-%m-%".into();
        assert!(s.validate().is_err());
        s.display.date_format = "%Y-%m-%d".into();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_gallery_preset_in_range() {
        let mut s = Settings::default();
        s.gallery.resize_preset = 9;
        assert!(matches!(s.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resolve_settings_rejects_invalid_values() {
        let overlay: toml::Value = toml::from_str("[images]\nresize_presets = []\n").unwrap();
        let result = resolve_settings(stock_defaults_value(), Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"jpeg_quality = 90"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"jpeg_quality = 70"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("jpeg_quality").unwrap().as_integer(), Some(70));
    }

    #[test]
    fn merge_toml_table_merge_preserves_base_keys() {
        let overlay: toml::Value = toml::from_str("[index]\ntilt = 10.0\n").unwrap();
        let merged = merge_toml(stock_defaults_value(), overlay);
        let index = merged.get("index").unwrap();
        assert_eq!(index.get("tilt").unwrap().as_float(), Some(10.0));
        assert_eq!(index.get("icon_size").unwrap().as_integer(), Some(48));
    }

    #[test]
    fn merge_toml_arrays_replace() {
        let overlay: toml::Value =
            toml::from_str("[images]\nresize_presets = [[10, 10]]\n").unwrap();
        let s = resolve_settings(stock_defaults_value(), Some(overlay)).unwrap();
        assert_eq!(s.images.resize_presets, vec![[10, 10]]);
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let s: Settings = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for section in [
            "thumbnails",
            "index",
            "images",
            "captions",
            "editing",
            "display",
            "gallery",
        ] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
