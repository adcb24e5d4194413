//! Shared types used across the asset, page and index modules.
//!
//! A [`Gallery`] is handed in by the caller and treated as immutable for the
//! duration of a request. It is serializable so the CLI can read its defaults
//! straight from the `[gallery]` section of `shoebox.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a gallery's images are ordered before pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortPolicy {
    /// Blob store enumeration order (path, then name).
    #[default]
    ByFilename,
    /// Caption when present, else filename; plain byte comparison.
    ByCaption,
    /// Filename with digit runs compared numerically.
    ByFilenameNatural,
}

/// Where the caption is drawn relative to the thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    #[default]
    Bottom,
    Top,
    Hidden,
}

/// When uploads and screen display get downsized to the gallery preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoResize {
    #[default]
    None,
    Screen,
    Upload,
    Both,
}

impl AutoResize {
    pub fn on_upload(self) -> bool {
        matches!(self, AutoResize::Upload | AutoResize::Both)
    }
}

/// Display and sorting settings for one gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Gallery {
    pub id: String,
    pub sort: SortPolicy,
    /// Images per page; 0 shows everything on one page.
    pub per_page: usize,
    pub caption_position: CaptionPosition,
    /// Show captions untruncated.
    pub caption_full: bool,
    /// Show timestamp, size and dimensions under each thumbnail.
    pub ext_info: bool,
    pub auto_resize: AutoResize,
    /// 1-based index into `images.resize_presets`.
    pub resize_preset: usize,
}

impl Default for Gallery {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            sort: SortPolicy::default(),
            per_page: 0,
            caption_position: CaptionPosition::default(),
            caption_full: false,
            ext_info: false,
            auto_resize: AutoResize::default(),
            resize_preset: 1,
        }
    }
}

impl Gallery {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Storage area inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Images,
    Thumbs,
    Index,
}

impl Area {
    pub fn as_str(self) -> &'static str {
        match self {
            Area::Images => "images",
            Area::Thumbs => "thumbs",
            Area::Index => "index",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of edit an image can offer, in alphabetical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Caption,
    Delete,
    Flip,
    Resize,
    Rotate,
    Tag,
    Thumbnail,
}

impl EditKind {
    pub const ALL: [EditKind; 7] = [
        EditKind::Caption,
        EditKind::Delete,
        EditKind::Flip,
        EditKind::Resize,
        EditKind::Rotate,
        EditKind::Tag,
        EditKind::Thumbnail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EditKind::Caption => "caption",
            EditKind::Delete => "delete",
            EditKind::Flip => "flip",
            EditKind::Resize => "resize",
            EditKind::Rotate => "rotate",
            EditKind::Tag => "tag",
            EditKind::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
