//! The closed set of edits an image accepts.

use super::{AssetError, ImageAsset};
use crate::config::Settings;
use crate::imaging::{Axis, Dimensions, scaled_dimensions};
use crate::store::BlobRef;
use crate::types::EditKind;
use std::fmt;
use std::str::FromStr;

/// How to pick the target size of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeSpec {
    Exact { width: u32, height: u32 },
    /// 1-based index into `images.resize_presets`.
    Preset(usize),
    /// Percentage of the current size.
    Scale(u32),
}

impl ResizeSpec {
    /// Concrete target for an image of `current` size.
    pub fn target(
        self,
        settings: &Settings,
        current: Option<Dimensions>,
    ) -> Result<(u32, u32), AssetError> {
        match self {
            ResizeSpec::Exact { width, height } => {
                if width == 0 || height == 0 {
                    return Err(AssetError::InvalidState(format!(
                        "cannot resize to {width}x{height}"
                    )));
                }
                Ok((width, height))
            }
            ResizeSpec::Preset(n) => settings.resize_preset(n).ok_or_else(|| {
                AssetError::InvalidState(format!(
                    "resize preset {n} does not exist (1-{})",
                    settings.images.resize_presets.len()
                ))
            }),
            ResizeSpec::Scale(percent) => {
                if percent == 0 {
                    return Err(AssetError::InvalidState("cannot scale to 0%".into()));
                }
                let dims = current.ok_or_else(|| {
                    AssetError::InvalidState("cannot scale an image of unknown size".into())
                })?;
                Ok(scaled_dimensions((dims.width, dims.height), percent))
            }
        }
    }
}

impl fmt::Display for ResizeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeSpec::Exact { width, height } => write!(f, "{width}x{height}"),
            ResizeSpec::Preset(n) => write!(f, "preset {n}"),
            ResizeSpec::Scale(p) => write!(f, "{p}%"),
        }
    }
}

/// Parses `640x480`, `preset:2` or `50%`.
impl FromStr for ResizeSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bad = || format!("invalid resize '{s}', expected WxH, preset:N or N%");

        if let Some(pct) = s.strip_suffix('%') {
            return pct.trim().parse().map(ResizeSpec::Scale).map_err(|_| bad());
        }
        if let Some(n) = s.strip_prefix("preset:") {
            return n.trim().parse().map(ResizeSpec::Preset).map_err(|_| bad());
        }
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(bad)?;
        Ok(ResizeSpec::Exact {
            width: w.trim().parse().map_err(|_| bad())?,
            height: h.trim().parse().map_err(|_| bad())?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagEdit {
    Add(String),
    /// Remove by record id.
    Remove(u64),
}

/// An edit request against one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Caption(String),
    Delete,
    Flip(Axis),
    Resize(ResizeSpec),
    /// Counter-clockwise degrees.
    Rotate(f64),
    Tag(TagEdit),
    /// Regenerate the thumbnail with the crop window shifted by `offset`.
    Thumbnail { offset: (i64, i64) },
}

impl Operation {
    pub fn kind(&self) -> EditKind {
        match self {
            Operation::Caption(_) => EditKind::Caption,
            Operation::Delete => EditKind::Delete,
            Operation::Flip(_) => EditKind::Flip,
            Operation::Resize(_) => EditKind::Resize,
            Operation::Rotate(_) => EditKind::Rotate,
            Operation::Tag(_) => EditKind::Tag,
            Operation::Thumbnail { .. } => EditKind::Thumbnail,
        }
    }
}

/// What an applied [`Operation`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    CaptionSet,
    Deleted,
    /// Pixels rewritten; `filename` is the image's name afterwards.
    Transformed { filename: String },
    TagAdded { id: u64 },
    TagsRemoved { count: usize },
    Thumbnail(BlobRef),
}

/// Edit kinds to offer, alphabetical.
///
/// Unless `show_all`, kinds in `editing.disabled` are dropped and, when an
/// image is given, the list is narrowed to what that image supports.
pub fn edit_types(
    settings: &Settings,
    show_all: bool,
    image: Option<&ImageAsset<'_>>,
) -> Vec<EditKind> {
    if show_all {
        return EditKind::ALL.to_vec();
    }
    let supported = image.map(|img| img.editing_options());
    EditKind::ALL
        .into_iter()
        .filter(|k| !settings.editing.disabled.contains(k))
        .filter(|k| supported.as_ref().is_none_or(|opts| opts.contains(k)))
        .collect()
}
