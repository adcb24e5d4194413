//! HTML fragments for gallery pages.
//!
//! Pure maud functions over plain view structs; no store access. The asset
//! manager and paginator gather the data, these functions only lay it out.
//!
//! ```text
//! div.lightbox-gallery-image-container
//! └── div.lightbox-gallery-image-wrapper
//!     └── div.lightbox-gallery-image-frame
//!         ├── div.lightbox-gallery-image-caption.top      (caption on top)
//!         ├── a.lightbox-gallery-image-thumbnail           (links full image)
//!         ├── div.lightbox-gallery-image-caption.bottom   (bottom or hidden)
//!         ├── div.lightbox-gallery-image-extinfo           (optional)
//!         └── form                                         (editing only)
//! ```

use crate::imaging::Dimensions;
use crate::types::{CaptionPosition, EditKind};
use maud::{Markup, html};

/// Optional line under the thumbnail.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtInfo {
    /// Modification time, already formatted.
    pub timestamp: String,
    pub size_kb: f64,
    pub dimensions: Option<Dimensions>,
}

/// Inline edit menu for one image.
#[derive(Debug, Clone, Copy)]
pub struct EditMenu<'a> {
    pub gallery: &'a str,
    pub image: &'a str,
    pub options: &'a [EditKind],
}

/// Everything needed to draw one image.
#[derive(Debug, Clone)]
pub struct ImageCard<'a> {
    pub image_url: &'a str,
    pub thumbnail_url: &'a str,
    pub caption: &'a str,
    pub position: CaptionPosition,
    pub thumb_size: (u32, u32),
    pub ext_info: Option<ExtInfo>,
    pub edit_menu: Option<EditMenu<'a>>,
}

/// File size in KB with one decimal.
pub fn size_kb(bytes: u64) -> f64 {
    (bytes as f64 / 100.0).round() / 10.0
}

fn edit_label(kind: EditKind) -> &'static str {
    match kind {
        EditKind::Caption => "Caption",
        EditKind::Delete => "Delete",
        EditKind::Flip => "Flip",
        EditKind::Resize => "Resize",
        EditKind::Rotate => "Rotate",
        EditKind::Tag => "Tags",
        EditKind::Thumbnail => "Thumbnail",
    }
}

pub fn image_card(card: &ImageCard<'_>) -> Markup {
    // Hidden captions keep their (empty) div so the layout doesn't shift
    let caption = match card.position {
        CaptionPosition::Hidden => "",
        _ => card.caption,
    };
    let position_class = match card.position {
        CaptionPosition::Top => "top",
        _ => "bottom",
    };
    let caption_div = html! {
        div class={ "lightbox-gallery-image-caption " (position_class) } { (caption) }
    };
    let (width, height) = card.thumb_size;
    let style = format!(
        "background-image: url('{}'); width: {width}px; height: {height}px;",
        card.thumbnail_url
    );

    html! {
        div.lightbox-gallery-image-container {
            div.lightbox-gallery-image-wrapper {
                div.lightbox-gallery-image-frame {
                    @if card.position == CaptionPosition::Top {
                        (caption_div)
                    }
                    a.lightbox-gallery-image-thumbnail
                        href=(card.image_url)
                        rel="lightbox_gallery"
                        title=(caption)
                        style=(style) {}
                    @if card.position != CaptionPosition::Top {
                        (caption_div)
                    }
                    @if let Some(info) = &card.ext_info {
                        (ext_info(info))
                    }
                    @if let Some(menu) = &card.edit_menu {
                        (edit_form(menu, width))
                    }
                }
            }
        }
    }
}

fn ext_info(info: &ExtInfo) -> Markup {
    html! {
        div.lightbox-gallery-image-extinfo {
            (info.timestamp)
            br;
            (info.size_kb) "KB "
            @if let Some(d) = info.dimensions {
                (d.width) "x" (d.height) "px"
            }
        }
    }
}

fn edit_form(menu: &EditMenu<'_>, width: u32) -> Markup {
    html! {
        form action="edit" method="post" {
            input type="hidden" name="gallery" value=(menu.gallery);
            input type="hidden" name="image" value=(menu.image);
            input type="hidden" name="page" value="0";
            select.lightbox-edit-select name="tab" style={ "width: " (width) "px;" } onchange="submit();" {
                option disabled selected { "Choose..." }
                @for kind in menu.options {
                    option value=(kind.as_str()) { (edit_label(*kind)) }
                }
            }
        }
    }
}

/// `<img>` for a gallery's index icon.
pub fn index_image(url: &str, alt: &str) -> Markup {
    html! {
        img.lightbox-gallery-index src=(url) alt=(alt);
    }
}
