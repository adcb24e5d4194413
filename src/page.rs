//! Gallery page assembly: collect, hydrate, sort, slice, render.
//!
//! Loading a page costs one listing per area and one bulk metadata select,
//! however many images are shown. Every [`ImageAsset`] on the page is built
//! from that pre-fetched data instead of querying per image.

use crate::asset::{AssetError, ImageAsset};
use crate::context::Context;
use crate::imaging::codec::is_web_image;
use crate::naming::{image_name_for_thumbnail, natural_cmp};
use crate::store::{BlobRef, MetaFilter, MetaRecord, MetaType, StoreError};
use crate::types::{Area, Gallery, SortPolicy};
use maud::{Markup, html};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// One image on a page with everything needed to render it.
#[derive(Debug, Clone)]
pub struct PageEntry {
    pub blob: BlobRef,
    pub thumbnail: Option<BlobRef>,
    pub metadata: Vec<MetaRecord>,
    pub caption: Option<String>,
}

impl PageEntry {
    pub fn filename(&self) -> &str {
        self.blob.name()
    }

    fn sort_label(&self) -> &str {
        self.caption.as_deref().unwrap_or(self.filename())
    }
}

/// Stable sort in place. `ByFilename` keeps listing order.
pub fn sort_entries(entries: &mut [PageEntry], policy: SortPolicy) {
    match policy {
        SortPolicy::ByFilename => {}
        SortPolicy::ByCaption => entries.sort_by(|a, b| a.sort_label().cmp(b.sort_label())),
        SortPolicy::ByFilenameNatural => {
            entries.sort_by(|a, b| natural_cmp(a.filename(), b.filename()))
        }
    }
}

/// Whether the `counter`th (1-based) entry falls on `page` (0-based).
pub fn in_page(counter: usize, per_page: usize, page: usize) -> bool {
    if per_page == 0 {
        return true;
    }
    // Pages past any reachable count are simply empty
    let Some(start) = per_page.checked_mul(page) else {
        return false;
    };
    counter > start && counter <= start.saturating_add(per_page)
}

/// One page of a gallery.
pub struct GalleryPage<'a> {
    ctx: Context<'a>,
    gallery: &'a Gallery,
    entries: Vec<PageEntry>,
    total: usize,
}

impl<'a> GalleryPage<'a> {
    /// Gather page `page` (0-based) of `gallery`.
    pub fn load(ctx: Context<'a>, gallery: &'a Gallery, page: usize) -> Result<Self, PageError> {
        let images: Vec<BlobRef> = ctx
            .blobs
            .list(ctx.container, Area::Images, &gallery.id)?
            .into_iter()
            .filter(|b| is_web_image(&b.mime))
            .collect();

        let mut thumbs: HashMap<(String, String), BlobRef> = ctx
            .blobs
            .list(ctx.container, Area::Thumbs, &gallery.id)?
            .into_iter()
            .filter_map(|t| {
                let image = image_name_for_thumbnail(t.name())?.to_string();
                Some(((t.key.path.clone(), image), t))
            })
            .collect();

        let mut by_image: HashMap<String, Vec<MetaRecord>> = HashMap::new();
        if !images.is_empty() {
            let filter = MetaFilter::gallery(&gallery.id).images(images.iter().map(|b| b.name()));
            for record in ctx.records.select(&filter)? {
                by_image.entry(record.image.clone()).or_default().push(record);
            }
        }

        let mut entries: Vec<PageEntry> = images
            .into_iter()
            .map(|blob| {
                let thumbnail = thumbs.remove(&(blob.key.path.clone(), blob.name().to_string()));
                let metadata = by_image.get(blob.name()).cloned().unwrap_or_default();
                let caption = metadata
                    .iter()
                    .find(|r| r.metatype == MetaType::Caption)
                    .map(|r| r.description.clone());
                PageEntry {
                    blob,
                    thumbnail,
                    metadata,
                    caption,
                }
            })
            .collect();

        sort_entries(&mut entries, gallery.sort);
        let total = entries.len();
        let entries: Vec<PageEntry> = entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| in_page(i + 1, gallery.per_page, page))
            .map(|(_, e)| e)
            .collect();

        debug!(gallery = %gallery.id, page, total, shown = entries.len(), "loaded page");
        Ok(Self {
            ctx,
            gallery,
            entries,
            total,
        })
    }

    /// Eligible images across all pages.
    pub fn image_count(&self) -> usize {
        self.total
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    /// Number of pages at the gallery's page size.
    pub fn page_count(&self) -> usize {
        match self.gallery.per_page {
            0 => 1,
            n => self.total.div_ceil(n).max(1),
        }
    }

    /// Fragments for every image on this page.
    pub fn render(&self, editing: bool) -> Result<Markup, PageError> {
        let mut cards = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let asset = ImageAsset::with_prefetched(
                self.ctx,
                self.gallery,
                entry.blob.clone(),
                entry.thumbnail.clone(),
                entry.metadata.clone(),
            )?;
            cards.push(asset.display(editing)?);
        }
        Ok(html! {
            div.lightbox-gallery {
                @for card in &cards {
                    (card)
                }
            }
        })
    }
}
