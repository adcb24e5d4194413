//! # Shoebox
//!
//! An image gallery engine: it stores uploaded images, derives thumbnails and
//! a per-gallery index icon, applies geometric edits, keeps captions and tags
//! attached to the right file, and renders paginated gallery pages.
//!
//! # Architecture
//!
//! Everything flows through two storage seams and one request context:
//!
//! ```text
//!              ┌──────────── Context ────────────┐
//!              │ BlobStore  RecordStore  Settings │
//!              │ EditLocks  container             │
//!              └────────────────┬────────────────┘
//!                               │
//!      upload ──► asset::ImageAsset ◄── page::GalleryPage
//!                     │        │
//!              imaging::*    index::get_or_build_index
//! ```
//!
//! - **Blobs** hold bytes: originals in the `images` area, `<name>.png`
//!   thumbnails in `thumbs`, and `index.png` in `index`.
//! - **Records** hold captions (at most one per image) and tags, keyed by
//!   gallery and current filename.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`asset`] | One image: thumbnails, transforms, rename propagation, captions, tags, delete |
//! | [`page`] | Collect, hydrate, sort, slice and render one gallery page |
//! | [`index`] | Gallery index icon built from a representative image |
//! | [`upload`] | Import new files into a gallery |
//! | [`imaging`] | Pure pixel transforms and encode/decode helpers |
//! | [`store`] | `BlobStore` / `RecordStore` traits with memory, filesystem and JSON backends |
//! | [`render`] | Maud fragments for images and the index icon |
//! | [`config`] | `shoebox.toml` loading, merging and validation |
//! | [`context`] | Explicit per-request handles |
//! | [`types`] | Gallery record and shared enums |
//! | [`naming`] | Filename conventions, caption truncation, natural ordering |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Filenames Are Keys
//!
//! Metadata rows reference images by filename. A transform that re-encodes a
//! GIF or WebP as JPEG changes that filename, so the rename of the blob and of
//! its rows happen inside the single [`asset::ImageAsset::apply_transform`]
//! routine, under the image's edit lock. There is no other path that renames.
//!
//! ## Persist, Then Delete
//!
//! A renamed image is written under its new name before the old one goes. If
//! anything between the write and the commit fails, a drop guard removes the
//! new blob, leaving the original image and its rows as they were.
//!
//! ## No Ambient State
//!
//! Stores, settings and locks are passed in a [`context::Context`]. Tests run
//! against in-memory stores; the CLI wires up the filesystem and JSON ones.

pub mod asset;
pub mod config;
pub mod context;
pub mod imaging;
pub mod index;
pub mod logging;
pub mod naming;
pub mod page;
pub mod render;
pub mod store;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
