use clap::{Parser, Subcommand};
use shoebox::asset::{EditLocks, ImageAsset, Operation, Outcome, ResizeSpec, TagEdit, edit_types};
use shoebox::context::Context;
use shoebox::imaging::Axis;
use shoebox::page::GalleryPage;
use shoebox::store::{FsBlobStore, JsonRecordStore, RecordStore};
use shoebox::upload::{Upload, add_images};
use shoebox::types::Gallery;
use shoebox::{config, index, logging};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "shoebox")]
#[command(about = "Image gallery engine: thumbnails, edits, captions and pages")]
#[command(long_about = "\
Image gallery engine: thumbnails, edits, captions and pages

Images live under <root>/blobs, captions and tags in <root>/meta.json:

  <root>/
  ├── meta.json                      # Captions and tags
  └── blobs/<container>/
      ├── images/<gallery>/a.jpg     # Originals (and edited versions)
      ├── thumbs/<gallery>/a.jpg.png # Generated thumbnails
      └── index/<gallery>/index.png  # Gallery index icon

Non-PNG images are re-encoded as JPEG by any flip, rotate or resize, and
renamed to match; their captions and tags follow the new name.

Run 'shoebox gen-config' to generate a documented shoebox.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Data directory holding blobs and metadata
    #[arg(long, default_value = "shoebox-data", global = true)]
    root: PathBuf,

    /// Settings file (stock defaults when missing)
    #[arg(long, default_value = "shoebox.toml", global = true)]
    config: PathBuf,

    /// Gallery id, overriding `[gallery] id` from the settings file
    #[arg(long, global = true)]
    gallery: Option<String>,

    /// Top-level blob namespace
    #[arg(long, default_value = "gallery", global = true)]
    container: String,

    /// Debug logging (overridden by SHOEBOX_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import image files (or zip archives of them) into the gallery
    Add {
        files: Vec<PathBuf>,
        /// Resize each upload: WxH, preset:N or N%
        #[arg(long)]
        resize: Option<ResizeSpec>,
    },
    /// Render one page of the gallery as HTML
    Page {
        /// 0-based page number
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Include the inline edit menus
        #[arg(long)]
        editing: bool,
    },
    /// Edit one image
    Edit {
        /// Image filename
        image: String,
        #[command(subcommand)]
        action: EditAction,
    },
    /// Print the gallery index icon fragment, building it if needed
    Index {
        /// Rebuild from this image
        #[arg(long)]
        from: Option<String>,
    },
    /// List the edit kinds on offer
    Options {
        /// Narrow to what this image supports
        #[arg(long)]
        image: Option<String>,
        /// Ignore `[editing] disabled`
        #[arg(long)]
        all: bool,
    },
    /// List the distinct tags used in the gallery
    Tags,
    /// Print a stock shoebox.toml with all options documented
    GenConfig,
}

#[derive(Subcommand, Clone)]
enum EditAction {
    /// Set the caption
    Caption { text: String },
    /// Add a tag
    TagAdd { text: String },
    /// Remove a tag by id
    TagRemove { id: u64 },
    /// Mirror the image (vertical or horizontal)
    Flip { axis: Axis },
    /// Rotate counter-clockwise by degrees (90, 180, -90, ...)
    Rotate {
        #[arg(allow_hyphen_values = true)]
        angle: f64,
    },
    /// Resize: WxH, preset:N or N%
    Resize { spec: ResizeSpec },
    /// Delete the image with its thumbnail, caption and tags
    Delete,
    /// Regenerate the thumbnail with a shifted crop
    Thumbnail {
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        dx: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        dy: i64,
    },
}

impl EditAction {
    fn into_operation(self) -> Operation {
        match self {
            EditAction::Caption { text } => Operation::Caption(text),
            EditAction::TagAdd { text } => Operation::Tag(TagEdit::Add(text)),
            EditAction::TagRemove { id } => Operation::Tag(TagEdit::Remove(id)),
            EditAction::Flip { axis } => Operation::Flip(axis),
            EditAction::Rotate { angle } => Operation::Rotate(angle),
            EditAction::Resize { spec } => Operation::Resize(spec),
            EditAction::Delete => Operation::Delete,
            EditAction::Thumbnail { dx, dy } => Operation::Thumbnail { offset: (dx, dy) },
        }
    }
}

/// Stores and settings the gallery commands operate on.
struct Workspace {
    settings: config::Settings,
    gallery: Gallery,
    blobs: FsBlobStore,
    records: JsonRecordStore,
    locks: EditLocks,
}

impl Workspace {
    fn open(
        root: &Path,
        config_path: &Path,
        gallery_id: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = config::load_settings(config_path)?;
        let mut gallery = settings.gallery.clone();
        if let Some(id) = gallery_id {
            gallery.id = id.to_string();
        }
        Ok(Self {
            settings,
            gallery,
            blobs: FsBlobStore::new(root.join("blobs")),
            records: JsonRecordStore::open(root.join("meta.json"))?,
            locks: EditLocks::new(),
        })
    }

    fn ctx<'a>(&'a self, container: &'a str) -> Context<'a> {
        Context::new(
            &self.blobs,
            &self.records,
            &self.settings,
            &self.locks,
            container,
        )
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let open = || Workspace::open(&cli.root, &cli.config, cli.gallery.as_deref());
    let container = cli.container.as_str();

    match &cli.command {
        Command::Add { files, resize } => {
            let ws = open()?;
            let uploads = files
                .iter()
                .map(|path| -> Result<Upload, Box<dyn std::error::Error>> {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .ok_or_else(|| format!("not a file: {}", path.display()))?;
                    Ok(Upload::new(name, std::fs::read(path)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            for name in add_images(ws.ctx(container), &ws.gallery, uploads, *resize)? {
                println!("{name}");
            }
        }
        Command::Page { page, editing } => {
            let ws = open()?;
            let page = GalleryPage::load(ws.ctx(container), &ws.gallery, *page)?;
            println!("{}", page.render(*editing)?.into_string());
            eprintln!(
                "{} images, page size {}, {} pages",
                page.image_count(),
                ws.gallery.per_page,
                page.page_count()
            );
        }
        Command::Edit { image, action } => {
            let ws = open()?;
            let ctx = ws.ctx(container);
            let mut asset = ImageAsset::open(ctx, &ws.gallery, "/", image)?;
            match asset.apply(action.clone().into_operation())? {
                Outcome::CaptionSet => println!("caption set on {image}"),
                Outcome::Deleted => println!("deleted {image}"),
                Outcome::Transformed { filename } => println!("{filename}"),
                Outcome::TagAdded { id } => println!("tag {id}"),
                Outcome::TagsRemoved { count } => println!("{count} tag(s) removed"),
                Outcome::Thumbnail(blob) => println!("{}", ctx.url_for(&blob)),
            }
        }
        Command::Index { from } => {
            let ws = open()?;
            let ctx = ws.ctx(container);
            if let Some(name) = from {
                let asset = ImageAsset::open(ctx, &ws.gallery, "/", name)?;
                index::get_or_build_index(ctx, &ws.gallery, Some(&asset))?;
            }
            println!("{}", index::index_markup(ctx, &ws.gallery)?.into_string());
        }
        Command::Options { image, all } => {
            let ws = open()?;
            let asset = image
                .as_deref()
                .map(|name| ImageAsset::open(ws.ctx(container), &ws.gallery, "/", name))
                .transpose()?;
            for kind in edit_types(&ws.settings, *all, asset.as_ref()) {
                println!("{kind}");
            }
        }
        Command::Tags => {
            let ws = open()?;
            for tag in ws.records.gallery_tags(&ws.gallery.id)? {
                println!("{tag}");
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
