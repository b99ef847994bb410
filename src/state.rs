use eframe::egui;
use ndarray::Array2;

use crate::config::ViewerConfig;
use crate::data::comments::CommentLog;
use crate::data::loader::{ingest, IngestError};
use crate::data::model::{ImageBlock, Upload};
use crate::data::normalize::{normalize, StretchMode};
use crate::data::stats::{frame_stats, mean_brightness, sanitize, FrameStats, Region, Sanitized};
use crate::preview;

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Success(String),
    Warning(String),
    Error {
        message: String,
        hint: Option<&'static str>,
    },
}

impl Status {
    fn from_ingest(err: &IngestError) -> Self {
        let message = match err {
            IngestError::Parse(inner) => format!("Error processing file: {inner}"),
            IngestError::NoImageData => "No valid image data found in file.".to_string(),
        };
        Status::Error {
            message,
            hint: err.hint(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loaded file
// ---------------------------------------------------------------------------

/// Normalized intensities for one stretch mode, plus the texture built
/// from them once the UI asks for it.
struct Preview {
    stretch: StretchMode,
    intensities: Array2<u8>,
    texture: Option<egui::TextureHandle>,
}

/// The current upload after ingestion and sanitization.
pub struct LoadedFile {
    pub name: String,
    pub block: ImageBlock,
    pub clean: Sanitized,
    pub mean: Option<f64>,
    pub stats: Option<FrameStats>,
    preview: Option<Preview>,
}

impl LoadedFile {
    fn new(name: String, block: ImageBlock) -> Self {
        let clean = sanitize(&block.pixels);
        if clean.replaced > 0 {
            log::debug!("'{name}': replaced {} non-finite samples", clean.replaced);
        }
        let mean = mean_brightness(&clean.grid);
        let stats = frame_stats(&clean.grid);
        Self {
            name,
            block,
            clean,
            mean,
            stats,
            preview: None,
        }
    }

    fn preview(&mut self, stretch: StretchMode, config: &ViewerConfig) -> &mut Preview {
        if self.preview.as_ref().is_some_and(|p| p.stretch != stretch) {
            self.preview = None;
        }
        self.preview.get_or_insert_with(|| Preview {
            stretch,
            intensities: normalize(&self.clean.grid, config.stretch(stretch)),
            texture: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything one viewer window remembers. Nothing here outlives the
/// process.
pub struct Session {
    pub file: Option<LoadedFile>,
    pub stretch: StretchMode,
    pub region: Region,
    pub status: Option<Status>,

    pub comments: CommentLog,
    pub comment_name: String,
    pub comment_text: String,
    pub comment_status: Option<Status>,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            file: None,
            stretch: config.default_stretch,
            region: Region::default(),
            status: None,
            comments: CommentLog::default(),
            comment_name: String::new(),
            comment_text: String::new(),
            comment_status: None,
        }
    }

    pub fn current_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    /// Take a new upload. A file with the current file's name keeps the
    /// cached image; any other name is ingested from scratch, and a failed
    /// ingest leaves no file loaded.
    pub fn accept_upload(&mut self, upload: Upload, config: &ViewerConfig) {
        if !upload.has_extension(&config.accepted_extensions) {
            log::warn!("rejected upload '{}': unsupported extension", upload.name);
            self.status = Some(Status::Warning(format!(
                "'{}' is not a supported file type (expected {}).",
                upload.name,
                config.accepted_extensions.join(", ")
            )));
            return;
        }

        if self.current_name() == Some(upload.name.as_str()) {
            log::debug!("'{}' already loaded, keeping cached image", upload.name);
            return;
        }

        match ingest(&upload) {
            Ok(block) => {
                self.status = Some(Status::Success(format!("Loaded {}", upload.name)));
                self.file = Some(LoadedFile::new(upload.name, block));
            }
            Err(e) => {
                log::error!("Failed to load '{}': {e}", upload.name);
                self.status = Some(Status::from_ingest(&e));
                self.file = None;
            }
        }
    }

    /// Record a failure that happened before ingestion, e.g. an unreadable
    /// path.
    pub fn report_error(&mut self, err: &anyhow::Error) {
        log::error!("Failed to read file: {err:#}");
        self.status = Some(Status::Error {
            message: format!("Error processing file: {err:#}"),
            hint: None,
        });
    }

    /// Normalized intensities of the current file under the current stretch.
    pub fn intensities(&mut self, config: &ViewerConfig) -> Option<&Array2<u8>> {
        let stretch = self.stretch;
        let file = self.file.as_mut()?;
        Some(&file.preview(stretch, config).intensities)
    }

    /// Texture for the current preview, uploaded on first use after a file
    /// or stretch change.
    pub fn texture(
        &mut self,
        ctx: &egui::Context,
        config: &ViewerConfig,
    ) -> Option<&egui::TextureHandle> {
        let stretch = self.stretch;
        let file = self.file.as_mut()?;
        let name = file.name.clone();
        let cached = file.preview(stretch, config);
        if cached.texture.is_none() {
            let img = preview::to_gray_image(&cached.intensities, config.origin_lower);
            cached.texture = Some(ctx.load_texture(
                name,
                preview::to_color_image(&img),
                egui::TextureOptions::LINEAR,
            ));
        }
        cached.texture.as_ref()
    }

    /// Submit the comment form. On success the text box is cleared and
    /// the name kept for the next comment.
    pub fn submit_comment(&mut self) {
        match self.comments.submit(&self.comment_name, &self.comment_text) {
            Ok(()) => {
                self.comment_text.clear();
                self.comment_status = Some(Status::Success("Comment added.".to_string()));
            }
            Err(e) => {
                self.comment_status = Some(Status::Warning(e.to_string()));
            }
        }
    }
}
