//! Configuration types for range splitting.
//!
//! Every knob lives in [`SplitConfig`], built via [`SplitConfigBuilder`].
//! Setters clamp numeric values into their valid ranges; [`build`] checks
//! the combinations a setter cannot see on its own.
//!
//! [`build`]: SplitConfigBuilder::build

use crate::error::SplitError;
use crate::pipeline::backend::PageRasterizer;
use crate::progress::SplitProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a split request.
///
/// Built via [`SplitConfig::builder()`] or using [`SplitConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfsplit::{BackendPreference, SplitConfig};
///
/// let config = SplitConfig::builder()
///     .backend(BackendPreference::Raster)
///     .raster_dpi(200)
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.raster_dpi, 200);
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Executable name looked up on `PATH` by the capability probe. Default: `pdftk`.
    pub tool_name: String,

    /// Explicit tool location. When set, the probe is skipped.
    pub tool_path: Option<PathBuf>,

    /// Backend choice. Default: [`BackendPreference::Auto`].
    pub backend: BackendPreference,

    /// Rasterisation DPI for the raster fallback. Range: 72–400. Default: 150.
    pub raster_dpi: u32,

    /// JPEG quality for rasterised pages. Range: 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Directory under which each session and request gets its own
    /// token-named scratch directory. Default: the OS temp dir.
    pub temp_root: PathBuf,

    /// Largest accepted upload in bytes. Default: 50 000 000.
    pub max_upload_bytes: u64,

    /// A signature-scan candidate must be strictly longer than this many
    /// bytes to be kept. Default: 100.
    pub min_scan_candidate_len: usize,

    /// Abort the whole request on the first failing range. Default: false.
    pub fail_fast: bool,

    /// Pre-constructed rasteriser. Takes precedence over binding pdfium.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Optional per-range progress events.
    pub progress_callback: Option<Arc<dyn SplitProgressCallback>>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            tool_name: "pdftk".to_string(),
            tool_path: None,
            backend: BackendPreference::default(),
            raster_dpi: 150,
            jpeg_quality: 80,
            temp_root: std::env::temp_dir(),
            max_upload_bytes: 50_000_000,
            min_scan_candidate_len: 100,
            fail_fast: false,
            rasterizer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("tool_name", &self.tool_name)
            .field("tool_path", &self.tool_path)
            .field("backend", &self.backend)
            .field("raster_dpi", &self.raster_dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("temp_root", &self.temp_root)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("min_scan_candidate_len", &self.min_scan_candidate_len)
            .field("fail_fast", &self.fail_fast)
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn tool_name(mut self, name: impl Into<String>) -> Self {
        self.config.tool_name = name.into();
        self
    }

    pub fn tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tool_path = Some(path.into());
        self
    }

    pub fn backend(mut self, preference: BackendPreference) -> Self {
        self.config.backend = preference;
        self
    }

    pub fn raster_dpi(mut self, dpi: u32) -> Self {
        self.config.raster_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn min_scan_candidate_len(mut self, len: usize) -> Self {
        self.config.min_scan_candidate_len = len;
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn SplitProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if c.tool_name.trim().is_empty() && c.tool_path.is_none() {
            return Err(SplitError::InvalidConfig(
                "tool name must not be empty".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(SplitError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        if c.temp_root.as_os_str().is_empty() {
            return Err(SplitError::InvalidConfig(
                "temp root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which extraction backend a request may use.
///
/// | Preference | Behaviour |
/// |------------|-----------|
/// | `Auto`   | probe for the tool once; use it if found, else rasterise |
/// | `Tool`   | always use the tool, even if the probe cannot find it |
/// | `Raster` | always rasterise |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    #[default]
    Auto,
    Tool,
    Raster,
}

impl std::str::FromStr for BackendPreference {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "tool" | "pdftk" => Ok(Self::Tool),
            "raster" | "image" => Ok(Self::Raster),
            other => Err(SplitError::InvalidConfig(format!(
                "unknown backend '{other}' (expected auto, tool or raster)"
            ))),
        }
    }
}
