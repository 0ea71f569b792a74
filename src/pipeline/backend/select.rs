//! Capability probe and per-request backend selection.
//!
//! The probe runs once per request, before any range is processed, and the
//! chosen backend serves every range of that request.

use super::{ExtractionBackend, RasterBackend, ToolBackend};
use crate::config::{BackendPreference, SplitConfig};
use crate::error::SplitError;
use crate::pipeline::render::PdfiumRasterizer;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answers "where is this executable?".
pub trait ToolProbe: Send + Sync {
    fn locate(&self, tool: &str) -> Option<PathBuf>;
}

/// Looks the tool up on `PATH` via `which` (`where` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        let finder = if cfg!(windows) { "where" } else { "which" };
        let output = match Command::new(finder).arg(tool).output() {
            Ok(o) => o,
            Err(e) => {
                debug!("{} unavailable: {}", finder, e);
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(PathBuf::from)
    }
}

/// Pick the backend for one request.
pub fn select_backend(
    config: &SplitConfig,
    probe: &dyn ToolProbe,
) -> Result<Box<dyn ExtractionBackend>, SplitError> {
    let located = match (&config.tool_path, config.backend) {
        (_, BackendPreference::Raster) => None,
        (Some(path), _) => Some(path.clone()),
        (None, _) => probe.locate(&config.tool_name),
    };

    match (config.backend, located) {
        (BackendPreference::Raster, _) => raster(config),
        (_, Some(tool)) => {
            info!("extraction backend: tool ({})", tool.display());
            Ok(Box::new(ToolBackend::new(tool)))
        }
        (BackendPreference::Tool, None) => {
            warn!(
                "'{}' not found on PATH; invoking it by name anyway",
                config.tool_name
            );
            Ok(Box::new(ToolBackend::new(&config.tool_name)))
        }
        (BackendPreference::Auto, None) => {
            info!("'{}' not available; falling back to rasterisation", config.tool_name);
            raster(config)
        }
    }
}

fn raster(config: &SplitConfig) -> Result<Box<dyn ExtractionBackend>, SplitError> {
    let rasterizer = match &config.rasterizer {
        Some(r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(config.raster_dpi)?),
    };
    info!(
        "extraction backend: raster ({} DPI, quality {})",
        config.raster_dpi, config.jpeg_quality
    );
    Ok(Box::new(RasterBackend::new(
        rasterizer,
        config.raster_dpi,
        config.jpeg_quality,
    )))
}
