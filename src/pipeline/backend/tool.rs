//! Lossless extraction through an external page-selection tool.
//!
//! The tool is driven with pdftk's `cat` grammar:
//!
//! ```text
//! pdftk <input> cat 3 1 7 output <output>          # select / reorder
//! pdftk <input> cat 1 2right 3 output <output>     # rotate page 2 by 90°
//! pdftk <a> <b> <c> cat output <output>            # concatenate
//! ```
//!
//! Source files are copied to an ASCII-only scratch name before the call, so
//! the subprocess never sees the user's original filename. Scratch copies are
//! [`TempPath`]s and vanish when this module's functions return, whichever
//! way they return.

use super::{scratch_pdf, BackendKind, ExtractionBackend, Fragment};
use crate::document::{Rotation, SourceDocument};
use crate::error::SplitError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempPath;
use tracing::{debug, error, info};

/// Backend that shells out to `pdftk` (or a compatible executable).
#[derive(Debug, Clone)]
pub struct ToolBackend {
    program: PathBuf,
}

impl ToolBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the tool and require a non-empty file at `output` afterwards.
    fn run(&self, args: Vec<OsString>, output: &Path) -> Result<(), SplitError> {
        let tool = self.program.display().to_string();
        debug!("{} {:?}", tool, args);

        let out = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| SplitError::ToolInvocation {
                tool: tool.clone(),
                status: format!("failed to start: {e}"),
                stdout: String::new(),
                stderr: String::new(),
            })?;

        let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();

        if !out.status.success() {
            error!("{} exited with {}: {}", tool, out.status, stderr);
            return Err(SplitError::ToolInvocation {
                tool,
                status: out.status.to_string(),
                stdout,
                stderr,
            });
        }

        let written = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            error!("{} reported success but wrote nothing", tool);
            return Err(SplitError::ToolInvocation {
                tool,
                status: format!("{} (no output written)", out.status),
                stdout,
                stderr,
            });
        }
        Ok(())
    }
}

impl ExtractionBackend for ToolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Tool
    }

    fn extract(
        &self,
        document: &SourceDocument,
        local_pages: &[u32],
        scratch: &Path,
    ) -> Result<Fragment, SplitError> {
        let input = ascii_copy(document.path(), scratch)?;
        let output = scratch_pdf(scratch, "output_")?;

        let mut args: Vec<OsString> = vec![input.as_os_str().to_owned(), "cat".into()];
        args.extend(local_pages.iter().map(|p| OsString::from(p.to_string())));
        args.push("output".into());
        args.push(output.as_os_str().to_owned());

        self.run(args, &output)?;
        debug!(
            "extracted {} page(s) of {} → {}",
            local_pages.len(),
            document.original_name(),
            output.display()
        );
        Ok(Fragment::Pdf(output))
    }

    fn rotate(
        &self,
        fragment: &mut Fragment,
        rotations: &[Rotation],
        scratch: &Path,
    ) -> Result<(), SplitError> {
        if rotations.iter().all(|r| r.is_none()) {
            return Ok(());
        }
        let Fragment::Pdf(current) = fragment else {
            return Err(SplitError::Internal(
                "tool backend cannot rotate a raster fragment".into(),
            ));
        };

        let rotated = scratch_pdf(scratch, "rotated_")?;
        let mut args: Vec<OsString> = vec![current.as_os_str().to_owned(), "cat".into()];
        args.extend(rotation_directives(rotations).into_iter().map(OsString::from));
        args.push("output".into());
        args.push(rotated.as_os_str().to_owned());

        self.run(args, &rotated)?;
        info!(
            "rotated fragment pages: {:?}",
            rotations
                .iter()
                .enumerate()
                .filter(|(_, r)| !r.is_none())
                .map(|(i, r)| (i + 1, r.degrees()))
                .collect::<Vec<_>>()
        );
        // Dropping the previous TempPath removes the unrotated file.
        *fragment = Fragment::Pdf(rotated);
        Ok(())
    }

    fn merge(
        &self,
        fragments: Vec<Fragment>,
        output: &Path,
        scratch: &Path,
    ) -> Result<(), SplitError> {
        let mut args: Vec<OsString> = Vec::with_capacity(fragments.len() + 3);
        for fragment in &fragments {
            let path = fragment.path().ok_or_else(|| {
                SplitError::Internal("tool backend cannot merge a raster fragment".into())
            })?;
            args.push(path.as_os_str().to_owned());
        }
        let merged = scratch_pdf(scratch, "merged_")?;
        args.push("cat".into());
        args.push("output".into());
        args.push(merged.as_os_str().to_owned());

        self.run(args, &merged)?;
        std::fs::copy(&merged, output)
            .map_err(|e| SplitError::io(format!("writing {}", output.display()), e))?;
        info!("merged {} fragments → {}", fragments.len(), output.display());
        Ok(())
    }
}

/// Copy `source` into `scratch` under a random ASCII name.
fn ascii_copy(source: &Path, scratch: &Path) -> Result<TempPath, SplitError> {
    let copy = scratch_pdf(scratch, "input_")?;
    std::fs::copy(source, &copy)
        .map_err(|e| SplitError::io(format!("copying {}", source.display()), e))?;
    Ok(copy)
}

/// pdftk page list for a whole fragment with per-page rotation suffixes:
/// `[None, Clockwise, None]` → `["1", "2right", "3"]`.
pub fn rotation_directives(rotations: &[Rotation]) -> Vec<String> {
    rotations
        .iter()
        .enumerate()
        .map(|(i, rotation)| {
            let page = i + 1;
            match rotation {
                Rotation::None => page.to_string(),
                Rotation::Clockwise => format!("{page}right"),
                Rotation::UpsideDown => format!("{page}down"),
                Rotation::CounterClockwise => format!("{page}left"),
            }
        })
        .collect()
}
