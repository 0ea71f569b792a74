//! Progress-callback trait for per-range split events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to be told as
//! each range spec is started, finished or abandoned.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfsplit::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl SplitProgressCallback for Counter {
//!     fn on_range_complete(&self, index: usize, total: usize, name: &str, pages: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{}/{}] {} ({} pages)", index + 1, total, name, pages);
//!     }
//! }
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the split pipeline as it works through the range specs.
///
/// Ranges are processed one after another on the calling thread, so events
/// arrive in order. All methods default to no-ops.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once, after the backend is chosen and before the first range.
    ///
    /// * `total_ranges`: number of range specs in the request
    /// * `total_pages`: pages in the global index
    fn on_split_start(&self, total_ranges: usize, total_pages: u32) {
        let _ = (total_ranges, total_pages);
    }

    /// Called before a range spec is planned. `index` is zero-based.
    fn on_range_start(&self, index: usize, total_ranges: usize, name: &str) {
        let _ = (index, total_ranges, name);
    }

    /// Called when a range's output document has been written.
    fn on_range_complete(&self, index: usize, total_ranges: usize, name: &str, pages: usize) {
        let _ = (index, total_ranges, name, pages);
    }

    /// Called when a range spec produced no output.
    fn on_range_error(&self, index: usize, total_ranges: usize, name: &str, error: &str) {
        let _ = (index, total_ranges, name, error);
    }

    /// Called once after every range has been attempted.
    fn on_split_complete(&self, total_ranges: usize, success_count: usize) {
        let _ = (total_ranges, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
