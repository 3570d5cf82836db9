//! Diagnostics for the Cinder extension passes.
//!
//! A [`Diagnostic`] carries an [`ErrorCode`] from one of four ranges
//! (declaration shape, resolution, cross-references, metadata), a message,
//! labels and notes. Nothing here is fatal: a pass that reports an error
//! still produces a best-effort symbol, and the bind pipeline hands back an
//! [`ErrorGuaranteed`] so callers can tell a degraded result from a clean
//! one.

mod diagnostic;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
