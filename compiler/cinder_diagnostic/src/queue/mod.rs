//! Ordered, deduplicated collection of a compilation's diagnostics.
//!
//! Blocks are checked on worker threads, so diagnostics arrive in no
//! particular order. The queue keys each one by [`SourceLoc`] and
//! [`DiagnosticQueue::flush`] returns them by location, with insertion
//! order breaking ties.

use std::collections::HashSet;

use cinder_ir::SourceLoc;

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// The placeholder the signature encoder prints for a type that failed to
/// bind.
const ERROR_SENTINEL: &str = "<error>";

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Errors kept before later ones are dropped. 0 keeps everything.
    /// Warnings are never dropped by the limit.
    pub error_limit: usize,
    /// Drop errors that only restate an earlier binding failure, recognized
    /// by the encoder's error sentinel in their message.
    pub filter_follow_on: bool,
    /// Drop a diagnostic equal in location, code and message to one already
    /// queued.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 100,
            filter_follow_on: true,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Keep everything.
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            filter_follow_on: false,
            deduplicate: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Queued {
    diagnostic: Diagnostic,
    loc: SourceLoc,
    seq: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    queued: Vec<Queued>,
    errors: usize,
    seen: HashSet<(SourceLoc, ErrorCode, String)>,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..DiagnosticQueue::default()
        }
    }

    /// Queue `diag` at `loc`. Returns `false` when the configuration
    /// filtered it out.
    pub fn add(&mut self, diag: Diagnostic, loc: SourceLoc) -> bool {
        let is_error = diag.is_error();
        if is_error && self.limit_reached() {
            return false;
        }
        if is_error && self.config.filter_follow_on && diag.message.contains(ERROR_SENTINEL) {
            return false;
        }
        if self.config.deduplicate && !self.seen.insert((loc, diag.code, diag.message.clone())) {
            return false;
        }
        if is_error {
            self.errors += 1;
        }
        let seq = self.queued.len();
        self.queued.push(Queued {
            diagnostic: diag,
            loc,
            seq,
        });
        true
    }

    pub fn extend(&mut self, batch: impl IntoIterator<Item = (Diagnostic, SourceLoc)>) {
        for (diag, loc) in batch {
            self.add(diag, loc);
        }
    }

    /// Queue an error and get proof that one was reported.
    ///
    /// The proof holds even if this particular error was filtered: a
    /// duplicate or an earlier error already accounts for it.
    pub fn emit_error(&mut self, diag: Diagnostic, loc: SourceLoc) -> ErrorGuaranteed {
        debug_assert!(diag.is_error(), "emit_error called with a warning");
        self.add(diag, loc);
        ErrorGuaranteed::new()
    }

    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.errors >= self.config.error_limit
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Queued diagnostics of both severities.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.errors)
    }

    /// Take every queued diagnostic, sorted by location.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.queued.sort_by_key(|q| (q.loc, q.seq));
        self.errors = 0;
        self.seen.clear();
        self.queued.drain(..).map(|q| q.diagnostic).collect()
    }

    /// Queued diagnostics in insertion order.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.queued.iter().map(|q| &q.diagnostic)
    }
}
