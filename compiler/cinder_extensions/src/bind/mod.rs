//! Binding extension blocks into symbols.
//!
//! Per-block work (shape checks and signature encoding) is independent
//! and may run on a scoped rayon pool. Everything order-sensitive happens
//! afterwards on the calling thread: container assignment, emission and
//! diagnostic collection.

use cinder_diagnostic::{DiagnosticConfig, DiagnosticQueue, ErrorGuaranteed};
use cinder_ir::StringInterner;
use cinder_types::{Pool, TypeRegistry};
use rayon::prelude::*;

use crate::assign::{Assignment, ContainerAssignor, EncodedBlock};
use crate::decl::ExtensionBlockDecl;
use crate::emit::emit;
use crate::encode::{encode_block, error_signature, EncodedSignature};
use crate::shape::{check_block, ShapeCheck};
use crate::symbols::ExtensionTable;

/// Options for [`bind_extensions`].
#[derive(Clone, Debug)]
pub struct BindOptions {
    /// Encode blocks on a scoped thread pool.
    pub parallel: bool,
    /// Worker stack size in bytes.
    pub stack_size: usize,
    pub diagnostics: DiagnosticConfig,
}

impl Default for BindOptions {
    fn default() -> Self {
        BindOptions {
            parallel: true,
            stack_size: 8 * 1024 * 1024,
            diagnostics: DiagnosticConfig::default(),
        }
    }
}

impl BindOptions {
    /// Single-threaded binding with default diagnostics.
    pub fn sequential() -> Self {
        BindOptions {
            parallel: false,
            ..BindOptions::default()
        }
    }
}

/// Everything produced by binding one compilation's blocks.
pub struct BindOutput {
    pub table: ExtensionTable,
    pub assignment: Assignment,
    /// Signature of each block, by declaration index. Blocks with an
    /// invalid receiver carry the error signature.
    pub signatures: Vec<EncodedSignature>,
    pub diagnostics: DiagnosticQueue,
    /// Present when some block failed its shape check.
    pub errors: Option<ErrorGuaranteed>,
}

/// Check, encode, assign and emit every block.
#[tracing::instrument(level = "debug", skip_all, fields(blocks = decls.len(), parallel = options.parallel))]
pub fn bind_extensions(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    decls: &[ExtensionBlockDecl],
    options: &BindOptions,
) -> BindOutput {
    let analyzed = if options.parallel && decls.len() > 1 {
        analyze_parallel(pool, registry, interner, decls, options.stack_size)
    } else {
        analyze_sequential(pool, registry, interner, decls)
    };

    let mut diagnostics = DiagnosticQueue::with_config(options.diagnostics.clone());
    let mut errors = None;
    let mut blocks = Vec::with_capacity(decls.len());
    let mut signatures = Vec::with_capacity(decls.len());
    for (index, (block, (check, signature))) in decls.iter().zip(analyzed).enumerate() {
        let signature = if check.receiver_valid {
            signature
        } else {
            error_signature()
        };
        for (diag, loc) in check.diagnostics {
            if diag.is_error() {
                errors = Some(diagnostics.emit_error(diag, loc));
            } else {
                diagnostics.add(diag, loc);
            }
        }
        blocks.push(EncodedBlock {
            index,
            declaring_type: block.declaring_type,
            loc: block.loc,
            arity: block.arity(),
            signature: signature.clone(),
        });
        signatures.push(signature);
    }

    let assignment = ContainerAssignor::assign(&blocks);
    let table = emit(pool, registry, interner, &assignment, decls);
    BindOutput {
        table,
        assignment,
        signatures,
        diagnostics,
        errors,
    }
}

fn analyze(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    block: &ExtensionBlockDecl,
) -> (ShapeCheck, EncodedSignature) {
    let check = check_block(pool, registry, interner, block);
    let signature = encode_block(pool, registry, interner, block);
    (check, signature)
}

fn analyze_sequential(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    decls: &[ExtensionBlockDecl],
) -> Vec<(ShapeCheck, EncodedSignature)> {
    decls
        .iter()
        .map(|block| analyze(pool, registry, interner, block))
        .collect()
}

/// `build_scoped` joins every worker before returning, so no pool
/// outlives the call.
fn analyze_parallel(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    decls: &[ExtensionBlockDecl],
    stack_size: usize,
) -> Vec<(ShapeCheck, EncodedSignature)> {
    rayon::ThreadPoolBuilder::new()
        .stack_size(stack_size)
        .build_scoped(rayon::ThreadBuilder::run, |thread_pool| {
            thread_pool.install(|| {
                decls
                    .par_iter()
                    .map(|block| analyze(pool, registry, interner, block))
                    .collect()
            })
        })
        .unwrap_or_else(|e| {
            tracing::warn!("failed to create thread pool ({e}), running sequentially");
            analyze_sequential(pool, registry, interner, decls)
        })
}
