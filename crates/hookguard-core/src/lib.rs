//! HOOKGUARD
//!
//! Static validator and worst-case execution-cost analyzer for ledger hook
//! WebAssembly modules.
//!
//! A hook is a small Wasm module attached to a ledger account and invoked on
//! transactions touching that account. Before one is admitted on-ledger it
//! must be proven, without execution, to conform to a restricted dialect:
//! whitelisted `env` imports only, no indirect calls, no memory growth,
//! fixed `hook`/`cbak` export signatures, and a `_g(id, maxiter)` guard call
//! with constant arguments at the top of every loop. The guards bound every
//! loop's iterations, which bounds the whole invocation's instruction count.
//!
//! The checking pipeline is strictly linear:
//! 1. **Load**: read the module bytes and compute an identity hash.
//! 2. **Resolve**: first pass over sections for the symbolic environment
//!    (guard import index, entry-point indices, function types).
//! 3. **Analyze**: second pass running the guard analyzer over every
//!    function body, folding loop bounds into instruction ceilings.
//! 4. **Report**: package the outcome and the event log into a
//!    serializable report.
//!
//! [`wasm::validate::validate_guards`] is the bare validator; [`validate`]
//! and [`validate_bytes`] wrap it with loading and report assembly.

pub mod api;
pub mod log;
pub mod report;
pub mod wasm;

use std::path::Path;

use anyhow::Result;

use log::sink::MemoryLog;
use report::model::{OutcomeInfo, ToolInfo, ValidationReport};
use wasm::read::ModuleContext;

/// Primary tool identity.
pub const TOOL_NAME: &str = "hookguard";

/// Schema version for generated JSON reports.
/// Must be bumped when `report::model` changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Validates a hook module from disk and assembles the full report.
pub fn validate(path: &Path, strict: bool, account: &str, tool: ToolInfo) -> Result<ValidationReport> {
    let ctx = wasm::read::read_module(path)?;
    Ok(validate_context(ctx, strict, account, tool))
}

/// Validates an in-memory hook module (e.g. read from stdin).
pub fn validate_bytes(
    bytes: Vec<u8>,
    path: Option<String>,
    strict: bool,
    account: &str,
    tool: ToolInfo,
) -> ValidationReport {
    validate_context(ModuleContext::from_bytes(path, bytes), strict, account, tool)
}

fn validate_context(
    ctx: ModuleContext,
    strict: bool,
    account: &str,
    tool: ToolInfo,
) -> ValidationReport {
    let sink = MemoryLog::new();
    let outcome = match wasm::validate::validate_guards(&ctx.bytes, strict, &sink, account) {
        Ok(ceilings) => OutcomeInfo::accepted(ceilings),
        Err(error) => OutcomeInfo::rejected(&error),
    };
    ValidationReport::new(tool, ctx.into_module_info(), outcome, sink.take())
}
