pub mod cursor;
pub mod guard;
pub mod read;
pub mod resolve;
pub mod sections;
pub mod validate;

use crate::log::model::{LogCode, ValidationError};
use crate::log::sink::LogCtx;

/// Converts a low-level read failure into the rejection it stands for:
/// truncation is `SHORT_HOOK`, LEB128 overflow is `WASM_VALIDATION`.
pub(crate) fn reject_read(ctx: LogCtx<'_>, err: cursor::ReadError) -> ValidationError {
    match err {
        cursor::ReadError::Truncated(_) => ctx.reject(
            LogCode::ShortHook,
            format!("hook truncated or otherwise invalid: {err}"),
        ),
        cursor::ReadError::Overflow(_) => ctx.reject(
            LogCode::WasmValidation,
            format!("hook is invalid wasm binary: {err}"),
        ),
    }
}

pub(crate) fn reject_walk(ctx: LogCtx<'_>, err: sections::WalkError) -> ValidationError {
    match err {
        sections::WalkError::Read(read) => reject_read(ctx, read),
        sections::WalkError::NoProgress { offset } => ctx.reject(
            LogCode::WasmParseLoop,
            format!("hook is invalid wasm binary: no parse progress at offset {offset}"),
        ),
    }
}
