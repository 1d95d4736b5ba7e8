//! Hook admission log codes and events.
//!
//! This module is strictly declarative: it names every reason a module can be
//! rejected (plus the informational acceptance codes) and the event record
//! carried to the log sink. No decision logic lives here.

use serde::{Deserialize, Serialize};

/// Closed enumeration of hook admission log codes.
///
/// Every rejection path in the validator names exactly one of these; the set
/// is part of the external contract and must not grow or shrink without a
/// schema version bump.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogCode {
    /// Byte code ended abruptly mid-read.
    ShortHook,
    /// Input smaller than the smallest possible hook.
    WasmTooSmall,
    /// Magic number or version prefix missing.
    WasmBadMagic,
    /// Section framing stopped making progress.
    WasmParseLoop,
    /// Generic wasm decode failure, usually LEB128 overflow.
    WasmValidation,
    /// Import section present but empty.
    ImportsMissing,
    /// Nil or invalid import module name.
    ImportModuleBad,
    /// Import module other than `env`.
    ImportModuleEnv,
    /// Nil or invalid import name.
    ImportNameBad,
    /// Imported function is not in the host-API whitelist.
    ImportIllegal,
    /// The `_g` guard function was not imported.
    GuardImport,
    /// Export section present but empty.
    ExportsMissing,
    /// `hook` exported as something other than a function.
    ExportHookFunc,
    /// `cbak` exported as something other than a function.
    ExportCbakFunc,
    /// Required `hook` export absent.
    ExportMissing,
    /// Function section absent or empty.
    FuncsMissing,
    /// hook/cbak have no corresponding entry in the function section.
    FuncTypeless,
    /// A function type did not carry the 0x60 form tag.
    FuncTypeInvalid,
    /// A function type parameter is not one of the four numeric types.
    FuncParamInvalid,
    /// A function type result is not one of the four numeric types.
    FuncReturnInvalid,
    /// Strict mode: a function type returns more or fewer than one value.
    FuncReturnCount,
    /// hook/cbak must take exactly one i32 parameter.
    ParamHookCbak,
    /// hook/cbak must return exactly one i64.
    ReturnHookCbak,
    /// hook and cbak were exported with different types.
    HookCbakDiffTypes,
    /// Call to a function outside the whitelisted imports.
    CallIllegal,
    /// `call_indirect` is disallowed in hooks.
    CallIndirect,
    /// `memory.grow` is disallowed in hooks.
    MemoryGrow,
    /// A loop was entered without an immediate guard call.
    GuardMissing,
    /// Guard called without two statically visible constant parameters.
    GuardParameters,
    /// A block end would move execution below depth zero.
    BlockIllegal,
    /// Illegal local variable type in a code body.
    TypeInvalid,
    /// Informational: worst-case execution count as computed.
    InstructionCount,
    /// Worst-case execution count exceeds the admission ceiling.
    InstructionExcess,
    /// Blocks/loops/ifs nested beyond the depth limit.
    NestingLimit,
    /// Strict mode: sections out of canonical order.
    SectionsOutOfSequence,
    /// Strict mode: custom section (id 0) present.
    CustomSectionDisallowed,
}

impl LogCode {
    /// Canonical wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCode::ShortHook => "SHORT_HOOK",
            LogCode::WasmTooSmall => "WASM_TOO_SMALL",
            LogCode::WasmBadMagic => "WASM_BAD_MAGIC",
            LogCode::WasmParseLoop => "WASM_PARSE_LOOP",
            LogCode::WasmValidation => "WASM_VALIDATION",
            LogCode::ImportsMissing => "IMPORTS_MISSING",
            LogCode::ImportModuleBad => "IMPORT_MODULE_BAD",
            LogCode::ImportModuleEnv => "IMPORT_MODULE_ENV",
            LogCode::ImportNameBad => "IMPORT_NAME_BAD",
            LogCode::ImportIllegal => "IMPORT_ILLEGAL",
            LogCode::GuardImport => "GUARD_IMPORT",
            LogCode::ExportsMissing => "EXPORTS_MISSING",
            LogCode::ExportHookFunc => "EXPORT_HOOK_FUNC",
            LogCode::ExportCbakFunc => "EXPORT_CBAK_FUNC",
            LogCode::ExportMissing => "EXPORT_MISSING",
            LogCode::FuncsMissing => "FUNCS_MISSING",
            LogCode::FuncTypeless => "FUNC_TYPELESS",
            LogCode::FuncTypeInvalid => "FUNC_TYPE_INVALID",
            LogCode::FuncParamInvalid => "FUNC_PARAM_INVALID",
            LogCode::FuncReturnInvalid => "FUNC_RETURN_INVALID",
            LogCode::FuncReturnCount => "FUNC_RETURN_COUNT",
            LogCode::ParamHookCbak => "PARAM_HOOK_CBAK",
            LogCode::ReturnHookCbak => "RETURN_HOOK_CBAK",
            LogCode::HookCbakDiffTypes => "HOOK_CBAK_DIFF_TYPES",
            LogCode::CallIllegal => "CALL_ILLEGAL",
            LogCode::CallIndirect => "CALL_INDIRECT",
            LogCode::MemoryGrow => "MEMORY_GROW",
            LogCode::GuardMissing => "GUARD_MISSING",
            LogCode::GuardParameters => "GUARD_PARAMETERS",
            LogCode::BlockIllegal => "BLOCK_ILLEGAL",
            LogCode::TypeInvalid => "TYPE_INVALID",
            LogCode::InstructionCount => "INSTRUCTION_COUNT",
            LogCode::InstructionExcess => "INSTRUCTION_EXCESS",
            LogCode::NestingLimit => "NESTING_LIMIT",
            LogCode::SectionsOutOfSequence => "SECTIONS_OUT_OF_SEQUENCE",
            LogCode::CustomSectionDisallowed => "CUSTOM_SECTION_DISALLOWED",
        }
    }

    /// Informational codes accompany acceptance; everything else rejects.
    pub fn is_informational(&self) -> bool {
        matches!(self, LogCode::InstructionCount)
    }
}

impl std::fmt::Display for LogCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record written to the log sink.
///
/// `account` is an opaque identifier supplied by the caller and used only for
/// formatting; the validator attaches no meaning to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub code: LogCode,
    pub account: String,
    pub detail: String,
}

/// A rejected module, carrying the first violation found.
///
/// The matching [`LogEvent`] has already been emitted by the time this error
/// is constructed; callers only need the typed code and the human-readable
/// detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {detail}")]
pub struct ValidationError {
    pub code: LogCode,
    pub detail: String,
}
