//! Orchestration of the two validation passes.
//!
//! `validate_guards` is the validator's entry point: header checks, the
//! structural first pass ([`crate::wasm::resolve`]), then the second pass
//! over the type and code sections, running [`crate::wasm::guard`] on every
//! function body. The result is either the pair of worst-case instruction
//! ceilings for the `hook` and `cbak` entry points, or the first violation
//! found.
//!
//! Validation is a pure function of the module bytes and configuration: no
//! state survives a call, and identical inputs always produce identical
//! outcomes.

use serde::{Deserialize, Serialize};

use crate::log::model::{LogCode, ValidationError};
use crate::log::sink::{GuardLog, LogCtx};
use crate::wasm::cursor::Cursor;
use crate::wasm::guard::check_guard;
use crate::wasm::resolve::{self, ModuleEnv};
use crate::wasm::sections::{self, Section, SectionKind, SectionWalker};
use crate::wasm::{reject_read, reject_walk};

/// Default ceiling on a body's worst-case instruction count.
pub const DEFAULT_INSTRUCTION_CEILING: u64 = 0xF_FFFF;

/// Default limit on combined block/loop/if nesting depth.
pub const DEFAULT_NESTING_LIMIT: usize = 16;

/// Tunable admission knobs.
///
/// The ceilings are parameters rather than constants so hosts can tighten
/// them; the defaults are the values hooks are calibrated against.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Enables the extra checks: single-result function types, no custom
    /// sections, canonical section order, unrecognized-opcode rejection.
    pub strict: bool,
    pub max_instruction_count: u64,
    pub max_nesting_depth: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_instruction_count: DEFAULT_INSTRUCTION_CEILING,
            max_nesting_depth: DEFAULT_NESTING_LIMIT,
        }
    }
}

impl ValidatorConfig {
    /// Defaults with strict mode switched on.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Worst-case instruction ceilings for the two entry points. `cbak` is zero
/// when the module does not export it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardCeilings {
    pub hook: u64,
    pub cbak: u64,
}

/// Validates a hook module, using default limits.
///
/// `account` is opaque and appears only in log formatting.
pub fn validate_guards(
    module: &[u8],
    strict: bool,
    sink: &dyn GuardLog,
    account: &str,
) -> Result<GuardCeilings, ValidationError> {
    let config = ValidatorConfig {
        strict,
        ..ValidatorConfig::default()
    };
    validate_guards_with(module, &config, sink, account)
}

/// Validates a hook module under an explicit configuration.
pub fn validate_guards_with(
    module: &[u8],
    config: &ValidatorConfig,
    sink: &dyn GuardLog,
    account: &str,
) -> Result<GuardCeilings, ValidationError> {
    let ctx = LogCtx::new(sink, account);

    if module.len() < sections::MIN_MODULE_LEN {
        return Err(ctx.reject(
            LogCode::WasmTooSmall,
            format!(
                "hook was not a valid webassembly binary, too small ({} bytes)",
                module.len()
            ),
        ));
    }

    if !sections::has_wasm_header(module) {
        return Err(ctx.reject(
            LogCode::WasmBadMagic,
            "hook was not a valid webassembly binary, missing magic number or version".into(),
        ));
    }

    let env = resolve::resolve_module(module, config.strict, ctx)?;

    // Second pass: the type section constrains the entry-point signatures,
    // the code section gets the guard analysis. Everything structural was
    // settled by the first pass.
    let mut ceilings = GuardCeilings { hook: 0, cbak: 0 };
    let mut walker = SectionWalker::new(module);
    while let Some(section) = walker.next_section().map_err(|e| reject_walk(ctx, e))? {
        match section.kind() {
            SectionKind::Type => check_type_section(module, section, &env, config, ctx)?,
            SectionKind::Code => {
                check_code_section(module, section, &env, config, ctx, &mut ceilings)?;
            }
            _ => {}
        }
    }

    ctx.emit(
        LogCode::InstructionCount,
        &format!(
            "total worst-case execution count, hook: {} cbak: {}",
            ceilings.hook, ceilings.cbak
        ),
    );

    Ok(ceilings)
}

fn check_type_section(
    module: &[u8],
    section: Section,
    env: &ModuleEnv,
    config: &ValidatorConfig,
    ctx: LogCtx<'_>,
) -> Result<(), ValidationError> {
    let mut cur = Cursor::at(module, section.payload_start);
    let type_count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;

    for type_idx in 0..type_count {
        let form = cur.read_u8().map_err(|e| reject_read(ctx, e))?;
        if form != 0x60 {
            return Err(ctx.reject(
                LogCode::FuncTypeInvalid,
                format!("invalid function type form, type: {type_idx} offset: {}", cur.pos()),
            ));
        }

        let is_entry_type = type_idx == u64::from(env.hook_type_idx);

        let param_count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        if is_entry_type && param_count != 1 {
            return Err(ctx.reject(
                LogCode::ParamHookCbak,
                "hook and cbak must take exactly one uint32_t parameter".into(),
            ));
        }
        for _ in 0..param_count {
            let param_type = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            if !(0x7C..=0x7F).contains(&param_type) {
                return Err(ctx.reject(
                    LogCode::FuncParamInvalid,
                    format!(
                        "invalid parameter type in function type, type: {type_idx} \
                         offset: {}",
                        cur.pos()
                    ),
                ));
            }
            if is_entry_type && param_type != 0x7F {
                return Err(ctx.reject(
                    LogCode::ParamHookCbak,
                    "hook and cbak must take exactly one uint32_t parameter".into(),
                ));
            }
        }

        let result_count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        if config.strict && result_count != 1 {
            return Err(ctx.reject(
                LogCode::FuncReturnCount,
                "hook declares a function type that returns fewer or more than one value".into(),
            ));
        }
        for _ in 0..result_count {
            let result_type = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            if !(0x7C..=0x7F).contains(&result_type) {
                return Err(ctx.reject(
                    LogCode::FuncReturnInvalid,
                    format!(
                        "invalid return type in function type, type: {type_idx} offset: {}",
                        cur.pos()
                    ),
                ));
            }
            if is_entry_type && (result_count != 1 || result_type != 0x7E) {
                return Err(ctx.reject(
                    LogCode::ReturnHookCbak,
                    "hook and cbak must return exactly one int64_t".into(),
                ));
            }
        }
    }

    Ok(())
}

fn check_code_section(
    module: &[u8],
    section: Section,
    env: &ModuleEnv,
    config: &ValidatorConfig,
    ctx: LogCtx<'_>,
    ceilings: &mut GuardCeilings,
) -> Result<(), ValidationError> {
    let mut cur = Cursor::at(module, section.payload_start);
    let func_count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;

    for codesec in 0..func_count {
        let code_size = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        let code_end = cur
            .pos()
            .saturating_add(usize::try_from(code_size).unwrap_or(usize::MAX));

        let local_count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        for local in 0..local_count {
            let _run_length = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            let offset = cur.pos();
            let local_type = cur.read_u8().map_err(|e| reject_read(ctx, e))?;
            if !(0x7C..=0x7F).contains(&local_type) {
                return Err(ctx.reject(
                    LogCode::TypeInvalid,
                    format!("invalid local type, codesec: {codesec} local: {local} offset: {offset}"),
                ));
            }
        }

        // Locals may fill the whole declared body; nothing to analyze then.
        if cur.pos() < code_end {
            let count = check_guard(module, codesec, cur.pos(), code_end, env, config, ctx)?;
            if codesec == u64::from(env.hook_func_idx) {
                ceilings.hook = count;
            } else if Some(codesec) == env.cbak_func_idx.map(u64::from) {
                ceilings.cbak = count;
            }
        }
        cur.seek(code_end);
    }

    Ok(())
}
