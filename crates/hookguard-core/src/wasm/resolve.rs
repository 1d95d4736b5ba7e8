//! First pass: structural resolution.
//!
//! Walks every section once and distills the symbolic environment the guard
//! analyzer needs: where `_g` sits in the function index space, how many
//! function imports precede the defined functions, which local functions the
//! `hook`/`cbak` exports point at, and the local-function → type-index map.
//!
//! All import-surface policy lives here: module name must be `env`, every
//! imported function must be whitelisted, and `_g` must be present. Strict
//! mode additionally forbids custom sections and out-of-order sections,
//! since this pass owns section framing.

use std::collections::BTreeMap;

use crate::api::whitelist::{self, GUARD_NAME};
use crate::log::model::{LogCode, ValidationError};
use crate::log::sink::LogCtx;
use crate::wasm::cursor::Cursor;
use crate::wasm::sections::{SectionKind, SectionWalker};
use crate::wasm::{reject_read, reject_walk};

/// Immutable symbolic environment produced by the first pass and consumed by
/// the guard analyzer.
#[derive(Debug, Clone)]
pub struct ModuleEnv {
    /// Function index of the imported `_g` guard.
    pub guard_import_number: u32,
    /// Highest function index belonging to an import; any call above this
    /// targets a user-defined function.
    pub last_import_number: u32,
    /// Count of function-kind imports (non-function imports do not occupy
    /// the function index space).
    pub import_count: u32,
    /// Local (defined-function) index of the required `hook` export.
    pub hook_func_idx: u32,
    /// Local index of the optional `cbak` export.
    pub cbak_func_idx: Option<u32>,
    /// Type index shared by `hook` and `cbak`.
    pub hook_type_idx: u32,
    /// Local function index → type index, from the function section.
    pub func_types: BTreeMap<u32, u32>,
}

pub(crate) fn resolve_module(
    module: &[u8],
    strict: bool,
    ctx: LogCtx<'_>,
) -> Result<ModuleEnv, ValidationError> {
    let mut guard_import_number: Option<u32> = None;
    let mut import_count: u32 = 0;
    let mut hook_export: Option<u64> = None;
    let mut cbak_export: Option<u64> = None;
    let mut func_types: BTreeMap<u32, u32> = BTreeMap::new();
    let mut prev_section_id: Option<u8> = None;

    let mut walker = SectionWalker::new(module);
    while let Some(section) = walker.next_section().map_err(|e| reject_walk(ctx, e))? {
        if strict {
            if section.kind() == SectionKind::Custom {
                return Err(ctx.reject(
                    LogCode::CustomSectionDisallowed,
                    format!(
                        "custom sections disallowed, found one at offset {}",
                        section.payload_start
                    ),
                ));
            }
            if let Some(prev) = prev_section_id {
                if section.id < prev {
                    return Err(ctx.reject(
                        LogCode::SectionsOutOfSequence,
                        format!(
                            "section {} follows section {prev}, out of canonical order",
                            section.id
                        ),
                    ));
                }
            }
            prev_section_id = Some(section.id);
        }

        let mut cur = Cursor::at(module, section.payload_start);
        match section.kind() {
            SectionKind::Import => {
                let found = read_import_section(&mut cur, ctx)?;
                guard_import_number = found.guard_import_number;
                import_count = found.import_count;
            }
            SectionKind::Export => {
                let (hook, cbak) = read_export_section(&mut cur, ctx)?;
                hook_export = hook;
                cbak_export = cbak;
            }
            SectionKind::Function => {
                read_function_section(&mut cur, &mut func_types, ctx)?;
            }
            _ => {}
        }
    }

    let Some(guard_import_number) = guard_import_number else {
        return Err(ctx.reject(
            LogCode::GuardImport,
            "hook did not import _g (guard) function".into(),
        ));
    };

    let Some(hook_export) = hook_export else {
        return Err(ctx.reject(
            LogCode::ExportMissing,
            "hook did not export: int64_t hook(uint32_t)".into(),
        ));
    };

    // Exported indices count imports first; shift into the defined-function
    // index space before consulting the function section.
    let hook_func_idx = to_local_index(hook_export, import_count, &func_types, ctx)?;
    let cbak_func_idx = match cbak_export {
        Some(idx) => Some(to_local_index(idx, import_count, &func_types, ctx)?),
        None => None,
    };

    let hook_type_idx = func_types[&hook_func_idx];
    if let Some(cbak_idx) = cbak_func_idx {
        if func_types[&cbak_idx] != hook_type_idx {
            return Err(ctx.reject(
                LogCode::HookCbakDiffTypes,
                "hook and cbak must share one type: int64_t (*)(uint32_t)".into(),
            ));
        }
    }

    Ok(ModuleEnv {
        guard_import_number,
        last_import_number: import_count - 1,
        import_count,
        hook_func_idx,
        cbak_func_idx,
        hook_type_idx,
        func_types,
    })
}

struct ImportFacts {
    guard_import_number: Option<u32>,
    import_count: u32,
}

fn read_import_section(
    cur: &mut Cursor<'_>,
    ctx: LogCtx<'_>,
) -> Result<ImportFacts, ValidationError> {
    let count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
    if count == 0 {
        return Err(ctx.reject(
            LogCode::ImportsMissing,
            "hook did not import any functions, required at least _g and accept or rollback"
                .into(),
        ));
    }

    let mut guard_import_number = None;
    let mut func_upto: u32 = 0;

    for _ in 0..count {
        let mod_len = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        if mod_len == 0 || mod_len > cur.remaining() as u64 {
            return Err(ctx.reject(
                LogCode::ImportModuleBad,
                format!("nil or invalid import module at offset {}", cur.pos()),
            ));
        }
        let module_name = cur
            .read_bytes(mod_len as usize)
            .map_err(|e| reject_read(ctx, e))?;
        if module_name != b"env" {
            return Err(ctx.reject(
                LogCode::ImportModuleEnv,
                "hook attempted to specify import module other than 'env'".into(),
            ));
        }

        let name_len = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        if name_len == 0 || name_len > cur.remaining() as u64 {
            return Err(ctx.reject(
                LogCode::ImportNameBad,
                format!("nil or invalid import name at offset {}", cur.pos()),
            ));
        }
        let name_bytes = cur
            .read_bytes(name_len as usize)
            .map_err(|e| reject_read(ctx, e))?;

        let kind = cur.read_u8().map_err(|e| reject_read(ctx, e))?;
        if kind != 0x00 {
            // Not a function import; consume its type/limit and move on
            // without spending a function index.
            cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            continue;
        }
        let _type_idx = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;

        let name = std::str::from_utf8(name_bytes).map_err(|_| {
            ctx.reject(
                LogCode::ImportNameBad,
                format!("import name is not utf-8 at offset {}", cur.pos()),
            )
        })?;

        if name == GUARD_NAME {
            guard_import_number = Some(func_upto);
        } else if !whitelist::is_whitelisted(name) {
            return Err(ctx.reject(
                LogCode::ImportIllegal,
                format!("hook attempted to import a function outside the hook API: `{name}`"),
            ));
        }
        func_upto += 1;
    }

    Ok(ImportFacts {
        guard_import_number,
        import_count: func_upto,
    })
}

fn read_export_section(
    cur: &mut Cursor<'_>,
    ctx: LogCtx<'_>,
) -> Result<(Option<u64>, Option<u64>), ValidationError> {
    let count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
    if count == 0 {
        return Err(ctx.reject(
            LogCode::ExportsMissing,
            "hook did not export any functions, required int64_t hook(uint32_t)".into(),
        ));
    }

    let mut hook_export = None;
    let mut cbak_export = None;

    for _ in 0..count {
        let name_len = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        if name_len == 4 {
            let name = cur.read_bytes(4).map_err(|e| reject_read(ctx, e))?;
            if name == b"hook" {
                let kind = cur.read_u8().map_err(|e| reject_read(ctx, e))?;
                if kind != 0x00 {
                    return Err(ctx.reject(
                        LogCode::ExportHookFunc,
                        "hook did not export a valid int64_t hook(uint32_t)".into(),
                    ));
                }
                hook_export = Some(cur.read_uleb128().map_err(|e| reject_read(ctx, e))?);
                continue;
            }
            if name == b"cbak" {
                let kind = cur.read_u8().map_err(|e| reject_read(ctx, e))?;
                if kind != 0x00 {
                    return Err(ctx.reject(
                        LogCode::ExportCbakFunc,
                        "hook did not export a valid int64_t cbak(uint32_t)".into(),
                    ));
                }
                cbak_export = Some(cur.read_uleb128().map_err(|e| reject_read(ctx, e))?);
                continue;
            }
            // Four letters, but not an entry point.
            cur.read_u8().map_err(|e| reject_read(ctx, e))?;
            cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            continue;
        }

        cur.skip(usize::try_from(name_len).unwrap_or(usize::MAX))
            .map_err(|e| reject_read(ctx, e))?;
        cur.read_u8().map_err(|e| reject_read(ctx, e))?;
        cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
    }

    Ok((hook_export, cbak_export))
}

fn read_function_section(
    cur: &mut Cursor<'_>,
    func_types: &mut BTreeMap<u32, u32>,
    ctx: LogCtx<'_>,
) -> Result<(), ValidationError> {
    let count = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
    if count == 0 {
        return Err(ctx.reject(
            LogCode::FuncsMissing,
            "hook did not establish any functions, required int64_t hook(uint32_t)".into(),
        ));
    }

    for local_idx in 0..count {
        let type_idx = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
        func_types.insert(
            u32::try_from(local_idx).unwrap_or(u32::MAX),
            u32::try_from(type_idx).unwrap_or(u32::MAX),
        );
    }
    Ok(())
}

/// Shifts an exported function index into the defined-function index space
/// and requires it to have an entry in the function section.
fn to_local_index(
    export_idx: u64,
    import_count: u32,
    func_types: &BTreeMap<u32, u32>,
    ctx: LogCtx<'_>,
) -> Result<u32, ValidationError> {
    export_idx
        .checked_sub(u64::from(import_count))
        .and_then(|local| u32::try_from(local).ok())
        .filter(|local| func_types.contains_key(local))
        .ok_or_else(|| {
            ctx.reject(
                LogCode::FuncTypeless,
                "hook or cbak function has no corresponding type in the wasm binary".into(),
            )
        })
}
