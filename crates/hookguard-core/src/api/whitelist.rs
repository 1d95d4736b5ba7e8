//! Host-API import whitelist.
//!
//! This table is the single source of truth for the host-ABI surface a hook
//! may import. Each entry maps an import name to its function signature in
//! Wasm value types; membership is what the resolver enforces, the stored
//! signatures document the ABI for tooling.
//!
//! The table is sorted by name so lookups can binary-search it.

/// The one distinguished import every hook must carry.
pub const GUARD_NAME: &str = "_g";

/// Wasm numeric value types, by their binary type bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValType {
    I32,
    I64,
    F32,
    F64,
}

impl ValType {
    /// Decodes a value-type byte; `None` for anything outside the four
    /// numeric types (reference types are not part of the hook dialect).
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x7F => Some(ValType::I32),
            0x7E => Some(ValType::I64),
            0x7D => Some(ValType::F32),
            0x7C => Some(ValType::F64),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            ValType::I32 => 0x7F,
            ValType::I64 => 0x7E,
            ValType::F32 => 0x7D,
            ValType::F64 => 0x7C,
        }
    }
}

/// Signature of a whitelisted host function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSig {
    pub result: ValType,
    pub params: &'static [ValType],
}

const fn sig(result: ValType, params: &'static [ValType]) -> HostSig {
    HostSig { result, params }
}

use ValType::{I32, I64};

/// Every host function a hook may import, sorted by name.
pub static IMPORT_WHITELIST: &[(&str, HostSig)] = &[
    (GUARD_NAME, sig(I32, &[I32, I32])),
    ("accept", sig(I64, &[I32, I32, I64])),
    ("emit", sig(I64, &[I32, I32, I32, I32])),
    ("etxn_burden", sig(I64, &[])),
    ("etxn_details", sig(I64, &[I32, I32])),
    ("etxn_fee_base", sig(I64, &[I32, I32])),
    ("etxn_generation", sig(I64, &[])),
    ("etxn_nonce", sig(I64, &[I32, I32])),
    ("etxn_reserve", sig(I64, &[I32])),
    ("fee_base", sig(I64, &[])),
    ("float_compare", sig(I64, &[I64, I64, I32])),
    ("float_divide", sig(I64, &[I64, I64])),
    ("float_int", sig(I64, &[I64, I32, I32])),
    ("float_invert", sig(I64, &[I64])),
    ("float_log", sig(I64, &[I64])),
    ("float_mantissa", sig(I64, &[I64])),
    ("float_mulratio", sig(I64, &[I64, I32, I32, I32])),
    ("float_multiply", sig(I64, &[I64, I64])),
    ("float_negate", sig(I64, &[I64])),
    ("float_one", sig(I64, &[])),
    ("float_root", sig(I64, &[I64, I32])),
    ("float_set", sig(I64, &[I32, I64])),
    ("float_sign", sig(I64, &[I64])),
    ("float_sto", sig(I64, &[I32, I32, I32, I32, I32, I32, I64, I32])),
    ("float_sto_set", sig(I64, &[I32, I32])),
    ("float_sum", sig(I64, &[I64, I64])),
    ("hook_account", sig(I64, &[I32, I32])),
    ("hook_again", sig(I64, &[])),
    ("hook_hash", sig(I64, &[I32, I32, I32])),
    ("hook_param", sig(I64, &[I32, I32, I32, I32])),
    ("hook_param_set", sig(I64, &[I32, I32, I32, I32, I32, I32])),
    ("hook_pos", sig(I64, &[])),
    ("hook_skip", sig(I64, &[I32, I32, I32])),
    ("ledger_keylet", sig(I64, &[I32, I32, I32, I32, I32, I32])),
    ("ledger_last_hash", sig(I64, &[I32, I32])),
    ("ledger_last_time", sig(I64, &[])),
    ("ledger_nonce", sig(I64, &[I32, I32])),
    ("ledger_seq", sig(I64, &[])),
    ("meta_slot", sig(I64, &[I32])),
    ("otxn_burden", sig(I64, &[])),
    ("otxn_field", sig(I64, &[I32, I32, I32])),
    ("otxn_generation", sig(I64, &[])),
    ("otxn_id", sig(I64, &[I32, I32, I32])),
    ("otxn_param", sig(I64, &[I32, I32, I32, I32])),
    ("otxn_slot", sig(I64, &[I32])),
    ("otxn_type", sig(I64, &[])),
    ("rollback", sig(I64, &[I32, I32, I64])),
    ("slot", sig(I64, &[I32, I32, I32])),
    ("slot_clear", sig(I64, &[I32])),
    ("slot_count", sig(I64, &[I32])),
    ("slot_float", sig(I64, &[I32])),
    ("slot_set", sig(I64, &[I32, I32, I32])),
    ("slot_size", sig(I64, &[I32])),
    ("slot_subarray", sig(I64, &[I32, I32, I32])),
    ("slot_subfield", sig(I64, &[I32, I32, I32])),
    ("slot_type", sig(I64, &[I32, I32])),
    ("state", sig(I64, &[I32, I32, I32, I32])),
    ("state_foreign", sig(I64, &[I32, I32, I32, I32, I32, I32, I32, I32])),
    ("state_foreign_set", sig(I64, &[I32, I32, I32, I32, I32, I32, I32, I32])),
    ("state_set", sig(I64, &[I32, I32, I32, I32])),
    ("sto_emplace", sig(I64, &[I32, I32, I32, I32, I32, I32, I32])),
    ("sto_erase", sig(I64, &[I32, I32, I32, I32, I32])),
    ("sto_subarray", sig(I64, &[I32, I32, I32])),
    ("sto_subfield", sig(I64, &[I32, I32, I32])),
    ("sto_validate", sig(I64, &[I32, I32])),
    ("trace", sig(I64, &[I32, I32, I32, I32, I32])),
    ("trace_float", sig(I64, &[I32, I32, I64])),
    ("trace_num", sig(I64, &[I32, I32, I64])),
    ("util_accid", sig(I64, &[I32, I32, I32, I32])),
    ("util_keylet", sig(I64, &[I32, I32, I32, I32, I32, I32, I32, I32, I32])),
    ("util_raddr", sig(I64, &[I32, I32, I32, I32])),
    ("util_sha512h", sig(I64, &[I32, I32, I32, I32])),
    ("util_verify", sig(I64, &[I32, I32, I32, I32, I32, I32])),
];

/// Looks up the signature of a whitelisted host function.
pub fn signature(name: &str) -> Option<&'static HostSig> {
    IMPORT_WHITELIST
        .binary_search_by_key(&name, |entry| entry.0)
        .ok()
        .map(|idx| &IMPORT_WHITELIST[idx].1)
}

/// Whether `name` may be imported by a hook at all.
pub fn is_whitelisted(name: &str) -> bool {
    signature(name).is_some()
}
