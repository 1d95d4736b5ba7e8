//! Top-level section framing.
//!
//! A Wasm module is an 8-byte magic/version header followed by sections,
//! each framed as an id byte plus a LEB128 payload length. The walker yields
//! those frames without decoding payloads; the two passes decide which
//! payloads to interpret.

use crate::wasm::cursor::{Cursor, ReadError};

/// Exact required prefix: `\0asm` magic followed by version 1.
pub const WASM_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

/// Smallest byte count the validator will even look at.
pub const MIN_MODULE_LEN: usize = 10;

/// Section ids the validator interprets; everything else is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Custom,
    Type,
    Import,
    Function,
    Export,
    Code,
    Other,
}

impl SectionKind {
    pub fn of(id: u8) -> Self {
        match id {
            0 => SectionKind::Custom,
            1 => SectionKind::Type,
            2 => SectionKind::Import,
            3 => SectionKind::Function,
            7 => SectionKind::Export,
            10 => SectionKind::Code,
            _ => SectionKind::Other,
        }
    }
}

/// One framed section. Offsets are absolute into the module bytes; the
/// declared end may lie past the real end of a lying module, in which case
/// payload reads report truncation through the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub id: u8,
    pub payload_start: usize,
    pub payload_end: usize,
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        SectionKind::of(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("section framing made no progress at offset {offset}")]
    NoProgress { offset: usize },
}

/// Whether the module starts with the exact magic/version prefix.
pub fn has_wasm_header(module: &[u8]) -> bool {
    module.len() >= WASM_HEADER.len() && module[..WASM_HEADER.len()] == WASM_HEADER
}

/// Iterates section frames from just past the header to the end of input.
#[derive(Debug)]
pub struct SectionWalker<'a> {
    cur: Cursor<'a>,
    last_offset: Option<usize>,
}

impl<'a> SectionWalker<'a> {
    /// Walker over `module`, which must already have passed the header
    /// check.
    pub fn new(module: &'a [u8]) -> Self {
        Self {
            cur: Cursor::at(module, WASM_HEADER.len()),
            last_offset: None,
        }
    }

    /// Next section frame, or `None` at end of input.
    ///
    /// Revisiting the same offset twice means the framing arithmetic is
    /// being gamed; that is reported rather than looped on.
    pub fn next_section(&mut self) -> Result<Option<Section>, WalkError> {
        if self.cur.at_end() {
            return Ok(None);
        }

        let offset = self.cur.pos();
        if self.last_offset == Some(offset) {
            return Err(WalkError::NoProgress { offset });
        }
        self.last_offset = Some(offset);

        let id = self.cur.read_u8()?;
        let length = self.cur.read_uleb128()?;

        let payload_start = self.cur.pos();
        let payload_end =
            payload_start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX));
        self.cur.seek(payload_end);

        Ok(Some(Section {
            id,
            payload_start,
            payload_end,
        }))
    }
}
