//! Second pass: the per-body guard analyzer.
//!
//! `check_guard` walks one function body's instruction stream and certifies
//! the guard discipline: every `loop` must reach a `call _g(id, maxiter)`
//! with statically visible constants before any other control flow. While it
//! walks, it maintains a per-depth `(largest_guard, rolling_count)` pair;
//! closing a block folds the inner pair into the outer one by multiplying
//! the inner instruction count by its declared iteration bound, which is how
//! nested loops compound into a whole-body worst case.
//!
//! The analyzer deliberately does not type-check. Its constant lattice is as
//! conservative as possible: values it cannot prove constant are zero, and a
//! zero `maxiter` is a rejection.

use std::collections::BTreeMap;

use crate::log::model::{LogCode, ValidationError};
use crate::log::sink::LogCtx;
use crate::wasm::cursor::Cursor;
use crate::wasm::reject_read;
use crate::wasm::resolve::ModuleEnv;
use crate::wasm::validate::ValidatorConfig;

/// Guard search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Scanning for the next `loop`. Function bodies start here: a guard is
    /// required at the top of every loop, not at the top of the function.
    SeekingLoop,
    /// Inside a guard window: a `loop` was entered and its `_g` call has not
    /// been seen yet.
    SeekingGuard,
}

/// Cost accounting for one open block depth.
#[derive(Debug, Clone, Copy)]
struct Frame {
    largest_guard: u64,
    rolling_count: u64,
}

impl Frame {
    fn new() -> Self {
        Frame {
            largest_guard: 1,
            rolling_count: 0,
        }
    }
}

fn top(frames: &mut [Frame]) -> &mut Frame {
    frames
        .last_mut()
        .expect("frame stack always holds the body frame")
}

/// Analyzes the instruction stream of one function body over
/// `[start, end)` and returns its worst-case instruction count.
///
/// `codesec` is the body's ordinal in the code section, used only in log
/// details.
pub(crate) fn check_guard(
    module: &[u8],
    codesec: u64,
    start: usize,
    end: usize,
    env: &ModuleEnv,
    config: &ValidatorConfig,
    ctx: LogCtx<'_>,
) -> Result<u64, ValidationError> {
    let mut cur = Cursor::at(module, start);
    let mut mode = Mode::SeekingLoop;

    // Constant lattice, live only inside a guard window.
    let mut stack: Vec<u64> = Vec::new();
    let mut locals: BTreeMap<u64, u64> = BTreeMap::new();
    let mut globals: BTreeMap<u64, u64> = BTreeMap::new();

    let mut frames: Vec<Frame> = vec![Frame::new()];

    while cur.pos() < end {
        let offset = cur.pos();
        let op = cur.read_u8().map_err(|e| reject_read(ctx, e))?;

        // A guard window admits only `block` introductions and straight-line
        // instructions before its `_g` call; every other control opcode
        // means the loop went unguarded.
        if mode == Mode::SeekingGuard && (0x03..=0x0F).contains(&op) {
            return Err(ctx.reject(
                LogCode::GuardMissing,
                format!(
                    "_g() did not occur at start of loop statement, \
                     codesec: {codesec} hook byte offset: {offset}"
                ),
            ));
        }

        // The body's own terminating `end` closes scanning and costs
        // nothing; an empty body therefore counts zero instructions.
        if op == 0x0B && frames.len() == 1 {
            break;
        }

        {
            let frame = top(&mut frames);
            frame.rolling_count = frame.rolling_count.saturating_add(1);
        }

        match op {
            // unreachable / nop / return / drop / select
            0x00 | 0x01 | 0x0F | 0x1A | 0x1B => {}

            // block / loop / if: one block-type byte, one new depth
            0x02 | 0x03 | 0x04 => {
                cur.read_u8().map_err(|e| reject_read(ctx, e))?;
                frames.push(Frame::new());
                if frames.len() - 1 > config.max_nesting_depth {
                    return Err(ctx.reject(
                        LogCode::NestingLimit,
                        format!(
                            "blocks nested beyond {} levels, codesec: {codesec} \
                             hook byte offset: {offset}",
                            config.max_nesting_depth
                        ),
                    ));
                }
                if op == 0x03 {
                    mode = Mode::SeekingGuard;
                    stack.clear();
                    locals.clear();
                    globals.clear();
                }
            }

            0x05 => {} // else

            // end of a block: fold the inner cost into the enclosing depth,
            // scaled by the largest guard declared at the inner depth
            0x0B => match (frames.pop(), frames.last_mut()) {
                (Some(inner), Some(outer)) => {
                    outer.rolling_count = outer.rolling_count.saturating_add(
                        inner.rolling_count.saturating_mul(inner.largest_guard),
                    );
                }
                _ => {
                    return Err(ctx.reject(
                        LogCode::BlockIllegal,
                        format!(
                            "unexpected end instruction, codesec: {codesec} \
                             hook byte offset: {offset}"
                        ),
                    ));
                }
            },

            // br / br_if: label index
            0x0C | 0x0D => {
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            }

            // br_table: label vector plus default
            0x0E => {
                let labels = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                for _ in 0..labels {
                    cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                }
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            }

            0x10 => {
                let callee = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                if callee > u64::from(env.last_import_number) {
                    return Err(ctx.reject(
                        LogCode::CallIllegal,
                        format!(
                            "hook calls a function outside the whitelisted imports, \
                             codesec: {codesec} hook byte offset: {offset}"
                        ),
                    ));
                }
                if callee == u64::from(env.guard_import_number) && mode == Mode::SeekingGuard {
                    resolve_guard_call(&mut stack, &mut frames, codesec, offset, ctx)?;
                    locals.clear();
                    globals.clear();
                    mode = Mode::SeekingLoop;
                }
            }

            0x11 => {
                return Err(ctx.reject(
                    LogCode::CallIndirect,
                    format!(
                        "call_indirect detected and is disallowed in hooks, \
                         codesec: {codesec} hook byte offset: {offset}"
                    ),
                ));
            }

            // local/global access: the only instructions that move constants
            // around the lattice
            0x20..=0x24 => {
                let idx = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                if mode == Mode::SeekingGuard {
                    match op {
                        // local.get / global.get: unknown slots read as 0
                        0x20 => stack.push(locals.get(&idx).copied().unwrap_or(0)),
                        0x23 => stack.push(globals.get(&idx).copied().unwrap_or(0)),
                        // local.tee stores without popping
                        0x22 => {
                            locals.insert(idx, stack.last().copied().unwrap_or(0));
                        }
                        0x21 => {
                            let value = stack.pop().unwrap_or(0);
                            locals.insert(idx, value);
                        }
                        _ => {
                            let value = stack.pop().unwrap_or(0);
                            globals.insert(idx, value);
                        }
                    }
                }
            }

            // loads/stores: alignment and offset immediates
            0x28..=0x3E => {
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            }

            // memory.size: reserved byte
            0x3F => {
                cur.read_u8().map_err(|e| reject_read(ctx, e))?;
            }

            0x40 => {
                return Err(ctx.reject(
                    LogCode::MemoryGrow,
                    format!(
                        "memory.grow instruction not allowed, codesec: {codesec} \
                         hook byte offset: {offset}"
                    ),
                ));
            }

            // i32.const / i64.const: the lattice's constant sources
            0x41 | 0x42 => {
                let immediate = cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                if mode == Mode::SeekingGuard {
                    stack.push(immediate);
                }
            }

            0x43 => cur.skip(4).map_err(|e| reject_read(ctx, e))?,
            0x44 => cur.skip(8).map_err(|e| reject_read(ctx, e))?,

            // numerics without immediates
            0x45..=0xC4 => {}

            // 0xFC prefix: sub-opcode plus one immediate
            0xFC => {
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
                cur.read_uleb128().map_err(|e| reject_read(ctx, e))?;
            }

            other => {
                if config.strict {
                    return Err(ctx.reject(
                        LogCode::WasmValidation,
                        format!(
                            "unrecognized opcode 0x{other:02X}, codesec: {codesec} \
                             hook byte offset: {offset}"
                        ),
                    ));
                }
            }
        }
    }

    let total = frames
        .first()
        .map(|f| f.rolling_count)
        .unwrap_or_default();

    ctx.emit(
        LogCode::InstructionCount,
        &format!("codesec {codesec} worst-case execution count: {total}"),
    );

    if total > config.max_instruction_count {
        return Err(ctx.reject(
            LogCode::InstructionExcess,
            format!(
                "maximum possible instructions exceed {}, make the hook smaller \
                 or check the guards",
                config.max_instruction_count
            ),
        ));
    }

    if mode == Mode::SeekingGuard {
        return Err(ctx.reject(
            LogCode::GuardMissing,
            format!("guard did not occur before end of loop / function, codesec: {codesec}"),
        ));
    }

    Ok(total)
}

/// Resolves a `call _g` inside a guard window: pops `(id, maxiter)` off the
/// constant stack and folds `maxiter` into the current depth's bound.
fn resolve_guard_call(
    stack: &mut Vec<u64>,
    frames: &mut [Frame],
    codesec: u64,
    offset: usize,
    ctx: LogCtx<'_>,
) -> Result<(), ValidationError> {
    let (Some(maxiter), Some(_id)) = (stack.pop(), stack.pop()) else {
        return Err(ctx.reject(
            LogCode::GuardParameters,
            format!(
                "_g() called but could not detect constant parameters, \
                 codesec: {codesec} hook byte offset: {offset}"
            ),
        ));
    };

    // Zero stands for "not a constant" throughout the lattice, and the
    // runtime bound must fit the guard ABI's u32.
    if maxiter == 0 || maxiter > u64::from(u32::MAX) {
        return Err(ctx.reject(
            LogCode::GuardParameters,
            format!(
                "_g() maxiter must be a positive 32-bit constant, got {maxiter}, \
                 codesec: {codesec} hook byte offset: {offset}"
            ),
        ));
    }

    let frame = top(frames);
    if frame.largest_guard < maxiter {
        frame.largest_guard = maxiter;
    }
    stack.clear();
    Ok(())
}
