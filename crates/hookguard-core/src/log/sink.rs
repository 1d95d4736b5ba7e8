//! Log sinks for hook admission events.
//!
//! The validator never owns an output stream; it writes through the
//! [`GuardLog`] trait supplied by the caller. Sinks must tolerate every
//! event the validator can produce and must never fail validation: a sink
//! that cannot write simply drops the event.

use std::io::Write;
use std::sync::Mutex;

use crate::log::model::{LogCode, LogEvent, ValidationError};

/// Receiver for admission log events.
///
/// Implementations must write atomically per event; the validator may be
/// invoked concurrently on distinct inputs against a shared sink.
pub trait GuardLog {
    fn emit(&self, code: LogCode, account: &str, detail: &str);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl GuardLog for NullLog {
    fn emit(&self, _code: LogCode, _account: &str, _detail: &str) {}
}

/// Sink that retains events in memory, in emission order.
///
/// Used to assemble reports and by tests asserting on exact event streams.
#[derive(Debug, Default)]
pub struct MemoryLog {
    events: Mutex<Vec<LogEvent>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().expect("log mutex poisoned").clone()
    }

    /// Drains and returns all events emitted so far.
    pub fn take(&self) -> Vec<LogEvent> {
        std::mem::take(&mut *self.events.lock().expect("log mutex poisoned"))
    }
}

impl GuardLog for MemoryLog {
    fn emit(&self, code: LogCode, account: &str, detail: &str) {
        self.events.lock().expect("log mutex poisoned").push(LogEvent {
            code,
            account: account.to_string(),
            detail: detail.to_string(),
        });
    }
}

/// Sink that streams one formatted line per event to a writer.
///
/// The line format is `HookSet(CODE)[account]: detail`. The mutex makes each
/// event a single atomic write; write errors are ignored.
#[derive(Debug)]
pub struct WriterLog<W: Write> {
    inner: Mutex<W>,
}

impl<W: Write> WriterLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner().expect("log mutex poisoned")
    }
}

impl<W: Write> GuardLog for WriterLog<W> {
    fn emit(&self, code: LogCode, account: &str, detail: &str) {
        let mut w = self.inner.lock().expect("log mutex poisoned");
        let _ = writeln!(w, "HookSet({code})[{account}]: {detail}");
    }
}

/// Per-validation logging context: the sink plus the opaque account string.
///
/// All rejection paths flow through [`LogCtx::reject`], which guarantees the
/// invariant that exactly one event is emitted for the violation that ends a
/// validation.
#[derive(Clone, Copy)]
pub struct LogCtx<'a> {
    sink: &'a dyn GuardLog,
    account: &'a str,
}

impl<'a> LogCtx<'a> {
    pub fn new(sink: &'a dyn GuardLog, account: &'a str) -> Self {
        Self { sink, account }
    }

    /// Emits an informational event.
    pub fn emit(&self, code: LogCode, detail: &str) {
        self.sink.emit(code, self.account, detail);
    }

    /// Emits the rejection event and returns the matching typed error.
    pub fn reject(&self, code: LogCode, detail: String) -> ValidationError {
        self.sink.emit(code, self.account, &detail);
        ValidationError { code, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_log_discards() {
        // Compiles and does nothing; the assertion is that this is callable
        // through the trait object.
        let sink: &dyn GuardLog = &NullLog;
        sink.emit(LogCode::GuardMissing, "acct", "detail");
    }

    #[test]
    fn memory_log_retains_order() {
        let log = MemoryLog::new();
        log.emit(LogCode::InstructionCount, "r123", "count 4");
        log.emit(LogCode::GuardMissing, "r123", "loop without guard");

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].code, LogCode::InstructionCount);
        assert_eq!(events[1].code, LogCode::GuardMissing);
        assert_eq!(events[1].account, "r123");
    }

    #[test]
    fn memory_log_take_drains() {
        let log = MemoryLog::new();
        log.emit(LogCode::WasmBadMagic, "", "bad header");
        assert_eq!(log.take().len(), 1);
        assert!(log.events().is_empty());
    }

    #[test]
    fn writer_log_formats_one_line_per_event() {
        let log = WriterLog::new(Vec::new());
        log.emit(LogCode::CallIndirect, "rAcct", "disallowed at offset 40");
        log.emit(LogCode::MemoryGrow, "rAcct", "disallowed at offset 52");

        let out = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(
            out,
            "HookSet(CALL_INDIRECT)[rAcct]: disallowed at offset 40\n\
             HookSet(MEMORY_GROW)[rAcct]: disallowed at offset 52\n"
        );
    }

    #[test]
    fn reject_emits_exactly_one_event() {
        let log = MemoryLog::new();
        let ctx = LogCtx::new(&log, "rAcct");

        let err = ctx.reject(LogCode::CallIllegal, "callee 9 beyond imports".into());
        assert_eq!(err.code, LogCode::CallIllegal);

        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code, LogCode::CallIllegal);
        assert_eq!(events[0].detail, "callee 9 beyond imports");
    }
}
