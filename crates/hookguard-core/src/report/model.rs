//! Serializable admission report schema.
//!
//! The report is the stable JSON surface consumed by CI and admission
//! tooling. Field layout changes require a bump of
//! [`crate::SCHEMA_VERSION`].

use serde::{Deserialize, Serialize};

use crate::log::model::{LogCode, LogEvent, ValidationError};
use crate::wasm::validate::GuardCeilings;

/// Identity of the tool that produced a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub path: Option<String>,
    pub size_bytes: u64,
    pub hash: ModuleHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHash {
    pub algorithm: String,
    pub value: String,
}

/// Admission verdict for one module.
///
/// Exit code mapping is policy-defined and stable: 0 for acceptance, 1 for
/// rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeInfo {
    pub accepted: bool,
    /// Present iff accepted.
    pub ceilings: Option<GuardCeilings>,
    /// Present iff rejected.
    pub reject_code: Option<LogCode>,
    pub reject_detail: Option<String>,
    pub exit_code: i32,
}

impl OutcomeInfo {
    pub fn accepted(ceilings: GuardCeilings) -> Self {
        Self {
            accepted: true,
            ceilings: Some(ceilings),
            reject_code: None,
            reject_detail: None,
            exit_code: 0,
        }
    }

    pub fn rejected(error: &ValidationError) -> Self {
        Self {
            accepted: false,
            ceilings: None,
            reject_code: Some(error.code),
            reject_detail: Some(error.detail.clone()),
            exit_code: 1,
        }
    }
}

/// Full admission report: tool identity, module identity, verdict, and the
/// complete event stream in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub module: ModuleInfo,
    pub outcome: OutcomeInfo,
    pub events: Vec<LogEvent>,
}

impl ValidationReport {
    pub fn new(
        tool: ToolInfo,
        module: ModuleInfo,
        outcome: OutcomeInfo,
        events: Vec<LogEvent>,
    ) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            tool,
            module,
            outcome,
            events,
        }
    }
}
