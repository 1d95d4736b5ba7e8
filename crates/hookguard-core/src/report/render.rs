use crate::report::model::ValidationReport;

/// One-line human summary of an admission outcome.
pub fn render_summary(report: &ValidationReport) -> String {
    let source = report.module.path.as_deref().unwrap_or("<stdin>");
    match (&report.outcome.ceilings, &report.outcome.reject_code) {
        (Some(ceilings), _) => format!(
            "ACCEPT {source}: hook instruction ceiling {}, cbak instruction ceiling {} ({} bytes)",
            ceilings.hook, ceilings.cbak, report.module.size_bytes
        ),
        (None, Some(code)) => {
            let detail = report.outcome.reject_detail.as_deref().unwrap_or_default();
            format!("REJECT {source}: {code} {detail}")
        }
        // An outcome always carries one of the two; render something sane
        // rather than panicking on a hand-built report.
        (None, None) => format!("REJECT {source}: malformed outcome"),
    }
}

/// Pretty-printed JSON form of the full report.
pub fn render_json(report: &ValidationReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
