use std::io::Read;
use std::path::Path;

use anyhow::Result;
use clap::Parser;

use hookguard_core::report::{model::ToolInfo, render};

mod args;

fn main() -> Result<()> {
    let args = args::Args::parse();

    let tool = ToolInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: args.commit.clone(),
    };

    // Admission checks always run strict: what the ledger would enforce.
    let report = if args.wasm_path == "-" {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        hookguard_core::validate_bytes(bytes, None, true, &args.account, tool)
    } else {
        hookguard_core::validate(Path::new(&args.wasm_path), true, &args.account, tool)?
    };

    let output = match args.format {
        args::OutputFormat::Text => format!("{}\n", render::render_summary(&report)),
        args::OutputFormat::Json => format!("{}\n", render::render_json(&report)?),
    };

    match args.out {
        Some(path) => std::fs::write(path, &output)?,
        None => print!("{output}"),
    }

    std::process::exit(report.outcome.exit_code);
}
