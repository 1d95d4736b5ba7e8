use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "hookguard",
    version,
    about = "Static guard validation for ledger hook WASM"
)]
pub struct Args {
    /// Path to the .wasm hook, or `-` to read stdin
    #[arg(default_value = "-")]
    pub wasm_path: String,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Account identifier used in log formatting
    #[arg(long, default_value = "")]
    pub account: String,

    /// Optional git commit hash for tool metadata
    #[arg(long)]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
