use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use vqsr_extract::table;

/// Extract VQSR site metrics from a GVCF into a bgzipped table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// GVCF to read (VCF or BCF, plain or gzipped)
    input: PathBuf,

    /// Table to write, bgzip compressed
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // usage errors exit with 1, --help and --version with 0
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let stats = table::run(&cli.input, &cli.output).with_context(|| {
        format!(
            "could not extract {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;
    info!(
        "wrote {} rows from {} records to {} ({} reference blocks, {} malformed records skipped)",
        stats.rows,
        stats.records,
        cli.output.display(),
        stats.reference_blocks,
        stats.malformed
    );
    Ok(())
}
