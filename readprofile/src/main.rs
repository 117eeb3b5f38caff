//! # readprofile - Main Entry Point
//!
//! Supports three operational modes:
//! - **Report** (default): attribute `/proc/profile` ticks to kernel functions
//! - **Info** (`-i`): print the sampling step only
//! - **Admin** (`-r` / `-M <mult>`): reset counters or set the multiplier
//!
//! The report is buffered and written only once attribution succeeded, so a
//! failing run prints nothing on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};

use readprofile::analysis::attribute;
use readprofile::cli::Args;
use readprofile::domain::ProfileError;
use readprofile::export::{JsonExporter, TextReport};
use readprofile::preflight::check_privileges;
use readprofile::profiling::{write_profile_device, ByteOrder, SampleBuffer};
use readprofile::symbolization::{open_symbol_map, SymbolMapReader};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

/// Only the administrative path reports `PermissionDenied`; unreadable
/// snapshots and maps are ordinary I/O failures
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ProfileError>() {
        Some(ProfileError::PermissionDenied(_)) => EXIT_NOPERM,
        _ => EXIT_ERROR,
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    // ── Admin mode: one write to the device, nothing else ───────────────
    if let Some(op) = args.device_write() {
        check_privileges(op)?;
        write_profile_device(&args.device, op)?;
        return Ok(());
    }

    // ── Load the snapshot ───────────────────────────────────────────────
    let buffer = SampleBuffer::load(&args.profile, args.load_options())?;
    if buffer.byte_order() == ByteOrder::Swapped {
        eprintln!("warning: Assuming reversed byte order. Use -n to force native byte order.");
    }

    if args.info {
        println!("Sampling_step: {}", buffer.step());
        return Ok(());
    }

    // ── Attribute ticks while streaming the symbol map ──────────────────
    let (map_path, source) = open_symbol_map(args.mapfile.as_deref())?;
    info!("Reading symbols from {}", map_path.display());

    let mut symbols = SymbolMapReader::new(source, map_path.display().to_string());
    let text_start = symbols.find_text_start()?;

    let mut report = TextReport::new(Vec::new(), args.report_config());
    let mut exporter = args.export.as_ref().map(|_| JsonExporter::new(args.all));

    let summary = attribute(
        &buffer,
        text_start,
        &mut symbols,
        args.absolute_symbols,
        &mut (&mut report, &mut exporter),
    )?;
    info!(
        "Attributed {} ticks over {} ranges, stopped at bin {} of {}",
        summary.total_ticks,
        summary.ranges,
        summary.next_bin,
        buffer.len()
    );

    // Reap the decompressor (if any) before reporting
    symbols.into_inner().close()?;

    report.finish(&summary)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(&report.into_inner()).context("Failed to write report")?;
    out.flush().context("Failed to write report")?;

    // ── Optional JSON export ────────────────────────────────────────────
    if let (Some(path), Some(exporter)) = (args.export.as_ref(), exporter) {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        exporter
            .into_document(&summary)
            .export(BufWriter::new(file))
            .context("Failed to export profile")?;
        info!("Saved JSON export to {}", path.display());
    }

    Ok(())
}
