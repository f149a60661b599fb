use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flate2::read::GzDecoder;

use seedmine::assembly_report::process_assembly_report;
use seedmine::cli;
use seedmine::config::ConversionConfig;
use seedmine::fasta::{self, FastaKind};
use seedmine::gff3::GffEngine;
use seedmine::session::ConversionSession;
use seedmine::sink::JsonlSink;
use seedmine::taxonomy::process_taxonomy_dump;

#[derive(Parser)]
#[command(
    name = "seedmine",
    about = "Convert assembly reports, taxonomy dumps, GFF3 and FASTA files into warehouse entities"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Output JSON-lines entity file
    #[arg(short = 'o', long = "out")]
    out: PathBuf,

    /// Input files, dispatched by file name
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Entity conversion");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let config = ConversionConfig::from_file(&cli_args.config)?;
    cli::kv("Config", &cli_args.config.display().to_string());
    cli::kv("Taxon ID", &config.taxon_id);
    cli::kv("Strain", &config.strain_identifier);
    cli::kv("Source", &format!("{:?}", config.source));
    cli::kv("Output", &cli_args.out.display().to_string());
    eprintln!();

    let out_file = File::create(&cli_args.out)
        .with_context(|| format!("failed to create output: {}", cli_args.out.display()))?;
    let sink = JsonlSink::new(BufWriter::new(out_file));
    let engine = GffEngine::from_config(&config);
    let mut session = ConversionSession::new(config, sink);

    // ── Inputs ───────────────────────────────────────────
    cli::section("Inputs");

    for input in &cli_args.inputs {
        let file_name = input
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("bad input path: {}", input.display()))?
            .to_string();
        let base = file_name.strip_suffix(".gz").unwrap_or(&file_name);

        if base.ends_with("assembly_report.txt") {
            let reader = open_reader(input)?;
            let n = process_assembly_report(&mut session, reader, &file_name)?;
            cli::success(&format!("{file_name}: {n} sequences"));
        } else if base == "names.dmp" {
            let reader = open_reader(input)?;
            let n = process_taxonomy_dump(&mut session, reader, &file_name)?;
            cli::success(&format!("{file_name}: {n} organisms"));
        } else if base.ends_with(".gff3") || base.ends_with(".gff") {
            let reader = open_reader(input)?;
            let counts = engine
                .process_file(&mut session, reader, &file_name)
                .with_context(|| format!("failed to convert {file_name}"))?;
            let records: u64 = counts.values().sum();
            cli::success(&format!("{file_name}: {records} records"));
        } else if let Some(kind) = FastaKind::from_file_name(base) {
            let reader = open_reader(input)?;
            let n = fasta::process_fasta(&mut session, reader, &file_name, kind)?;
            cli::success(&format!("{file_name}: {n} sequences"));
        } else {
            bail!("cannot determine the file type of {file_name}");
        }
    }

    session.close().context("failed to flush entities")?;
    let sink = session.into_sink();
    let stored = sink.stored();
    sink.finish()?;

    eprintln!();
    cli::kv("Entities stored", &stored.to_string());
    cli::print_summary(start);
    Ok(())
}

/// Open a file, transparently gunzipping `.gz` inputs.
fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file =
        File::open(path).with_context(|| format!("failed to open input: {}", path.display()))?;
    if path.extension().is_some_and(|e| e == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
