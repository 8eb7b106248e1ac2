use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use aip_extract::config::Settings;
use aip_extract::layout::LayoutClient;
use aip_extract::parser::{self, extract, sections};
use aip_extract::{load_elements, SectionId};

const REPORT_SUFFIX: &str = "aip.json";

#[derive(Parser)]
#[command(name = "aip-extract", about = "Extract AIP aerodrome sections from layout elements")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract sections from an element JSON file
    Extract {
        /// Element stream (bare array or {"elements": [...]})
        input: PathBuf,
        /// Section to extract
        #[arg(short, long, value_enum, default_value = "all")]
        section: SectionArg,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract every element file in a directory, in parallel
    Batch {
        dir: PathBuf,
        /// Where reports go (default: next to the inputs)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Send a PDF to the layout service and save its element stream
    Layout {
        pdf: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Layout + full extraction in one go
    Run {
        pdf: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show which elements each section locator retained
    Sections { input: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    All,
    #[value(name = "ad2-1")]
    Ad2_1,
    #[value(name = "ad2-2")]
    Ad2_2,
    #[value(name = "ad2-10")]
    Ad2_10,
    #[value(name = "ad2-12")]
    Ad2_12,
    #[value(name = "ad2-13")]
    Ad2_13,
}

impl SectionArg {
    fn section(self) -> Option<SectionId> {
        match self {
            SectionArg::All => None,
            SectionArg::Ad2_1 => Some(SectionId::Identity),
            SectionArg::Ad2_2 => Some(SectionId::Administrative),
            SectionArg::Ad2_10 => Some(SectionId::Obstacles),
            SectionArg::Ad2_12 => Some(SectionId::RunwayCharacteristics),
            SectionArg::Ad2_13 => Some(SectionId::DeclaredDistances),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract { input, section, output } => {
            let elements = load_elements(&input)
                .with_context(|| format!("reading elements from {}", input.display()))?;
            let source = input.display().to_string();
            match section.section() {
                Some(id) => {
                    let out = extract::extract_section(&source, id, &elements);
                    write_json(&out, output.as_deref())?;
                }
                None => {
                    let report = parser::process_document(&source, &elements);
                    print_summary(&report);
                    write_json(&report, output.as_deref())?;
                }
            }
            Ok(())
        }
        Commands::Batch { dir, output_dir } => {
            let settings = Settings::load()?;
            let inputs = element_files(&dir)?;
            if inputs.is_empty() {
                println!("No element files in {}.", dir.display());
                return Ok(());
            }
            let out_dir = output_dir.unwrap_or_else(|| dir.clone());
            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("creating {}", out_dir.display()))?;
            println!("Extracting {} documents...", inputs.len());
            let counts = process_files(&inputs, &out_dir, settings.batch.chunk_size)?;
            counts.print();
            Ok(())
        }
        Commands::Layout { pdf, output } => {
            let settings = Settings::load()?;
            let client = LayoutClient::new(settings.layout)?;
            let raw = client
                .partition_raw(&pdf)
                .await
                .with_context(|| format!("layout of {}", pdf.display()))?;
            let out = output.unwrap_or_else(|| pdf.with_extension("elements.json"));
            std::fs::write(&out, raw).with_context(|| format!("writing {}", out.display()))?;
            println!("Saved element stream to {}", out.display());
            Ok(())
        }
        Commands::Run { pdf, output } => {
            let settings = Settings::load()?;
            let client = LayoutClient::new(settings.layout)?;

            // Phase 1: layout
            let t_layout = Instant::now();
            let elements = client
                .partition(&pdf)
                .await
                .with_context(|| format!("layout of {}", pdf.display()))?;
            println!(
                "Layout returned {} elements in {:.1}s",
                elements.len(),
                t_layout.elapsed().as_secs_f64()
            );

            // Phase 2: extraction
            let report = parser::process_document(&pdf.display().to_string(), &elements);
            print_summary(&report);
            let out = output.unwrap_or_else(|| pdf.with_extension(REPORT_SUFFIX));
            write_json(&report, Some(&out))?;
            println!("Report written to {}", out.display());
            Ok(())
        }
        Commands::Sections { input } => {
            let elements = load_elements(&input)
                .with_context(|| format!("reading elements from {}", input.display()))?;
            for section in SectionId::ALL {
                let found = sections::locate(&elements, section);
                println!("\n--- {} ({} elements) ---", section, found.len());
                for e in found {
                    let page = e.page_number().map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                    let id = e.element_id.as_deref().unwrap_or("-");
                    let kind: String = e.kind.clone().into();
                    println!(
                        "  p{:>3} | {:<10} | {:<14} | {}",
                        page,
                        truncate(id, 10),
                        kind,
                        truncate(&e.text.replace('\n', " "), 60)
                    );
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_summary(report: &extract::AerodromeReport) {
    info!(
        icao = report.ad2_1.name.as_deref().unwrap_or("-"),
        fields = report.ad2_2.len(),
        obstacle_keys = report.ad2_10.len(),
        runways = report.ad2_12.len(),
        distance_groups = report.ad2_13.len(),
        "extraction finished"
    );
    for w in &report.warnings {
        warn!("{}", w);
    }
}

/// `*.json` files in `dir`, excluding reports this tool wrote.
fn element_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter(|p| !p.to_string_lossy().ends_with(REPORT_SUFFIX))
        .collect();
    files.sort();
    Ok(files)
}

struct BatchCounts {
    documents: usize,
    failed: usize,
    obstacles: usize,
    runways: usize,
    warnings: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Wrote {} reports ({} failed): {} obstacle keys, {} runways, {} warnings.",
            self.documents, self.failed, self.obstacles, self.runways, self.warnings,
        );
    }
}

fn process_files(inputs: &[PathBuf], out_dir: &Path, chunk_size: usize) -> anyhow::Result<BatchCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = BatchCounts {
        documents: 0,
        failed: 0,
        obstacles: 0,
        runways: 0,
        warnings: 0,
    };

    for chunk in inputs.chunks(chunk_size.max(1)) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|path| {
                load_elements(path)
                    .map(|elements| parser::process_document(&path.display().to_string(), &elements))
                    .map_err(|e| (path, e))
            })
            .collect();

        for result in results {
            match result {
                Ok(report) => {
                    let stem = Path::new(&report.source)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "report".into());
                    let out = out_dir.join(format!("{}.{}", stem, REPORT_SUFFIX));
                    write_json(&report, Some(&out))?;
                    counts.documents += 1;
                    counts.obstacles += report.ad2_10.len();
                    counts.runways += report.ad2_12.len();
                    counts.warnings += report.warnings.len();
                }
                Err((path, e)) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    counts.failed += 1;
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
