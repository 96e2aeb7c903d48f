mod error;
mod feed;
mod fetch;
mod ocr;
mod pages;
mod parser;
mod settings;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::ocr::tesseract::TesseractEngine;
use crate::parser::years::YearFilter;
use crate::parser::ReferenceIndex;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "jadwal_scraper", about = "Exam schedule image extractor with OCR header detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Feed URL or JSON file (default: JADWAL_FEED)
    #[arg(short, long)]
    feed: Option<String>,
    /// Origin for relative image paths, e.g. https://example.ac.id (default: JADWAL_ORIGIN)
    #[arg(short, long)]
    origin: Option<String>,
    /// Year to keep, or "semua" for all
    #[arg(short, long, default_value = "semua")]
    year: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List exam schedule images, newest year first
    Index {
        #[command(flatten)]
        source: SourceArgs,
        /// Page to show (1-based)
        #[arg(short, long, default_value = "1")]
        page: usize,
        /// Print the whole filtered index as JSON instead of a page
        #[arg(long)]
        json: bool,
    },
    /// Show the years that have schedule images
    Years {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Run OCR over every image and extract table header lines
    Ocr {
        #[command(flatten)]
        source: SourceArgs,
        /// Where to write the {index, src, judul} export
        #[arg(long, default_value = "data.json")]
        output: PathBuf,
        /// Max images to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Download images as Jadwal_Ujian_<n>.jpg
    Download {
        #[command(flatten)]
        source: SourceArgs,
        /// Target directory
        #[arg(short, long, default_value = "images")]
        dir: PathBuf,
    },
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
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Index { source, page, json } => {
            let (index, filter) = load_index(&settings, &source).await?;
            let refs = index.filtered(&filter);
            if json {
                println!("{}", serde_json::to_string_pretty(&refs)?);
                return Ok(());
            }
            if refs.is_empty() {
                println!("No exam schedule images found for '{}'.", filter);
                return Ok(());
            }

            let current = pages::paginate(&refs, page, settings.per_page);
            println!("{:>4} | {:<4} | {}", "#", "Year", "Image");
            println!("{}", "-".repeat(80));
            for (i, r) in current.items.iter().enumerate() {
                println!("{:>4} | {:<4} | {}", current.offset + i + 1, r.year, r.location);
            }

            let window: Vec<String> = pages::page_window(current.number, current.total_pages)
                .into_iter()
                .map(|n| {
                    if n == current.number {
                        format!("[{}]", n)
                    } else {
                        n.to_string()
                    }
                })
                .collect();
            println!(
                "\nPage {}/{} ({}) | {} images | year: {}",
                current.number,
                current.total_pages,
                window.join(" "),
                refs.len(),
                filter
            );
            Ok(())
        }
        Commands::Years { source } => {
            let (index, _) = load_index(&settings, &source).await?;
            if index.years.is_empty() {
                println!("No years found.");
            }
            for year in index.years.as_slice() {
                let count = index.references.iter().filter(|r| &r.year == year).count();
                println!("{}  ({} images)", year, count);
            }
            Ok(())
        }
        Commands::Ocr { source, output, limit } => {
            let (index, filter) = load_index(&settings, &source).await?;
            let mut locations: Vec<String> = index
                .filtered(&filter)
                .into_iter()
                .map(|r| r.location.clone())
                .collect();
            if let Some(n) = limit {
                locations.truncate(n);
            }
            if locations.is_empty() {
                println!("No images to recognize.");
                return Ok(());
            }

            println!("Recognizing {} images (lang={})...", locations.len(), settings.ocr_language);
            let engine = TesseractEngine::new(settings.tesseract_bin.clone());
            let cancel = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let results = ocr::run_ocr_batch(
                &engine,
                &settings.ocr_language,
                &locations,
                &settings.header_policy(),
                cancel,
            )
            .await?;

            for r in &results {
                println!("Gambar #{}: {}", r.sequence_index, r.source_location);
                if r.header_lines.is_empty() {
                    println!("  - (judul tidak ditemukan)");
                }
                for line in &r.header_lines {
                    println!("  - {}", line);
                }
            }

            let export = serde_json::to_string_pretty(&results)?;
            tokio::fs::write(&output, export)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            let found = results.iter().filter(|r| !r.header_lines.is_empty()).count();
            println!(
                "\n{} of {} images have header lines. Saved to {}",
                found,
                results.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Download { source, dir } => {
            let (index, filter) = load_index(&settings, &source).await?;
            let locations: Vec<String> = index
                .filtered(&filter)
                .into_iter()
                .map(|r| r.location.clone())
                .collect();
            if locations.is_empty() {
                println!("No images to download.");
                return Ok(());
            }
            println!("Downloading {} images to {}...", locations.len(), dir.display());
            let stats = fetch::save_images(locations, &dir).await?;
            println!(
                "Done: {} images ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", elapsed_label(elapsed));
    }

    result
}

/// Fetch the feed and build the reference index; CLI flags win over settings.
async fn load_index(
    settings: &Settings,
    source: &SourceArgs,
) -> anyhow::Result<(ReferenceIndex, YearFilter)> {
    let feed = source
        .feed
        .as_deref()
        .or(settings.feed.as_deref())
        .context("no feed given: pass --feed or set JADWAL_FEED")?;
    let origin = source
        .origin
        .as_deref()
        .or(settings.origin.as_deref())
        .context("no origin given: pass --origin or set JADWAL_ORIGIN")?;
    let filter: YearFilter = source.year.parse()?;

    let records = fetch::fetch_feed(feed).await?;
    let index = parser::build_reference_index(&records, origin);
    if let YearFilter::Year(y) = &filter {
        if !index.years.contains(y) {
            info!("Year {} not present; available: {:?}", y, index.years.as_slice());
        }
    }
    Ok((index, filter))
}

/// Run time for the footer: seconds with a decimal under a minute, else h/m/s.
fn elapsed_label(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m {:02}s", m, s),
        _ => format!("{}h {:02}m {:02}s", h, m, s),
    }
}
