use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use pdfqa_core::config::{Config, Settings};
use pdfqa_core::error::ErrorClass;
use pdfqa_rag::{GeminiGenerator, Services};

const USAGE: &str = "Usage: pdfqa <ingest <dir>|ask \"<question>\"|purge>";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {e}"); e })?;
    let settings = config.settings()?;
    settings.validate()?;

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }
    let cmd = args.remove(0);
    let runtime = tokio::runtime::Runtime::new()?;
    match cmd.as_str() {
        "ingest" => {
            let Some(dir) = args.first().map(PathBuf::from) else {
                eprintln!("Usage: pdfqa ingest <dir>");
                std::process::exit(2);
            };
            runtime.block_on(ingest(&settings, &dir))
        }
        "ask" => {
            if args.is_empty() {
                eprintln!("Usage: pdfqa ask \"<question>\"");
                std::process::exit(2);
            }
            runtime.block_on(ask(&settings, &args.join(" ")))
        }
        "purge" => runtime.block_on(purge(&settings)),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
}

fn pdf_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pdf")))
        .collect();
    files.sort();
    files
}

async fn ingest(settings: &Settings, dir: &Path) -> anyhow::Result<()> {
    let files = pdf_files(dir);
    if files.is_empty() {
        println!("No PDF files under {}", dir.display());
        return Ok(());
    }
    let services = Services::from_settings(settings).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} PDFs {msg}")?
            .progress_chars("#>-"),
    );
    let (mut ok, mut skipped, mut chunks) = (0usize, 0usize, 0usize);
    for path in &files {
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        pb.set_message(name.clone());
        let bytes = fs::read(path)?;
        match services.ingest.ingest(&name, bytes).await {
            Ok(outcome) => {
                ok += 1;
                chunks += outcome.chunks;
            }
            Err(e) if e.class() == ErrorClass::Client => {
                skipped += 1;
                pb.suspend(|| warn!(file = %path.display(), error = %e, "skipped"));
            }
            Err(e) => {
                pb.abandon_with_message(format!("failed on {name}"));
                return Err(e.into());
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!("Ingested {ok} PDFs ({chunks} chunks), skipped {skipped}");
    Ok(())
}

async fn ask(settings: &Settings, question: &str) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let query = services.query(Arc::new(GeminiGenerator::from_settings(settings)?));
    let answer = query.ask(question).await?;
    println!("{}", answer.text);
    for source in &answer.sources {
        println!("  - {} #{} ({:.3})", source.chunk.doc_id, source.chunk.chunk_index, source.score);
    }
    Ok(())
}

async fn purge(settings: &Settings) -> anyhow::Result<()> {
    let services = Services::from_settings(settings).await?;
    let deleted = services.ingest.purge().await?;
    println!("Deleted {deleted} documents");
    Ok(())
}
