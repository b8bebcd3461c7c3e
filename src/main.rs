use anyhow::Result;
use clap::{Parser, Subcommand};
use docdex::{
    batch::JobStatus,
    builder::IndexBuilder,
    config::Config,
    index::FileIndex,
    retriever::{self, Retriever},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docdex")]
#[command(about = "Index local documents and search them by keyword")]
#[command(version)]
struct Cli {
    /// Config file (defaults to settings.toml, then config/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index one or more directories
    Index {
        /// Directories to index (defaults come from the config file)
        #[arg(value_name = "DIR")]
        dirs: Vec<PathBuf>,
        /// Re-extract every file even if unchanged
        #[arg(long)]
        force: bool,
    },
    /// Search indexed documents by keyword
    Search {
        /// Search query
        #[arg(value_name = "QUERY")]
        query: String,
        /// Number of results to show
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show what the index currently contains
    Status,
    /// Remove every record from the index
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_default(),
    };

    let index = Arc::new(FileIndex::open(&config.storage.index_file)?);

    match cli.command {
        Commands::Index { dirs, force } => {
            let dirs = if dirs.is_empty() {
                config.indexing.directories.clone()
            } else {
                dirs
            };
            if dirs.is_empty() {
                eprintln!("No directories to index. Pass one or set [indexing] directories.");
                std::process::exit(1);
            }

            let builder = IndexBuilder::new(
                Arc::clone(&index),
                config.indexing.max_workers,
                &config.storage.staging_dir,
            );

            let pb = ProgressBar::new(builder.candidate_count(&dirs) as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files ({msg})")
                    .unwrap()
                    .progress_chars("#>-"),
            );

            let report = builder
                .update_index(&dirs, force, |job| {
                    pb.inc(1);
                    match job.status {
                        JobStatus::Completed => pb.set_message(job.filename.clone()),
                        JobStatus::Failed => {
                            pb.set_message(format!("failed: {}", job.filename));
                        }
                        _ => {}
                    }
                })
                .await?;
            pb.finish_and_clear();

            println!(
                "Indexed {} files ({} skipped, {} errors) across {} directories",
                report.indexed,
                report.skipped,
                report.errors,
                report.details.len()
            );
            for detail in &report.details {
                println!(
                    "  {}: {} indexed, {} skipped, {} errors in {:.2}s",
                    detail.directory.display(),
                    detail.indexed,
                    detail.skipped,
                    detail.errors,
                    detail.duration_secs
                );
            }
        }
        Commands::Search { query, top_k } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k);

            let keyword = retriever::rebuild_from_index(&index).await?;
            if keyword.is_empty() {
                println!("The index is empty. Run `docdex index` first.");
                return Ok(());
            }

            let results = keyword.retrieve(&query, top_k);
            if results.is_empty() {
                println!("No results for \"{}\"", query);
                return Ok(());
            }

            let terms = retriever::tokenize(&query);
            println!("\nFound {} results:", results.len());
            for (i, hit) in results.iter().enumerate() {
                println!(
                    "{}. {} [{}] (score {:.2})",
                    i + 1,
                    hit.filename,
                    hit.file_type,
                    hit.relevance_score
                );

                if let Some(count) = hit.content.structured_len() {
                    println!("   structured data, {} items", count);
                }

                let text = hit.content.canonical_text();
                let snippet = retriever::find_snippet(&text, &terms, config.retrieval.snippet_radius)
                    .unwrap_or_else(|| preview(&text, 100));
                println!("   {}", snippet);
            }
        }
        Commands::Status => {
            let summary = index.summary();
            println!("Indexed files: {}", summary.total_files);
            println!("Last updated: {}", summary.last_updated);
            if !summary.file_types.is_empty() {
                println!("By type:");
                for (file_type, count) in &summary.file_types {
                    println!("  {}: {}", file_type, count);
                }
            }
            if !summary.directories.is_empty() {
                println!("By directory:");
                for (directory, count) in &summary.directories {
                    println!("  {}: {} files", directory.display(), count);
                }
            }
        }
        Commands::Clear => {
            index.clear()?;
            println!("Index cleared.");
        }
    }

    Ok(())
}

/// First `max` characters of the content, with an ellipsis when truncated
fn preview(text: &str, max: usize) -> String {
    let flattened: String = text
        .chars()
        .take(max)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if text.chars().count() > max {
        format!("{}...", flattened.trim_end())
    } else {
        flattened
    }
}
