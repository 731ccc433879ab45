use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lexilink::core::config::PrecedencePolicy;
use lexilink::core::models::Keyword;
use lexilink::io::{read_keyword_records, write_compacted, write_resource_links};
use lexilink::{LexilinkConfig, LinkerFactory};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keyword entity linking against Wikidata and DBpedia
#[derive(Parser)]
#[command(name = "lexilink")]
#[command(version)]
struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a keyword CSV and write the compacted entity table
    Run {
        /// `resource_id,keyword` CSV with a header row
        #[arg(long)]
        input: PathBuf,

        /// Compacted `uri,labels` table
        #[arg(long)]
        output: PathBuf,

        /// Optional `resource_id,uri` links for compacted entities
        #[arg(long)]
        links: Option<PathBuf>,

        /// TOML configuration file; `LEXILINK_*` variables override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        workers: Option<usize>,

        /// Skip DBpedia Spotlight
        #[arg(long)]
        no_annotation: bool,

        /// Which URI wins when both knowledge bases match: graph or annotation
        #[arg(long)]
        precedence: Option<PrecedencePolicy>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("lexilink=info".parse()?))
        .init();

    match App::parse().command {
        Command::Run {
            input,
            output,
            links,
            config,
            workers,
            no_annotation,
            precedence,
        } => {
            let mut settings = LexilinkConfig::load(config.as_deref())
                .context("Failed to load configuration")?;
            if let Some(workers) = workers {
                settings.workers = workers;
            }
            if no_annotation {
                settings.annotation_enabled = false;
            }
            if let Some(precedence) = precedence {
                settings.precedence = precedence;
            }

            let records = read_keyword_records(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let pipeline = LinkerFactory::pipeline(&settings)?;

            let resolver = pipeline.batch().resolver().clone();
            let keywords: Vec<Keyword> = records
                .iter()
                .map(|record| resolver.prepare(&record.keyword, &record.resource_id))
                .collect();

            let report = pipeline.run(keywords).await;
            for (keyword, error) in &report.outcome.failed {
                warn!("Unresolved '{}': {}", keyword, error);
            }

            write_compacted(&output, &report.compacted)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if let Some(links) = links {
                write_resource_links(
                    &links,
                    &records,
                    &report.outcome.results,
                    settings.precedence,
                    &report.compacted,
                )
                .with_context(|| format!("Failed to write {}", links.display()))?;
            }

            let stats = report.outcome.stats();
            info!(
                "Done: {} keywords, {} linked, {} failed, {} compacted entities",
                stats.total,
                stats.both + stats.graph_only + stats.annotation_only,
                stats.failed,
                report.compacted.len()
            );
            if let Some(cache) = &report.graph_cache {
                info!("Wikidata cache hit rate: {:.1}%", cache.hit_rate() * 100.0);
            }
            if let Some(cache) = &report.annotation_cache {
                info!("Spotlight cache hit rate: {:.1}%", cache.hit_rate() * 100.0);
            }
        }
    }

    Ok(())
}
