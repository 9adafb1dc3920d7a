use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use terminology_search::{
    config::Config,
    search::{try_parse_id_list, JsonLinesSource, Search, SearchConfig},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sct-search")]
#[command(about = "Build and query a terminology description index", long_about = None)]
#[command(version)]
struct Cli {
    /// Index directory, overriding configuration
    #[arg(short, long, global = true, env = "SCT_SEARCH_INDEX")]
    index: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from a JSON-lines description file
    Rebuild {
        #[arg(short, long, value_name = "FILE")]
        source: PathBuf,

        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Search descriptions
    Search {
        #[arg(value_name = "TEXT")]
        text: String,

        /// Fuzzy matching, optionally with a maximum edit distance
        #[arg(short, long, value_name = "EDITS")]
        fuzzy: Option<Option<u8>>,

        /// Comma-separated recursive parent concept ids
        #[arg(short, long, value_name = "IDS")]
        recursive_parents: Option<String>,

        /// Comma-separated direct parent concept ids
        #[arg(short, long, value_name = "IDS")]
        direct_parents: Option<String>,

        /// Only active concepts
        #[arg(short, long)]
        active: bool,

        /// Exclude fully specified names
        #[arg(long)]
        no_fsn: bool,

        #[arg(short, long)]
        max_hits: Option<usize>,

        #[arg(short, long, value_enum, default_value = "items")]
        output: Output,
    },

    /// Show index location and statistics
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Items,
    Concepts,
    Descriptions,
    Top,
}

fn init_tracing(config: &Config, json_logs: bool) {
    let json = json_logs || config.logging.json;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn parse_ids(list: Option<&str>) -> anyhow::Result<Vec<u64>> {
    match list {
        Some(list) => Ok(try_parse_id_list(list)?),
        None => Ok(Vec::new()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_search(
    search_config: SearchConfig,
    text: &str,
    fuzzy: Option<Option<u8>>,
    recursive_parents: Option<&str>,
    direct_parents: Option<&str>,
    active: bool,
    no_fsn: bool,
    max_hits: Option<usize>,
    output: Output,
) -> anyhow::Result<serde_json::Value> {
    let recursive_parents = parse_ids(recursive_parents).context("invalid --recursive-parents")?;
    let direct_parents = parse_ids(direct_parents).context("invalid --direct-parents")?;

    let search = Search::open(search_config)?;
    let mut builder = search.new_request().search(text);
    builder = match fuzzy {
        Some(Some(edits)) => builder.use_fuzzy(edits),
        Some(None) => builder.use_default_fuzzy(),
        None => builder,
    };
    if !recursive_parents.is_empty() {
        builder = builder.with_recursive_parents(recursive_parents);
    }
    if !direct_parents.is_empty() {
        builder = builder.with_direct_parents(direct_parents);
    }
    if active {
        builder = builder.only_active();
    }
    if no_fsn {
        builder = builder.without_fully_specified_names();
    }
    if let Some(max_hits) = max_hits {
        builder = builder.max_hits(max_hits);
    }

    let request = builder.build();
    let value = match output {
        Output::Items => serde_json::to_value(request.search()?)?,
        Output::Concepts => serde_json::to_value(request.search_for_concepts()?)?,
        Output::Descriptions => serde_json::to_value(request.search_for_descriptions()?)?,
        Output::Top => serde_json::to_value(request.search_for_single()?)?,
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config, cli.json_logs);

    if let Some(index) = cli.index {
        config.search.index_path = index;
    }
    tracing::debug!(index = %config.search.index_path.display(), "Configuration loaded");

    let value = match cli.command {
        Commands::Rebuild { source, batch_size } => {
            if let Some(batch_size) = batch_size {
                config.search.batch_size = batch_size;
            }
            let search_config = config.search.clone();
            // Rebuilds block on disk I/O; keep them off the async workers
            let report = tokio::task::spawn_blocking(move || {
                let search = Search::open(search_config)?;
                search.rebuild(&JsonLinesSource::new(source))
            })
            .await
            .context("Rebuild task panicked")??;
            serde_json::to_value(report)?
        }
        Commands::Search {
            text,
            fuzzy,
            recursive_parents,
            direct_parents,
            active,
            no_fsn,
            max_hits,
            output,
        } => {
            let search_config = config.search.clone();
            tokio::task::spawn_blocking(move || {
                run_search(
                    search_config,
                    &text,
                    fuzzy,
                    recursive_parents.as_deref(),
                    direct_parents.as_deref(),
                    active,
                    no_fsn,
                    max_hits,
                    output,
                )
            })
            .await
            .context("Search task panicked")??
        }
        Commands::Info => {
            let search = Search::open(config.search.clone())?;
            json!({
                "location": search.index_location(),
                "stats": search.stats()?,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
