use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use citegraph::config::{find_config_file, get_config, load_config, Config};
use citegraph::crawl::{Crawler, HumanVerifier, MatchStrategy, RefusingVerifier, TerminalVerifier};
use citegraph::graph::{
    to_json, write_graph, CitationGraph, CitationGraphBuilder, ExpandOptions, GraphFormat, NodeIdentity,
};
use citegraph::models::{
    title_terms, ArticleBuilder, ArticleRecord, ArticleSource, CiteULikeQuery, ScholarQuery, UNKNOWN_LINK,
};
use citegraph::sources::PageSource;
use citegraph::utils::{HttpClient, ResponseCache};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// citegraph - Build citation graphs from academic search result pages
#[derive(Parser, Debug)]
#[command(name = "citegraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build citation graphs from academic search result pages", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Neither read nor write the page cache
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    /// Fail instead of prompting when the site asks for human verification
    #[arg(long, global = true, default_value_t = false)]
    no_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keyword search on the academic search engine
    #[command(alias = "s")]
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 10)]
        limit: usize,

        /// Exclude citation-only entries
        #[arg(long)]
        results_only: bool,
    },

    /// Search the CiteULike reference library
    Citeulike {
        /// Author filter (repeatable)
        #[arg(long, short)]
        author: Vec<String>,

        /// Tag filter (repeatable)
        #[arg(long, short)]
        tag: Vec<String>,

        /// Title filter
        #[arg(long)]
        title: Option<String>,

        #[arg(long, default_value_t = 1800)]
        year_start: i32,

        #[arg(long, default_value_t = 3000)]
        year_end: i32,

        #[arg(long, default_value = "none")]
        isbn: String,

        /// Number of result pages to read
        #[arg(long, default_value_t = 2)]
        pages: u32,
    },

    /// Build the citation graph of one article
    #[command(alias = "g")]
    Graph {
        /// Title of the article
        #[arg(long)]
        title: String,

        /// Author of the article (repeatable)
        #[arg(long, short, required = true)]
        author: Vec<String>,

        /// Publication year
        #[arg(long, short)]
        year: i32,

        /// Keep at most this many citing articles per expanded node
        #[arg(long, short)]
        limit: Option<usize>,

        /// Levels of citing articles to expand
        #[arg(long, short, default_value_t = 1)]
        depth: usize,

        /// How the article is picked among search results
        #[arg(long, value_enum, default_value_t = MatchStrategy::Strict)]
        strategy: MatchStrategy,

        /// Search term attached to every crawled record (repeatable; defaults to the title's words)
        #[arg(long, short)]
        tag: Vec<String>,

        /// Append every citing result, even when it duplicates an existing node
        #[arg(long)]
        no_dedup: bool,

        /// Write the graph as Graphviz DOT
        #[arg(long)]
        dot: Option<PathBuf>,

        /// Write the graph as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Manage the page cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show cache location and size
    Stats,
    /// Delete every cached page
    Clear,
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("citegraph={}", level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format.as_deref() == Some("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(find_config_file);
    let config = match &path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => get_config().context("Failed to read configuration from the environment")?,
    };
    Ok((config, path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, config_path) = load(&cli)?;
    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let cache = ResponseCache::from_config(&config.cache);

    match &cli.command {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }
        Commands::Cache { command } => {
            match command {
                CacheCommands::Stats => {
                    let stats = cache.stats();
                    if !stats.enabled {
                        println!("Cache: disabled");
                    } else {
                        println!("Cache: enabled");
                        println!("Location: {}", stats.cache_dir.display());
                        println!("Pages: {}", stats.entries);
                        println!("Size: {} KB", stats.size_kb);
                    }
                }
                CacheCommands::Clear => {
                    cache.clear().context("Failed to clear cache")?;
                    if !cli.quiet {
                        eprintln!("Cache cleared successfully.");
                    }
                }
            }
            return Ok(());
        }
        _ => {}
    }

    cache.initialize().context("Failed to initialize cache")?;
    let transport: Arc<dyn PageSource> = Arc::new(HttpClient::from_config(&config.scholar)?);
    let verifier: Arc<dyn HumanVerifier> = if cli.no_interactive || !std::io::stdin().is_terminal() {
        Arc::new(RefusingVerifier)
    } else {
        Arc::new(TerminalVerifier::new(Arc::clone(&transport)))
    };
    let crawler = Crawler::new(&config, transport, cache, verifier)?;

    match cli.command {
        Commands::Search {
            terms,
            limit,
            results_only,
        } => {
            let query = ScholarQuery::new(terms).limit(limit).results_only(results_only);
            let records = crawler.search_scholar(&query).await?;
            output_articles(&records, cli.output)?;
        }

        Commands::Citeulike {
            author,
            tag,
            title,
            year_start,
            year_end,
            isbn,
            pages,
        } => {
            let mut query = CiteULikeQuery::new()
                .years(year_start, year_end)
                .isbn(isbn)
                .page_limit(pages);
            query.authors = author;
            query.tags = tag;
            query.title = title;

            let records = crawler.search_citeulike(&query).await?;
            output_articles(&records, cli.output)?;
        }

        Commands::Graph {
            title,
            author,
            year,
            limit,
            depth,
            strategy,
            tag,
            no_dedup,
            dot,
            json,
        } => {
            let target = graph_target(title, author, year, tag);

            let (candidates, index) = crawler
                .find_article(&target, strategy)
                .await
                .with_context(|| format!("Failed to look up \"{}\"", target.title()))?;
            let root = candidates
                .into_iter()
                .nth(index)
                .context("Matched result is missing from the candidate list")?;
            if !cli.quiet {
                eprintln!("Matched: {}", root);
            }

            let identity = if no_dedup {
                NodeIdentity::None
            } else {
                NodeIdentity::Fingerprint
            };
            let options = ExpandOptions::from_config(&config.scholar).identity(identity);

            let (mut graph, root) = CitationGraph::with_root(root);
            let mut builder = CitationGraphBuilder::new(&crawler, options);
            if !cli.quiet && std::io::stderr().is_terminal() {
                builder = builder.with_progress(page_progress_bar());
            }

            let report = builder.expand_depth(&mut graph, root, limit, depth).await?;
            if !cli.quiet {
                eprintln!(
                    "{} nodes, {} edges ({} pages, {} from cache)",
                    graph.node_count(),
                    graph.edge_count(),
                    report.pages_fetched,
                    report.pages_from_cache
                );
            }

            if let Some(path) = dot {
                write_graph(&graph, &path, GraphFormat::Dot)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            if let Some(path) = json {
                write_graph(&graph, &path, GraphFormat::Json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            output_graph(&graph, cli.output)?;
        }

        Commands::Cache { .. } | Commands::Config => {}
    }

    Ok(())
}

/// The article to look up; tagged with `tags`, or with its title's words when none are given
fn graph_target(title: String, authors: Vec<String>, year: i32, tags: Vec<String>) -> ArticleRecord {
    let tags = if tags.is_empty() { title_terms(&title) } else { tags };
    ArticleBuilder::new(title, UNKNOWN_LINK, ArticleSource::Manual)
        .authors(authors)
        .year(year)
        .tags(tags)
        .build()
}

fn page_progress_bar() -> indicatif::ProgressBar {
    let pb = indicatif::ProgressBar::new(0);
    if let Ok(style) = indicatif::ProgressStyle::with_template("{msg}: {bar:40.cyan/blue} {pos}/{len} pages") {
        pb.set_style(style.progress_chars("█▓▒░ "));
    }
    pb
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

fn year_cell(record: &ArticleRecord) -> String {
    if record.has_known_year() {
        record.year().to_string()
    } else {
        String::new()
    }
}

fn output_articles(records: &[ArticleRecord], format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
        }
        OutputFormat::Plain => {
            for record in records {
                println!("{}", record);
                println!("  URL: {}", record.public_url());
                if record.has_citing_url() {
                    println!("  Cited by: {}", record.citing_url());
                }
                if let Some(doi) = record.doi() {
                    println!("  DOI: {}", doi);
                }
                println!();
            }
        }
        OutputFormat::Table | OutputFormat::Auto => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["#", "Title", "Authors", "Year", "Cited by", "Source"]);

            for (i, record) in records.iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i),
                    Cell::new(truncate(record.title(), 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&record.authors().join(", "), 30)),
                    Cell::new(year_cell(record)),
                    Cell::new(record.citations()),
                    Cell::new(record.source().to_string()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_graph(graph: &CitationGraph, format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&to_json(graph))?);
            Ok(())
        }
        other => {
            let records: Vec<ArticleRecord> = graph.records().map(|(_, r)| r.clone()).collect();
            output_articles(&records, other)
        }
    }
}
