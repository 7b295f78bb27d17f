use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use sycomore::{Crawler, SqliteStore, TermIndex, WebScraper};

#[derive(Parser)]
#[command(name = "sycomore")]
#[command(about = "A scraper for the Assemblée nationale Sycomore directory", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    crawl: CrawlArgs,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct CrawlArgs {
    #[arg(
        long,
        default_value = sycomore::DEFAULT_CACHE_DIR,
        help = "Directory holding cached pages"
    )]
    cache_dir: String,

    #[arg(
        long,
        default_value = sycomore::DEFAULT_DATABASE,
        help = "SQLite database receiving the records"
    )]
    database: String,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        help = "Output format of the run summary"
    )]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every Fifth Republic term, newest first, into the SQLite store (default)
    Crawl(CrawlArgs),
    /// Print the table of legislative terms used for mandate assignment
    Terms {
        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let terms = TermIndex::fifth_republic();

    match cli.command.unwrap_or(Commands::Crawl(cli.crawl)) {
        Commands::Terms { format } => match format {
            OutputFormat::Json => serialize_json(&terms.iter().collect::<Vec<_>>()),
            OutputFormat::Text => {
                for term in terms.iter().rev() {
                    println!("{}", term);
                }
            }
        },

        Commands::Crawl(CrawlArgs {
            cache_dir,
            database,
            format,
        }) => {
            let scraper = WebScraper::cached(&cache_dir).unwrap_or_else(|e| {
                log::error!("Error creating scraper: {}", e);
                process::exit(1);
            });

            let store = SqliteStore::open(&database).unwrap_or_else(|e| {
                log::error!("Error opening database {}: {}", database, e);
                process::exit(1);
            });

            let term_ids = terms.newest_first_ids();
            log::info!(
                "Crawling {} terms into {} (cache: {})",
                term_ids.len(),
                database,
                cache_dir
            );

            let mut crawler = Crawler::new(terms, scraper, store);
            let stats = crawler.run(&term_ids).await.unwrap_or_else(|e| {
                log::error!("Crawl aborted: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&stats),
                OutputFormat::Text => {
                    match crawler.sink().count() {
                        Ok(total) => println!("{} records in {}", total, database),
                        Err(e) => log::warn!("Cannot count stored records: {}", e),
                    }
                    print!("{}", stats);
                }
            }
        }
    }
}
