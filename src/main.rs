use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use gearstream::catalog::{Catalog, FileCatalogSource};
use gearstream::config::{Config, SamplingPolicy};
use gearstream::render::{render_events, OutputFormat};
use gearstream::sample::SampleGenerator;
use gearstream::server;
use gearstream::streaming::{event_channel, HttpTransport, RetryPolicy, StreamConsumer};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(name = "gearstream")]
#[command(about = "Streaming product-recommendation sample backend and consumer", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "GEARSTREAM_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP streaming backend
    Serve(ServeArgs),

    /// Run a search against a running backend
    Search(SearchArgs),

    /// Generate one sample from the catalog and print it as JSON
    Sample(SampleArgs),
}

#[derive(clap::Args)]
struct CatalogArgs {
    /// CSV of product codes (header row, code in the first column)
    #[arg(long, env = "GEARSTREAM_PRODUCT_CODES", value_name = "PATH")]
    product_codes: Option<PathBuf>,

    /// JSON product graph
    #[arg(long, env = "GEARSTREAM_PRODUCT_GRAPH", value_name = "PATH")]
    product_graph: Option<PathBuf>,

    /// What to do when the catalog is smaller than a draw
    #[arg(long, value_enum)]
    policy: Option<SamplingPolicy>,

    /// Seed for reproducible samples
    #[arg(long, env = "GEARSTREAM_SEED")]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long, env = "GEARSTREAM_HOST")]
    host: Option<String>,

    #[arg(short, long, env = "GEARSTREAM_PORT")]
    port: Option<u16>,

    /// Pause between streamed lines in milliseconds
    #[arg(long, env = "GEARSTREAM_LINE_DELAY_MS")]
    line_delay_ms: Option<u64>,

    #[command(flatten)]
    catalog: CatalogArgs,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Free-text query (logged only; samples are random)
    query: String,

    /// Backend base URL
    #[arg(long, env = "GEARSTREAM_URL")]
    url: Option<String>,

    /// Only show products associated with this category
    #[arg(long)]
    category: Option<String>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(clap::Args)]
struct SampleArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
}

impl CatalogArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.product_codes {
            config.server.product_codes = path.clone();
        }
        if let Some(path) = &self.product_graph {
            config.server.product_graph = path.clone();
        }
        if let Some(policy) = self.policy {
            config.sampling.policy = policy;
        }
        if self.seed.is_some() {
            config.sampling.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            if let Some(delay) = args.line_delay_ms {
                config.server.line_delay_ms = delay;
            }
            args.catalog.apply(&mut config);
            config.validate()?;

            server::run_server(&config).await
        }
        Commands::Search(args) => {
            if let Some(url) = args.url {
                config.client.base_url = url;
            }
            config.validate()?;

            let consumer = StreamConsumer::new(
                HttpTransport::new(config.client.base_url.clone()),
                RetryPolicy::from(&config.client),
            );
            let (tx, rx) = event_channel();
            let render = render_events(rx, args.format, args.category.as_deref());
            let ((), rendered) = tokio::join!(consumer.run(&args.query, tx), render);
            rendered?;
            Ok(())
        }
        Commands::Sample(args) => {
            args.catalog.apply(&mut config);
            config.validate()?;

            let source = FileCatalogSource::new(
                &config.server.product_codes,
                &config.server.product_graph,
            );
            let catalog = Catalog::load(&source);
            let mut rng = match config.sampling.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let sample = SampleGenerator::new(config.sampling.clone()).generate(&catalog, &mut rng)?;
            println!("{}", serde_json::to_string_pretty(&sample)?);
            Ok(())
        }
    }
}
