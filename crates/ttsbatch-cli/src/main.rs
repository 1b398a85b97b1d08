use std::net::SocketAddr;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use ttsbatch_common::config::BatchConfig;
use ttsbatch_core::{Batch, BatchRequester, PayloadTemplate};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ttsbatch", version, about = "Fire a batch of concurrent requests at a TTS server")]
struct Cli {
    /// Defaults to `run` with the configured settings.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send the batch and print one line per response
    Run(BatchArgs),
    /// Print the request bodies without sending them
    Payloads(BatchArgs),
    /// Run the echo server that stands in for the TTS endpoint
    Serve(ServeArgs),
    Version,
}

#[derive(Args, Debug, Default)]
struct BatchArgs {
    #[arg(short, long)]
    url: Option<String>,
    #[arg(short = 'n', long)]
    count: Option<usize>,
    #[arg(long)]
    model_path: Option<String>,
    #[arg(long)]
    output_path: Option<String>,
    /// Adds `outputType` to every payload
    #[arg(long)]
    output_type: Option<String>,
}

impl BatchArgs {
    fn apply(self, cfg: &mut BatchConfig) {
        if let Some(v) = self.url { cfg.url = v; }
        if let Some(v) = self.count { cfg.count = v; }
        if let Some(v) = self.model_path { cfg.model_path = v; }
        if let Some(v) = self.output_path { cfg.output_path = v; }
        if let Some(v) = self.output_type { cfg.output_type = Some(v); }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run(BatchArgs::default())) {
        Commands::Run(args) => run_batch(load_config(args)?).await,
        Commands::Payloads(args) => print_payloads(load_config(args)?),
        Commands::Serve(args) => serve(args).await,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(args: BatchArgs) -> anyhow::Result<BatchConfig> {
    let cfg = resolve(BatchConfig::read().context("loading configuration")?, args)?;
    tracing::debug!(target: "cli", ?cfg, "configuration");
    Ok(cfg)
}

/// Flags win over file and env settings; validation runs on the merged result.
fn resolve(mut cfg: BatchConfig, args: BatchArgs) -> anyhow::Result<BatchConfig> {
    args.apply(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

async fn run_batch(cfg: BatchConfig) -> anyhow::Result<()> {
    let batch = Batch::generate(&PayloadTemplate::from(&cfg), cfg.count)?;
    let requester = BatchRequester::new(&cfg.url)?;
    tracing::info!(target: "cli", url = %requester.url(), requests = batch.len(), "sending batch");
    // individual failures are already reported; the run itself always succeeds
    requester.dispatch(&batch, |report| println!("{report}")).await;
    Ok(())
}

fn print_payloads(cfg: BatchConfig) -> anyhow::Result<()> {
    let batch = Batch::generate(&PayloadTemplate::from(&cfg), cfg.count)?;
    for (_, body) in batch.iter() {
        println!("{body}");
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    ttsbatch_echo::serve(addr).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    // stdout carries the per-request lines
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
