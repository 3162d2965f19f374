//! # Iara CLI Application
//!
//! Command-line entry point for the gazette watcher and the assistant's
//! knowledge base.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `watch`: run crawl cycles on the schedule until Ctrl-C
//!   - `crawl`: run a single crawl cycle now
//!   - `learn`: teach the assistant a fact
//!   - `ask`: ask the assistant a question
//!
//! The RAG commands read `GOOGLE_API_KEY` and `CHROMADB_URL` from the
//! environment.

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use iara::Error;
use iara::gazette::{Crawler, FileStore, GazetteConfig, HttpFetcher, WebhookNotifier};
use iara::rag::{
    ChromaClient, DEFAULT_CHROMA_URL, GeminiClient, LearnRequest, MessageRequest, RagConfig,
    RagService, Response,
};
use iara::scheduler::{CrawlScheduler, ScheduleConfig};
use tracing::{info, instrument};

const CHROMA_MAX_RETRIES: u32 = 10;
const CHROMA_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(author, version, about = "Official gazette watcher and personal assistant backend", long_about = None)]
struct Cli {
    /// Export traces and metrics over OTLP
    #[arg(long, global = true)]
    otel: bool,

    /// Also write logs to iara.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run crawl cycles on the schedule until interrupted
    Watch(CrawlArgs),

    /// Run a single crawl cycle now
    Crawl(CrawlArgs),

    /// Teach the assistant a fact
    Learn(RagArgs),

    /// Ask the assistant a question
    Ask(RagArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// File holding the last notified edition number
    #[arg(short, long, default_value = "last_dom")]
    state_file: PathBuf,
}

#[derive(Args, Debug)]
struct RagArgs {
    /// Fact or question text
    #[arg(required = true)]
    text: String,

    /// Identifier of the user talking to the assistant
    #[arg(short, long)]
    user_id: Option<String>,

    /// Vector store collection holding the facts
    #[arg(short, long, default_value = "facts")]
    collection: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing(cli.otel, cli.log_dir)?;

    match cli.command {
        Commands::Watch(args) => watch_command(args).await?,
        Commands::Crawl(args) => crawl_command(args).await?,
        Commands::Learn(args) => learn_command(args).await?,
        Commands::Ask(args) => ask_command(args).await?,
    }

    Ok(())
}

type GazetteCrawler = Crawler<HttpFetcher, WebhookNotifier, FileStore>;

fn crawler(args: &CrawlArgs) -> iara::Result<GazetteCrawler> {
    let config = GazetteConfig::builder()
        .state_path(args.state_file.clone())
        .build();
    Ok(Crawler::from_config(config)?)
}

#[instrument]
async fn watch_command(args: CrawlArgs) -> iara::Result<()> {
    let crawler = Arc::new(crawler(&args)?);
    let mut scheduler = CrawlScheduler::new(crawler, ScheduleConfig::default());

    scheduler.start().await?;
    info!(timezone = %scheduler.timezone(), "Watching the gazette, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    scheduler.stop().await?;
    Ok(())
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> iara::Result<()> {
    let crawler = Arc::new(crawler(&args)?);
    let scheduler = CrawlScheduler::new(crawler, ScheduleConfig::default());

    let outcome = scheduler.trigger().await?;
    println!("{}", outcome);
    Ok(())
}

async fn rag_service(
    args: &RagArgs,
) -> iara::Result<RagService<GeminiClient, GeminiClient, ChromaClient>> {
    let api_key = std::env::var("GOOGLE_API_KEY")
        .map_err(|_| Error::Other("GOOGLE_API_KEY environment variable must be set".into()))?;
    let chroma_url =
        std::env::var("CHROMADB_URL").unwrap_or_else(|_| DEFAULT_CHROMA_URL.to_string());

    let config = RagConfig::builder()
        .collection_name(args.collection.clone())
        .build();
    let gemini = GeminiClient::from_config(api_key, &config)?;
    let chroma =
        ChromaClient::connect_with_retry(chroma_url, CHROMA_MAX_RETRIES, CHROMA_RETRY_DELAY).await?;

    let service = RagService::new(gemini.clone(), gemini, chroma, config);
    service.initialize().await;
    Ok(service)
}

fn print_response(response: &Response) -> iara::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if response.success {
        Ok(())
    } else {
        Err(Error::Other(
            response.error.clone().unwrap_or_else(|| "request rejected".to_string()),
        ))
    }
}

#[instrument(skip(args), fields(user_id = ?args.user_id))]
async fn learn_command(args: RagArgs) -> iara::Result<()> {
    let service = rag_service(&args).await?;
    let response = service
        .learn_fact(LearnRequest {
            text: args.text,
            user_id: args.user_id,
        })
        .await?;
    print_response(&response)
}

#[instrument(skip(args), fields(user_id = ?args.user_id))]
async fn ask_command(args: RagArgs) -> iara::Result<()> {
    let service = rag_service(&args).await?;
    let response = service
        .process_message(MessageRequest {
            text: args.text,
            user_id: args.user_id,
        })
        .await?;
    print_response(&response)
}
