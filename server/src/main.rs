use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::{build_app, AppState, DEFAULT_TOP_K};
use std::net::SocketAddr;
use std::path::PathBuf;
use summary_core::tokenizer::{StopWordList, TokenPattern, TokenizerOptions};
use summary_core::{IndexOptions, SummaryStore};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve patient summaries by id or free-text similarity")]
struct Args {
    /// Summary CSV produced by `indexer build`
    #[arg(long, env = "SUMMARIES_CSV", default_value = "./data/patient_summaries.csv")]
    summaries: PathBuf,
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
    /// Results returned when a request has no top_k
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
    /// Token pattern: alphabetic or word
    #[arg(long, default_value_t = TokenPattern::Alphabetic)]
    token_pattern: TokenPattern,
    /// Stop word list: english or none
    #[arg(long, default_value = "english")]
    stop_words: StopWordList,
    /// Use 1 + ln(tf) term frequencies
    #[arg(long, default_value_t = false)]
    sublinear_tf: bool,
    /// Extra stop words, comma-separated
    #[arg(long, value_delimiter = ',')]
    extra_stop_words: Vec<String>,
    /// Strip accents before tokenizing
    #[arg(long, default_value_t = false)]
    strip_accents: bool,
    /// Apply English stemming to tokens
    #[arg(long, default_value_t = false)]
    stem: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let store = SummaryStore::load_csv(&args.summaries)?;
    tracing::info!(path = %args.summaries.display(), summaries = store.len(), "loaded summaries");
    let options = IndexOptions {
        tokenizer: TokenizerOptions {
            pattern: args.token_pattern,
            stop_words: args.stop_words,
            extra_stop_words: args.extra_stop_words,
            strip_accents: args.strip_accents,
            stem: args.stem,
        },
        sublinear_tf: args.sublinear_tf,
    };
    let app: Router = build_app(AppState::new(store, &options, args.top_k));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
