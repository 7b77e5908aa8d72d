use anyhow::Result;
use clap::Parser;
use tracing::info;

mod audio;
mod config;
mod display;
mod error;
mod frames;
mod playback;
mod render;
mod scrub;
mod session;
mod source;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "specwatch")]
#[command(author, version, about = "Terminal spectrogram monitor for remotely recorded audio")]
pub struct Args {
    /// Base URL of the recording discovery service
    #[arg(short, long)]
    server: Option<String>,

    /// Seconds between fetch polls
    #[arg(short, long)]
    poll_interval: Option<u64>,

    /// Target playback chunk duration in milliseconds
    #[arg(long)]
    chunk_ms: Option<f64>,

    /// FFT window size (power of two)
    #[arg(long)]
    fft_size: Option<usize>,

    /// Lowest rendered frequency in Hz
    #[arg(long)]
    min_freq: Option<f64>,

    /// Highest rendered frequency in Hz
    #[arg(long)]
    max_freq: Option<f64>,

    /// Assumed sample rate for the frequency axis
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Color ramp: classic, ice, ember, mono
    #[arg(long, default_value = "classic")]
    ramp: String,

    /// Config file path
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("specwatch=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load or create config, then layer CLI overrides on top
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);
    config.validate()?;

    info!(server = %config.fetch.server_url, "starting specwatch");

    display::terminal::run(config).await
}
