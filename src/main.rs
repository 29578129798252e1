use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use simbridge_lib::{BridgeConfig, DemoOptions};

/// Headless simbridge session: drives a simulated tracker and a simulated long
/// operation through the frame host.
#[derive(Parser, Debug)]
#[command(name = "simbridge", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/simbridge/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to run before ending the session
    #[arg(long, default_value_t = 240)]
    frames: u64,

    /// Frame interval in milliseconds, overrides the config file
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Frame at which the host loses focus for a while
    #[arg(long)]
    unfocus_at: Option<u64>,

    /// Frame at which the simulated operation is cancelled
    #[arg(long)]
    cancel_at: Option<u64>,

    /// Work steps of the simulated operation
    #[arg(long, default_value_t = 50)]
    steps: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BridgeConfig::load_or_default(cli.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.host.log_filter.as_str()),
    )
    .init();

    let mut options = DemoOptions::from_config(&config);
    options.frames = cli.frames;
    if let Some(frame_ms) = cli.frame_ms {
        options.frame_interval = Duration::from_millis(frame_ms.max(1));
    }
    options.unfocus_at = cli.unfocus_at;
    options.cancel_at = cli.cancel_at;
    options.work_steps = cli.steps;

    simbridge_lib::run(options, config)
}
