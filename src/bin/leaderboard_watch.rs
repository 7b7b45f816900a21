use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use live_leaderboard::controller::LeaderboardController;
use live_leaderboard::effects::{
    AnimationSequencer, NoAudio, SequencerConfig, Stage, TerminalBell, TerminalStage, ToneOutput,
};
use live_leaderboard::feed::{HttpLeaderboardSource, PollingFeed};
use live_leaderboard::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "bin::leaderboard_watch";
const DEFAULT_URL: &str = "http://127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "leaderboard_watch")]
#[command(about = "Follow a leaderboard server from the terminal", long_about = None)]
struct Args {
    /// Base URL of the leaderboard server
    #[arg(long, env = "LEADERBOARD_URL", default_value = DEFAULT_URL)]
    url: String,

    /// Milliseconds between polls
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 3_000)]
    poll_interval_ms: u64,

    /// Ring the terminal bell when someone climbs onto the podium
    #[arg(long, default_value_t = false)]
    bell: bool,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

struct WatchConfig {
    base: Url,
    interval: Duration,
    bell: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    let config = build_config(args).context("failed to build watch config")?;
    watch(config).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout is the board; logs go to stderr
    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn build_config(args: Args) -> Result<WatchConfig> {
    if args.poll_interval_ms == 0 {
        return Err(anyhow!("poll interval must be positive"));
    }
    Ok(WatchConfig {
        base: Url::parse(&args.url).context("invalid LEADERBOARD_URL")?,
        interval: Duration::from_millis(args.poll_interval_ms),
        bell: args.bell,
    })
}

async fn watch(config: WatchConfig) -> Result<()> {
    let source = HttpLeaderboardSource::new(&config.base, config.interval)
        .context("failed to build leaderboard client")?;
    info!(
        target = LOG_TARGET,
        endpoint = %source.endpoint(),
        interval_ms = config.interval.as_millis() as u64,
        "watching leaderboard"
    );

    let stage: Arc<dyn Stage> = Arc::new(TerminalStage::new(std::io::stdout()));
    let audio: Arc<dyn ToneOutput> = if config.bell {
        Arc::new(TerminalBell::new(std::io::stdout()))
    } else {
        Arc::new(NoAudio)
    };
    let sequencer = AnimationSequencer::new(Arc::clone(&stage), audio, SequencerConfig::default());
    let controller = LeaderboardController::new(stage, sequencer);

    let stop = CancellationToken::new();
    let (poller, updates) = PollingFeed::new(Arc::new(source), config.interval).spawn(stop.clone());
    let controller_task =
        spawn_named_task("leaderboard-controller", controller.run(updates, stop.clone()));

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = LOG_TARGET, error = %err, "failed to install ctrl-c handler");
    }
    stop.cancel();

    poller.await.context("poller task failed")?;
    controller_task.await.context("controller task failed")?;
    info!(target = LOG_TARGET, "stopped");
    Ok(())
}
