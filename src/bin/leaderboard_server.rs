use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

use live_leaderboard::feed::SupabaseRealtimeClientConfig;
use live_leaderboard::render::Viewport;
use live_leaderboard::server::{run_server, ServerConfig, UsersApiConfig};

const LOG_TARGET: &str = "bin::leaderboard_server";
const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "leaderboard_server")]
#[command(about = "Serve the live leaderboard API, admin endpoints and effect stream", long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// SeaORM-compatible Postgres URL; players live in memory when omitted
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Supabase REST base URL (used to derive realtime websocket URL)
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabase anon key for realtime websocket auth
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    supabase_anon_key: Option<String>,

    /// Optional explicit Supabase realtime websocket URL
    #[arg(long, env = "SUPABASE_REALTIME_URL")]
    supabase_realtime_url: Option<String>,

    /// External users API that player sync reconciles against
    #[arg(long, env = "USERS_API_URL")]
    users_api_url: Option<String>,

    /// Value sent in the X-API-Key header to the users API
    #[arg(long, env = "USERS_API_KEY")]
    users_api_key: Option<String>,

    /// Seconds between background user sync passes
    #[arg(long, env = "USERS_SYNC_INTERVAL_SECS", default_value_t = 30)]
    users_sync_interval_secs: u64,

    /// Height of the display surface in layout units
    #[arg(long, env = "VIEWPORT_HEIGHT", default_value_t = 800.0)]
    viewport_height: f64,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    let config = build_config(args).context("failed to build server config")?;
    run_server(config).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

fn build_config(args: Args) -> Result<ServerConfig> {
    let realtime = realtime_config(&args)?;
    let users = users_config(&args)?;

    if args.viewport_height <= 0.0 {
        return Err(anyhow!("viewport height must be positive"));
    }
    let viewport = Viewport {
        height: args.viewport_height,
        ..Viewport::default()
    };

    Ok(ServerConfig {
        bind: args.bind,
        database_url: args.database_url,
        realtime,
        users,
        viewport,
    })
}

fn realtime_config(args: &Args) -> Result<Option<SupabaseRealtimeClientConfig>> {
    let Some(api_key) = args.supabase_anon_key.as_deref() else {
        if args.supabase_url.is_some() || args.supabase_realtime_url.is_some() {
            return Err(anyhow!("SUPABASE_ANON_KEY is required for realtime updates"));
        }
        return Ok(None);
    };

    let realtime_url = match (&args.supabase_realtime_url, &args.supabase_url) {
        (Some(url), _) => Url::parse(url).context("invalid SUPABASE_REALTIME_URL")?,
        (None, Some(rest)) => SupabaseRealtimeClientConfig::derive_url(rest)?,
        (None, None) => {
            return Err(anyhow!(
                "SUPABASE_URL or SUPABASE_REALTIME_URL is required with SUPABASE_ANON_KEY"
            ))
        }
    };

    info!(target = LOG_TARGET, %realtime_url, "realtime updates enabled");
    Ok(Some(SupabaseRealtimeClientConfig::new(realtime_url, api_key)))
}

fn users_config(args: &Args) -> Result<Option<UsersApiConfig>> {
    match (&args.users_api_url, &args.users_api_key) {
        (Some(url), Some(key)) => Ok(Some(UsersApiConfig {
            endpoint: Url::parse(url).context("invalid USERS_API_URL")?,
            api_key: key.clone(),
            interval: Duration::from_secs(args.users_sync_interval_secs.max(1)),
        })),
        (Some(_), None) => Err(anyhow!("USERS_API_KEY is required with USERS_API_URL")),
        _ => Ok(None),
    }
}
