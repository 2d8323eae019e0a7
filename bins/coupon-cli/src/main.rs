//! coupon-cli: claim coupons from a coupon-hub server.
//!
//! Keeps the active claim in the local data directory, so the cooldown
//! countdown survives across invocations the same way the web UI's does
//! across page reloads.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use coupon_core::clock::{Clock, SystemClock};
use coupon_core::constants::COUNTDOWN_TICK;
use coupon_core::{ClaimResponse, EligibilityResponse};
use coupon_session::identity::DEFAULT_RESOLVE_TIMEOUT;
use coupon_session::{
    ClaimSession, Countdown, FileStorage, FixedIdentity, IdentityResolver, IpifyResolver,
    LocalStorage, SessionState, Tick, format_remaining, resolve_or_fallback,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Coupon Hub command-line client.
#[derive(Parser, Debug)]
#[command(name = "coupon-cli")]
#[command(version, about = "Claim one coupon per cooldown window.")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// coupon-hub base URL.
    #[arg(long, global = true, env = "COUPON_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Directory holding the persisted claim (default: platform data dir).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Cooldown window in seconds, used when the server's cannot be read.
    #[arg(long, global = true, env = "COUPON_COOLDOWN_SECS", default_value = "3600")]
    cooldown_secs: u64,

    /// Identity to claim as (default: public IP lookup, then a generated id).
    #[arg(long, global = true, env = "COUPON_IDENTITY")]
    identity: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Claim the next coupon.
    Claim(ClaimArgs),
    /// Show the active claim and countdown.
    Status,
    /// Follow the countdown until a new claim is possible.
    Watch,
    /// Ask the server whether this identity may claim now.
    Eligibility,
    /// Forget the locally stored claim.
    Reset,
}

#[derive(Args, Debug)]
struct ClaimArgs {
    /// Keep running and follow the countdown after claiming.
    #[arg(short, long)]
    watch: bool,
}

type Session = ClaimSession<FileStorage, SystemClock>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Claim(args) => claim(&cli.common, args).await,
        Commands::Status => status(&cli.common),
        Commands::Watch => watch(open_session(&cli.common)).await,
        Commands::Eligibility => eligibility(&cli.common).await,
        Commands::Reset => reset(&cli.common),
    }
}

fn open_session(common: &CommonArgs) -> Session {
    open_session_with(common, Duration::from_secs(common.cooldown_secs))
}

fn open_session_with(common: &CommonArgs, cooldown: Duration) -> Session {
    let dir = common
        .data_dir
        .clone()
        .unwrap_or_else(FileStorage::default_dir);
    ClaimSession::restore(FileStorage::new(dir), SystemClock, cooldown)
}

/// The server's cooldown window from `GET /api/status`.
async fn server_cooldown(server: &str) -> Result<Duration> {
    let status: serde_json::Value = reqwest::get(api_url(server, "/api/status"))
        .await
        .with_context(|| format!("Failed to reach {server}"))?
        .error_for_status()?
        .json()
        .await
        .context("Malformed status response")?;
    cooldown_from_status(&status).context("Status response has no cooldown_secs")
}

fn cooldown_from_status(status: &serde_json::Value) -> Option<Duration> {
    status["cooldown_secs"]
        .as_u64()
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs)
}

async fn resolve_identity(common: &CommonArgs) -> String {
    let resolver: Box<dyn IdentityResolver> = match &common.identity {
        Some(id) => Box::new(FixedIdentity(id.clone())),
        None => Box::new(IpifyResolver::new()),
    };
    resolve_or_fallback(resolver.as_ref(), DEFAULT_RESOLVE_TIMEOUT).await
}

fn api_url(server: &str, path: &str) -> String {
    format!("{}{path}", server.trim_end_matches('/'))
}

/// Claim a coupon, honouring any countdown already running locally.
async fn claim(common: &CommonArgs, args: ClaimArgs) -> Result<()> {
    let cooldown = match server_cooldown(&common.server).await {
        Ok(cooldown) => cooldown,
        Err(e) => {
            warn!(error = %e, "Falling back to --cooldown-secs");
            Duration::from_secs(common.cooldown_secs)
        }
    };
    let mut session = open_session_with(common, cooldown);

    if session.can_claim() {
        let identity = resolve_identity(common).await;
        session.begin_claim()?;
        match post_claim(&common.server, &identity).await {
            Ok(response) => session.complete_claim(response)?,
            Err(e) => session.fail_claim(&e)?,
        }
    } else {
        println!("A claim is already active.");
    }

    print_session(&session);

    if args.watch {
        watch(session).await?;
    }
    Ok(())
}

/// `POST /api/claim`. Rate-limited and unavailable answers carry a normal
/// claim body alongside their non-2xx status.
async fn post_claim(server: &str, identity: &str) -> Result<ClaimResponse> {
    let response = reqwest::Client::new()
        .post(api_url(server, "/api/claim"))
        .json(&serde_json::json!({ "identity": identity }))
        .send()
        .await
        .with_context(|| format!("Failed to reach {server}"))?;
    response
        .json::<ClaimResponse>()
        .await
        .context("Malformed claim response")
}

fn status(common: &CommonArgs) -> Result<()> {
    let session = open_session(common);
    print_session(&session);
    Ok(())
}

/// Tick the session every second until it returns to idle or Ctrl-C.
async fn watch(session: Session) -> Result<()> {
    if !matches!(session.state(), SessionState::Active { .. }) {
        print_session(&session);
        return Ok(());
    }

    let session = Arc::new(Mutex::new(session));
    let mut countdown = Countdown::start(Arc::clone(&session), COUNTDOWN_TICK, |tick, s| {
        match tick {
            Tick::Running(remaining) => {
                print!("\rClaim your next coupon in: {:<12}", format_remaining(remaining));
                let _ = std::io::stdout().flush();
            }
            Tick::Expired | Tick::Inactive => {
                println!();
                if let Some(message) = s.message() {
                    println!("{message}");
                }
            }
        }
    });

    tokio::select! {
        _ = countdown.join() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for Ctrl-C")?;
            println!("\nStopped; the claim stays active.");
        }
    }
    drop(countdown);
    Ok(())
}

async fn eligibility(common: &CommonArgs) -> Result<()> {
    let identity = resolve_identity(common).await;
    let url = reqwest::Url::parse_with_params(
        &api_url(&common.server, "/api/eligibility"),
        &[("identity", identity.as_str())],
    )
    .context("Invalid server URL")?;

    let response: EligibilityResponse = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to reach {}", common.server))?
        .error_for_status()?
        .json()
        .await
        .context("Malformed eligibility response")?;

    match response.time_remaining {
        Some(ms) if !response.allowed => println!(
            "{identity} must wait {}",
            format_remaining(Duration::from_millis(ms))
        ),
        _ => println!("{identity} may claim a coupon now."),
    }
    Ok(())
}

fn reset(common: &CommonArgs) -> Result<()> {
    let mut session = open_session(common);
    session.reset();
    println!("Local claim cleared.");
    Ok(())
}

fn print_session<S: LocalStorage, C: Clock>(session: &ClaimSession<S, C>) {
    if let Some(message) = session.message() {
        println!("{message}");
    }
    if let Some(coupon) = session.coupon() {
        println!("\n=== YOUR COUPON ===");
        println!("  {}", coupon.code);
        println!("  {}\n", coupon.description);
    }
    match session.time_remaining() {
        Some(remaining) => println!("Claim your next coupon in: {}", format_remaining(remaining)),
        None if session.can_claim() && session.message().is_none() => {
            println!("No active claim. Run `coupon-cli claim` to get one.")
        }
        None => {}
    }
}
