use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use playcoach_gateway::api::{ApiServer, ApiState};
use playcoach_gateway::db::{self, AnalysisRepo};
use playcoach_gateway::{
    CoachingAnalyzer, Config, CredentialProvider, SpeechToText, TextToSpeech, TokenVerifier,
};

/// PlayCoach - Voice coaching gateway for competitive gamers
#[derive(Parser)]
#[command(name = "playcoach", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "PLAYCOACH_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check configuration without starting the server
    Check,
    /// Delete expired analyses and exit
    Purge,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,playcoach_gateway=info",
        1 => "info,playcoach_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Check => cmd_check(),
            Command::Purge => cmd_purge(),
        };
    }

    // Missing credentials are startup-fatal on the serve path
    let config = Config::load()?;
    let port = cli.port.unwrap_or(config.port);

    tracing::info!(
        port,
        model = %config.gemini_model,
        project_id = %config.project_id,
        "starting playcoach gateway"
    );

    std::fs::create_dir_all(&config.data_dir)?;
    let pool = db::init(config.data_dir.join("playcoach.db"))?;
    let repo = AnalysisRepo::new(pool, config.ttl_hours, config.retention_limit);

    let credentials = Arc::new(CredentialProvider::from_base64(&config.credentials_base64)?);
    let verifier = Arc::new(TokenVerifier::new(config.project_id.clone()));
    let stt = Arc::new(SpeechToText::new(credentials.clone()));
    let tts = Arc::new(TextToSpeech::new(credentials));
    let analyzer = Arc::new(CoachingAnalyzer::new(&config)?);

    let state = Arc::new(ApiState {
        repo: repo.clone(),
        verifier,
        stt,
        tts,
        analyzer,
    });

    spawn_purge_task(repo);

    ApiServer::new(state, port).run().await?;
    Ok(())
}

/// Hourly cleanup of expired analyses
fn spawn_purge_task(repo: AnalysisRepo) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = repo.purge_expired() {
                tracing::warn!(error = %e, "expired-analysis purge failed");
            }
        }
    });
}

fn cmd_check() -> anyhow::Result<()> {
    let config = Config::load_lenient()?;

    let vars = [
        ("GEMINI_API_KEY", config.gemini_api_key != playcoach_gateway::config::DUMMY_API_KEY),
        ("FIREBASE_CREDENTIALS_BASE64", config.has_real_credentials()),
        ("PROJECT_ID", !config.project_id.is_empty()),
    ];

    for (name, set) in vars {
        println!("{name}: {}", if set { "set" } else { "missing" });
    }

    println!("model: {}", config.gemini_model);
    println!("port: {}", config.port);
    println!("data dir: {}", config.data_dir.display());

    if config.has_real_credentials() {
        println!("configuration ok");
    } else {
        println!("configuration incomplete: serving would fail at startup");
    }

    Ok(())
}

fn cmd_purge() -> anyhow::Result<()> {
    let config = Config::load_lenient()?;
    let pool = db::init(config.data_dir.join("playcoach.db"))?;
    let repo = AnalysisRepo::new(pool, config.ttl_hours, config.retention_limit);

    let deleted = repo.purge_expired()?;
    println!("deleted {deleted} expired analyses");
    Ok(())
}
