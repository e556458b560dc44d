// src/main.rs
// Operator smoke tool: exercise the launch and status endpoints end to end.

use clap::{Parser, Subcommand};
use scorm_bridge::config::CONFIG;
use scorm_bridge::launcher::SessionLauncher;
use scorm_bridge::session::StatusResponse;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scorm-bridge", about = "Playback-bridge smoke tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch (or resume) a tracking session for a package
    Launch {
        package_id: String,
        /// Bearer credential for the calling user
        #[arg(long, env = "BRIDGE_ACCESS_TOKEN")]
        token: String,
    },
    /// Read the current status of a tracking session
    Status { session_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = CONFIG.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Launch { package_id, token } => {
            let launcher = SessionLauncher::new(&CONFIG.launch_endpoint, CONFIG.http_timeout_secs);
            let launch = launcher.launch(&package_id, &token).await?;
            info!("Session launched");
            println!("session_id:  {}", launch.session_id);
            println!("resumed:     {}", launch.resumed);
            println!("read_only:   {}", launch.read_only);
            println!("bookmark:    {:?}", launch.bookmark);
            println!("activity_id: {}", launch.tracking_config.activity_id);
        }
        Commands::Status { session_id } => {
            let url = format!("{}/{}/status", CONFIG.status_endpoint, session_id);
            let response = reqwest::get(&url).await?;
            if !response.status().is_success() {
                anyhow::bail!("status read returned {}", response.status());
            }
            let status: StatusResponse = response.json().await?;
            println!("status: {:?}", status.status);
        }
    }
    Ok(())
}
