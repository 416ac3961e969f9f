use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use lineup_client::{
    ClientConfig, HttpGateway, ReviewCommand, ensure_succeeded, mime_hint_for, render,
    terminal::REVIEW_HELP,
};
use lineup_flow::{FlowError, FlowRunner, LaunchAddress, RedirectSignal, UploadAttempt};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "lineup", about = "Turn a festival lineup image into a playlist")]
struct Cli {
    /// Backend API base, overrides LINEUP_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Address the authorization service redirected back to, e.g.
    /// `http://localhost:3000/?auth=success`.
    #[arg(long)]
    launch_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the current session.
    Status,
    /// Print the address to log in with the streaming service.
    Login,
    /// End the backend session.
    Logout,
    /// Upload a lineup image, review the artists and create the playlist.
    Run { image: PathBuf },
}

/// Logs go to stderr so they never mix with the interactive output.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lineup=info,lineup_client=info,lineup_flow=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    info!(api_url = %config.api_url, "Starting lineup client");

    let gateway = Arc::new(HttpGateway::new(&config)?);
    let runner = FlowRunner::new(gateway, config.flow_config());

    let signal = launch_signal(cli.launch_url.as_deref())?;
    let session = runner.boot(signal).await;

    match cli.command {
        Command::Status => {
            if !session.authenticated {
                println!("Not logged in.");
            }
            print!("{}", render(&runner.snapshot()));
        }
        Command::Login => {
            if session.authenticated {
                print!("{}", render(&runner.snapshot()));
                println!("Already logged in.");
                return Ok(());
            }
            match runner.begin_login().await? {
                Some(target) => println!("Open this address to log in:\n{}", target),
                None => print!("{}", render(&runner.snapshot())),
            }
        }
        Command::Logout => {
            runner.end_session().await;
            println!("Logged out.");
        }
        Command::Run { image } => run(&runner, &image).await?,
    }

    Ok(())
}

fn launch_signal(raw: Option<&str>) -> anyhow::Result<Option<RedirectSignal>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let mut launch = LaunchAddress::parse(raw).context("invalid --launch-url")?;
    let signal = launch.take_signal();
    info!(address = %launch.visible(), signal = ?signal, "Read launch address");
    Ok(signal)
}

async fn run(runner: &FlowRunner, image: &Path) -> anyhow::Result<()> {
    if !runner.snapshot().session.authenticated {
        print!("{}", render(&runner.snapshot()));
        bail!("not logged in, run `lineup login` first");
    }

    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let file_name = image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    let upload = UploadAttempt::new(file_name, bytes, mime_hint_for(image));

    println!("Uploading {}...", image.display());
    let result = match runner.submit_file(Some(upload)).await {
        Ok(result) => result,
        Err(FlowError::UploadRejected(reason)) => {
            print!("{}", render(&runner.snapshot()));
            bail!("upload rejected: {}", reason);
        }
        Err(e) => return Err(e.into()),
    };
    print!("{}", render(&runner.snapshot()));
    ensure_succeeded(&result)?;

    println!("{}", REVIEW_HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ReviewCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{} (type `help` for commands)", message);
                continue;
            }
        };

        match command {
            ReviewCommand::SetEventName(name) => runner.set_event_name(name)?,
            ReviewCommand::UpdateArtist { index, text } => {
                if !runner.update_artist(index, text)? {
                    println!("No artist #{}", index + 1);
                }
            }
            ReviewCommand::RemoveArtist { index } => match runner.remove_artist(index)? {
                Some(name) => println!("Removed {}", name),
                None => println!("No artist #{}", index + 1),
            },
            ReviewCommand::Confirm => match runner.confirm_review().await {
                Ok(result) => {
                    print!("{}", render(&runner.snapshot()));
                    return ensure_succeeded(&result);
                }
                Err(FlowError::Validation(e)) => {
                    println!("{}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            },
            ReviewCommand::Cancel => {
                runner.cancel_review()?;
                println!("Review discarded.");
                return Ok(());
            }
            ReviewCommand::Help => {
                println!("{}", REVIEW_HELP);
                continue;
            }
        }
        print!("{}", render(&runner.snapshot()));
    }

    Ok(())
}
