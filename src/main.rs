use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use nutriai::app::{self, App};
use nutriai::codec;
use nutriai::config::AppConfig;
use nutriai::session::SessionState;

enum Command {
    Analyze(PathBuf),
    History,
}

struct CliArgs {
    name: Option<String>,
    command: Command,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut name = None;
    let mut history = false;
    let mut path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => name = Some(args.next().context("--name requires a value")?),
            "--history" => history = true,
            other if !other.starts_with('-') => path = Some(PathBuf::from(other)),
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    let command = if history {
        Command::History
    } else {
        Command::Analyze(path.context("usage: nutriai <image-path> [--name NAME] | nutriai --history [--name NAME]")?)
    };
    Ok(CliArgs { name, command })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "nutriai=debug".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let args = parse_args()?;
    let config = AppConfig::from_env()?;
    let App {
        mut controller,
        orchestrator,
    } = app::build(&config);

    controller.restore().await;
    if let Some(name) = &args.name {
        controller.login(name).await?;
    }
    let user = controller
        .user_name()
        .context("no remembered session; pass --name NAME to log in")?
        .to_string();
    tracing::info!(%user, "session ready");

    match args.command {
        Command::Analyze(path) => {
            let ticket = controller.select_image()?;
            let encoded = codec::encode_image(&path).await;
            controller.complete_image(ticket, encoded);
            if !matches!(controller.state(), SessionState::ImageStaged { .. }) {
                anyhow::bail!(
                    controller
                        .failure_message()
                        .unwrap_or("image could not be staged")
                );
            }

            let ticket = controller.start_analysis()?;
            app::drive_analysis(
                &mut controller,
                &orchestrator,
                ticket,
                Duration::from_secs(1),
            )
            .await;

            match controller.state() {
                SessionState::Result { analysis, .. } => {
                    println!("{}", serde_json::to_string_pretty(analysis)?);
                }
                _ => {
                    if let Some(message) = controller.failure_message() {
                        anyhow::bail!(message);
                    }
                }
            }

            // let the detached history save land before the process exits
            if let Some(save) = controller.take_pending_save() {
                match tokio::time::timeout(Duration::from_secs(5), save).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "history save task failed"),
                    Err(_) => tracing::warn!("history save still pending at exit"),
                }
            }
        }
        Command::History => {
            controller.toggle_history().await?;
            if let SessionState::HistoryBrowsing { records, .. } = controller.state() {
                if records.is_empty() {
                    println!("no history for {user}");
                }
                for record in records {
                    println!(
                        "{}  {}  {} kcal",
                        record.created_at, record.analysis.plate_name, record.analysis.total_calories
                    );
                }
            }
        }
    }

    Ok(())
}
