use agent_relay::{AgentClient, AgentLink, ReportSettings, SdkConfig};
use anyhow::Context;
use clap::{Arg, Command};
use serde_json::Map;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("agent-relay")
        .about("Probe a local Agent")
        .arg(
            Arg::new("agent-url")
                .long("agent-url")
                .global(true)
                .help("Agent address, overrides TP_AGENT_URL"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("status").about("Print the Agent version"))
        .subcommand(
            Command::new("ping")
                .about("Open a development session and release it")
                .arg(Arg::new("project").long("project").default_value("agent-relay"))
                .arg(Arg::new("job").long("job").default_value("ping")),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = cli().get_matches();
    let mut config = SdkConfig::from_env();
    if let Some(url) = matches.get_one::<String>("agent-url") {
        config = config.with_agent_url(url.clone());
    }

    match matches.subcommand() {
        Some(("status", _)) => {
            let status = AgentClient::get_agent_version(&config, config.token.as_deref()).await?;
            let version = status.version().context("Agent reported an unreadable version")?;
            println!("{}", version);
        }
        Some(("ping", args)) => {
            let token = config.developer_token()?;
            let project = args.get_one::<String>("project").cloned().unwrap_or_default();
            let job = args.get_one::<String>("job").cloned().unwrap_or_default();

            let client = AgentClient::start(config, token, Map::new(), ReportSettings::new(project, job))
                .await
                .context("Failed to start a development session")?;
            info!("Session {} is up", client.session().session_id);
            client.stop().await;
            client.close_socket().await;
        }
        _ => unreachable!("a subcommand is required"),
    }

    Ok(())
}
