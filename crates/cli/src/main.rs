use clap::{Parser, Subcommand};
use std::path::PathBuf;
use whisplay_im::channels::WhisplayImChannel;
use whisplay_im::config::{self, Overrides};

#[derive(Parser)]
#[command(name = "whisplay-im-channel")]
#[command(about = "Poll one message from a whisplay-im bridge, or send a reply", long_about = None)]
struct Cli {
    /// Bridge ip or host:port, with or without scheme (default: WHISPLAY_IM_ADDRESS or config bridge.address)
    #[arg(long, value_name = "HOST")]
    ip: Option<String>,

    /// Optional bearer token; empty means none (default: WHISPLAY_IM_TOKEN or config bridge.token)
    #[arg(long)]
    token: Option<String>,

    /// Poll waitSec sent to the bridge (default 30)
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    wait_sec: Option<i64>,

    /// HTTP timeout in seconds (default 35)
    #[arg(long, value_name = "SECONDS")]
    timeout_sec: Option<u64>,

    /// Config file path (default: WHISPLAY_IM_CONFIG_PATH or ~/.whisplay-im/config.json)
    #[arg(long, short, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Poll one message. Prints the message JSON, or null when none is available.
    Poll {
        /// Override waitSec for this poll
        #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
        wait_sec: Option<i64>,
    },

    /// Send a reply, optionally with an emoji reaction. Prints the bridge response JSON.
    Send {
        /// Reply text
        #[arg(long)]
        reply: String,

        /// Emoji reaction
        #[arg(long)]
        emoji: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        address: cli.ip,
        token: cli.token,
        wait_sec: cli.wait_sec,
        timeout_sec: cli.timeout_sec,
    };

    match cli.command {
        Commands::Version => {
            println!("whisplay-im-channel {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Poll { wait_sec } => {
            let channel = open_channel(cli.config, overrides)?;
            let result = channel.poll(wait_sec).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
        Commands::Send { reply, emoji } => {
            let channel = open_channel(cli.config, overrides)?;
            let result = channel.send(&reply, emoji.as_deref()).await?;
            println!("{}", serde_json::to_string(&result)?);
        }
    }
    Ok(())
}

fn open_channel(
    config_path: Option<PathBuf>,
    overrides: Overrides,
) -> anyhow::Result<WhisplayImChannel> {
    let (file_config, path) = config::load_config(config_path)?;
    let channel_config = config::resolve_channel_config(overrides, &file_config)?;
    log::debug!(
        "using bridge {} (config {})",
        channel_config.base_url(),
        path.display()
    );
    Ok(WhisplayImChannel::new(channel_config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_and_poll_override() {
        let cli = Cli::try_parse_from([
            "whisplay-im-channel",
            "--ip",
            "10.0.0.5:8080",
            "--wait-sec",
            "10",
            "poll",
            "--wait-sec",
            "-1",
        ])
        .unwrap();
        assert_eq!(cli.ip.as_deref(), Some("10.0.0.5:8080"));
        assert_eq!(cli.wait_sec, Some(10));
        match cli.command {
            Commands::Poll { wait_sec } => assert_eq!(wait_sec, Some(-1)),
            _ => panic!("expected Poll"),
        }
    }

    #[test]
    fn send_requires_reply() {
        assert!(Cli::try_parse_from(["whisplay-im-channel", "--ip", "h", "send"]).is_err());
        let cli = Cli::try_parse_from([
            "whisplay-im-channel",
            "--ip",
            "h",
            "send",
            "--reply",
            "hello",
            "--emoji",
            "👍",
        ])
        .unwrap();
        match cli.command {
            Commands::Send { reply, emoji } => {
                assert_eq!(reply, "hello");
                assert_eq!(emoji.as_deref(), Some("👍"));
            }
            _ => panic!("expected Send"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["whisplay-im-channel", "--ip", "h"]).is_err());
    }
}
