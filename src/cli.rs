// Command-line surface: clap definitions and the dispatch from a parsed
// command to the library calls. Each command gets its client and config
// handle passed in explicitly.

use crate::api::{ApiClient, Transport, DEFAULT_BASE_URL};
use crate::config::ConfigStore;
use crate::connection::ConnectMode;
use crate::error::Result;
use crate::smart::{self, SmartOptions, SystemClock};
use crate::{touch, ui};
use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line client for the local v2rayA daemon.
#[derive(Parser, Debug)]
#[command(name = "v2ctl", version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the daemon API
    #[arg(long, global = true, env = "V2RAYA_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Config file holding the auth token [default: ~/.v2ctlcfg.json]
    #[arg(long, global = true, env = "V2CTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Auth with username and password
    Login { username: String },
    /// Create the initial account with username and password
    Account { username: String },
    /// List subscriptions and their fastest servers
    Touch {
        /// Number of servers shown per subscription
        #[arg(long, default_value_t = 10)]
        fast_server: usize,
    },
    /// Show daemon version info
    Version,
    /// List outbounds
    Outbounds,
    /// Import a subscription or server link
    Import { url: String },
    /// One-step select of the best servers (login first)
    Smart(SmartArgs),
}

#[derive(Args, Debug)]
pub struct SmartArgs {
    /// Outbound to attach the servers to
    #[arg(long, default_value = "proxy")]
    pub outbound: String,

    /// Subscription index
    #[arg(long, default_value_t = 0)]
    pub sub_idx: usize,

    /// Refresh the subscription when older than this many hours
    #[arg(long, default_value_t = 1)]
    pub sub_update_hour: u32,

    /// Number of fastest servers to connect
    #[arg(long, default_value_t = 3)]
    pub fast_server: usize,

    /// Merge connections reported by every connect call, not just the last
    #[arg(long)]
    pub cumulative: bool,
}

impl From<&SmartArgs> for SmartOptions {
    fn from(args: &SmartArgs) -> Self {
        SmartOptions {
            outbound: args.outbound.clone(),
            sub_index: args.sub_idx,
            sub_update_hours: args.sub_update_hour,
            fast_servers: args.fast_server,
            connect_mode: if args.cumulative {
                ConnectMode::Cumulative
            } else {
                ConnectMode::LastResponse
            },
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Account,
}

/// Obtain a token and persist it. Nothing is written unless the daemon
/// accepted the credentials.
pub fn authenticate<T: Transport>(
    api: &ApiClient<T>,
    store: &ConfigStore,
    kind: AuthKind,
    username: &str,
    password: &str,
) -> Result<()> {
    let token = match kind {
        AuthKind::Login => api.login(username, password)?,
        AuthKind::Account => api.create_account(username, password)?,
    };
    store.store_token(&token)?;
    info!(path = %store.path().display(), "token saved");
    Ok(())
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let store = ConfigStore::new(cli.config.unwrap_or_else(ConfigStore::default_path));
    let cfg = store.load();
    let api = ApiClient::from_base_url(&cli.api_url, cfg.token).context("failed to build HTTP client")?;

    match cli.command {
        Commands::Login { username } => {
            let password = ui::prompt_password()?;
            authenticate(&api, &store, AuthKind::Login, &username, &password).context("login failed")?;
            ui::success(&format!("Auth Success. token saved into ({})", store.path().display()));
        }
        Commands::Account { username } => {
            let password = ui::prompt_password()?;
            authenticate(&api, &store, AuthKind::Account, &username, &password)
                .context("account creation failed")?;
            ui::success(&format!(
                "Account Create Success. token saved into ({})",
                store.path().display()
            ));
        }
        Commands::Touch { fast_server } => {
            let snapshot = touch::touch(&api)?;
            ui::print_touch(&snapshot, &SystemClock, fast_server);
        }
        Commands::Version => ui::print_json(&api.version()?)?,
        Commands::Outbounds => ui::print_json(&api.outbounds()?)?,
        Commands::Import { url } => ui::print_json(&api.import(&url)?)?,
        Commands::Smart(args) => {
            let opts = SmartOptions::from(&args);
            let spinner = ui::spinner("Selecting servers...");
            let result = smart::run(&api, &SystemClock, &opts, |step| {
                spinner.suspend(|| ui::success(&ui::describe_step(&step)));
            });
            spinner.finish_and_clear();
            result.context("smart select failed")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn smart_defaults() {
        let cli = Cli::try_parse_from(["v2ctl", "smart"]).unwrap();
        let Commands::Smart(args) = cli.command else {
            panic!("expected smart");
        };
        assert_eq!(SmartOptions::from(&args), SmartOptions::default());
    }

    #[test]
    fn smart_flags() {
        let cli = Cli::try_parse_from([
            "v2ctl", "smart", "--outbound", "gaming", "--sub-idx", "2", "--sub-update-hour", "6",
            "--fast-server", "5", "--cumulative",
        ])
        .unwrap();
        let Commands::Smart(args) = cli.command else {
            panic!("expected smart");
        };
        let opts = SmartOptions::from(&args);
        assert_eq!(opts.outbound, "gaming");
        assert_eq!(opts.sub_index, 2);
        assert_eq!(opts.sub_update_hours, 6);
        assert_eq!(opts.fast_servers, 5);
        assert_eq!(opts.connect_mode, ConnectMode::Cumulative);
    }

    #[test]
    fn password_is_not_a_flag() {
        assert!(Cli::try_parse_from(["v2ctl", "login", "admin", "--password", "x"]).is_err());
        let cli = Cli::try_parse_from(["v2ctl", "login", "admin"]).unwrap();
        assert!(matches!(cli.command, Commands::Login { ref username } if username == "admin"));
    }

    #[test]
    fn touch_shows_ten_by_default() {
        let cli = Cli::try_parse_from(["v2ctl", "touch"]).unwrap();
        assert!(matches!(cli.command, Commands::Touch { fast_server: 10 }));
    }
}
