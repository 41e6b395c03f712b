mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use webdock_api::WebdockClient;
use webdock_config::ProviderConfig;
use webdock_provider::{Provider, ProviderError, WaitError};

#[derive(Parser)]
#[command(name = "webdock")]
#[command(about = "Provision Webdock servers and wait until they are really up", long_about = None)]
struct Cli {
    /// Config file (default: webdock.yaml, .webdock.yaml, ~/.config/webdock/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// API token
    #[arg(long, global = true, env = "WEBDOCK_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// API endpoint
    #[arg(long, global = true, env = "WEBDOCK_API_URL")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage servers
    #[command(subcommand)]
    Server(ServerCommands),
    /// Manage shell users on a server
    #[command(subcommand)]
    ShellUser(ShellUserCommands),
    /// Manage account public keys
    #[command(subcommand)]
    PublicKey(PublicKeyCommands),
    /// List platform objects
    List {
        kind: ListKind,
        /// Server status filter (servers)
        #[arg(long)]
        status: Option<String>,
        /// Location filter (profiles)
        #[arg(long)]
        location: Option<String>,
        /// Server slug (shell-users)
        #[arg(long)]
        server: Option<String>,
    },
    /// Query the event log
    Events {
        #[arg(long)]
        callback_id: Option<String>,
        #[arg(long)]
        event_type: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long, default_value = "50")]
        per_page: u32,
    },
    /// Wait for an action to finish, optionally until a port accepts connections
    Wait {
        /// Tracking token (X-Callback-ID)
        callback_id: String,
        /// Address to probe once the action has finished
        #[arg(long)]
        address: Option<String>,
        /// Port to probe (default: server_up_port)
        #[arg(long, requires = "address")]
        port: Option<u16>,
        /// Timeout in minutes (default: server timeout)
        #[arg(long)]
        timeout_minutes: Option<u64>,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Create a server and wait until it accepts connections
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        profile: String,
        #[arg(long, required_unless_present = "snapshot")]
        image: Option<String>,
        #[arg(long)]
        snapshot: Option<i64>,
        /// Suggested slug
        #[arg(long)]
        slug: Option<String>,
        /// container or kvm
        #[arg(long)]
        virtualization: Option<String>,
    },
    Get {
        slug: String,
    },
    /// Resize, reinstall or rename a server
    Update {
        slug: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    Delete {
        slug: String,
    },
}

#[derive(Subcommand)]
enum ShellUserCommands {
    Create {
        /// Server slug
        server: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "WEBDOCK_SHELL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = webdock_provider::resources::DEFAULT_GROUP)]
        group: String,
        #[arg(long, default_value = webdock_provider::resources::DEFAULT_SHELL)]
        shell: String,
        /// Public key id (repeatable)
        #[arg(long = "key")]
        keys: Vec<i64>,
    },
    /// Show a shell user by `{server_slug}/{id}`
    Get {
        id: String,
    },
    /// Replace the public keys of a shell user
    #[command(name = "set-keys")]
    SetKeys {
        id: String,
        #[arg(long = "key")]
        keys: Vec<i64>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum PublicKeyCommands {
    Create {
        #[arg(long)]
        name: String,
        /// Key text
        #[arg(long, conflicts_with = "key_file", required_unless_present = "key_file")]
        key: Option<String>,
        /// Read the key from a file (e.g. ~/.ssh/id_ed25519.pub)
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
    Get {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    Servers,
    Images,
    Locations,
    Profiles,
    Account,
    PublicKeys,
    ShellUsers,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr、結果の JSON は stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Commands::Version) {
        println!("webdock {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli)?;
    let provider = Provider::from_config(&config)?;
    cancel_on_ctrl_c(&provider);

    match cli.command {
        Commands::Server(cmd) => match cmd {
            ServerCommands::Create {
                name,
                location,
                profile,
                image,
                snapshot,
                slug,
                virtualization,
            } => {
                let spec = webdock_provider::ServerSpec {
                    name,
                    location_id: location,
                    profile_slug: profile,
                    image_slug: image,
                    snapshot_id: snapshot,
                    slug,
                    virtualization,
                };
                commands::server::create(&provider, &spec).await
            }
            ServerCommands::Get { slug } => commands::server::get(&provider, &slug).await,
            ServerCommands::Update {
                slug,
                name,
                profile,
                image,
            } => {
                let changes = commands::server::ServerChanges {
                    name,
                    profile,
                    image,
                };
                commands::server::update(&provider, &slug, changes).await
            }
            ServerCommands::Delete { slug } => commands::server::delete(&provider, &slug).await,
        },
        Commands::ShellUser(cmd) => match cmd {
            ShellUserCommands::Create {
                server,
                username,
                password,
                group,
                shell,
                keys,
            } => {
                let mut spec = webdock_provider::ShellUserSpec::new(server, username, password)
                    .with_public_keys(keys);
                spec.group = group;
                spec.shell = shell;
                commands::shell_user::create(&provider, &spec).await
            }
            ShellUserCommands::Get { id } => commands::shell_user::get(&provider, &id).await,
            ShellUserCommands::SetKeys { id, keys } => {
                commands::shell_user::set_keys(&provider, &id, keys).await
            }
            ShellUserCommands::Delete { id } => commands::shell_user::delete(&provider, &id).await,
        },
        Commands::PublicKey(cmd) => match cmd {
            PublicKeyCommands::Create {
                name,
                key,
                key_file,
            } => {
                let key = match (key, key_file) {
                    (Some(key), _) => key,
                    (None, Some(path)) => std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?,
                    (None, None) => anyhow::bail!("--key or --key-file is required"),
                };
                let spec = webdock_provider::PublicKeySpec {
                    name,
                    key: key.trim().to_string(),
                };
                commands::public_key::create(&provider, &spec).await
            }
            PublicKeyCommands::Get { id } => commands::public_key::get(&provider, &id).await,
            PublicKeyCommands::Delete { id } => commands::public_key::delete(&provider, &id).await,
        },
        Commands::List {
            kind,
            status,
            location,
            server,
        } => {
            let data = provider.data();
            let states = match kind {
                ListKind::Servers => data.servers(status.as_deref()).await?,
                ListKind::Images => data.images().await?,
                ListKind::Locations => data.locations().await?,
                ListKind::Profiles => data.profiles(location.as_deref()).await?,
                ListKind::Account => vec![data.account().await?],
                ListKind::PublicKeys => data.public_keys().await?,
                ListKind::ShellUsers => {
                    let server = server
                        .ok_or_else(|| anyhow::anyhow!("--server is required for shell-users"))?;
                    data.shell_users(&server).await?
                }
            };
            output::status(&format!("{} item(s)", states.len()));
            output::json(&states)
        }
        Commands::Events {
            callback_id,
            event_type,
            page,
            per_page,
        } => {
            let query = webdock_api::EventQuery {
                callback_id,
                event_type,
                ..Default::default()
            }
            .with_page(page.unwrap_or(1), per_page);
            commands::events::list(&provider, &query).await
        }
        Commands::Wait {
            callback_id,
            address,
            port,
            timeout_minutes,
        } => {
            let target = address.map(|address| {
                let port = port.unwrap_or(provider.settings().server_up_port);
                (address, port)
            });
            commands::events::wait(&provider, &callback_id, target, timeout_minutes).await
        }
        Commands::Version => Ok(()),
    }
}

/// Defaults, then the config file, then the environment, then flags
fn load_config(cli: &Cli) -> anyhow::Result<ProviderConfig> {
    let mut config = match &cli.config {
        Some(path) => webdock_config::load_file(path)?,
        None => match webdock_config::find_config_file()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using config file");
                webdock_config::load_file(&path)?
            }
            None => ProviderConfig::default(),
        },
    };
    config.apply_env()?;

    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(url) = &cli.api_url {
        config.api_endpoint = url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn cancel_on_ctrl_c(provider: &Provider<WebdockClient>) {
    let cancel = provider.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            cancel.cancel();
        }
    });
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ProviderError>() {
        return match e {
            e if e.is_cancelled() => 130,
            e if e.is_timeout() => 124,
            _ => 1,
        };
    }
    match err.downcast_ref::<WaitError>() {
        Some(WaitError::Cancelled { .. }) => 130,
        Some(e) if e.is_timeout() => 124,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_wait_with_address() {
        let cli = Cli::try_parse_from([
            "webdock",
            "wait",
            "nLVhulfqCy",
            "--address",
            "203.0.113.10",
            "--port",
            "2222",
        ])
        .unwrap();

        match cli.command {
            Commands::Wait {
                callback_id,
                address,
                port,
                timeout_minutes,
            } => {
                assert_eq!(callback_id, "nLVhulfqCy");
                assert_eq!(address.as_deref(), Some("203.0.113.10"));
                assert_eq!(port, Some(2222));
                assert!(timeout_minutes.is_none());
            }
            _ => panic!("expected wait"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let cancelled = anyhow::Error::from(ProviderError::Cancelled {
            operation: "create",
            resource_type: "server",
            id: "web01".to_string(),
        });
        let timeout = anyhow::Error::from(WaitError::Timeout {
            handle: webdock_api::ActionHandle::new("nLVhulfqCy"),
            elapsed: std::time::Duration::from_secs(60),
            timeout: std::time::Duration::from_secs(60),
            last_status: "working".to_string(),
        });

        assert_eq!(exit_code(&cancelled), 130);
        assert_eq!(exit_code(&timeout), 124);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }

    #[test]
    fn test_port_requires_address() {
        assert!(Cli::try_parse_from(["webdock", "wait", "abc", "--port", "22"]).is_err());
    }

    #[test]
    fn test_server_create_needs_image_or_snapshot() {
        let base = [
            "webdock",
            "server",
            "create",
            "--name",
            "Web 01",
            "--location",
            "dk",
            "--profile",
            "webdockbit-2022",
        ];
        assert!(Cli::try_parse_from(base).is_err());

        let with_snapshot = base.iter().copied().chain(["--snapshot", "4"]);
        assert!(Cli::try_parse_from(with_snapshot).is_ok());
    }

    #[test]
    fn test_shell_user_defaults() {
        let cli = Cli::try_parse_from([
            "webdock",
            "shell-user",
            "create",
            "web01",
            "--username",
            "deploy",
            "--password",
            "hunter22",
            "--key",
            "11",
            "--key",
            "12",
        ])
        .unwrap();

        match cli.command {
            Commands::ShellUser(ShellUserCommands::Create {
                group, shell, keys, ..
            }) => {
                assert_eq!(group, "sudo");
                assert_eq!(shell, "/bin/bash");
                assert_eq!(keys, vec![11, 12]);
            }
            _ => panic!("expected shell-user create"),
        }
    }
}
