use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use depthstore_cli::commands::{self, ItemChanges, NewItem, Session};
use depthstore_cli::config::ConfigManager;
use depthstore_cli::error::CliResult;
use depthstore_cli::output::{OutputFormat, create_formatter};
use depthstore_cli::terminal;
use depthstore_core::Scenario;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "depthstore")]
#[command(author, version, about = "Depthstore - credential-resolving document store client", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file (defaults to the XDG config directory)
    #[arg(long, global = true, env = "DEPTHSTORE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Deployment scenario selecting the credential strategy
    #[arg(
        short,
        long,
        global = true,
        env = "DEPTHSTORE_SCENARIO",
        default_value = "simple"
    )]
    scenario: Scenario,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Seconds allowed for each store operation
    #[arg(
        long,
        global = true,
        default_value_t = 30,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every item
    List,

    /// Add a new item
    Add {
        /// Item name
        name: String,

        /// Item description
        #[arg(long, default_value = "")]
        description: String,

        /// Item id (a random UUID when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Mark the item as completed
        #[arg(long)]
        completed: bool,
    },

    /// Show one item
    Get {
        /// Item id
        id: String,
    },

    /// Change fields of an existing item
    Update {
        /// Item id
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete an item
    Delete {
        /// Item id
        id: String,
    },

    /// Run a read-only query, e.g. "SELECT * FROM c WHERE c.completed = false"
    Query {
        /// Query text
        query: String,
    },

    /// List the available scenarios
    Scenarios,

    /// Manage SQLite-backed store accounts
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Create an account file and register a key on it
    Init {
        /// Account file
        path: PathBuf,

        /// Key to register (generated and printed when omitted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Accept an identity token on an account
    Trust {
        /// Account file
        path: PathBuf,

        /// Identity token (defaults to DEPTHSTORE_IDENTITY_TOKEN)
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration file path
    Path,

    /// Show every setting with its effective value
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., cosmosdb.simple_account)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cosmosdb.simple_account)
        key: String,

        /// Value to set
        value: String,
    },

    /// Remove a configuration value from the file
    Unset {
        /// Configuration key
        key: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("depthstore_core", log::LevelFilter::Debug)
            .filter_module("depthstore_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    colored::control::set_override(terminal::use_color());

    let debug = cli.debug;
    if let Err(err) = run(cli).await {
        eprint!("{}", err.format_for_user(debug));
        std::process::exit(err.exit_code() as i32);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let formatter = create_formatter(cli.format, terminal::use_color());
    let session = || Session::new(&config, cli.scenario, Duration::from_secs(cli.timeout));

    match cli.command {
        Commands::List => commands::list(&session(), formatter.as_ref()).await,
        Commands::Add {
            name,
            description,
            id,
            completed,
        } => {
            let new_item = NewItem {
                id,
                name,
                description,
                completed,
            };
            commands::add(&session(), formatter.as_ref(), new_item).await
        }
        Commands::Get { id } => commands::get(&session(), formatter.as_ref(), &id).await,
        Commands::Update {
            id,
            name,
            description,
            completed,
        } => {
            let changes = ItemChanges {
                name,
                description,
                completed,
            };
            commands::update(&session(), formatter.as_ref(), &id, changes).await
        }
        Commands::Delete { id } => commands::delete(&session(), &id).await,
        Commands::Query { query } => commands::query(&session(), formatter.as_ref(), &query).await,
        Commands::Scenarios => {
            commands::scenarios();
            Ok(())
        }
        Commands::Account { command } => match command {
            AccountCommand::Init { path, key } => commands::account_init(&path, key).await,
            AccountCommand::Trust { path, token } => commands::account_trust(&path, token).await,
        },
        Commands::Config { command } => match command {
            ConfigCommand::Path => {
                commands::config_path(&config);
                Ok(())
            }
            ConfigCommand::Show => {
                commands::config_show(&config);
                Ok(())
            }
            ConfigCommand::Get { key } => commands::config_get(&config, &key),
            ConfigCommand::Set { key, value } => commands::config_set(&config, &key, &value),
            ConfigCommand::Unset { key } => commands::config_unset(&config, &key),
        },
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
