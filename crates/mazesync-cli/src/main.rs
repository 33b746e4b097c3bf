use clap::{ArgAction, Parser, Subcommand};
use commands::{authorize, clear, config, sync, watch};

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "mazesync")]
#[command(about = "mazesync - keep Kodi and TVmaze watched state in step")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push every episode of every show to TVmaze
    #[command(long_about = "Pull watched episodes from TVmaze into Kodi, then push the watched state of every episode of every TV show in the Kodi library to TVmaze. Specials (season 0) are never sent.")]
    PushAll,

    /// Push recently added episodes to TVmaze
    #[command(long_about = "Pull watched episodes from TVmaze into Kodi, then push the recently added episodes grouped by show. Useful after a library scan.")]
    PushRecent,

    /// Mark episodes watched on TVmaze as watched in Kodi
    #[command(long_about = "Pull watched state from TVmaze for every show in the Kodi library and mark matching unwatched episodes as watched. Nothing is pushed.")]
    Pull,

    /// Link a TVmaze account
    #[command(long_about = "Start the TVmaze authorization handshake for an e-mail address, then wait until the link sent by TVmaze is confirmed. Press Ctrl-C to stop waiting. Credentials are stored in the credentials file on success.")]
    Authorize {
        /// TVmaze account e-mail (if not provided, will prompt)
        #[arg(long)]
        email: Option<String>,

        /// Re-authorize without asking when credentials already exist
        #[arg(long, short = 'y', action = ArgAction::SetTrue)]
        yes: bool,
    },

    /// Run the long-lived sync service
    #[command(long_about = "Listen for playcount changes from Kodi and push them to TVmaze as they happen. Pulls watched state from TVmaze on startup and every pull interval. Episodes marked watched by a pull are not pushed back. Stops on Ctrl-C.")]
    Watch {
        /// Skip the pull on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_pull: bool,
    },

    /// Inspect configuration
    #[command(long_about = "Display configuration and stored credentials. Sensitive values are masked unless --full is given.")]
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },

    /// Clear local state
    #[command(long_about = "Clear the pulled-episode ledger or stored TVmaze credentials. Use --ledger, --credentials, or --all.")]
    Clear {
        /// Clear the ledger and credentials
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["ledger", "credentials"])]
        all: bool,

        /// Clear the pulled-episode ledger
        #[arg(long, action = ArgAction::SetTrue)]
        ledger: bool,

        /// Clear stored TVmaze credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Watch { .. } => Some(watch::log_file()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::PushAll => sync::run_push_all(&output).await,
        Commands::PushRecent => sync::run_push_recent(&output).await,
        Commands::Pull => sync::run_pull(&output).await,
        Commands::Authorize { email, yes } => authorize::run_authorize(email, yes, &output).await,
        Commands::Watch { no_startup_pull } => watch::run_watch(no_startup_pull, &output).await,
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show { full } => config::show_config(full, &output),
        },
        Commands::Clear { all, ledger, credentials } => {
            clear::run_clear(all, ledger, credentials, &output)
        }
    }
}
