//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches to the project,
//! configuration and terminal-view commands.

pub mod config_command;
pub mod project_commands;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use crate::api::{ApiClient, BlobClient};
use crate::core::config::{Config, Settings};
use crate::ui::reveal_view::RevealMode;

#[derive(Parser)]
#[command(name = "seqopt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
))]
#[command(about = "Prepare, validate and run bio-sequence optimization projects")]
#[command(
    long_about = "seqopt prepares protein datasets and optimization pipelines, submits them \
as background tasks and follows their progress.\n\n\
Environment Variables (used when the config file leaves a value unset):\n\
  SEQOPT_API_URL    Base URL of the task API\n\
  SEQOPT_BLOB_URL   Public base URL of the blob store\n\
  SEQOPT_TOKEN      Bearer token sent with API requests\n\
  SEQOPT_LOG        Log filter, e.g. seqopt=debug"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Append diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnswerArg {
    Yes,
    No,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a dataset file against the acceptance rules
    Validate {
        /// Delimiter-separated dataset (`-` for stdin)
        file: PathBuf,
    },
    /// Check a pipeline configuration (config.json) against a dataset
    CheckConfig {
        /// Configuration in form JSON
        file: PathBuf,
        /// Dataset whose value columns the configuration must cover
        #[arg(short, long)]
        dataset: Option<PathBuf>,
    },
    /// Check a project name against the naming rules
    CheckName { name: String },
    /// Check a chat message body against the length limits
    CheckMessage {
        /// Message text (`-` for stdin)
        file: PathBuf,
    },
    /// Edit a dataset file with live highlighting and validation
    Edit {
        file: PathBuf,
        /// Color theme (dark or light)
        #[arg(long, default_value = "dark")]
        theme: String,
    },
    /// Play the typewriter reveal of a markdown file
    Reveal {
        /// Markdown file (`-` for stdin)
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = RevealMode::Blocks)]
        mode: RevealMode,
        /// Mark this message as read once the reveal completes
        #[arg(long, value_name = "ID")]
        message_id: Option<String>,
        #[arg(long, default_value = "dark")]
        theme: String,
    },
    /// List the tasks of a project
    Tasks { project_id: String },
    /// Validate and submit a project as a new task
    Run {
        project_id: String,
        /// Dataset to upload; defaults to the stored one
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Configuration in form JSON; defaults to the stored one
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Does the work involve toxins?
        #[arg(long, value_enum)]
        toxin: Option<AnswerArg>,
        /// Does the work involve pathogens?
        #[arg(long, value_enum)]
        pathogen: Option<AnswerArg>,
        /// Does the work involve viruses?
        #[arg(long, value_enum)]
        virus: Option<AnswerArg>,
        /// Accept the compliance, disclaimer and warranty terms
        #[arg(long)]
        accept_terms: bool,
        /// Follow the task until it settles
        #[arg(short, long)]
        watch: bool,
    },
    /// Cancel a running task
    Cancel { task_id: String },
    /// Follow a project's tasks and show the leaderboard when they settle
    Watch { project_id: String },
    /// Upload files into a project's blob folder
    Upload {
        project_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show or change configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the stored values and the effective settings
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Unset a configuration value
    Unset { key: String },
    /// Print the config file location
    Path,
}

/// HTTP collaborators built from the effective settings.
pub(crate) struct Clients {
    pub api: Arc<ApiClient>,
    pub blobs: BlobClient,
}

impl Clients {
    pub(crate) fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::new();
        Self {
            api: Arc::new(ApiClient::new(
                client.clone(),
                settings.api_base_url.clone(),
                settings.token.clone(),
            )),
            blobs: BlobClient::new(
                client,
                settings.blob_base_url.clone(),
                settings.upload_url.clone(),
                settings.token.clone(),
            ),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    crate::utils::logging::init(args.log.as_deref())?;

    let command = match args.command {
        Commands::Config { action } => return config_command::run(action),
        command => command,
    };

    let config = Config::load()?;
    let settings = config.resolve();

    match command {
        Commands::Validate { file } => project_commands::validate_file(&file),
        Commands::CheckConfig { file, dataset } => {
            project_commands::check_config(&file, dataset.as_deref())
        }
        Commands::CheckName { name } => project_commands::check_name(&name),
        Commands::CheckMessage { file } => project_commands::check_message(&file),
        Commands::Edit { file, theme } => crate::ui::edit_view::run_editor(&file, &theme).await,
        Commands::Reveal {
            file,
            mode,
            message_id,
            theme,
        } => {
            let markdown = project_commands::read_input(&file)?;
            let receipt = message_id.map(|id| {
                let clients = Clients::new(&settings);
                crate::ui::typewriter::ReadReceipt::new(clients.api, id)
            });
            crate::ui::reveal_view::run_reveal(
                &markdown,
                mode,
                &settings.typewriter,
                receipt,
                &theme,
            )
            .await
        }
        Commands::Tasks { project_id } => {
            project_commands::list_tasks(&Clients::new(&settings), &project_id).await
        }
        Commands::Run {
            project_id,
            dataset,
            config,
            toxin,
            pathogen,
            virus,
            accept_terms,
            watch,
        } => {
            let clients = Clients::new(&settings);
            let watch_id = project_id.clone();
            let request = project_commands::RunRequest {
                project_id,
                dataset,
                config,
                answers: [toxin, pathogen, virus],
                accept_terms,
            };
            project_commands::run(&clients, request).await?;
            if watch {
                project_commands::watch(&clients, &watch_id, settings.poll_interval).await?;
            }
            Ok(())
        }
        Commands::Cancel { task_id } => {
            project_commands::cancel_task(&Clients::new(&settings), &task_id).await
        }
        Commands::Watch { project_id } => {
            project_commands::watch(&Clients::new(&settings), &project_id, settings.poll_interval)
                .await
        }
        Commands::Upload { project_id, files } => {
            project_commands::upload(&Clients::new(&settings), &project_id, &files).await
        }
        // handled before settings are loaded
        Commands::Config { .. } => Ok(()),
    }
}
