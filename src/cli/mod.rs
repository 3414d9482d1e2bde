//! Command-line host for the reply engine.

pub mod terminal;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

pub use terminal::TerminalEditor;

use crate::config::{FileSettings, SettingValue, SettingsStore};
use crate::conversation::QueryType;
use crate::error::{NoteLlmError, Result};
use crate::orchestrator::{ReplyOrchestrator, ReplyRequest, ReplyStatus};
use crate::provider::{check_server_status, ServerStatus, SERVER_CHECK_TIMEOUT};
use crate::texts::Texts;

/// NoteLLM command-line interface
#[derive(Parser, Debug)]
#[command(name = "notellm", version, about = "Stream LLM replies for notes")]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Locale for prompts and messages (en, zh_CN)
    #[arg(long, global = true, default_value = "en")]
    pub locale: String,

    /// Suppress notices on stderr
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a reply to text from an argument, a file or stdin
    Reply(ReplyArgs),
    /// Check the selected model slot
    Status,
    /// Select a model slot (cycles to the next one when omitted)
    UseModel(UseModelArgs),
    /// Check that a server answers at all
    Probe(ProbeArgs),
    /// Store a setting
    Set(SetArgs),
    /// Print a setting
    Get(GetArgs),
}

/// Arguments for `notellm reply`.
#[derive(Parser, Debug)]
pub struct ReplyArgs {
    /// What to do with the text
    #[arg(short = 't', long, value_enum, default_value_t = QueryArg::Chat)]
    pub query: QueryArg,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// The text itself; stdin is read when neither this nor --file is given
    pub text: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum QueryArg {
    Chat,
    Summary,
    Improve,
    Ask,
}

impl From<QueryArg> for QueryType {
    fn from(arg: QueryArg) -> Self {
        match arg {
            QueryArg::Chat => QueryType::Chat,
            QueryArg::Summary => QueryType::Summary,
            QueryArg::Improve => QueryType::Improve,
            QueryArg::Ask => QueryType::Ask,
        }
    }
}

/// Arguments for `notellm use-model`.
#[derive(Parser, Debug)]
pub struct UseModelArgs {
    /// Slot number, 1 to 3
    pub slot: Option<u8>,
}

/// Arguments for `notellm probe`.
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    pub url: String,

    /// Give up after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Arguments for `notellm set`.
#[derive(Parser, Debug)]
pub struct SetArgs {
    pub key: String,
    pub value: String,
}

/// Arguments for `notellm get`.
#[derive(Parser, Debug)]
pub struct GetArgs {
    pub key: String,
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Arc::new(match &cli.settings {
        Some(path) => FileSettings::open(path)?,
        None => FileSettings::open_default()?,
    });
    tracing::debug!(path = %settings.path().display(), "settings loaded");

    match cli.command {
        Commands::Reply(args) => {
            let orchestrator = orchestrator(settings, &cli.locale, cli.quiet);
            let flag = orchestrator.run_flag().clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.stop();
                }
            });

            let input = read_input(&args)?;
            let request = ReplyRequest::new(input).with_query_type(args.query.into());
            let outcome = orchestrator.reply(request).await?;
            println!();
            if outcome.status == ReplyStatus::Stopped {
                return Err(NoteLlmError::ForcedStop);
            }
            Ok(())
        }
        Commands::Status => {
            let result = orchestrator(settings, &cli.locale, cli.quiet)
                .check_status(true)
                .await?;
            match result.error {
                None => Ok(()),
                Some(error) => Err(NoteLlmError::Configuration(error)),
            }
        }
        Commands::UseModel(args) => {
            let slot = orchestrator(settings, &cli.locale, cli.quiet)
                .change_model(args.slot)
                .await?;
            println!("{slot}");
            Ok(())
        }
        Commands::Probe(args) => {
            let timeout = args
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(SERVER_CHECK_TIMEOUT);
            let check = check_server_status(&args.url, timeout).await;
            println!("{}: {}", check.status, check.message);
            match check.status {
                ServerStatus::Online => Ok(()),
                ServerStatus::Timeout => Err(NoteLlmError::Timeout(timeout.as_millis() as u64)),
                ServerStatus::Offline => Err(NoteLlmError::Stream(check.message)),
            }
        }
        Commands::Set(args) => {
            settings
                .set(&args.key, SettingValue::from(args.value.as_str()))
                .await
        }
        Commands::Get(args) => {
            match settings.get(&args.key).await? {
                Some(value) => println!("{}", value.as_text()),
                None => println!(),
            }
            Ok(())
        }
    }
}

fn orchestrator(settings: Arc<FileSettings>, locale: &str, quiet: bool) -> ReplyOrchestrator {
    ReplyOrchestrator::new(settings, Arc::new(TerminalEditor::new(quiet)))
        .with_texts(Texts::for_locale(locale))
}

fn read_input(args: &ReplyArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return Ok(std::fs::read_to_string(path)?);
    }
    Ok(std::io::read_to_string(std::io::stdin())?)
}
