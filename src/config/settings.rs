//! Command-line surface and resolved run configuration

use crate::error::{PoleError, Result};
use crate::fit::FitLevel;
use crate::models::default_overlay_path;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Environment variable naming a model overlay file
pub const MODELS_FILE_ENV: &str = "LLMPOLE_MODELS_FILE";

/// Default number of entries `recommend` returns
pub const DEFAULT_RECOMMEND_LIMIT: usize = 5;

/// llmpole - which LLMs will actually run on this machine?
#[derive(Parser, Debug, Clone)]
#[command(name = "llmpole")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Right-size LLM checkpoints to the hardware of this machine")]
#[command(long_about = r#"
llmpole detects RAM, CPU and GPUs, then scores a catalog of open-weight
models against them: where each model would run, which quantization fits,
how fast it would be, and how comfortable the fit is.

Examples:
  llmpole                              # Ranked fit table
  llmpole system                       # Detected hardware
  llmpole fit --perfect -n 10          # Ten best perfect fits
  llmpole info mixtral                 # Detailed view of one model
  llmpole recommend --use-case coding  # JSON top-5 for coding
"#)]
pub struct CliArgs {
    /// Emit JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Show at most this many models
    #[arg(short = 'n', long, value_name = "NUM")]
    pub limit: Option<usize>,

    /// Only show models with a perfect fit
    #[arg(long)]
    pub perfect: bool,

    /// Extra model records merged over the bundled catalog
    #[arg(long, env = "LLMPOLE_MODELS_FILE", value_name = "PATH", global = true)]
    pub models_file: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show detected hardware
    System,

    /// List every model in the catalog with its fit
    List,

    /// Rank all models by how well they fit
    Fit {
        /// Only show models with a perfect fit
        #[arg(long)]
        perfect: bool,

        /// Show at most this many models
        #[arg(short = 'n', long, value_name = "NUM")]
        limit: Option<usize>,
    },

    /// Search models by name, provider or size
    Search {
        /// Case-insensitive substring
        query: String,
    },

    /// Detailed fit for one model
    Info {
        /// Model name or unique substring
        model: String,
    },

    /// Top models for a use case (JSON unless --text)
    Recommend {
        /// Number of recommendations
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECOMMEND_LIMIT, value_name = "NUM")]
        limit: usize,

        /// general, coding, reasoning, chat, multimodal or embedding
        #[arg(long, value_name = "USE_CASE")]
        use_case: Option<String>,

        /// Worst fit level to include; Too Tight models are never recommended
        #[arg(long, value_enum, default_value = "marginal")]
        min_fit: MinFit,

        /// Print a table instead of JSON
        #[arg(long)]
        text: bool,
    },
}

/// Minimum fit level accepted by `recommend`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinFit {
    /// Perfect fits only
    Perfect,
    /// Perfect or good
    Good,
    /// Anything that runs
    #[default]
    Marginal,
}

impl From<MinFit> for FitLevel {
    fn from(min: MinFit) -> Self {
        match min {
            MinFit::Perfect => FitLevel::Perfect,
            MinFit::Good => FitLevel::Good,
            MinFit::Marginal => FitLevel::Marginal,
        }
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Format of diagnostic log lines
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// What a run does, with every flag already merged
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    System,
    List,
    Fit {
        perfect_only: bool,
        limit: Option<usize>,
    },
    Search {
        query: String,
    },
    Info {
        model: String,
    },
    Recommend {
        limit: usize,
        use_case: Option<String>,
        min_fit: FitLevel,
    },
}

/// Resolved configuration for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PoleConfig {
    pub action: Action,
    pub format: OutputFormat,
    /// Overlay file to merge over the bundled catalog, if any
    pub models_file: Option<PathBuf>,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: LevelFilter,
    pub log_format: LogFormat,
}

impl Default for PoleConfig {
    fn default() -> Self {
        Self {
            action: Action::Fit {
                perfect_only: false,
                limit: None,
            },
            format: OutputFormat::Text,
            models_file: default_overlay_path(),
            log_level: LevelFilter::WARN,
            log_format: LogFormat::Text,
        }
    }
}

impl PoleConfig {
    /// Build configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let mut format = if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let action = match &args.command {
            None => Action::Fit {
                perfect_only: args.perfect,
                limit: check_limit(args.limit)?,
            },
            Some(Commands::System) => Action::System,
            Some(Commands::List) => Action::List,
            Some(Commands::Fit { perfect, limit }) => Action::Fit {
                perfect_only: *perfect || args.perfect,
                limit: check_limit(limit.or(args.limit))?,
            },
            Some(Commands::Search { query }) => Action::Search {
                query: non_empty(query, "search query")?,
            },
            Some(Commands::Info { model }) => Action::Info {
                model: non_empty(model, "model name")?,
            },
            Some(Commands::Recommend {
                limit,
                use_case,
                min_fit,
                text,
            }) => {
                format = if *text {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                };
                Action::Recommend {
                    limit: check_limit(Some(*limit))?.unwrap_or(DEFAULT_RECOMMEND_LIMIT),
                    use_case: use_case.clone(),
                    min_fit: (*min_fit).into(),
                }
            }
        };

        let models_file = match &args.models_file {
            Some(path) if path.is_dir() => {
                return Err(PoleError::config(format!(
                    "models file '{}' is a directory",
                    path.display()
                )));
            }
            Some(path) => Some(path.clone()),
            None => default_overlay_path(),
        };

        Ok(Self {
            action,
            format,
            models_file,
            log_level: log_level_for(args.verbose),
            log_format: args.log_format,
        })
    }

    /// Whether output should be JSON
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

fn check_limit(limit: Option<usize>) -> Result<Option<usize>> {
    match limit {
        Some(0) => Err(PoleError::config("limit must be at least 1")),
        other => Ok(other),
    }
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PoleError::config(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

/// `-v` count to default log level
pub fn log_level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}
