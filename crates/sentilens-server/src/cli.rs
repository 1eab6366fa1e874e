use clap::{Parser, ValueEnum};
use sentilens_classifiers::ModelBackend;

#[derive(Parser, Debug, Default)]
#[command(name = "sentilens-server")]
#[command(author, version, about = "Batch sentiment classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "sentilens.yaml", env = "SENTILENS_CONFIG")]
    pub config: String,

    /// Listen address
    #[arg(short = 'l', long, env = "SENTILENS_LISTEN")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "SENTILENS_PORT")]
    pub port: Option<u16>,

    /// Model backend
    #[arg(long, value_enum, env = "SENTILENS_MODEL_BACKEND")]
    pub model_backend: Option<BackendArg>,

    /// Local model directory or Hugging Face repo id
    #[arg(short, long, env = "SENTILENS_MODEL")]
    pub model: Option<String>,

    /// Device to run the model on (cpu, cuda, metal)
    #[arg(long, env = "SENTILENS_DEVICE")]
    pub device: Option<String>,

    /// Texts per inference batch
    #[arg(short, long, env = "SENTILENS_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Load the model at startup instead of on the first job
    #[arg(long)]
    pub preload: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "SENTILENS_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    XlmRoberta,
    Lexicon,
}

impl From<BackendArg> for ModelBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::XlmRoberta => ModelBackend::XlmRoberta,
            BackendArg::Lexicon => ModelBackend::Lexicon,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
