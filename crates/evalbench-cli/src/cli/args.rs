use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "evalbench",
    version,
    about = "Grade LLM answers against datasets and rubrics"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// SQLite database holding datasets, graders and results
    #[arg(long, global = true, env = "EVALBENCH_DB")]
    pub db: Option<PathBuf>,

    /// run without persistence (saves fail, loads are empty)
    #[arg(long, global = true)]
    pub no_db: bool,

    /// OpenRouter API key; without one grading runs in mock mode
    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true, env = "OPENROUTER_MODEL")]
    pub model: Option<String>,

    #[arg(long, global = true, env = "OPENROUTER_BASE_URL")]
    pub base_url: Option<String>,

    /// per-call generation timeout
    #[arg(long, global = true, env = "EVALBENCH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// answer every model call with this text instead of calling OpenRouter
    #[arg(long, global = true, env = "EVALBENCH_FAKE_REPLY")]
    pub fake_reply: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Grade one answer and print the verdict as JSON
    Grade(GradeArgs),
    /// Generate a raw answer for an input
    Generate(GenerateArgs),
    /// Grade every test case of a dataset with the given graders
    Run(RunArgs),
    /// Write stored results of a dataset as CSV
    Export(ExportArgs),
    /// Import datasets and graders from a YAML or JSON seed file
    Import(ImportArgs),
    Dataset(DatasetArgs),
    Grader(GraderArgs),
    /// Serve grade/generate/load/save as JSON lines on stdio
    Serve,
    Version,
}

#[derive(Args, Clone)]
pub struct GradeArgs {
    /// JSON request file (`-` for stdin); overrides the flags below
    #[arg(long)]
    pub request: Option<PathBuf>,
    #[arg(long, default_value = "")]
    pub input: String,
    #[arg(long, default_value = "")]
    pub expected: String,
    #[arg(long, default_value = "")]
    pub rubric: String,
    /// answer to grade; when absent one is generated
    #[arg(long)]
    pub actual: Option<String>,
    #[arg(long)]
    pub grader_name: Option<String>,
}

#[derive(Args, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub input: String,
}

#[derive(Args, Clone)]
pub struct RunArgs {
    /// dataset name or id
    #[arg(long)]
    pub dataset: String,

    /// grader name or id; repeat for several (default: all graders)
    #[arg(long = "grader")]
    pub graders: Vec<String>,

    /// print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// strict mode (any failing verdict or failed pair -> exit 1)
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    #[arg(long)]
    pub dataset: String,
    /// grader name or id; repeat for several (default: all graders)
    #[arg(long = "grader")]
    pub graders: Vec<String>,
    /// output file (default: stdout)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Clone)]
pub struct ImportArgs {
    pub file: PathBuf,
    /// reject unknown fields instead of warning
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub cmd: DatasetSub,
}

#[derive(Subcommand)]
pub enum DatasetSub {
    List,
    Add {
        name: String,
    },
    Rename {
        dataset: String,
        name: String,
    },
    Rm {
        dataset: String,
    },
    AddCase {
        dataset: String,
        #[arg(long, default_value = "")]
        input: String,
        #[arg(long, default_value = "")]
        expected: String,
    },
    EditCase {
        dataset: String,
        case_id: String,
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        expected: Option<String>,
    },
    RmCase {
        dataset: String,
        case_id: String,
    },
}

#[derive(Args)]
pub struct GraderArgs {
    #[command(subcommand)]
    pub cmd: GraderSub,
}

#[derive(Subcommand)]
pub enum GraderSub {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        rubric: String,
    },
    Edit {
        grader: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        rubric: Option<String>,
    },
    Rm {
        grader: String,
    },
}
