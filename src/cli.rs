use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// scribe — topic to outline to drafted sections.
///
/// Asks Gemini for a five-part outline of a topic, then drafts each section
/// on request and keeps your own edits alongside the AI drafts.
#[derive(Debug, Parser)]
#[command(name = "scribe", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Set the topic and generate a new outline for it.
    Outline(OutlineArgs),

    /// Generate an AI draft for one outline section.
    Draft(DraftArgs),

    /// Save your own version of a section.
    Edit(EditArgs),

    /// Show the outline with drafts and edits.
    Show,

    /// Discard the current session.
    Reset,

    /// Print the prompt that would be sent, without calling the model.
    Prompt(PromptArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct OutlineArgs {
    /// Writing topic.
    pub topic: String,
}

#[derive(Debug, Clone, clap::Args)]
pub struct DraftArgs {
    /// Section number as shown by `scribe show` (starting at 1).
    pub section: usize,
}

#[derive(Debug, Clone, clap::Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["text", "file"])))]
pub struct EditArgs {
    /// Section number as shown by `scribe show` (starting at 1).
    pub section: usize,

    /// The revised text.
    #[arg(long)]
    pub text: Option<String>,

    /// Read the revised text from this file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct PromptArgs {
    /// Writing topic.
    pub topic: String,

    /// Section heading; prints the paragraph prompt instead of the outline prompt.
    #[arg(long)]
    pub heading: Option<String>,
}

/// Options shared by every subcommand.
///
/// These can also be set via config file or `SCRIBE_*` env vars.
/// Precedence: CLI > env > file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the session file (default: ".scribe").
    #[arg(long, global = true)]
    pub session_dir: Option<PathBuf>,

    /// Gemini model name (default: "gemini-pro").
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// HTTP timeout for each model call, in seconds.
    #[arg(long, global = true)]
    pub request_timeout_sec: Option<u64>,

    /// Drop all section drafts and edits when a new outline is generated.
    #[arg(long, global = true, default_value_t = false)]
    pub clear_on_regenerate: bool,

    /// Log level filter (default: "warn"). Supports tracing directives
    /// (e.g. "debug", "scribe=trace,warn"). Overridden by SCRIBE_LOG env var.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to a log file. When set, structured JSON logs are appended here
    /// in addition to the human-readable stderr output.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}
