use std::path::PathBuf;

/// Operational errors outside the model-call boundary.
///
/// Model faults never surface here; they are converted to
/// [`crate::gemini::Generation::Failure`] at the call site.
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("Section {index} not found in outline (available: 1..={available})")]
    SectionNotFound { index: usize, available: usize },

    #[error("No outline yet. Run `scribe outline <topic>` first.")]
    OutlineEmpty,

    #[error("Section {index} has no AI draft yet. Run `scribe draft {index}` first.")]
    DraftMissing { index: usize },

    #[error("Gemini API key is not set (use SCRIBE_API_KEY, GEMINI_API_KEY, or api_key in the config file)")]
    MissingApiKey,

    #[error("Failed to parse environment variable '{var}': {detail}")]
    ConfigEnvParseError { var: String, detail: String },

    #[error("Failed to read session file {path}: {detail}")]
    SessionReadFailed { path: PathBuf, detail: String },

    #[error("Failed to write session file {path}: {detail}")]
    SessionWriteFailed { path: PathBuf, detail: String },

    #[error("Prompt template file {path}: {detail}")]
    PromptTemplateFailed { path: PathBuf, detail: String },

    #[error("Failed to read edit text from {path}: {detail}")]
    EditSourceFailed { path: PathBuf, detail: String },
}
