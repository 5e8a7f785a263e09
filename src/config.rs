use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::GlobalArgs;
use crate::error::ScribeError;
use crate::gemini::DEFAULT_API_BASE_URL;
use crate::session::OrphanPolicy;

// Precedence: CLI > env > file > defaults.

const DEFAULT_MODEL: &str = "gemini-pro";
const DEFAULT_SESSION_DIR: &str = ".scribe";

const ENV_PREFIX: &str = "SCRIBE_";

/// Fallback env var for the API key, read without the `SCRIBE_` prefix.
const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScribeConfig {
    /// Required only by commands that call the model; see [`ScribeConfig::require_api_key`].
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    /// `None` leaves the HTTP client's own behavior in place.
    pub request_timeout_sec: Option<u64>,
    pub session_dir: PathBuf,
    pub clear_on_regenerate: bool,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    /// File whose content replaces the built-in outline prompt (`{theme}` placeholder).
    pub outline_prompt_path: Option<PathBuf>,
    /// File whose content replaces the built-in paragraph prompt (`{theme}`, `{heading}`).
    pub paragraph_prompt_path: Option<PathBuf>,
}

/// TOML-deserializable config file representation. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_key: Option<String>,
    model: Option<String>,
    api_base_url: Option<String>,
    request_timeout_sec: Option<u64>,
    session_dir: Option<PathBuf>,
    clear_on_regenerate: Option<bool>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    outline_prompt_path: Option<PathBuf>,
    paragraph_prompt_path: Option<PathBuf>,
}

/// Intermediate layer where every field is optional, used to merge sources.
#[derive(Debug, Default)]
struct ConfigLayer {
    api_key: Option<String>,
    model: Option<String>,
    api_base_url: Option<String>,
    request_timeout_sec: Option<u64>,
    session_dir: Option<PathBuf>,
    clear_on_regenerate: Option<bool>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    outline_prompt_path: Option<PathBuf>,
    paragraph_prompt_path: Option<PathBuf>,
}

impl ScribeConfig {
    /// Load configuration with precedence: CLI > env > file > defaults.
    pub fn load(config_path: Option<&Path>, cli_args: &GlobalArgs) -> anyhow::Result<Self> {
        Self::load_with_env(config_path, cli_args, real_env_var)
    }

    /// The API key, or [`ScribeError::MissingApiKey`] when unset or blank.
    pub fn require_api_key(&self) -> Result<&str, ScribeError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ScribeError::MissingApiKey)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_sec.map(Duration::from_secs)
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        if self.clear_on_regenerate {
            OrphanPolicy::Clear
        } else {
            OrphanPolicy::Retain
        }
    }

    /// Like [`ScribeConfig::load`], but reads env vars through `env_fn`
    /// instead of the process environment. The lookup receives full
    /// variable names.
    pub fn load_with_env(
        config_path: Option<&Path>,
        cli_args: &GlobalArgs,
        env_fn: fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let file_layer = match config_path {
            Some(path) => load_file_layer(path)?,
            None => ConfigLayer::default(),
        };
        let env_layer = load_env_layer(env_fn)?;
        let cli_layer = cli_layer_from(cli_args);

        let merged = merge_layers(file_layer, env_layer, cli_layer);

        Ok(ScribeConfig {
            api_key: merged.api_key,
            model: merged.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_base_url: merged
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
            request_timeout_sec: merged.request_timeout_sec.filter(|&s| s > 0),
            session_dir: merged
                .session_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR)),
            clear_on_regenerate: merged.clear_on_regenerate.unwrap_or(false),
            log_level: merged.log_level,
            log_file: merged.log_file,
            outline_prompt_path: merged.outline_prompt_path,
            paragraph_prompt_path: merged.paragraph_prompt_path,
        })
    }
}

fn load_file_layer(path: &Path) -> anyhow::Result<ConfigLayer> {
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    let fc: FileConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
    Ok(ConfigLayer {
        api_key: fc.api_key,
        model: fc.model,
        api_base_url: fc.api_base_url,
        request_timeout_sec: fc.request_timeout_sec,
        session_dir: fc.session_dir,
        clear_on_regenerate: fc.clear_on_regenerate,
        log_level: fc.log_level,
        log_file: fc.log_file,
        outline_prompt_path: fc.outline_prompt_path,
        paragraph_prompt_path: fc.paragraph_prompt_path,
    })
}

fn real_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn load_env_layer(env_fn: fn(&str) -> Option<String>) -> Result<ConfigLayer, ScribeError> {
    let var = |suffix: &str| env_fn(&format!("{ENV_PREFIX}{suffix}"));
    Ok(ConfigLayer {
        api_key: var("API_KEY").or_else(|| env_fn(GEMINI_API_KEY_VAR)),
        model: var("MODEL"),
        api_base_url: var("API_BASE_URL"),
        request_timeout_sec: parse_env(env_fn, "REQUEST_TIMEOUT_SEC")?,
        session_dir: var("SESSION_DIR").map(PathBuf::from),
        clear_on_regenerate: parse_env(env_fn, "CLEAR_ON_REGENERATE")?,
        log_level: var("LOG_LEVEL"),
        log_file: var("LOG_FILE").map(PathBuf::from),
        outline_prompt_path: var("OUTLINE_PROMPT_PATH").map(PathBuf::from),
        paragraph_prompt_path: var("PARAGRAPH_PROMPT_PATH").map(PathBuf::from),
    })
}

fn parse_env<T>(env_fn: fn(&str) -> Option<String>, suffix: &str) -> Result<Option<T>, ScribeError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    match env_fn(&key) {
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| ScribeError::ConfigEnvParseError {
                var: key,
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn cli_layer_from(args: &GlobalArgs) -> ConfigLayer {
    ConfigLayer {
        api_key: None,
        model: args.model.clone(),
        api_base_url: None,
        request_timeout_sec: args.request_timeout_sec,
        session_dir: args.session_dir.clone(),
        clear_on_regenerate: if args.clear_on_regenerate {
            Some(true)
        } else {
            None
        },
        log_level: args.log_level.clone(),
        log_file: args.log_file.clone(),
        outline_prompt_path: None,
        paragraph_prompt_path: None,
    }
}

/// Merge three layers. For each field, pick CLI first, then env, then file.
fn merge_layers(file: ConfigLayer, env: ConfigLayer, cli: ConfigLayer) -> ConfigLayer {
    ConfigLayer {
        api_key: cli.api_key.or(env.api_key).or(file.api_key),
        model: cli.model.or(env.model).or(file.model),
        api_base_url: cli.api_base_url.or(env.api_base_url).or(file.api_base_url),
        request_timeout_sec: cli
            .request_timeout_sec
            .or(env.request_timeout_sec)
            .or(file.request_timeout_sec),
        session_dir: cli.session_dir.or(env.session_dir).or(file.session_dir),
        clear_on_regenerate: cli
            .clear_on_regenerate
            .or(env.clear_on_regenerate)
            .or(file.clear_on_regenerate),
        log_level: cli.log_level.or(env.log_level).or(file.log_level),
        log_file: cli.log_file.or(env.log_file).or(file.log_file),
        outline_prompt_path: cli
            .outline_prompt_path
            .or(env.outline_prompt_path)
            .or(file.outline_prompt_path),
        paragraph_prompt_path: cli
            .paragraph_prompt_path
            .or(env.paragraph_prompt_path)
            .or(file.paragraph_prompt_path),
    }
}
