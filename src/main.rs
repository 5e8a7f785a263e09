use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};

use scribe::cli::{Cli, Commands, EditArgs, PromptArgs};
use scribe::config::ScribeConfig;
use scribe::error::ScribeError;
use scribe::gemini::GeminiClient;
use scribe::prompt::PromptTemplates;
use scribe::render;
use scribe::session;
use scribe::workflow;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run one command and return the text to print on stdout.
fn run(cli: Cli) -> anyhow::Result<String> {
    let config = ScribeConfig::load(cli.global.config.as_deref(), &cli.global)?;
    execute(cli.command, &config)
}

fn execute(command: Commands, config: &ScribeConfig) -> anyhow::Result<String> {
    scribe::logging::init(config.log_level.as_deref(), config.log_file.as_deref())?;

    debug!(
        session_dir = %config.session_dir.display(),
        model = %config.model,
        clear_on_regenerate = config.clear_on_regenerate,
        "config loaded"
    );

    let templates = PromptTemplates::load(
        config.outline_prompt_path.as_deref(),
        config.paragraph_prompt_path.as_deref(),
    )?;

    match command {
        Commands::Outline(args) => {
            let client = gemini_client(config)?;
            let mut session = session::load_or_new(&config.session_dir)?;
            let outcome = workflow::generate_outline(
                &mut session,
                &client,
                &templates,
                &args.topic,
                config.orphan_policy(),
            );
            session::save_session(&session, &config.session_dir)?;
            Ok(render::outline_outcome(&outcome, &session))
        }
        Commands::Draft(args) => {
            let client = gemini_client(config)?;
            let mut session = session::load_or_new(&config.session_dir)?;
            let index = workflow::section_index(args.section, &session)?;
            let generation = workflow::generate_draft(&mut session, &client, &templates, index)?;
            if generation.is_success() {
                session::save_session(&session, &config.session_dir)?;
            }
            Ok(render::draft_outcome(args.section, &generation))
        }
        Commands::Edit(args) => {
            let mut session = session::load_or_new(&config.session_dir)?;
            let index = workflow::section_index(args.section, &session)?;
            let text = edit_text(&args)?;
            workflow::save_edit(&mut session, index, &text)?;
            session::save_session(&session, &config.session_dir)?;
            Ok(format!("已保存第{}段的修改版本。\n", args.section))
        }
        Commands::Show => {
            let session = session::load_or_new(&config.session_dir)?;
            Ok(render::outline_view(&session))
        }
        Commands::Reset => {
            let removed = session::remove_session(&config.session_dir)?;
            info!(removed, "session reset");
            Ok(if removed {
                "会话已清空。\n".to_owned()
            } else {
                "没有可清空的会话。\n".to_owned()
            })
        }
        Commands::Prompt(args) => Ok(prompt_text(&templates, &args)),
    }
}

fn gemini_client(config: &ScribeConfig) -> anyhow::Result<GeminiClient> {
    let client = GeminiClient::new(
        config.require_api_key()?,
        config.model.as_str(),
        config.api_base_url.as_str(),
        config.request_timeout(),
    )?;
    Ok(client)
}

fn edit_text(args: &EditArgs) -> Result<String, ScribeError> {
    match (&args.text, &args.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| ScribeError::EditSourceFailed {
            path: path.clone(),
            detail: e.to_string(),
        }),
        (None, None) => unreachable!("clap requires one of --text or --file"),
    }
}

fn prompt_text(templates: &PromptTemplates, args: &PromptArgs) -> String {
    let prompt = match &args.heading {
        Some(heading) => templates.paragraph_prompt(&args.topic, heading),
        None => templates.outline_prompt(&args.topic),
    };
    format!("{}\n", prompt.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe::outline::OutlineSection;
    use scribe::session::{OrphanPolicy, Session};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn key_only_env(name: &str) -> Option<String> {
        (name == "SCRIBE_API_KEY").then(|| "test-key".to_owned())
    }

    fn run_with_env(
        dir: &std::path::Path,
        args: &[&str],
        env_fn: fn(&str) -> Option<String>,
    ) -> anyhow::Result<String> {
        let mut argv = vec!["scribe"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["--session-dir", dir.to_str().unwrap()]);
        let cli = Cli::try_parse_from(argv).unwrap();
        let config = ScribeConfig::load_with_env(None, &cli.global, env_fn).unwrap();
        execute(cli.command, &config)
    }

    fn run_in(dir: &std::path::Path, args: &[&str]) -> anyhow::Result<String> {
        run_with_env(dir, args, no_env)
    }

    fn seed_session(dir: &std::path::Path) {
        let mut s = Session::new();
        s.set_topic("城市化");
        s.replace_outline(
            vec![OutlineSection {
                title: "引言".into(),
                hint: "介绍背景".into(),
            }],
            OrphanPolicy::Retain,
        );
        s.set_draft(0, "AI 段落");
        session::save_session(&s, dir).unwrap();
    }

    #[test]
    fn show_without_session_reports_no_outline() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_in(dir.path(), &["show"]).unwrap();
        assert!(out.contains("尚未生成写作结构"), "got: {out}");
    }

    #[test]
    fn edit_persists_user_version() {
        let dir = tempfile::tempdir().unwrap();
        seed_session(dir.path());

        run_in(dir.path(), &["edit", "1", "--text", "我的版本"]).unwrap();

        let s = session::load_session(dir.path()).unwrap().unwrap();
        assert_eq!(s.edit(0), Some("我的版本"));
        assert_eq!(s.draft(0), Some("AI 段落"));
    }

    #[test]
    fn edit_reads_text_from_file() {
        let dir = tempfile::tempdir().unwrap();
        seed_session(dir.path());
        let file = dir.path().join("edit.txt");
        fs::write(&file, "来自文件").unwrap();

        run_in(dir.path(), &["edit", "1", "--file", file.to_str().unwrap()]).unwrap();

        let s = session::load_session(dir.path()).unwrap().unwrap();
        assert_eq!(s.edit(0), Some("来自文件"));
    }

    #[test]
    fn edit_rejects_unknown_section() {
        let dir = tempfile::tempdir().unwrap();
        seed_session(dir.path());
        let err = run_in(dir.path(), &["edit", "2", "--text", "x"]).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ScribeError>(),
                Some(ScribeError::SectionNotFound {
                    index: 2,
                    available: 1
                })
            ),
            "got: {err}"
        );
    }

    #[test]
    fn draft_without_outline_fails_before_calling_model() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_with_env(dir.path(), &["draft", "1"], key_only_env).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<ScribeError>(), Some(ScribeError::OutlineEmpty)),
            "got: {err}"
        );
    }

    #[test]
    fn draft_without_api_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_session(dir.path());
        let err = run_in(dir.path(), &["draft", "1"]).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<ScribeError>(), Some(ScribeError::MissingApiKey)),
            "got: {err}"
        );
    }

    #[test]
    #[should_panic(expected = "clap requires one of --text or --file")]
    fn edit_text_without_source_never_yields_empty_edit() {
        let args = EditArgs {
            section: 1,
            text: None,
            file: None,
        };
        let _ = edit_text(&args);
    }

    #[test]
    fn reset_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        seed_session(dir.path());

        let out = run_in(dir.path(), &["reset"]).unwrap();
        assert!(out.contains("会话已清空"));
        assert!(session::load_session(dir.path()).unwrap().is_none());

        let out = run_in(dir.path(), &["reset"]).unwrap();
        assert!(out.contains("没有可清空的会话"));
    }

    #[test]
    fn prompt_prints_outline_or_paragraph_template() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_in(dir.path(), &["prompt", "城市化"]).unwrap();
        assert!(out.contains("五段式"));
        assert!(out.contains("主题：城市化"));

        let out = run_in(dir.path(), &["prompt", "城市化", "--heading", "引言"]).unwrap();
        assert!(out.contains("段落标题：引言"));
    }
}
