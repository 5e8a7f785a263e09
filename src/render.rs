//! User-facing text for each action, kept apart from the actions themselves.

use std::fmt::Write;

use crate::gemini::Generation;
use crate::session::Session;
use crate::workflow::OutlineOutcome;

/// Summary printed after an outline action.
pub fn outline_outcome(outcome: &OutlineOutcome, session: &Session) -> String {
    match outcome {
        OutlineOutcome::Failed(generation) => format!("{}\n", generation.display_text()),
        OutlineOutcome::Generated { parsed, raw_len } => {
            let mut out = String::new();
            if parsed.is_empty() {
                let _ = writeln!(
                    out,
                    "结构生成完成，但未解析出任何段落（模型返回 {raw_len} 字节）。"
                );
            } else {
                out.push_str("结构生成完成！\n\n");
                out.push_str(&outline_view(session));
            }
            if !parsed.unparsed.is_empty() {
                let _ = writeln!(out, "\n未能解析的行（{}）：", parsed.unparsed.len());
                for line in &parsed.unparsed {
                    let _ = writeln!(out, "  {line}");
                }
            }
            out
        }
    }
}

/// Text shown after a draft action: the AI suggestion or the failure.
pub fn draft_outcome(number: usize, generation: &Generation) -> String {
    match generation {
        Generation::Success(_) => format!(
            "生成完成\n\n**AI建议内容（第{number}段）：**\n{}\n",
            generation.display_text()
        ),
        Generation::Failure(_) => format!("{}\n", generation.display_text()),
    }
}

/// The full outline view: every section with its hint, draft, and edit.
pub fn outline_view(session: &Session) -> String {
    let mut out = String::new();

    if session.outline().is_empty() {
        out.push_str("尚未生成写作结构。\n");
        return out;
    }

    let _ = writeln!(out, "主题：{}", session.topic());
    if let Some(updated) = session.updated_at() {
        let _ = writeln!(out, "更新于：{updated}");
    }
    out.push('\n');
    for (idx, section) in session.outline().iter().enumerate() {
        let _ = writeln!(out, "📌 第{}段：{}", idx + 1, section.title);
        let _ = writeln!(out, "   提示：{}", section.hint);
        if let Some(draft) = session.draft(idx) {
            let _ = writeln!(out, "   AI建议内容{}：", stale_tag(session.draft_is_orphaned(idx)));
            push_indented(&mut out, draft);
        }
        if let Some(edit) = session.edit(idx) {
            let _ = writeln!(out, "   你的修改版本{}：", stale_tag(session.edit_is_orphaned(idx)));
            push_indented(&mut out, edit);
        }
        out.push('\n');
    }

    let orphans = session.orphaned_indices();
    if !orphans.is_empty() {
        let numbers: Vec<String> = orphans.iter().map(|i| (i + 1).to_string()).collect();
        let _ = writeln!(
            out,
            "（旧结构遗留的段落内容：第{}段）",
            numbers.join("、")
        );
    }

    out
}

fn stale_tag(orphaned: bool) -> &'static str {
    if orphaned { "（旧结构）" } else { "" }
}

fn push_indented(out: &mut String, text: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "     {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{OutlineSection, ParsedOutline};
    use crate::session::OrphanPolicy;

    fn session() -> Session {
        let mut s = Session::new();
        s.set_topic("城市化");
        s.replace_outline(
            vec![
                OutlineSection {
                    title: "引言".into(),
                    hint: "介绍背景".into(),
                },
                OutlineSection {
                    title: "结语".into(),
                    hint: "总结".into(),
                },
            ],
            OrphanPolicy::Retain,
        );
        s
    }

    #[test]
    fn outline_view_lists_sections_with_numbers() {
        let view = outline_view(&session());
        assert!(view.contains("主题：城市化"));
        assert!(view.contains("📌 第1段：引言"));
        assert!(view.contains("提示：介绍背景"));
        assert!(view.contains("📌 第2段：结语"));
        assert!(!view.contains("AI建议内容"));
    }

    #[test]
    fn outline_view_includes_draft_and_edit() {
        let mut s = session();
        s.set_draft(1, "AI 段落\n第二行");
        s.set_edit(1, "我的版本");
        let view = outline_view(&s);
        assert!(view.contains("AI建议内容："));
        assert!(view.contains("     第二行"));
        assert!(view.contains("你的修改版本："));
        assert!(view.contains("我的版本"));
    }

    #[test]
    fn outline_view_flags_orphans() {
        let mut s = session();
        s.set_draft(3, "old");
        let view = outline_view(&s);
        assert!(view.contains("第4段"), "got: {view}");
    }

    #[test]
    fn outline_view_marks_entries_from_previous_outline() {
        let mut s = session();
        s.set_draft(0, "旧段落");
        s.set_edit(0, "旧修改");
        let before = outline_view(&s);
        assert!(before.contains("   AI建议内容：\n"), "got: {before}");
        assert!(!before.contains("旧结构"), "got: {before}");

        s.replace_outline(session().outline().to_vec(), OrphanPolicy::Retain);
        let after = outline_view(&s);
        assert!(after.contains("AI建议内容（旧结构）："), "got: {after}");
        assert!(after.contains("你的修改版本（旧结构）："), "got: {after}");
        assert!(after.contains("（旧结构遗留的段落内容：第1段）"), "got: {after}");
    }

    #[test]
    fn outline_view_shows_last_update_time() {
        let s = session();
        let view = outline_view(&s);
        let updated = s.updated_at().expect("replace_outline touches the session");
        assert!(view.contains(&format!("更新于：{updated}")), "got: {view}");
    }

    #[test]
    fn outline_view_without_outline() {
        assert_eq!(outline_view(&Session::new()), "尚未生成写作结构。\n");
    }

    #[test]
    fn failed_outline_shows_marked_text() {
        let outcome = OutlineOutcome::Failed(Generation::Failure("timeout".into()));
        assert_eq!(
            outline_outcome(&outcome, &session()),
            "⚠️ Gemini 出错：timeout\n"
        );
    }

    #[test]
    fn empty_parse_is_reported() {
        let outcome = OutlineOutcome::Generated {
            parsed: ParsedOutline {
                sections: vec![],
                unparsed: vec!["开场白".into()],
            },
            raw_len: 9,
        };
        let text = outline_outcome(&outcome, &Session::new());
        assert!(text.contains("未解析出任何段落（模型返回 9 字节）"), "got: {text}");
        assert!(text.contains("  开场白"));
    }

    #[test]
    fn draft_outcome_renders_both_variants() {
        let ok = draft_outcome(2, &Generation::Success("段落".into()));
        assert!(ok.contains("第2段"));
        assert!(ok.contains("段落"));

        let failed = draft_outcome(2, &Generation::Failure("quota".into()));
        assert_eq!(failed, "⚠️ Gemini 出错：quota\n");
    }
}
