//! Prompt templates and placeholder rendering.
//!
//! Every prompt sent to the model is built here. Templates use `{name}`
//! placeholders that are filled by literal substitution: no escaping, no
//! validation, and inserted values are never re-scanned for placeholders.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ScribeError;

/// Placeholder for the writing topic.
pub const THEME_PLACEHOLDER: &str = "theme";

/// Placeholder for the section heading in the paragraph template.
pub const HEADING_PLACEHOLDER: &str = "heading";

const OUTLINE_TEMPLATE: &str = "
你是一个专业写作顾问，请根据以下主题生成一个五段式写作结构。
每段包含一个小标题和一句简短提示。

主题：{theme}

输出格式：
1. [标题]：提示语
2. ...
";

const PARAGRAPH_TEMPLATE: &str = "
你是我的AI写作助手，请根据以下段落标题和主题写出100字以内的段落，并说明你的写作理由。

主题：{theme}
段落标题：{heading}
";

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid literal regex"))
}

/// Which of the two prompts to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Outline,
    Paragraph,
}

impl Template {
    pub fn builtin_text(self) -> &'static str {
        match self {
            Template::Outline => OUTLINE_TEMPLATE,
            Template::Paragraph => PARAGRAPH_TEMPLATE,
        }
    }
}

/// Replace each `{name}` in `template` with `vars[name]`.
///
/// Placeholders without a value are left untouched.
pub fn render(template: &str, vars: &BTreeMap<&str, &str>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => (*value).to_owned(),
            None => caps[0].to_owned(),
        })
        .into_owned()
}

/// The pair of template texts in use for a session.
///
/// Defaults to the built-in templates; either can be replaced by the
/// contents of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    outline: String,
    paragraph: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            outline: OUTLINE_TEMPLATE.to_owned(),
            paragraph: PARAGRAPH_TEMPLATE.to_owned(),
        }
    }
}

impl PromptTemplates {
    /// Build templates, reading overrides from the given files when set.
    pub fn load(
        outline_path: Option<&Path>,
        paragraph_path: Option<&Path>,
    ) -> Result<Self, ScribeError> {
        let mut templates = Self::default();
        if let Some(path) = outline_path {
            templates.outline = read_template(path)?;
        }
        if let Some(path) = paragraph_path {
            templates.paragraph = read_template(path)?;
        }
        Ok(templates)
    }

    pub fn text(&self, template: Template) -> &str {
        match template {
            Template::Outline => &self.outline,
            Template::Paragraph => &self.paragraph,
        }
    }

    /// Render `template` with the given placeholder values.
    pub fn render(&self, template: Template, vars: &BTreeMap<&str, &str>) -> String {
        render(self.text(template), vars)
    }

    /// Prompt asking the model for a five-part outline of `theme`.
    pub fn outline_prompt(&self, theme: &str) -> String {
        let vars = BTreeMap::from([(THEME_PLACEHOLDER, theme)]);
        self.render(Template::Outline, &vars)
    }

    /// Prompt asking the model for a short paragraph under `heading`.
    pub fn paragraph_prompt(&self, theme: &str, heading: &str) -> String {
        let vars = BTreeMap::from([(THEME_PLACEHOLDER, theme), (HEADING_PLACEHOLDER, heading)]);
        self.render(Template::Paragraph, &vars)
    }
}

fn read_template(path: &Path) -> Result<String, ScribeError> {
    let text = fs::read_to_string(path).map_err(|e| ScribeError::PromptTemplateFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Err(ScribeError::PromptTemplateFailed {
            path: path.to_path_buf(),
            detail: "template is empty".to_owned(),
        });
    }
    Ok(text)
}
