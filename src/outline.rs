//! Outline parsing: turns the model's free-text outline into ordered sections.
//!
//! The expected line shape is `N. title：hint` with a fullwidth colon.
//! Parsing never fails. Lines without the separator are dropped from the
//! outline and reported in [`ParsedOutline::unparsed`] instead.
//!
//! The title is cut at the FIRST separator while the hint starts after the
//! LAST one, so `1. A：B：C` yields title `A` and hint `C`. Callers that
//! need the middle fragments must look at the raw response.

use serde::{Deserialize, Serialize};

/// Separator between a section title and its hint.
pub const SECTION_SEPARATOR: char = '：';

/// Marker ending the leading section number (`1.`).
const INDEX_MARKER: char = '.';

/// One outline section. Position in the outline is the section number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    pub title: String,
    pub hint: String,
}

/// The result of parsing a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutline {
    pub sections: Vec<OutlineSection>,
    /// Non-blank lines that carried no separator, in input order.
    pub unparsed: Vec<String>,
}

impl ParsedOutline {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Parse a raw outline response into sections.
///
/// For each line containing [`SECTION_SEPARATOR`]:
/// - `title` is the text before the first separator, with everything up to
///   and including the first `.` removed when present, trimmed;
/// - `hint` is the text after the last separator, trimmed.
///
/// Empty titles and hints are kept as-is.
pub fn parse_outline(response: &str) -> ParsedOutline {
    let mut parsed = ParsedOutline::default();

    for line in response.trim().split('\n') {
        match parse_line(line) {
            Some(section) => parsed.sections.push(section),
            None => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    parsed.unparsed.push(trimmed.to_owned());
                }
            }
        }
    }

    parsed
}

fn parse_line(line: &str) -> Option<OutlineSection> {
    let (head, _) = line.split_once(SECTION_SEPARATOR)?;
    let (_, hint) = line.rsplit_once(SECTION_SEPARATOR)?;

    let title = match head.split_once(INDEX_MARKER) {
        Some((_, rest)) => rest,
        None => head,
    };

    Some(OutlineSection {
        title: title.trim().to_owned(),
        hint: hint.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Format sections back into `title：hint` lines, one per section.
    fn format_sections(sections: &[OutlineSection]) -> String {
        sections
            .iter()
            .map(|s| format!("{}{SECTION_SEPARATOR}{}", s.title, s.hint))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn section(title: &str, hint: &str) -> OutlineSection {
        OutlineSection {
            title: title.to_owned(),
            hint: hint.to_owned(),
        }
    }

    #[test]
    fn well_formed_line_yields_title_and_hint() {
        let parsed = parse_outline("1. 引言：介绍主题背景");
        assert_eq!(parsed.sections, vec![section("引言", "介绍主题背景")]);
        assert!(parsed.unparsed.is_empty());
    }

    #[test]
    fn line_without_separator_is_dropped() {
        let parsed = parse_outline("开场白");
        assert!(parsed.sections.is_empty());
        assert_eq!(parsed.unparsed, vec!["开场白".to_owned()]);
    }

    #[test]
    fn five_line_outline_keeps_input_order() {
        let input = "\
1. 引言：介绍主题背景
2. 现状：描述当前情况
3. 问题：指出核心矛盾
4. 对策：提出解决方案
5. 结语：总结全文观点";
        let parsed = parse_outline(input);

        let titles: Vec<&str> = parsed.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["引言", "现状", "问题", "对策", "结语"]);
        assert_eq!(parsed.sections[4].hint, "总结全文观点");
    }

    #[test]
    fn empty_or_unusable_input_yields_no_sections() {
        assert!(parse_outline("").is_empty());
        assert!(parse_outline("   \n\n  ").is_empty());

        let parsed = parse_outline("Sorry, I can't help with that.\nTry again later.");
        assert!(parsed.is_empty());
        assert_eq!(parsed.unparsed.len(), 2);
    }

    #[test]
    fn blank_lines_are_not_reported_as_unparsed() {
        let parsed = parse_outline("\n1. 引言：背景\n\n\n2. 结语：总结\n");
        assert_eq!(parsed.sections.len(), 2);
        assert!(parsed.unparsed.is_empty());
    }

    #[test]
    fn preamble_and_outline_mix() {
        let input = "\
好的，以下是写作结构：
1. [引言]：介绍背景
说明文字
2. [正文]：展开论述";
        let parsed = parse_outline(input);

        // The preamble carries a separator, so it parses with an empty hint.
        assert_eq!(parsed.sections.len(), 3);
        assert_eq!(parsed.sections[0], section("好的，以下是写作结构", ""));
        assert_eq!(parsed.sections[1], section("[引言]", "介绍背景"));
        assert_eq!(parsed.sections[2], section("[正文]", "展开论述"));
        assert_eq!(parsed.unparsed, vec!["说明文字".to_owned()]);
    }

    #[test]
    fn embedded_separator_splits_asymmetrically() {
        let parsed = parse_outline("1. 标题：副标题：提示");
        assert_eq!(parsed.sections, vec![section("标题", "提示")]);
    }

    #[test]
    fn title_stops_at_first_separator_even_with_dots_after_it() {
        let parsed = parse_outline("2. 展望：面向 2.0 时代");
        assert_eq!(parsed.sections, vec![section("展望", "面向 2.0 时代")]);
    }

    #[test]
    fn dots_inside_title_after_index_are_kept() {
        let parsed = parse_outline("3. Web 2.0 回顾：梳理历史");
        assert_eq!(parsed.sections, vec![section("Web 2.0 回顾", "梳理历史")]);
    }

    #[test]
    fn ascii_colon_is_not_a_separator() {
        let parsed = parse_outline("1. Intro: background");
        assert!(parsed.is_empty());
        assert_eq!(parsed.unparsed, vec!["1. Intro: background".to_owned()]);
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let parsed = parse_outline("1. 引言：背景\r\n2. 结语：总结\r\n");
        assert_eq!(
            parsed.sections,
            vec![section("引言", "背景"), section("结语", "总结")]
        );
    }

    #[test]
    fn empty_title_and_hint_are_kept() {
        let parsed = parse_outline("1. ：");
        assert_eq!(parsed.sections, vec![section("", "")]);
    }

    #[test]
    fn reparsing_formatted_sections_round_trips() {
        let input = "\
1. 引言：介绍主题背景
2. 现状：描述当前情况
3. 结语：总结全文观点";
        let first = parse_outline(input);
        let second = parse_outline(&format_sections(&first.sections));
        assert_eq!(first.sections, second.sections);
    }
}
