//! Action handlers: one function per user-triggered action.
//!
//! Each handler takes the session by `&mut`, runs to completion, and leaves
//! persistence to the caller. Model faults come back inside the returned
//! outcome, never as `Err`; `Err` is reserved for requests that cannot be
//! attempted at all (unknown section, missing draft).

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::ScribeError;
use crate::gemini::{self, Generation, ModelClient};
use crate::outline::{self, ParsedOutline};
use crate::prompt::PromptTemplates;
use crate::session::{OrphanPolicy, Session};

/// Result of a "generate outline" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineOutcome {
    /// The model answered; the parsed outline replaced the stored one.
    Generated {
        parsed: ParsedOutline,
        raw_len: usize,
    },
    /// The model call failed; the stored outline is unchanged.
    Failed(Generation),
}

/// Set the topic, ask the model for an outline, and store the parsed result.
///
/// The topic is stored before the call, so it survives a failed generation.
pub fn generate_outline(
    session: &mut Session,
    client: &dyn ModelClient,
    templates: &PromptTemplates,
    topic: &str,
    policy: OrphanPolicy,
) -> OutlineOutcome {
    session.set_topic(topic);
    let prompt = templates.outline_prompt(topic);
    info!(topic_len = topic.len(), prompt_len = prompt.len(), "generating outline");

    let start = Instant::now();
    let generation = gemini::call_model(client, &prompt);
    let duration_ms = elapsed_ms(start);

    let raw = match generation {
        Generation::Success(raw) => raw,
        failed @ Generation::Failure(_) => {
            warn!(duration_ms, "outline generation failed");
            return OutlineOutcome::Failed(failed);
        }
    };

    let parsed = outline::parse_outline(&raw);
    for line in &parsed.unparsed {
        debug!(line = %line, "dropped outline line without separator");
    }
    if parsed.is_empty() {
        warn!(raw_len = raw.len(), "model response produced no outline sections");
    }
    info!(
        sections = parsed.sections.len(),
        unparsed = parsed.unparsed.len(),
        duration_ms,
        "outline generated"
    );

    session.replace_outline(parsed.sections.clone(), policy);
    let orphans = session.orphaned_indices();
    if !orphans.is_empty() {
        debug!(?orphans, "section entries left over from the previous outline");
    }

    OutlineOutcome::Generated {
        parsed,
        raw_len: raw.len(),
    }
}

/// Ask the model for a paragraph for the section at 0-based `index`.
///
/// On success the draft for `index` is overwritten. On failure the stored
/// draft is left alone and the failure is returned for display.
pub fn generate_draft(
    session: &mut Session,
    client: &dyn ModelClient,
    templates: &PromptTemplates,
    index: usize,
) -> Result<Generation, ScribeError> {
    let title = checked_section(session, index)?.title.clone();
    let prompt = templates.paragraph_prompt(session.topic(), &title);
    info!(section = index + 1, prompt_len = prompt.len(), "generating section draft");

    let start = Instant::now();
    let generation = gemini::call_model(client, &prompt);
    let duration_ms = elapsed_ms(start);

    match &generation {
        Generation::Success(text) => {
            session.set_draft(index, text.clone());
            info!(section = index + 1, draft_len = text.len(), duration_ms, "draft generated");
        }
        Generation::Failure(_) => {
            warn!(section = index + 1, duration_ms, "draft generation failed");
        }
    }

    Ok(generation)
}

/// Store the user's revision for the section at 0-based `index`.
///
/// A draft for the current outline must exist first; the edit area only
/// appears under a draft.
pub fn save_edit(session: &mut Session, index: usize, text: &str) -> Result<(), ScribeError> {
    checked_section(session, index)?;
    if session.draft(index).is_none() || session.draft_is_orphaned(index) {
        return Err(ScribeError::DraftMissing { index: index + 1 });
    }
    session.set_edit(index, text);
    info!(section = index + 1, edit_len = text.len(), "user edit saved");
    Ok(())
}

/// Convert a 1-based section number from the user into a 0-based index.
pub fn section_index(number: usize, session: &Session) -> Result<usize, ScribeError> {
    let available = session.outline().len();
    if available == 0 {
        return Err(ScribeError::OutlineEmpty);
    }
    if number == 0 || number > available {
        return Err(ScribeError::SectionNotFound {
            index: number,
            available,
        });
    }
    Ok(number - 1)
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn checked_section(
    session: &Session,
    index: usize,
) -> Result<&crate::outline::OutlineSection, ScribeError> {
    if session.outline().is_empty() {
        return Err(ScribeError::OutlineEmpty);
    }
    session
        .section(index)
        .ok_or_else(|| ScribeError::SectionNotFound {
            index: index + 1,
            available: session.outline().len(),
        })
}
