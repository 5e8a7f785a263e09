use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ScribeError;
use crate::outline::OutlineSection;

/// What happens to per-section drafts and edits when the outline is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Keep entries under their old indices, even past the end of the new outline.
    #[default]
    Retain,
    /// Drop every draft and edit.
    Clear,
}

/// A draft or edit, tagged with the outline version it was written under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SectionText {
    text: String,
    #[serde(default)]
    outline_version: u64,
}

/// All state for one writing session, serialized to `<session_dir>/session.json`.
///
/// Drafts and edits are keyed by 0-based section position. They are only
/// loosely tied to the outline: replacing the outline under
/// [`OrphanPolicy::Retain`] leaves them in place, but each entry remembers
/// the outline version it was written under, so entries from an earlier
/// outline are reported as orphaned even when their index is still in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    topic: String,

    #[serde(default)]
    outline: Vec<OutlineSection>,

    /// Bumped on every outline replacement.
    #[serde(default)]
    outline_version: u64,

    /// Latest AI paragraph per section. `BTreeMap` keeps JSON keys ordered.
    #[serde(default)]
    drafts: BTreeMap<usize, SectionText>,

    /// The user's own revision per section.
    #[serde(default)]
    edits: BTreeMap<usize, SectionText>,

    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            topic: String::new(),
            outline: Vec::new(),
            outline_version: 0,
            drafts: BTreeMap::new(),
            edits: BTreeMap::new(),
            created_at: Some(Utc::now().to_rfc3339()),
            updated_at: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
        self.touch();
    }

    pub fn outline(&self) -> &[OutlineSection] {
        &self.outline
    }

    pub fn section(&self, index: usize) -> Option<&OutlineSection> {
        self.outline.get(index)
    }

    /// Replace the whole outline. Sections are never merged.
    pub fn replace_outline(&mut self, sections: Vec<OutlineSection>, policy: OrphanPolicy) {
        self.outline = sections;
        self.outline_version += 1;
        if policy == OrphanPolicy::Clear {
            self.drafts.clear();
            self.edits.clear();
        }
        self.touch();
    }

    pub fn draft(&self, index: usize) -> Option<&str> {
        self.drafts.get(&index).map(|d| d.text.as_str())
    }

    /// Store the AI draft for `index`, overwriting any previous one.
    pub fn set_draft(&mut self, index: usize, text: impl Into<String>) {
        let entry = self.current_text(text);
        self.drafts.insert(index, entry);
        self.touch();
    }

    pub fn edit(&self, index: usize) -> Option<&str> {
        self.edits.get(&index).map(|e| e.text.as_str())
    }

    /// Store the user's revision for `index`, overwriting any previous one.
    pub fn set_edit(&mut self, index: usize, text: impl Into<String>) {
        let entry = self.current_text(text);
        self.edits.insert(index, entry);
        self.touch();
    }

    /// True when the draft at `index` exists but does not belong to the current outline.
    pub fn draft_is_orphaned(&self, index: usize) -> bool {
        self.drafts
            .get(&index)
            .is_some_and(|d| self.is_stale(index, d))
    }

    /// True when the edit at `index` exists but does not belong to the current outline.
    pub fn edit_is_orphaned(&self, index: usize) -> bool {
        self.edits
            .get(&index)
            .is_some_and(|e| self.is_stale(index, e))
    }

    /// Indices holding a draft or edit written under an earlier outline, or
    /// lying past the end of the current one. Sorted, without duplicates.
    pub fn orphaned_indices(&self) -> Vec<usize> {
        let mut orphans: Vec<usize> = self
            .drafts
            .iter()
            .chain(self.edits.iter())
            .filter(|(i, entry)| self.is_stale(**i, entry))
            .map(|(i, _)| *i)
            .collect();
        orphans.sort_unstable();
        orphans.dedup();
        orphans
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    /// Returns the canonical session file path within the given directory.
    pub fn session_file_path(session_dir: &Path) -> PathBuf {
        session_dir.join("session.json")
    }

    fn current_text(&self, text: impl Into<String>) -> SectionText {
        SectionText {
            text: text.into(),
            outline_version: self.outline_version,
        }
    }

    fn is_stale(&self, index: usize, entry: &SectionText) -> bool {
        entry.outline_version != self.outline_version || index >= self.outline.len()
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now().to_rfc3339());
    }
}

/// Load the session from `session_dir/session.json`.
///
/// Returns `Ok(None)` if the file does not exist or contains invalid JSON
/// (the latter is logged as a warning). Returns `Err` on other I/O errors
/// such as permission denied.
pub fn load_session(session_dir: &Path) -> Result<Option<Session>, ScribeError> {
    let path = Session::session_file_path(session_dir);

    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ScribeError::SessionReadFailed {
                path,
                detail: e.to_string(),
            });
        }
    };

    match serde_json::from_str::<Session>(&contents) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                err = %e,
                "ignoring invalid session file"
            );
            Ok(None)
        }
    }
}

/// Load the session, or start a fresh one when none is stored.
pub fn load_or_new(session_dir: &Path) -> Result<Session, ScribeError> {
    Ok(load_session(session_dir)?.unwrap_or_default())
}

/// Persist the session to `session_dir/session.json`.
///
/// Creates `session_dir` if needed. Writes to a temporary file and renames
/// it into place; falls back to a direct write if the rename fails.
pub fn save_session(session: &Session, session_dir: &Path) -> Result<(), ScribeError> {
    let path = Session::session_file_path(session_dir);

    fs::create_dir_all(session_dir).map_err(|e| ScribeError::SessionWriteFailed {
        path: session_dir.to_path_buf(),
        detail: format!("failed to create directory: {e}"),
    })?;

    let json =
        serde_json::to_string_pretty(session).map_err(|e| ScribeError::SessionWriteFailed {
            path: path.clone(),
            detail: format!("serialization failed: {e}"),
        })?;

    let tmp_path = session_dir.join("session.json.tmp");

    let write_tmp = || -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(json.as_bytes())?;
        f.flush()
    };
    write_tmp().map_err(|e| ScribeError::SessionWriteFailed {
        path: tmp_path.clone(),
        detail: e.to_string(),
    })?;

    if fs::rename(&tmp_path, &path).is_err() {
        fs::write(&path, &json).map_err(|e| ScribeError::SessionWriteFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        let _ = fs::remove_file(&tmp_path);
    }

    Ok(())
}

/// Delete the stored session. Returns `false` when there was nothing to delete.
pub fn remove_session(session_dir: &Path) -> Result<bool, ScribeError> {
    let path = Session::session_file_path(session_dir);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ScribeError::SessionWriteFailed {
            path,
            detail: e.to_string(),
        }),
    }
}
