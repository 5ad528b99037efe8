//! Append-only step transcript and the fold that builds it from step events.
//!
//! The backend emits many small fragments per logical step. Fragments sharing
//! a title are grouped under one entry; an `Error` fragment is absorbed into
//! whatever entry is current and marks it failed.

use forge_api::events::TITLE_ERROR;
use forge_api::StepEvent;
use time::OffsetDateTime;

/// Suffix added (once) to the title of a failed entry.
pub const FAILURE_MARKER: &str = " (failed)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    failed: bool,
}

impl TranscriptEntry {
    fn new(role: Role, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role,
            title: title.into(),
            content: content.into(),
            created_at: OffsetDateTime::now_utc(),
            failed: false,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn mark_failed(&mut self) {
        if !self.failed {
            self.failed = true;
            self.title.push_str(FAILURE_MARKER);
        }
    }
}

/// Ordered transcript. Entries are only ever appended or extended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_is_failed(&self) -> bool {
        self.entries.last().is_some_and(TranscriptEntry::is_failed)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(TranscriptEntry::new(Role::User, "", content));
    }

    pub fn push_assistant(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.push(TranscriptEntry::new(Role::Assistant, title, content));
    }

    /// Appends `note` to the most recent entry and marks it failed.
    ///
    /// Starts a failed `Error` entry when the transcript is empty.
    pub fn fail_last(&mut self, note: &str) {
        match self.entries.last_mut() {
            Some(entry) => {
                entry.content.push_str(note);
                entry.mark_failed();
            }
            None => {
                let mut entry = TranscriptEntry::new(Role::Assistant, TITLE_ERROR, note);
                entry.mark_failed();
                self.entries.push(entry);
            }
        }
    }

    fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    /// A fragment that repeats the whole last entry is a redelivery.
    fn is_duplicate(&self, title: &str, output: &str) -> bool {
        self.entries
            .last()
            .is_some_and(|entry| entry.title == title && entry.content == output)
    }
}

/// What a single fold did to the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldOutcome {
    /// `Debug` event; nothing changed.
    Ignored,
    /// `Session` event carrying the backend session token; nothing changed.
    SessionToken(String),
    /// Redelivery of a fragment equal to the whole last entry; nothing changed.
    Duplicate,
    /// A new entry was started.
    Started,
    /// The fragment was appended to the last entry.
    Appended,
    /// An `Error` fragment was absorbed and the last entry marked failed.
    Failed,
}

impl FoldOutcome {
    pub fn changed_transcript(&self) -> bool {
        matches!(self, Self::Started | Self::Appended | Self::Failed)
    }
}

/// Folds one step event into `transcript`.
pub fn fold(transcript: &mut Transcript, event: &StepEvent) -> FoldOutcome {
    let (title, output) = match event {
        StepEvent::Debug { .. } => return FoldOutcome::Ignored,
        StepEvent::Session { token } => return FoldOutcome::SessionToken(token.clone()),
        StepEvent::Error { output } => (TITLE_ERROR, output.as_str()),
        StepEvent::Step { title, output } => (title.as_str(), output.as_str()),
    };

    if transcript.is_duplicate(title, output) {
        return FoldOutcome::Duplicate;
    }

    let is_error = matches!(event, StepEvent::Error { .. });
    let starts_new = !is_error
        && transcript
            .entries
            .last()
            .map_or(true, |entry| entry.title != title);

    if starts_new {
        transcript
            .entries
            .push(TranscriptEntry::new(Role::Assistant, title, output));
        FoldOutcome::Started
    } else if is_error {
        transcript.fail_last(output);
        FoldOutcome::Failed
    } else {
        if let Some(entry) = transcript.entries.last_mut() {
            entry.content.push_str(output);
        }
        FoldOutcome::Appended
    }
}
