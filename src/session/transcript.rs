//! Conversation transcript accumulation.
//!
//! Collects session events into an ordered log the UI can render
//! directly. Speech transcription arrives as a stream of partial results;
//! consecutive transcription entries are merged by appending their text,
//! so one spoken utterance stays one log entry no matter how many partial
//! results it took.

/// Kind of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    /// Connection/TTS lifecycle notices
    System,
    /// User speech transcription
    Stt,
    /// Assistant response text
    Assistant,
    /// Typed user chat message
    UserChat,
}

/// One rendered line of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub kind: TranscriptKind,
    pub text: String,
}

/// Ordered log of conversation entries with partial-STT append semantics.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptEntry>,
}

impl TranscriptLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in arrival order.
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry of the given kind.
    pub fn push(&mut self, kind: TranscriptKind, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            kind,
            text: text.into(),
        });
    }

    /// Record a transcription result.
    ///
    /// Empty text is dropped. If the latest entry is also a transcription,
    /// the text is appended to it; otherwise a new entry starts.
    pub fn push_stt(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.entries.last_mut()
            && last.kind == TranscriptKind::Stt
        {
            last.text.push_str(text);
            return;
        }
        self.push(TranscriptKind::Stt, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_stt_results_merge() {
        let mut log = TranscriptLog::new();
        log.push_stt("hello ");
        log.push_stt("world");

        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].text, "hello world");
        assert_eq!(log.entries()[0].kind, TranscriptKind::Stt);
    }

    #[test]
    fn test_other_entry_breaks_the_merge() {
        let mut log = TranscriptLog::new();
        log.push_stt("first utterance");
        log.push(TranscriptKind::Assistant, "reply");
        log.push_stt("second utterance");

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.entries()[2].text, "second utterance");
    }

    #[test]
    fn test_empty_stt_text_is_dropped() {
        let mut log = TranscriptLog::new();
        log.push_stt("");
        assert!(log.is_empty());
    }

    #[test]
    fn test_system_entries_always_append() {
        let mut log = TranscriptLog::new();
        log.push(TranscriptKind::System, "TTS start");
        log.push(TranscriptKind::System, "TTS end");
        assert_eq!(log.entries().len(), 2);
    }
}
