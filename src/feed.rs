//! Chat-style message feed.
//!
//! An ordered, append-only, in-memory log of bulletins and system notices.
//! Never persisted; cleared when the process exits. Intentionally unbounded
//! (the source system keeps no eviction policy), but ids stay monotone so a
//! cap could be added later without changing callers.

use chrono::{DateTime, Utc};

/// Who produced a feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    /// AI-generated bulletin
    Ai,
    /// Operational notice from wxsentry itself
    System,
}

impl Sender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::System => "SYSTEM",
        }
    }
}

/// One feed entry.
#[derive(Debug, Clone)]
pub struct Message {
    /// Monotonically increasing id within this session
    pub id: u64,
    /// When the entry was appended
    pub time: DateTime<Utc>,
    /// Displayable text
    pub text: String,
    pub sender: Sender,
    /// Marks dismissable error notices
    pub is_error: bool,
}

/// Append-only message log.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, text: String, sender: Sender, is_error: bool) {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id,
            time: Utc::now(),
            text,
            sender,
            is_error,
        });
    }

    /// Append an AI bulletin.
    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.push(text.into(), Sender::Ai, false);
    }

    /// Append a system notice.
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push(text.into(), Sender::System, false);
    }

    /// Append a dismissable error notice.
    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push(text.into(), Sender::System, true);
    }

    /// All messages in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_in_append_order() {
        let mut log = MessageLog::new();
        log.push_ai("鋒面通過，氣溫下降。");
        log.push_system("已排定下次更新");
        log.push_error("fetch failed");

        let ids: Vec<u64> = log.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_sender_and_error_flags() {
        let mut log = MessageLog::new();
        log.push_ai("bulletin");
        log.push_error("boom");

        let messages: Vec<&Message> = log.iter().collect();
        assert_eq!(messages[0].sender, Sender::Ai);
        assert!(!messages[0].is_error);
        assert_eq!(messages[1].sender, Sender::System);
        assert!(messages[1].is_error);
        assert_eq!(log.last().map(|m| m.text.as_str()), Some("boom"));
    }

    #[test]
    fn test_log_is_append_only() {
        let mut log = MessageLog::new();
        for i in 0..100 {
            log.push_system(format!("tick {i}"));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next().map(|m| m.id), Some(0));
        assert_eq!(log.last().map(|m| m.id), Some(99));
    }
}
