//! Bounded memory of earlier query/response pairs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Characters of each stored response shown in the prompt context.
pub const RESPONSE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// FIFO of the most recent exchanges; the oldest is evicted at capacity.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, query: impl Into<String>, response: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        });
    }

    /// Numbered Q/A pairs, oldest first, for inclusion in a prompt.
    ///
    /// Responses are shortened to [`RESPONSE_PREVIEW_CHARS`]; the stored
    /// entries are not modified. Empty when there is no history.
    pub fn render_context(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let mut context = String::from("Previous conversation:\n");
        for (i, entry) in self.entries.iter().enumerate() {
            context.push_str(&format!(
                "{}. Q: {}\n   A: {}\n",
                i + 1,
                entry.query,
                preview(&entry.response)
            ));
        }
        context.push('\n');
        context
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn preview(response: &str) -> String {
    match response.char_indices().nth(RESPONSE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &response[..cut]),
        None => response.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut history = ConversationHistory::new(3);
        for i in 1..=4 {
            history.append(format!("query {i}"), format!("answer {i}"));
        }

        assert_eq!(history.len(), 3);
        let queries: Vec<&str> = history.entries().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["query 2", "query 3", "query 4"]);

        let context = history.render_context();
        assert!(!context.contains("query 1"));
        assert!(context.contains("1. Q: query 2\n   A: answer 2\n"));
        assert!(context.contains("3. Q: query 4\n   A: answer 4\n"));
    }

    #[test]
    fn long_responses_are_shortened_in_context_only() {
        let mut history = ConversationHistory::new(2);
        let long = "é".repeat(RESPONSE_PREVIEW_CHARS + 50);
        history.append("what happened?", long.clone());

        let context = history.render_context();
        let expected = format!("A: {}...\n", "é".repeat(RESPONSE_PREVIEW_CHARS));
        assert!(context.contains(&expected));
        assert_eq!(history.entries().next().unwrap().response, long);
    }

    #[test]
    fn short_responses_are_untouched() {
        let mut history = ConversationHistory::new(1);
        history.append("volume up", "Increased system volume.");
        assert!(
            history
                .render_context()
                .contains("A: Increased system volume.\n")
        );
    }

    #[test]
    fn empty_history_renders_nothing() {
        assert_eq!(ConversationHistory::new(5).render_context(), "");
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = ConversationHistory::new(0);
        history.append("q", "a");
        assert!(history.is_empty());
    }
}
