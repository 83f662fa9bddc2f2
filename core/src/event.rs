//! Observations produced while interpreting a streamed response

/// A typed observation extracted from one stream line.
///
/// Events are transient: the timing engine consumes them in arrival order
/// and never stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty fragment of the final answer
    ContentDelta {
        /// Fragment text
        text: String,
    },
    /// A non-empty reasoning-summary or raw reasoning fragment
    ReasoningDelta {
        /// Fragment text
        text: String,
    },
    /// The server reported how many completion tokens it produced
    UsageReported {
        /// Completion (output) token count
        completion_tokens: usize,
    },
    /// The stream terminator arrived
    StreamEnd,
}

impl StreamEvent {
    /// Shorthand for a content fragment
    pub fn content(text: impl Into<String>) -> Self {
        StreamEvent::ContentDelta { text: text.into() }
    }

    /// Shorthand for a reasoning fragment
    pub fn reasoning(text: impl Into<String>) -> Self {
        StreamEvent::ReasoningDelta { text: text.into() }
    }
}
