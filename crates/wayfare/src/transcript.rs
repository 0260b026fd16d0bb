//! Flat-text transcript codec.
//!
//! Conversations are persisted as append-only text files made of repeating
//! blocks: a source label line (`### User` or `### Agent`) followed by the
//! raw message body and a trailing newline. Bodies are written verbatim, so
//! a body line that itself starts with `### ` is indistinguishable from a
//! label — a known format ambiguity, preserved as-is.

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw message body, terminators included.
    pub body: String,
    /// True when the user wrote the message, false for the agent.
    pub from_user: bool,
}

/// Prefix that marks a source label line.
const LABEL_PREFIX: &str = "### ";

impl Message {
    /// Create a user-authored message.
    pub fn from_user(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            from_user: true,
        }
    }

    /// Create an agent-authored message.
    pub fn from_agent(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            from_user: false,
        }
    }

    /// Completion-service role for this message.
    pub fn role(&self) -> &'static str {
        if self.from_user { "user" } else { "assistant" }
    }

    /// Serialize the message with its source label.
    pub fn serialize(&self) -> String {
        let label = if self.from_user { "User" } else { "Agent" };
        format!("{LABEL_PREFIX}{label}\n{}\n", self.body)
    }

    /// Deserialize a series of messages from the lines of a transcript file.
    ///
    /// Each line is expected to carry its terminator (or be the final
    /// unterminated fragment). Lines before the first source label are
    /// discarded. A message is emitted only once a label has been seen and
    /// its accumulated body is non-empty, so back-to-back labels drop the
    /// earlier, empty message.
    pub fn deserialize_messages<I, S>(lines: I) -> Vec<Message>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut messages = Vec::new();
        let mut from_user = false;
        let mut body = String::new();
        let mut label_seen = false;

        for line in lines {
            let line = line.as_ref();
            if let Some(next_from_user) = parse_source_label(line) {
                if label_seen && !body.is_empty() {
                    messages.push(Message { body: std::mem::take(&mut body), from_user });
                } else {
                    body.clear();
                }
                from_user = next_from_user;
                label_seen = true;
            } else {
                body.push_str(line);
            }
        }
        // The loop ends before flushing the message under construction.
        if label_seen && !body.is_empty() {
            messages.push(Message { body, from_user });
        }

        messages
    }
}

/// Split file contents into lines, keeping each line's terminator.
///
/// The final fragment is returned without a terminator if the file does not
/// end in a newline.
pub fn split_lines(contents: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = contents;
    while let Some(idx) = rest.find('\n') {
        out.push(&rest[..=idx]);
        rest = &rest[idx + 1..];
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Parse a potential source label line.
///
/// A source label is `### <User|Agent>`: the `### ` prefix followed by a
/// single non-empty remainder. Returns `None` for anything else, otherwise
/// whether the source is the user (any remainder other than `user`, after
/// trimming and lowercasing, is treated as the agent).
fn parse_source_label(line: &str) -> Option<bool> {
    let remainder = line.strip_prefix(LABEL_PREFIX)?;
    // Splitting on the first prefix occurrence must yield exactly two parts;
    // a second occurrence in the remainder means this is not a label.
    if remainder.is_empty() || remainder.contains(LABEL_PREFIX) {
        return None;
    }
    Some(remainder.trim().eq_ignore_ascii_case("user"))
}
