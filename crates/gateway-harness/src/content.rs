use crate::errors::HarnessError;

/// Conversation role for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a conversation. Order is significant; alternation is not
/// validated.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input to a completion: a plain prompt or an ordered, non-empty message list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptInput {
    Prompt(String),
    Messages(Vec<Message>),
}

impl PromptInput {
    /// Builds an input from the two optional request fields.
    ///
    /// Exactly one of `prompt` / `messages` must be present, and a message
    /// list must not be empty.
    pub fn from_parts(
        prompt: Option<String>,
        messages: Option<Vec<Message>>,
    ) -> Result<Self, HarnessError> {
        match (prompt, messages) {
            (Some(_), Some(_)) => Err(HarnessError::Validation(
                "provide either prompt or messages, not both".into(),
            )),
            (None, None) => Err(HarnessError::Validation(
                "one of prompt or messages is required".into(),
            )),
            (Some(prompt), None) => Ok(Self::Prompt(prompt)),
            (None, Some(messages)) if messages.is_empty() => Err(HarnessError::Validation(
                "messages must contain at least one message".into(),
            )),
            (None, Some(messages)) => Ok(Self::Messages(messages)),
        }
    }

    /// Returns the input as a message list; a plain prompt becomes one user
    /// message.
    pub fn to_messages(&self) -> Vec<Message> {
        match self {
            Self::Prompt(prompt) => vec![Message::user(prompt.clone())],
            Self::Messages(messages) => messages.clone(),
        }
    }

    /// Joins the prompt, or every non-system message content, with single
    /// spaces.
    pub fn conversation_text(&self) -> String {
        match self {
            Self::Prompt(prompt) => prompt.clone(),
            Self::Messages(messages) => messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Token accounting for a completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Length-based estimate: `ceil(chars / 4)` for each side.
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        Self::new(estimate_tokens(prompt), estimate_tokens(completion))
    }
}

/// `ceil(chars / 4)`, counted in Unicode scalar values.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

/// Buffered completion result.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Usage,
}
