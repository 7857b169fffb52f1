use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// One fresh exchange sent upstream: optional system instruction followed by
/// the ordered turns, the last of which is the caller's query.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub system_instruction: Option<String>,
    pub turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn latest_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.text.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChatRequest {
    #[serde(rename = "userInput", default)]
    pub user_input: Option<Value>,
}

impl ChatRequest {
    /// Returns the query when `userInput` is a non-empty string. Missing and
    /// falsy values yield `None`, as do non-string values.
    pub fn query(&self) -> Option<&str> {
        match self.user_input.as_ref()? {
            Value::String(text) if !text.is_empty() => Some(text.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_request() {
        let request: ChatRequest = serde_json::from_str(r#"{"userInput":"black shorts"}"#).unwrap();
        assert_eq!(request.query(), Some("black shorts"));
    }

    #[test]
    fn falsy_inputs_have_no_query() {
        for raw in [
            r#"{}"#,
            r#"{"userInput":""}"#,
            r#"{"userInput":null}"#,
            r#"{"userInput":false}"#,
            r#"{"userInput":0}"#,
        ] {
            let request: ChatRequest = serde_json::from_str(raw).unwrap();
            assert_eq!(request.query(), None, "{raw}");
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = ConversationTurn::model("hi");
        let encoded = serde_json::to_string(&turn).unwrap();
        assert_eq!(encoded, r#"{"role":"model","text":"hi"}"#);
    }

    #[test]
    fn latest_user_text_skips_model_turns() {
        let conversation = Conversation {
            system_instruction: None,
            turns: vec![
                ConversationTurn::user("first"),
                ConversationTurn::model("reply"),
                ConversationTurn::user("second"),
                ConversationTurn::model("trailing"),
            ],
        };
        assert_eq!(conversation.latest_user_text(), Some("second"));
    }
}
