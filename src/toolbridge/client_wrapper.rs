//! Chat client interface.
//!
//! The bridge never talks to an LLM provider directly; the embedding
//! application supplies a [`ChatClient`] implementation over whatever
//! completion endpoint it uses. The types here define the only contract the
//! fulfillment loop relies on: messages made of typed content blocks, where
//! tool invocations arrive as `tool_use` blocks and results return as
//! `tool_result` blocks.

use crate::toolbridge::catalog::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;

/// Represents the possible roles for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A message sent by the human user, or tool results fed back on their behalf.
    User,
    /// Content generated by the model.
    Assistant,
}

/// One typed block inside a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: JsonValue,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }
}

/// Represents a generic message exchanged with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Create a user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message with a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Concatenated text of every text block in the message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Borrow every tool-use block in the message, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &JsonValue)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

/// Trait defining the interface to the conversational model.
///
/// Implementations send the full conversation plus the unified tool catalog
/// to their provider and return the model's next message. The bridge makes
/// no assumption about the provider beyond this call.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Query the model with the conversation so far and the available tools.
    async fn send_message(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, Box<dyn Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_text_skips_tool_blocks() {
        let message = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::text("before"),
                ContentBlock::ToolUse {
                    id: "t1".to_string(),
                    name: "git_status".to_string(),
                    input: json!({}),
                },
                ContentBlock::text("after"),
            ],
        };
        assert_eq!(message.text(), "before\nafter");
        assert_eq!(message.tool_uses().len(), 1);
    }

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::tool_result("t1", "ok", false);
        let wire = serde_json::to_value(&block).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "tool_result",
                "tool_use_id": "t1",
                "content": "ok",
                "is_error": false
            })
        );

        let parsed: ContentBlock = serde_json::from_value(json!({
            "type": "tool_use",
            "id": "t2",
            "name": "read_file",
            "input": {"path": "notes.txt"}
        }))
        .unwrap();
        match parsed {
            ContentBlock::ToolUse { id, name, .. } => {
                assert_eq!(id, "t2");
                assert_eq!(name, "read_file");
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }
}
