// session_feed - Virtualized terminal viewer for recorded AI-assistant sessions
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serde_json::Value;

const TOOL_INPUT_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
    /// Record that could not be decoded; rendered verbatim.
    Raw,
}

impl Role {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
            Self::Tool => "Tool",
            Self::Raw => "Record",
        }
    }

    fn parse(role: &str) -> Self {
        match role {
            "user" | "human" | "developer" => Self::User,
            "assistant" | "model" => Self::Assistant,
            "system" => Self::System,
            "tool" | "function" => Self::Tool,
            _ => Self::Raw,
        }
    }
}

/// One decoded transcript record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub role: Role,
    pub timestamp: Option<String>,
    pub text: String,
}

impl SessionEntry {
    /// Decode one JSON line. Understands Claude Code transcripts
    /// (`{"type":"assistant","message":{...}}`), Codex rollouts
    /// (`{"type":"response_item","payload":{...}}`) and plain
    /// `{"role","content"}` chat records. Anything else is kept raw.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return Self::raw(raw);
        };
        let timestamp = value.get("timestamp").and_then(Value::as_str).map(str::to_owned);
        let decoded = match value.get("type").and_then(Value::as_str) {
            Some("response_item" | "event_msg") => value.get("payload").and_then(decode_payload),
            Some("summary") => value
                .get("summary")
                .and_then(Value::as_str)
                .map(|summary| (Role::System, summary.to_owned())),
            _ => value.get("message").map_or_else(|| decode_message(&value), decode_message),
        };
        match decoded {
            Some((role, text)) if !text.trim().is_empty() => Self { role, timestamp, text },
            _ => Self::raw(raw),
        }
    }

    #[must_use]
    pub fn raw(raw: &str) -> Self {
        Self { role: Role::Raw, timestamp: None, text: raw.to_owned() }
    }
}

fn decode_message(message: &Value) -> Option<(Role, String)> {
    let role = Role::parse(message.get("role").and_then(Value::as_str)?);
    let content = message.get("content")?;
    let (text, only_tools) = content_text(content);
    let role = if only_tools && role != Role::Raw { Role::Tool } else { role };
    Some((role, text))
}

fn decode_payload(payload: &Value) -> Option<(Role, String)> {
    match payload.get("type").and_then(Value::as_str)? {
        "message" => decode_message(payload),
        "user_message" => Some((Role::User, payload.get("message")?.as_str()?.to_owned())),
        "agent_message" => Some((Role::Assistant, payload.get("message")?.as_str()?.to_owned())),
        "function_call" | "custom_tool_call" => {
            let name = payload.get("name").and_then(Value::as_str).unwrap_or("tool");
            let input = payload.get("arguments").or_else(|| payload.get("input"));
            Some((Role::Tool, tool_call_line(name, input)))
        }
        "function_call_output" | "custom_tool_call_output" => {
            Some((Role::Tool, payload.get("output").map(plain_text).unwrap_or_default()))
        }
        _ => None,
    }
}

/// Flatten message content. The flag is true when every block was a tool
/// call or tool result.
fn content_text(content: &Value) -> (String, bool) {
    let Some(blocks) = content.as_array() else {
        return (plain_text(content), false);
    };
    let mut parts = Vec::new();
    let mut only_tools = !blocks.is_empty();
    for block in blocks {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("text");
        match kind {
            "tool_use" => {
                let name = block.get("name").and_then(Value::as_str).unwrap_or("tool");
                parts.push(tool_call_line(name, block.get("input")));
            }
            "tool_result" => parts.push(block.get("content").map(plain_text).unwrap_or_default()),
            "thinking" => {
                only_tools = false;
                if let Some(thinking) = block.get("thinking").and_then(Value::as_str) {
                    parts.push(format!("(thinking) {thinking}"));
                }
            }
            _ => {
                only_tools = false;
                if let Some(text) = block
                    .get("text")
                    .or_else(|| block.get("input_text"))
                    .or_else(|| block.get("output_text"))
                    .and_then(Value::as_str)
                {
                    parts.push(text.to_owned());
                }
            }
        }
    }
    (parts.into_iter().filter(|p| !p.trim().is_empty()).collect::<Vec<_>>().join("\n"), only_tools)
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(_) => content_text(value).0,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn tool_call_line(name: &str, input: Option<&Value>) -> String {
    let input = match input {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => String::new(),
    };
    let mut preview: String = input.chars().take(TOOL_INPUT_PREVIEW_CHARS).collect();
    if preview.len() < input.len() {
        preview.push('\u{2026}');
    }
    if preview.is_empty() { format!("\u{27E9} {name}") } else { format!("\u{27E9} {name} {preview}") }
}
