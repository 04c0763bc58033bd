//! Prompt templates for poignancy rating.
//!
//! The built-in templates are compiled in; a TOML file with the same shape
//! can override them:
//!
//! ```toml
//! [event]
//! system = "..."
//! user = "Event: {text}"
//!
//! [chat]
//! system = "..."
//! user = "Conversation: {text}"
//! ```

use percept_core::PoignancyKind;
use serde::Deserialize;

use crate::error::LlmError;
use crate::types::LlmRequest;

/// Event poignancy rating (system prompt).
pub const EVENT_POIGNANCY_SYSTEM: &str = r"You rate how memorable events are for a character in a small town.
On a scale of 1 to 10, where 1 is purely mundane (e.g., brushing teeth, making bed)
and 10 is extremely poignant (e.g., a break up, college acceptance),
rate the likely poignancy of the event.
Answer with a single integer.";

/// Event poignancy rating (user prompt).
pub const EVENT_POIGNANCY_USER: &str = r#"Event: {text}
Return JSON: {{"poignancy": <integer 1-10>}}"#;

/// Conversation poignancy rating (system prompt).
pub const CHAT_POIGNANCY_SYSTEM: &str = r"You rate how memorable conversations are for a character in a small town.
On a scale of 1 to 10, where 1 is purely mundane (e.g., routine morning greetings)
and 10 is extremely poignant (e.g., a conversation about breaking up, a fight),
rate the likely poignancy of the conversation.
Answer with a single integer.";

/// Conversation poignancy rating (user prompt).
pub const CHAT_POIGNANCY_USER: &str = r#"Conversation: {text}
Return JSON: {{"poignancy": <integer 1-10>}}"#;

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value and `{{` / `}}` with
/// literal braces.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result.replace("{{", "{").replace("}}", "}")
}

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptTemplate {
    /// System prompt.
    pub system: String,
    /// User prompt; `{text}` is replaced by the text being rated.
    pub user: String,
}

/// The templates used for both poignancy kinds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoignancyPrompts {
    /// Template for perceived events.
    pub event: PromptTemplate,
    /// Template for the agent's own conversations.
    pub chat: PromptTemplate,
}

impl PoignancyPrompts {
    /// The compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            event: PromptTemplate {
                system: EVENT_POIGNANCY_SYSTEM.into(),
                user: EVENT_POIGNANCY_USER.into(),
            },
            chat: PromptTemplate {
                system: CHAT_POIGNANCY_SYSTEM.into(),
                user: CHAT_POIGNANCY_USER.into(),
            },
        }
    }

    /// Parse templates from TOML.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` if the TOML is invalid or a section
    /// is missing.
    pub fn from_toml(toml_str: &str) -> Result<Self, LlmError> {
        toml::from_str(toml_str).map_err(|e| LlmError::ConfigError(e.to_string()))
    }

    /// Load templates from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Template for `kind`.
    #[must_use]
    pub fn get(&self, kind: PoignancyKind) -> &PromptTemplate {
        match kind {
            PoignancyKind::Event => &self.event,
            PoignancyKind::Chat => &self.chat,
        }
    }

    /// Render a rating request for `text`.
    #[must_use]
    pub fn request(&self, kind: PoignancyKind, text: &str, timeout_ms: u64) -> LlmRequest {
        let tpl = self.get(kind);
        LlmRequest::new(
            render_template(&tpl.system, &[("text", text)]),
            render_template(&tpl.user, &[("text", text)]),
        )
        .with_json_mode()
        .with_timeout(timeout_ms)
    }
}

impl Default for PoignancyPrompts {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_rendering_works() {
        let rendered = render_template(
            "Hello {name}, you are {role}.",
            &[("name", "Isabella"), ("role", "a cafe owner")],
        );
        assert_eq!(rendered, "Hello Isabella, you are a cafe owner.");
    }

    #[test]
    fn template_handles_missing_vars() {
        let rendered = render_template("Hello {name}, {unknown}.", &[("name", "Klaus")]);
        assert_eq!(rendered, "Hello Klaus, {unknown}.");
    }

    #[test]
    fn builtin_request_embeds_text_and_json_hint() {
        let req = PoignancyPrompts::builtin().request(PoignancyKind::Event, "Bob is having breakfast", 750);
        assert!(req.user.contains("Event: Bob is having breakfast"));
        assert!(req.user.contains(r#"{"poignancy""#));
        assert!(!req.user.contains("{text}"));
        assert!(req.json_mode);
        assert_eq!(req.timeout_ms, 750);

        let chat = PoignancyPrompts::builtin().request(PoignancyKind::Chat, "planning a party", 750);
        assert!(chat.system.contains("conversations"));
    }

    #[test]
    fn toml_overrides() {
        let prompts = PoignancyPrompts::from_toml(
            r#"
            [event]
            system = "rate events"
            user = "E: {text}"

            [chat]
            system = "rate chats"
            user = "C: {text}"
            "#,
        )
        .expect("valid");
        assert_eq!(prompts.request(PoignancyKind::Chat, "hi", 10).user, "C: hi");
    }

    #[test]
    fn toml_missing_section_is_config_error() {
        let result = PoignancyPrompts::from_toml("[event]\nsystem = \"s\"\nuser = \"u\"\n");
        assert!(matches!(result, Err(LlmError::ConfigError(_))));
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let result = PoignancyPrompts::from_file("/nonexistent/percept/prompts.toml");
        assert!(matches!(result, Err(LlmError::ConfigError(_))));
    }
}
