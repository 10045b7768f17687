//! Prompt types for the legal RAG pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which instruction template the generator receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    /// Criminal-law questions or questions naming an explicit article.
    Criminal,
    /// Questions over an explicit article range.
    Range,
    /// Everything else.
    Universal,
}

impl PromptMode {
    pub const ALL: [PromptMode; 3] = [PromptMode::Criminal, PromptMode::Range, PromptMode::Universal];

    /// Prompt id used for the built-in template and workspace overrides.
    pub fn prompt_id(&self) -> &'static str {
        match self {
            PromptMode::Criminal => "legal.criminal",
            PromptMode::Range => "legal.range",
            PromptMode::Universal => "legal.universal",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Criminal => "criminal",
            PromptMode::Range => "range",
            PromptMode::Universal => "universal",
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Answer mode this template serves
    pub mode: PromptMode,

    /// Behavioral settings
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// Optional system message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Quote statute text verbatim instead of paraphrasing
    #[serde(rename = "quoteVerbatim", default = "default_true")]
    pub quote_verbatim: bool,

    /// Answer in the language of the question
    #[serde(rename = "mirrorLanguage", default = "default_true")]
    pub mirror_language: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            quote_verbatim: true,
            mirror_language: true,
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Mode the template was selected for
    pub mode: PromptMode,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        mode: PromptMode,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                mode,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: legal.custom
title: Custom
apiVersion: "1.0"
mode: range
template: "{{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "legal.custom");
        assert_eq!(def.mode, PromptMode::Range);
        assert!(def.behavior.quote_verbatim);
        assert!(def.system.is_none());
    }

    #[test]
    fn test_mode_ids() {
        assert_eq!(PromptMode::Criminal.prompt_id(), "legal.criminal");
        assert_eq!(PromptMode::Universal.to_string(), "universal");
        assert_eq!(
            serde_json::to_string(&PromptMode::Range).unwrap(),
            "\"range\""
        );
    }
}
