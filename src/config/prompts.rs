//! Prompt templates for tubeqa.
//!
//! Prompts can be customized by placing an `answer.toml` file in the custom prompts
//! directory. The grounding and refusal instructions are appended to any custom
//! template that leaves them out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Binds the model to the retrieved context.
pub const GROUNDING_INSTRUCTION: &str =
    "Answer ONLY from the provided context. Do not use outside knowledge.";

/// Tells the model how to respond when the context is insufficient.
pub const REFUSAL_INSTRUCTION: &str =
    "If the context does not have enough information, say \"I don't know.\"";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful assistant that answers questions about a single YouTube video.
You are given excerpts from the video's transcript. The transcript may be in a language other than {{answer_language}}."#
                .to_string(),

            user: r#"Answer the question in {{answer_language}} ONLY, regardless of the language of the context.
Answer ONLY from the provided context. Do not use outside knowledge.
If the context does not have enough information, say "I don't know."

Context:
{{context}}

Question: {{question}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one pass over the template, so substituted text is
    /// never expanded again. Unknown placeholders are kept as written.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key.trim()) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompt_carries_instructions() {
        let prompts = Prompts::default();
        assert!(prompts.answer.user.contains(GROUNDING_INSTRUCTION));
        assert!(prompts.answer.user.contains(REFUSAL_INSTRUCTION));
        assert!(prompts.answer.user.contains("{{context}}"));
        assert!(prompts.answer.user.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_text_is_not_expanded() {
        let template = "Context:\n{{context}}\n\nQuestion: {{question}} ({{unknown}})";
        let mut vars = HashMap::new();
        vars.insert(
            "context".to_string(),
            "the speaker said {{question}} and {{answer_language}}".to_string(),
        );
        vars.insert("question".to_string(), "Why?".to_string());
        vars.insert("answer_language".to_string(), "English".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(
            result,
            "Context:\nthe speaker said {{question}} and {{answer_language}}\n\nQuestion: Why? ({{unknown}})"
        );
    }

    #[test]
    fn test_unterminated_placeholder_is_kept() {
        let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
        assert_eq!(Prompts::render("Hi {{name}} {{oops", &vars), "Hi Alice {{oops");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("answer_language".to_string(), "Norwegian".to_string());

        let mut vars = HashMap::new();
        vars.insert("answer_language".to_string(), "English".to_string());

        assert_eq!(
            prompts.render_with_custom("in {{answer_language}}", &vars),
            "in English"
        );
    }

    #[test]
    fn test_load_custom_answer_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("answer.toml"),
            "system = \"Be brief.\"\nuser = \"{{context}} / {{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.answer.system, "Be brief.");
        assert_eq!(prompts.answer.user, "{{context}} / {{question}}");
    }
}
