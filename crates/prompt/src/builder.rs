//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use legal_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use legal_prompt::{build_prompt, builtin_prompt, PromptMode};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt(PromptMode::Universal)?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "Что такое трудовой договор?".to_string());
/// vars.insert("context".to_string(), "[Источник 1] ...".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(prompt = %definition.id, mode = %definition.mode, "Building prompt");

    let user = render_template(&definition.template, &variables)?;
    let system = match definition.system {
        Some(ref system) => Some(render_template(system, &variables)?),
        None => None,
    };

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        definition.mode,
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Statute text must reach the model byte-for-byte
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::builtin_prompt;
    use crate::types::PromptMode;

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Статья 136?".to_string());

        let result = render_template("Вопрос: {{question}}", &vars).unwrap();
        assert_eq!(result, "Вопрос: Статья 136?");
    }

    #[test]
    fn test_no_html_escaping() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "\"кавычки\" & <угол>".to_string());

        let result = render_template("{{context}}", &vars).unwrap();
        assert_eq!(result, "\"кавычки\" & <угол>");
    }

    #[test]
    fn test_build_builtin_prompt() {
        let def = builtin_prompt(PromptMode::Range).unwrap();
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Статьи 10-12".to_string());
        vars.insert("context".to_string(), "[Источник 1] Статья 10.".to_string());
        vars.insert("fallback".to_string(), "Нет данных".to_string());
        vars.insert("range_start".to_string(), "10".to_string());
        vars.insert("range_end".to_string(), "12".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert!(built.user.contains("с 10 по 12"));
        assert!(built.user.contains("\"Нет данных\""));
        assert!(built.system.is_some());
        assert_eq!(built.metadata.mode, PromptMode::Range);
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        // Handlebars renders missing variables as empty string
        assert!(render_template("Вопрос: {{missing}}", &vars).is_ok());
    }
}
