//! Built-in prompt definitions.
//!
//! Each template receives `question`, `context` and `fallback`. The range
//! template additionally receives `range_start` and `range_end`.

use crate::types::{PromptDefinition, PromptMode};
use legal_core::{AppError, AppResult};

const CRIMINAL_YAML: &str = r#"
id: legal.criminal
title: Уголовно-правовой вопрос
apiVersion: "1.0"
createdBy: legal-rag
mode: criminal
system: |
  Ты точный юридический ассистент по законам Республики Казахстан.
  Отвечай исключительно текстом из приведённого контекста.
template: |
  НИКОГДА НЕ ПРИДУМЫВАЙ номера статей, пункты, санкции или выводы, которых нет в контексте.
  Если в контексте нет ответа, ответь ровно одной строкой: "{{fallback}}"
  Отвечай на языке вопроса.
  Указывай точную статью Уголовного кодекса РК и санкцию из её текста.
  Если статья содержит квалифицирующие признаки, перечисли их дословно.

  Контекст:
  {{context}}

  Вопрос: {{question}}

  Ответ (цитируй статьи дословно, указывай номер статьи и источник):
"#;

const RANGE_YAML: &str = r#"
id: legal.range
title: Вопрос по диапазону статей
apiVersion: "1.0"
createdBy: legal-rag
mode: range
system: |
  Ты точный юридический ассистент по законам Республики Казахстан.
  Отвечай исключительно текстом из приведённого контекста.
template: |
  Вопрос касается статей с {{range_start}} по {{range_end}}.
  Используй только статьи из этого диапазона, которые есть в контексте, и называй каждую по номеру.
  Не упоминай статьи за пределами диапазона.
  Если в контексте нет ответа, ответь ровно одной строкой: "{{fallback}}"
  Отвечай на языке вопроса.

  Контекст:
  {{context}}

  Вопрос: {{question}}

  Ответ:
"#;

const UNIVERSAL_YAML: &str = r#"
id: legal.universal
title: Общий правовой вопрос
apiVersion: "1.0"
createdBy: legal-rag
mode: universal
system: |
  Ты точный юридический ассистент по законам Республики Казахстан.
  Отвечай исключительно текстом из приведённого контекста.
template: |
  НИКОГДА НЕ ПРИДУМЫВАЙ номера статей, названия, пункты, даты или выводы, которых нет в контексте.
  Если в контексте нет ответа, ответь ровно одной строкой: "{{fallback}}"
  Если вопрос на казахском, отвечай только на казахском.
  Если статья содержит список принципов, перечисляй все пункты дословно.

  Контекст:
  {{context}}

  Вопрос: {{question}}

  Ответ (цитируй статьи дословно, указывай номер статьи и источник):
"#;

/// Parse the built-in definition for `mode`.
pub fn builtin_prompt(mode: PromptMode) -> AppResult<PromptDefinition> {
    let yaml = match mode {
        PromptMode::Criminal => CRIMINAL_YAML,
        PromptMode::Range => RANGE_YAML,
        PromptMode::Universal => UNIVERSAL_YAML,
    };

    serde_yaml::from_str(yaml).map_err(|e| {
        AppError::Prompt(format!(
            "Built-in prompt {} is malformed: {}",
            mode.prompt_id(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_parse() {
        for mode in PromptMode::ALL {
            let def = builtin_prompt(mode).unwrap();
            assert_eq!(def.mode, mode);
            assert_eq!(def.id, mode.prompt_id());
            assert!(def.template.contains("{{question}}"));
            assert!(def.template.contains("{{context}}"));
            assert!(def.template.contains("{{fallback}}"));
        }
    }

    #[test]
    fn test_range_template_mentions_bounds() {
        let def = builtin_prompt(PromptMode::Range).unwrap();
        assert!(def.template.contains("{{range_start}}"));
        assert!(def.template.contains("{{range_end}}"));
    }
}
