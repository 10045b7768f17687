//! Prompt mode selection.

use crate::rag::router::route;
use crate::rag::types::QueryContext;
use crate::references::extract_article_refs;
use legal_prompt::PromptMode;

/// Choose the instruction template for `query`.
pub fn select_prompt_mode(query: &str) -> PromptMode {
    select_for_context(&route(query))
}

/// Mode for an already routed query.
///
/// Criminal keywords win, then an explicit range, then an explicit article
/// number.
pub fn select_for_context(ctx: &QueryContext) -> PromptMode {
    if ctx.is_criminal() {
        PromptMode::Criminal
    } else if ctx.article_range.is_some() {
        PromptMode::Range
    } else if !extract_article_refs(&ctx.raw_text).is_empty() {
        PromptMode::Criminal
    } else {
        PromptMode::Universal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criminal_keywords() {
        assert_eq!(
            select_prompt_mode("Какое наказание за кражу?"),
            PromptMode::Criminal
        );
        assert_eq!(
            select_prompt_mode("Қылмыс үшін жауапкершілік"),
            PromptMode::Criminal
        );
    }

    #[test]
    fn test_range_without_criminal_terms() {
        assert_eq!(
            select_prompt_mode("Что регулируют статьи 10-15 Трудового кодекса?"),
            PromptMode::Range
        );
    }

    #[test]
    fn test_criminal_range_stays_criminal() {
        assert_eq!(select_prompt_mode("статьи 188-190 УК РК"), PromptMode::Criminal);
    }

    #[test]
    fn test_explicit_article() {
        assert_eq!(
            select_prompt_mode("Что говорится в статье 88 Трудового кодекса?"),
            PromptMode::Criminal
        );
    }

    #[test]
    fn test_universal() {
        assert_eq!(
            select_prompt_mode("Как зарегистрировать брак?"),
            PromptMode::Universal
        );
    }

    #[test]
    fn test_pure_function() {
        let query = "Сколько длится отпуск по беременности?";
        assert_eq!(select_prompt_mode(query), select_prompt_mode(query));
    }
}
