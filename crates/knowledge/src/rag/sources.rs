//! Mapping of context chunks to user-facing source references.

use crate::rag::language::Language;
use crate::rag::types::SourceRef;
use crate::types::Chunk;
use std::collections::HashSet;

/// Characters of chunk text shown in a source preview.
pub const PREVIEW_CHARS: usize = 280;

/// One reference per (document, article), in context order.
pub fn map_chunks_to_sources(chunks: &[Chunk], language: Language) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let key = (chunk.source_id.clone(), chunk.article_number.clone());
        if !seen.insert(key) {
            continue;
        }

        let code_name = match language {
            Language::Ru => &chunk.code_ru,
            Language::Kz => &chunk.code_kz,
        };

        sources.push(SourceRef {
            document: chunk.source_id.clone(),
            code_name: code_name.clone(),
            article_number: chunk.article_number.clone(),
            preview: preview(chunk.own_text()),
        });
    }

    sources
}

/// First [`PREVIEW_CHARS`] characters with line breaks flattened.
pub fn preview(text: &str) -> String {
    text.trim()
        .chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(article: Option<&str>, clause: Option<u32>, text: &str) -> Chunk {
        Chunk {
            id: format!("{:?}-{:?}", article, clause),
            source_id: "criminal_code".to_string(),
            position: clause.unwrap_or(0),
            text: text.to_string(),
            code_ru: "Уголовный кодекс РК".to_string(),
            code_kz: "ҚР Қылмыстық кодексі".to_string(),
            article_number: article.map(str::to_string),
            clause,
            overlap_chars: 0,
        }
    }

    #[test]
    fn test_one_reference_per_article() {
        let sources = map_chunks_to_sources(
            &[
                chunk(Some("190"), Some(1), "1. Мошенничество"),
                chunk(Some("190"), Some(2), "2. То же деяние"),
                chunk(Some("217"), None, "Статья 217."),
            ],
            Language::Kz,
        );

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].code_name, "ҚР Қылмыстық кодексі");
        assert_eq!(sources[0].preview, "1. Мошенничество");
        assert_eq!(sources[1].article_number.as_deref(), Some("217"));
    }

    #[test]
    fn test_preview_flattens_and_caps() {
        let long = format!("Статья 1.\nТекст\r\n{}", "я".repeat(400));
        let shown = preview(&long);

        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.starts_with("Статья 1. Текст  я"));
        assert!(!shown.contains('\n'));
    }
}
