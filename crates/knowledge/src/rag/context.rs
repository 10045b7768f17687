//! Final context assembly for the generator.

use crate::rag::language::Language;
use crate::rag::types::Candidate;
use crate::types::{Chunk, ContextConfig};

pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Cap the number of chunks and the length of each one.
    pub fn assemble(&self, candidates: Vec<Candidate>) -> Vec<Chunk> {
        candidates
            .into_iter()
            .take(self.config.max_chunks)
            .map(|candidate| {
                let mut chunk = candidate.chunk;
                if chunk.text.chars().count() > self.config.max_chunk_chars {
                    let mut cut: String =
                        chunk.text.chars().take(self.config.max_chunk_chars).collect();
                    cut.push_str(&self.config.truncation_marker);
                    chunk.text = cut;
                }
                chunk
            })
            .collect()
    }

    /// Numbered source blocks as they appear in the prompt.
    pub fn render(&self, chunks: &[Chunk], language: Language) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let code = match language {
                    Language::Ru => &chunk.code_ru,
                    Language::Kz => &chunk.code_kz,
                };
                let header = match (&chunk.article_number, language) {
                    (Some(article), Language::Ru) => {
                        format!("[Источник {}] {}, статья {}", i + 1, code, article)
                    }
                    (Some(article), Language::Kz) => {
                        format!("[Дереккөз {}] {}, {}-бап", i + 1, code, article)
                    }
                    (None, Language::Ru) => format!("[Источник {}] {}", i + 1, code),
                    (None, Language::Kz) => format!("[Дереккөз {}] {}", i + 1, code),
                };
                format!("{}\n{}", header, chunk.text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::types::Origin;

    fn candidate(position: u32, text: &str) -> Candidate {
        Candidate::new(
            Chunk {
                id: position.to_string(),
                source_id: "criminal_code".to_string(),
                position,
                text: text.to_string(),
                code_ru: "Уголовный кодекс РК".to_string(),
                code_kz: "ҚР Қылмыстық кодексі".to_string(),
                article_number: Some("190".to_string()),
                clause: None,
                overlap_chars: 0,
            },
            1.0,
            Origin::Both,
        )
    }

    fn assembler(max_chunks: usize, max_chunk_chars: usize) -> ContextAssembler {
        ContextAssembler::new(ContextConfig {
            max_chunks,
            max_chunk_chars,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn test_caps_count_and_length() {
        let chunks = assembler(2, 10).assemble(vec![
            candidate(0, "Мошенничество, то есть хищение"),
            candidate(1, "короткий"),
            candidate(2, "лишний"),
        ]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Мошенничес [...]");
        assert_eq!(chunks[1].text, "короткий");
    }

    #[test]
    fn test_empty_input() {
        assert!(assembler(8, 4000).assemble(Vec::new()).is_empty());
    }

    #[test]
    fn test_render_headers_per_language() {
        let asm = assembler(8, 4000);
        let chunks = asm.assemble(vec![candidate(0, "Текст статьи")]);

        assert_eq!(
            asm.render(&chunks, Language::Ru),
            "[Источник 1] Уголовный кодекс РК, статья 190\nТекст статьи"
        );
        assert!(asm
            .render(&chunks, Language::Kz)
            .starts_with("[Дереккөз 1] ҚР Қылмыстық кодексі, 190-бап"));
    }
}
