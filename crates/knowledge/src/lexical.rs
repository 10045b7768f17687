//! In-process BM25 index over the chunk corpus.

use crate::types::Chunk;
use crate::vector_index::ChunkFilter;
use std::cmp::Ordering;
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

const K1: f32 = 1.5;
const B: f32 = 0.75;

/// Characters kept from an alphabetic token; folds most inflected forms.
const STEM_CHARS: usize = 6;

/// BM25 ranking over an immutable chunk set.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<u32>,
    doc_freqs: HashMap<String, u32>,
    avg_len: f32,
}

impl LexicalIndex {
    pub fn build(chunks: Vec<Chunk>) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freqs: HashMap<String, u32> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            doc_lens.push(tokens.len() as u32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let total: u32 = doc_lens.iter().sum();
        let avg_len = if chunks.is_empty() {
            0.0
        } else {
            total as f32 / chunks.len() as f32
        };

        tracing::debug!(
            "Built lexical index: {} chunks, {} terms",
            chunks.len(),
            doc_freqs.len()
        );

        Self {
            chunks,
            term_freqs,
            doc_lens,
            doc_freqs,
            avg_len,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Top-k chunks by BM25 score. Chunks sharing no term with the query
    /// are not returned.
    pub fn search(&self, query: &str, top_k: usize, filter: &ChunkFilter) -> Vec<(Chunk, f32)> {
        let mut query_terms = tokenize(query);
        query_terms.sort();
        query_terms.dedup();

        let n = self.chunks.len() as f32;
        let mut scored: Vec<(usize, f32)> = Vec::new();

        for (i, chunk) in self.chunks.iter().enumerate() {
            if !filter.matches(chunk) {
                continue;
            }

            let tf = &self.term_freqs[i];
            let len_norm = if self.avg_len > 0.0 {
                self.doc_lens[i] as f32 / self.avg_len
            } else {
                0.0
            };

            let score: f32 = query_terms
                .iter()
                .filter_map(|term| {
                    let freq = *tf.get(term)? as f32;
                    let df = *self.doc_freqs.get(term)? as f32;
                    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                    Some(idf * freq * (K1 + 1.0) / (freq + K1 * (1.0 - B + B * len_norm)))
                })
                .sum();

            if score > 0.0 {
                scored.push((i, score));
            }
        }

        scored.sort_by(|a, b| {
            let (ca, cb) = (&self.chunks[a.0], &self.chunks[b.0]);
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| ca.source_id.cmp(&cb.source_id))
                .then_with(|| ca.position.cmp(&cb.position))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(i, score)| (self.chunks[i].clone(), score))
            .collect()
    }
}

/// Lowercased word tokens. Alphabetic words are cut to a short prefix;
/// numbers are kept whole so article labels stay exact.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .unicode_words()
        .filter_map(|word| {
            if word.chars().all(|c| c.is_ascii_digit()) {
                return Some(word.to_string());
            }
            if word.chars().count() < 2 {
                return None;
            }
            Some(word.chars().take(STEM_CHARS).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, position: u32, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source_id: source.to_string(),
            position,
            text: text.to_string(),
            code_ru: String::new(),
            code_kz: String::new(),
            article_number: None,
            clause: None,
            overlap_chars: 0,
        }
    }

    fn corpus() -> LexicalIndex {
        LexicalIndex::build(vec![
            chunk("fraud", "criminal_code", 0, "Статья 190. Мошенничество, то есть хищение чужого имущества путём обмана"),
            chunk("leave", "labor_code", 0, "Статья 88. Ежегодный оплачиваемый трудовой отпуск работника"),
            chunk("subsidy", "criminal_code", 1, "Статья 218. Мошенничество с субсидиями и бюджетными средствами"),
        ])
    }

    #[test]
    fn test_tokenize_stems_and_keeps_numbers() {
        let tokens = tokenize("Мошенничества статьи 190, и 25-1");
        assert_eq!(tokens, vec!["мошенн", "статьи", "190", "25", "1"]);
    }

    #[test]
    fn test_inflected_forms_match() {
        let results = corpus().search("мошенничестве", 5, &ChunkFilter::default());
        let ids: Vec<_> = results.iter().map(|(c, _)| c.id.as_str()).collect();

        assert_eq!(results.len(), 2);
        assert!(ids.contains(&"fraud") && ids.contains(&"subsidy"));
    }

    #[test]
    fn test_rare_term_ranks_first() {
        let results = corpus().search("мошенничество субсидии", 5, &ChunkFilter::default());
        assert_eq!(results[0].0.id, "subsidy");
    }

    #[test]
    fn test_no_overlap_returns_nothing() {
        assert!(corpus()
            .search("конституционный суд", 5, &ChunkFilter::default())
            .is_empty());
    }

    #[test]
    fn test_filter_and_determinism() {
        let index = corpus();
        let filter = ChunkFilter::criminal();

        let first = index.search("статья", 5, &filter);
        let second = index.search("статья", 5, &filter);

        assert_eq!(first, second);
        assert!(first.iter().all(|(c, _)| c.source_id == "criminal_code"));
    }

    #[test]
    fn test_empty_index() {
        let index = LexicalIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.search("статья", 3, &ChunkFilter::default()).is_empty());
    }
}
