//! Statute segmentation into citable chunks.
//!
//! A document is cut at article headers ("Статья 136.", "136-бап.") into a
//! preamble span and one span per article. Articles are then size-tiered:
//! short ones stay whole, long ones are split on enumerated clauses ("1.",
//! "2.") with a tail of the previous clause copied into the head of the next.

use crate::codes;
use crate::types::{Chunk, SegmentationConfig};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static ARTICLE_HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:(?:Статья|Стаття|Article|Section)[ \t]*(\d+(?:-\d+)?[а-яa-z]?)|(\d+(?:-\d+)?)-бап)\.?[^\n]*$",
    )
    .ok()
});

static CLAUSE_START: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(\d+)\.[ \t]").ok());

static CHAPTER_HEADER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*(?:(?:Глава|Раздел|Тарау|Бөлім|Chapter|Part)[ \t]+\S+|\d+-(?:тарау|бөлім))",
    )
    .ok()
});

/// Intermediate span before the noise filter and id assignment.
#[derive(Debug)]
struct Piece {
    text: String,
    article: Option<String>,
    clause: Option<u32>,
    overlap_chars: usize,
}

impl Piece {
    fn own_len(&self) -> usize {
        self.text.chars().count().saturating_sub(self.overlap_chars)
    }
}

/// Splits raw statute text into an ordered chunk list.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Segment one document. `source_id` is the file stem and selects the
    /// code names from the registry.
    pub fn segment(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        let text = text.replace("\r\n", "\n");
        let headers = article_headers(&text);
        let mut pieces = Vec::new();

        match headers.first() {
            None => self.split_preamble(&text, &mut pieces),
            Some((first_start, _)) => {
                self.split_preamble(&text[..*first_start], &mut pieces);
                for (i, (start, label)) in headers.iter().enumerate() {
                    let end = headers.get(i + 1).map_or(text.len(), |(next, _)| *next);
                    self.split_article(text[*start..end].trim(), label, &mut pieces);
                }
            }
        }

        let (code_ru, code_kz) = codes::code_names(source_id);
        let min = self.config.min_chunk_chars;

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .filter(|p| p.own_len() >= min)
            .enumerate()
            .map(|(position, piece)| Chunk {
                id: chunk_id(source_id, position, &piece.text),
                source_id: source_id.to_string(),
                position: position as u32,
                text: piece.text,
                code_ru: code_ru.clone(),
                code_kz: code_kz.clone(),
                article_number: piece.article,
                clause: piece.clause,
                overlap_chars: piece.overlap_chars,
            })
            .collect();

        tracing::debug!(
            "Segmented '{}' into {} chunks ({} article headers)",
            source_id,
            chunks.len(),
            headers.len()
        );

        chunks
    }

    fn split_article(&self, body: &str, label: &str, out: &mut Vec<Piece>) {
        let cfg = &self.config;
        let len = body.chars().count();

        let split = if len <= cfg.whole_article_max {
            false
        } else if len <= cfg.medium_article_max {
            len > cfg.medium_split_threshold
        } else {
            true
        };

        if !split {
            out.push(Piece {
                text: body.to_string(),
                article: Some(label.to_string()),
                clause: None,
                overlap_chars: 0,
            });
            return;
        }

        let clause_starts: Vec<(usize, Option<u32>)> = match CLAUSE_START.as_ref() {
            Some(re) => re
                .captures_iter(body)
                .filter_map(|c| {
                    let m = c.get(0)?;
                    Some((m.start(), c.get(1).and_then(|n| n.as_str().parse().ok())))
                })
                .collect(),
            None => Vec::new(),
        };

        let mut parts: Vec<(String, Option<u32>)> = Vec::new();
        let mut lead = "";

        if clause_starts.len() < 2 {
            // No enumerated structure; fall back to fixed windows
            parts.extend(
                windows(body, cfg.whole_article_max)
                    .into_iter()
                    .map(|w| (w, None)),
            );
        } else {
            lead = body[..clause_starts[0].0].trim();

            for (i, (start, number)) in clause_starts.iter().enumerate() {
                let end = clause_starts.get(i + 1).map_or(body.len(), |(next, _)| *next);
                let clause = body[*start..end].trim();
                if clause.chars().count() > cfg.medium_article_max {
                    parts.extend(
                        windows(clause, cfg.whole_article_max)
                            .into_iter()
                            .map(|w| (w, *number)),
                    );
                } else {
                    parts.push((clause.to_string(), *number));
                }
            }
        }

        self.chain_overlap(parts, label, lead, out);
    }

    /// Prefix each part with the tail of the previous one. The article
    /// heading before the first clause rides along as the first part's
    /// prefix, so every part's own text starts at its clause number.
    fn chain_overlap(
        &self,
        parts: Vec<(String, Option<u32>)>,
        label: &str,
        lead: &str,
        out: &mut Vec<Piece>,
    ) {
        let mut previous: Option<String> = None;

        for (own, clause) in parts {
            let tail = match previous.as_deref() {
                Some(prev) => tail_chars(prev, self.config.overlap_chars),
                None => lead.to_string(),
            };

            let (text, overlap_chars) = if tail.is_empty() {
                (own.clone(), 0)
            } else {
                let overlap = tail.chars().count() + 1;
                (format!("{}\n{}", tail, own), overlap)
            };

            out.push(Piece {
                text,
                article: Some(label.to_string()),
                clause,
                overlap_chars,
            });
            previous = Some(own);
        }
    }

    fn split_preamble(&self, text: &str, out: &mut Vec<Piece>) {
        let cfg = &self.config;
        let text = text.trim();
        let len = text.chars().count();

        if len < cfg.min_chunk_chars {
            return;
        }
        if len <= cfg.preamble_max_chars {
            out.push(preamble_piece(text));
            return;
        }

        let mut bounds: Vec<usize> = match CHAPTER_HEADER.as_ref() {
            Some(re) => re.find_iter(text).map(|m| m.start()).collect(),
            None => Vec::new(),
        };
        if bounds.first() != Some(&0) {
            bounds.insert(0, 0);
        }

        for (i, start) in bounds.iter().enumerate() {
            let end = bounds.get(i + 1).copied().unwrap_or(text.len());
            let section = text[*start..end].trim();
            let section_len = section.chars().count();

            if section_len < cfg.min_chunk_chars {
                continue;
            }
            if section_len <= cfg.preamble_max_chars {
                out.push(preamble_piece(section));
            } else {
                out.extend(
                    windows(section, cfg.preamble_max_chars)
                        .iter()
                        .map(|w| preamble_piece(w)),
                );
            }
        }
    }
}

fn preamble_piece(text: &str) -> Piece {
    Piece {
        text: text.to_string(),
        article: None,
        clause: None,
        overlap_chars: 0,
    }
}

/// Byte offset and label of every article header, in document order.
fn article_headers(text: &str) -> Vec<(usize, String)> {
    let Some(re) = ARTICLE_HEADER.as_ref() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|c| {
            let start = c.get(0)?.start();
            let label = c.get(1).or_else(|| c.get(2))?;
            Some((start, label.as_str().to_lowercase()))
        })
        .collect()
}

/// Last `n` characters of `text`, or all of it when shorter.
fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

/// Cut text into pieces of at most `size` characters, preferring a
/// whitespace boundary in the second half of each window.
fn windows(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + size).min(chars.len());
        if end < chars.len() {
            let search_from = start + size / 2;
            if let Some(ws) = chars[search_from..end].iter().rposition(|c| c.is_whitespace()) {
                end = (search_from + ws).max(start + 1);
            }
        }

        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        start = end;
    }

    out
}

fn chunk_id(source_id: &str, position: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b":");
    hasher.update(position.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
