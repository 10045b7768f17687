//! Article citations and the cross-reference graph.
//!
//! Citation extraction is shared by ingestion (building `article_refs.json`)
//! and by the grounding validator (checking the articles an answer cites).

use crate::codes;
use crate::types::Chunk;
use legal_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

/// "статья 76", "ст. 4", "согласно статье 15", "Article 5", "§ 3", "76-бап"
static ARTICLE_CITATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?:стать\w*|стаття|ст\.|мақала\w*|article)|§)\s*(\d{1,4}(?:-\d{1,3})?[а-яa-z]?)\b|\b(\d{1,4}(?:-\d{1,3})?)\s?-\s?(?:бап|баб)\w*",
    )
    .ok()
});

/// ", 218", " и 54", " және 217" continuing a citation list
static LIST_CONTINUATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:,|и|или|and|және|мен|немесе)\s*(\d{1,4}(?:-\d{1,3})?)\b").ok()
});

/// Characters after a citation searched for a code name.
const CODE_LOOKAHEAD_CHARS: usize = 60;

/// One cited article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRef {
    pub label: String,
    /// Byte offset where the citation starts
    pub start: usize,
    /// Byte offset where the citation list it belongs to ends
    pub tail: usize,
}

/// Canonical form used when comparing article labels.
pub fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches('.').to_lowercase()
}

/// "188-190" is a range when the second part is larger; "25-1" is a label.
fn expand_label(label: &str) -> Vec<String> {
    let label = normalize_label(label);
    if let Some((first, second)) = label.split_once('-') {
        if let (Ok(a), Ok(b)) = (first.parse::<u32>(), second.parse::<u32>()) {
            if b > a {
                return vec![a.to_string(), b.to_string()];
            }
        }
    }
    vec![label]
}

/// Every article citation in `text`, in order of appearance.
pub fn extract_article_refs(text: &str) -> Vec<ArticleRef> {
    let (Some(citation), Some(continuation)) =
        (ARTICLE_CITATION.as_ref(), LIST_CONTINUATION.as_ref())
    else {
        return Vec::new();
    };

    let mut refs = Vec::new();
    for caps in citation.captures_iter(text) {
        let Some(label) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        let start = caps.get(0).map_or(label.start(), |m| m.start());
        let mut items = vec![(start, label.as_str())];

        // Only the article-word form introduces lists ("статьи 190, 218 и 219").
        let mut cursor = label.end();
        if caps.get(1).is_some() {
            while let Some(next) = continuation.captures(&text[cursor..]) {
                let Some(number) = next.get(1) else { break };
                items.push((cursor + number.start(), number.as_str()));
                cursor += number.end();
            }
        }

        for (item_start, raw) in items {
            refs.extend(expand_label(raw).into_iter().map(|label| ArticleRef {
                label,
                start: item_start,
                tail: cursor,
            }));
        }
    }
    refs
}

/// Distinct article labels cited in `text`.
pub fn cited_articles(text: &str) -> BTreeSet<String> {
    extract_article_refs(text)
        .into_iter()
        .map(|r| r.label)
        .collect()
}

/// Directed article-to-article citation edges across the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGraph {
    pub edges: BTreeMap<String, Vec<String>>,
}

impl ReferenceGraph {
    /// Collect citations from every chunk. Nodes are `<source>::<article>`;
    /// a citation naming another code points into that code.
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for chunk in chunks {
            let text = chunk.own_text();
            let node = node_id(&chunk.source_id, chunk.article_number.as_deref());

            let refs = extract_article_refs(text);
            for reference in &refs {
                // A code name after the citation list, before the next
                // citation or sentence end, says which code is meant.
                let stop = refs
                    .iter()
                    .map(|r| r.start)
                    .find(|s| *s >= reference.tail)
                    .unwrap_or(text.len());
                let lookahead: String = text[reference.tail..stop]
                    .chars()
                    .take_while(|c| !matches!(c, '.' | ';' | '\n'))
                    .take(CODE_LOOKAHEAD_CHARS)
                    .collect();
                let target_code =
                    codes::mentioned_code(&lookahead).unwrap_or(chunk.source_id.as_str());
                let target = node_id(target_code, Some(&reference.label));
                if target != node {
                    edges.entry(node.clone()).or_default().insert(target);
                }
            }
        }

        Self {
            edges: edges
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
        }
    }

    /// Articles cited by `node`.
    pub fn related(&self, node: &str) -> &[String] {
        self.edges.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(
            nodes = self.node_count(),
            edges = self.edge_count(),
            "Saved reference graph to {:?}",
            path
        );
        Ok(())
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Index(format!("Failed to read reference graph {:?}: {}", path, e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub fn node_id(source_id: &str, article: Option<&str>) -> String {
    match article {
        Some(article) => format!("{}::{}", source_id, normalize_label(article)),
        None => source_id.to_string(),
    }
}
