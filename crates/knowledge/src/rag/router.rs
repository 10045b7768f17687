//! Query routing: domain tags, explicit article ranges, search hints.
//!
//! All keyword knowledge lives in [`TAG_RULES`]. A rule matches when any of
//! its stems matches the query (see [`codes::stem_matches`]) and, if it
//! lists required stems, one of those matches too. A matched rule
//! contributes its hint phrases to the search-only query and its focus
//! articles to the context.

use crate::codes;
use crate::rag::language::detect_language;
use crate::rag::types::{DomainTag, QueryContext};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Widest explicit range the router accepts.
const MAX_RANGE_SPAN: u32 = 50;

struct TagRule {
    tag: DomainTag,
    keywords: &'static [&'static str],
    /// At least one of these must also match (empty = no extra condition)
    requires: &'static [&'static str],
    hints: &'static [&'static str],
    focus: &'static [u32],
}

const TAG_RULES: &[TagRule] = &[
    TagRule {
        tag: DomainTag::CriminalLaw,
        keywords: &[
            "уголовн",
            "ук",
            "ук рк",
            "преступлен",
            "наказани",
            "лишени свобод",
            "осужден",
            "виновн",
            "қылмыс",
            "жазалау",
            "бас бостандығ",
            "кінәлі",
        ],
        requires: &[],
        hints: &["Уголовный кодекс РК", "ҚР Қылмыстық кодексі"],
        focus: &[],
    },
    TagRule {
        tag: DomainTag::Fraud,
        keywords: &["мошеннич", "алаяқ"],
        requires: &[],
        hints: &["мошенничество", "статья 190"],
        focus: &[190],
    },
    TagRule {
        tag: DomainTag::SubsidyFraud,
        keywords: &["субсиди"],
        requires: &["мошеннич", "алаяқ", "хищен", "обман", "незаконн", "заңсыз", "жалған"],
        hints: &["мошенничество", "статья 190", "статья 218"],
        focus: &[190, 218],
    },
    TagRule {
        tag: DomainTag::IllegalBusiness,
        keywords: &[
            "незаконн предпринимат",
            "без лицензи",
            "без регистрац",
            "заңсыз кәсіпкерлік",
            "лицензиясыз",
            "тіркелмей",
        ],
        requires: &[],
        hints: &["незаконное предпринимательство", "статья 214"],
        focus: &[214],
    },
    TagRule {
        tag: DomainTag::PyramidScheme,
        keywords: &["пирамид"],
        requires: &[],
        hints: &["финансовая пирамида", "статья 217"],
        focus: &[217],
    },
    TagRule {
        tag: DomainTag::NeedsCircumstances,
        keywords: &["отягчающ", "смягчающ", "ауырлат", "жеңілдет"],
        requires: &[],
        hints: &[
            "обстоятельства, смягчающие уголовную ответственность",
            "обстоятельства, отягчающие уголовную ответственность",
            "статья 53",
            "статья 54",
        ],
        focus: &[53, 54],
    },
];

/// "статьи 190-218", "статьи с 5 по 10", "ст. 3 до 7"
static ARTICLE_WORD_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:стать\w*|ст\.|бап\w*|баб\w*)\s*(?:с\s+)?(\d{1,3})\s*(?:-|–|—|по|до)\s*(\d{1,3})\b",
    )
    .ok()
});

/// "с 5 по 10 статью"
static FROM_TO_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\s)с\s+(\d{1,3})\s+по\s+(\d{1,3})\s*(?:стат|ст\.)").ok()
});

/// "190-218 статьи", "5-10 баптар"
static NUMBERS_THEN_WORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*(?:-|–|—)\s*(\d{1,3})\s*(?:стат|бап|баб)").ok()
});

/// "5-баптан 10-бапқа дейін", "5-тен 10-ға дейін"
static KAZAKH_RANGE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3})\s*-?\s*\w*?(?:ден|тен|нен|дан|тан|нан)\s+(\d{1,3})\s*-?\s*\w*?\s*дейін")
        .ok()
});

/// Article numbers a tag points at.
pub fn tag_focus(tag: DomainTag) -> &'static [u32] {
    TAG_RULES
        .iter()
        .find(|r| r.tag == tag)
        .map(|r| r.focus)
        .unwrap_or(&[])
}

/// Classify `query` and build its search-only rewrite.
pub fn route(query: &str) -> QueryContext {
    let raw_text = query.trim().to_string();
    let lower = raw_text.to_lowercase();
    let words = codes::lower_words(&lower);

    let mut domain_tags = BTreeSet::new();
    let mut focus_articles = BTreeSet::new();
    let mut hints: Vec<String> = Vec::new();

    let matched: Vec<&TagRule> = TAG_RULES
        .iter()
        .filter(|rule| {
            let any = |stems: &[&str]| stems.iter().any(|k| codes::stem_matches(&words, k));
            any(rule.keywords) && (rule.requires.is_empty() || any(rule.requires))
        })
        .collect();

    for rule in &matched {
        domain_tags.insert(rule.tag);
        focus_articles.extend(rule.focus.iter().copied());
    }

    // Every sub-domain above is a criminal-code topic.
    if domain_tags.iter().any(|t| *t != DomainTag::CriminalLaw) {
        domain_tags.insert(DomainTag::CriminalLaw);
    } else if domain_tags.contains(&DomainTag::CriminalLaw) && names_other_code(&raw_text) {
        // "уголовно-процессуальный кодекс" is not a criminal-code question
        domain_tags.remove(&DomainTag::CriminalLaw);
    }

    for tag in &domain_tags {
        if let Some(rule) = TAG_RULES.iter().find(|r| r.tag == *tag) {
            hints.extend(rule.hints.iter().map(|h| h.to_string()));
        }
    }

    let article_range = detect_article_range(&raw_text);
    if let Some((start, end)) = article_range {
        if domain_tags.contains(&DomainTag::CriminalLaw) {
            hints.extend((start..=end).map(|n| format!("статья {}", n)));
        }
    }

    let search_query = build_search_query(&raw_text, hints);

    tracing::debug!(
        tags = ?domain_tags,
        range = ?article_range,
        focus = ?focus_articles,
        "Routed query"
    );

    QueryContext {
        language: detect_language(&raw_text),
        raw_text,
        domain_tags,
        article_range,
        focus_articles,
        search_query,
    }
}

/// Inclusive article range named explicitly in `text`.
///
/// Both bounds have at most three digits, the start is below the end, and
/// the span is at most fifty articles; anything else is treated as an
/// article label ("25-1") or noise.
pub fn detect_article_range(text: &str) -> Option<(u32, u32)> {
    [
        &ARTICLE_WORD_RANGE,
        &FROM_TO_RANGE,
        &NUMBERS_THEN_WORD,
        &KAZAKH_RANGE,
    ]
    .into_iter()
    .filter_map(|re| re.as_ref())
    .flat_map(|re| re.captures_iter(text))
    .filter_map(|caps| {
        let start: u32 = caps.get(1)?.as_str().parse().ok()?;
        let end: u32 = caps.get(2)?.as_str().parse().ok()?;
        (start < end && end - start <= MAX_RANGE_SPAN).then_some((start, end))
    })
    .next()
}

fn names_other_code(text: &str) -> bool {
    codes::mentioned_code(text).is_some_and(|id| id != codes::CRIMINAL_CODE_ID)
}

fn build_search_query(raw: &str, hints: Vec<String>) -> String {
    let lower = raw.to_lowercase();
    let mut seen = BTreeSet::new();
    let mut query = raw.to_string();

    for hint in hints {
        let key = hint.to_lowercase();
        if lower.contains(&key) || !seen.insert(key) {
            continue;
        }
        query.push(' ');
        query.push_str(&hint);
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::language::Language;

    #[test]
    fn test_criminal_article_question() {
        let ctx = route("Какое наказание предусмотрено статьей 136 УК РК?");
        assert!(ctx.is_criminal());
        assert_eq!(ctx.domain_tags.len(), 1);
        assert_eq!(ctx.language, Language::Ru);
        assert!(ctx.search_query.starts_with(&ctx.raw_text));
        assert!(ctx.search_query.contains("Уголовный кодекс РК"));
    }

    #[test]
    fn test_subsidy_fraud_implies_criminal_and_focus() {
        let ctx = route("Ответственность за мошенничество с субсидиями");
        assert!(ctx.has_tag(DomainTag::SubsidyFraud));
        assert!(ctx.is_criminal());
        assert_eq!(ctx.focus_articles, BTreeSet::from([190, 218]));
        assert!(ctx.search_query.contains("статья 218"));
    }

    #[test]
    fn test_plain_fraud_is_not_subsidy_fraud() {
        let ctx = route("Что грозит за телефонное мошенничество?");
        assert!(ctx.has_tag(DomainTag::Fraud));
        assert!(!ctx.has_tag(DomainTag::SubsidyFraud));
        assert!(ctx.is_criminal());
        assert_eq!(ctx.focus_articles, BTreeSet::from([190]));
    }

    #[test]
    fn test_subsidy_without_fraud_has_no_tag() {
        let ctx = route("Как получить субсидию на жилье?");
        assert!(!ctx.has_tag(DomainTag::SubsidyFraud));
        assert!(ctx.domain_tags.is_empty());

        let ctx = route("Незаконное получение субсидий");
        assert!(ctx.has_tag(DomainTag::SubsidyFraud));
        assert!(!ctx.has_tag(DomainTag::Fraud));
    }

    #[test]
    fn test_pyramid_and_circumstances() {
        let ctx = route("Какие смягчающие обстоятельства при организации финансовой пирамиды?");
        assert!(ctx.has_tag(DomainTag::PyramidScheme));
        assert!(ctx.has_tag(DomainTag::NeedsCircumstances));
        assert_eq!(ctx.focus_articles, BTreeSet::from([53, 54, 217]));
    }

    #[test]
    fn test_kazakh_keywords() {
        let ctx = route("Заңсыз кәсіпкерлік үшін қандай жаза бар?");
        assert!(ctx.has_tag(DomainTag::IllegalBusiness));
        assert_eq!(ctx.language, Language::Kz);
        assert!(ctx.focus_articles.contains(&214));
    }

    #[test]
    fn test_unrelated_query_has_no_tags() {
        let ctx = route("Сколько дней длится ежегодный трудовой отпуск?");
        assert!(ctx.domain_tags.is_empty());
        assert_eq!(ctx.search_query, ctx.raw_text);
        assert!(ctx.article_range.is_none());
    }

    #[test]
    fn test_short_stem_needs_whole_word() {
        // "укрепление" must not read as "УК"
        let ctx = route("Укрепление трудовой дисциплины");
        assert!(!ctx.is_criminal());
    }

    #[test]
    fn test_procedure_code_is_not_criminal() {
        let ctx = route("Сроки по Уголовно-процессуальному кодексу");
        assert!(!ctx.is_criminal());
    }

    #[test]
    fn test_range_forms() {
        assert_eq!(detect_article_range("статьи 190-195 УК"), Some((190, 195)));
        assert_eq!(detect_article_range("статьи с 5 по 10"), Some((5, 10)));
        assert_eq!(detect_article_range("с 5 по 10 статью"), Some((5, 10)));
        assert_eq!(detect_article_range("120–125 статьи"), Some((120, 125)));
        assert_eq!(detect_article_range("5-баптан 10-бапқа дейін"), Some((5, 10)));
    }

    #[test]
    fn test_range_rejections() {
        assert_eq!(detect_article_range("статья 25-1"), None);
        assert_eq!(detect_article_range("статьи 10-200"), None);
        assert_eq!(detect_article_range("в 2015-2020 годах"), None);
    }

    #[test]
    fn test_criminal_range_enumerates_articles() {
        let ctx = route("Что говорят статьи 188-190 УК РК?");
        assert_eq!(ctx.article_range, Some((188, 190)));
        for n in 188..=190 {
            assert!(ctx.search_query.contains(&format!("статья {}", n)));
        }
    }

    #[test]
    fn test_range_without_criminal_tag_adds_no_enumeration() {
        let ctx = route("статьи 10-12 Трудового кодекса");
        assert_eq!(ctx.article_range, Some((10, 12)));
        assert!(!ctx.search_query.contains("статья 11"));
    }
}
