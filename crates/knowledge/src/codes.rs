//! Registry of the statutes the corpus is built from.
//!
//! Maps a source file stem to its code identifier and the Russian and Kazakh
//! code names. Also owns the criminal-code alias set used by the filter and
//! the validator.

/// One statute known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalCode {
    pub id: &'static str,
    pub name_ru: &'static str,
    pub name_kz: &'static str,
    /// Lowercase stems that name this code in free text ("ук", "еңбек")
    pub mentions: &'static [&'static str],
}

pub const CRIMINAL_CODE_ID: &str = "criminal_code";

const REGISTRY: &[LegalCode] = &[
    LegalCode {
        id: "constitution",
        name_ru: "Конституция РК",
        name_kz: "ҚР Конституциясы",
        mentions: &["конституц"],
    },
    LegalCode {
        id: "civil_code",
        name_ru: "Гражданский кодекс РК (Общая часть)",
        name_kz: "ҚР Азаматтық кодексі (Жалпы бөлім)",
        mentions: &["гк", "гражданск", "азаматтық"],
    },
    LegalCode {
        id: "civil_code2",
        name_ru: "Гражданский кодекс РК (Особенная часть)",
        name_kz: "ҚР Азаматтық кодексі (Ерекше бөлім)",
        mentions: &[],
    },
    LegalCode {
        id: "labor_code",
        name_ru: "Трудовой кодекс РК",
        name_kz: "ҚР Еңбек кодексі",
        mentions: &["тк", "трудов", "еңбек"],
    },
    LegalCode {
        id: "tax_code",
        name_ru: "Налоговый кодекс РК",
        name_kz: "ҚР Салық кодексі",
        mentions: &["нк", "налогов", "салық"],
    },
    LegalCode {
        id: "code_of_administrative_offenses",
        name_ru: "Кодекс РК об административных правонарушениях",
        name_kz: "ҚР Әкімшілік құқық бұзушылық туралы кодексі",
        mentions: &["коап", "административн правонаруш", "әкімшілік құқық"],
    },
    LegalCode {
        id: CRIMINAL_CODE_ID,
        name_ru: "Уголовный кодекс РК",
        name_kz: "ҚР Қылмыстық кодексі",
        mentions: &["ук", "уголовн", "қылмыстық"],
    },
    LegalCode {
        id: "code_on_marriage_and_family",
        name_ru: "Кодекс РК о браке (супружестве) и семье",
        name_kz: "ҚР Неке (ерлі-зайыптылық) және отбасы туралы кодексі",
        mentions: &["брак", "неке"],
    },
    LegalCode {
        id: "code_on_public_health",
        name_ru: "Кодекс РК о здоровье народа и системе здравоохранения",
        name_kz: "ҚР Халық денсаулығы және денсаулық сақтау жүйесі туралы кодексі",
        mentions: &["здоровье народа", "денсаулық"],
    },
    LegalCode {
        id: "entrepreneurial_code",
        name_ru: "Предпринимательский кодекс РК",
        name_kz: "ҚР Кәсіпкерлік кодексі",
        mentions: &["предпринимательск", "кәсіпкерлік"],
    },
    LegalCode {
        id: "code_on_administrative_procedures",
        name_ru: "Административный процедурно-процессуальный кодекс РК",
        name_kz: "ҚР Әкімшілік рәсімдік-процестік кодексі",
        mentions: &["аппк", "административн процедурн", "әкімшілік рәсім"],
    },
    LegalCode {
        id: "social_code",
        name_ru: "Социальный кодекс РК",
        name_kz: "ҚР Әлеуметтік кодексі",
        mentions: &["социальн", "әлеуметтік"],
    },
    LegalCode {
        id: "civil_procedure_code",
        name_ru: "Гражданский процессуальный кодекс РК",
        name_kz: "ҚР Азаматтық процестік кодексі",
        mentions: &["гпк", "гражданск процессуальн", "азаматтық процест"],
    },
    LegalCode {
        id: "criminal_procedure_code",
        name_ru: "Уголовно-процессуальный кодекс РК",
        name_kz: "ҚР Қылмыстық-процестік кодексі",
        mentions: &["упк", "уголовно процессуальн", "қылмыстық процест"],
    },
    LegalCode {
        id: "law_on_public_procurement",
        name_ru: "Закон РК «О государственных закупках»",
        name_kz: "ҚР «Мемлекеттік сатып алу туралы» Заңы",
        mentions: &["госзакуп", "государственных закуп", "сатып алу"],
    },
    LegalCode {
        id: "law_on_anticorruption",
        name_ru: "Закон РК «О противодействии коррупции»",
        name_kz: "ҚР «Сыбайлас жемқорлыққа қарсы іс-қимыл туралы» Заңы",
        mentions: &["коррупц", "жемқорлық"],
    },
    LegalCode {
        id: "law_on_enforcement",
        name_ru: "Закон РК «Об исполнительном производстве и статусе судебных исполнителей»",
        name_kz: "ҚР «Атқарушылық іс жүргізу және сот орындаушыларының мәртебесі туралы» Заңы",
        mentions: &["исполнительн производ", "атқарушылық"],
    },
    LegalCode {
        id: "law_on_personal_data",
        name_ru: "Закон РК «О персональных данных и их защите»",
        name_kz: "ҚР «Дербес деректер және оларды қорғау туралы» Заңы",
        mentions: &["персональн", "дербес дерек"],
    },
    LegalCode {
        id: "law_on_ai",
        name_ru: "Закон РК «Об искусственном интеллекте»",
        name_kz: "ҚР «Жасанды интеллект туралы» Заңы",
        mentions: &["искусственн интеллект", "жасанды интеллект"],
    },
];

/// Names that identify the criminal code in chunk metadata. The criminal
/// procedure code is deliberately absent.
const CRIMINAL_ALIASES: &[&str] = &[
    CRIMINAL_CODE_ID,
    "уголовный кодекс рк",
    "уголовный кодекс республики казахстан",
    "уголовный кодекс",
    "ук рк",
    "ук",
    "қр қылмыстық кодексі",
    "қылмыстық кодекс",
    "қылмыстық кодексі",
];

/// All registered codes in corpus order.
pub fn all() -> &'static [LegalCode] {
    REGISTRY
}

/// Look up a code by its identifier (the source file stem).
pub fn lookup(id: &str) -> Option<&'static LegalCode> {
    REGISTRY.iter().find(|c| c.id == id)
}

/// Russian and Kazakh names for a source; unknown stems name themselves.
pub fn code_names(source_id: &str) -> (String, String) {
    match lookup(source_id) {
        Some(code) => (code.name_ru.to_string(), code.name_kz.to_string()),
        None => (source_id.to_string(), source_id.to_string()),
    }
}

/// Whether any of the given identifiers names the criminal code.
pub fn is_criminal_alias(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    CRIMINAL_ALIASES.contains(&normalized.as_str())
}

/// Whether a chunk with this provenance belongs to the criminal code.
pub fn is_criminal_code(source_id: &str, code_ru: &str, code_kz: &str) -> bool {
    [source_id, code_ru, code_kz]
        .iter()
        .any(|v| is_criminal_alias(v))
}

/// Code identifier mentioned in free text, matched on word-initial stems.
/// The longest matching stem wins, so "уголовно-процессуальный" resolves to
/// the procedure code rather than the criminal code.
pub fn mentioned_code(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words = lower_words(&lower);

    REGISTRY
        .iter()
        .flat_map(|code| code.mentions.iter().map(move |stem| (code.id, *stem)))
        .filter(|(_, stem)| stem_matches(&words, stem))
        .max_by_key(|(_, stem)| stem.chars().count())
        .map(|(id, _)| id)
}

/// Split already-lowercased text into alphanumeric words.
pub(crate) fn lower_words(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Multi-word stems match consecutive words by prefix; short abbreviations
/// ("ук", "тк") must match a whole word.
pub(crate) fn stem_matches(words: &[&str], stem: &str) -> bool {
    let parts: Vec<&str> = stem.split(' ').collect();
    if parts.len() == 1 && stem.chars().count() <= 4 {
        return words.iter().any(|w| *w == stem);
    }
    words.windows(parts.len()).any(|window| {
        window
            .iter()
            .zip(&parts)
            .all(|(word, part)| word.starts_with(part))
    })
}
