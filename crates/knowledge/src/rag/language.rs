//! Russian / Kazakh detection and the per-language canonical strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Letters that occur in Kazakh Cyrillic but not in Russian.
const KAZAKH_LETTERS: &[char] = &['ә', 'ғ', 'қ', 'ң', 'ө', 'ұ', 'ү', 'һ', 'і'];

const KAZAKH_MARKERS: &[&str] = &[
    "және", "мен", "бен", "пен", "туралы", "бойынша", "қандай", "үшін", "бұл", "немесе", "деп",
    "емес", "жоқ", "бар", "ма", "ме", "ба", "бе", "бап", "бабы", "кодексі", "кодексінің",
    "жауапкершілік", "қалай",
];

const RUSSIAN_MARKERS: &[&str] = &[
    "и", "в", "на", "что", "это", "как", "какие", "какая", "какой", "является", "статья", "статьи",
    "кодекса", "ли", "за", "по", "не", "или", "для", "если", "его",
];

/// Weight of Kazakh-letter density against marker-word counts.
const DENSITY_WEIGHT: f32 = 50.0;

pub const FALLBACK_RU: &str = "Информация не найдена в доступных текстах законов.";
pub const FALLBACK_KZ: &str = "Қолжетімді заң мәтіндерінде ақпарат табылмады.";

const DISCLAIMER_RU: &str = "Это не официальная юридическая консультация и не заменяет адвоката. \
Информация основана исключительно на текстах законов. \
Проверяйте актуальные редакции на adilet.zan.kz.";

const DISCLAIMER_KZ: &str = "Бұл ресми заңдық кеңес емес және адвокатты ауыстырмайды. \
Ақпарат тек заң мәтініне негізделген. \
Актуалды редакцияларды adilet.zan.kz сайтында тексеріңіз.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    Kz,
}

impl Language {
    /// Canonical "information not found" answer.
    pub fn fallback_text(self) -> &'static str {
        match self {
            Language::Ru => FALLBACK_RU,
            Language::Kz => FALLBACK_KZ,
        }
    }

    pub fn disclaimer(self) -> &'static str {
        match self {
            Language::Ru => DISCLAIMER_RU,
            Language::Kz => DISCLAIMER_KZ,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::Kz => "kz",
        }
    }

    /// Parse a user-supplied language code; anything unrecognised is `None`.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "ru" | "rus" | "russian" => Some(Language::Ru),
            "kz" | "kk" | "kaz" | "kazakh" => Some(Language::Kz),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the language of `text` from Kazakh-specific letters and marker
/// words. Text with no Cyrillic at all is treated as Russian.
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();

    let mut cyrillic = 0usize;
    let mut kazakh = 0usize;
    for c in lower.chars() {
        if KAZAKH_LETTERS.contains(&c) {
            kazakh += 1;
            cyrillic += 1;
        } else if ('а'..='я').contains(&c) || c == 'ё' {
            cyrillic += 1;
        }
    }

    if cyrillic == 0 {
        return Language::Ru;
    }

    let (mut kz_words, mut ru_words) = (0usize, 0usize);
    for word in lower.unicode_words() {
        if KAZAKH_MARKERS.contains(&word) {
            kz_words += 1;
        } else if RUSSIAN_MARKERS.contains(&word) {
            ru_words += 1;
        }
    }

    let density = kazakh as f32 / cyrillic as f32;
    let kz_score = kz_words as f32 + density * DENSITY_WEIGHT;

    if kz_score > ru_words as f32 {
        Language::Kz
    } else {
        Language::Ru
    }
}

/// Whether `text` is one of the canonical fallback strings.
pub fn is_fallback_text(text: &str) -> bool {
    let trimmed = text.trim().trim_matches('"');
    trimmed == FALLBACK_RU || trimmed == FALLBACK_KZ
}
