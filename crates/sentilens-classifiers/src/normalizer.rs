//! Deterministic text cleaning applied ahead of (or independently of) classification
//!
//! Steps run in a fixed order; reordering them changes the output:
//! 1. lowercase
//! 2. strip `<...>` markup tags
//! 3. strip `http://`, `https://` and `www.` tokens up to the next whitespace
//! 4. strip emoji and pictographic symbols
//! 5. drop every character outside the allow-list (Cyrillic and ASCII letters,
//!    digits, whitespace, `. , ! ? -`)
//! 6. collapse repeats of the same `. , ! ?` mark into one
//! 7. collapse whitespace runs into a single space and trim
//! 8. return "" when fewer than 3 characters remain

use regex::Regex;
use sentilens_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Results shorter than this are treated as noise
pub const MIN_TEXT_CHARS: usize = 3;

const REPEATABLE_PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// Counters produced by [`TextNormalizer::normalize_batch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Texts processed
    pub processed: usize,

    /// Texts that normalized to the empty string
    pub empty: usize,
}

/// Regex-backed text normalizer
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    tag_regex: Regex,
    url_regex: Regex,
    emoji_regex: Regex,
    disallowed_regex: Regex,
    whitespace_regex: Regex,
}

impl TextNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            tag_regex: Regex::new(r"<[^>]+>")
                .map_err(|e| Error::internal(format!("Failed to compile tag regex: {}", e)))?,
            url_regex: Regex::new(r"https?://\S+|www\.\S+")
                .map_err(|e| Error::internal(format!("Failed to compile URL regex: {}", e)))?,
            emoji_regex: Regex::new(concat!(
                "[",
                r"\x{1F600}-\x{1F64F}", // emoticons
                r"\x{1F300}-\x{1F5FF}", // symbols & pictographs
                r"\x{1F680}-\x{1F6FF}", // transport & map symbols
                r"\x{1F1E0}-\x{1F1FF}", // flags
                r"\x{2702}-\x{27B0}",   // dingbats
                r"\x{24C2}-\x{1F251}",  // enclosed characters and supplemental symbols
                "]+",
            ))
            .map_err(|e| Error::internal(format!("Failed to compile emoji regex: {}", e)))?,
            disallowed_regex: Regex::new(r"[^а-яёa-z0-9\s.,!?\-]")
                .map_err(|e| Error::internal(format!("Failed to compile allow-list regex: {}", e)))?,
            whitespace_regex: Regex::new(r"\s+")
                .map_err(|e| Error::internal(format!("Failed to compile whitespace regex: {}", e)))?,
        })
    }

    /// Normalize a text
    pub fn normalize(&self, text: &str) -> String {
        let mut cleaned = self.clean(text);

        // Step 5 can assemble a fresh `www.` token out of characters it drops
        // (`www#.site`), so strip again until the output is a fixed point.
        while !cleaned.is_empty() && self.url_regex.is_match(&cleaned) {
            cleaned = self.clean(&cleaned);
        }

        cleaned
    }

    /// Normalize an optional text; a missing value normalizes to ""
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }

    /// Normalize many texts, counting how many end up empty
    pub fn normalize_batch<S: AsRef<str>>(&self, texts: &[S]) -> (Vec<String>, NormalizationReport) {
        let cleaned: Vec<String> = texts.iter().map(|t| self.normalize(t.as_ref())).collect();
        let report = NormalizationReport {
            processed: cleaned.len(),
            empty: cleaned.iter().filter(|t| t.is_empty()).count(),
        };
        (cleaned, report)
    }

    fn clean(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = self.tag_regex.replace_all(&text, "");
        let text = self.url_regex.replace_all(&text, "");
        let text = self.emoji_regex.replace_all(&text, "");
        let text = self.disallowed_regex.replace_all(&text, "");
        let text = collapse_repeated_punctuation(&text);
        let text = self.whitespace_regex.replace_all(&text, " ");
        let text = text.trim();

        if text.chars().count() < MIN_TEXT_CHARS {
            return String::new();
        }

        text.to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new().expect("Failed to create text normalizer")
    }
}

/// `!!!` -> `!`, `!!!???` -> `!?`; mixed marks are kept, only repeats collapse
fn collapse_repeated_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;

    for ch in text.chars() {
        if previous == Some(ch) && REPEATABLE_PUNCTUATION.contains(&ch) {
            continue;
        }
        out.push(ch);
        previous = Some(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().unwrap()
    }

    #[test]
    fn test_lowercases_cyrillic() {
        assert_eq!(normalizer().normalize("ПРИВЕТ МИР"), "привет мир");
        assert_eq!(normalizer().normalize("ЁЛКА Ёж"), "ёлка ёж");
    }

    #[test]
    fn test_strips_markup() {
        assert_eq!(normalizer().normalize("<b>Жирный</b>"), "жирный");
        assert_eq!(
            normalizer().normalize("<a href=\"x\">ссылка</a> тут"),
            "ссылка тут"
        );
    }

    #[test]
    fn test_strips_urls() {
        let n = normalizer();
        assert_eq!(n.normalize("Сайт https://example.com тут"), "сайт тут");
        assert_eq!(n.normalize("см. www.example.ru/page?x=1 ок"), "см. ок");
        assert_eq!(n.normalize("http://a.b/c"), "");
    }

    #[test]
    fn test_strips_emoji() {
        assert_eq!(normalizer().normalize("Супер 😀👍🚀 день"), "супер день");
        assert_eq!(normalizer().normalize("флаг 🇷🇺 ок"), "флаг ок");
    }

    #[test]
    fn test_allow_list() {
        let n = normalizer();
        assert_eq!(n.normalize("цена: 100$ (скидка) #акция"), "цена 100 скидка акция");
        assert_eq!(n.normalize("café"), "caf");
        assert_eq!(n.normalize("5-й этаж, 2024 год"), "5-й этаж, 2024 год");
    }

    #[test]
    fn test_collapses_repeated_punctuation() {
        let n = normalizer();
        assert_eq!(n.normalize("Отлично!!!"), "отлично!");
        assert_eq!(n.normalize("Что!!!???"), "что!?");
        assert_eq!(n.normalize("ну,,, да..."), "ну, да.");
        assert_eq!(n.normalize("тире --- тире"), "тире --- тире");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            normalizer().normalize("  много \t\n  пробелов  "),
            "много пробелов"
        );
    }

    #[test]
    fn test_short_results_are_empty() {
        let n = normalizer();
        assert_eq!(n.normalize("ок"), "");
        assert_eq!(n.normalize("!!!"), "");
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("😀😀😀😀"), "");
        assert_eq!(n.normalize("да!"), "да!");
    }

    #[test]
    fn test_missing_text_is_empty() {
        assert_eq!(normalizer().normalize_opt(None), "");
        assert_eq!(normalizer().normalize_opt(Some("ПРИВЕТ")), "привет");
    }

    #[test]
    fn test_assembled_www_token_is_stripped() {
        let n = normalizer();
        let once = n.normalize("зайди на www#.site.ru сегодня");
        assert_eq!(once, "зайди на сегодня");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn test_normalize_batch_report() {
        let (texts, report) = normalizer().normalize_batch(&["Хорошо!!", "ок", "", "<i>Плохо</i>"]);
        assert_eq!(texts, vec!["хорошо!", "", "", "плохо"]);
        assert_eq!(
            report,
            NormalizationReport {
                processed: 4,
                empty: 2
            }
        );
    }

    #[test]
    fn test_collapse_helper() {
        assert_eq!(collapse_repeated_punctuation("a!!b??c..d,,"), "a!b?c.d,");
        assert_eq!(collapse_repeated_punctuation("!?!?"), "!?!?");
    }
}
