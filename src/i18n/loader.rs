//! Translation loader and i18n management
//!
//! Catalogs for the supported languages are embedded at build time from
//! `translations/*.json`. Keys are dotted paths into the nested JSON
//! (`errors.event_full`); plural entries are objects keyed by plural form.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::I18nConfig;
use crate::utils::errors::{OfficialIdError, Result};

const EMBEDDED_CATALOGS: &[(&str, &str)] = &[
    ("id", include_str!("../../translations/id.json")),
    ("en", include_str!("../../translations/en.json")),
];

/// Main internationalization manager
#[derive(Debug, Clone)]
pub struct I18n {
    /// Loaded translations by language code
    translations: HashMap<String, Map<String, Value>>,
    default_language: String,
    supported_languages: Vec<String>,
}

/// Translation parameters for message formatting
pub type TranslationParams = HashMap<String, String>;

impl I18n {
    pub fn new(config: &I18nConfig) -> Self {
        Self {
            translations: HashMap::new(),
            default_language: config.default_language.clone(),
            supported_languages: config.supported_languages.clone(),
        }
    }

    /// Build and load the embedded catalogs in one step
    pub fn with_embedded(config: &I18nConfig) -> Result<Self> {
        let mut i18n = Self::new(config);
        i18n.load_translations()?;
        Ok(i18n)
    }

    /// Load the embedded catalog of every supported language. A missing or
    /// broken default catalog is fatal; other languages are skipped.
    pub fn load_translations(&mut self) -> Result<()> {
        let supported_languages = self.supported_languages.clone();
        for lang_code in &supported_languages {
            let source = EMBEDDED_CATALOGS
                .iter()
                .find(|(code, _)| code == lang_code)
                .map(|(_, content)| *content);

            let outcome = match source {
                Some(content) => self.load_language_str(lang_code, content),
                None => Err(OfficialIdError::Config(format!("No catalog bundled for language: {lang_code}"))),
            };

            if let Err(e) = outcome {
                if lang_code == &self.default_language {
                    return Err(OfficialIdError::Config(format!(
                        "Failed to load default language translations: {e}"
                    )));
                }
                warn!("Skipping translations for {}: {}", lang_code, e);
            }
        }

        Ok(())
    }

    /// Load (or replace) one language from JSON text
    pub fn load_language_str(&mut self, lang_code: &str, content: &str) -> Result<()> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(map) => {
                debug!("Loaded {} translation keys for {}", count_keys(&map), lang_code);
                self.translations.insert(lang_code.to_string(), map);
                Ok(())
            }
            _ => Err(OfficialIdError::Config(format!("Invalid translation file format for {lang_code}"))),
        }
    }

    /// Get a translated message, falling back to the default language and
    /// finally to the key itself
    pub fn t(&self, key: &str, lang: &str, params: Option<&TranslationParams>) -> String {
        match self.lookup(key, lang) {
            Some(text) => format_message(&text, params),
            None => {
                warn!("Translation key '{}' not found", key);
                key.to_string()
            }
        }
    }

    /// Get a translated message with pluralization support
    pub fn tp(&self, key: &str, lang: &str, count: i64, params: Option<&TranslationParams>) -> String {
        let effective_lang = self.get_effective_language(lang);
        let plural_key = format!("{}.{}", key, plural_form(count, &effective_lang));

        let mut final_params = params.cloned().unwrap_or_default();
        final_params.insert("count".to_string(), count.to_string());

        match self.lookup(&plural_key, &effective_lang) {
            Some(text) => format_message(&text, Some(&final_params)),
            None => self.t(key, &effective_lang, Some(&final_params)),
        }
    }

    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.supported_languages.iter().any(|supported| supported == lang)
    }

    fn get_effective_language(&self, lang: &str) -> String {
        if self.is_language_supported(lang) && self.translations.contains_key(lang) {
            lang.to_string()
        } else {
            self.default_language.clone()
        }
    }

    fn lookup(&self, key: &str, lang: &str) -> Option<String> {
        let effective_lang = self.get_effective_language(lang);
        self.get_translation_value(key, &effective_lang)
            .or_else(|| self.get_translation_value(key, &self.default_language))
            .map(extract_text_from_value)
    }

    fn get_translation_value(&self, key: &str, lang: &str) -> Option<&Value> {
        let translations = self.translations.get(lang)?;

        let mut parts = key.split('.');
        let mut current = translations.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }

        Some(current)
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Pick the best supported language from an `Accept-Language` header.
    /// Entries are ranked by q-value; region subtags are ignored.
    pub fn detect_language(&self, accept_language: Option<&str>) -> String {
        let Some(header) = accept_language else {
            return self.default_language.clone();
        };

        let mut candidates: Vec<(String, f32)> = header
            .split(',')
            .filter_map(|entry| {
                let mut pieces = entry.trim().split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() {
                    return None;
                }

                let quality = pieces
                    .find_map(|piece| piece.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);

                let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
                Some((primary, quality))
            })
            .filter(|(_, quality)| *quality > 0.0)
            .collect();

        // Stable sort keeps header order among equal weights
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        candidates
            .into_iter()
            .map(|(lang, _)| lang)
            .find(|lang| self.is_language_supported(lang))
            .unwrap_or_else(|| self.default_language.clone())
    }

    pub fn get_stats(&self) -> TranslationStats {
        let mut stats = TranslationStats {
            languages: Vec::new(),
            total_keys: 0,
        };

        for (lang, translations) in &self.translations {
            let key_count = count_keys(translations);
            stats.languages.push(LanguageStats {
                code: lang.clone(),
                key_count,
            });
            if lang == &self.default_language {
                stats.total_keys = key_count;
            }
        }

        stats
    }
}

/// Plain strings are used as-is; plural objects default to "other"
fn extract_text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("other").or_else(|| obj.values().next()) {
            Some(inner) => extract_text_from_value(inner),
            None => String::new(),
        },
        _ => value.to_string(),
    }
}

/// Replace `{name}` placeholders
pub fn format_message(template: &str, params: Option<&TranslationParams>) -> String {
    match params {
        Some(params) => params.iter().fold(template.to_string(), |text, (key, value)| {
            text.replace(&format!("{{{key}}}"), value)
        }),
        None => template.to_string(),
    }
}

fn plural_form(count: i64, lang: &str) -> &'static str {
    match lang {
        // Indonesian has no grammatical plural
        "id" => "other",
        _ => {
            if count == 1 {
                "one"
            } else {
                "other"
            }
        }
    }
}

fn count_keys(obj: &Map<String, Value>) -> usize {
    obj.values()
        .map(|value| match value {
            Value::Object(nested) => count_keys(nested),
            _ => 1,
        })
        .sum()
}

/// Translation statistics
#[derive(Debug, Clone)]
pub struct TranslationStats {
    pub languages: Vec<LanguageStats>,
    pub total_keys: usize,
}

/// Language-specific statistics
#[derive(Debug, Clone)]
pub struct LanguageStats {
    pub code: String,
    pub key_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i18n() -> I18n {
        I18n::with_embedded(&I18nConfig {
            default_language: "id".to_string(),
            supported_languages: vec!["id".to_string(), "en".to_string()],
        })
        .unwrap()
    }

    #[test]
    fn test_catalogs_have_same_keys() {
        let stats = i18n().get_stats();
        assert_eq!(stats.languages.len(), 2);
        let id = stats.languages.iter().find(|l| l.code == "id").unwrap();
        assert_eq!(stats.total_keys, id.key_count);
        assert!(stats.total_keys > 30);
    }

    #[test]
    fn test_translate_with_params() {
        let i18n = i18n();
        let params = TranslationParams::from([("max".to_string(), "100".to_string())]);

        assert_eq!(i18n.t("validation.too_long", "id", Some(&params)), "Maksimal 100 karakter");
        assert_eq!(i18n.t("validation.too_long", "en", Some(&params)), "Must be at most 100 characters");
        assert_eq!(i18n.t("errors.event_full", "fr", None), "Kuota event sudah penuh");
        assert_eq!(i18n.t("errors.no_such_key", "en", None), "errors.no_such_key");
    }

    #[test]
    fn test_plural_messages() {
        let i18n = i18n();
        let params = TranslationParams::from([
            ("processed".to_string(), "1".to_string()),
            ("failed".to_string(), "0".to_string()),
        ]);

        assert_eq!(i18n.tp("messages.approved", "en", 1, Some(&params)), "1 registration approved, 0 failed");
        assert_eq!(i18n.tp("messages.approved", "id", 1, Some(&params)), "1 pendaftaran disetujui, 0 gagal");
    }

    #[test]
    fn test_language_detection() {
        let i18n = i18n();

        assert_eq!(i18n.detect_language(Some("en-US,en;q=0.9")), "en");
        assert_eq!(i18n.detect_language(Some("fr-FR, en;q=0.5, id;q=0.8")), "id");
        assert_eq!(i18n.detect_language(Some("en;q=0")), "id");
        assert_eq!(i18n.detect_language(Some("de")), "id");
        assert_eq!(i18n.detect_language(None), "id");
    }

    #[test]
    fn test_message_formatting() {
        let params = TranslationParams::from([("seconds".to_string(), "42".to_string())]);
        assert_eq!(format_message("retry in {seconds}s", Some(&params)), "retry in 42s");
    }
}
