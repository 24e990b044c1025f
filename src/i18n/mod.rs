//! Internationalization module
//!
//! Localized API messages for Indonesian (default) and English, with
//! `Accept-Language` detection and simple pluralization.

pub mod loader;

// Re-export commonly used i18n components
pub use loader::{format_message, I18n, LanguageStats, TranslationParams, TranslationStats};
