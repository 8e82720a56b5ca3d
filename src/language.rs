use std::fmt;

use serde::{Deserialize, Serialize};

/// Output language for summaries and answers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Language {
    #[default]
    English,
    Hindi,
    Kannada,
    Tamil,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Kannada => "Kannada",
            Language::Tamil => "Tamil",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyword rules checked in order; the first keyword found in the message wins.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    rules: Vec<(String, Language)>,
    fallback: Language,
}

impl LanguageDetector {
    /// Keywords are lowercased once here and matched against the lowercased message.
    pub fn new(rules: impl IntoIterator<Item = (String, Language)>, fallback: Language) -> Self {
        Self {
            rules: rules.into_iter().map(|(kw, lang)| (kw.to_lowercase(), lang)).collect(),
            fallback,
        }
    }

    pub fn detect(&self, text: &str) -> Language {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|(kw, _)| lowered.contains(kw.as_str()))
            .map(|(_, lang)| *lang)
            .unwrap_or(self.fallback)
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(
            [
                ("hindi".to_string(), Language::Hindi),
                ("kannada".to_string(), Language::Kannada),
                ("tamil".to_string(), Language::Tamil),
            ],
            Language::English,
        )
    }
}
