use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};


#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    En,
    Es,
    Ca,
}

impl Language {

    pub fn code(self) -> &'static str {
        self.into()
    }
}


/// Language identification collaborator.
///
/// Returns `None` when the text is not confidently in a supported language;
/// callers substitute their default language.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<Language>;
}


/// Lemmatization collaborator. Best effort; may return the input unchanged.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, text: &str, language: Language) -> String;
}


#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemmatize(&self, text: &str, _language: Language) -> String {
        text.to_string()
    }
}


struct LanguageProfile {
    stopwords: &'static [&'static str],
    suffixes: &'static [&'static str],
    markers: &'static [char],
}

lazy_static! {
    static ref PROFILES: HashMap<Language, LanguageProfile> = {
        let mut m = HashMap::new();
        m.insert(
            Language::En,
            LanguageProfile {
                stopwords: &["the", "of", "and", "for", "with", "to", "on", "an", "by", "from"],
                suffixes: &["tion", "tions", "ness", "ity", "ities", "ing", "ism", "ship"],
                markers: &[],
            },
        );
        m.insert(
            Language::Es,
            LanguageProfile {
                stopwords: &["los", "las", "y", "para", "con", "por", "sobre", "entre"],
                suffixes: &["ción", "ciones", "dad", "dades", "ismo", "miento", "mientos"],
                markers: &['á', 'ñ', '¿', '¡'],
            },
        );
        m.insert(
            Language::Ca,
            LanguageProfile {
                stopwords: &["els", "les", "i", "per", "amb", "dels", "sobre", "entre"],
                suffixes: &["ció", "cions", "tat", "tats", "isme", "ment", "ments"],
                markers: &['à', 'è', 'ò', 'ï', 'ç', '·'],
            },
        );
        m
    };
}


/// Stop-word, suffix and diacritic heuristic over the supported languages.
#[derive(Debug, Default, Clone, Copy)]
pub struct StopwordDetector;

impl StopwordDetector {
    fn score(profile: &LanguageProfile, text: &str) -> usize {
        text.split_whitespace()
            .map(|token| {
                let token = token.trim_matches(|c: char| !c.is_alphanumeric() && c != '·');
                let mut score = 0;
                if profile.stopwords.contains(&token) {
                    score += 1;
                }
                if profile.suffixes.iter().any(|suffix| token.ends_with(suffix)) {
                    score += 1;
                }
                if token.chars().any(|c| profile.markers.contains(&c)) {
                    score += 2;
                }
                score
            })
            .sum()
    }
}

impl LanguageDetector for StopwordDetector {
    fn detect(&self, text: &str) -> Option<Language> {
        let text = text.to_lowercase();
        let mut best: Option<(Language, usize)> = None;
        let mut tied = false;

        for (language, profile) in PROFILES.iter() {
            let score = Self::score(profile, &text);
            if score == 0 {
                continue;
            }
            match best {
                Some((_, top)) if score < top => {}
                Some((_, top)) if score == top => tied = true,
                _ => {
                    best = Some((*language, score));
                    tied = false;
                }
            }
        }

        if tied { None } else { best.map(|(language, _)| language) }
    }
}
