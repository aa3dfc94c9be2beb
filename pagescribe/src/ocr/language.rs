use std::fmt;
use std::str::FromStr;

/// (ISO 639-1, Tesseract traineddata) pairs accepted as language hints.
const KNOWN_LANGUAGES: &[(&str, &str)] = &[
    ("ko", "kor"),
    ("en", "eng"),
    ("ja", "jpn"),
    ("zh", "chi_sim"),
    ("fr", "fra"),
    ("de", "deu"),
    ("es", "spa"),
];

/// Upper bound on languages per request; each distinct set costs one engine.
pub const MAX_LANGUAGES: usize = 3;

/// Ordered, de-duplicated set of languages the OCR backend should expect.
///
/// Accepts `en`, `ko`, `ko+en`, `en,ko`, `both`, or Tesseract codes such as
/// `kor+eng`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageHint {
    languages: Vec<(&'static str, &'static str)>,
}

impl LanguageHint {
    pub fn korean_and_english() -> Self {
        Self {
            languages: vec![KNOWN_LANGUAGES[0], KNOWN_LANGUAGES[1]],
        }
    }

    /// Tesseract language string, e.g. `kor+eng`.
    pub fn tesseract_codes(&self) -> String {
        self.languages
            .iter()
            .map(|(_, tess)| *tess)
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Two-letter codes for cloud APIs, e.g. `["ko", "en"]`.
    pub fn iso_codes(&self) -> Vec<&'static str> {
        self.languages.iter().map(|(iso, _)| *iso).collect()
    }
}

impl Default for LanguageHint {
    fn default() -> Self {
        Self::korean_and_english()
    }
}

impl FromStr for LanguageHint {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized == "both" {
            return Ok(Self::korean_and_english());
        }

        let mut languages: Vec<(&'static str, &'static str)> = Vec::new();
        for token in normalized
            .split(|c: char| c == '+' || c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let entry = KNOWN_LANGUAGES
                .iter()
                .find(|(iso, tess)| *iso == token || *tess == token)
                .ok_or_else(|| format!("unsupported language '{token}'"))?;
            if !languages.contains(entry) {
                if languages.len() == MAX_LANGUAGES {
                    return Err(format!("at most {MAX_LANGUAGES} languages are supported"));
                }
                languages.push(*entry);
            }
        }

        if languages.is_empty() {
            return Err("language must not be empty".to_string());
        }

        Ok(Self { languages })
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso_codes().join("+"))
    }
}
