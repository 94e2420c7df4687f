//! Language helpers.

use serde::{Deserialize, Serialize};

/// Primary language subtags written right-to-left.
const RTL_LANGUAGES: &[&str] = &["ar", "he", "fa", "ur"];

/// Expected text direction of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

impl TextDirection {
    /// Value of the HTML `dir` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextDirection::Ltr => "ltr",
            TextDirection::Rtl => "rtl",
        }
    }
}

impl std::fmt::Display for TextDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for right-to-left languages. Regional subtags (`ar-EG`) are accepted.
pub fn is_rtl(language: &str) -> bool {
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    RTL_LANGUAGES
        .iter()
        .any(|rtl| primary.eq_ignore_ascii_case(rtl))
}

pub fn expected_direction(language: &str) -> TextDirection {
    if is_rtl(language) {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}
