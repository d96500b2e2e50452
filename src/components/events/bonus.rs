use super::models::collapse_whitespace;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

const SPECIAL_BONUS_MARKER: &str = "special bonus is";

lazy_static! {
    /// Fallback patterns, tried in order on every paragraph
    static ref BONUS_PATTERNS: Vec<Regex> = [
        r"(?i)bonus is\s*(?:\*\*)?([^*\n]+)",
        r"(?i)bonus:\s*(?:\*\*)?([^*\n]+)",
        r"(?i)(\d+\s*[×x]\s*[^.\n]*?(?:candy|xp|stardust|dust))",
        r"(?i)double\s+([^.\n]*?(?:candy|xp|stardust|dust))",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("bonus pattern compiles"))
    .collect();
}

/// Strip markdown emphasis and sentence punctuation from a bonus phrase
fn clean_bonus(raw: &str) -> Option<String> {
    let without_markup = raw.replace("**", "");
    // Only the first sentence belongs to the bonus
    let first_sentence = without_markup
        .split(". ")
        .next()
        .unwrap_or(&without_markup);
    let cleaned = collapse_whitespace(first_sentence.trim().trim_end_matches('.'));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Find the spotlight bonus phrase in the detail page paragraphs.
///
/// The explicit "special bonus is" sentence wins over the looser patterns.
pub fn extract_bonus(paragraphs: &[String]) -> Option<String> {
    for text in paragraphs {
        let lower = text.to_lowercase();
        if let Some(pos) = lower.find(SPECIAL_BONUS_MARKER) {
            // Lowercasing can shift byte offsets for non-ASCII text
            let Some(rest) = text.get(pos + SPECIAL_BONUS_MARKER.len()..) else {
                continue;
            };
            if let Some(bonus) = clean_bonus(rest) {
                debug!("Found special bonus: {}", bonus);
                return Some(bonus);
            }
        }
    }

    for text in paragraphs {
        for pattern in BONUS_PATTERNS.iter() {
            if let Some(bonus) = pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| clean_bonus(m.as_str()))
            {
                debug!("Matched bonus with '{}': {}", pattern.as_str(), bonus);
                return Some(bonus);
            }
        }
    }

    None
}
