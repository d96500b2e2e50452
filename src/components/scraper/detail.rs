use super::{element_text, text_chunks};
use crate::components::events::DetailPage;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};

lazy_static! {
    static ref DESCRIPTION_SEL: Selector =
        Selector::parse(".event-description").expect("description selector parses");
    static ref PARAGRAPH_SEL: Selector = Selector::parse("p").expect("paragraph selector parses");
    static ref START_LABEL_RE: Regex =
        Regex::new(r"(?i)^(event\s+)?starts?\b").expect("start label pattern compiles");
    static ref END_LABEL_RE: Regex =
        Regex::new(r"(?i)^(event\s+)?ends?\b").expect("end label pattern compiles");
    static ref MONTH_DAY_RE: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}\b"
    )
    .expect("month pattern compiles");
    static ref CLOCK_RE: Regex =
        Regex::new(r"(?i)\b\d{1,2}:\d{2}\s*[ap]\.?\s?m").expect("clock pattern compiles");
}

/// How many chunks after a label are searched for its date
const LABEL_LOOKAHEAD: usize = 3;

/// Date text introduced by a label chunk such as "Start:" or "Ends".
///
/// The date may sit in the label chunk itself, in a following chunk, or be
/// split into a date chunk and a time chunk.
fn labelled_date(chunks: &[String], label: &Regex) -> Option<String> {
    for (i, chunk) in chunks.iter().enumerate() {
        if !label.is_match(chunk) {
            continue;
        }
        if MONTH_DAY_RE.is_match(chunk) {
            return Some(chunk.clone());
        }

        let following = chunks.iter().enumerate().skip(i + 1).take(LABEL_LOOKAHEAD);
        for (j, candidate) in following {
            if !MONTH_DAY_RE.is_match(candidate) {
                continue;
            }
            if CLOCK_RE.is_match(candidate) {
                return Some(candidate.clone());
            }
            // "Saturday, June 1, 2024, at" followed by "2:00 PM"
            return match chunks.get(j + 1).filter(|next| CLOCK_RE.is_match(next)) {
                Some(time) => Some(format!("{} {}", candidate, time)),
                None => Some(candidate.clone()),
            };
        }
    }
    None
}

/// Fields of an event's own page
pub fn parse_detail(html: &str) -> DetailPage {
    let document = Html::parse_document(html);
    let chunks = text_chunks(document.root_element());

    let description = document
        .select(&DESCRIPTION_SEL)
        .map(element_text)
        .find(|text| !text.is_empty());

    let paragraphs = document
        .select(&PARAGRAPH_SEL)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    DetailPage {
        start_text: labelled_date(&chunks, &START_LABEL_RE),
        end_text: labelled_date(&chunks, &END_LABEL_RE),
        description,
        paragraphs,
    }
}
