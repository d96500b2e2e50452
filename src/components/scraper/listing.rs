use super::{element_text, text_chunks};
use crate::components::events::RawEvent;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

lazy_static! {
    static ref LINK_SEL: Selector =
        Selector::parse(r#"a[href*="/events/"]"#).expect("link selector parses");
    static ref HEADING_SEL: Selector = Selector::parse("h2, h3, h4").expect("heading selector parses");
    static ref BOLD_SEL: Selector = Selector::parse("b, strong").expect("bold selector parses");
    static ref IMG_SEL: Selector = Selector::parse("img[src]").expect("image selector parses");
    static ref WRAPPER_SEL: Selector =
        Selector::parse(".event-item-wrapper").expect("wrapper selector parses");
    static ref LABEL_SEL: Selector =
        Selector::parse(".event-item-wrapper p, .event-tag").expect("label selector parses");
    /// "Sat, Jun 1" at the start of a card's date line
    static ref DATE_LINE_RE: Regex = Regex::new(
        r"(?i)\b(mon|tue|wed|thu|fri|sat|sun)[a-z]*,\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)"
    )
    .expect("date line pattern compiles");
}

fn first_text(link: ElementRef<'_>, selector: &Selector) -> Option<String> {
    link.select(selector)
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn card_title(link: ElementRef<'_>, chunks: &[String]) -> Option<String> {
    first_text(link, &HEADING_SEL)
        .or_else(|| first_text(link, &BOLD_SEL))
        .or_else(|| {
            link.select(&IMG_SEL)
                .filter_map(|img| img.value().attr("alt"))
                .map(str::trim)
                .find(|alt| !alt.is_empty())
                .map(|alt| alt.to_string())
        })
        .or_else(|| chunks.first().cloned())
}

/// Class names and category labels around a card
fn type_hint(link: ElementRef<'_>) -> Option<String> {
    let mut parts: Vec<String> = link.value().classes().map(|c| c.to_string()).collect();

    if let Some(parent) = link.parent().and_then(ElementRef::wrap) {
        parts.extend(parent.value().classes().map(|c| c.to_string()));
    }
    for wrapper in link.select(&WRAPPER_SEL) {
        parts.extend(wrapper.value().classes().map(|c| c.to_string()));
    }
    parts.extend(
        link.select(&LABEL_SEL)
            .map(element_text)
            .filter(|label| !label.is_empty()),
    );

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Event cards on the listing page, one per distinct event URL
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<RawEvent> {
    let document = Html::parse_document(html);
    let listing_path = base_url.path().trim_end_matches('/').to_string();
    let mut seen = HashSet::new();
    let mut raws = Vec::new();

    for link in document.select(&LINK_SEL) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let mut url = match base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping unparsable link '{}': {}", href, e);
                continue;
            }
        };
        url.set_fragment(None);

        // Links back to the listing itself
        if url.path().trim_end_matches('/') == listing_path {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }

        let chunks = text_chunks(link);
        let image_url = link
            .select(&IMG_SEL)
            .filter_map(|img| img.value().attr("src"))
            .find_map(|src| base_url.join(src).ok())
            .map(|src| src.to_string());

        raws.push(RawEvent {
            title: card_title(link, &chunks),
            url: Some(url.to_string()),
            date_text: chunks.iter().find(|c| DATE_LINE_RE.is_match(c)).cloned(),
            type_hint: type_hint(link),
            image_url,
            detail: None,
        });
    }

    raws
}
