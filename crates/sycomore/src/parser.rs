use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::dates::tidy;
use crate::types::{ListingEntry, MandateBlock, RawPeriod};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Unexpected page structure: {0}")]
    Markup(String),
}

static SEL_LISTING_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div#corps_tableau table").expect("invalid selector: listing table")
});
static SEL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: row"));
static SEL_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: cell"));
static SEL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector: link"));
static SEL_MANDATE_ITEMS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#assemblee h2, #assemblee h3, #assemblee h4, #assemblee p")
        .expect("invalid selector: mandate items")
});
static SEL_BOLD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("b").expect("invalid selector: bold"));
static SEL_PROFILE_PICTURE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("img.deputy-profile-picture").expect("invalid selector: profile picture")
});

static RE_CLOSED_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^du\s+(.+?)\s+au\s+(.+?)(?:\s*\(.*\))?$").expect("invalid regex: closed period")
});
static RE_ONGOING_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^depuis\s+le\s+(.+?)(?:\s*\(.*\))?$").expect("invalid regex: ongoing period")
});
static RE_LEADING_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:\s*").expect("invalid regex: leading colon"));
static RE_REELECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)r[ée]-?[ée]lue?.*$").expect("invalid regex: reelected"));
static RE_TRAILING_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*$").expect("invalid regex: trailing separator"));
static RE_CEREMONIAL_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:pr[ée]sidence|bureau)\b").expect("invalid regex: ceremonial heading")
});

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn resolve_url(base: &Url, href: &str) -> Result<String, ParseError> {
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| ParseError::UrlParse(format!("{href}: {e}")))
}

pub fn parse_term_listing(html: &str, listing_url: &str) -> Result<Vec<ListingEntry>, ParseError> {
    let document = Html::parse_document(html);
    let base = Url::parse(listing_url).map_err(|e| ParseError::UrlParse(format!("{listing_url}: {e}")))?;

    let table = document
        .select(&SEL_LISTING_TABLE)
        .next()
        .ok_or_else(|| ParseError::Markup("listing table (div#corps_tableau table)".to_string()))?;

    let mut entries = Vec::new();
    for row in table.select(&SEL_ROW) {
        let cells: Vec<ElementRef> = row.select(&SEL_CELL).collect();
        let Some(first) = cells.first() else {
            continue;
        };

        let name = tidy(&elem_text(*first));
        let Some(href) = first
            .select(&SEL_LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            log::warn!("Skipping listing row without a link: '{}'", name);
            continue;
        };

        let url = match resolve_url(&base, href) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Skipping listing row '{}': {}", name, e);
                continue;
            }
        };

        let cell_text = |i: usize| cells.get(i).map(|c| tidy(&elem_text(*c))).unwrap_or_default();

        entries.push(ListingEntry {
            url,
            name,
            birth_text: cell_text(1),
            death_text: cell_text(2),
        });
    }

    Ok(entries)
}

pub fn person_id_from_url(url: &str) -> Result<String, ParseError> {
    let parsed = Url::parse(url).map_err(|e| ParseError::UrlParse(format!("{url}: {e}")))?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "num_dept")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()))
        .ok_or_else(|| ParseError::MissingField(format!("num_dept in {url}")))
}

pub fn profile_image(document: &Html, page_url: &str) -> Option<String> {
    let src = document
        .select(&SEL_PROFILE_PICTURE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.trim().is_empty())?;

    let base = Url::parse(page_url).ok()?;
    resolve_url(&base, src)
        .inspect_err(|e| log::warn!("Ignoring profile picture: {}", e))
        .ok()
}

/// Paragraphs under a heading starting with "Présidence" or "Bureau" are not
/// mandates and are skipped. Paragraphs whose bold date range matches neither
/// `Du X au Y` nor `Depuis le X` are logged and skipped.
pub fn mandate_blocks(document: &Html) -> impl Iterator<Item = MandateBlock> + '_ {
    document
        .select(&SEL_MANDATE_ITEMS)
        .scan(false, |ceremonial, element| {
            if matches!(element.value().name(), "h2" | "h3" | "h4") {
                *ceremonial = RE_CEREMONIAL_HEADING.is_match(&tidy(&elem_text(element)));
                return Some(None);
            }
            if *ceremonial {
                if let Some(bold) = element.select(&SEL_BOLD).next()
                    && parse_period(&elem_text(bold)).is_some()
                {
                    log::debug!(
                        "Ceremonial section entry with a date range skipped: '{}'",
                        tidy(&elem_text(element))
                    );
                }
                return Some(None);
            }
            Some(parse_mandate_block(element))
        })
        .flatten()
}

fn parse_mandate_block(element: ElementRef) -> Option<MandateBlock> {
    let full_text = elem_text(element);
    if tidy(&full_text).is_empty() {
        return None;
    }

    let Some(bold) = element.select(&SEL_BOLD).next() else {
        log::warn!("Skipping mandate without a date range: '{}'", tidy(&full_text));
        return None;
    };

    let bold_text = elem_text(bold);
    let period_text = tidy(&bold_text);
    let Some(period) = parse_period(&period_text) else {
        log::warn!("Skipping mandate with unrecognized date range: '{}'", period_text);
        return None;
    };

    let rest = tidy(&full_text.replacen(&bold_text, "", 1));
    let rest = RE_LEADING_COLON.replace(&rest, "");
    let (area, raw_group) = match rest.split_once(" - ") {
        Some((area, group)) => (tidy(area), tidy(group)),
        None => (tidy(&rest), String::new()),
    };

    let (group, reelection_note) = clean_group(&raw_group);
    if let Some(note) = &reelection_note {
        log::debug!("Re-election noted for group '{}': {}", group, note);
    }

    Some(MandateBlock {
        period_text,
        period,
        area,
        group,
        reelection_note,
    })
}

pub fn parse_period(text: &str) -> Option<RawPeriod> {
    let text = tidy(text);
    if let Some(caps) = RE_CLOSED_PERIOD.captures(&text) {
        return Some(RawPeriod::Closed {
            start: caps[1].to_string(),
            end: caps[2].to_string(),
        });
    }
    RE_ONGOING_PERIOD
        .captures(&text)
        .map(|caps| RawPeriod::Ongoing {
            start: caps[1].to_string(),
        })
}

// (clean group, raw annotated text when a re-election note was present)
pub fn clean_group(raw: &str) -> (String, Option<String>) {
    if !RE_REELECTED.is_match(raw) {
        return (tidy(raw), None);
    }
    let stripped = RE_REELECTED.replace(raw, "");
    let stripped = RE_TRAILING_SEPARATOR.replace(&stripped, "");
    (tidy(&stripped), Some(raw.to_string()))
}
