use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum DateParseError {
    #[error("Unknown month '{month}' in date: {text}")]
    UnknownMonth { month: String, text: String },
    #[error("Unrecognized date: {0}")]
    Malformed(String),
    #[error("Invalid calendar date: {0}")]
    OutOfRange(String),
}

impl DateParseError {
    pub fn text(&self) -> &str {
        match self {
            DateParseError::UnknownMonth { text, .. }
            | DateParseError::Malformed(text)
            | DateParseError::OutOfRange(text) => text,
        }
    }
}

const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

static RE_NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("invalid regex: numeric date")
});
static RE_TEXTUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:er)?\s(\p{L}+)\s(\d{4})$").expect("invalid regex: textual date")
});

pub fn tidy(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn french_month(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    FRENCH_MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

pub fn normalize(text: &str) -> Result<Option<NaiveDate>, DateParseError> {
    let text = tidy(text);
    if text.is_empty() {
        return Ok(None);
    }

    if let Some(caps) = RE_NUMERIC.captures(&text) {
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| DateParseError::Malformed(text.clone()))?;
        return calendar_date(&text, &caps[1], month, &caps[3]).map(Some);
    }

    if let Some(caps) = RE_TEXTUAL.captures(&text) {
        let month = french_month(&caps[2]).ok_or_else(|| DateParseError::UnknownMonth {
            month: caps[2].to_string(),
            text: text.clone(),
        })?;
        return calendar_date(&text, &caps[1], month, &caps[3]).map(Some);
    }

    Err(DateParseError::Malformed(text))
}

fn calendar_date(text: &str, day: &str, month: u32, year: &str) -> Result<NaiveDate, DateParseError> {
    let day: u32 = day
        .parse()
        .map_err(|_| DateParseError::Malformed(text.to_string()))?;
    let year: i32 = year
        .parse()
        .map_err(|_| DateParseError::Malformed(text.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateParseError::OutOfRange(text.to_string()))
}

// unparsable text degrades to None with a warning
pub fn normalize_lenient(text: &str, field: &str) -> Option<NaiveDate> {
    normalize(text)
        .inspect_err(|e| log::warn!("Ignoring {}: {}", field, e))
        .ok()
        .flatten()
}
