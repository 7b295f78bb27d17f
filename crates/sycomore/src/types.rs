use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub wikidata_id: String,
}

impl Term {
    /// Sycomore numbers every legislature since 1789; the Fifth Republic starts at 46.
    pub fn sycomore_legislature(&self) -> Option<u32> {
        self.id.parse::<u32>().ok().map(|n| n + 45)
    }

    pub fn listing_url(&self) -> Option<String> {
        self.sycomore_legislature().map(|legislature| {
            format!(
                "{}/result.asp?choixordre=chrono&legislature={}",
                crate::BASE_URL,
                legislature
            )
        })
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:>2}] {} — {} → ", self.id, self.name, self.start_date)?;
        match self.end_date {
            Some(end) => write!(f, "{}", end)?,
            None => write!(f, "en cours")?,
        }
        write!(f, " ({})", self.wikidata_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub url: String,
    pub name: String,
    pub birth_text: String,
    pub death_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub source_url: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPeriod {
    Closed { start: String, end: String },
    Ongoing { start: String },
}

impl RawPeriod {
    pub fn start(&self) -> &str {
        match self {
            RawPeriod::Closed { start, .. } | RawPeriod::Ongoing { start } => start,
        }
    }

    pub fn end(&self) -> Option<&str> {
        match self {
            RawPeriod::Closed { end, .. } => Some(end),
            RawPeriod::Ongoing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandateBlock {
    pub period_text: String,
    pub period: RawPeriod,
    pub area: String,
    pub group: String,
    pub reelection_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandate {
    pub person_id: String,
    pub term_id: String,
    pub faction: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub area: String,
}

// absent dates are stored as empty strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandateRecord {
    pub id: String,
    pub name: String,
    pub birth_date: String,
    pub death_date: String,
    pub source: String,
    pub image: String,
    pub term: String,
    pub start_date: String,
    pub end_date: String,
    pub area: String,
    pub faction: String,
}

fn date_column(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

impl MandateRecord {
    pub fn new(person: &Person, mandate: &Mandate) -> Self {
        Self {
            id: person.id.clone(),
            name: person.name.clone(),
            birth_date: date_column(person.birth_date),
            death_date: date_column(person.death_date),
            source: person.source_url.clone(),
            image: person.image_url.clone().unwrap_or_default(),
            term: mandate.term_id.clone(),
            start_date: mandate.start_date.to_string(),
            end_date: date_column(mandate.end_date),
            area: mandate.area.clone(),
            faction: mandate.faction.clone(),
        }
    }
}

impl Display for MandateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] term {}", self.name, self.id, self.term)?;
        if self.end_date.is_empty() {
            write!(f, " · depuis {}", self.start_date)?;
        } else {
            write!(f, " · {} – {}", self.start_date, self.end_date)?;
        }
        write!(f, " · {}", self.area)?;
        if !self.faction.is_empty() {
            write!(f, " · {}", self.faction)?;
        }
        Ok(())
    }
}
