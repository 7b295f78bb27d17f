use chrono::{NaiveDate, TimeDelta};

use crate::types::Term;

struct TermRow {
    id: &'static str,
    name: &'static str,
    start: &'static str,
    end: Option<&'static str>,
    wikidata: &'static str,
}

const FIFTH_REPUBLIC: [TermRow; 14] = [
    TermRow { id: "14", name: "XIVe législature de la Cinquième République", start: "2012-06-20", end: None, wikidata: "Q3570385" },
    TermRow { id: "13", name: "XIIIe législature de la Cinquième République", start: "2007-06-20", end: Some("2012-06-19"), wikidata: "Q3025921" },
    TermRow { id: "12", name: "XIIe législature de la Cinquième République", start: "2002-06-19", end: Some("2007-06-19"), wikidata: "Q3570376" },
    TermRow { id: "11", name: "XIe législature de la Cinquième République", start: "1997-06-01", end: Some("2002-06-18"), wikidata: "Q3570394" },
    TermRow { id: "10", name: "Xe législature de la Cinquième République", start: "1993-04-02", end: Some("1997-04-21"), wikidata: "Q3570849" },
    TermRow { id: "9", name: "IXe législature de la Cinquième République", start: "1988-06-06", end: Some("1993-04-01"), wikidata: "Q3147021" },
    TermRow { id: "8", name: "VIIIe législature de la Cinquième République", start: "1986-04-02", end: Some("1988-05-14"), wikidata: "Q3552944" },
    TermRow { id: "7", name: "VIIe législature de la Cinquième République", start: "1981-07-02", end: Some("1986-04-01"), wikidata: "Q3552950" },
    TermRow { id: "6", name: "VIe législature de la Cinquième République", start: "1978-04-03", end: Some("1981-05-22"), wikidata: "Q3552959" },
    TermRow { id: "5", name: "Ve législature de la Cinquième République", start: "1973-04-02", end: Some("1978-04-02"), wikidata: "Q3555150" },
    TermRow { id: "4", name: "IVe législature de la Cinquième République", start: "1968-07-11", end: Some("1973-04-01"), wikidata: "Q2380278" },
    TermRow { id: "3", name: "IIIe législature de la Cinquième République", start: "1967-04-03", end: Some("1968-05-30"), wikidata: "Q3146694" },
    TermRow { id: "2", name: "IIe législature de la Cinquième République", start: "1962-12-06", end: Some("1967-04-02"), wikidata: "Q3146705" },
    TermRow { id: "1", name: "Ire législature de la Cinquième République", start: "1958-12-09", end: Some("1962-10-09"), wikidata: "Q3154303" },
];

#[derive(Debug, thiserror::Error)]
pub enum TermTableError {
    #[error("Term table is empty")]
    Empty,
    #[error("Invalid date '{date}' for term {id}")]
    InvalidDate { id: String, date: String },
    #[error("Duplicate term id: {0}")]
    DuplicateId(String),
    #[error("Term {earlier} overlaps term {later}")]
    Overlap { earlier: String, later: String },
    #[error("Only the most recent term may be open-ended, but term {0} has no end date")]
    OpenEnded(String),
    #[error("Term {0} ends before it starts")]
    Inverted(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TermLookupError {
    #[error("No term covers midpoint {midpoint} of mandate {start} – {end}")]
    NotFound {
        start: NaiveDate,
        end: NaiveDate,
        midpoint: NaiveDate,
    },
    #[error("Mandate ends ({end}) before it starts ({start})")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone)]
pub struct TermIndex {
    terms: Vec<Term>,
}

impl TermIndex {
    pub fn new(mut terms: Vec<Term>) -> Result<Self, TermTableError> {
        if terms.is_empty() {
            return Err(TermTableError::Empty);
        }
        terms.sort_by_key(|t| t.start_date);

        for (i, term) in terms.iter().enumerate() {
            if terms[..i].iter().any(|t| t.id == term.id) {
                return Err(TermTableError::DuplicateId(term.id.clone()));
            }
            if term.end_date.is_some_and(|end| end < term.start_date) {
                return Err(TermTableError::Inverted(term.id.clone()));
            }
        }

        for pair in terms.windows(2) {
            let (earlier, later) = (&pair[0], &pair[1]);
            let Some(end) = earlier.end_date else {
                return Err(TermTableError::OpenEnded(earlier.id.clone()));
            };
            if end >= later.start_date {
                return Err(TermTableError::Overlap {
                    earlier: earlier.id.clone(),
                    later: later.id.clone(),
                });
            }
        }

        Ok(Self { terms })
    }

    pub fn fifth_republic() -> Self {
        Self::from_rows(&FIFTH_REPUBLIC).expect("invalid built-in term table")
    }

    fn from_rows(rows: &[TermRow]) -> Result<Self, TermTableError> {
        let parse = |id: &str, date: &str| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| TermTableError::InvalidDate {
                id: id.to_string(),
                date: date.to_string(),
            })
        };

        let terms = rows
            .iter()
            .map(|row| {
                Ok(Term {
                    id: row.id.to_string(),
                    name: row.name.to_string(),
                    start_date: parse(row.id, row.start)?,
                    end_date: row.end.map(|end| parse(row.id, end)).transpose()?,
                    wikidata_id: row.wikidata.to_string(),
                })
            })
            .collect::<Result<Vec<_>, TermTableError>>()?;

        Self::new(terms)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Term> {
        self.terms.iter().find(|t| t.id == id)
    }

    pub fn current(&self) -> &Term {
        // non-empty, checked in `new`
        &self.terms[self.terms.len() - 1]
    }

    pub fn newest_first_ids(&self) -> Vec<String> {
        self.terms.iter().rev().map(|t| t.id.clone()).collect()
    }

    /// Ongoing mandates always belong to the current term, even against an
    /// older snapshot of the site. Closed mandates belong to the term strictly
    /// containing their midpoint.
    pub fn term_for(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<&Term, TermLookupError> {
        let Some(end) = end else {
            return Ok(self.current());
        };
        if end < start {
            return Err(TermLookupError::InvertedRange { start, end });
        }

        let midpoint = midpoint(start, end);
        self.terms
            .iter()
            .find(|t| t.start_date < midpoint && t.end_date.is_none_or(|e| midpoint < e))
            .ok_or(TermLookupError::NotFound {
                start,
                end,
                midpoint,
            })
    }
}

/// `start + floor(days_between(start, end) / 2)`
pub fn midpoint(start: NaiveDate, end: NaiveDate) -> NaiveDate {
    start + TimeDelta::days((end - start).num_days() / 2)
}
