use crate::dates::{self, DateParseError};
use crate::terms::{TermIndex, TermLookupError};
use crate::types::{Mandate, MandateBlock, MandateRecord, Person};

#[derive(Debug, thiserror::Error)]
pub enum AssignError {
    #[error("Invalid mandate date: {0}")]
    Date(#[from] DateParseError),
    #[error("Mandate has an empty {0} date")]
    MissingDate(&'static str),
    #[error("{0}")]
    Term(#[from] TermLookupError),
}

pub fn assign_mandate(
    terms: &TermIndex,
    person: &Person,
    block: &MandateBlock,
) -> Result<MandateRecord, AssignError> {
    let start_date =
        dates::normalize(block.period.start())?.ok_or(AssignError::MissingDate("start"))?;
    let end_date = match block.period.end() {
        Some(text) => Some(dates::normalize(text)?.ok_or(AssignError::MissingDate("end"))?),
        None => None,
    };

    let term = terms.term_for(start_date, end_date)?;

    let mandate = Mandate {
        person_id: person.id.clone(),
        term_id: term.id.clone(),
        faction: block.group.clone(),
        start_date,
        end_date,
        area: block.area.clone(),
    };
    Ok(MandateRecord::new(person, &mandate))
}
