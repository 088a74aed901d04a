use chrono::NaiveDate;
use thiserror::Error;

use super::RENTAL_DATE_FORMAT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseInputError {
    #[error("Invalid ID '{0}': expected a whole number")]
    InvalidId(String),

    #[error("Invalid year '{0}': expected a positive whole number")]
    InvalidYear(String),

    #[error("Invalid date format '{0}'. Please use the format DD/MM/YYYY.")]
    InvalidDate(String),
}

/// Parse a record identifier typed at the prompt.
pub fn parse_id(input: &str) -> Result<i64, ParseInputError> {
    input
        .trim()
        .parse()
        .map_err(|_| ParseInputError::InvalidId(input.trim().to_string()))
}

/// Parse a model year. Zero and negative years are rejected.
pub fn parse_year(input: &str) -> Result<i32, ParseInputError> {
    match input.trim().parse::<i32>() {
        Ok(year) if year > 0 => Ok(year),
        _ => Err(ParseInputError::InvalidYear(input.trim().to_string())),
    }
}

/// Parse a rental date in DD/MM/YYYY. Blank input means "no date".
pub fn parse_rental_date(input: &str) -> Result<Option<NaiveDate>, ParseInputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(input, RENTAL_DATE_FORMAT)
        .map(Some)
        .map_err(|_| ParseInputError::InvalidDate(input.to_string()))
}

/// Treat a blank prompt answer as "not supplied".
pub fn non_blank(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        None
    } else {
        Some(input.to_string())
    }
}
