//! Input validation run before any request reaches the store.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::domain::{GoldMetadata, GoldPurity};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const WEIGHT_DECIMALS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("child name must not be empty")]
    EmptyChildName,
    #[error("category name must not be empty")]
    EmptyCategoryName,
    #[error("amount is not a non-negative number: {0:?}")]
    InvalidAmount(String),
    #[error("gold assets need a weight")]
    MissingGoldWeight,
    #[error("weight is not a non-negative number: {0:?}")]
    InvalidWeight(String),
    #[error("birthdate is not a date (YYYY-MM-DD): {0:?}")]
    InvalidBirthdate(String),
    #[error("birthdate is in the future")]
    FutureBirthdate,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("password must be at least 6 characters")]
    PasswordTooShort,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("deletion was not confirmed")]
    ConfirmationRequired,
}

/// Parses a user-entered amount. Grouping commas and surrounding whitespace
/// are ignored; negative values are rejected.
pub fn parse_amount(input: &str) -> Result<Decimal, ValidationError> {
    parse_non_negative(input).ok_or_else(|| ValidationError::InvalidAmount(input.to_string()))
}

/// Parses a gold weight in grams, rounded to three decimals.
pub fn parse_weight(input: &str) -> Result<Decimal, ValidationError> {
    parse_non_negative(input)
        .map(round_weight)
        .ok_or_else(|| ValidationError::InvalidWeight(input.to_string()))
}

pub fn round_weight(weight: Decimal) -> Decimal {
    weight.round_dp_with_strategy(WEIGHT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}

fn parse_non_negative(input: &str) -> Option<Decimal> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned).ok()?;
    if value.is_zero() {
        return Some(Decimal::ZERO);
    }
    if value.is_sign_negative() {
        return None;
    }
    Some(value)
}

/// Builds gold metadata from raw form/API fields. The weight is mandatory;
/// the purity defaults to 999 when not given.
pub fn gold_metadata(
    weight: Option<&str>,
    purity: Option<&str>,
) -> Result<GoldMetadata, ValidationError> {
    let weight = match weight.map(str::trim) {
        Some(w) if !w.is_empty() => parse_weight(w)?,
        _ => return Err(ValidationError::MissingGoldWeight),
    };
    let purity = match purity.map(str::trim) {
        Some(p) if !p.is_empty() => GoldPurity::from_code(p),
        _ => GoldPurity::default(),
    };
    Ok(GoldMetadata {
        weight: Some(weight),
        purity: Some(purity),
    })
}

pub fn child_name(input: &str) -> Result<String, ValidationError> {
    non_empty(input).ok_or(ValidationError::EmptyChildName)
}

pub fn category_name(input: &str) -> Result<String, ValidationError> {
    non_empty(input).ok_or(ValidationError::EmptyCategoryName)
}

fn non_empty(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Empty or whitespace-only notes are stored as absent.
pub fn note(input: Option<&str>) -> Option<String> {
    input.and_then(non_empty)
}

/// Parses an optional `YYYY-MM-DD` birthdate; blank input means "not given".
pub fn birthdate(input: Option<&str>, today: NaiveDate) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidBirthdate(raw.to_string()))?;
    check_birthdate(date, today)?;
    Ok(Some(date))
}

pub fn check_birthdate(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::FutureBirthdate);
    }
    Ok(())
}

/// Trimmed, lower-cased email with a non-empty local part and domain.
pub fn email(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_lowercase();
    match normalized.split_once('@') {
        Some((local, domain))
            if !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !normalized.contains(char::is_whitespace) =>
        {
            Ok(normalized)
        }
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn password(input: &str) -> Result<(), ValidationError> {
    if input.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn password_confirmation(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
