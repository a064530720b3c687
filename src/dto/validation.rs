//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dao::models::AnswerLetter;

/// Rejects strings that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts `A`, `B` or `C`, in either case.
pub fn validate_answer_letter(value: &str) -> Result<(), ValidationError> {
    if AnswerLetter::parse(value).is_none() {
        let mut err = ValidationError::new("answer_letter");
        err.message = Some(format!("Answer must be A, B or C (got `{value}`)").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a UI language code: 2 to 5 ASCII letters, optionally with a `-` region.
///
/// ```ignore
/// validate_language("pl")    // Ok
/// validate_language("en-GB") // Ok
/// validate_language("p")     // Err - too short
/// ```
pub fn validate_language(code: &str) -> Result<(), ValidationError> {
    let valid_length = (2..=5).contains(&code.len());
    let valid_chars = code.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
        && !code.starts_with('-')
        && !code.ends_with('-');
    if !valid_length || !valid_chars {
        let mut err = ValidationError::new("language");
        err.message = Some(format!("Invalid language code `{code}`").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a scheduled date formatted as `YYYY-MM-DD`.
pub fn validate_event_date(value: &str) -> Result<(), ValidationError> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    if time::Date::parse(value, &format).is_err() {
        let mut err = ValidationError::new("event_date");
        err.message = Some("Date must be formatted as YYYY-MM-DD".into());
        return Err(err);
    }
    Ok(())
}
