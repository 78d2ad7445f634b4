//! Article field rules shared by the create and update paths.

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::well_known::Rfc3339};

use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 10_000;

const DATE_ONLY: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]");

pub fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("must be at most {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), DomainError> {
    let count = description.chars().count();
    if count < DESCRIPTION_MIN_CHARS {
        return Err(DomainError::validation(
            "description",
            format!("must be at least {DESCRIPTION_MIN_CHARS} characters"),
        ));
    }
    if count > DESCRIPTION_MAX_CHARS {
        return Err(DomainError::validation(
            "description",
            format!("must be at most {DESCRIPTION_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Parse an ISO-8601 timestamp. A bare `YYYY-MM-DD` means midnight UTC.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<OffsetDateTime, DomainError> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(value);
    }
    Date::parse(raw, DATE_ONLY)
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
        .map_err(|_| {
            DomainError::validation(field, format!("`{raw}` is not a valid ISO-8601 date"))
        })
}
