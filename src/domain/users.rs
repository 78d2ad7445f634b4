//! Account field rules for registration.

use super::error::DomainError;

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const NAME_MAX_CHARS: usize = 100;

/// Lower-cases and trims an email address so lookups are case-insensitive.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::validation("email", "must be a valid email address");

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(
            "password",
            format!("must be at least {PASSWORD_MIN_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_name(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if value.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(
            field,
            format!("must be at most {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jane@localhost").is_err());
        assert!(validate_email("jane@@example.com").is_err());
        assert!(validate_email("ja ne@example.com").is_err());
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn weak_passwords_are_rejected() {
        assert!(validate_password("123").is_err());
        assert!(validate_password("password123").is_ok());
    }

    #[test]
    fn names_must_be_present() {
        assert!(validate_name("firstName", "").is_err());
        assert!(validate_name("firstName", "Ada").is_ok());
    }
}
