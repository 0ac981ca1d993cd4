//! Field rules for user records.

use super::error::DomainError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const AGE_MIN: i32 = 1;
pub const AGE_MAX: i32 = 150;

pub fn validate_name(name: &str) -> Result<(), DomainError> {
    let length = name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        return Err(DomainError::validation(
            "name",
            format!("must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let email = email.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        });
    if !valid {
        return Err(DomainError::validation(
            "email",
            "must be a valid email address",
        ));
    }
    Ok(())
}

pub fn validate_age(age: i32) -> Result<(), DomainError> {
    if !(AGE_MIN..=AGE_MAX).contains(&age) {
        return Err(DomainError::validation(
            "age",
            format!("must be between {AGE_MIN} and {AGE_MAX}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_is_bounded() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name("A").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_name("  Ö  ").is_err());
    }

    #[test]
    fn email_needs_local_and_domain_parts() {
        assert!(validate_email("ann@example.com").is_ok());
        assert!(validate_email("ann@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ann example@x.io").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn age_is_bounded() {
        assert!(validate_age(1).is_ok());
        assert!(validate_age(150).is_ok());
        assert!(validate_age(0).is_err());
        assert!(validate_age(151).is_err());
    }
}
