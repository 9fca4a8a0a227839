use crate::error::{FieldErrors, ShelfError};
use crate::types::SignupForm;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
        .expect("FATAL: email pattern must compile")
});

const MIN_PASSWORD_LEN: usize = 10;
const PHONE_LEN: std::ops::RangeInclusive<usize> = 11..=13;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check every signup field, collecting one message per failing field.
pub fn validate_signup(form: &SignupForm) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if form.first_name.trim().is_empty() {
        errors.add("first_name", "First name is required");
    }
    if form.last_name.trim().is_empty() {
        errors.add("last_name", "Last name is required");
    }
    if form.gender.trim().is_empty() {
        errors.add("gender", "Please select a gender");
    }

    let email = form.email.trim();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Please enter a valid email address");
    }

    if form.password.is_empty() {
        errors.add("password", "Password is required");
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        );
    }

    if form.confirm_password.is_empty() {
        errors.add("confirm_password", "Please confirm your password");
    } else if form.password != form.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }

    let phone = form.phone_number.trim();
    if phone.is_empty() {
        errors.add("phone_number", "Phone number is required");
    } else if !PHONE_LEN.contains(&phone.chars().count()) {
        errors.add(
            "phone_number",
            "Please enter a valid phone number (11-13 characters)",
        );
    }

    errors
}

/// Parse a positive amount typed into a form.
pub fn parse_amount(raw: &str) -> Result<f64, ShelfError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ShelfError::Validation(FieldErrors::single(
            "amount",
            "Please enter an amount.",
        )));
    }
    match raw.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount > 0.0 => Ok(amount),
        _ => Err(ShelfError::Validation(FieldErrors::single(
            "amount",
            "Enter a valid positive number.",
        ))),
    }
}

/// SHA-256 of the password, lowercase hex.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let candidate = hash_password(password);
    bool::from(candidate.as_bytes().ct_eq(stored_hash.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SignupForm {
        SignupForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            gender: "Female".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical-engine".to_string(),
            confirm_password: "analytical-engine".to_string(),
            phone_number: "+4420794600".to_string(),
        }
    }

    #[test]
    fn valid_signup_has_no_errors() {
        assert!(validate_signup(&valid_form()).is_empty());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let form = SignupForm {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            confirm_password: "different".to_string(),
            phone_number: "123".to_string(),
            ..SignupForm::default()
        };
        let errors = validate_signup(&form);
        for field in [
            "first_name",
            "last_name",
            "gender",
            "email",
            "password",
            "confirm_password",
            "phone_number",
        ] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn amounts_must_be_positive_numbers() {
        assert_eq!(parse_amount(" 250 ").expect("valid"), 250.0);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn password_hash_is_sha256_hex() {
        assert_eq!(
            hash_password("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
        assert!(verify_password("password", &hash_password("password")));
        assert!(!verify_password("Password", &hash_password("password")));
    }
}
