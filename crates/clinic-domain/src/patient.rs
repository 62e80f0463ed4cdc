//! Patient registration rules: field validation, email normalization and the
//! confirmation message template.

use serde::Serialize;

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    const fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Registration form fields as submitted (before trimming).
#[derive(Debug, Clone, Copy)]
pub struct RegistrationFields<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone_country_code: &'a str,
    pub phone_number: &'a str,
}

impl RegistrationFields<'_> {
    /// Check every field and report all failures at once.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let errors: Vec<FieldError> = [
            validate_full_name(self.full_name),
            validate_email(self.email),
            validate_phone_country_code(self.phone_country_code),
            validate_phone_number(self.phone_number),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn validate_full_name(value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FieldError::new("fullName", "Full name is required"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        return Err(FieldError::new(
            "fullName",
            "Full name should contain letters and spaces only",
        ));
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    if !looks_like_email(value) {
        return Err(FieldError::new("email", "Email is invalid"));
    }
    if !value.to_ascii_lowercase().ends_with("@gmail.com") {
        return Err(FieldError::new("email", "Email must be a @gmail.com address"));
    }
    Ok(())
}

pub fn validate_phone_country_code(value: &str) -> Result<(), FieldError> {
    let digits = value.trim().strip_prefix('+').unwrap_or_default();
    if (1..=4).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(FieldError::new(
            "phoneCountryCode",
            "Country code must start with + followed by digits",
        ))
    }
}

pub fn validate_phone_number(value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    if (6..=15).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(FieldError::new(
            "phoneNumber",
            "Phone number must contain between 6 and 15 digits",
        ))
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
        && domain.contains('.')
}

/// Lowercase and trim an email address. Uniqueness is checked on this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub const CONFIRMATION_SUBJECT: &str = "Patient registration confirmed";

/// Confirmation message queued for every new registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub subject: &'static str,
    pub body: String,
}

impl ConfirmationEmail {
    pub fn for_patient(full_name: &str) -> Self {
        let body = [
            format!("Hi {full_name},"),
            String::new(),
            "We received your registration successfully.".to_owned(),
            "You will be notified if we need anything else.".to_owned(),
            String::new(),
            "Thanks for trusting our clinic.".to_owned(),
        ]
        .join("\n");
        Self {
            subject: CONFIRMATION_SUBJECT,
            body,
        }
    }
}
