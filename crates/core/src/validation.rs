//! Credential form validation, applied before any request is sent.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::FetchError;

/// Minimum password length accepted by the forms.
pub const MIN_PASSWORD_LEN: usize = 6;
/// Minimum display-name length for registration.
pub const MIN_NAME_LEN: usize = 2;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex"));

/// Form field a validation message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// Display name.
    Name,
    /// E-mail address.
    Email,
    /// Password.
    Password,
    /// Password confirmation.
    ConfirmPassword,
}

/// First failing rule of a form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Offending field.
    pub field: FormField,
    /// Human readable message.
    pub message: String,
}

impl ValidationError {
    fn new(field: FormField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl From<ValidationError> for FetchError {
    fn from(error: ValidationError) -> Self {
        FetchError::Validation(error.message)
    }
}

/// Sign-in credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// E-mail address.
    pub email: String,
    /// Password.
    pub password: String,
}

impl LoginForm {
    /// Check every field, reporting the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Account registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Password.
    pub password: String,
    /// Repeated password.
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check every field, reporting the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::new(
                FormField::Name,
                format!("Name must have at least {MIN_NAME_LEN} characters"),
            ));
        }
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::new(
                FormField::ConfirmPassword,
                "Passwords do not match",
            ));
        }
        Ok(())
    }

    /// Credentials for the automatic sign-in after registration.
    pub fn login_form(&self) -> LoginForm {
        LoginForm {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        }
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::new(FormField::Email, "E-mail is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new(FormField::Email, "Invalid e-mail address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            FormField::Password,
            format!("Password must have at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}
