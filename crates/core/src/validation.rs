//! Input validation
//!
//! Collects every problem with a piece of user input at once instead of
//! stopping at the first, so the CLI can report them together.
//!
//! # Example
//!
//! ```rust,ignore
//! use zerobyte_core::validation::Validator;
//!
//! let result = Validator::new()
//!     .required("email", email)
//!     .min_length("password", password, 6)
//!     .validate();
//!
//! if !result.is_valid() {
//!     for error in result.errors() {
//!         eprintln!("Validation error: {}", error);
//!     }
//! }
//! ```

use crate::error::{Error, ErrorCode, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum password length accepted by the identity provider
pub const MIN_PASSWORD_LENGTH: usize = 6;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

/// Validation error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field that failed validation
    pub field: String,
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Create a new empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Get all warnings
    pub fn warnings(&self) -> &[ValidationError] {
        &self.warnings
    }

    /// Add an error
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: ValidationError) {
        self.warnings.push(warning);
    }

    /// Convert to Result type
    pub fn to_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
            Err(Error::new(
                ErrorCode::ValidationError,
                format!("Validation failed: {}", messages.join("; ")),
            ))
        }
    }
}

/// Fluent validator builder
pub struct Validator {
    result: ValidationResult,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    fn error(mut self, field: &str, code: &str, message: impl Into<String>) -> Self {
        self.result.add_error(ValidationError {
            field: field.to_string(),
            message: message.into(),
            code: code.to_string(),
        });
        self
    }

    /// Validate that a field is not empty
    pub fn required(self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            return self.error(field, "REQUIRED", "Field is required");
        }
        self
    }

    /// Validate minimum length (in characters)
    pub fn min_length(self, field: &str, value: &str, min: usize) -> Self {
        let len = value.chars().count();
        if len < min {
            return self.error(field, "MIN_LENGTH", format!("Must be at least {} characters", min));
        }
        self
    }

    /// Validate maximum length (in characters)
    pub fn max_length(self, field: &str, value: &str, max: usize) -> Self {
        if value.chars().count() > max {
            return self.error(field, "MAX_LENGTH", format!("Must be at most {} characters", max));
        }
        self
    }

    /// Validate against a compiled pattern
    pub fn pattern(self, field: &str, value: &str, re: &Regex, description: &str) -> Self {
        if !re.is_match(value) {
            return self.error(field, "PATTERN", format!("Must be {}", description));
        }
        self
    }

    /// Validate that a value is in a list of allowed values
    pub fn one_of(self, field: &str, value: &str, allowed: &[&str]) -> Self {
        if !allowed.contains(&value) {
            return self.error(field, "ONE_OF", format!("Must be one of: {}", allowed.join(", ")));
        }
        self
    }

    /// Validate a numeric range
    pub fn range<T: PartialOrd + std::fmt::Display>(self, field: &str, value: T, min: T, max: T) -> Self {
        if value < min || value > max {
            return self.error(field, "RANGE", format!("Must be between {} and {}", min, max));
        }
        self
    }

    /// Validate that a path is an existing regular file
    pub fn is_file(self, field: &str, path: &Path) -> Self {
        if !path.is_file() {
            let what = if path.is_dir() { "is a directory" } else { "does not exist" };
            return self.error(field, "NOT_A_FILE", format!("{} {}", path.display(), what));
        }
        self
    }

    /// Add a custom validation
    pub fn custom<F>(self, field: &str, f: F) -> Self
    where
        F: FnOnce() -> Option<String>,
    {
        match f() {
            Some(message) => self.error(field, "CUSTOM", message),
            None => self,
        }
    }

    /// Add a warning (non-blocking)
    pub fn warn_if(mut self, field: &str, condition: bool, message: &str) -> Self {
        if condition {
            self.result.add_warning(ValidationError {
                field: field.to_string(),
                message: message.to_string(),
                code: "WARNING".to_string(),
            });
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> ValidationResult {
        self.result
    }
}

/// Validate sign-in / sign-up credentials
pub fn validate_credentials(email: &str, password: &str) -> ValidationResult {
    let email = email.trim();
    let mut validator = Validator::new()
        .required("email", email)
        .required("password", password);

    if !email.is_empty() {
        validator = validator.pattern("email", email, &EMAIL_RE, "a valid email address");
    }
    if !password.trim().is_empty() {
        validator = validator.min_length("password", password, MIN_PASSWORD_LENGTH);
    }

    validator.validate()
}

/// Validate a local file chosen for upload or scanning
pub fn validate_upload_path(path: &Path) -> ValidationResult {
    let empty = std::fs::metadata(path).map(|m| m.is_file() && m.len() == 0).unwrap_or(false);

    Validator::new()
        .is_file("file", path)
        .warn_if("file", empty, "File is empty")
        .validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_lengths() {
        let result = Validator::new()
            .required("name", "  ")
            .min_length("code", "ab", 3)
            .max_length("tag", "abcdef", 4)
            .validate();

        assert!(!result.is_valid());
        let codes: Vec<&str> = result.errors().iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["REQUIRED", "MIN_LENGTH", "MAX_LENGTH"]);
    }

    #[test]
    fn test_one_of_and_range() {
        let result = Validator::new()
            .one_of("format", "xml", &["text", "json"])
            .range("attempts", 0u32, 1, 20)
            .validate();
        assert_eq!(result.errors().len(), 2);
    }

    #[test]
    fn test_credentials_empty() {
        let result = validate_credentials("", "");
        assert_eq!(result.errors().len(), 2);
        assert!(result.errors().iter().all(|e| e.code == "REQUIRED"));
    }

    #[test]
    fn test_credentials_bad_email_and_short_password() {
        let result = validate_credentials("not-an-email", "12345");
        let fields: Vec<&str> = result.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn test_credentials_ok() {
        assert!(validate_credentials(" user@example.com ", "secret1").is_valid());
    }

    #[test]
    fn test_upload_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!validate_upload_path(dir.path()).is_valid());
        assert!(!validate_upload_path(&dir.path().join("missing.bin")).is_valid());

        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        let result = validate_upload_path(&empty);
        assert!(result.is_valid());
        assert_eq!(result.warnings().len(), 1);

        let full = dir.path().join("data.bin");
        std::fs::write(&full, b"payload").unwrap();
        let result = validate_upload_path(&full);
        assert!(result.is_valid());
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn test_to_result_joins_messages() {
        let err = validate_credentials("", "pw").to_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("email: Field is required"));
        assert!(err.message.contains("password: Must be at least 6 characters"));
    }
}
