//! Collects problems with request data before it reaches the database.

use crate::Error;

/// Accumulates validation failures so a client sees all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    problems: Vec<String>,
}

impl Validator {
    /// Record a failure with a custom message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.problems.push(message.into());
    }

    /// `value` must contain something other than whitespace.
    pub fn not_blank(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.fail(format!("{field} must not be empty"));
        }
    }

    /// `value`, if present, must be a finite number.
    pub fn finite(&mut self, field: &str, value: impl Into<Option<f64>>) {
        if let Some(value) = value.into()
            && !value.is_finite()
        {
            self.fail(format!("{field} must be a finite number"));
        }
    }

    /// `value`, if present, must be finite and greater than zero.
    pub fn positive(&mut self, field: &str, value: impl Into<Option<f64>>) {
        if let Some(value) = value.into()
            && !(value.is_finite() && value > 0.0)
        {
            self.fail(format!("{field} must be greater than zero"));
        }
    }

    /// `value`, if present, must be finite and not negative.
    pub fn non_negative(&mut self, field: &str, value: impl Into<Option<f64>>) {
        if let Some(value) = value.into()
            && !(value.is_finite() && value >= 0.0)
        {
            self.fail(format!("{field} must not be negative"));
        }
    }

    /// `value`, if present, must lie within `min..=max`.
    pub fn in_range(&mut self, field: &str, value: impl Into<Option<f64>>, min: f64, max: f64) {
        if let Some(value) = value.into()
            && !(value.is_finite() && (min..=max).contains(&value))
        {
            self.fail(format!("{field} must be between {min} and {max}"));
        }
    }

    /// Return every recorded problem as a single [Error::InvalidInput].
    pub fn finish(self) -> Result<(), Error> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(self.problems.join("; ")))
        }
    }
}
