//! Validation of the interview creation / edit form.

use crate::error::{CoachError, CoachResult};

/// Maximum length of the position field, in characters.
pub const MAX_POSITION_CHARS: usize = 100;

/// Minimum length of the job description, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Largest accepted years-of-experience value.
pub const MAX_EXPERIENCE_YEARS: u32 = 100;

/// Raw form input, as typed by the user.
///
/// The tech stack is a single comma-separated string, experience is free
/// text so it can be coerced the way a number input would be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewForm {
    pub position: String,
    pub description: String,
    pub experience: String,
    pub tech_stack: String,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedForm {
    pub position: String,
    pub description: String,
    pub experience_years: u32,
    pub tech_stack: Vec<String>,
}

impl ValidatedForm {
    pub fn tech_stack_display(&self) -> String {
        self.tech_stack.join(", ")
    }
}

impl InterviewForm {
    pub fn new(
        position: impl Into<String>,
        description: impl Into<String>,
        experience: impl Into<String>,
        tech_stack: impl Into<String>,
    ) -> Self {
        Self {
            position: position.into(),
            description: description.into(),
            experience: experience.into(),
            tech_stack: tech_stack.into(),
        }
    }

    /// Checks every field and normalizes the tech stack into a list.
    pub fn validate(&self) -> CoachResult<ValidatedForm> {
        let position = self.position.trim();
        let position_len = position.chars().count();
        if position_len == 0 {
            return Err(field_error("position", "Position is required"));
        }
        if position_len > MAX_POSITION_CHARS {
            return Err(field_error(
                "position",
                format!("Position must be at most {} characters", MAX_POSITION_CHARS),
            ));
        }

        let description = self.description.trim();
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(field_error(
                "description",
                format!(
                    "Description must be at least {} characters",
                    MIN_DESCRIPTION_CHARS
                ),
            ));
        }

        let experience_years = parse_experience(&self.experience)?;

        let tech_stack = split_tech_stack(&self.tech_stack);
        if tech_stack.is_empty() {
            return Err(field_error("techStack", "Tech stack is required"));
        }

        Ok(ValidatedForm {
            position: position.to_string(),
            description: description.to_string(),
            experience_years,
            tech_stack,
        })
    }
}

/// Coerces the experience field; empty input counts as zero years.
fn parse_experience(raw: &str) -> CoachResult<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| field_error("experience", "Experience must be a number"))?;
    if value < 0.0 {
        return Err(field_error("experience", "Experience cannot be negative"));
    }
    if !value.is_finite() || value >= f64::from(MAX_EXPERIENCE_YEARS + 1) {
        return Err(field_error(
            "experience",
            format!("Experience cannot exceed {} years", MAX_EXPERIENCE_YEARS),
        ));
    }
    Ok(value.floor() as u32)
}

/// Splits a comma-separated stack into trimmed, non-empty entries.
pub fn split_tech_stack(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn field_error(field: &str, message: impl Into<String>) -> CoachError {
    CoachError::validation(format!("Invalid {}", field), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> InterviewForm {
        InterviewForm::new(
            "Full Stack Developer",
            "Build and maintain web applications",
            "5",
            "React, Node.js, , Postgres ",
        )
    }

    #[test]
    fn test_valid_form_normalizes_stack() {
        let form = valid().validate().expect("valid");
        assert_eq!(form.position, "Full Stack Developer");
        assert_eq!(form.experience_years, 5);
        assert_eq!(form.tech_stack, vec!["React", "Node.js", "Postgres"]);
        assert_eq!(form.tech_stack_display(), "React, Node.js, Postgres");
    }

    #[test]
    fn test_position_bounds() {
        let mut form = valid();
        form.position = "   ".to_string();
        assert!(form.validate().is_err());

        form.position = "x".repeat(MAX_POSITION_CHARS);
        assert!(form.validate().is_ok());

        form.position = "x".repeat(MAX_POSITION_CHARS + 1);
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_description_minimum() {
        let mut form = valid();
        form.description = "too short".to_string();
        let err = form.validate().unwrap_err();
        assert!(matches!(err, CoachError::Validation { .. }));
    }

    #[test]
    fn test_experience_coercion() {
        let mut form = valid();
        form.experience = String::new();
        assert_eq!(form.validate().expect("valid").experience_years, 0);

        form.experience = "2.9".to_string();
        assert_eq!(form.validate().expect("valid").experience_years, 2);

        form.experience = "-1".to_string();
        assert!(form.validate().is_err());

        form.experience = "five".to_string();
        assert!(form.validate().is_err());

        form.experience = "100.5".to_string();
        assert_eq!(form.validate().expect("valid").experience_years, 100);

        for too_large in ["101", "1e20", "inf"] {
            form.experience = too_large.to_string();
            let err = form.validate().unwrap_err();
            assert!(err.to_string().contains("cannot exceed 100 years"), "{}", too_large);
        }
    }

    #[test]
    fn test_empty_stack_rejected() {
        let mut form = valid();
        form.tech_stack = " , ,".to_string();
        assert!(form.validate().is_err());
    }
}
