//! Prompt templates for question generation and answer scoring.
//!
//! Templates use `{placeholder}` markers. All markers are filled in one
//! pass, so text inside a filled value is never substituted again.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"))
}

/// Fills every `{name}` in `template` from `values`. Unknown markers stay.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// System prompt shared by both interview prompts.
pub const INTERVIEWER_SYSTEM_PROMPT: &str =
    "You are a senior technical interviewer. You answer with raw JSON only, no commentary.";

/// User prompt asking for a JSON array of interview questions.
pub const QUESTION_GENERATION_PROMPT: &str = r#"Please ONLY respond with a JSON array containing {count} technical interview questions based on the following job information. Each object in the array should have the field "question" and an empty string for the "answer". The response MUST start with '[' and end with ']'.

Job Information:
- Job Position: {position}
- Job Description: {description}
- Years of Experience Required: {experience}
- Tech Stacks: {tech_stack}"#;

/// User prompt asking for a rating and feedback on one answer.
pub const ANSWER_SCORING_PROMPT: &str = r#"Question: "{question}"
User Answer: "{user_answer}"
Correct Answer: "{correct_answer}"
Please compare the user's answer to the correct answer, and provide a rating (from 1 to 10) and concise feedback for improvement.
Return the result ONLY in JSON format with "ratings" (number) and "feedback" (string) fields."#;

/// Fills [`QUESTION_GENERATION_PROMPT`].
///
/// ```
/// use interview_coach::prompts::build_question_prompt;
///
/// let prompt = build_question_prompt(2, "Backend Engineer", "Owns the billing API", 4, "Rust, Postgres");
/// assert!(prompt.contains("containing 2 technical interview questions"));
/// assert!(prompt.contains("- Tech Stacks: Rust, Postgres"));
/// ```
pub fn build_question_prompt(
    count: usize,
    position: &str,
    description: &str,
    experience_years: u32,
    tech_stack: &str,
) -> String {
    let count = count.to_string();
    let experience = experience_years.to_string();
    fill(
        QUESTION_GENERATION_PROMPT,
        &[
            ("count", count.as_str()),
            ("position", position),
            ("description", description),
            ("experience", experience.as_str()),
            ("tech_stack", tech_stack),
        ],
    )
}

/// Fills [`ANSWER_SCORING_PROMPT`].
pub fn build_scoring_prompt(question: &str, user_answer: &str, correct_answer: &str) -> String {
    fill(
        ANSWER_SCORING_PROMPT,
        &[
            ("question", question),
            ("user_answer", user_answer),
            ("correct_answer", correct_answer),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prompt_has_no_unfilled_placeholders() {
        let prompt = build_question_prompt(3, "SRE", "Keeps things running", 0, "Linux");
        assert!(prompt.contains("containing 3 technical"));
        assert!(prompt.contains("- Years of Experience Required: 0"));
        assert!(prompt.contains("MUST start with '['"));
        for marker in ["{count}", "{position}", "{description}", "{experience}", "{tech_stack}"] {
            assert!(!prompt.contains(marker), "unfilled {}", marker);
        }
    }

    #[test]
    fn test_scoring_prompt() {
        let prompt = build_scoring_prompt("What is Rust?", "A language", "A systems language");
        assert!(prompt.contains("Question: \"What is Rust?\""));
        assert!(prompt.contains("User Answer: \"A language\""));
        assert!(prompt.contains("Correct Answer: \"A systems language\""));
        assert!(prompt.contains("\"ratings\""));
    }

    #[test]
    fn test_markers_in_user_text_are_kept_literally() {
        let prompt = build_scoring_prompt(
            "What does {user_answer} mean?",
            "It is {correct_answer}",
            "SECRET",
        );
        assert!(prompt.contains("Question: \"What does {user_answer} mean?\""));
        assert!(prompt.contains("User Answer: \"It is {correct_answer}\""));
        assert_eq!(prompt.matches("SECRET").count(), 1);

        let prompt = build_question_prompt(1, "{description}", "Real description", 2, "{count}");
        assert!(prompt.contains("- Job Position: {description}"));
        assert!(prompt.contains("- Tech Stacks: {count}"));
    }
}
