//! SQLite schema for the document collections.
//!
//! Each collection maps to one table. List-valued fields (`techStack`,
//! `questions`) are stored as JSON text, timestamps as RFC 3339 text.

/// SQL schema for the `interviews` collection.
pub const CREATE_INTERVIEWS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS interviews (
    id          TEXT PRIMARY KEY,
    position    TEXT NOT NULL,
    description TEXT NOT NULL,
    experience  INTEGER NOT NULL CHECK (experience >= 0),
    techStack   TEXT NOT NULL,
    questions   TEXT NOT NULL,
    userId      TEXT NOT NULL,
    createdAt   TEXT NOT NULL,
    updatedAt   TEXT NOT NULL
)
"#;

/// SQL schema for the `userAnswers` collection.
///
/// There is deliberately no unique constraint on
/// `(userId, mockIdRef, question)`: duplicates are only prevented by the
/// read-before-write check in the answer session.
pub const CREATE_USER_ANSWERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS userAnswers (
    id          TEXT PRIMARY KEY,
    mockIdRef   TEXT NOT NULL,
    question    TEXT NOT NULL,
    correct_ans TEXT NOT NULL,
    user_ans    TEXT NOT NULL,
    feedback    TEXT NOT NULL,
    rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 10),
    userId      TEXT NOT NULL,
    createdAt   TEXT NOT NULL
)
"#;

/// SQL schema for the `users` collection.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    email     TEXT NOT NULL,
    imageUrl  TEXT NOT NULL,
    createdAt TEXT NOT NULL,
    updatedAt TEXT NOT NULL
)
"#;

/// Indexes backing the equality queries.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_interviews_user ON interviews(userId)",
    "CREATE INDEX IF NOT EXISTS idx_user_answers_user ON userAnswers(userId)",
    "CREATE INDEX IF NOT EXISTS idx_user_answers_mock ON userAnswers(mockIdRef)",
    "CREATE INDEX IF NOT EXISTS idx_user_answers_question ON userAnswers(question)",
];

/// Returns all schema creation statements in the correct order.
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut statements = vec![
        CREATE_INTERVIEWS_TABLE,
        CREATE_USER_ANSWERS_TABLE,
        CREATE_USERS_TABLE,
    ];
    statements.extend_from_slice(CREATE_INDEXES);
    statements
}

/// Collection (table) names.
pub mod tables {
    pub const INTERVIEWS: &str = "interviews";
    pub const USER_ANSWERS: &str = "userAnswers";
    pub const USERS: &str = "users";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_schema_statements_order() {
        let statements = all_schema_statements();
        assert_eq!(statements.len(), 7);
        assert!(statements[0].contains(tables::INTERVIEWS));
        assert!(statements[1].contains(tables::USER_ANSWERS));
        assert!(statements[2].contains(tables::USERS));
        assert!(statements[3..].iter().all(|s| s.starts_with("CREATE INDEX")));
    }

    #[test]
    fn test_answers_table_has_no_uniqueness_on_question() {
        assert!(!CREATE_USER_ANSWERS_TABLE.contains("UNIQUE"));
    }
}
