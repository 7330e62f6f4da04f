//! SQLite-backed document store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Connection, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tokio::time::MissedTickBehavior;

use crate::error::StoreError;
use crate::interview::{
    AnswerFilter, AnswerRecord, InterviewSpec, InterviewUpdate, NewAnswer, NewInterview,
    NewUserProfile, Question, UserProfile,
};
use crate::storage::fetch::ScopedFetch;
use crate::storage::schema::{all_schema_statements, tables};
use crate::storage::store::{new_document_id, DocumentStore, StoreResult};
use crate::storage::subscription::{Subscription, SubscriptionHub};

/// How often a subscription checks the file for commits from other processes.
const EXTERNAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Document store persisted in a single SQLite file.
///
/// Subscriptions on a file-backed store each own a watcher connection that
/// polls `PRAGMA data_version`, so writes from other processes (and other
/// handles in this one) reach them too.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    hub: SubscriptionHub,
    /// Connect options for watcher connections; `None` for in-memory stores.
    watch_opts: Option<SqliteConnectOptions>,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    ///
    /// `url` is either a `sqlite://` URL or a bare file path.
    pub async fn open(url: &str) -> StoreResult<Self> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite://{}", url)
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts.clone())
            .await
            .map_err(|e| match e {
                sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                    StoreError::PermissionDenied(url.clone())
                }
                other => StoreError::ConnectionFailed(other.to_string()),
            })?;

        for statement in all_schema_statements() {
            sqlx::query(statement).execute(&pool).await?;
        }

        tracing::info!(url = %url, "Document store opened");
        Ok(Self {
            pool,
            hub: SubscriptionHub::new(),
            watch_opts: Some(opts),
        })
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        // A single connection, otherwise each one sees its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        for statement in all_schema_statements() {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self {
            pool,
            hub: SubscriptionHub::new(),
            watch_opts: None,
        })
    }

    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    /// Pushes a fresh snapshot after a write through this handle. File-backed
    /// stores leave that to the subscription watchers, which see every commit.
    async fn notify(&self, owner_id: &str) {
        if self.watch_opts.is_some() || !self.hub.has_listeners(owner_id) {
            return;
        }
        match self.list_interviews(owner_id).await {
            Ok(snapshot) => self.hub.publish(owner_id, snapshot),
            Err(e) => tracing::warn!(owner = %owner_id, error = %e, "Failed to refresh subscribers"),
        }
    }
}

async fn data_version(conn: &mut SqliteConnection) -> StoreResult<i64> {
    let version = sqlx::query_scalar::<_, i64>("PRAGMA data_version")
        .fetch_one(conn)
        .await?;
    Ok(version)
}

/// Re-sends the owner's interviews to one listener whenever another
/// connection commits. Ends once the listener is gone.
async fn watch_commits(
    store: SqliteStore,
    mut conn: SqliteConnection,
    listener: u64,
    owner_id: String,
    mut version: i64,
) {
    let mut ticker = tokio::time::interval(EXTERNAL_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let current = match data_version(&mut conn).await {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(owner = %owner_id, error = %e, "Failed to poll for changes");
                continue;
            }
        };
        if current == version {
            continue;
        }
        version = current;

        match store.list_interviews(&owner_id).await {
            Ok(snapshot) => {
                if !store.hub.send_to(listener, snapshot) {
                    break;
                }
            }
            Err(e) => tracing::warn!(owner = %owner_id, error = %e, "Failed to refresh subscriber"),
        }
    }
    tracing::debug!(listener, owner = %owner_id, "Change watcher stopped");
}

fn parse_timestamp(id: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("bad timestamp '{}': {}", raw, e),
        })
}

fn interview_from_row(row: &SqliteRow) -> StoreResult<InterviewSpec> {
    let id: String = row.get("id");
    let experience: i64 = row.get("experience");
    let tech_stack: Vec<String> = serde_json::from_str(row.get::<&str, _>("techStack"))?;
    let questions: Vec<Question> = serde_json::from_str(row.get::<&str, _>("questions"))?;
    let created_at = parse_timestamp(&id, row.get("createdAt"))?;
    let updated_at = parse_timestamp(&id, row.get("updatedAt"))?;

    Ok(InterviewSpec {
        experience_years: u32::try_from(experience).map_err(|_| StoreError::Corrupt {
            id: id.clone(),
            reason: format!("experience out of range: {}", experience),
        })?,
        position: row.get("position"),
        description: row.get("description"),
        tech_stack,
        questions,
        owner_id: row.get("userId"),
        created_at,
        updated_at,
        id,
    })
}

fn answer_from_row(row: &SqliteRow) -> StoreResult<AnswerRecord> {
    let id: String = row.get("id");
    let rating: i64 = row.get("rating");
    let created_at = parse_timestamp(&id, row.get("createdAt"))?;

    Ok(AnswerRecord {
        rating: u8::try_from(rating).map_err(|_| StoreError::Corrupt {
            id: id.clone(),
            reason: format!("rating out of range: {}", rating),
        })?,
        interview_id: row.get("mockIdRef"),
        question: row.get("question"),
        expected_answer: row.get("correct_ans"),
        submitted_answer: row.get("user_ans"),
        feedback_text: row.get("feedback"),
        owner_id: row.get("userId"),
        created_at,
        id,
    })
}

fn user_from_row(row: &SqliteRow) -> StoreResult<UserProfile> {
    let id: String = row.get("id");
    let created_at = parse_timestamp(&id, row.get("createdAt"))?;
    let updated_at = parse_timestamp(&id, row.get("updatedAt"))?;

    Ok(UserProfile {
        display_name: row.get("name"),
        email: row.get("email"),
        image_url: row.get("imageUrl"),
        created_at,
        updated_at,
        id,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_interview(&self, new: NewInterview) -> StoreResult<InterviewSpec> {
        let now = Utc::now();
        let spec = InterviewSpec {
            id: new_document_id(),
            position: new.position,
            description: new.description,
            experience_years: new.experience_years,
            tech_stack: new.tech_stack,
            questions: new.questions,
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO interviews (
                id, position, description, experience, techStack, questions,
                userId, createdAt, updatedAt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&spec.id)
        .bind(&spec.position)
        .bind(&spec.description)
        .bind(i64::from(spec.experience_years))
        .bind(serde_json::to_string(&spec.tech_stack)?)
        .bind(serde_json::to_string(&spec.questions)?)
        .bind(&spec.owner_id)
        .bind(spec.created_at.to_rfc3339())
        .bind(spec.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %spec.id, owner = %spec.owner_id, "Interview inserted");
        self.notify(&spec.owner_id).await;
        Ok(spec)
    }

    async fn get_interview(&self, id: &str) -> StoreResult<Option<InterviewSpec>> {
        let row = sqlx::query("SELECT * FROM interviews WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(interview_from_row).transpose()
    }

    async fn update_interview(
        &self,
        id: &str,
        update: InterviewUpdate,
    ) -> StoreResult<InterviewSpec> {
        let result = sqlx::query(
            "UPDATE interviews SET
                position = ?2, description = ?3, experience = ?4,
                techStack = ?5, questions = ?6, updatedAt = ?7
            WHERE id = ?1",
        )
        .bind(id)
        .bind(&update.position)
        .bind(&update.description)
        .bind(i64::from(update.experience_years))
        .bind(serde_json::to_string(&update.tech_stack)?)
        .bind(serde_json::to_string(&update.questions)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let not_found = || StoreError::NotFound {
            collection: tables::INTERVIEWS.to_string(),
            id: id.to_string(),
        };
        if result.rows_affected() == 0 {
            return Err(not_found());
        }

        let spec = self.get_interview(id).await?.ok_or_else(not_found)?;
        self.notify(&spec.owner_id).await;
        Ok(spec)
    }

    async fn delete_interview(&self, id: &str) -> StoreResult<()> {
        let owner: Option<String> =
            sqlx::query("DELETE FROM interviews WHERE id = ?1 RETURNING userId")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.get("userId"));

        if let Some(owner) = owner {
            tracing::debug!(id = %id, "Interview deleted");
            self.notify(&owner).await;
        }
        Ok(())
    }

    async fn list_interviews(&self, owner_id: &str) -> StoreResult<Vec<InterviewSpec>> {
        let rows = sqlx::query(
            "SELECT * FROM interviews WHERE userId = ?1 ORDER BY createdAt DESC, rowid DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(interview_from_row).collect()
    }

    async fn subscribe_interviews(&self, owner_id: &str) -> StoreResult<Subscription> {
        // Listen first: a commit landing before the snapshot read is then
        // either in the snapshot or delivered after it.
        let subscription = self.hub.listen(owner_id);

        let Some(opts) = &self.watch_opts else {
            let snapshot = self.list_interviews(owner_id).await?;
            self.hub.send_to(subscription.id(), snapshot);
            return Ok(subscription);
        };

        let mut conn = SqliteConnection::connect_with(opts)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let version = data_version(&mut conn).await?;
        let snapshot = self.list_interviews(owner_id).await?;
        self.hub.send_to(subscription.id(), snapshot);

        let watcher = ScopedFetch::spawn(watch_commits(
            self.clone(),
            conn,
            subscription.id(),
            owner_id.to_string(),
            version,
        ));
        Ok(subscription.with_watcher(watcher))
    }

    async fn insert_answer(&self, new: NewAnswer) -> StoreResult<AnswerRecord> {
        let record = AnswerRecord {
            id: new_document_id(),
            interview_id: new.interview_id,
            question: new.question,
            expected_answer: new.expected_answer,
            submitted_answer: new.submitted_answer,
            feedback_text: new.feedback_text,
            rating: new.rating,
            owner_id: new.owner_id,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO userAnswers (
                id, mockIdRef, question, correct_ans, user_ans, feedback,
                rating, userId, createdAt
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&record.id)
        .bind(&record.interview_id)
        .bind(&record.question)
        .bind(&record.expected_answer)
        .bind(&record.submitted_answer)
        .bind(&record.feedback_text)
        .bind(i64::from(record.rating))
        .bind(&record.owner_id)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_answers(&self, filter: &AnswerFilter) -> StoreResult<Vec<AnswerRecord>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM userAnswers WHERE 1 = 1");
        if let Some(owner_id) = &filter.owner_id {
            query.push(" AND userId = ").push_bind(owner_id.clone());
        }
        if let Some(interview_id) = &filter.interview_id {
            query.push(" AND mockIdRef = ").push_bind(interview_id.clone());
        }
        if let Some(question) = &filter.question {
            query.push(" AND question = ").push_bind(question.clone());
        }
        query.push(" ORDER BY createdAt ASC, rowid ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(answer_from_row).collect()
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, new: NewUserProfile) -> StoreResult<UserProfile> {
        let now = Utc::now();
        let profile = UserProfile {
            id: new.id,
            display_name: new.display_name,
            email: new.email,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, imageUrl, createdAt, updatedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&profile.id)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(&profile.image_url)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(profile)
    }
}
