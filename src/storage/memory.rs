//! In-process document store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StoreError;
use crate::interview::{
    AnswerFilter, AnswerRecord, InterviewSpec, InterviewUpdate, NewAnswer, NewInterview,
    NewUserProfile, UserProfile,
};
use crate::storage::schema::tables;
use crate::storage::store::{new_document_id, DocumentStore, StoreResult};
use crate::storage::subscription::{Subscription, SubscriptionHub};

#[derive(Debug, Default)]
struct Collections {
    /// Insertion order.
    interviews: Vec<InterviewSpec>,
    answers: Vec<AnswerRecord>,
    users: HashMap<String, UserProfile>,
}

/// Document store kept entirely in memory. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
    hub: SubscriptionHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    fn snapshot(&self, owner_id: &str) -> Vec<InterviewSpec> {
        self.data
            .read()
            .expect("lock not poisoned")
            .interviews
            .iter()
            .rev()
            .filter(|i| i.is_owned_by(owner_id))
            .cloned()
            .collect()
    }

    fn notify(&self, owner_id: &str) {
        if self.hub.has_listeners(owner_id) {
            self.hub.publish(owner_id, self.snapshot(owner_id));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
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
        self.data
            .write()
            .expect("lock not poisoned")
            .interviews
            .push(spec.clone());
        self.notify(&spec.owner_id);
        Ok(spec)
    }

    async fn get_interview(&self, id: &str) -> StoreResult<Option<InterviewSpec>> {
        Ok(self
            .data
            .read()
            .expect("lock not poisoned")
            .interviews
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn update_interview(
        &self,
        id: &str,
        update: InterviewUpdate,
    ) -> StoreResult<InterviewSpec> {
        let updated = {
            let mut data = self.data.write().expect("lock not poisoned");
            let spec = data
                .interviews
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    collection: tables::INTERVIEWS.to_string(),
                    id: id.to_string(),
                })?;
            spec.position = update.position;
            spec.description = update.description;
            spec.experience_years = update.experience_years;
            spec.tech_stack = update.tech_stack;
            spec.questions = update.questions;
            spec.updated_at = Utc::now();
            spec.clone()
        };
        self.notify(&updated.owner_id);
        Ok(updated)
    }

    async fn delete_interview(&self, id: &str) -> StoreResult<()> {
        let removed = {
            let mut data = self.data.write().expect("lock not poisoned");
            let index = data.interviews.iter().position(|i| i.id == id);
            index.map(|index| data.interviews.remove(index))
        };
        if let Some(removed) = removed {
            self.notify(&removed.owner_id);
        }
        Ok(())
    }

    async fn list_interviews(&self, owner_id: &str) -> StoreResult<Vec<InterviewSpec>> {
        Ok(self.snapshot(owner_id))
    }

    async fn subscribe_interviews(&self, owner_id: &str) -> StoreResult<Subscription> {
        Ok(self.hub.register(owner_id, self.snapshot(owner_id)))
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
        self.data
            .write()
            .expect("lock not poisoned")
            .answers
            .push(record.clone());
        Ok(record)
    }

    async fn find_answers(&self, filter: &AnswerFilter) -> StoreResult<Vec<AnswerRecord>> {
        Ok(self
            .data
            .read()
            .expect("lock not poisoned")
            .answers
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self
            .data
            .read()
            .expect("lock not poisoned")
            .users
            .get(id)
            .cloned())
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
        self.data
            .write()
            .expect("lock not poisoned")
            .users
            .insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::Question;

    fn new_interview(owner: &str, position: &str) -> NewInterview {
        NewInterview {
            position: position.to_string(),
            description: "Builds internal tooling".to_string(),
            experience_years: 2,
            tech_stack: vec!["Rust".to_string()],
            questions: vec![Question {
                question: "What is Send?".to_string(),
                answer: String::new(),
            }],
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_and_list_by_owner() {
        let store = MemoryStore::new();
        let first = store.insert_interview(new_interview("u1", "A")).await.unwrap();
        store.insert_interview(new_interview("u2", "B")).await.unwrap();
        let third = store.insert_interview(new_interview("u1", "C")).await.unwrap();

        assert_eq!(store.get_interview(&first.id).await.unwrap(), Some(first.clone()));
        let mine = store.list_interviews("u1").await.unwrap();
        let ids: Vec<_> = mine.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![third.id.as_str(), first.id.as_str()]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_interview(
                "missing",
                InterviewUpdate {
                    position: "P".to_string(),
                    description: "D".to_string(),
                    experience_years: 0,
                    tech_stack: vec![],
                    questions: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscription_sees_writes_and_is_released() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe_interviews("u1").await.unwrap();
        assert_eq!(sub.next().await, Some(Vec::new()));

        let spec = store.insert_interview(new_interview("u1", "A")).await.unwrap();
        assert_eq!(sub.next().await.map(|s| s.len()), Some(1));

        store.insert_interview(new_interview("u2", "B")).await.unwrap();
        assert_eq!(sub.try_next(), None);

        store.delete_interview(&spec.id).await.unwrap();
        assert_eq!(sub.next().await, Some(Vec::new()));

        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_find_answers_by_filter() {
        let store = MemoryStore::new();
        for (owner, question) in [("u1", "Q1"), ("u1", "Q2"), ("u2", "Q1")] {
            store
                .insert_answer(NewAnswer {
                    interview_id: "i1".to_string(),
                    question: question.to_string(),
                    expected_answer: "E".to_string(),
                    submitted_answer: "S".to_string(),
                    feedback_text: "F".to_string(),
                    rating: 5,
                    owner_id: owner.to_string(),
                })
                .await
                .unwrap();
        }

        let filter = AnswerFilter::new().with_owner("u1").with_interview("i1");
        assert_eq!(store.find_answers(&filter).await.unwrap().len(), 2);
        let filter = filter.with_question("Q1");
        assert_eq!(store.find_answers(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_users() {
        let store = MemoryStore::new();
        assert!(store.get_user("u1").await.unwrap().is_none());
        store
            .insert_user(NewUserProfile {
                id: "u1".to_string(),
                display_name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                image_url: String::new(),
            })
            .await
            .unwrap();
        let profile = store.get_user("u1").await.unwrap().expect("present");
        assert_eq!(profile.display_name, "Ada");
    }
}
