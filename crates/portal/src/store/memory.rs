//! In-process store with fault injection.
//!
//! Uses the step-wise [`RosterStore::replace_all_weeks`] default, so an
//! injected failure halfway through a replacement leaves the store in the
//! same half-written state a non-transactional backend would.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use pharmaguard_core::{
    Comment, CommentBody, CommentId, Feedback, FeedbackId, HealthPost, HealthPostUpdate,
    NewFeedback, NewHealthPost, Pharmacy, PostId, WeekId, WeekSchedule,
};

use super::{FeedbackStore, PortalStore, PostStore, RosterStore, StoreError};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListWeeks,
    DeletePharmacies,
    DeleteWeeks,
    InsertWeek,
    InsertPharmacies,
    ListPosts,
    CreatePost,
    UpdatePost,
    DeletePost,
    IncrementLikes,
    DecrementLikes,
    ListComments,
    InsertComment,
    InsertFeedback,
    Ping,
}

#[derive(Debug, Default)]
struct Tables {
    weeks: Vec<(WeekId, String)>,
    pharmacies: Vec<(WeekId, Pharmacy)>,
    posts: Vec<HealthPost>,
    comments: Vec<Comment>,
    feedback: Vec<Feedback>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn post_mut(&mut self, id: PostId) -> Result<&mut HealthPost, StoreError> {
        self.posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(StoreError::NotFound)
    }
}

/// In-memory [`PortalStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// Remaining successful calls before each faulty operation fails.
    faults: Mutex<HashMap<Operation, usize>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail.
    pub fn fail(&self, op: Operation) {
        self.fail_after(op, 0);
    }

    /// Let `successes` calls to `op` through, then fail every later call.
    pub fn fail_after(&self, op: Operation, successes: usize) {
        lock(&self.faults).insert(op, successes);
    }

    /// Remove all injected faults.
    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Number of stored weeks, regardless of pharmacies.
    #[must_use]
    pub fn week_count(&self) -> usize {
        lock(&self.tables).weeks.len()
    }

    /// Number of stored pharmacies across all weeks.
    #[must_use]
    pub fn pharmacy_count(&self) -> usize {
        lock(&self.tables).pharmacies.len()
    }

    fn check(&self, op: Operation) -> Result<(), StoreError> {
        let mut faults = lock(&self.faults);
        match faults.get_mut(&op) {
            Some(0) => Err(StoreError::Unavailable(format!("injected fault in {op:?}"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn tables(&self, op: Operation) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.check(op)?;
        Ok(lock(&self.tables))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn list_weeks(&self) -> Result<Vec<WeekSchedule>, StoreError> {
        let tables = self.tables(Operation::ListWeeks)?;
        Ok(tables
            .weeks
            .iter()
            .map(|(id, label)| {
                let pharmacies = tables
                    .pharmacies
                    .iter()
                    .filter(|(week, _)| week == id)
                    .map(|(_, pharmacy)| pharmacy.clone())
                    .collect();
                WeekSchedule::new(label.clone(), pharmacies)
            })
            .collect())
    }

    async fn delete_all_pharmacies(&self) -> Result<u64, StoreError> {
        let mut tables = self.tables(Operation::DeletePharmacies)?;
        let count = tables.pharmacies.len() as u64;
        tables.pharmacies.clear();
        Ok(count)
    }

    async fn delete_all_weeks(&self) -> Result<u64, StoreError> {
        let mut tables = self.tables(Operation::DeleteWeeks)?;
        let count = tables.weeks.len() as u64;
        tables.weeks.clear();
        Ok(count)
    }

    async fn insert_week(&self, label: &str) -> Result<WeekId, StoreError> {
        let mut tables = self.tables(Operation::InsertWeek)?;
        let id = WeekId::new(tables.next_id());
        tables.weeks.push((id, label.to_owned()));
        Ok(id)
    }

    async fn insert_pharmacies(
        &self,
        week: WeekId,
        pharmacies: &[Pharmacy],
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables(Operation::InsertPharmacies)?;
        tables
            .pharmacies
            .extend(pharmacies.iter().map(|pharmacy| (week, pharmacy.clone())));
        Ok(pharmacies.len() as u64)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<HealthPost>, StoreError> {
        let tables = self.tables(Operation::ListPosts)?;
        let mut posts = tables.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn create_post(&self, post: &NewHealthPost) -> Result<HealthPost, StoreError> {
        let mut tables = self.tables(Operation::CreatePost)?;
        let created = HealthPost {
            id: PostId::new(tables.next_id()),
            title: post.title.clone(),
            body: post.body.clone(),
            image_url: post.image_url.clone(),
            created_at: Utc::now(),
            publish_at: post.publish_at,
            likes: 0,
        };
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(
        &self,
        id: PostId,
        update: &HealthPostUpdate,
    ) -> Result<HealthPost, StoreError> {
        let mut tables = self.tables(Operation::UpdatePost)?;
        let post = tables.post_mut(id)?;
        update.apply_to(post);
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, StoreError> {
        let mut tables = self.tables(Operation::DeletePost)?;
        let before = tables.posts.len();
        tables.posts.retain(|post| post.id != id);
        let deleted = tables.posts.len() < before;
        if deleted {
            tables.comments.retain(|comment| comment.post_id != id);
        }
        Ok(deleted)
    }

    async fn increment_likes(&self, id: PostId) -> Result<u32, StoreError> {
        let mut tables = self.tables(Operation::IncrementLikes)?;
        let post = tables.post_mut(id)?;
        post.likes = post.likes.saturating_add(1);
        Ok(post.likes)
    }

    async fn decrement_likes(&self, id: PostId) -> Result<u32, StoreError> {
        let mut tables = self.tables(Operation::DecrementLikes)?;
        let post = tables.post_mut(id)?;
        post.likes = post.likes.saturating_sub(1);
        Ok(post.likes)
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables(Operation::ListComments)?;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn insert_comment(
        &self,
        post: PostId,
        body: &CommentBody,
    ) -> Result<Comment, StoreError> {
        let mut tables = self.tables(Operation::InsertComment)?;
        tables.post_mut(post)?;
        let comment = Comment {
            id: CommentId::new(tables.next_id()),
            post_id: post,
            body: body.as_str().to_owned(),
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, StoreError> {
        let mut tables = self.tables(Operation::InsertFeedback)?;
        let stored = Feedback {
            id: FeedbackId::new(tables.next_id()),
            kind: feedback.kind,
            content: feedback.content.as_str().to_owned(),
            created_at: Utc::now(),
        };
        tables.feedback.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check(Operation::Ping)
    }
}
