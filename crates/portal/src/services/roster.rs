//! Roster reads and credential-checked replacement.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use pharmaguard_core::{ActiveWeekResolver, WeekSchedule};

use super::AdminPassword;
use crate::cache::{CacheKey, ListingCache};
use crate::store::{PortalStore, ReplaceError, ReplaceReport, StoreError};

/// Errors from roster operations.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The supplied admin credential did not match.
    #[error("invalid admin credential")]
    Unauthorized,

    /// The uploaded document does not have the expected shape.
    #[error("invalid roster document: {0}")]
    InvalidDocument(String),

    /// The replacement failed and the previous roster is intact.
    #[error("roster replacement failed: {0}")]
    ReplaceFailed(#[source] StoreError),

    /// The replacement stopped midway; the stored roster is incomplete.
    #[error("roster partially replaced ({weeks_written} week(s) written): {source}")]
    PartiallyReplaced {
        weeks_written: usize,
        #[source]
        source: StoreError,
    },

    /// Reading the roster failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ReplaceError> for RosterError {
    fn from(err: ReplaceError) -> Self {
        match err {
            ReplaceError::Failed(source) => Self::ReplaceFailed(source),
            ReplaceError::Partial {
                weeks_written,
                source,
            } => Self::PartiallyReplaced {
                weeks_written,
                source,
            },
        }
    }
}

/// Roster service.
#[derive(Clone)]
pub struct RosterService {
    store: Arc<dyn PortalStore>,
    cache: ListingCache,
    admin: AdminPassword,
    resolver: ActiveWeekResolver,
}

impl RosterService {
    #[must_use]
    pub fn new(
        store: Arc<dyn PortalStore>,
        cache: ListingCache,
        admin: AdminPassword,
        resolver: ActiveWeekResolver,
    ) -> Self {
        Self {
            store,
            cache,
            admin,
            resolver,
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &ActiveWeekResolver {
        &self.resolver
    }

    /// All weeks, served from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RosterError::Store` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn weeks(&self) -> Result<Arc<Vec<WeekSchedule>>, RosterError> {
        if let Some(weeks) = self.cache.roster().await {
            debug!("Cache hit for roster");
            return Ok(weeks);
        }

        let generation = self.cache.generation(CacheKey::Roster);
        let weeks = Arc::new(self.store.list_weeks().await?);
        self.cache.put_roster(weeks.clone(), generation).await;
        Ok(weeks)
    }

    /// Index of the week active at local time `now`, if any.
    #[must_use]
    pub fn active_index(&self, weeks: &[WeekSchedule], now: NaiveDateTime) -> Option<usize> {
        self.resolver.resolve(now, weeks)
    }

    /// Replace the roster from an uploaded JSON document.
    ///
    /// The credential is checked before the document is even parsed.
    ///
    /// # Errors
    ///
    /// - `RosterError::Unauthorized` on a credential mismatch (nothing changes)
    /// - `RosterError::InvalidDocument` if the document is malformed (nothing changes)
    /// - `RosterError::ReplaceFailed` / `RosterError::PartiallyReplaced` from the store
    #[instrument(skip(self, credential, document), fields(bytes = document.len()))]
    pub async fn replace_from_document(
        &self,
        credential: &str,
        document: &[u8],
    ) -> Result<ReplaceReport, RosterError> {
        self.authorize(credential)?;
        let weeks = parse_document(document)?;
        self.store_weeks(&weeks).await
    }

    /// Replace the roster with already-decoded weeks.
    ///
    /// # Errors
    ///
    /// Same as [`RosterService::replace_from_document`].
    #[instrument(skip(self, credential, weeks), fields(weeks = weeks.len()))]
    pub async fn replace(
        &self,
        credential: &str,
        weeks: Vec<WeekSchedule>,
    ) -> Result<ReplaceReport, RosterError> {
        self.authorize(credential)?;
        validate_weeks(&weeks)?;
        self.store_weeks(&weeks).await
    }

    fn authorize(&self, credential: &str) -> Result<(), RosterError> {
        if self.admin.verify(credential) {
            Ok(())
        } else {
            warn!("Rejected roster replacement with invalid credential");
            Err(RosterError::Unauthorized)
        }
    }

    async fn store_weeks(&self, weeks: &[WeekSchedule]) -> Result<ReplaceReport, RosterError> {
        let result = self.store.replace_all_weeks(weeks).await;
        // A partial write changed the store too, so drop the cache either way.
        self.cache.invalidate(CacheKey::Roster).await;

        let report = result?;
        info!(
            weeks = report.weeks,
            pharmacies = report.pharmacies,
            "Roster upload applied"
        );
        Ok(report)
    }
}

/// Decode and validate a roster document.
///
/// The document must be a JSON array of weeks, each with a label and a
/// `pharmacies` array; French field names are accepted.
fn parse_document(document: &[u8]) -> Result<Vec<WeekSchedule>, RosterError> {
    let value: serde_json::Value = serde_json::from_slice(document)
        .map_err(|e| RosterError::InvalidDocument(format!("not valid JSON: {e}")))?;
    if !value.is_array() {
        return Err(RosterError::InvalidDocument(
            "expected an array of weeks".to_string(),
        ));
    }

    let weeks: Vec<WeekSchedule> =
        serde_json::from_value(value).map_err(|e| RosterError::InvalidDocument(e.to_string()))?;
    validate_weeks(&weeks)?;
    Ok(weeks)
}

fn validate_weeks(weeks: &[WeekSchedule]) -> Result<(), RosterError> {
    let mut labels = HashSet::new();
    for (position, week) in weeks.iter().enumerate() {
        let number = position + 1;
        if week.label.trim().is_empty() {
            return Err(RosterError::InvalidDocument(format!(
                "week {number} has an empty label"
            )));
        }
        if !labels.insert(week.label.trim()) {
            warn!(label = %week.label, "Roster lists the same week label twice");
        }
        if let Err(e) = week.interval() {
            warn!(label = %week.label, error = %e, "Week label will never be active");
        }
        if week.pharmacies.iter().any(|p| p.name.trim().is_empty()) {
            return Err(RosterError::InvalidDocument(format!(
                "week {number} ({}) has a pharmacy without a name",
                week.label
            )));
        }
        if let Some(name) = week.duplicate_pharmacy() {
            return Err(RosterError::InvalidDocument(format!(
                "week {number} ({}) lists pharmacy {name:?} more than once",
                week.label
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use pharmaguard_core::{
        Comment, CommentBody, Feedback, HealthPost, HealthPostUpdate, NewFeedback,
        NewHealthPost, Pharmacy, PostId, WeekId,
    };
    use secrecy::SecretString;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::store::{FeedbackStore, MemoryStore, Operation, PostStore, RosterStore};

    const PASSWORD: &str = "pg-admin";

    const DOCUMENT: &str = r#"[
        {
            "semaine": "01/01/24 au 07/01/24",
            "pharmacies": [
                {"nom": "Pharmacie du Lac", "localisation": "Rue 12", "contact1": "0102", "contact2": ""},
                {"nom": "Pharmacie Centrale", "localisation": "Place du marché", "contact1": "0304", "contact2": "0506"}
            ]
        },
        {
            "label": "08/01/24 au 14/01/24",
            "pharmacies": [
                {"name": "Pharmacie de la Gare", "location": "Avenue 3", "primary_contact": "0708", "secondary_contact": ""}
            ]
        }
    ]"#;

    fn service(store: Arc<MemoryStore>) -> RosterService {
        RosterService::new(
            store,
            ListingCache::new(Duration::from_secs(60)),
            AdminPassword::new(SecretString::from(PASSWORD)),
            ActiveWeekResolver::default(),
        )
    }

    async fn seeded() -> (Arc<MemoryStore>, RosterService) {
        let store = Arc::new(MemoryStore::new());
        let service = service(store.clone());
        service
            .replace_from_document(PASSWORD, DOCUMENT.as_bytes())
            .await
            .unwrap();
        (store, service)
    }

    #[tokio::test]
    async fn test_replace_from_document_round_trip() {
        let (_store, service) = seeded().await;
        let weeks = service.weeks().await.unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].label, "01/01/24 au 07/01/24");
        assert_eq!(weeks[0].pharmacies[1].name, "Pharmacie Centrale");
        assert_eq!(weeks[0].pharmacies[1].secondary_contact, "0506");
        assert_eq!(weeks[1].pharmacies[0].location, "Avenue 3");
    }

    #[tokio::test]
    async fn test_wrong_credential_changes_nothing() {
        let (store, service) = seeded().await;
        let before = store.list_weeks().await.unwrap();

        let err = service
            .replace_from_document("wrong", b"[]")
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::Unauthorized));
        assert_eq!(store.list_weeks().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_credential_checked_before_parsing() {
        let (_store, service) = seeded().await;
        let err = service
            .replace_from_document("wrong", b"{not json")
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::Unauthorized));
    }

    #[tokio::test]
    async fn test_invalid_shapes_change_nothing() {
        let (store, service) = seeded().await;
        let before = store.list_weeks().await.unwrap();

        for document in [
            r#"{"semaine": "01/01/24 au 07/01/24", "pharmacies": []}"#,
            r#"[{"semaine": "01/01/24 au 07/01/24"}]"#,
            r#"[{"semaine": "01/01/24 au 07/01/24", "pharmacies": "none"}]"#,
            r#"[{"pharmacies": []}]"#,
            r#"[{"semaine": " ", "pharmacies": []}]"#,
            r#"[{"semaine": "01/01/24 au 07/01/24", "pharmacies": [{"nom": ""}]}]"#,
            r#"[{"semaine": "01/01/24 au 07/01/24", "pharmacies": [{"nom": "A"}, {"nom": "A"}]}]"#,
            "not json",
        ] {
            let err = service
                .replace_from_document(PASSWORD, document.as_bytes())
                .await
                .unwrap_err();
            assert!(
                matches!(err, RosterError::InvalidDocument(_)),
                "expected invalid document for {document}"
            );
        }
        assert_eq!(store.list_weeks().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_replace_invalidates_cached_roster() {
        let (_store, service) = seeded().await;
        assert_eq!(service.weeks().await.unwrap().len(), 2);

        service
            .replace(
                PASSWORD,
                vec![WeekSchedule::new("15/01/24 au 21/01/24", Vec::new())],
            )
            .await
            .unwrap();
        let weeks = service.weeks().await.unwrap();
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].label, "15/01/24 au 21/01/24");
    }

    /// Store whose roster reads can be parked after loading, so a read can
    /// be made to finish after a replacement.
    struct HeldReadStore {
        inner: Arc<MemoryStore>,
        hold: AtomicBool,
        loaded: AtomicUsize,
        gate: Semaphore,
    }

    impl HeldReadStore {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                hold: AtomicBool::new(false),
                loaded: AtomicUsize::new(0),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl RosterStore for HeldReadStore {
        async fn list_weeks(&self) -> Result<Vec<WeekSchedule>, StoreError> {
            let weeks = self.inner.list_weeks().await?;
            if self.hold.load(Ordering::SeqCst) {
                self.loaded.fetch_add(1, Ordering::SeqCst);
                self.gate.acquire().await.unwrap().forget();
            }
            Ok(weeks)
        }

        async fn delete_all_pharmacies(&self) -> Result<u64, StoreError> {
            self.inner.delete_all_pharmacies().await
        }

        async fn delete_all_weeks(&self) -> Result<u64, StoreError> {
            self.inner.delete_all_weeks().await
        }

        async fn insert_week(&self, label: &str) -> Result<WeekId, StoreError> {
            self.inner.insert_week(label).await
        }

        async fn insert_pharmacies(
            &self,
            week: WeekId,
            pharmacies: &[Pharmacy],
        ) -> Result<u64, StoreError> {
            self.inner.insert_pharmacies(week, pharmacies).await
        }
    }

    #[async_trait]
    impl PostStore for HeldReadStore {
        async fn list_posts(&self) -> Result<Vec<HealthPost>, StoreError> {
            self.inner.list_posts().await
        }

        async fn create_post(&self, post: &NewHealthPost) -> Result<HealthPost, StoreError> {
            self.inner.create_post(post).await
        }

        async fn update_post(
            &self,
            id: PostId,
            update: &HealthPostUpdate,
        ) -> Result<HealthPost, StoreError> {
            self.inner.update_post(id, update).await
        }

        async fn delete_post(&self, id: PostId) -> Result<bool, StoreError> {
            self.inner.delete_post(id).await
        }

        async fn increment_likes(&self, id: PostId) -> Result<u32, StoreError> {
            self.inner.increment_likes(id).await
        }

        async fn decrement_likes(&self, id: PostId) -> Result<u32, StoreError> {
            self.inner.decrement_likes(id).await
        }

        async fn list_comments(&self, post: PostId) -> Result<Vec<Comment>, StoreError> {
            self.inner.list_comments(post).await
        }

        async fn insert_comment(
            &self,
            post: PostId,
            body: &CommentBody,
        ) -> Result<Comment, StoreError> {
            self.inner.insert_comment(post, body).await
        }
    }

    #[async_trait]
    impl FeedbackStore for HeldReadStore {
        async fn insert_feedback(&self, feedback: &NewFeedback) -> Result<Feedback, StoreError> {
            self.inner.insert_feedback(feedback).await
        }
    }

    #[async_trait]
    impl PortalStore for HeldReadStore {
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_read_overlapping_replace_does_not_cache_old_roster() {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(HeldReadStore::new(memory));
        let service = RosterService::new(
            store.clone(),
            ListingCache::new(Duration::from_secs(300)),
            AdminPassword::new(SecretString::from(PASSWORD)),
            ActiveWeekResolver::default(),
        );
        service
            .replace(
                PASSWORD,
                vec![WeekSchedule::new("01/01/24 au 07/01/24", Vec::new())],
            )
            .await
            .unwrap();

        store.hold.store(true, Ordering::SeqCst);
        let reader = tokio::spawn({
            let service = service.clone();
            async move { service.weeks().await }
        });
        while store.loaded.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        store.hold.store(false, Ordering::SeqCst);

        service
            .replace_from_document(PASSWORD, DOCUMENT.as_bytes())
            .await
            .unwrap();
        store.gate.add_permits(1);

        // The parked read started before the replacement and may see the old roster.
        assert_eq!(reader.await.unwrap().unwrap().len(), 1);

        let weeks = service.weeks().await.unwrap();
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].label, "08/01/24 au 14/01/24");
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_and_cache_dropped() {
        let (store, service) = seeded().await;
        assert_eq!(service.weeks().await.unwrap().len(), 2);
        store.fail_after(Operation::InsertWeek, 1);

        let err = service
            .replace_from_document(PASSWORD, DOCUMENT.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RosterError::PartiallyReplaced {
                weeks_written: 1,
                ..
            }
        ));

        store.clear_faults();
        assert_eq!(service.weeks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_failure_is_distinct_from_partial() {
        let (store, service) = seeded().await;
        store.fail(Operation::DeletePharmacies);

        let err = service
            .replace_from_document(PASSWORD, DOCUMENT.as_bytes())
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::ReplaceFailed(_)));
    }

    #[tokio::test]
    async fn test_active_index() {
        let (_store, service) = seeded().await;
        let weeks = service.weeks().await.unwrap();
        let at = |d: u32, h: u32| {
            chrono::NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
        };
        assert_eq!(service.active_index(&weeks, at(8, 6)), Some(0));
        assert_eq!(service.active_index(&weeks, at(8, 8)), Some(1));
        assert_eq!(service.active_index(&weeks, at(20, 12)), None);
    }
}
