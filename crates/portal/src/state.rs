//! Application state shared across handlers.

use std::sync::Arc;

use pharmaguard_core::ActiveWeekResolver;

use crate::cache::ListingCache;
use crate::config::PortalConfig;
use crate::services::{AdminPassword, FeedService, RosterService};
use crate::store::PortalStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store, the services and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PortalConfig,
    store: Arc<dyn PortalStore>,
    admin: AdminPassword,
    roster: RosterService,
    feed: FeedService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Portal configuration
    /// * `store` - Backing store (`PostgreSQL` in production)
    #[must_use]
    pub fn new(config: PortalConfig, store: Arc<dyn PortalStore>) -> Self {
        let cache = ListingCache::new(config.cache_ttl);
        let admin = AdminPassword::new(config.admin_password.clone());
        let resolver = ActiveWeekResolver::new(config.roster_cutover);

        let roster = RosterService::new(store.clone(), cache.clone(), admin.clone(), resolver);
        let feed = FeedService::new(store.clone(), cache, admin.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                admin,
                roster,
                feed,
            }),
        }
    }

    /// Get a reference to the portal configuration.
    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub fn store(&self) -> &dyn PortalStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn admin_password(&self) -> &AdminPassword {
        &self.inner.admin
    }

    #[must_use]
    pub fn roster(&self) -> &RosterService {
        &self.inner.roster
    }

    #[must_use]
    pub fn feed(&self) -> &FeedService {
        &self.inner.feed
    }
}
