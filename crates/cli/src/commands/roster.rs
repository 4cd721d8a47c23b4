//! Roster commands.
//!
//! # Usage
//!
//! ```bash
//! # Replace the roster straight in the database
//! pharmaguard roster import gardes.json
//!
//! # Replace the roster through the portal API
//! pharmaguard roster upload gardes.json
//!
//! # Browse
//! pharmaguard roster show
//! pharmaguard roster show --week 3
//! pharmaguard roster show --prev 1 --offline
//! ```
//!
//! # Environment Variables
//!
//! - `PORTAL_DATABASE_URL`, `PORTAL_ADMIN_PASSWORD` - used by `import`
//! - `PORTAL_ADMIN_PASSWORD`, `PHARMAGUARD_PORTAL_URL` - used by `upload`
//! - `PHARMAGUARD_DEVICE_FILE` - roster cache used by `show`
//! - `PORTAL_ROSTER_CUTOVER` - changeover used by `show` when offline

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use secrecy::ExposeSecret;
use thiserror::Error;

use pharmaguard_core::{ActiveWeekResolver, ScheduleNavigator};
use pharmaguard_portal::cache::ListingCache;
use pharmaguard_portal::config::{ConfigError, PortalConfig, roster_cutover_from_env};
use pharmaguard_portal::db::{PgStore, create_pool};
use pharmaguard_portal::routes::roster::RosterResponse;
use pharmaguard_portal::services::{AdminPassword, RosterError, RosterService};

use super::emit;
use crate::client::{ClientError, PortalClient};
use crate::device::FileDeviceStorage;
use crate::render;

/// Errors from roster commands.
#[derive(Debug, Error)]
pub enum RosterCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing environment variable: PORTAL_ADMIN_PASSWORD")]
    MissingPassword,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot read roster file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Navigation requested on the command line, applied from the active week.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moves {
    /// 1-based week number.
    pub week: Option<usize>,
    pub next: usize,
    pub prev: usize,
}

impl Moves {
    fn apply(self, navigator: &mut ScheduleNavigator) {
        if let Some(index) = self.week.and_then(|w| w.checked_sub(1)) {
            navigator.jump_to(index);
        }
        for _ in 0..self.next {
            navigator.next();
        }
        for _ in 0..self.prev {
            navigator.prev();
        }
    }
}

/// Replace the stored roster from a file, writing directly to the database.
///
/// # Errors
///
/// Returns `RosterCommandError` if the file, configuration or store fails.
/// A partial replacement is reported as such; rerun the import to repair it.
pub async fn import(file: &Path) -> Result<(), RosterCommandError> {
    let config = PortalConfig::from_env()?;
    let document = tokio::fs::read(file).await?;

    tracing::info!("Connecting to portal database...");
    let pool = create_pool(&config.database_url).await?;

    let service = RosterService::new(
        Arc::new(PgStore::new(pool)),
        ListingCache::new(config.cache_ttl),
        AdminPassword::new(config.admin_password.clone()),
        ActiveWeekResolver::new(config.roster_cutover),
    );

    let report = service
        .replace_from_document(config.admin_password.expose_secret(), &document)
        .await?;

    tracing::info!(
        weeks = report.weeks,
        pharmacies = report.pharmacies,
        "Roster imported"
    );
    emit(&format!(
        "Imported {} week(s), {} pharmacy entries\n",
        report.weeks, report.pharmacies
    ));
    Ok(())
}

/// Replace the roster through a running portal.
///
/// # Errors
///
/// Returns `RosterCommandError::Client` with the portal's message on failure.
pub async fn upload(file: &Path) -> Result<(), RosterCommandError> {
    let password =
        std::env::var("PORTAL_ADMIN_PASSWORD").map_err(|_| RosterCommandError::MissingPassword)?;
    let document = tokio::fs::read(file).await?;

    let response = PortalClient::from_env()
        .upload_roster(&password, document)
        .await?;

    emit(&format!("{}\n", response.message));
    Ok(())
}

/// Show the roster, starting from the active week.
///
/// Fetches from the portal and refreshes the device cache; the portal's
/// active index is used as is. When the portal cannot be reached, or with
/// `offline`, the cached roster is shown and the active week is resolved
/// locally with `PORTAL_ROSTER_CUTOVER`.
///
/// # Errors
///
/// Returns `RosterCommandError::Config` if `PORTAL_ROSTER_CUTOVER` is
/// malformed. Network errors fall back to the cache.
pub async fn show(moves: Moves, offline: bool) -> Result<(), RosterCommandError> {
    let storage = FileDeviceStorage::from_env();
    let resolver = ActiveWeekResolver::new(roster_cutover_from_env()?);
    let now = Local::now().naive_local();

    let mut navigator = if offline {
        ScheduleNavigator::restore(&storage, resolver, now)
    } else {
        match PortalClient::from_env().roster().await {
            Ok(listing) => {
                let navigator = from_listing(listing, resolver);
                if let Err(e) = navigator.persist(&storage) {
                    tracing::warn!(error = %e, "Could not update the roster cache");
                }
                navigator
            }
            Err(e) => {
                tracing::warn!(error = %e, "Portal unreachable, showing cached roster");
                ScheduleNavigator::restore(&storage, resolver, now)
            }
        }
    };

    moves.apply(&mut navigator);
    emit(&render::week(&navigator));
    Ok(())
}

/// Start from the week the portal reports as active.
fn from_listing(listing: RosterResponse, resolver: ActiveWeekResolver) -> ScheduleNavigator {
    ScheduleNavigator::with_cursor(listing.weeks, resolver, listing.active_index)
}
