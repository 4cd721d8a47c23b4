//! Roster tables: `portal.week` and `portal.pharmacy`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use tracing::{debug, info, instrument, warn};

use pharmaguard_core::{Pharmacy, WeekId, WeekSchedule};

use super::PgStore;
use crate::store::{ReplaceError, ReplaceReport, RosterStore, StoreError};

/// Advisory lock serializing concurrent roster replacements.
const ROSTER_LOCK_KEY: i64 = 0x5047_5753;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct WeekRow {
    id: i32,
    label: String,
}

#[derive(Debug, sqlx::FromRow)]
struct PharmacyRow {
    week_id: i32,
    name: String,
    location: String,
    primary_contact: String,
    secondary_contact: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<PharmacyRow> for Pharmacy {
    fn from(row: PharmacyRow) -> Self {
        Self {
            name: row.name,
            location: row.location,
            primary_contact: row.primary_contact,
            secondary_contact: row.secondary_contact,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

async fn delete_pharmacies<'e, E: PgExecutor<'e>>(executor: E) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portal.pharmacy")
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn delete_weeks<'e, E: PgExecutor<'e>>(executor: E) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM portal.week").execute(executor).await?;
    Ok(result.rows_affected())
}

async fn insert_week<'e, E: PgExecutor<'e>>(executor: E, label: &str) -> Result<WeekId, sqlx::Error> {
    let (id,): (i32,) = sqlx::query_as("INSERT INTO portal.week (label) VALUES ($1) RETURNING id")
        .bind(label)
        .fetch_one(executor)
        .await?;
    Ok(WeekId::new(id))
}

async fn insert_pharmacies<'e, E: PgExecutor<'e>>(
    executor: E,
    week: WeekId,
    pharmacies: &[Pharmacy],
) -> Result<u64, sqlx::Error> {
    if pharmacies.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
        "INSERT INTO portal.pharmacy \
         (week_id, position, name, location, primary_contact, secondary_contact, latitude, longitude) ",
    );
    builder.push_values(
        pharmacies.iter().zip(0_i32..),
        |mut row, (pharmacy, position)| {
            row.push_bind(week)
                .push_bind(position)
                .push_bind(&pharmacy.name)
                .push_bind(&pharmacy.location)
                .push_bind(&pharmacy.primary_contact)
                .push_bind(&pharmacy.secondary_contact)
                .push_bind(pharmacy.latitude)
                .push_bind(pharmacy.longitude);
        },
    );

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

impl PgStore {
    /// Replace the roster inside one transaction.
    async fn replace_in_transaction(
        &self,
        weeks: &[WeekSchedule],
    ) -> Result<ReplaceReport, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ROSTER_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let deleted_pharmacies = delete_pharmacies(&mut *tx).await?;
        let deleted_weeks = delete_weeks(&mut *tx).await?;
        debug!(deleted_weeks, deleted_pharmacies, "Cleared previous roster");

        let mut report = ReplaceReport {
            weeks: 0,
            pharmacies: 0,
        };
        for week in weeks {
            let id = insert_week(&mut *tx, &week.label).await?;
            insert_pharmacies(&mut *tx, id, &week.pharmacies).await?;
            report.weeks += 1;
            report.pharmacies += week.pharmacies.len();
        }

        tx.commit().await?;
        Ok(report)
    }
}

#[async_trait]
impl RosterStore for PgStore {
    #[instrument(skip(self))]
    async fn list_weeks(&self) -> Result<Vec<WeekSchedule>, StoreError> {
        let weeks: Vec<WeekRow> = sqlx::query_as("SELECT id, label FROM portal.week ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let rows: Vec<PharmacyRow> = sqlx::query_as(
            r"
            SELECT week_id, name, location, primary_contact, secondary_contact,
                   latitude, longitude
            FROM portal.pharmacy
            ORDER BY week_id, position, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_week: HashMap<i32, Vec<Pharmacy>> = HashMap::new();
        for row in rows {
            by_week.entry(row.week_id).or_default().push(row.into());
        }

        Ok(weeks
            .into_iter()
            .map(|week| {
                let pharmacies = by_week.remove(&week.id).unwrap_or_default();
                WeekSchedule::new(week.label, pharmacies)
            })
            .collect())
    }

    async fn delete_all_pharmacies(&self) -> Result<u64, StoreError> {
        Ok(delete_pharmacies(&self.pool).await?)
    }

    async fn delete_all_weeks(&self) -> Result<u64, StoreError> {
        Ok(delete_weeks(&self.pool).await?)
    }

    async fn insert_week(&self, label: &str) -> Result<WeekId, StoreError> {
        Ok(insert_week(&self.pool, label).await?)
    }

    async fn insert_pharmacies(
        &self,
        week: WeekId,
        pharmacies: &[Pharmacy],
    ) -> Result<u64, StoreError> {
        Ok(insert_pharmacies(&self.pool, week, pharmacies).await?)
    }

    /// Atomic replacement: either the whole new roster is committed or the
    /// transaction rolls back and the previous roster stays in place.
    #[instrument(skip(self, weeks), fields(weeks = weeks.len()))]
    async fn replace_all_weeks(
        &self,
        weeks: &[WeekSchedule],
    ) -> Result<ReplaceReport, ReplaceError> {
        match self.replace_in_transaction(weeks).await {
            Ok(report) => {
                info!(
                    weeks = report.weeks,
                    pharmacies = report.pharmacies,
                    "Roster replaced"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Roster replacement rolled back");
                Err(ReplaceError::Failed(StoreError::Database(e)))
            }
        }
    }
}
