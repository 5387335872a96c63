// src/db/trip_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::trips::VesselTrip};

#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, vessel_id: Uuid, limit: i64) -> Result<Vec<VesselTrip>, AppError> {
        let trips = sqlx::query_as::<_, VesselTrip>(
            r#"
            SELECT * FROM vessel_trips
            WHERE vessel_id = $1
            ORDER BY logged_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(vessel_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    pub async fn find_in_org<'e, E>(&self, executor: E, org_id: Uuid, trip_id: Uuid) -> Result<Option<VesselTrip>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let trip = sqlx::query_as::<_, VesselTrip>(
            r#"
            SELECT t.* FROM vessel_trips t
            JOIN vessels v ON v.id = t.vessel_id
            WHERE t.id = $1 AND v.org_id = $2
            "#,
        )
        .bind(trip_id)
        .bind(org_id)
        .fetch_optional(executor)
        .await?;
        Ok(trip)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        vessel_id: Uuid,
        hours: Decimal,
        logged_at: Option<DateTime<Utc>>,
        note: Option<&str>,
        user_id: Uuid,
    ) -> Result<VesselTrip, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let trip = sqlx::query_as::<_, VesselTrip>(
            r#"
            INSERT INTO vessel_trips (vessel_id, hours, logged_at, note, created_by_user_id)
            VALUES ($1, $2, COALESCE($3, now()), $4, $5)
            RETURNING *
            "#,
        )
        .bind(vessel_id)
        .bind(hours)
        .bind(logged_at)
        .bind(note)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(trip)
    }

    pub async fn update(
        &self,
        trip_id: Uuid,
        hours: Option<Decimal>,
        logged_at: Option<DateTime<Utc>>,
        note: Option<Option<&str>>,
    ) -> Result<VesselTrip, AppError> {
        let trip = sqlx::query_as::<_, VesselTrip>(
            r#"
            UPDATE vessel_trips
            SET hours = COALESCE($2, hours),
                logged_at = COALESCE($3, logged_at),
                note = CASE WHEN $4 THEN $5 ELSE note END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(hours)
        .bind(logged_at)
        .bind(note.is_some())
        .bind(note.flatten())
        .fetch_one(&self.pool)
        .await?;
        Ok(trip)
    }

    /// Os ajustes gerados pela viagem continuam (reference_trip_id vira NULL).
    pub async fn delete(&self, trip_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM vessel_trips WHERE id = $1")
            .bind(trip_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soma das horas de todas as viagens (0 sem viagens).
    pub async fn total_hours<'e, E>(&self, executor: E, vessel_id: Uuid) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(hours), 0) FROM vessel_trips WHERE vessel_id = $1",
        )
        .bind(vessel_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }
}
