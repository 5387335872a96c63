// src/db/vessel_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::vessel::{CommentView, Vessel, VesselComment},
};

/// Campos descritivos opcionais de uma embarcação nova.
#[derive(Debug, Clone, Default)]
pub struct VesselFields<'a> {
    pub make: Option<&'a str>,
    pub model: Option<&'a str>,
    pub year: Option<i32>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
}

/// PATCH: `None` mantém; `Some(None)` limpa a coluna.
#[derive(Debug, Clone, Default)]
pub struct VesselPatch<'a> {
    pub name: Option<&'a str>,
    pub make: Option<Option<&'a str>>,
    pub model: Option<Option<&'a str>>,
    pub year: Option<Option<i32>>,
    pub description: Option<Option<&'a str>>,
    pub location: Option<Option<&'a str>>,
}

#[derive(Clone)]
pub struct VesselRepository {
    pool: PgPool,
}

impl VesselRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, org_id: Uuid) -> Result<Vec<Vessel>, AppError> {
        let vessels = sqlx::query_as::<_, Vessel>(
            "SELECT * FROM vessels WHERE org_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(vessels)
    }

    /// Sempre filtrando pelo org_id: embarcação de outro tenant = não encontrada.
    pub async fn find<'e, E>(&self, executor: E, org_id: Uuid, vessel_id: Uuid) -> Result<Option<Vessel>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vessel = sqlx::query_as::<_, Vessel>(
            "SELECT * FROM vessels WHERE id = $1 AND org_id = $2",
        )
        .bind(vessel_id)
        .bind(org_id)
        .fetch_optional(executor)
        .await?;
        Ok(vessel)
    }

    pub async fn count_for_org<'e, E>(&self, executor: E, org_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vessels WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        org_id: Uuid,
        name: &str,
        fields: &VesselFields<'_>,
    ) -> Result<Vessel, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vessel = sqlx::query_as::<_, Vessel>(
            r#"
            INSERT INTO vessels (org_id, name, make, model, year, description, location)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(org_id)
        .bind(name)
        .bind(fields.make)
        .bind(fields.model)
        .bind(fields.year)
        .bind(fields.description)
        .bind(fields.location)
        .fetch_one(executor)
        .await?;
        Ok(vessel)
    }

    pub async fn update(
        &self,
        org_id: Uuid,
        vessel_id: Uuid,
        patch: &VesselPatch<'_>,
    ) -> Result<Option<Vessel>, AppError> {
        let vessel = sqlx::query_as::<_, Vessel>(
            r#"
            UPDATE vessels
            SET name = COALESCE($3, name),
                make = CASE WHEN $4 THEN $5 ELSE make END,
                model = CASE WHEN $6 THEN $7 ELSE model END,
                year = CASE WHEN $8 THEN $9 ELSE year END,
                description = CASE WHEN $10 THEN $11 ELSE description END,
                location = CASE WHEN $12 THEN $13 ELSE location END,
                updated_at = now()
            WHERE id = $1 AND org_id = $2
            RETURNING *
            "#,
        )
        .bind(vessel_id)
        .bind(org_id)
        .bind(patch.name)
        .bind(patch.make.is_some())
        .bind(patch.make.flatten())
        .bind(patch.model.is_some())
        .bind(patch.model.flatten())
        .bind(patch.year.is_some())
        .bind(patch.year.flatten())
        .bind(patch.description.is_some())
        .bind(patch.description.flatten())
        .bind(patch.location.is_some())
        .bind(patch.location.flatten())
        .fetch_optional(&self.pool)
        .await?;
        Ok(vessel)
    }

    /// Remove a embarcação; o banco apaga em cascata tudo que pertence a ela.
    pub async fn delete(&self, org_id: Uuid, vessel_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vessels WHERE id = $1 AND org_id = $2")
            .bind(vessel_id)
            .bind(org_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Comentários ---

    pub async fn list_comments(&self, vessel_id: Uuid) -> Result<Vec<CommentView>, AppError> {
        let comments = sqlx::query_as::<_, CommentView>(
            r#"
            SELECT c.*, u.name AS author_name, u.email AS author_email
            FROM vessel_comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.vessel_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(vessel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    pub async fn create_comment(&self, vessel_id: Uuid, user_id: Uuid, body: &str) -> Result<VesselComment, AppError> {
        let comment = sqlx::query_as::<_, VesselComment>(
            r#"
            INSERT INTO vessel_comments (vessel_id, user_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(vessel_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }
}
