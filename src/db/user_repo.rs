// src/db/user_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{MyMembership, User},
};

// Repositório de usuários (tabela 'users')
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria ou atualiza o usuário vindo do provedor de identidade.
    /// E-mail e nome são sempre atualizados; `is_super_admin` nunca vem do token.
    pub async fn upsert_from_identity(
        &self,
        auth_provider: &str,
        auth_subject: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (auth_provider, auth_subject, email, name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT uq_users_provider_subject
            DO UPDATE SET
                email = EXCLUDED.email,
                name = COALESCE(EXCLUDED.name, users.name),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(auth_provider)
        .bind(auth_subject)
        .bind(email)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Organizações do usuário (qualquer status), para o GET /api/me.
    pub async fn list_memberships(&self, user_id: Uuid) -> Result<Vec<MyMembership>, AppError> {
        let rows = sqlx::query_as::<_, MyMembership>(
            r#"
            SELECT m.org_id, o.name AS org_name, o.is_active AS org_is_active, m.role, m.status
            FROM org_memberships m
            JOIN organizations o ON o.id = m.org_id
            WHERE m.user_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Lista global (super admin).
    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
