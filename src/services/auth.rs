// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, MeResponse, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    auth_provider: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, auth_provider: String) -> Self {
        Self { user_repo, jwt_secret, auth_provider }
    }

    /// Só verifica assinatura e expiração (HS256). Não toca no banco.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    /// Token válido → usuário local (criado ou atualizado a cada requisição).
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;
        if claims.sub.trim().is_empty() || claims.email.trim().is_empty() {
            return Err(AppError::InvalidToken);
        }

        self.user_repo
            .upsert_from_identity(&self.auth_provider, &claims.sub, &claims.email, claims.name.as_deref())
            .await
    }

    pub async fn me(&self, user: User) -> Result<MeResponse, AppError> {
        let memberships = self.user_repo.list_memberships(user.id).await?;
        Ok(MeResponse { user, memberships })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sqlx::postgres::PgPoolOptions;

    const SECRET: &str = "test-secret";

    fn service() -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/dockops_test")
            .expect("lazy pool");
        AuthService::new(UserRepository::new(pool), SECRET.to_string(), "default".to_string())
    }

    fn token(secret: &str, expires_in: Duration) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: "user_123".to_string(),
            email: "captain@example.com".to_string(),
            name: Some("Ana".to_string()),
            exp: (now + expires_in).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).expect("encode")
    }

    #[tokio::test]
    async fn decodes_a_valid_token() {
        let claims = service()
            .decode_claims(&token(SECRET, Duration::hours(1)))
            .expect("claims");
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn rejects_wrong_secret_and_expired_tokens() {
        let service = service();
        assert!(matches!(
            service.decode_claims(&token("other", Duration::hours(1))),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            service.decode_claims(&token(SECRET, Duration::hours(-2))),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(service.decode_claims("garbage"), Err(AppError::InvalidToken)));
    }
}
