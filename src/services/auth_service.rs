use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::{AuthResponse, ChangePasswordPayload, LoginPayload, RegisterPayload};
use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::{TokenIssuer, TokenKind, TokenPair};

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(pool: PgPool, tokens: TokenIssuer) -> Self {
        Self { pool, tokens }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<AuthResponse> {
        let role = payload.role.unwrap_or(Role::Candidate);
        if !matches!(role, Role::Candidate | Role::Employer) {
            return Err(Error::Forbidden(
                "Only candidates and employers can self-register".to_string(),
            ));
        }
        let email = payload.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(&payload.password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(password_hash)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(&payload.phone)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, role = %role, "user registered");
        let tokens = self.tokens.issue_pair(user.id, user.role)?;
        Ok(AuthResponse { tokens, user })
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<AuthResponse> {
        let email = payload.email.trim().to_lowercase();
        let invalid = || Error::Unauthorized("Incorrect email or password".to_string());

        let user = self.find_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(&payload.password, &user.password_hash) {
            tracing::info!(user_id = %user.id, "login rejected: bad password");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(Error::Forbidden("Account is deactivated".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET last_login_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        let tokens = self.tokens.issue_pair(user.id, user.role)?;
        Ok(AuthResponse { tokens, user })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.decode(refresh_token, TokenKind::Refresh)?;
        let user = self.get_user(claims.user_id()?).await?;
        if !user.is_active {
            return Err(Error::Unauthorized("Account is deactivated".to_string()));
        }
        self.tokens.issue_pair(user.id, user.role)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    pub async fn change_password(&self, user_id: Uuid, payload: ChangePasswordPayload) -> Result<()> {
        let user = self.get_user(user_id).await?;
        if !verify_password(&payload.current_password, &user.password_hash) {
            return Err(Error::BadRequest("Current password is incorrect".to_string()));
        }
        let password_hash = hash_password(&payload.new_password)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        tracing::info!(%user_id, "password changed");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
