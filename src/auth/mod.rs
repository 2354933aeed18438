use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{refresh_token, user},
    errors::ServiceError,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CUSTOMER: &str = "customer";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Refresh tokens are opaque random strings; only their SHA-256 lands in
/// the database.
fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// JWT issuance/validation and refresh-token rotation.
pub struct AuthService {
    db: Arc<DbPool>,
    jwt_secret: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl AuthService {
    pub fn new(db: Arc<DbPool>, cfg: &AppConfig) -> Self {
        Self {
            db,
            jwt_secret: cfg.jwt_secret.clone(),
            access_ttl_secs: cfg.jwt_expiration,
            refresh_ttl_secs: cfg.refresh_token_expiration,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, ServiceError> {
        request.validate()?;

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(request.email.as_str()))
            .one(&*self.db)
            .await?;

        // Same rejection for unknown email and wrong password.
        let account = match account {
            Some(account) if verify_password(&request.password, &account.password_hash) => account,
            _ => {
                return Err(ServiceError::Unauthorized(
                    "Invalid email or password".to_string(),
                ))
            }
        };

        let pair = self.issue_pair(&account).await?;
        info!(user_id = %account.id, "User logged in");
        Ok(pair)
    }

    /// Rotation: the presented token's row is revoked and replaced in one
    /// transaction, so a replayed refresh token is dead on arrival.
    #[instrument(skip(self, presented))]
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, ServiceError> {
        let digest = token_digest(presented.trim());
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let row = refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(digest))
            .one(&txn)
            .await?
            .filter(|row| row.revoked_at.is_none() && row.expires_at > now)
            .ok_or_else(|| {
                ServiceError::Unauthorized("Refresh token is invalid or expired".to_string())
            })?;

        let account = user::Entity::find_by_id(row.user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))?;

        let mut revoked: refresh_token::ActiveModel = row.into();
        revoked.revoked_at = Set(Some(now));
        revoked.update(&txn).await?;

        let new_token = generate_refresh_token();
        refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            token_hash: Set(token_digest(&new_token)),
            expires_at: Set(now + Duration::seconds(self.refresh_ttl_secs as i64)),
            revoked_at: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(TokenPair {
            access_token: self.issue_access_token(&account)?,
            refresh_token: new_token,
            token_type: "Bearer",
            expires_in: self.access_ttl_secs,
        })
    }

    /// Revokes the presented refresh token. Unknown tokens are a no-op.
    #[instrument(skip(self, presented))]
    pub async fn logout(&self, presented: &str) -> Result<(), ServiceError> {
        let digest = token_digest(presented.trim());
        if let Some(row) = refresh_token::Entity::find()
            .filter(refresh_token::Column::TokenHash.eq(digest))
            .one(&*self.db)
            .await?
        {
            let mut active: refresh_token::ActiveModel = row.into();
            active.revoked_at = Set(Some(Utc::now()));
            active.update(&*self.db).await?;
        }
        Ok(())
    }

    /// Deletes expired and revoked refresh-token rows. Plain batch delete;
    /// callers decide when to run it.
    pub async fn purge_expired_tokens(&self) -> Result<u64, ServiceError> {
        let result = refresh_token::Entity::delete_many()
            .filter(
                refresh_token::Column::ExpiresAt
                    .lt(Utc::now())
                    .or(refresh_token::Column::RevokedAt.is_not_null()),
            )
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized("Invalid or expired token".to_string()))
    }

    fn issue_access_token(&self, account: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_ttl_secs as i64)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token signing failed: {e}")))
    }

    async fn issue_pair(&self, account: &user::Model) -> Result<TokenPair, ServiceError> {
        let now = Utc::now();
        let refresh = generate_refresh_token();

        refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.id),
            token_hash: Set(token_digest(&refresh)),
            expires_at: Set(now + Duration::seconds(self.refresh_ttl_secs as i64)),
            revoked_at: Set(None),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        Ok(TokenPair {
            access_token: self.issue_access_token(account)?,
            refresh_token: refresh,
            token_type: "Bearer",
            expires_in: self.access_ttl_secs,
        })
    }
}

/// Authenticated requester, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = auth.validate_token(token)?;
        let user_id = Uuid::from_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Malformed token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

/// Requester that must carry the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ServiceError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
