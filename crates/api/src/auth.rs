use crate::error::{ApiError, ApiResult};
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use revos_common::UserRecord;
use revos_core::storage::UserStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub issuer: String,
    pub audience: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "default-secret-change-in-production".to_string(),
            token_expiry_hours: 24,
            issuer: "revos".to_string(),
            audience: "revos-users".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login accepts either the username or the email address.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identity: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(config: AuthConfig, users: Arc<dyn UserStore>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
            users,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> ApiResult<LoginResponse> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_lowercase();

        if username.len() < 3 {
            return Err(ApiError::Validation(
                "Username must be at least 3 characters".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(ApiError::Validation(
                "Email address is not valid".to_string(),
            ));
        }
        if request.password.len() < 6 {
            return Err(ApiError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        if self.users.username_exists(&username).await? {
            return Err(ApiError::Conflict("Username is already taken".to_string()));
        }
        if self.users.email_exists(&email).await? {
            return Err(ApiError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash: self.hash_password(&request.password)?,
            created_at: Utc::now(),
        };
        self.users.insert_user(&user).await?;

        info!("Registered user {} ({})", user.username, user.id);
        self.login_response(&user)
    }

    pub async fn login(&self, request: LoginRequest) -> ApiResult<LoginResponse> {
        let user = self
            .users
            .find_user_by_identity(request.identity.trim())
            .await?
            .ok_or_else(|| ApiError::Authentication("Invalid credentials".to_string()))?;

        if !self.verify_password(&request.password, &user.password_hash)? {
            warn!("Failed login attempt for user {}", user.id);
            return Err(ApiError::Authentication("Invalid credentials".to_string()));
        }

        debug!("User {} logged in", user.id);
        self.login_response(&user)
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(token_data) => {
                debug!("Token verified for user: {}", token_data.claims.sub);
                Ok(token_data.claims)
            }
            Err(e) => {
                warn!("Token verification failed: {}", e);
                Err(ApiError::Authentication("Invalid token".to_string()))
            }
        }
    }

    fn login_response(&self, user: &UserRecord) -> ApiResult<LoginResponse> {
        Ok(LoginResponse {
            access_token: self.create_access_token(user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_expiry_hours * 3600,
            user: UserInfo {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
            },
        })
    }

    fn create_access_token(&self, user: &UserRecord) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.config.token_expiry_hours);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            user_id: user.id,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to create access token: {}", e);
            ApiError::Internal("Token creation failed".to_string())
        })
    }

    fn hash_password(&self, password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                ApiError::Internal("Password hashing failed".to_string())
            })
    }

    fn verify_password(&self, password: &str, hash: &str) -> ApiResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!("Stored password hash is unreadable: {}", e);
            ApiError::Internal("Password verification failed".to_string())
        })?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

// Axum extractor for authenticated requests
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::Authentication("Missing authorization header".to_string())
            })?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Authentication("Expected a bearer token".to_string()))?;

        // Set by the auth middleware for every request
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .ok_or_else(|| ApiError::Internal("Auth service not available".to_string()))?;

        let claims = auth_service.verify_token(token)?;

        Ok(AuthenticatedUser { claims })
    }
}
