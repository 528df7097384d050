// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Authentication: password hashing, JWT issuance and validation

use crate::error::{ApiError, ApiResult};
use crate::models::{LoginRequest, TokenResponse};
use crate::rbac::RbacService;
use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use learnhub_core::models::{UserRole, UserSummary};
use learnhub_core::store::UserStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

const ISSUER: &str = "learnhub-api";
const AUDIENCE: &str = "learnhub";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Account role
    pub role: UserRole,

    /// Resolved `resource:action` grants, informational for clients
    pub permissions: Vec<String>,
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user_id: String, role: UserRole, permissions: Vec<String>, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            role,
            permissions,
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Create a new JWT manager with a secret key
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Create a JWT token
    pub fn create_token(&self, claims: &Claims) -> ApiResult<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.is_expired() {
            return Err(ApiError::Unauthorized {
                message: "Token has expired".to_string(),
            });
        }

        Ok(claims)
    }
}

/// Hash a password into an argon2 PHC string
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::InternalServerError {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

/// Hash checked when no account matches the email
fn decoy_hash() -> &'static str {
    static DECOY: OnceLock<String> = OnceLock::new();
    DECOY.get_or_init(|| hash_password("learnhub-decoy-password").unwrap_or_default())
}

/// Authentication service
pub struct AuthService {
    jwt_manager: JwtManager,
    users: Arc<dyn UserStore>,
    rbac: Arc<RbacService>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_ttl_secs: i64, users: Arc<dyn UserStore>, rbac: Arc<RbacService>) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            users,
            rbac,
            token_ttl: Duration::seconds(token_ttl_secs),
        }
    }

    /// Authenticate a user and return a JWT token
    pub async fn login(&self, request: LoginRequest) -> ApiResult<TokenResponse> {
        let invalid = || ApiError::Unauthorized {
            message: "Invalid email or password".to_string(),
        };

        let Some(mut user) = self.users.get_user_by_email(&request.email).await? else {
            // Unknown emails still pay for one argon2 verification
            verify_password(&request.password, decoy_hash());
            warn!("Failed login attempt for unknown account {}", request.email);
            return Err(invalid());
        };

        if !verify_password(&request.password, &user.password_hash) {
            warn!("Failed login attempt for {}", request.email);
            return Err(invalid());
        }

        if !user.active {
            return Err(ApiError::forbidden("Account is disabled"));
        }

        user.last_login = Some(Utc::now());
        self.users.update_user(user.clone()).await?;

        let permissions = self.rbac.permissions_for(user.role).iter().map(|p| p.to_string()).collect();
        let claims = Claims::new(user.id.clone(), user.role, permissions, self.token_ttl);
        let token = self.jwt_manager.create_token(&claims)?;

        info!("User {} logged in as {}", user.id, user.role);
        metrics::increment_counter!("learnhub_logins_total", "role" => user.role.as_str());

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.num_seconds() as u64,
            user: user.to_summary(),
        })
    }

    /// Issue a token without a password check
    pub fn issue_token(&self, user_id: &str, role: UserRole) -> ApiResult<String> {
        let permissions = self.rbac.permissions_for(role).iter().map(|p| p.to_string()).collect();
        self.jwt_manager.create_token(&Claims::new(user_id.to_string(), role, permissions, self.token_ttl))
    }

    /// Validate a JWT token and return the claims
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        self.jwt_manager.validate_token(token).map_err(|e| match e {
            ApiError::JwtError(inner) => ApiError::Unauthorized {
                message: format!("Invalid or expired token: {}", inner),
            },
            other => other,
        })
    }

    /// Get user profile by user ID
    pub async fn get_user_profile(&self, user_id: &str) -> ApiResult<UserSummary> {
        let user = self.users.get_user(user_id).await?.ok_or_else(|| ApiError::NotFound {
            message: "User not found".to_string(),
        })?;
        Ok(user.to_summary())
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_header(auth_header: &str) -> ApiResult<&str> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::Unauthorized {
            message: "Invalid authorization header format".to_string(),
        }),
    }
}
