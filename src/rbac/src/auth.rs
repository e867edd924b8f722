//! Credential verification and token issuance
//!
//! The engine never sees a token: this service registers users, checks
//! passwords, and mints/verifies the signed tokens from which the HTTP
//! guard extracts a verified user identifier.

use crate::error::{RbacError, Result};
use crate::store::PolicyStore;
use crate::types::User;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Token lifetime in hours
const TOKEN_TTL_HOURS: i64 = 72;

/// Signed token claims; `sub` carries the user id the guard hands to the engine
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: i64,
}

/// Request to register a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request to exchange credentials for a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
}

/// Registration, login, and token verification over the policy store
pub struct AuthService {
    store: Arc<dyn PolicyStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(store: Arc<dyn PolicyStore>, jwt_secret: &str) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Create an account with an argon2-hashed password
    pub async fn register(&self, req: &RegisterRequest) -> Result<User> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| RbacError::Internal(format!("password hash failure: {}", e)))?
            .to_string();

        let user = User {
            id: Uuid::new_v4(),
            username: req.username.clone(),
            email: req.email.clone(),
            password_hash,
            created_at: Utc::now(),
        };

        self.store.create_user(&user).await?;
        Ok(user)
    }

    /// Verify credentials and issue a signed access token.
    ///
    /// Unknown usernames and wrong passwords collapse into the same opaque
    /// error so the response does not leak which accounts exist.
    pub async fn login(&self, req: &LoginRequest) -> Result<AuthResponse> {
        let user = self
            .store
            .user_by_username(&req.username)
            .await
            .map_err(|e| match e {
                RbacError::UserNotFound(_) => RbacError::InvalidCredentials,
                other => other,
            })?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| RbacError::Internal(format!("stored hash unreadable: {}", e)))?;
        if Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(RbacError::InvalidCredentials);
        }

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username,
            exp: (Utc::now() + ChronoDuration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| RbacError::Internal(format!("token signing failure: {}", e)))?;

        Ok(AuthResponse { access_token })
    }

    /// Verify a bearer token and return the user id it was issued for
    pub fn verify(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| RbacError::InvalidToken(e.to_string()))?;

        Ok(data.claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPolicyStore;

    fn test_service() -> AuthService {
        AuthService::new(Arc::new(InMemoryPolicyStore::new()), "test-secret")
    }

    fn register_req() -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_verify_roundtrip() {
        let auth = test_service();
        let user = auth.register(&register_req()).await.unwrap();

        let response = auth
            .login(&LoginRequest {
                username: "alice".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        let user_id = auth.verify(&response.access_token).unwrap();
        assert_eq!(user_id, user.id.to_string());
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let auth = test_service();
        auth.register(&register_req()).await.unwrap();

        let err = auth
            .login(&LoginRequest {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unknown_user_gets_same_error_as_wrong_password() {
        let auth = test_service();

        let err = auth
            .login(&LoginRequest {
                username: "nobody".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RbacError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_tampered_token_rejected() {
        let auth = test_service();
        auth.register(&register_req()).await.unwrap();

        let response = auth
            .login(&LoginRequest {
                username: "alice".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        let mut token = response.access_token;
        token.push('x');
        assert!(matches!(
            auth.verify(&token),
            Err(RbacError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let auth = test_service();
        let user = auth.register(&register_req()).await.unwrap();
        assert_ne!(user.password_hash, "hunter2hunter2");
        assert!(user.password_hash.starts_with("$argon2"));
    }
}
