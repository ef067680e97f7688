use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    entities::{customer, Customer},
    errors::ServiceError,
    services::carts::CartIdentity,
    AppState,
};

pub const SESSION_HEADER: &str = "x-session-key";

/// JWT claims for a logged-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub staff: bool,
    pub iat: usize,
    pub exp: usize,
}

/// Password hashing and token issuing.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            jwt_secret,
            token_ttl,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| ServiceError::InternalError(format!("password hash failed: {e}")))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    pub fn issue_token(&self, customer: &customer::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: customer.id,
            email: customer.email.clone(),
            staff: customer.is_staff,
            iat: now,
            exp: now + self.token_ttl.as_secs() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token encode failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized("invalid or expired token".to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// The authenticated customer behind the request.
pub struct CurrentCustomer(pub customer::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentCustomer {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;
        let claims = state.auth.verify_token(token)?;

        let customer = Customer::find_by_id(claims.sub)
            .one(&*state.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("unknown account".to_string()))?;

        if !customer.is_active {
            return Err(ServiceError::Forbidden("account is disabled".to_string()));
        }
        Ok(CurrentCustomer(customer))
    }
}

/// An authenticated staff member; required on every admin route.
pub struct StaffCustomer(pub customer::Model);

#[async_trait]
impl FromRequestParts<AppState> for StaffCustomer {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentCustomer(customer) =
            CurrentCustomer::from_request_parts(parts, state).await?;
        if !customer.is_staff {
            return Err(ServiceError::Forbidden(
                "staff privileges required".to_string(),
            ));
        }
        Ok(StaffCustomer(customer))
    }
}

/// Cart partition key: the bearer token when present, the anonymous
/// session header otherwise.
pub struct CartSession(pub CartIdentity);

#[async_trait]
impl FromRequestParts<AppState> for CartSession {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts) {
            let claims = state.auth.verify_token(token)?;
            return Ok(CartSession(CartIdentity::Customer(claims.sub)));
        }

        let session_key = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!(
                    "log in or supply a {SESSION_HEADER} header"
                ))
            })?;
        Ok(CartSession(CartIdentity::Session(session_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(
            "0123456789abcdef0123456789abcdef".to_string(),
            Duration::from_secs(3600),
        )
    }

    fn customer() -> customer::Model {
        customer::Model {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            phone: "+79990001122".into(),
            first_name: "Иван".into(),
            last_name: "Иванов".into(),
            patronymic: String::new(),
            address: String::new(),
            password_hash: String::new(),
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn password_roundtrip() {
        let auth = service();
        let hash = auth.hash_password("correct horse").unwrap();
        assert!(auth.verify_password("correct horse", &hash));
        assert!(!auth.verify_password("wrong", &hash));
    }

    #[test]
    fn token_roundtrip_preserves_claims() {
        let auth = service();
        let customer = customer();
        let token = auth.issue_token(&customer).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, customer.id);
        assert_eq!(claims.email, customer.email);
        assert!(!claims.staff);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(service().verify_token("not-a-token").is_err());
    }
}
