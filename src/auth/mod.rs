//! Authentication: bearer-token (JWT) actor extraction.
//!
//! Token issuance (login screens, refresh flows) is a collaborator outside
//! this engine; requests arrive with a signed token and every operation
//! derives its actor from it. Authorization decisions live in [`policy`].

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::AppState;

pub mod policy;

const TOKEN_ISSUER: &str = "fieldstock-api";

/// Claim structure for JWT tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id
    pub sub: String,
    pub company_id: Uuid,
    pub account_id: Uuid,
    /// Present when the user acts as a seller
    pub seller_id: Option<Uuid>,
    pub role: UserRole,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated actor extracted from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub account_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub role: UserRole,
    pub token_id: String,
}

impl AuthUser {
    pub fn is_company_manager(&self) -> bool {
        self.role.manages_company_stock()
    }

    fn from_claims(claims: Claims) -> Result<Self, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::AuthError("Malformed subject claim".into()))?;
        Ok(Self {
            user_id,
            company_id: claims.company_id,
            account_id: claims.account_id,
            seller_id: claims.seller_id,
            role: claims.role,
            token_id: claims.jti,
        })
    }
}

/// Verifies a bearer token and returns the authenticated actor.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, ServiceError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| ServiceError::AuthError(format!("Invalid token: {}", e)))?;

    AuthUser::from_claims(data.claims)
}

/// Mints a token for the given identity; used by tests and local tooling.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    company_id: Uuid,
    account_id: Uuid,
    seller_id: Option<Uuid>,
    role: UserRole,
    ttl_secs: i64,
) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        company_id,
        account_id,
        seller_id,
        role,
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl_secs,
        iss: TOKEN_ISSUER.to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
}

/// Axum middleware: require a valid bearer token and stash the actor in
/// request extensions for handlers to pick up.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::AuthError("Missing bearer token".into()))?;

    let actor = verify_token(token, &state.config.jwt_secret)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-key-that-is-definitely-long-enough-for-hs256-use";

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();
        let token = issue_token(
            SECRET,
            user_id,
            company_id,
            account_id,
            None,
            UserRole::Admin,
            600,
        )
        .unwrap();

        let actor = verify_token(&token, SECRET).unwrap();
        assert_eq!(actor.user_id, user_id);
        assert_eq!(actor.company_id, company_id);
        assert_eq!(actor.account_id, account_id);
        assert!(actor.is_company_manager());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(
            SECRET,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            UserRole::Seller,
            -600,
        )
        .unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(
            SECRET,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            UserRole::Owner,
            600,
        )
        .unwrap();
        assert!(verify_token(&token, "another-secret-that-is-also-long-enough-to-be-plausible!!").is_err());
    }
}
