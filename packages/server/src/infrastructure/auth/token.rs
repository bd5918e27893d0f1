//! Signed join tokens.
//!
//! A join token is an HS256 JWT minted by the HTTP join flow once the room
//! and (for private rooms) the password have been checked. The WebSocket
//! handshake validates it and compares every claim against the connection's
//! own room id and username.

use std::{sync::Arc, time::Duration};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rakugaki_shared::time::Clock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RoomId, Username, Visibility};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("Token is invalid: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    Expired,
}

/// Claims bound into a join token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClaims {
    pub room_id: String,
    pub username: String,
    pub is_public: bool,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

pub struct JoinTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JoinTokenIssuer {
    pub fn new(secret: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        }
    }

    pub fn issue(
        &self,
        room_id: &RoomId,
        username: &Username,
        visibility: Visibility,
    ) -> Result<String, TokenError> {
        let iat = self.clock.now_millis() / 1000;
        let claims = JoinClaims {
            room_id: room_id.as_str().to_string(),
            username: username.as_str().to_string(),
            is_public: visibility.is_public(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify the signature and expiry of `token` and return its claims.
    pub fn validate(&self, token: &str) -> Result<JoinClaims, TokenError> {
        // Expiry is checked against the injected clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = decode::<JoinClaims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::Invalid)?
            .claims;

        let now = self.clock.now_millis() / 1000;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
