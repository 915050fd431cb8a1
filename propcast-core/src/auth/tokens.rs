// File: propcast-core/src/auth/tokens.rs
//
// HS256 access/refresh tokens. The subject is the user id; `token_type`
// keeps a refresh token from being accepted where an access token is
// expected and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(Error::Config("JWT secret must not be empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, Error> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            token_type: kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().simple().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Token(e.to_string()))
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, Error> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    /// Validates signature, expiry and kind; returns the user id.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Uuid, Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| Error::Auth(format!("invalid token: {e}")))?;
        if data.claims.token_type != expected {
            return Err(Error::Auth("wrong token type".into()));
        }
        Uuid::parse_str(&data.claims.sub).map_err(|_| Error::Auth("invalid token subject".into()))
    }

    /// New access token for a valid refresh token. The refresh token is
    /// handed back unchanged.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        let user_id = self.verify(refresh_token, TokenKind::Refresh)?;
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: refresh_token.to_string(),
        })
    }
}
