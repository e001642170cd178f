use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Signs HS256 tokens with the configured secret and lifetimes.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, access_minutes: i64, refresh_days: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::minutes(access_minutes),
            refresh_ttl: Duration::days(refresh_days),
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role, kind: TokenKind) -> Result<String> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
            role: Some(role.as_str().to_string()),
            kind,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn issue_pair(&self, user_id: Uuid, role: Role) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(user_id, role, TokenKind::Access)?,
            refresh_token: self.issue(user_id, role, TokenKind::Refresh)?,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = decode_claims(token, &self.secret)?;
        if claims.kind != expected {
            return Err(Error::Unauthorized("Wrong token type".to_string()));
        }
        Ok(claims)
    }
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_token_is_not_accepted_as_access() {
        let issuer = TokenIssuer::new("unit-secret", 30, 7);
        let user = Uuid::new_v4();
        let pair = issuer.issue_pair(user, Role::Consultant).unwrap();

        let access = issuer.decode(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user.to_string());
        assert_eq!(access.role.as_deref(), Some("consultant"));

        assert!(issuer.decode(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(decode_claims(&pair.access_token, "other-secret").is_err());
    }
}
