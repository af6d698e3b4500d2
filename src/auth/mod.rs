use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;
use crate::domain::{MemberPrincipal, Principal};

/// Bearer-token claims. Identity only: the authoritative role is re-read
/// from the membership store on every guarded request, so a stale token
/// cannot keep a role its owner no longer holds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id; nil for the master account.
    pub sub: Uuid,
    pub name: String,
    /// Home tenant domain; empty for the master account.
    pub domain: String,
    /// Operator-level master account marker.
    pub master: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn member(user_id: Uuid, name: String, domain: String) -> Self {
        let (exp, iat) = expiry_window();
        Self {
            sub: user_id,
            name,
            domain,
            master: false,
            exp,
            iat,
        }
    }

    pub fn master() -> Self {
        let (exp, iat) = expiry_window();
        Self {
            sub: Uuid::nil(),
            name: "master".to_string(),
            domain: String::new(),
            master: true,
            exp,
            iat,
        }
    }

    /// Fold the claims into the principal union the guard consumes.
    pub fn into_principal(self) -> Principal {
        if self.master {
            Principal::Master
        } else {
            Principal::Member(MemberPrincipal {
                user_id: self.sub,
                name: self.name,
                domain: self.domain,
            })
        }
    }
}

fn expiry_window() -> (i64, i64) {
    let now = Utc::now();
    let expiry_hours = config::config().security.jwt_expiry_hours;
    let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();
    (exp, now.timestamp())
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate a token and extract its claims.
pub fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_token_round_trips_to_member_principal() {
        let user_id = Uuid::new_v4();
        let claims = Claims::member(user_id, "casey".into(), "acme.com".into());
        let token = generate_jwt(&claims).unwrap();

        let principal = validate_jwt(&token).unwrap().into_principal();
        match principal {
            Principal::Member(member) => {
                assert_eq!(member.user_id, user_id);
                assert_eq!(member.domain, "acme.com");
            }
            other => panic!("expected member principal, got {:?}", other),
        }
    }

    #[test]
    fn master_token_becomes_master_principal() {
        let token = generate_jwt(&Claims::master()).unwrap();
        assert_eq!(validate_jwt(&token).unwrap().into_principal(), Principal::Master);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(validate_jwt("not-a-token").is_err());
    }
}
