use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use base64::Engine as _;

use crate::error::AppError;

/// The caller, identified by the `sub` claim of the bearer token.
///
/// Tokens are issued by the identity provider; only the payload is decoded
/// here, the signature is not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Expected a bearer token".to_string()))?;

        let user_id = decode_subject(token.trim())?;
        Ok(AuthUser { user_id })
    }
}

/// Extract the `sub` claim from a JWT without verifying its signature.
pub fn decode_subject(jwt: &str) -> Result<String, AppError> {
    let parts: Vec<&str> = jwt.split('.').collect();
    if parts.len() != 3 {
        return Err(AppError::Unauthorized("Invalid token format".to_string()));
    }

    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| AppError::Unauthorized("Invalid token format".to_string()))?;
    let claims: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|_| AppError::Unauthorized("Invalid token format".to_string()))?;

    if let Some(exp) = claims["exp"].as_i64() {
        if exp < chrono::Utc::now().timestamp() {
            return Err(AppError::Unauthorized("Token has expired".to_string()));
        }
    }

    claims["sub"]
        .as_str()
        .filter(|sub| !sub.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Invalid token: no user ID found".to_string()))
}

/// Build an unsigned token for `sub`. Used by tests and local tooling.
pub fn unsigned_token(sub: &str) -> String {
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = engine.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = engine.encode(serde_json::json!({ "sub": sub, "role": "authenticated" }).to_string());
    format!("{header}.{payload}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}",
            engine.encode(r#"{"alg":"HS256"}"#),
            engine.encode(payload),
            engine.encode("sig")
        )
    }

    #[test]
    fn decodes_subject() {
        let jwt = token_with(r#"{"sub":"user-123","aud":"authenticated"}"#);
        assert_eq!(decode_subject(&jwt).unwrap(), "user-123");
    }

    #[test]
    fn unsigned_token_round_trips() {
        assert_eq!(decode_subject(&unsigned_token("abc")).unwrap(), "abc");
    }

    #[test]
    fn rejects_missing_subject() {
        let jwt = token_with(r#"{"aud":"authenticated"}"#);
        assert!(matches!(decode_subject(&jwt), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let exp = chrono::Utc::now().timestamp() - 60;
        let jwt = token_with(&format!(r#"{{"sub":"u","exp":{exp}}}"#));
        let err = decode_subject(&jwt).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_subject("not-a-jwt").is_err());
        assert!(decode_subject("a.%%%.c").is_err());
    }
}
