use axum::extract::Query;
use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::CollabError;
use crate::ws::connctx::ConnCtx;

/// Claims the notes application puts in its user tokens
#[derive(Debug, Clone, Deserialize)]
pub struct UserClaims {
    #[serde(rename = "userId", alias = "sub")]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "editor".to_string()
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 2. Try the `token` query parameter, browsers can't set headers on websockets
    if let Ok(Query(query)) = Query::<TokenQuery>::try_from_uri(req.uri()) {
        if let Some(token) = query.token.filter(|t| !t.is_empty()) {
            return Ok(token);
        }
    }

    // 3. Try to get token from cookies
    let cookie_header = req.headers().get(http::header::COOKIE)
        .ok_or_else(|| "Missing Authorization header, token parameter or Cookie".to_string())?
        .to_str()
        .map_err(|_| "Invalid Cookie header".to_string())?;

    for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
        if cookie.name() == "auth_token" {
            return Ok(cookie.value().to_string());
        }
    }
    Err("auth_token cookie not found".to_string())
}

// Validate a JWT token and return the token data
pub fn validate_jwt<T: serde::de::DeserializeOwned>(token: &str, secret: &str) -> Result<TokenData<T>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<T>(token, &decoding_key, &validation)
}

/// Turn a connect-time credential into the identity of a new session.
pub fn authenticate(token: Option<&str>, secret: Option<&str>) -> Result<ConnCtx, CollabError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CollabError::AuthenticationFailure("Authentication required".to_string()))?;

    let secret = secret.ok_or_else(|| {
        warn!("No JWT secret configured, refusing connection");
        CollabError::AuthenticationFailure("No JWT secret configured".to_string())
    })?;

    let token_data = validate_jwt::<UserClaims>(token, secret).map_err(|e| {
        debug!("JWT validation failed: {}", e);
        CollabError::AuthenticationFailure("Invalid token".to_string())
    })?;

    let claims = token_data.claims;
    let user_id = Uuid::parse_str(&claims.user_id)
        .map_err(|_| CollabError::AuthenticationFailure("Token subject is not a user id".to_string()))?;

    let ctx = ConnCtx::new(user_id, claims.email, claims.role);
    debug!("Authenticated user {} on connection {}", ctx.user_id, ctx.conn_id);
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn sign(claims: serde_json::Value, secret: &str) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn authenticates_user_claims() {
        let uid = Uuid::new_v4();
        let token = sign(json!({"userId": uid.to_string(), "email": "ada@example.com", "role": "viewer", "exp": exp()}), "k");
        let ctx = authenticate(Some(&token), Some("k")).unwrap();
        assert_eq!(ctx.user_id, uid);
        assert_eq!(ctx.email, "ada@example.com");
        assert_eq!(ctx.role, "viewer");
    }

    #[test]
    fn accepts_sub_and_defaults_role() {
        let uid = Uuid::new_v4();
        let token = sign(json!({"sub": uid.to_string(), "exp": exp()}), "k");
        let ctx = authenticate(Some(&token), Some("k")).unwrap();
        assert_eq!(ctx.user_id, uid);
        assert_eq!(ctx.role, "editor");
    }

    #[test]
    fn each_connection_gets_its_own_id() {
        let token = sign(json!({"userId": Uuid::new_v4().to_string(), "exp": exp()}), "k");
        let a = authenticate(Some(&token), Some("k")).unwrap();
        let b = authenticate(Some(&token), Some("k")).unwrap();
        assert_eq!(a.user_id, b.user_id);
        assert_ne!(a.conn_id, b.conn_id);
    }

    #[test]
    fn rejects_missing_bad_or_foreign_tokens() {
        assert!(matches!(authenticate(None, Some("k")), Err(CollabError::AuthenticationFailure(_))));
        assert!(authenticate(Some("garbage"), Some("k")).is_err());

        let token = sign(json!({"userId": Uuid::new_v4().to_string(), "exp": exp()}), "other");
        assert!(authenticate(Some(&token), Some("k")).is_err());
        assert!(authenticate(Some(&token), None).is_err());

        let token = sign(json!({"userId": "not-a-uuid", "exp": exp()}), "k");
        assert!(authenticate(Some(&token), Some("k")).is_err());

        let expired = sign(json!({"userId": Uuid::new_v4().to_string(), "exp": 1_000}), "k");
        assert!(authenticate(Some(&expired), Some("k")).is_err());
    }

    #[test]
    fn finds_token_in_header_query_or_cookie() {
        let req = http::Request::builder()
            .header(http::header::AUTHORIZATION, "Bearer abc")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "abc");

        let req = http::Request::builder().uri("/ws?foo=1&token=qwe").body(()).unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "qwe");

        let req = http::Request::builder()
            .header(http::header::COOKIE, "theme=dark; auth_token=zzz")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "zzz");

        let req = http::Request::builder().uri("/ws").body(()).unwrap();
        assert!(get_auth_token(&req).is_err());
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let uid = Uuid::new_v4();
        let token = sign(json!({"userId": uid.to_string(), "exp": exp()}), "k");
        let encoded = token.replace('.', "%2E").replace('-', "%2D").replace('_', "%5F");

        let req = http::Request::builder()
            .uri(format!("/ws?token={}&foo=1", encoded))
            .body(())
            .unwrap();
        let found = get_auth_token(&req).unwrap();
        assert_eq!(found, token);
        assert_eq!(authenticate(Some(&found), Some("k")).unwrap().user_id, uid);

        // An empty parameter falls through to the cookie
        let req = http::Request::builder()
            .uri("/ws?token=")
            .header(http::header::COOKIE, "auth_token=zzz")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "zzz");
    }
}
