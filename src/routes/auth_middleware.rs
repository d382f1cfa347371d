use std::sync::Arc;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{error, info, debug};

use crate::AppState;
use crate::auth::auth::{role_prpl, service_prpl, user_prpl};
use crate::services::auth_service::{validate_jwt, get_auth_token};

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // 1+2. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    // 3. Validate Token
    let secret = match &state.config.auth_jwt_secret {
        Some(secret) => secret,
        None => {
            error!("Auth JWT secret not configured");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let token_data = match validate_jwt::<Value>(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            error!("JWT validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    let claims = token_data.claims;

    // 4. Determine the type of token (user/service), user tokens may omit it
    let token_type = claims.get("type").and_then(|v| v.as_str()).unwrap_or("user");

    let prpls = match token_type {
        // 5A. User token: the user plus every role it carries
        "user" => {
            let user_uid = claims
                .get("userId")
                .or_else(|| claims.get("sub"))
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    error!("JWT token does not contain 'userId' or 'sub' claim");
                    StatusCode::UNAUTHORIZED
                })?
                .to_string();
            debug!("User token validated for {}", user_uid);

            let mut prpls = vec![user_prpl(&user_uid)];
            let single_role = claims.get("role").and_then(|v| v.as_str());
            let roles = claims
                .get("roles")
                .and_then(|v| v.as_array())
                .map(|roles| roles.iter().filter_map(|r| r.as_str()).collect::<Vec<&str>>())
                .unwrap_or_default();
            for role in single_role.into_iter().chain(roles) {
                let role_prpl = role_prpl(role);
                if !prpls.contains(&role_prpl) {
                    prpls.push(role_prpl);
                }
            }
            prpls
        }
        // 5B. Service token: just the service name as prpl
        "service" => {
            let service_name = claims.get("sub").and_then(|v| v.as_str()).ok_or_else(|| {
                error!("JWT token does not contain 'sub' claim");
                StatusCode::UNAUTHORIZED
            })?;
            info!("Service token validated for {}", service_name);
            vec![service_prpl(service_name)]
        }
        other => {
            error!("Invalid token type: {}", other);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 6. Set these principals into request extensions for downstream handlers
    req.extensions_mut().insert(prpls);

    Ok(next.run(req).await)
}
