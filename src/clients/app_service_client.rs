use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::db::PermissionOracle;
use crate::models::{AccessLevel, CollabError, NoteId, UserId};

/// Permission lookups against the notes application's HTTP API.
#[derive(Debug)]
pub struct AppServiceClient {
    client: Client,
    base_url: String,
    jwt_secret: String,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

#[derive(Debug, Deserialize)]
struct PermissionBody {
    permission: Option<String>,
}

impl AppServiceClient {
    pub fn new(base_url: String, jwt_secret: String, service_name: String, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            jwt_secret,
            service_name,
        })
    }

    fn generate_token(&self) -> Result<String, CollabError> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(60)) // 1 minute expiration
            .map(|t| t.timestamp())
            .unwrap_or_default();

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
            .map_err(|e| CollabError::UpstreamFailure(format!("Failed to sign service token: {}", e)))
    }

    /// Fetch the permission `user_id` holds on `note_id`
    pub async fn get_permission(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        let token = self.generate_token()?;
        let url = format!("{}/notes/{}/permissions/{}", self.base_url, note_id, user_id);
        debug!("Fetching permission from {}", url);

        let resp = self.client.get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| {
                error!("Permission service unreachable for note {}: {}", note_id, e);
                CollabError::UpstreamFailure(format!("permission service unreachable: {}", e))
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(CollabError::NotFound(note_id.to_string())),
            status if !status.is_success() => {
                error!("Permission service answered {} for note {}", status, note_id);
                return Err(CollabError::UpstreamFailure(format!("permission service answered {}", status)));
            }
            _ => {}
        }

        let body: PermissionBody = resp
            .json()
            .await
            .map_err(|e| CollabError::UpstreamFailure(format!("invalid permission response: {}", e)))?;

        match body.permission {
            Some(p) => p.parse::<AccessLevel>().map_err(CollabError::UpstreamFailure),
            None => Ok(AccessLevel::None),
        }
    }
}

#[async_trait]
impl PermissionOracle for AppServiceClient {
    async fn check_access(&self, note_id: NoteId, user_id: UserId) -> Result<AccessLevel, CollabError> {
        self.get_permission(note_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn signs_short_lived_service_tokens() {
        let client = AppServiceClient::new(
            "http://notes.local/api/".into(),
            "secret".into(),
            "note-collab".into(),
            std::time::Duration::from_secs(1),
        ).unwrap();
        assert_eq!(client.base_url, "http://notes.local/api");

        let token = client.generate_token().unwrap();
        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b"secret"), &Validation::new(Algorithm::HS256)).unwrap();
        assert_eq!(data.claims.sub, "note-collab");
        assert_eq!(data.claims.type_, "service");
    }
}
