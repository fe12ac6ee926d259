//! Twilio Video REST client
//!
//! Rooms are managed through `/v1/Rooms` with basic auth (account sid and
//! auth token). Participant tokens are signed locally with the API key
//! secret and never hit the network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::domain::video_call::{
    AccessToken, CreateRoom, MediaProviderClient, ProviderError, ProviderRoom, RoomStatus,
};

/// Error code Twilio returns when an in-progress room already has the name
const ROOM_EXISTS_CODE: u32 = 53113;

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
    message: Option<String>,
}

/// Signs Twilio access tokens with a video grant
#[derive(Clone)]
pub struct TwilioTokenIssuer {
    account_sid: String,
    api_key_sid: String,
    encoding_key: EncodingKey,
    ttl_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VideoGrant {
    pub room: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Grants {
    pub identity: String,
    pub video: VideoGrant,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AccessTokenClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub grants: Grants,
}

impl TwilioTokenIssuer {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            account_sid: config.account_sid.clone(),
            api_key_sid: config.api_key_sid.clone(),
            encoding_key: EncodingKey::from_secret(config.api_key_secret.as_bytes()),
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    pub fn issue(&self, identity: &str, room_name: &str) -> Result<AccessToken, ProviderError> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            jti: format!("{}-{}", self.api_key_sid, now),
            iss: self.api_key_sid.clone(),
            sub: self.account_sid.clone(),
            iat: now,
            exp: now + self.ttl_seconds,
            grants: Grants {
                identity: identity.to_string(),
                video: VideoGrant {
                    room: room_name.to_string(),
                },
            },
        };

        let mut header = Header::new(Algorithm::HS256);
        header.cty = Some("twilio-fpa;v=1".to_string());

        let jwt = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| ProviderError::Malformed(format!("Failed to sign token: {}", e)))?;

        Ok(AccessToken {
            identity: identity.to_string(),
            room_name: room_name.to_string(),
            jwt,
        })
    }
}

pub struct TwilioVideoClient {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    tokens: TwilioTokenIssuer,
}

impl TwilioVideoClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            tokens: TwilioTokenIssuer::new(config),
        })
    }

    fn rooms_url(&self) -> String {
        format!("{}/v1/Rooms", self.base_url)
    }

    fn room_url(&self, name_or_sid: &str) -> String {
        format!("{}/v1/Rooms/{}", self.base_url, name_or_sid)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ProviderRoom, ProviderError> {
        let response = request
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| {
                warn!("Provider request failed: {}", e);
                ProviderError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<ProviderRoom>()
                .await
                .map_err(|e| ProviderError::Malformed(e.to_string()));
        }

        let body = response.json::<TwilioErrorBody>().await.ok();
        Err(classify_error(status, body))
    }
}

fn classify_error(status: StatusCode, body: Option<TwilioErrorBody>) -> ProviderError {
    let code = body.as_ref().and_then(|b| b.code);
    let message = body
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("Provider returned {}", status));

    if status == StatusCode::NOT_FOUND {
        ProviderError::RoomNotFound(message)
    } else if code == Some(ROOM_EXISTS_CODE) {
        ProviderError::RoomExists(message)
    } else {
        ProviderError::Unavailable(message)
    }
}

#[async_trait]
impl MediaProviderClient for TwilioVideoClient {
    async fn create_room(&self, request: &CreateRoom) -> Result<ProviderRoom, ProviderError> {
        debug!("Creating provider room {}", request.unique_name);
        let form = [
            ("UniqueName", request.unique_name.as_str()),
            ("Type", request.room_type.as_str()),
        ];
        self.send(self.client.post(self.rooms_url()).form(&form))
            .await
    }

    async fn fetch_room(&self, name: &str) -> Result<ProviderRoom, ProviderError> {
        self.send(self.client.get(self.room_url(name))).await
    }

    async fn update_room_status(
        &self,
        sid: &str,
        status: RoomStatus,
    ) -> Result<ProviderRoom, ProviderError> {
        debug!("Setting provider room {} to {}", sid, status.as_str());
        let form = [("Status", status.as_str())];
        self.send(self.client.post(self.room_url(sid)).form(&form))
            .await
    }

    async fn issue_token(
        &self,
        identity: &str,
        room_name: &str,
    ) -> Result<AccessToken, ProviderError> {
        self.tokens.issue(identity, room_name)
    }
}
