//! HTTP adapter for the marker backend.
//!
//! Speaks the document-store routes (`/getMarkers`, `/getComment`,
//! `/updateScore`, ...) with JSON bodies. Lookup routes answer with the
//! array of matching documents; the first element is the match.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::api::{Backend, BackendError};
use super::types::{CommentDto, MarkerDto, NewCommentDto, UserDto, VoteDto};
use crate::config::EngineConfig;
use crate::geo::LatLng;

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build an HTTP backend from the engine config.
    ///
    /// # Errors
    ///
    /// Returns `Request` if the HTTP client cannot be constructed.
    pub fn new(config: &EngineConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.clone() })
    }

    /// Build with explicit base URL and default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `Request` if the HTTP client cannot be constructed.
    pub fn with_base_url(base_url: &str) -> Result<Self, BackendError> {
        let config = EngineConfig { api_base_url: base_url.trim_end_matches('/').to_owned(), ..EngineConfig::default() };
        Self::new(&config)
    }

    async fn get<T: DeserializeOwned>(&self, route: &str) -> Result<T, BackendError> {
        let url = endpoint(&self.base_url, route);
        debug!(%url, "backend GET");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        decode(resp).await
    }

    async fn post<B, T>(&self, route: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send_post(route, body).await?;
        decode(resp).await
    }

    async fn post_unit<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<(), BackendError> {
        let resp = self.send_post(route, body).await?;
        check_status(resp.status())
    }

    async fn send_post<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<reqwest::Response, BackendError> {
        let url = endpoint(&self.base_url, route);
        debug!(%url, "backend POST");
        self.http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_all_markers(&self) -> Result<Vec<MarkerDto>, BackendError> {
        self.get("getMarkers").await
    }

    async fn fetch_marker(&self, at: LatLng) -> Result<Option<MarkerDto>, BackendError> {
        let found: Vec<MarkerDto> = self.post("getMarker", &at).await?;
        Ok(found.into_iter().next())
    }

    async fn fetch_comment(&self, at: LatLng, index: u32) -> Result<Option<CommentDto>, BackendError> {
        let body = json!({ "lat": at.lat, "lng": at.lng, "index": index });
        let found: Vec<CommentDto> = self.post("getComment", &body).await?;
        Ok(found.into_iter().next())
    }

    async fn fetch_comments(&self, at: LatLng) -> Result<Vec<CommentDto>, BackendError> {
        let mut comments: Vec<CommentDto> = self.post("getComments", &at).await?;
        comments.sort_by_key(|c| c.index);
        Ok(comments)
    }

    async fn create_marker(&self, marker: &MarkerDto) -> Result<(), BackendError> {
        self.post_unit("addMarker", marker).await
    }

    async fn delete_marker(&self, at: LatLng) -> Result<(), BackendError> {
        self.post_unit("deleteMarker", &at).await
    }

    async fn add_comment(&self, comment: &NewCommentDto) -> Result<CommentDto, BackendError> {
        self.post("addComment", comment).await
    }

    async fn update_comment_score(&self, at: LatLng, index: u32, score: i64) -> Result<(), BackendError> {
        let body = json!({ "lat": at.lat, "lng": at.lng, "index": index, "score": score });
        self.post_unit("updateScore", &body).await
    }

    async fn fetch_vote(&self, comment_id: &str, user_id: &str) -> Result<Option<VoteDto>, BackendError> {
        let body = json!({ "commentId": comment_id, "userId": user_id });
        let found: Vec<VoteDto> = self.post("getVote", &body).await?;
        Ok(found.into_iter().next())
    }

    async fn create_vote(&self, vote: &VoteDto) -> Result<(), BackendError> {
        self.post_unit("addVote", vote).await
    }

    async fn update_vote(&self, vote: &VoteDto) -> Result<(), BackendError> {
        self.post_unit("updateVote", vote).await
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<UserDto>, BackendError> {
        let body = json!({ "username": username, "password": password });
        let resp = self.send_post("login", &body).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        decode(resp).await.map(Some)
    }
}

fn endpoint(base_url: &str, route: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), route.trim_start_matches('/'))
}

fn check_status(status: StatusCode) -> Result<(), BackendError> {
    if status.is_success() || status.is_redirection() {
        Ok(())
    } else {
        Err(BackendError::Status { status: status.as_u16() })
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    check_status(resp.status())?;
    resp.json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}
