//! REST client for the catalog backend

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::source;
use crate::error::{Result, VidlearnError};
use crate::types::{
    Comment, CommentsResponse, CreateCommentPayload, CreateVideoPayload, Video, VideoResponse,
    VideosResponse,
};

/// Backend error message: the body's `detail`, else a status line
fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail")?.as_str().map(str::to_string))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("API Error: {}", status))
}

/// Check a create-video payload before it is sent
pub fn validate_video(payload: &CreateVideoPayload) -> Result<()> {
    if payload.title.trim().is_empty() {
        return Err(VidlearnError::invalid_input("title", "Title is required"));
    }
    if let source::VideoSource::Invalid { reason } = source::resolve(&payload.video_url) {
        return Err(VidlearnError::invalid_input("video_url", reason));
    }
    Ok(())
}

pub fn validate_comment(payload: &CreateCommentPayload) -> Result<()> {
    if payload.content.trim().is_empty() {
        return Err(VidlearnError::invalid_input("content", "Comment cannot be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base><path>?<key>=<encoded value>`
    fn url(&self, path: &str, query: Option<(&str, &str)>) -> String {
        match query {
            Some((key, value)) => format!(
                "{}{}?{}={}",
                self.base_url,
                path,
                key,
                urlencoding::encode(value)
            ),
            None => format!("{}{}", self.base_url, path),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VidlearnError::Api {
                status: status.as_u16(),
                message: error_message(status.as_u16(), &body),
            });
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(&self, url: String, body: &B) -> Result<T> {
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn get_videos(&self, user_id: &str) -> Result<Vec<Video>> {
        let data: VideosResponse = self.get(self.url("/videos", Some(("user_id", user_id)))).await?;
        Ok(data.videos)
    }

    pub async fn get_video(&self, video_id: &str) -> Result<Video> {
        let data: VideoResponse = self
            .get(self.url("/videos/single", Some(("video_id", video_id))))
            .await?;
        Ok(data.video)
    }

    pub async fn create_video(&self, payload: &CreateVideoPayload) -> Result<Video> {
        validate_video(payload)?;
        self.post(self.url("/videos", None), payload).await
    }

    pub async fn get_comments(&self, video_id: &str) -> Result<Vec<Comment>> {
        let data: CommentsResponse = self
            .get(self.url("/videos/comments", Some(("video_id", video_id))))
            .await?;
        Ok(data.comments)
    }

    pub async fn create_comment(&self, payload: &CreateCommentPayload) -> Result<Comment> {
        validate_comment(payload)?;
        self.post(self.url("/videos/comments", None), payload).await
    }
}
