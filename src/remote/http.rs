use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::client::{ProgressSink, RemoteStore};
use super::error::{RemoteError, RemoteResult};
use super::types::{CreateFile, PartReceipt, PartUpload, RemoteFile, ResumeRecord};

/// Frame size used when streaming a part body, so progress advances smoothly
/// instead of jumping straight to 100.
const BODY_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct HttpRemoteConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            access_token: None,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Destination client speaking the store's REST contract over HTTP with
/// streamed part bodies.
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(config: HttpRemoteConfig) -> RemoteResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteError::TransportFailure(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token,
        })
    }

    fn endpoint(&self, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success response to `RemoteRejected` with the body text.
    async fn check_status(response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::RemoteRejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Wrap part bytes in a framed stream that reports cumulative progress.
    fn progress_body(data: Bytes, progress: ProgressSink) -> reqwest::Body {
        reqwest::Body::wrap_stream(frame_stream(data, progress))
    }
}

/// Split part bytes into frames, reporting cumulative percentage as each
/// frame is yielded to the transport.
fn frame_stream(
    data: Bytes,
    progress: ProgressSink,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    let total = data.len().max(1) as f64;
    let mut frames = Vec::with_capacity(data.len() / BODY_FRAME_SIZE + 1);
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + BODY_FRAME_SIZE).min(data.len());
        frames.push(data.slice(offset..end));
        offset = end;
    }

    let mut sent = 0u64;
    futures::stream::iter(frames).map(move |frame: Bytes| {
        sent += frame.len() as u64;
        progress((sent as f64 / total * 100.0).min(100.0));
        Ok(frame)
    })
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn find_file(&self, path: &str, name: &str) -> RemoteResult<Option<RemoteFile>> {
        let url = self.endpoint("files")?;
        let response = self
            .authorize(self.client.get(url))
            .query(&[("op", "find"), ("path", path), ("name", name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response).await?;
        let files: Vec<RemoteFile> = response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;

        Ok(files.into_iter().next())
    }

    async fn list_files(&self, path: &str, limit: usize) -> RemoteResult<Vec<RemoteFile>> {
        let url = self.endpoint("files")?;
        let response = self
            .authorize(self.client.get(url))
            .query(&[("op", "list"), ("path", path)])
            .query(&[("limit", limit)])
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    async fn fetch_resume_record(&self, resume_id: &str) -> RemoteResult<ResumeRecord> {
        let url = self.endpoint(&format!("uploads/{}", resume_id))?;
        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ResumeRecord::empty());
        }

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    async fn upload_part(
        &self,
        part: &PartUpload,
        data: Bytes,
        progress: ProgressSink,
    ) -> RemoteResult<PartReceipt> {
        let url = self.endpoint("uploads/parts")?;
        let body = Self::progress_body(data, progress);

        let response = self
            .authorize(self.client.post(url))
            .query(&[
                ("partName", part.part_name.as_str()),
                ("fileName", part.file_name.as_str()),
                ("channelId", part.channel_id.as_str()),
            ])
            .query(&[("partNo", part.part_no)])
            .query(&[("encrypted", part.encrypted)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    async fn create_file(&self, request: &CreateFile) -> RemoteResult<RemoteFile> {
        let url = self.endpoint("files")?;
        let response = self
            .authorize(self.client.post(url))
            .json(request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))
    }

    async fn delete_resume_record(&self, resume_id: &str) -> RemoteResult<()> {
        let url = self.endpoint(&format!("uploads/{}", resume_id))?;
        let response = self.authorize(self.client.delete(url)).send().await?;

        // A record that is already gone counts as deleted
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Self::check_status(response).await?;
        Ok(())
    }
}
