use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::YoutubeError;
use crate::chunk::TranscriptSegment;

/// Supplies timed captions for a video. `Ok(None)` means the video has no
/// transcript, which is not an error.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<TranscriptSegment>>, YoutubeError>;
}

/// Fetches transcripts from a caption service: `GET {base}/transcripts/{id}`
/// answering `{"segments": [{"start", "duration", "text"}]}`.
pub struct HttpTranscriptSource {
    http_client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    segments: Vec<TranscriptSegment>,
}

impl HttpTranscriptSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, YoutubeError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| YoutubeError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn fetch(&self, video_id: &str) -> Result<Option<Vec<TranscriptSegment>>, YoutubeError> {
        let url = format!("{}/transcripts/{}", self.base_url, video_id);
        tracing::debug!(video_id = %video_id, "Fetching transcript");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| YoutubeError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::ResponseParse(e.to_string()))?;

        let segments: Vec<TranscriptSegment> = parsed
            .segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        Ok((!segments.is_empty()).then_some(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcripts/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "segments": [
                    {"start": 0.0, "duration": 2.5, "text": "Hello"},
                    {"start": 2.5, "duration": 1.0, "text": "  "},
                    {"start": 3.5, "text": "world"}
                ]
            })))
            .mount(&server)
            .await;

        let source = HttpTranscriptSource::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let segments = source.fetch("abc").await.unwrap().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].start, 3.5);
        assert_eq!(segments[1].duration, 0.0);
    }

    #[tokio::test]
    async fn test_missing_or_empty_transcript_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transcripts/none"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/transcripts/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"segments": []})))
            .mount(&server)
            .await;

        let source = HttpTranscriptSource::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(source.fetch("none").await.unwrap().is_none());
        assert!(source.fetch("empty").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let source = HttpTranscriptSource::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert!(matches!(
            source.fetch("x").await,
            Err(YoutubeError::Api { status: 502, .. })
        ));
    }
}
