use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{default_thumbnail, watch_url, YoutubeError};
use crate::extract::denylist::FALLBACK_YOUTUBE_TITLE;
use crate::sanitize::redact_url;

const USER_AGENT: &str = concat!("lectern/", env!("CARGO_PKG_VERSION"));

/// Where a [`VideoMetadata`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    DataApi,
    OEmbed,
    Fallback,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataSource::DataApi => "youtube_api",
            MetadataSource::OEmbed => "oembed",
            MetadataSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel_title: Option<String>,
    /// Never empty: falls back to the CDN URL pattern.
    pub thumbnail: String,
    pub source: MetadataSource,
}

impl VideoMetadata {
    pub fn fallback(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: FALLBACK_YOUTUBE_TITLE.to_string(),
            channel_title: None,
            thumbnail: default_thumbnail(video_id),
            source: MetadataSource::Fallback,
        }
    }
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Deserialize, Default)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        [self.maxres, self.high, self.medium, self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url)
            .find(|u| !u.is_empty())
    }
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Deserialize)]
struct OEmbedResponse {
    title: String,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
}

/// Resolves video titles: Data API first, then oEmbed, then a placeholder.
pub struct YoutubeClient {
    http_client: reqwest::Client,
    api_base: String,
    oembed_url: String,
    api_key: Option<SecretString>,
}

impl YoutubeClient {
    pub fn new(
        api_base: &str,
        oembed_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, YoutubeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| YoutubeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            oembed_url: oembed_url.to_string(),
            api_key,
        })
    }

    /// Never fails: each lookup that errors is logged and the next one is
    /// tried; the last resort is the generic title with the CDN thumbnail.
    pub async fn fetch_metadata(&self, video_id: &str) -> VideoMetadata {
        match self.data_api_lookup(video_id).await {
            Ok(meta) => return meta,
            Err(YoutubeError::NoApiKey) => debug!("No YouTube API key; using oEmbed"),
            Err(e) => warn!(video_id = %video_id, error = %e, "YouTube Data API lookup failed"),
        }

        match self.oembed_lookup(video_id).await {
            Ok(meta) => meta,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "oEmbed lookup failed");
                VideoMetadata::fallback(video_id)
            }
        }
    }

    pub async fn data_api_lookup(&self, video_id: &str) -> Result<VideoMetadata, YoutubeError> {
        let key = self.api_key.as_ref().ok_or(YoutubeError::NoApiKey)?;
        let url = format!("{}/videos", self.api_base);
        debug!(url = %redact_url(&url), video_id = %video_id, "Querying YouTube Data API");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("id", video_id),
                ("key", key.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| YoutubeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let list: VideoListResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::ResponseParse(e.to_string()))?;
        let item = list
            .items
            .into_iter()
            .next()
            .ok_or_else(|| YoutubeError::NotFound(video_id.to_string()))?;

        let title = item.snippet.title.trim().to_string();
        if title.is_empty() {
            return Err(YoutubeError::ResponseParse("empty title".to_string()));
        }

        Ok(VideoMetadata {
            video_id: video_id.to_string(),
            title,
            channel_title: item.snippet.channel_title,
            thumbnail: item
                .snippet
                .thumbnails
                .best()
                .unwrap_or_else(|| default_thumbnail(video_id)),
            source: MetadataSource::DataApi,
        })
    }

    pub async fn oembed_lookup(&self, video_id: &str) -> Result<VideoMetadata, YoutubeError> {
        let watch = watch_url(video_id);
        let response = self
            .http_client
            .get(&self.oembed_url)
            .query(&[("url", watch.as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| YoutubeError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(YoutubeError::NotFound(video_id.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let oembed: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::ResponseParse(e.to_string()))?;
        let title = oembed.title.trim().to_string();
        if title.is_empty() {
            return Err(YoutubeError::ResponseParse("empty title".to_string()));
        }

        Ok(VideoMetadata {
            video_id: video_id.to_string(),
            title,
            channel_title: oembed.author_name,
            thumbnail: oembed
                .thumbnail_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| default_thumbnail(video_id)),
            source: MetadataSource::OEmbed,
        })
    }
}
