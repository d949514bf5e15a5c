use crate::media_utils::{duration::parse_iso8601, text::unescape_html};
use crate::traits::{SearchCandidate, VideoSearch};
use crate::types::{ResolverConfig, ResolverError, Result, VideoId};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Search through the YouTube Data API v3.
///
/// `search.list` supplies ids, titles and channels; durations come from a
/// second `videos.list` call and are optional if that call fails.
pub struct YouTubeApiSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Debug)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<Snippet>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Deserialize, Debug)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize, Debug)]
struct ContentDetails {
    duration: Option<String>,
}

impl YouTubeApiSearch {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let api_key = config
            .youtube_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ResolverError::Configuration("YouTube Data API key not found".to_string())
            })?;

        Self::with_base_url(
            &config.youtube_api_base_url,
            api_key,
            config.search_timeout(),
            &config.user_agent,
        )
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: String,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_durations(&self, ids: &[String]) -> Result<HashMap<String, Duration>> {
        let response = self
            .client
            .get(format!("{}/videos", self.base_url))
            .query(&[
                ("part", "contentDetails"),
                ("id", ids.join(",").as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: VideoListResponse = response.json().await?;
        Ok(body
            .items
            .into_iter()
            .filter_map(|item| {
                let duration = item.content_details?.duration?;
                Some((item.id, parse_iso8601(&duration)?))
            })
            .collect())
    }
}

#[async_trait]
impl VideoSearch for YouTubeApiSearch {
    fn backend_name(&self) -> String {
        "YouTube Data API".to_string()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        debug!("Data API search: '{}' (limit {})", query, limit);

        let max_results = limit.clamp(1, 50).to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::Search(format!(
                "Data API search returned HTTP {}",
                status
            )));
        }

        let body: SearchListResponse = response.json().await?;
        let hits: Vec<(String, Snippet)> = body
            .items
            .into_iter()
            .filter_map(|item| Some((item.id.video_id?, item.snippet?)))
            .collect();

        let ids: Vec<String> = hits.iter().map(|(id, _)| id.clone()).collect();
        let durations = if ids.is_empty() {
            HashMap::new()
        } else {
            self.fetch_durations(&ids).await.unwrap_or_else(|e| {
                warn!("Could not fetch durations for '{}': {}", query, e);
                HashMap::new()
            })
        };

        let candidates: Vec<SearchCandidate> = hits
            .into_iter()
            .map(|(id, snippet)| {
                let video_id = VideoId::new(id.clone());
                let title = unescape_html(snippet.title.trim());
                SearchCandidate {
                    title: if title.is_empty() { video_id.placeholder_title() } else { title },
                    channel: unescape_html(snippet.channel_title.trim()),
                    duration: durations.get(&id).copied(),
                    video_id,
                }
            })
            .collect();

        info!("Data API search for '{}' returned {} candidates", query, candidates.len());
        Ok(candidates)
    }
}
