use crate::traits::{AvailabilityProbe, ProbeOutcome};
use crate::types::{ProbeFailurePolicy, ResolverConfig, Result, VideoId};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

impl ProbeFailurePolicy {
    /// Verdict when the probe could not reach a conclusion.
    pub fn on_failure(&self) -> ProbeOutcome {
        match self {
            ProbeFailurePolicy::FailOpen => ProbeOutcome::Confirmed {
                canonical_title: None,
            },
            ProbeFailurePolicy::FailClosed => ProbeOutcome::Unavailable,
        }
    }
}

#[derive(Deserialize, Debug)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
}

/// Existence check through the platform's oEmbed endpoint, with a fallback
/// HEAD request against the watch page when oEmbed refuses.
pub struct OEmbedProbe {
    client: Client,
    oembed_url: String,
    watch_url: String,
    policy: ProbeFailurePolicy,
}

impl OEmbedProbe {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Self::with_endpoints(
            &config.oembed_url,
            &config.watch_url,
            config.probe_timeout(),
            config.probe_failure_policy,
            &config.user_agent,
        )
    }

    pub fn with_endpoints(
        oembed_url: &str,
        watch_url: &str,
        timeout: Duration,
        policy: ProbeFailurePolicy,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            oembed_url: oembed_url.to_string(),
            watch_url: watch_url.to_string(),
            policy,
        })
    }

    pub fn policy(&self) -> ProbeFailurePolicy {
        self.policy
    }

    fn watch_link(&self, video: &VideoId) -> String {
        format!("{}?v={}", self.watch_url, video.as_str())
    }

    async fn query_oembed(&self, video: &VideoId) -> std::result::Result<ProbeOutcome, reqwest::Error> {
        let response = self
            .client
            .get(&self.oembed_url)
            .query(&[("url", self.watch_link(video).as_str()), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: OEmbedResponse = response.json().await?;
            return Ok(ProbeOutcome::Confirmed {
                canonical_title: body.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            });
        }

        debug!("oEmbed answered HTTP {} for {}", status, video);
        Ok(self.check_watch_page(video, status).await)
    }

    async fn check_watch_page(&self, video: &VideoId, oembed_status: StatusCode) -> ProbeOutcome {
        match self.client.head(self.watch_link(video)).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Confirmed {
                canonical_title: None,
            },
            Ok(response) => {
                debug!("Watch page answered HTTP {} for {}", response.status(), video);
                ProbeOutcome::Unavailable
            }
            Err(e) => {
                // oEmbed already gave an explicit refusal; that stands.
                debug!("Watch page check failed for {} after oEmbed {}: {}", video, oembed_status, e);
                ProbeOutcome::Unavailable
            }
        }
    }
}

#[async_trait]
impl AvailabilityProbe for OEmbedProbe {
    async fn probe(&self, video: &VideoId) -> ProbeOutcome {
        match self.query_oembed(video).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let outcome = self.policy.on_failure();
                warn!(
                    "Availability probe for {} did not complete ({}), treating as {:?}",
                    video,
                    e,
                    outcome.availability()
                );
                outcome
            }
        }
    }
}
