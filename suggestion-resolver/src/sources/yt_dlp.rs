use crate::media_utils::duration::parse_clock;
use crate::traits::{SearchCandidate, VideoSearch};
use crate::types::{ResolverConfig, ResolverError, Result, VideoId};
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Search by shelling out to `yt-dlp "ytsearchN:<query>"`.
pub struct YtDlpSearch {
    program: String,
    timeout: Duration,
}

/// One `--dump-json` line of a flat playlist.
#[derive(Deserialize, Debug)]
struct FlatEntry {
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    duration_string: Option<String>,
}

impl YtDlpSearch {
    pub fn new(config: &ResolverConfig) -> Self {
        Self::with_program(config.yt_dlp_program.clone(), config.search_timeout())
    }

    pub fn with_program(program: String, timeout: Duration) -> Self {
        Self { program, timeout }
    }
}

/// Parse yt-dlp's line-delimited JSON output. Lines that do not describe a
/// video are skipped.
pub fn parse_flat_playlist(stdout: &str) -> Vec<SearchCandidate> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<FlatEntry>(line).ok())
        .filter_map(|entry| {
            let video_id = VideoId::new(entry.id?.trim().to_string());
            let title = entry
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| video_id.placeholder_title());
            Some(SearchCandidate {
                title,
                channel: entry.channel.or(entry.uploader).unwrap_or_default(),
                duration: entry
                    .duration
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .or_else(|| entry.duration_string.as_deref().and_then(parse_clock)),
                video_id,
            })
        })
        .collect()
}

#[async_trait]
impl VideoSearch for YtDlpSearch {
    fn backend_name(&self) -> String {
        format!("{} search", self.program)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
        let target = format!("ytsearch{}:{}", limit.max(1), query);
        debug!("Running {} {}", self.program, target);

        let child = Command::new(&self.program)
            .arg(&target)
            .args(["--flat-playlist", "--dump-json", "--no-warnings", "--skip-download"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ResolverError::Search(format!(
                    "{} did not finish within {:?}",
                    self.program, self.timeout
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolverError::Search(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let candidates = parse_flat_playlist(&String::from_utf8_lossy(&output.stdout));
        info!("{} returned {} candidates for '{}'", self.program, candidates.len(), query);
        Ok(candidates)
    }
}
