use crate::types::{PriorItem, ResolvedItem, VideoId};
use std::collections::HashSet;
use tracing::debug;

/// Drops items whose media reference appeared earlier in the batch, keeping
/// the first occurrence and the original order. Items without media are
/// compared by title and contributor instead. Applying it twice changes
/// nothing.
pub fn dedupe(items: Vec<ResolvedItem>) -> Vec<ResolvedItem> {
    let mut seen_media: HashSet<VideoId> = HashSet::new();
    let mut seen_identity: HashSet<PriorItem> = HashSet::new();

    items
        .into_iter()
        .filter(|item| {
            let fresh = match &item.media {
                Some(video) => seen_media.insert(video.clone()),
                None => seen_identity.insert(item.prior_item()),
            };
            if !fresh {
                debug!("Dropping duplicate '{}'", item.display_title);
            }
            fresh
        })
        .collect()
}
