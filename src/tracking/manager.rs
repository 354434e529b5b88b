//! Session-owned registry of tracks keyed by tag id

use crate::core::{PositionEstimate, DEFAULT_TRAIL_LENGTH};
use crate::tracking::track::{Track, TrackColor, TrackSnapshot};
use std::collections::BTreeMap;
use tracing::info;

/// Owns every track seen during one run
///
/// Callers serialize access through `&mut self`; there is no internal locking.
#[derive(Debug, Clone)]
pub struct TrackManager {
    tracks: BTreeMap<String, Track>,
    trail_length: usize,
    tags_seen: usize,
}

impl Default for TrackManager {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_LENGTH)
    }
}

impl TrackManager {
    pub fn new(trail_length: usize) -> Self {
        Self {
            tracks: BTreeMap::new(),
            trail_length: trail_length.max(1),
            tags_seen: 0,
        }
    }

    pub fn trail_length(&self) -> usize {
        self.trail_length
    }

    /// Apply one estimate to its tag's track
    ///
    /// A first sighting creates an empty track even when the estimate is a
    /// no-fix. A no-fix never touches an existing trail.
    pub fn update(&mut self, tag_id: &str, estimate: &PositionEstimate) {
        let track = self.track_mut(tag_id);
        if let Some(position) = estimate.position() {
            track.push(position);
        }
    }

    pub fn snapshot(&self, tag_id: &str) -> Option<TrackSnapshot> {
        self.tracks.get(tag_id).map(|track| track.snapshot(tag_id))
    }

    /// Snapshots of all tracks in tag id order
    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .iter()
            .map(|(tag_id, track)| track.snapshot(tag_id))
            .collect()
    }

    pub fn get(&self, tag_id: &str) -> Option<&Track> {
        self.tracks.get(tag_id)
    }

    pub fn tag_ids(&self) -> Vec<&str> {
        self.tracks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn track_mut(&mut self, tag_id: &str) -> &mut Track {
        let tags_seen = &mut self.tags_seen;
        let trail_length = self.trail_length;
        self.tracks.entry(tag_id.to_string()).or_insert_with(|| {
            let color = TrackColor::for_index(*tags_seen);
            *tags_seen += 1;
            info!(tag = tag_id, r = color.r, g = color.g, b = color.b, "new tag");
            Track::new(color, trail_length)
        })
    }
}
