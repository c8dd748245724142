//! Feed session state and the transitions the front-end drives.
//!
//! [`FeedController`] never performs I/O. Operations that need more content
//! hand back a [`FetchRequest`]; whoever runs the controller executes it and
//! returns the result through [`FeedController::complete_load`].

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";
pub const THUMBNAIL_URL_BASE: &str = "https://img.youtube.com/vi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub id: String,
    pub title: String,
    pub score: f64,
}

impl VideoCandidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            score,
        }
    }

    pub fn watch_url(&self) -> String {
        format!("{WATCH_URL_BASE}{}", self.id)
    }

    pub fn thumbnail_url(&self) -> String {
        format!("{THUMBNAIL_URL_BASE}/{}/hqdefault.jpg", self.id)
    }

    /// Score as shown beside the like control.
    pub fn display_score(&self) -> i64 {
        (self.score * 1000.0).floor() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    Like,
    Dislike,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Like => "like",
            Feedback::Dislike => "dislike",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initial,
    Loading,
    Ready,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("video index {index} out of range (feed holds {len} items)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Interaction history for the lifetime of one session.
///
/// Sets keep insertion order so the ids go out to the source in the order
/// the user produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHistory {
    played: IndexSet<String>,
    liked: IndexSet<String>,
    disliked: IndexSet<String>,
}

impl SessionHistory {
    pub fn played(&self) -> &IndexSet<String> {
        &self.played
    }

    pub fn liked(&self) -> &IndexSet<String> {
        &self.liked
    }

    pub fn disliked(&self) -> &IndexSet<String> {
        &self.disliked
    }

    pub fn is_played(&self, id: &str) -> bool {
        self.played.contains(id)
    }

    pub fn feedback_for(&self, id: &str) -> Option<Feedback> {
        if self.liked.contains(id) {
            Some(Feedback::Like)
        } else if self.disliked.contains(id) {
            Some(Feedback::Dislike)
        } else {
            None
        }
    }

    fn mark_played(&mut self, id: &str) -> bool {
        self.played.insert(id.to_string())
    }

    // liked and disliked never share an id; the latest feedback wins.
    fn record(&mut self, id: &str, kind: Feedback) {
        self.mark_played(id);
        let (keep, opposite) = match kind {
            Feedback::Like => (&mut self.liked, &mut self.disliked),
            Feedback::Dislike => (&mut self.disliked, &mut self.liked),
        };
        opposite.shift_remove(id);
        keep.insert(id.to_string());
    }

    pub fn query(&self) -> HistoryQuery {
        HistoryQuery {
            played: join_ids(&self.played),
            liked: join_ids(&self.liked),
            disliked: join_ids(&self.disliked),
        }
    }
}

fn join_ids(ids: &IndexSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Comma-joined history lists, ready to become query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub played: String,
    pub liked: String,
    pub disliked: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub request_id: u64,
    pub query: HistoryQuery,
}

/// What a fetch produced, after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Batch(Vec<VideoCandidate>),
    ProtocolError(String),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    items: Vec<VideoCandidate>,
    current_index: usize,
    is_loading: bool,
    playing: HashMap<usize, bool>,
    last_error: Option<String>,
}

impl FeedState {
    pub fn items(&self) -> &[VideoCandidate] {
        &self.items
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&VideoCandidate> {
        self.items.get(self.current_index)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.playing.get(&index).copied().unwrap_or(false)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn play_only(&mut self, index: usize) {
        for value in self.playing.values_mut() {
            *value = false;
        }
        self.playing.insert(index, true);
    }
}

pub struct FeedController {
    feed: FeedState,
    history: SessionHistory,
    next_request_id: u64,
    pending_request: Option<u64>,
    completed_loads: u64,
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedController {
    pub fn new() -> Self {
        Self {
            feed: FeedState::default(),
            history: SessionHistory::default(),
            next_request_id: 1,
            pending_request: None,
            completed_loads: 0,
        }
    }

    pub fn feed(&self) -> &FeedState {
        &self.feed
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }

    pub fn phase(&self) -> Phase {
        if self.feed.is_loading {
            Phase::Loading
        } else if self.completed_loads == 0 {
            Phase::Initial
        } else if self.feed.items.is_empty() {
            Phase::Empty
        } else {
            Phase::Ready
        }
    }

    /// Starts a fetch. Any request still outstanding is superseded and its
    /// response will be dropped on arrival.
    pub fn load_more(&mut self) -> FetchRequest {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        if let Some(previous) = self.pending_request.replace(request_id) {
            debug!(previous, request_id, "superseding outstanding fetch");
        }
        self.feed.is_loading = true;
        let query = self.history.query();
        info!(
            request_id,
            played = self.history.played.len(),
            liked = self.history.liked.len(),
            disliked = self.history.disliked.len(),
            "requesting recommendations"
        );
        FetchRequest { request_id, query }
    }

    /// Applies a fetch result. Returns false when the response was stale and
    /// ignored.
    pub fn complete_load(&mut self, request_id: u64, outcome: FetchOutcome) -> bool {
        if self.pending_request != Some(request_id) {
            warn!(
                request_id,
                pending = ?self.pending_request,
                "discarding stale recommendation response"
            );
            return false;
        }
        self.pending_request = None;
        self.completed_loads += 1;

        match outcome {
            FetchOutcome::Batch(batch) => {
                let received = batch.len();
                self.feed.items = dedup_by_id(batch);
                self.feed.current_index = 0;
                self.feed.last_error = None;
                info!(
                    request_id,
                    received,
                    kept = self.feed.items.len(),
                    "recommendations loaded"
                );
            }
            FetchOutcome::ProtocolError(reason) => {
                warn!(request_id, %reason, "unexpected response from recommendation source");
                self.feed.last_error = Some(format!("Unexpected response: {reason}"));
            }
            FetchOutcome::Failed(reason) => {
                error!(request_id, %reason, "error fetching recommendations");
                self.feed.last_error = Some(format!("Failed to load recommendations: {reason}"));
            }
        }

        self.feed.is_loading = false;
        self.feed.playing.clear();
        self.feed.playing.insert(0, true);
        true
    }

    pub fn record_feedback(
        &mut self,
        index: usize,
        kind: Feedback,
    ) -> Result<Option<FetchRequest>, FeedError> {
        let len = self.feed.items.len();
        let video = self
            .feed
            .items
            .get(index)
            .ok_or(FeedError::IndexOutOfRange { index, len })?;
        let id = video.id.clone();
        debug!(video_id = %id, feedback = kind.as_str(), "recording feedback");
        self.history.record(&id, kind);

        if index + 1 == len {
            return Ok(Some(self.load_more()));
        }
        Ok(None)
    }

    pub fn advance(&mut self, direction: Direction) -> Option<FetchRequest> {
        match direction {
            Direction::Forward => self.advance_to(self.feed.current_index + 1),
            Direction::Backward => {
                let next = self.feed.current_index.checked_sub(1)?;
                self.advance_to(next)
            }
        }
    }

    /// Moves focus to `target`, as when a scroll offset settles on an item.
    /// Moving forward marks every item left behind as played; moving past the
    /// end asks for more content.
    pub fn advance_to(&mut self, target: usize) -> Option<FetchRequest> {
        let current = self.feed.current_index;
        if target == current && target < self.feed.items.len() {
            return None;
        }

        if target > current {
            let end = target.min(self.feed.items.len());
            for index in current..end {
                let id = self.feed.items[index].id.clone();
                if self.history.mark_played(&id) {
                    debug!(video_id = %id, "marked played on scroll");
                }
            }
        }

        if target < self.feed.items.len() {
            self.feed.current_index = target;
            self.feed.play_only(target);
            None
        } else {
            Some(self.load_more())
        }
    }

    pub fn toggle_playing(&mut self, index: usize) -> Result<(), FeedError> {
        let len = self.feed.items.len();
        if len > 0 && index >= len {
            return Err(FeedError::IndexOutOfRange { index, len });
        }
        let entry = self.feed.playing.entry(index).or_insert(false);
        *entry = !*entry;
        Ok(())
    }
}

fn dedup_by_id(batch: Vec<VideoCandidate>) -> Vec<VideoCandidate> {
    let mut seen: IndexSet<String> = IndexSet::with_capacity(batch.len());
    batch
        .into_iter()
        .filter(|video| seen.insert(video.id.clone()))
        .collect()
}
