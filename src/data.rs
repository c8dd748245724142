use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::feed::{FetchOutcome, HistoryQuery, VideoCandidate};
use crate::recommend;

pub trait RecommendationSource: Send + Sync {
    fn fetch(&self, history: &HistoryQuery) -> FetchOutcome;
}

pub struct HttpRecommendationSource {
    client: Arc<recommend::Client>,
}

impl HttpRecommendationSource {
    pub fn new(client: Arc<recommend::Client>) -> Self {
        Self { client }
    }
}

impl RecommendationSource for HttpRecommendationSource {
    fn fetch(&self, history: &HistoryQuery) -> FetchOutcome {
        self.client.fetch(history)
    }
}

/// Replays queued outcomes in order and remembers every query it saw.
/// Once the queue runs dry it answers with an empty batch.
#[derive(Default)]
pub struct ScriptedSource {
    outcomes: Mutex<VecDeque<FetchOutcome>>,
    queries: Mutex<Vec<HistoryQuery>>,
}

impl ScriptedSource {
    pub fn new(outcomes: impl IntoIterator<Item = FetchOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_batches<I, B>(batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = VideoCandidate>,
    {
        Self::new(
            batches
                .into_iter()
                .map(|batch| FetchOutcome::Batch(batch.into_iter().collect())),
        )
    }

    pub fn push(&self, outcome: FetchOutcome) {
        self.outcomes.lock().push_back(outcome);
    }

    pub fn queries(&self) -> Vec<HistoryQuery> {
        self.queries.lock().clone()
    }
}

impl RecommendationSource for ScriptedSource {
    fn fetch(&self, history: &HistoryQuery) -> FetchOutcome {
        self.queries.lock().push(history.clone());
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| FetchOutcome::Batch(Vec::new()))
    }
}
