//! Runs a [`FeedController`] against a [`RecommendationSource`].
//!
//! Fetches execute on worker threads and report back over a channel; the
//! owning thread applies them in [`Session::poll`]. Nothing here holds a lock
//! across the controller, so all state changes happen on the owner's thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::data::RecommendationSource;
use crate::feed::{
    Direction, FeedController, FeedError, FeedState, Feedback, FetchOutcome, FetchRequest, Phase,
    SessionHistory,
};

pub struct FetchResponse {
    pub request_id: u64,
    pub outcome: FetchOutcome,
}

struct PendingFetch {
    request_id: u64,
    cancel_flag: Arc<AtomicBool>,
}

pub struct Session {
    controller: FeedController,
    source: Arc<dyn RecommendationSource + Send + Sync>,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
    pending: Option<PendingFetch>,
}

impl Session {
    pub fn new(source: Arc<dyn RecommendationSource + Send + Sync>) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            controller: FeedController::new(),
            source,
            response_tx,
            response_rx,
            pending: None,
        }
    }

    pub fn feed(&self) -> &FeedState {
        self.controller.feed()
    }

    pub fn history(&self) -> &SessionHistory {
        self.controller.history()
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn load_more(&mut self) {
        let request = self.controller.load_more();
        self.dispatch(request);
    }

    pub fn record_feedback(&mut self, index: usize, kind: Feedback) -> Result<(), FeedError> {
        if let Some(request) = self.controller.record_feedback(index, kind)? {
            self.dispatch(request);
        }
        Ok(())
    }

    /// Scrolling past the end while a fetch is in flight is ignored. Use
    /// [`Session::load_more`] to supersede the outstanding request.
    pub fn advance(&mut self, direction: Direction) {
        if matches!(direction, Direction::Forward)
            && self.fetch_in_flight_for(self.feed().current_index() + 1)
        {
            return;
        }
        if let Some(request) = self.controller.advance(direction) {
            self.dispatch(request);
        }
    }

    pub fn advance_to(&mut self, index: usize) {
        if self.fetch_in_flight_for(index) {
            return;
        }
        if let Some(request) = self.controller.advance_to(index) {
            self.dispatch(request);
        }
    }

    pub fn toggle_playing(&mut self, index: usize) -> Result<(), FeedError> {
        self.controller.toggle_playing(index)
    }

    /// Applies every response that has arrived. Returns true when state
    /// changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            changed |= self.apply(response);
        }
        changed
    }

    /// Blocks until no fetch is outstanding or `timeout` elapses. Returns
    /// true when the session is idle.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.controller.pending_request().is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => {
                    self.apply(response);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    fn fetch_in_flight_for(&self, target: usize) -> bool {
        let feed = self.feed();
        if feed.is_loading() && target >= feed.items().len() {
            debug!(target, "fetch already in flight; ignoring scroll past end");
            return true;
        }
        false
    }

    fn apply(&mut self, response: FetchResponse) -> bool {
        let FetchResponse {
            request_id,
            outcome,
        } = response;
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.request_id == request_id)
        {
            self.pending = None;
        }
        self.controller.complete_load(request_id, outcome)
    }

    fn dispatch(&mut self, request: FetchRequest) {
        if let Some(previous) = self.pending.take() {
            previous.cancel_flag.store(true, Ordering::SeqCst);
        }

        let FetchRequest { request_id, query } = request;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.pending = Some(PendingFetch {
            request_id,
            cancel_flag: cancel_flag.clone(),
        });

        let tx = self.response_tx.clone();
        let source = self.source.clone();
        thread::spawn(move || {
            let outcome = source.fetch(&query);
            if cancel_flag.load(Ordering::SeqCst) {
                debug!(request_id, "fetch superseded before delivery");
                return;
            }
            let _ = tx.send(FetchResponse {
                request_id,
                outcome,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ScriptedSource;
    use crate::feed::{HistoryQuery, VideoCandidate};
    use std::sync::atomic::AtomicUsize;

    const WAIT: Duration = Duration::from_secs(5);

    fn videos(ids: &[&str]) -> Vec<VideoCandidate> {
        ids.iter()
            .map(|id| VideoCandidate::new(*id, format!("Video {id}"), 0.3))
            .collect()
    }

    #[test]
    fn initial_load_populates_feed() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a", "b"])]));
        let mut session = Session::new(source.clone());
        assert_eq!(session.phase(), Phase::Initial);

        session.load_more();
        assert!(session.feed().is_loading());
        assert!(session.settle(WAIT));

        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(session.feed().items().len(), 2);
        assert!(session.feed().is_playing(0));
        assert_eq!(source.queries().len(), 1);
    }

    #[test]
    fn feedback_on_last_item_refetches_with_history() {
        let source = Arc::new(ScriptedSource::with_batches([
            videos(&["a", "b"]),
            videos(&["c"]),
        ]));
        let mut session = Session::new(source.clone());
        session.load_more();
        assert!(session.settle(WAIT));

        session.record_feedback(0, Feedback::Like).unwrap();
        assert!(!session.feed().is_loading());
        session.record_feedback(1, Feedback::Dislike).unwrap();
        assert!(session.feed().is_loading());
        assert!(session.settle(WAIT));

        let ids: Vec<_> = session.feed().items().iter().map(|v| v.id.clone()).collect();
        assert_eq!(ids, vec!["c"]);
        let queries = source.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].played, "a,b");
        assert_eq!(queries[1].liked, "a");
        assert_eq!(queries[1].disliked, "b");
    }

    #[test]
    fn failed_fetch_keeps_previous_items() {
        let source = Arc::new(ScriptedSource::with_batches([videos(&["a", "b"])]));
        source.push(FetchOutcome::Failed("connection refused".into()));
        let mut session = Session::new(source);
        session.load_more();
        assert!(session.settle(WAIT));

        session.advance(Direction::Forward);
        session.advance(Direction::Forward);
        assert!(session.settle(WAIT));

        assert_eq!(session.feed().items().len(), 2);
        assert!(!session.feed().is_loading());
        assert!(session.feed().last_error().is_some());
    }

    /// Holds every fetch until the test releases it.
    struct GatedSource {
        calls: AtomicUsize,
        release: Receiver<()>,
    }

    impl RecommendationSource for GatedSource {
        fn fetch(&self, _history: &HistoryQuery) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.release.recv_timeout(WAIT);
            FetchOutcome::Batch(videos(&["a", "b"]))
        }
    }

    #[test]
    fn scrolling_past_end_while_loading_does_not_refetch() {
        let (release_tx, release_rx) = unbounded();
        let source = Arc::new(GatedSource {
            calls: AtomicUsize::new(0),
            release: release_rx,
        });
        let mut session = Session::new(source.clone());
        session.load_more();
        release_tx.send(()).unwrap();
        assert!(session.settle(WAIT));

        session.advance(Direction::Forward);
        session.advance(Direction::Forward);
        assert!(session.feed().is_loading());
        for _ in 0..10 {
            session.advance(Direction::Forward);
        }
        session.advance_to(7);
        assert_eq!(session.feed().current_index(), 1);

        release_tx.send(()).unwrap();
        assert!(session.settle(WAIT));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(!session.feed().is_loading());
    }

    #[test]
    fn scrolling_within_feed_still_works_while_loading() {
        let (release_tx, release_rx) = unbounded();
        let source = Arc::new(GatedSource {
            calls: AtomicUsize::new(0),
            release: release_rx,
        });
        let mut session = Session::new(source);
        session.load_more();
        release_tx.send(()).unwrap();
        assert!(session.settle(WAIT));

        session.advance(Direction::Forward);
        session.load_more();
        session.advance(Direction::Backward);
        assert_eq!(session.feed().current_index(), 0);

        release_tx.send(()).unwrap();
        assert!(session.settle(WAIT));
    }

    #[test]
    fn out_of_range_feedback_is_reported() {
        let source = Arc::new(ScriptedSource::default());
        let mut session = Session::new(source);
        let err = session.record_feedback(0, Feedback::Like).unwrap_err();
        assert_eq!(err, FeedError::IndexOutOfRange { index: 0, len: 0 });
    }

    #[test]
    fn settle_without_pending_is_immediate() {
        let mut session = Session::new(Arc::new(ScriptedSource::default()));
        assert!(session.settle(Duration::from_millis(1)));
        assert!(!session.poll());
    }
}
