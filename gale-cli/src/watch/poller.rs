//! Job status poller
//!
//! Fetches a job's details on a fixed interval and publishes a fresh
//! [`PollState`] after every successful fetch, until the job reaches a
//! terminal state, the user cancels it, or the view goes away.
//! Failed fetches are skipped silently; the next tick simply tries again.
//! A fetch that has not answered within one interval is dropped and counts
//! as a failed one.

use async_trait::async_trait;
use chrono::Utc;
use gale_client::WindmillClient;
use gale_core::domain::job::JobDetails;
use gale_core::domain::workspace::WorkspaceConnection;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::PollState;
use crate::store::ExecTimeStore;

/// Remote side of a job view
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn job_details(&self, job_id: Uuid) -> gale_client::Result<JobDetails>;

    async fn cancel_job(&self, job_id: Uuid) -> gale_client::Result<String>;
}

#[async_trait]
impl JobSource for WindmillClient {
    async fn job_details(&self, job_id: Uuid) -> gale_client::Result<JobDetails> {
        self.get_job(job_id).await
    }

    async fn cancel_job(&self, job_id: Uuid) -> gale_client::Result<String> {
        WindmillClient::cancel_job(self, job_id).await
    }
}

/// Commands a view can send to its poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    Cancel,
    Quit,
}

/// Why polling stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The service reported the job completed or canceled
    Terminal,
    /// The user canceled the job from the view
    CanceledLocally,
    /// The view quit before the job finished
    Detached,
}

/// Result of a finished poll, with the background writes still in flight
#[derive(Debug)]
pub struct PollOutcome {
    pub reason: StopReason,
    pending: Vec<JoinHandle<()>>,
}

impl PollOutcome {
    /// Give fire-and-forget tasks (cancel request, store writes) up to
    /// `grace` to finish before the process exits
    pub async fn settle(self, grace: Duration) -> StopReason {
        let pending = join_pending(self.pending);
        if time::timeout(grace, pending).await.is_err() {
            debug!("Background tasks still running after {:?}, leaving them", grace);
        }
        self.reason
    }
}

async fn join_pending(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Background task panicked: {}", e);
        }
    }
}

/// Polls one job for one view
pub struct JobPoller {
    source: Arc<dyn JobSource>,
    store: Arc<dyn ExecTimeStore>,
    conn: WorkspaceConnection,
    job_id: Uuid,
    /// Script or flow path the last execution time is recorded under
    path: Option<String>,
    interval: Duration,
    pending: Vec<JoinHandle<()>>,
}

impl JobPoller {
    pub fn new(
        source: Arc<dyn JobSource>,
        store: Arc<dyn ExecTimeStore>,
        conn: WorkspaceConnection,
        job_id: Uuid,
        path: Option<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            conn,
            job_id,
            path,
            interval,
            pending: Vec::new(),
        }
    }

    /// Start polling on a background task
    ///
    /// The returned handle owns the task: dropping it stops polling.
    pub fn spawn(self) -> PollHandle {
        let (state_tx, state_rx) = watch::channel(PollState::loading());
        let (command_tx, command_rx) = mpsc::channel(8);
        let task = tokio::spawn(self.run(command_rx, state_tx));

        PollHandle {
            state: state_rx,
            commands: command_tx,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<ViewCommand>,
        state_tx: watch::Sender<PollState>,
    ) -> PollOutcome {
        info!("Polling job {} every {:?}", self.job_id, self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    return self.stop_on_command(command, &state_tx);
                }
                _ = ticker.tick() => {}
            }

            self.pending.retain(|handle| !handle.is_finished());

            let source = Arc::clone(&self.source);
            let fetch = time::timeout(self.interval, source.job_details(self.job_id));
            let fetched = tokio::select! {
                biased;
                command = commands.recv() => {
                    return self.stop_on_command(command, &state_tx);
                }
                fetched = fetch => fetched,
            };

            let details = match fetched {
                Ok(Ok(details)) => details,
                Ok(Err(e)) => {
                    debug!("No update for job {} this tick: {}", self.job_id, e);
                    continue;
                }
                Err(_) => {
                    debug!("Fetch for job {} timed out after {:?}", self.job_id, self.interval);
                    continue;
                }
            };

            let now = Utc::now();
            let state = PollState::from_details(&self.conn, &details, now);
            self.record_exec_time(&details, now.timestamp_millis());

            let completed = state.completed;
            state_tx.send_replace(state);

            if completed {
                info!("Job {} reached a terminal state", self.job_id);
                return self.finish(StopReason::Terminal);
            }
        }
    }

    fn stop_on_command(
        mut self,
        command: Option<ViewCommand>,
        state_tx: &watch::Sender<PollState>,
    ) -> PollOutcome {
        match command {
            Some(ViewCommand::Cancel) => {
                self.spawn_cancel();
                state_tx.send_modify(PollState::cancel_locally);
                self.finish(StopReason::CanceledLocally)
            }
            Some(ViewCommand::Quit) | None => {
                debug!("View for job {} closed", self.job_id);
                self.finish(StopReason::Detached)
            }
        }
    }

    fn finish(self, reason: StopReason) -> PollOutcome {
        PollOutcome {
            reason,
            pending: self.pending,
        }
    }

    /// Send the cancel request without waiting for it
    fn spawn_cancel(&mut self) {
        let source = Arc::clone(&self.source);
        let job_id = self.job_id;

        self.pending.push(tokio::spawn(async move {
            match source.cancel_job(job_id).await {
                Ok(reply) => info!("Cancel requested for job {}: {}", job_id, reply.trim()),
                Err(e) => warn!("Failed to cancel job {}: {}", job_id, e),
            }
        }));
    }

    /// Record when the job's script or flow was last executed
    fn record_exec_time(&mut self, details: &JobDetails, epoch_ms: i64) {
        let Some(path) = self.path.clone().or_else(|| details.script_path.clone()) else {
            debug!("Job {} has no path, not recording execution time", self.job_id);
            return;
        };
        let store = Arc::clone(&self.store);

        self.pending.push(tokio::spawn(async move {
            if let Err(e) = store.record_last_exec_time(&path, epoch_ms).await {
                warn!("Failed to record last execution time for {}: {}", path, e);
            }
        }));
    }
}

/// Owning handle on a running poller
///
/// Dropping the handle aborts the poll task.
pub struct PollHandle {
    state: watch::Receiver<PollState>,
    commands: mpsc::Sender<ViewCommand>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Subscribe to state updates
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Latest published state
    pub fn current(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Ask the poller to cancel the job and stop
    pub async fn cancel(&self) {
        if self.commands.send(ViewCommand::Cancel).await.is_err() {
            debug!("Poller already stopped, cancel ignored");
        }
    }

    /// Ask the poller to stop without touching the job
    pub async fn quit(&self) {
        let _ = self.commands.send(ViewCommand::Quit).await;
    }

    /// Wait for the poller to stop
    pub async fn join(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome {
                reason: StopReason::Detached,
                pending: Vec::new(),
            };
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Poll task ended abnormally: {}", e);
                PollOutcome {
                    reason: StopReason::Detached,
                    pending: Vec::new(),
                }
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::watch::render::tests::{completed, script_job};
    use gale_client::ClientError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const TICK: Duration = Duration::from_millis(10);

    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub(crate) replies: Mutex<VecDeque<gale_client::Result<JobDetails>>>,
        pub(crate) fallback: Mutex<Option<JobDetails>>,
        pub(crate) fetches: AtomicUsize,
        /// Cancel requests started
        pub(crate) cancels: AtomicUsize,
        /// Cancel requests that returned
        pub(crate) cancels_done: AtomicUsize,
        pub(crate) cancel_fails: bool,
        /// Held cancel requests wait for a notification before returning
        pub(crate) cancel_hold: Option<Arc<Notify>>,
        /// The first fetch never answers
        pub(crate) stall_first: bool,
    }

    impl FakeSource {
        pub(crate) fn with_replies(replies: Vec<gale_client::Result<JobDetails>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }

        pub(crate) fn running_forever() -> Self {
            let source = Self::default();
            *source.fallback.lock().unwrap() = Some(script_job(Utc::now()));
            source
        }
    }

    #[async_trait]
    impl JobSource for FakeSource {
        async fn job_details(&self, _job_id: Uuid) -> gale_client::Result<JobDetails> {
            let attempt = self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.stall_first && attempt == 0 {
                time::sleep(Duration::from_secs(3600)).await;
            }
            if let Some(reply) = self.replies.lock().unwrap().pop_front() {
                return reply;
            }
            self.fallback
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ClientError::ParseError("no reply".into()))
        }

        async fn cancel_job(&self, job_id: Uuid) -> gale_client::Result<String> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            if let Some(hold) = &self.cancel_hold {
                hold.notified().await;
            }
            self.cancels_done.fetch_add(1, Ordering::SeqCst);
            if self.cancel_fails {
                Err(ClientError::api_error(500, "boom"))
            } else {
                Ok(format!("canceled {}", job_id))
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub(crate) items: Mutex<HashMap<String, i64>>,
        pub(crate) writes: AtomicUsize,
    }

    #[async_trait]
    impl ExecTimeStore for FakeStore {
        async fn set_item(&self, key: &str, value: i64) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.items.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn get_item(&self, key: &str) -> Result<Option<i64>, StoreError> {
            Ok(self.items.lock().unwrap().get(key).copied())
        }
    }

    pub(crate) fn conn() -> WorkspaceConnection {
        WorkspaceConnection::new("https://wm.example.com", "demo", "t")
    }

    fn poller(source: Arc<FakeSource>, store: Arc<FakeStore>, path: Option<&str>) -> JobPoller {
        JobPoller::new(
            source,
            store,
            conn(),
            Uuid::nil(),
            path.map(str::to_string),
            TICK,
        )
    }

    #[tokio::test]
    async fn test_polls_until_completed_skipping_failures() {
        let now = Utc::now();
        let source = Arc::new(FakeSource::with_replies(vec![
            Err(ClientError::ParseError("bad json".into())),
            Ok(script_job(now)),
            Err(ClientError::api_error(502, "gateway")),
            Ok(completed(script_job(now), true, "ok")),
        ]));
        let store = Arc::new(FakeStore::default());

        let handle = poller(Arc::clone(&source), Arc::clone(&store), Some("u/alice/flowy")).spawn();
        let state_rx = handle.subscribe();
        let outcome = handle.join().await;
        let reason = outcome.settle(Duration::from_secs(1)).await;

        assert_eq!(reason, StopReason::Terminal);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 4);

        let state = state_rx.borrow().clone();
        assert!(state.completed);
        assert!(state.success);
        assert_eq!(state.result_text, "ok");
        assert!(state.rendered_markdown.contains("```\nok\n```"));

        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
        assert!(
            store
                .get_item("u/alice/flowy:last_exec_time")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_remote_cancel_stops_polling() {
        let mut job = script_job(Utc::now());
        job.canceled = true;
        let source = Arc::new(FakeSource::with_replies(vec![Ok(job)]));
        let store = Arc::new(FakeStore::default());

        let handle = poller(Arc::clone(&source), store, None).spawn();
        let state_rx = handle.subscribe();
        let outcome = handle.join().await;

        assert_eq!(outcome.reason, StopReason::Terminal);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        let state = state_rx.borrow().clone();
        assert!(state.completed);
        assert!(state.rendered_markdown.contains("Canceled"));
        assert_eq!(source.cancels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_records_under_script_path_when_no_path_given() {
        let now = Utc::now();
        let source = Arc::new(FakeSource::with_replies(vec![Ok(completed(
            script_job(now),
            true,
            "ok",
        ))]));
        let store = Arc::new(FakeStore::default());

        let outcome = poller(source, Arc::clone(&store), None).spawn().join().await;
        outcome.settle(Duration::from_secs(1)).await;

        assert!(
            store
                .last_exec_time("u/alice/hello")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_cancel_completes_locally_even_if_request_fails() {
        let hold = Arc::new(Notify::new());
        let source = Arc::new(FakeSource {
            cancel_fails: true,
            cancel_hold: Some(Arc::clone(&hold)),
            ..FakeSource::running_forever()
        });
        let store = Arc::new(FakeStore::default());

        let handle = poller(Arc::clone(&source), store, None).spawn();
        let mut state_rx = handle.subscribe();
        state_rx.changed().await.unwrap();
        assert!(!state_rx.borrow().completed);

        handle.cancel().await;
        let outcome = handle.join().await;
        assert_eq!(outcome.reason, StopReason::CanceledLocally);

        // The request is in flight and has not answered yet
        tokio::time::sleep(TICK).await;
        assert_eq!(source.cancels.load(Ordering::SeqCst), 1);
        assert_eq!(source.cancels_done.load(Ordering::SeqCst), 0);
        assert!(state_rx.borrow().completed);
        assert!(!state_rx.borrow().is_loading);

        hold.notify_one();
        outcome.settle(Duration::from_secs(1)).await;
        assert_eq!(source.cancels_done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_settle_gives_up_on_a_stuck_cancel() {
        let source = Arc::new(FakeSource {
            cancel_hold: Some(Arc::new(Notify::new())),
            ..FakeSource::running_forever()
        });
        let handle = poller(Arc::clone(&source), Arc::new(FakeStore::default()), None).spawn();
        let mut state_rx = handle.subscribe();
        state_rx.changed().await.unwrap();

        handle.cancel().await;
        let outcome = handle.join().await;
        let reason = outcome.settle(TICK * 3).await;

        assert_eq!(reason, StopReason::CanceledLocally);
        assert_eq!(source.cancels_done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stalled_fetch_does_not_stop_polling() {
        let now = Utc::now();
        let source = Arc::new(FakeSource {
            stall_first: true,
            ..FakeSource::with_replies(vec![Ok(completed(script_job(now), true, "ok"))])
        });
        let store = Arc::new(FakeStore::default());

        let handle = poller(Arc::clone(&source), store, None).spawn();
        let state_rx = handle.subscribe();
        let outcome = time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("poller stuck behind a stalled fetch");

        assert_eq!(outcome.reason, StopReason::Terminal);
        assert!(source.fetches.load(Ordering::SeqCst) > 1);
        assert!(state_rx.borrow().completed);
        assert_eq!(state_rx.borrow().result_text, "ok");
    }

    #[tokio::test]
    async fn test_quit_detaches_without_cancel() {
        let source = Arc::new(FakeSource::running_forever());
        let handle = poller(Arc::clone(&source), Arc::new(FakeStore::default()), None).spawn();

        handle.quit().await;
        let outcome = handle.join().await;

        assert_eq!(outcome.reason, StopReason::Detached);
        assert_eq!(source.cancels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_polling() {
        let source = Arc::new(FakeSource::running_forever());
        let handle = poller(Arc::clone(&source), Arc::new(FakeStore::default()), None).spawn();
        let mut state_rx = handle.subscribe();
        state_rx.changed().await.unwrap();

        drop(handle);
        tokio::time::sleep(TICK * 3).await;
        let fetches = source.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(TICK * 5).await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), fetches);
    }
}
