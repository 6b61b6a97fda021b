//! Multi-session dispatcher: runs several sessions concurrently.
//!
//! Sessions are started on the Tokio runtime the first time
//! [`Dispatcher::perform`] is called after they were added. Each completed
//! session is reported exactly once through [`Dispatcher::info_read`];
//! its result stays retrievable through [`Dispatcher::content`] until the
//! session is removed.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use easy_http::{Dispatcher, OptionKey, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut dispatcher = Dispatcher::new();
//! for url in ["http://a.example/", "http://b.example/"] {
//!     let mut session = Session::with_url(url);
//!     session.set_option(OptionKey::ReturnTransfer, true)?;
//!     dispatcher.add(session);
//! }
//! while dispatcher.perform() > 0 {
//!     dispatcher.select(Some(Duration::from_secs(1))).await;
//! }
//! while let Some(done) = dispatcher.info_read() {
//!     println!("{:?} finished with {}", done.id, done.code);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::error::ErrorCode;
use crate::info::ExecResult;
use crate::session::Session;

/// Identifies a session inside a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(usize);

/// Completion notice returned by [`Dispatcher::info_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDone {
    /// Which session finished.
    pub id: SessionId,
    /// Its error code.
    pub code: ErrorCode,
}

struct Finished {
    id: SessionId,
    session: Session,
    result: ExecResult,
}

/// A session that panicked mid-transfer is gone; only its code remains.
struct Completed {
    session: Option<Session>,
    result: ExecResult,
    code: ErrorCode,
}

/// Runs many sessions concurrently and reports completions.
///
/// Dropping the dispatcher aborts sessions that are still running; use
/// [`close`](Self::close) to let them finish.
pub struct Dispatcher {
    next_id: usize,
    pending: BTreeMap<SessionId, Session>,
    completed: HashMap<SessionId, Completed>,
    unreported: VecDeque<SessionId>,
    tasks: JoinSet<Finished>,
    task_ids: HashMap<tokio::task::Id, SessionId>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: BTreeMap::new(),
            completed: HashMap::new(),
            unreported: VecDeque::new(),
            tasks: JoinSet::new(),
            task_ids: HashMap::new(),
        }
    }

    /// Adds a session; it starts on the next [`perform`](Self::perform).
    pub fn add(&mut self, session: Session) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        debug!(?id, "session added");
        self.pending.insert(id, session);
        id
    }

    /// Removes a session that is not running and hands it back.
    ///
    /// Returns `None` for unknown or still-running sessions, and for a
    /// session whose transfer panicked (its entry is still removed).
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.collect_finished();
        if let Some(session) = self.pending.remove(&id) {
            return Some(session);
        }
        let completed = self.completed.remove(&id)?;
        self.unreported.retain(|other| *other != id);
        completed.session
    }

    /// Starts every added session that has not run yet, then collects
    /// finished ones. Returns how many are still running.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(level = "debug", skip(self))]
    pub fn perform(&mut self) -> usize {
        self.start_pending();
        self.collect_finished();
        self.still_running()
    }

    fn start_pending(&mut self) {
        for (id, mut session) in std::mem::take(&mut self.pending) {
            debug!(?id, "starting session");
            let handle = self.tasks.spawn(async move {
                let result = session.execute().await;
                Finished {
                    id,
                    session,
                    result,
                }
            });
            self.task_ids.insert(handle.id(), id);
        }
    }

    fn collect_finished(&mut self) -> usize {
        let mut collected = 0;
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.store(joined);
            collected += 1;
        }
        collected
    }

    fn store(&mut self, joined: Result<(tokio::task::Id, Finished), JoinError>) {
        let (id, completed) = match joined {
            Ok((task_id, finished)) => {
                self.task_ids.remove(&task_id);
                let code = finished.session.error_code();
                info!(id = ?finished.id, code = code.as_i32(), "session finished");
                (
                    finished.id,
                    Completed {
                        session: Some(finished.session),
                        result: finished.result,
                        code,
                    },
                )
            }
            Err(join_error) => {
                let Some(id) = self.task_ids.remove(&join_error.id()) else {
                    warn!(error = %join_error, "unknown session task failed");
                    return;
                };
                warn!(?id, error = %join_error, "session task panicked");
                (
                    id,
                    Completed {
                        session: None,
                        result: ExecResult::Failed,
                        code: ErrorCode::TransportFailure,
                    },
                )
            }
        };
        self.unreported.push_back(id);
        self.completed.insert(id, completed);
    }

    /// Number of sessions currently executing.
    #[must_use]
    pub fn still_running(&self) -> usize {
        self.tasks.len()
    }

    /// True when at least one completion has not been read yet.
    pub fn some_result_ready(&mut self) -> bool {
        self.collect_finished();
        !self.unreported.is_empty()
    }

    /// Waits until at least one more session completes or `timeout` elapses.
    ///
    /// `None` waits without limit. Returns true when something completed;
    /// returns false at once when nothing is running.
    pub async fn select(&mut self, timeout: Option<Duration>) -> bool {
        if self.collect_finished() > 0 {
            return true;
        }
        if self.tasks.is_empty() {
            return false;
        }
        let joined = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.tasks.join_next_with_id())
                .await
                .ok()
                .flatten(),
            None => self.tasks.join_next_with_id().await,
        };
        match joined {
            Some(joined) => {
                self.store(joined);
                true
            }
            None => false,
        }
    }

    /// Next unread completion; each session is reported once.
    pub fn info_read(&mut self) -> Option<TransferDone> {
        self.collect_finished();
        let id = self.unreported.pop_front()?;
        let code = self.completed.get(&id)?.code;
        Some(TransferDone { id, code })
    }

    /// In-memory content of a completed session.
    #[must_use]
    pub fn content(&self, id: SessionId) -> Option<&[u8]> {
        self.completed.get(&id)?.result.content()
    }

    /// Result of a completed session.
    #[must_use]
    pub fn result(&self, id: SessionId) -> Option<&ExecResult> {
        self.completed.get(&id).map(|c| &c.result)
    }

    /// A session that is not running.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.pending
            .get(&id)
            .or_else(|| self.completed.get(&id)?.session.as_ref())
    }

    /// Closes every session that is not running.
    ///
    /// Running sessions finish in the background and are then dropped.
    pub fn close(mut self) {
        self.collect_finished();
        self.tasks.detach_all();
        for (_, session) in std::mem::take(&mut self.pending) {
            session.close();
        }
        for (_, completed) in self.completed.drain() {
            if let Some(session) = completed.session {
                session.close();
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending.len())
            .field("running", &self.still_running())
            .field("completed", &self.completed.len())
            .field("unreported", &self.unreported.len())
            .finish()
    }
}
