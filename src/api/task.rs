//! Contains [`SessionScheduler`], a bounded background executor with one live job per session.

use crate::{CancelToken, MosaicError};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc},
};

/// The live job token of each session.
type Sessions<K> = Arc<Mutex<HashMap<K, CancelToken>>>;

/// Runs quantization and consolidation jobs on a fixed size thread pool,
/// keeping at most one live job per session (for example, one per open image).
///
/// Submitting a job for a session cancels the session's previous job.
/// A cancelled job stops at its next checkpoint and its [`JobHandle`] resolves to
/// [`MosaicError::Cancelled`], even if the job managed to finish first.
/// A job that panics resolves to [`MosaicError::JobPanicked`] without taking down the pool.
///
/// # Examples
/// ```
/// # use pegmosaic::{MosaicPipeline, PixelGrid, SessionScheduler};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let scheduler = SessionScheduler::new(2)?;
/// let rgba = vec![255; 32 * 32 * 4];
///
/// let handle = scheduler.submit("image-1", move |cancel| {
///     let grid = PixelGrid::new(&rgba, 32, 32)?;
///     MosaicPipeline::new(grid).color_count(8).run_cancellable(cancel)
/// });
///
/// let mosaic = handle.wait()?;
/// assert_eq!(mosaic.labels().len(), 32 * 32);
/// # Ok(())
/// # }
/// ```
pub struct SessionScheduler<K> {
    /// The threads that run the jobs.
    pool: ThreadPool,
    /// The token of the latest job of each session.
    sessions: Sessions<K>,
}

impl<K> fmt::Debug for SessionScheduler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionScheduler")
            .field("num_threads", &self.pool.current_num_threads())
            .field("active_sessions", &self.sessions.lock().len())
            .finish()
    }
}

impl<K> SessionScheduler<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
{
    /// Creates a new [`SessionScheduler`] with `num_threads` worker threads.
    ///
    /// A `num_threads` of `0` lets [`rayon`] pick the number of threads.
    ///
    /// # Errors
    /// Returns an error if the thread pool could not be created.
    pub fn new(num_threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("pegmosaic-{i}"))
            .build()?;

        Ok(Self { pool, sessions: Arc::default() })
    }

    /// Returns the number of worker threads.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Returns the number of sessions with a job that is queued or running.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Queues `job` for `session`, cancelling the session's previous job.
    ///
    /// The job receives its own [`CancelToken`] and should pass it to the cancellable
    /// variants of the quantization and consolidation functions.
    pub fn submit<T, F>(&self, session: K, job: F) -> JobHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T, MosaicError> + Send + 'static,
    {
        let cancel = CancelToken::new();
        if let Some(previous) = self.sessions.lock().insert(session.clone(), cancel.clone()) {
            previous.cancel();
            tracing::debug!(?session, "superseded previous job");
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let sessions = Arc::clone(&self.sessions);
        let token = cancel.clone();
        self.pool.spawn(move || {
            let result = token.checkpoint().and_then(|()| {
                panic::catch_unwind(AssertUnwindSafe(|| job(&token))).unwrap_or_else(|_| {
                    tracing::warn!(?session, "job panicked");
                    Err(MosaicError::JobPanicked)
                })
            });

            {
                let mut sessions = sessions.lock();
                if sessions.get(&session).is_some_and(|live| live.same_as(&token)) {
                    sessions.remove(&session);
                }
            }

            if let Err(err) = &result {
                tracing::debug!(?session, %err, "job did not finish");
            }

            // the handle may have been dropped already
            let _ = tx.send(result);
        });

        JobHandle { rx, cancel }
    }

    /// Cancels the current job of `session`, if any.
    pub fn cancel(&self, session: &K) {
        if let Some(token) = self.sessions.lock().remove(session) {
            token.cancel();
        }
    }
}

/// A handle to the result of a job submitted to a [`SessionScheduler`].
#[derive(Debug)]
pub struct JobHandle<T> {
    /// Receives the result of the job.
    rx: mpsc::Receiver<Result<T, MosaicError>>,
    /// The token of the job.
    cancel: CancelToken,
}

impl<T> JobHandle<T> {
    /// Cancels the job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the job was cancelled or superseded.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Applies the cancellation state to a received result.
    fn resolve(&self, result: Result<T, MosaicError>) -> Result<T, MosaicError> {
        self.cancel.checkpoint()?;
        result
    }

    /// Blocks until the job has finished and returns its result.
    ///
    /// # Errors
    /// Returns [`MosaicError::Cancelled`] if the job was cancelled or superseded,
    /// [`MosaicError::JobPanicked`] if it panicked, otherwise the job's own error.
    pub fn wait(self) -> Result<T, MosaicError> {
        match self.rx.recv() {
            Ok(result) => self.resolve(result),
            // the pool dropped the job without running it
            Err(mpsc::RecvError) => Err(MosaicError::Cancelled),
        }
    }

    /// Returns the result of the job if it has finished, without blocking.
    ///
    /// The result can only be taken once, so the handle is consumed on success
    /// and given back if the job is still queued or running.
    ///
    /// # Errors
    /// Returns `Err(self)` if the job has not finished yet.
    /// The inner result is the same as for [`JobHandle::wait`].
    pub fn try_wait(self) -> Result<Result<T, MosaicError>, Self> {
        match self.rx.try_recv() {
            Ok(result) => Ok(self.resolve(result)),
            Err(mpsc::TryRecvError::Empty) => Err(self),
            Err(mpsc::TryRecvError::Disconnected) => Ok(Err(MosaicError::Cancelled)),
        }
    }
}
