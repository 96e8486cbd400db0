//! Animation execution contexts.
//!
//! The control sequence never waits on an animation. It hands each default animation
//! to an [`AnimationExecutor`] and continues; the job reports back through the
//! control channel when it is done.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::trace;

use crate::animation::AnimationJob;

pub trait AnimationExecutor: Send + Sync {
    fn execute(&self, job: AnimationJob);
}

/// Holds jobs until the host drives them. Deterministic; suited to frame-driven hosts
/// and tests.
#[derive(Debug, Default)]
pub struct QueuedExecutor {
    jobs: Mutex<Vec<AnimationJob>>,
}

impl QueuedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Apply one frame at `fraction` to every pending job.
    pub fn step(&self, fraction: f32) {
        for job in self.jobs.lock().iter_mut() {
            job.apply_fraction(fraction);
        }
    }

    /// Complete the oldest pending job. Returns false when nothing is pending.
    pub fn finish_next(&self) -> bool {
        let job = {
            let mut jobs = self.jobs.lock();
            if jobs.is_empty() {
                return false;
            }
            jobs.remove(0)
        };
        job.finish();
        true
    }

    /// Complete every pending job, oldest first.
    pub fn finish_all(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let n = jobs.len();
        jobs.into_iter().for_each(AnimationJob::finish);
        n
    }

    /// Cancel every pending job.
    pub fn cancel_all(&self) -> usize {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        let n = jobs.len();
        jobs.into_iter().for_each(AnimationJob::cancel);
        n
    }
}

impl AnimationExecutor for QueuedExecutor {
    fn execute(&self, job: AnimationJob) {
        trace!(token = %job.token(), animation = %job.id(), "queued default animation");
        self.jobs.lock().push(job);
    }
}

/// Runs each job as a tokio task ticking at a fixed frame interval.
#[derive(Debug)]
pub struct TokioExecutor {
    handle: Handle,
    frame_interval: Duration,
    cancel: watch::Sender<u64>,
}

/// Shortest frame interval accepted; `tokio::time::interval` rejects zero.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

impl TokioExecutor {
    /// `frame_interval` is clamped to at least [`MIN_FRAME_INTERVAL`].
    pub fn new(handle: Handle, frame_interval: Duration) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            handle,
            frame_interval: frame_interval.max(MIN_FRAME_INTERVAL),
            cancel,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Build on the runtime of the calling context. Panics outside a tokio runtime.
    pub fn current(frame_interval: Duration) -> Self {
        Self::new(Handle::current(), frame_interval)
    }

    /// Cancel every job running now. Jobs started afterwards are unaffected.
    pub fn cancel_all(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }
}

impl AnimationExecutor for TokioExecutor {
    fn execute(&self, mut job: AnimationJob) {
        let mut cancel = self.cancel.subscribe();
        let generation = *cancel.borrow_and_update();
        let frame_interval = self.frame_interval;
        self.handle.spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticker = tokio::time::interval(frame_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let fraction = job.fade().fraction_at(started.elapsed());
                        job.apply_fraction(fraction);
                        if fraction >= 1.0 {
                            job.finish();
                            return;
                        }
                    }
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() != generation {
                            job.cancel();
                            return;
                        }
                    }
                }
            }
        });
    }
}
