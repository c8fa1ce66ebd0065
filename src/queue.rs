//! Per-file operation lane.
//!
//! Every open file owns one worker thread which executes queued jobs one
//! at a time, in submission order. Jobs are enqueued when the operation
//! is called, the caller gets a [`Pending`] future resolving to the
//! outcome of that single job.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use netcdf_sys::{nc_type, NC_EINTERNAL};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, trace_span, warn};

use crate::error::{self, Error};
use crate::file::RawFile;

/// State owned by the worker thread
#[derive(Debug, Default)]
pub(crate) struct Lane {
    file: Option<RawFile>,
}

impl Lane {
    /// `ncid` of the open file, fails once the handle is released
    pub(crate) fn ncid(&self) -> error::Result<nc_type> {
        self.file.as_ref().map(RawFile::ncid).ok_or_else(Error::closed)
    }

    pub(crate) fn install(&mut self, file: RawFile) {
        self.file = Some(file);
    }

    pub(crate) fn release(&mut self) -> error::Result<RawFile> {
        self.file.take().ok_or_else(Error::closed)
    }
}

type Job = Box<dyn FnOnce(&mut Lane) + Send + 'static>;

/// Sending half of a lane. Dropping every clone stops the worker once
/// the remaining jobs are drained
#[derive(Debug, Clone)]
pub(crate) struct OperationQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl OperationQueue {
    /// Starts a new lane
    pub(crate) fn spawn() -> error::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        std::thread::Builder::new()
            .name("netcdf-lane".into())
            .spawn(move || {
                debug!("lane started");
                let mut lane = Lane::default();
                while let Some(job) = rx.blocking_recv() {
                    job(&mut lane);
                }
                if let Some(ncid) = lane.file.as_ref().map(RawFile::ncid) {
                    debug!(ncid, "lane stopped with an open handle, closing it");
                } else {
                    debug!("lane stopped");
                }
            })
            .map_err(|e| Error::Native {
                code: NC_EINTERNAL,
                message: format!("Could not start worker: {e}"),
            })?;
        Ok(Self { tx })
    }

    /// Queues `f` behind every job submitted before it
    pub(crate) fn enqueue<T, F>(&self, op: &'static str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Lane) -> error::Result<T> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move |lane| {
            let ncid = lane.file.as_ref().map(RawFile::ncid);
            let _span = trace_span!("netcdf_op", op, ncid).entered();
            let result = match catch_unwind(AssertUnwindSafe(|| f(lane))) {
                Ok(result) => result,
                Err(_) => {
                    warn!(op, "operation panicked");
                    Err(Error::Native {
                        code: NC_EINTERNAL,
                        message: format!("Operation {op} panicked"),
                    })
                }
            };
            trace!(ok = result.is_ok(), "operation finished");
            // Receiver may have been dropped, the outcome is discarded then
            let _ = reply.send(result);
        });
        match self.tx.send(job) {
            Ok(()) => Pending::waiting(rx),
            Err(_) => Pending::failed(Error::closed()),
        }
    }
}

/// Outcome of a queued operation.
///
/// The operation is queued as soon as the method returning it is called
/// and runs whether or not this future is polled. There is no way to
/// cancel a queued operation.
#[must_use = "the operation runs regardless, await it to observe the outcome"]
#[derive(Debug)]
pub struct Pending<T> {
    state: State<T>,
}

#[derive(Debug)]
enum State<T> {
    Ready(Option<error::Result<T>>),
    Waiting(oneshot::Receiver<error::Result<T>>),
}

impl<T> Pending<T> {
    pub(crate) fn failed(e: Error) -> Self {
        Self {
            state: State::Ready(Some(Err(e))),
        }
    }

    fn waiting(rx: oneshot::Receiver<error::Result<T>>) -> Self {
        Self {
            state: State::Waiting(rx),
        }
    }
}

impl<T> Unpin for Pending<T> {}

impl<T> Future for Pending<T> {
    type Output = error::Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            State::Ready(result) => Poll::Ready(
                result
                    .take()
                    .unwrap_or_else(|| Err(Error::Usage("Outcome already taken".into()))),
            ),
            State::Waiting(rx) => Pin::new(rx).poll(cx).map(|received| {
                received.unwrap_or_else(|_| {
                    Err(Error::Native {
                        code: NC_EINTERNAL,
                        message: "Operation was dropped before completing".into(),
                    })
                })
            }),
        }
    }
}
