//! Drives a duplex stream to completion with a paired send and receive task.
//!
//! The outbound and inbound directions of a bidirectional call are buffered
//! and blocking independently, so a single sequential loop would stall as
//! soon as the remote replies before all requests are sent. [`StreamDriver`]
//! therefore runs [`send_records`] and [`receive_responses`] as two tasks,
//! each owning exactly one direction, and waits for a single-use completion
//! signal raised by the receive task.

use super::{receiver::receive_responses, sender::send_records};
use crate::client::telemetry::{increment_stream_errors, record_stream_duration};
use core::fmt::Debug;
use core::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinError;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use userreg_tonic_core::{Error, Result, types::DEFAULT_SEND_INTERVAL};

/// An established duplex stream, split by direction.
///
/// The outbound sender must be the only handle on its channel: dropping it is
/// what half-closes the stream.
pub struct Duplex<Req, In> {
    pub outbound: mpsc::Sender<Req>,
    pub inbound: In,
}

impl<Req, In> Duplex<Req, In> {
    pub const fn new(outbound: mpsc::Sender<Req>, inbound: In) -> Self {
        Self { outbound, inbound }
    }
}

/// Tunables shared by every invocation of a [`StreamDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Pause between two consecutive outbound records.
    pub send_interval: Duration,
    /// Upper bound on a whole invocation. `None` waits for the remote
    /// indefinitely.
    pub deadline: Option<Duration>,
    /// Capacity of the outbound channel handed to the transport.
    pub outbound_buffer_size: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            send_interval: DEFAULT_SEND_INTERVAL,
            deadline: None,
            outbound_buffer_size: 16,
        }
    }
}

/// Summary of a normally completed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Records handed to the transport. Lower than the input length only when
    /// the remote ended its output before everything was sent.
    pub records_sent: usize,
    /// Envelopes delivered to the side effect.
    pub responses_received: usize,
}

/// Runs the send and receive halves of a duplex stream concurrently.
///
/// Cloning is cheap and clones share the cancellation token: cancelling it
/// aborts every in-flight invocation. Each invocation otherwise owns its own
/// tasks, channels and child token, so invocations on independent streams do
/// not interfere.
#[derive(Debug, Clone)]
pub struct StreamDriver {
    config: DriverConfig,
    cancel: CancellationToken,
}

impl StreamDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts every invocation of this driver when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drives `duplex` until the remote ends its output.
    ///
    /// `records` are transmitted in order with the configured pacing and the
    /// outbound half is closed after the last one. `on_response` runs once
    /// per inbound envelope, in arrival order.
    ///
    /// The call returns only after one of:
    ///
    /// - the receive task observed end-of-stream (success),
    /// - the send or receive task failed,
    /// - the driver's token was cancelled,
    /// - the configured deadline elapsed.
    ///
    /// On every failure the counterpart task is cancelled and awaited, so the
    /// stream is fully released when this returns.
    ///
    /// # Errors
    ///
    /// [`Error::Transmission`], [`Error::Reception`], [`Error::Cancelled`],
    /// [`Error::DeadlineExceeded`] or [`Error::TaskFailed`].
    pub async fn drive<Req, Resp, In, F>(
        &self,
        duplex: Duplex<Req, In>,
        records: Vec<Req>,
        on_response: F,
    ) -> Result<Completion>
    where
        Req: Debug + Send + 'static,
        Resp: Send + 'static,
        In: Stream<Item = core::result::Result<Resp, Status>> + Send + Unpin + 'static,
        F: FnMut(&Resp) + Send + 'static,
    {
        let start = tokio::time::Instant::now();
        let token = self.cancel.child_token();
        let Duplex { outbound, inbound } = duplex;

        let mut send_task = tokio::spawn(send_records(
            records,
            outbound,
            self.config.send_interval,
            token.clone(),
        ));

        let (done_tx, mut done_rx) = oneshot::channel::<Result<usize>>();
        let recv_token = token.clone();
        let recv_task = tokio::spawn(async move {
            let res = receive_responses(inbound, on_response, recv_token).await;
            // The driver may already have given up on this invocation.
            let _ = done_tx.send(res);
        });

        let deadline = async {
            match self.config.deadline {
                Some(after) => tokio::time::sleep(after).await,
                None => core::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let mut records_sent = None;
        let outcome = loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break Err(Error::Cancelled),
                () = &mut deadline => {
                    break Err(Error::DeadlineExceeded {
                        after: self.config.deadline.unwrap_or_default(),
                    });
                }
                res = &mut done_rx => {
                    break res.unwrap_or_else(|_| {
                        Err(Error::TaskFailed {
                            context: "receive task dropped its completion signal".to_string(),
                        })
                    });
                }
                res = &mut send_task, if records_sent.is_none() => {
                    let res = flatten(res, "send");
                    records_sent = Some(sent_count(&res));
                    match res {
                        Ok(_) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!("Send task finished, waiting for end-of-stream");
                        }
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        // Stop whichever half is still running and wait for it to release its
        // direction of the stream.
        token.cancel();
        if let Err(_e) = recv_task.await {
            #[cfg(feature = "tracing")]
            tracing::error!("Receive task terminated abnormally: {_e}");
        }
        let records_sent = match records_sent {
            Some(sent) => sent,
            None => settle_late_send(flatten(send_task.await, "send")),
        };

        match outcome {
            Ok(responses_received) => {
                record_stream_duration(start.elapsed().as_millis() as f64);
                #[cfg(feature = "tracing")]
                tracing::info!(records_sent, responses_received, "Stream completed");
                Ok(Completion {
                    records_sent,
                    responses_received,
                })
            }
            Err(e) => {
                increment_stream_errors();
                #[cfg(feature = "tracing")]
                tracing::warn!(records_sent, "Stream aborted: {e}");
                Err(e)
            }
        }
    }
}

/// Records handed to the transport by a finished send task.
fn sent_count(res: &Result<usize>) -> usize {
    match res {
        Ok(sent) => *sent,
        Err(Error::Transmission { index, .. }) => *index,
        Err(_) => 0,
    }
}

/// Settles a send task that was still running when the invocation ended.
///
/// The invocation outcome is already decided at that point, so a fault here
/// is logged and only its count is kept.
fn settle_late_send(res: Result<usize>) -> usize {
    if let Err(_e) = &res {
        #[cfg(feature = "tracing")]
        tracing::warn!("Send task failed after the invocation ended: {_e}");
    }
    sent_count(&res)
}

fn flatten(res: core::result::Result<Result<usize>, JoinError>, task: &str) -> Result<usize> {
    res.map_err(|e| Error::TaskFailed {
        context: format!("{task} task: {e}"),
    })?
}
