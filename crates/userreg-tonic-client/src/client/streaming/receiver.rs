use crate::client::telemetry::increment_responses_received;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::Status;
use userreg_tonic_core::{Error, Result};

/// Consumes the inbound half of a stream until the remote ends its output.
///
/// Every envelope is handed to `on_response` in the order the transport
/// delivers it, then dropped. No correlation with the order in which
/// requests were sent is attempted.
///
/// # Returns
///
/// The number of envelopes delivered to `on_response` once the stream
/// reports end-of-stream.
///
/// # Errors
///
/// - [`Error::Reception`] when the stream yields a non-EOF status.
/// - [`Error::Cancelled`] when `cancel` fires first.
pub async fn receive_responses<Resp, In, F>(
    mut inbound: In,
    mut on_response: F,
    cancel: CancellationToken,
) -> Result<usize>
where
    In: Stream<Item = core::result::Result<Resp, Status>> + Unpin,
    F: FnMut(&Resp),
{
    let mut received = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Receive loop cancelled after {received} responses");
                return Err(Error::Cancelled);
            }
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(response)) => {
                on_response(&response);
                received += 1;
                increment_responses_received();
            }
            Some(Err(status)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Inbound stream failed after {received} responses: {status}");
                return Err(status.into());
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Inbound stream ended after {received} responses");
                return Ok(received);
            }
        }
    }
}
