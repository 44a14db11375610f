use crate::client::telemetry::increment_records_sent;
use core::fmt::Debug;
use core::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use userreg_tonic_core::{Error, Result};

/// Transmits `records` over the outbound half of a duplex stream.
///
/// Records are sent in the order supplied. Between two consecutive sends the
/// task suspends for `interval`, so `N` records incur `N - 1` pauses. Once the
/// last record is handed to the transport the sender is dropped, which
/// half-closes the stream.
///
/// # Arguments
///
/// - `records`: Ordered records to transmit. Ownership moves to the
///   transport record by record.
/// - `outbound`: Sole writer of the outbound direction.
/// - `interval`: Pause between two sends.
/// - `cancel`: Checked at every suspension point.
///
/// # Returns
///
/// The number of records handed to the transport. On cancellation this is
/// the count transmitted before the token fired; the stream is half-closed
/// either way.
///
/// # Errors
///
/// Returns [`Error::Transmission`] carrying the index of the failed record
/// when the transport has dropped its end of the outbound channel.
pub async fn send_records<Req>(
    records: Vec<Req>,
    outbound: mpsc::Sender<Req>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<usize>
where
    Req: Debug + Send,
{
    let mut sent = 0;

    for (index, record) in records.into_iter().enumerate() {
        if index > 0 {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Send loop cancelled while pacing after {sent} records");
                    return Ok(sent);
                }
                () = tokio::time::sleep(interval) => {}
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(index, ?record, "Sending record");

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Send loop cancelled while sending record {index}");
                return Ok(sent);
            }
            res = outbound.send(record) => {
                if res.is_err() {
                    return Err(Error::Transmission {
                        index,
                        context: "outbound stream closed by transport".to_string(),
                    });
                }
            }
        }

        sent += 1;
        increment_records_sent();
    }

    // Dropping the only sender is the half-close.
    drop(outbound);

    #[cfg(feature = "tracing")]
    tracing::debug!("Outbound half closed after {sent} records");

    Ok(sent)
}
