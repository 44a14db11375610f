//! Inbound forwarding for calls whose response stream opens lazily.
//!
//! A streaming call only resolves once the service sends its response
//! headers, and a service may hold those back until it has read a request.
//! Awaiting the call before sending would then deadlock, so the call is
//! opened in a background task and its messages are forwarded into a channel
//! the caller can start consuming immediately.

use core::future::Future;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Response, Status, Streaming};

pub type Inbound<T> = ReceiverStream<Result<T, Status>>;

/// Responses buffered between the call and the consumer when the caller has
/// no preference.
pub const DEFAULT_INBOUND_BUFFER_SIZE: usize = 16;

/// Spawns `open` and forwards every message of the resulting stream.
///
/// A failed open is forwarded as a single `Err` item. The task exits, and the
/// call is dropped, as soon as the returned stream is dropped.
pub fn forward_inbound<T, Fut>(open: Fut, buffer: usize) -> Inbound<T>
where
    T: Send + 'static,
    Fut: Future<Output = Result<Response<Streaming<T>>, Status>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer);

    tokio::spawn(async move {
        let opened = tokio::select! {
            biased;
            () = tx.closed() => return,
            opened = open => opened,
        };

        let mut streaming = match opened {
            Ok(response) => response.into_inner(),
            Err(status) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to open call: {status}");
                let _ = tx.send(Err(status)).await;
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                () = tx.closed() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Inbound consumer gone, dropping call");
                    return;
                }
                next = streaming.message() => next,
            };

            let item = match next {
                Ok(Some(message)) => Ok(message),
                Ok(None) => return,
                Err(status) => Err(status),
            };
            let failed = item.is_err();

            if tx.send(item).await.is_err() || failed {
                return;
            }
        }
    });

    ReceiverStream::new(rx)
}
