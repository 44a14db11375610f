//! Typed wrapper around the generated `UserService` client.
//!
//! [`UserClient`] owns the connection and exposes one method per call shape.
//! The streaming shapes reuse the paced send loop and the receive loop from
//! [`crate::client::streaming`], so all four calls share one notion of
//! pacing, half-close and cancellation.

use super::stream::{DEFAULT_INBOUND_BUFFER_SIZE, Inbound, forward_inbound};
use crate::client::{
    config::ClientConfig,
    streaming::{Duplex, receiver::receive_responses, sender::send_records},
    telemetry::increment_stream_errors,
};
use core::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use userreg_tonic_core::{
    Error, Result,
    proto::user_service_client::UserServiceClient,
    types::{Record, ResponseEnvelope},
};

/// A bidirectional registration stream, ready for a
/// [`StreamDriver`](crate::client::streaming::StreamDriver).
pub type UserDuplex = Duplex<Record, Inbound<ResponseEnvelope>>;

#[derive(Debug, Clone)]
pub struct UserClient {
    inner: UserServiceClient<Channel>,
}

impl UserClient {
    /// Connects eagerly so an unreachable endpoint surfaces before any call
    /// is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the address is invalid or the connection
    /// cannot be established within the configured timeout.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(addr = %config.server_addr)))]
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let channel = Endpoint::from_shared(config.server_addr.clone())?
            .connect_timeout(config.connect_timeout)
            .connect()
            .await?;

        #[cfg(feature = "tracing")]
        tracing::info!("Connected to {}", config.server_addr);

        let mut inner = UserServiceClient::new(channel);
        if let Some(encoding) = config.compression {
            inner = inner
                .send_compressed(encoding)
                .accept_compressed(encoding);
        }

        Ok(Self { inner })
    }

    /// Unary registration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reception`] with the status the service replied with.
    pub async fn add_user(&mut self, record: Record) -> Result<Record> {
        let reply = self.inner.add_user(record).await?;
        Ok(reply.into_inner())
    }

    /// Server-streaming registration: one record out, progress updates back.
    ///
    /// `on_response` runs once per update, in arrival order.
    ///
    /// # Returns
    ///
    /// The number of updates received before the service ended the stream.
    ///
    /// # Errors
    ///
    /// [`Error::Reception`] if the call could not be opened or failed
    /// mid-stream, [`Error::Cancelled`] if `cancel` fired first.
    pub async fn add_user_verbose<F>(
        &self,
        record: Record,
        on_response: F,
        cancel: CancellationToken,
    ) -> Result<usize>
    where
        F: FnMut(&ResponseEnvelope),
    {
        let mut inner = self.inner.clone();
        let inbound = forward_inbound(
            async move { inner.add_user_verbose(record).await },
            DEFAULT_INBOUND_BUFFER_SIZE,
        );

        let res = receive_responses(inbound, on_response, cancel).await;
        if res.is_err() {
            increment_stream_errors();
        }
        res
    }

    /// Client-streaming registration: every record out with `interval`
    /// between sends, one aggregate reply back once the stream is closed.
    ///
    /// # Errors
    ///
    /// - [`Error::Reception`] with the status the service replied with.
    /// - [`Error::Transmission`] if the transport stopped accepting records
    ///   while the service had not answered with an error.
    /// - [`Error::Cancelled`] if `cancel` fired before the reply arrived.
    pub async fn add_users(
        &mut self,
        records: Vec<Record>,
        interval: Duration,
        buffer: usize,
        cancel: CancellationToken,
    ) -> Result<Vec<Record>> {
        let (tx, rx) = mpsc::channel(buffer);
        let send_cancel = cancel.child_token();
        let send_task = tokio::spawn(send_records(records, tx, interval, send_cancel.clone()));

        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            reply = self.inner.add_users(ReceiverStream::new(rx)) => reply.map_err(Error::from),
        };

        // Once the service has replied nothing more will be read.
        send_cancel.cancel();
        let sent = send_task.await.map_err(|e| Error::TaskFailed {
            context: format!("send task: {e}"),
        })?;

        // A service that answers early drops the request stream, so a send
        // fault next to a replied status is a consequence of that status.
        let (_sent, reply) = match (sent, reply) {
            (_, Err(e @ Error::Reception { .. })) | (Err(e), _) | (Ok(_), Err(e)) => {
                increment_stream_errors();
                return Err(e);
            }
            (Ok(sent), Ok(reply)) => (sent, reply),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Sent {_sent} records, service acknowledged {}",
            reply.get_ref().user.len()
        );

        Ok(reply.into_inner().user)
    }

    /// Opens the bidirectional registration call.
    ///
    /// The call is opened in the background so records can flow before the
    /// service answers. The returned outbound sender is the only handle on
    /// the request stream; dropping it half-closes the call. A refusal to
    /// open the call arrives as the first inbound item.
    pub fn open_user_stream(&self, buffer: usize) -> UserDuplex {
        let (tx, rx) = mpsc::channel(buffer);
        let mut inner = self.inner.clone();
        let inbound = forward_inbound(
            async move { inner.add_user_stream_both(ReceiverStream::new(rx)).await },
            buffer,
        );

        Duplex::new(tx, inbound)
    }
}

#[cfg(test)]
mod tests;
