//! DTLS 1.2 PSK channel to the bridge's entertainment port.
//!
//! The bridge only accepts `TLS_PSK_WITH_AES_128_GCM_SHA256` with the
//! application id as identity and the raw client key as PSK. Once the
//! handshake completes, frames are handed to a writer task through a small
//! bounded queue so callers never wait on the network.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use webrtc_dtls::cipher_suite::CipherSuiteId;
use webrtc_dtls::config::Config;
use webrtc_dtls::conn::DTLSConn;
use webrtc_util::Error as UtilError;
use webrtc_util::conn::Conn;

use crate::auth::PskCredentials;
use crate::error::Error;

/// UDP port the bridge listens on for entertainment streaming.
pub const STREAM_PORT: u16 = 2100;

/// Tuning for one streaming channel.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Upper bound on the DTLS handshake.
    pub handshake_timeout: Duration,
    /// Frames buffered between the caller and the writer task. A full
    /// queue drops new frames; every frame carries full state, so a
    /// dropped one is superseded by the next.
    pub queue_depth: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            queue_depth: 4,
        }
    }
}

/// An established DTLS stream to one bridge.
pub struct DtlsStream {
    frames: mpsc::Sender<Bytes>,
    failure: Arc<OnceLock<String>>,
    conn: Arc<DTLSConn>,
    writer: Option<JoinHandle<()>>,
    writer_cancel: CancellationToken,
    socket_cancel: CancellationToken,
    remote: SocketAddr,
}

impl DtlsStream {
    /// Bind a local UDP socket, connect it to `remote`, and run the PSK
    /// handshake.
    ///
    /// Cancelling `cancel` (or hitting the handshake timeout) aborts the
    /// handshake and shuts the socket wrapper down so the DTLS library's
    /// background reader exits and the socket is released.
    pub async fn connect(
        remote: SocketAddr,
        psk: &PskCredentials,
        options: &StreamOptions,
        cancel: &CancellationToken,
    ) -> Result<Self, Error> {
        let local: SocketAddr = if remote.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        debug!(%remote, identity = %crate::auth::redact(psk.identity()), "starting DTLS handshake");

        let socket_cancel = cancel.child_token();
        let transport: Arc<dyn Conn + Send + Sync> = Arc::new(CancellableSocket {
            socket,
            remote,
            cancel: socket_cancel.clone(),
        });

        let key = psk.key_bytes();
        let config = Config {
            psk: Some(Arc::new(
                move |_hint: &[u8]| -> Result<Vec<u8>, webrtc_dtls::Error> { Ok(key.clone()) },
            )),
            psk_identity_hint: Some(psk.identity().as_bytes().to_vec()),
            cipher_suites: vec![CipherSuiteId::Tls_Psk_With_Aes_128_Gcm_Sha256],
            ..Config::default()
        };

        let handshake = tokio::time::timeout(
            options.handshake_timeout,
            DTLSConn::new(transport, config, true, None),
        );

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = handshake => match res {
                Ok(Ok(conn)) => Ok(conn),
                Ok(Err(e)) => Err(Error::Handshake(e.to_string())),
                Err(_) => Err(Error::HandshakeTimeout {
                    timeout_ms: u64::try_from(options.handshake_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                }),
            },
        };

        let conn = match result {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                socket_cancel.cancel();
                return Err(e);
            }
        };
        debug!(%remote, "DTLS handshake complete");

        let (frames, rx) = mpsc::channel(options.queue_depth.max(1));
        let failure = Arc::new(OnceLock::new());
        let writer_cancel = socket_cancel.child_token();
        let writer = tokio::spawn(writer_loop(
            Arc::clone(&conn),
            rx,
            Arc::clone(&failure),
            writer_cancel.clone(),
        ));

        Ok(Self {
            frames,
            failure,
            conn,
            writer: Some(writer),
            writer_cancel,
            socket_cancel,
            remote,
        })
    }

    /// The bridge address this stream is connected to.
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Queue one encoded frame without waiting.
    ///
    /// A full queue silently drops the frame. Once the writer task has
    /// failed, every call returns [`Error::ChannelClosed`].
    pub fn send(&self, frame: &[u8]) -> Result<(), Error> {
        if let Some(reason) = self.failure.get() {
            return Err(Error::ChannelClosed {
                reason: reason.clone(),
            });
        }

        match self.frames.try_send(Bytes::copy_from_slice(frame)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                trace!("frame queue full, dropping frame");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(Error::ChannelClosed {
                reason: self
                    .failure
                    .get()
                    .cloned()
                    .unwrap_or_else(|| "writer stopped".into()),
            }),
        }
    }

    /// Stop the writer, send close_notify, and release the socket.
    pub async fn close(&mut self) {
        self.writer_cancel.cancel();
        if let Some(handle) = self.writer.take() {
            let _ = handle.await;
        }
        if let Err(e) = self.conn.close().await {
            debug!(error = %e, "DTLS close returned an error (ignored)");
        }
        self.socket_cancel.cancel();
        debug!(remote = %self.remote, "DTLS stream closed");
    }
}

impl Drop for DtlsStream {
    fn drop(&mut self) {
        self.socket_cancel.cancel();
    }
}

async fn writer_loop(
    conn: Arc<DTLSConn>,
    mut rx: mpsc::Receiver<Bytes>,
    failure: Arc<OnceLock<String>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = conn.write(&frame, None).await {
                    warn!(error = %e, "frame write failed, stopping stream writer");
                    let _ = failure.set(e.to_string());
                    break;
                }
            }
        }
    }
}

// ── Socket wrapper ───────────────────────────────────────────────────

/// Connected UDP socket whose reads and writes fail once cancelled.
///
/// The DTLS library keeps its own clone of the transport inside background
/// tasks; failing their I/O is the only way to make them let go of it.
struct CancellableSocket {
    socket: UdpSocket,
    remote: SocketAddr,
    cancel: CancellationToken,
}

fn closed() -> UtilError {
    std::io::Error::from(std::io::ErrorKind::NotConnected).into()
}

#[async_trait]
impl Conn for CancellableSocket {
    async fn connect(&self, addr: SocketAddr) -> Result<(), UtilError> {
        Ok(self.socket.connect(addr).await?)
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize, UtilError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(closed()),
            res = self.socket.recv(buf) => Ok(res?),
        }
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), UtilError> {
        tokio::select! {
            () = self.cancel.cancelled() => Err(closed()),
            res = self.socket.recv_from(buf) => Ok(res?),
        }
    }

    async fn send(&self, buf: &[u8]) -> Result<usize, UtilError> {
        if self.cancel.is_cancelled() {
            return Err(closed());
        }
        Ok(self.socket.send(buf).await?)
    }

    async fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, UtilError> {
        if self.cancel.is_cancelled() {
            return Err(closed());
        }
        Ok(self.socket.send_to(buf, target).await?)
    }

    fn local_addr(&self) -> Result<SocketAddr, UtilError> {
        Ok(self.socket.local_addr()?)
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(self.remote)
    }

    async fn close(&self) -> Result<(), UtilError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn psk() -> PskCredentials {
        let key = SecretString::from("00112233445566778899aabbccddeeff".to_string());
        PskCredentials::new("test-app", &key).unwrap()
    }

    #[tokio::test]
    async fn handshake_times_out_against_silent_peer() {
        // Bound but never answers: the handshake can only time out.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let remote = silent.local_addr().unwrap();
        let options = StreamOptions {
            handshake_timeout: Duration::from_millis(200),
            queue_depth: 1,
        };

        let result = DtlsStream::connect(remote, &psk(), &options, &CancellationToken::new()).await;
        assert!(
            matches!(result, Err(Error::HandshakeTimeout { timeout_ms: 200 })),
            "expected timeout, got {:?}",
            result.err()
        );
    }

    #[tokio::test]
    async fn cancelled_token_aborts_handshake() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let remote = silent.local_addr().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = DtlsStream::connect(remote, &psk(), &StreamOptions::default(), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn cancel_mid_handshake_releases_socket() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let remote = silent.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let options = StreamOptions {
            handshake_timeout: Duration::from_secs(30),
            queue_depth: 1,
        };

        let connecting = tokio::spawn({
            let cancel = cancel.clone();
            async move { DtlsStream::connect(remote, &psk(), &options, &cancel).await }
        });

        // The ClientHello arriving means the handshake is underway.
        let mut buf = [0u8; 2048];
        let (_, local) = tokio::time::timeout(Duration::from_secs(5), silent.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), connecting)
            .await
            .unwrap()
            .unwrap();
        assert!(
            matches!(result, Err(Error::Cancelled)),
            "expected cancellation, got {:?}",
            result.err()
        );

        // The client's port can be bound again once nothing holds it.
        let mut rebound = None;
        for _ in 0..40 {
            if let Ok(socket) = UdpSocket::bind(local).await {
                rebound = Some(socket);
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(rebound.is_some(), "socket {local} still bound after cancel");
    }
}
