//! The HTTP tracker server.
//!
//! A single TCP listener serves both plain HTTP/1 and TLS: the acceptor
//! peeks the first received bytes of every connection and routes anything
//! that looks like an HTTP/1 method line to the plain server, everything
//! else to the TLS acceptor. This way the tracker announces one port for
//! both schemes.
//!
//! The acceptor also enforces the configured connection cap: accepted
//! connections hold a semaphore permit for their whole lifetime.
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use axum_server::Handle;
use futures::future::BoxFuture;
use hyper_util::rt::TokioTimer;
use log::info;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Semaphore};
use tokio_rustls::server::TlsStream;
use tower_http::timeout::TimeoutLayer;

use super::v1::routes;
use super::HTTP_TRACKER_LOG_TARGET;
use crate::bootstrap::jobs::Started;
use crate::config::HttpTracker;
use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal_with_message, Halted};

/// How long in-flight requests are awaited when shutting down.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// The request methods that identify a plain HTTP/1 connection from its
/// first bytes. A TLS `ClientHello` starts with `0x16`, so it never matches.
const HTTP1_METHODS: [&[u8]; 9] = [
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"OPTIONS ", b"CONNECT ", b"TRACE ", b"PATCH ",
];

/// Returns true when the peeked bytes could be the start of an HTTP/1
/// method line.
#[must_use]
fn looks_like_http1(peeked: &[u8]) -> bool {
    HTTP1_METHODS.iter().any(|method| {
        let len = method.len().min(peeked.len());
        !peeked.is_empty() && method[..len] == peeked[..len]
    })
}

/// The stream handed to hyper: either a plain TCP stream or a TLS stream,
/// optionally holding a connection-cap permit for its whole lifetime.
pub struct MultiplexStream {
    inner: Inner,
    _permit: Option<tokio::sync::OwnedSemaphorePermit>,
}

enum Inner {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for MultiplexStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match &mut self.inner {
            Inner::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Inner::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MultiplexStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match &mut self.inner {
            Inner::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Inner::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match &mut self.inner {
            Inner::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Inner::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match &mut self.inner {
            Inner::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Inner::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// An acceptor that multiplexes plain HTTP/1 and TLS on the same listener
/// and enforces the connection cap.
#[derive(Clone)]
pub struct MultiplexAcceptor {
    tls_acceptor: Option<RustlsAcceptor>,
    connection_limit: Option<Arc<Semaphore>>,
}

impl MultiplexAcceptor {
    #[must_use]
    pub fn new(tls_config: Option<RustlsConfig>, listen_limit: usize) -> Self {
        Self {
            tls_acceptor: tls_config.map(RustlsAcceptor::new),
            connection_limit: (listen_limit > 0).then(|| Arc::new(Semaphore::new(listen_limit))),
        }
    }
}

impl<S> Accept<TcpStream, S> for MultiplexAcceptor
where
    S: Send + 'static,
{
    type Stream = MultiplexStream;
    type Service = S;
    type Future = BoxFuture<'static, std::io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        let tls_acceptor = self.tls_acceptor.clone();
        let connection_limit = self.connection_limit.clone();

        Box::pin(async move {
            let permit = match connection_limit {
                Some(semaphore) => Some(
                    semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?,
                ),
                None => None,
            };

            let Some(tls_acceptor) = tls_acceptor else {
                return Ok((
                    MultiplexStream {
                        inner: Inner::Plain(stream),
                        _permit: permit,
                    },
                    service,
                ));
            };

            let mut peeked = [0u8; 8];
            let peeked_len = stream.peek(&mut peeked).await?;

            if looks_like_http1(&peeked[..peeked_len]) {
                Ok((
                    MultiplexStream {
                        inner: Inner::Plain(stream),
                        _permit: permit,
                    },
                    service,
                ))
            } else {
                let (tls_stream, service) = tls_acceptor.accept(stream, service).await?;
                Ok((
                    MultiplexStream {
                        inner: Inner::Tls(Box::new(tls_stream)),
                        _permit: permit,
                    },
                    service,
                ))
            }
        })
    }
}

/// A HTTP tracker server instance launcher.
pub struct Launcher;

impl Launcher {
    /// It starts the HTTP server instance with graceful shutdown.
    ///
    /// # Panics
    ///
    /// It panics if unable to bind to the TCP socket or to send the bound
    /// address back to the caller.
    pub async fn run_with_graceful_shutdown(
        tracker: Arc<Tracker>,
        bind_to: SocketAddr,
        config: HttpTracker,
        tls_config: Option<RustlsConfig>,
        tx_start: oneshot::Sender<Started>,
        rx_halt: oneshot::Receiver<Halted>,
    ) {
        let scheme = if tls_config.is_some() { "https" } else { "http" };
        info!(target: HTTP_TRACKER_LOG_TARGET, "Starting on: {scheme}://{bind_to}");

        let listener = std::net::TcpListener::bind(bind_to).expect("it should bind to the tcp socket");
        listener
            .set_nonblocking(true)
            .expect("it should set the socket as non-blocking");

        let address = listener.local_addr().expect("it should get the bound address");

        let handle = Handle::new();

        {
            let handle = handle.clone();
            tokio::task::spawn(async move {
                shutdown_signal_with_message(rx_halt, format!("Halting HTTP service bound to socket: {address}")).await;
                handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
            });
        }

        let acceptor = MultiplexAcceptor::new(tls_config, config.listen_limit);

        let app = routes::router(tracker)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout)))
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut server = axum_server::from_tcp(listener).acceptor(acceptor).handle(handle);

        server.http_builder().http1().timer(TokioTimer::new());
        server
            .http_builder()
            .http1()
            .header_read_timeout(Duration::from_secs(config.read_timeout));

        tx_start
            .send(Started { address })
            .expect("the HTTP tracker service should not be dropped");

        server.serve(app).await.expect("it should serve the http tracker");

        info!(target: HTTP_TRACKER_LOG_TARGET, "Stopped server running on: {scheme}://{address}");
    }
}

#[cfg(test)]
mod tests {
    use super::looks_like_http1;

    #[test]
    fn an_http1_method_line_should_be_recognized() {
        assert!(looks_like_http1(b"GET /announce?info_hash=..."));
        assert!(looks_like_http1(b"HEAD / HTTP/1.1"));
    }

    #[test]
    fn a_partial_method_peek_should_be_recognized() {
        // The kernel may return fewer bytes than requested on the first
        // peek.
        assert!(looks_like_http1(b"GE"));
        assert!(looks_like_http1(b"O"));
    }

    #[test]
    fn a_tls_client_hello_should_not_be_recognized_as_http1() {
        // A TLS record starts with the handshake content type.
        assert!(!looks_like_http1(&[0x16, 0x03, 0x01, 0x02, 0x00]));
    }

    #[test]
    fn an_empty_peek_should_not_be_recognized_as_http1() {
        assert!(!looks_like_http1(b""));
    }
}
