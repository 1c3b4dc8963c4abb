//! The UDP server: socket setup, the receive loop and the request workers.
//!
//! The receive loop reads datagrams into buffers drawn from a reusable
//! [`BufferPool`] and dispatches each one to a worker task that parses,
//! processes and responds, returning the buffer to the pool when done.
//!
//! Every read carries a deadline so the loop can observe a shutdown signal
//! between reads; on shutdown the pending workers are awaited with a grace
//! timeout.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::connection_cookie::{Keyring, KEY_ROTATION_INTERVAL};
use super::{handlers, RawRequest, MAX_PACKET_SIZE, UDP_TRACKER_LOG_TARGET};
use crate::bootstrap::jobs::Started;
use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal_with_message, Halted};

/// The deadline of every socket read. The receive loop can only observe a
/// shutdown between reads, so this bounds the shutdown latency.
const READ_DEADLINE: Duration = Duration::from_secs(1);

/// How long pending workers are awaited on shutdown before being aborted.
const WORKER_GRACE_TIMEOUT: Duration = Duration::from_secs(5);

/// The recommended capacity of the receive buffer pool.
const BUFFER_POOL_CAPACITY: usize = 1000;

/// How often the "buffer pool exhausted" warning may be repeated.
const POOL_EXHAUSTED_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// A bounded pool of receive buffers.
///
/// Buffers move out of the pool for the lifetime of one datagram and are
/// moved back in by the worker that handled it. When the pool runs dry a
/// one-off buffer is allocated and a rate-limited warning is logged.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
    last_exhausted_warn: Mutex<Option<Instant>>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(BUFFER_POOL_CAPACITY)
    }
}

impl BufferPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            last_exhausted_warn: Mutex::new(None),
        }
    }

    /// Takes a zeroed buffer of [`MAX_PACKET_SIZE`] bytes out of the pool,
    /// allocating a fresh one when the pool is empty.
    #[must_use]
    pub fn take(&self) -> Vec<u8> {
        let buffer = self.buffers.lock().expect("the buffer pool lock should not be poisoned").pop();

        match buffer {
            Some(buffer) => buffer,
            None => {
                self.warn_exhausted_rate_limited();
                vec![0u8; MAX_PACKET_SIZE]
            }
        }
    }

    /// Returns a buffer to the pool. Buffers beyond the pool capacity are
    /// dropped.
    pub fn give(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        buffer.resize(MAX_PACKET_SIZE, 0);

        let mut buffers = self.buffers.lock().expect("the buffer pool lock should not be poisoned");
        if buffers.len() < self.capacity {
            buffers.push(buffer);
        }
    }

    fn warn_exhausted_rate_limited(&self) {
        let mut last_warn = self
            .last_exhausted_warn
            .lock()
            .expect("the buffer pool lock should not be poisoned");

        let now = Instant::now();
        if last_warn.map_or(true, |at| now.duration_since(at) >= POOL_EXHAUSTED_LOG_INTERVAL) {
            warn!(target: UDP_TRACKER_LOG_TARGET, "buffer pool exhausted, allocating one-off buffers");
            *last_warn = Some(now);
        }
    }
}

/// It binds the UDP socket, optionally sizing the OS receive buffer.
///
/// # Errors
///
/// Will return an error if the socket can't be bound to the provided
/// address.
pub fn bind(addr: SocketAddr, read_buffer_size: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };

    let socket = socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))?;

    if read_buffer_size > 0 {
        socket.set_recv_buffer_size(read_buffer_size)?;
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// A UDP server instance launcher.
pub struct Launcher;

impl Launcher {
    /// It starts the UDP server instance with graceful shutdown.
    ///
    /// # Panics
    ///
    /// It panics if unable to bind to the UDP socket or to send the bound
    /// address back to the caller.
    #[instrument(skip(tracker, tx_start, rx_halt))]
    pub async fn run_with_graceful_shutdown(
        tracker: Arc<Tracker>,
        bind_to: SocketAddr,
        read_buffer_size: usize,
        tx_start: oneshot::Sender<Started>,
        rx_halt: oneshot::Receiver<Halted>,
    ) {
        info!(target: UDP_TRACKER_LOG_TARGET, "Starting on: udp://{bind_to}");

        let socket = Arc::new(bind(bind_to, read_buffer_size).expect("it should bind to the udp socket"));
        let address = socket.local_addr().expect("it should get the bound address");

        let keyring = Arc::new(Keyring::new());

        let halted = Arc::new(AtomicBool::new(false));

        // Observe the halt channel and the process signals; the receive loop
        // polls the flag at every read deadline.
        {
            let halted = halted.clone();
            tokio::task::spawn(async move {
                shutdown_signal_with_message(rx_halt, format!("Halting UDP service bound to socket: {address}")).await;
                halted.store(true, Ordering::Relaxed);
            });
        }

        // Rotate the connection-ID key on a timer, chihaya style.
        {
            let keyring = keyring.clone();
            let halted = halted.clone();
            tokio::task::spawn(async move {
                let mut interval = tokio::time::interval(KEY_ROTATION_INTERVAL);
                interval.tick().await;

                loop {
                    interval.tick().await;
                    if halted.load(Ordering::Relaxed) {
                        break;
                    }
                    keyring.rotate();
                }
            });
        }

        tx_start
            .send(Started { address })
            .expect("the UDP tracker service should not be dropped");

        Self::run_receive_loop(&socket, &tracker, &keyring, &halted).await;

        info!(target: UDP_TRACKER_LOG_TARGET, "Stopped server running on: udp://{address}");
    }

    async fn run_receive_loop(socket: &Arc<UdpSocket>, tracker: &Arc<Tracker>, keyring: &Arc<Keyring>, halted: &Arc<AtomicBool>) {
        let pool = Arc::new(BufferPool::default());
        let mut workers = JoinSet::new();

        loop {
            if halted.load(Ordering::Relaxed) {
                break;
            }

            // Reap workers that have already finished.
            while workers.try_join_next().is_some() {}

            let mut buffer = pool.take();

            match tokio::time::timeout(READ_DEADLINE, socket.recv_from(&mut buffer)).await {
                Err(_elapsed) => {
                    // Deadline reached with no datagram; loop around to
                    // observe a possible shutdown.
                    pool.give(buffer);
                }
                Ok(Err(e)) => {
                    // Transient socket errors are retried.
                    warn!(target: UDP_TRACKER_LOG_TARGET, error = %e, "error receiving datagram");
                    pool.give(buffer);
                }
                Ok(Ok((payload_len, from))) => {
                    buffer.truncate(payload_len);

                    let socket = socket.clone();
                    let tracker = tracker.clone();
                    let keyring = keyring.clone();
                    let pool = pool.clone();

                    workers.spawn(async move {
                        let request = RawRequest { payload: buffer, from };

                        let response = handlers::handle_packet(&request, &tracker, &keyring).await;

                        if let Some(response) = response {
                            let mut writer = std::io::Cursor::new(Vec::with_capacity(200));
                            match response.write_bytes(&mut writer) {
                                // It doesn't matter if the response reaches
                                // the client or not.
                                Ok(()) => {
                                    if let Err(e) = socket.send_to(writer.get_ref(), &from).await {
                                        warn!(target: UDP_TRACKER_LOG_TARGET, error = %e, "failed to send response");
                                    }
                                }
                                Err(e) => {
                                    warn!(target: UDP_TRACKER_LOG_TARGET, error = %e, "failed to encode response");
                                }
                            }
                        }

                        pool.give(request.payload);
                    });
                }
            }
        }

        // Await pending workers with a grace timeout, then abort the rest.
        if tokio::time::timeout(WORKER_GRACE_TIMEOUT, async {
            while workers.join_next().await.is_some() {}
        })
        .await
        .is_err()
        {
            warn!(target: UDP_TRACKER_LOG_TARGET, "workers did not finish within the grace timeout, aborting them");
            workers.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BufferPool;
    use crate::servers::udp::MAX_PACKET_SIZE;

    #[test]
    fn taking_from_an_empty_pool_should_allocate_a_one_off_buffer() {
        let pool = BufferPool::new(2);

        let buffer = pool.take();

        assert_eq!(buffer.len(), MAX_PACKET_SIZE);
    }

    #[test]
    fn a_returned_buffer_should_be_reusable_and_zeroed_to_full_size() {
        let pool = BufferPool::new(2);

        let mut buffer = pool.take();
        buffer.truncate(16);
        buffer[0] = 0xFF;
        pool.give(buffer);

        let buffer = pool.take();
        assert_eq!(buffer.len(), MAX_PACKET_SIZE);
        assert!(buffer.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn the_pool_should_not_grow_beyond_its_capacity() {
        let pool = BufferPool::new(1);

        pool.give(vec![0u8; MAX_PACKET_SIZE]);
        pool.give(vec![0u8; MAX_PACKET_SIZE]);

        // Both gives are accepted silently; only one buffer is retained.
        assert_eq!(pool.buffers.lock().unwrap().len(), 1);
    }
}
