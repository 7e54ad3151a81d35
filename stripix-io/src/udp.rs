//! Live UDP capture.
//!
//! A worker thread owns the socket and a [`StreamFramer`]. Completed board
//! frames go to a single-slot [`LatestFrame`] cell: the consumer sees only
//! the newest frame and never blocks the worker.

use crate::{Error, Result};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use stripix_trb::{BoardFrame, StreamFramer, StreamStats};

/// Default listening port of the acquisition stream.
pub const DEFAULT_PORT: u16 = 8890;

/// Receiver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpConfig {
    /// Local address to bind.
    pub bind_address: String,
    /// Local port, 0 for any free port.
    pub port: u16,
    /// Socket receive timeout; bounds how long a stop request waits.
    pub read_timeout: Duration,
    /// Datagram buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_millis(200),
            buffer_size: 65535,
        }
    }
}

impl UdpConfig {
    /// Creates a configuration for `address:port` with default timing.
    #[must_use]
    pub fn new(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            bind_address: bind_address.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the receive timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the datagram buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Returns `address:port`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Checks the timeout and buffer size.
    ///
    /// # Errors
    /// Returns a configuration error for a zero timeout or a buffer too
    /// small to hold one word.
    pub fn validate(&self) -> Result<()> {
        if self.read_timeout.is_zero() {
            return Err(Error::Config("read timeout must be nonzero".into()));
        }
        if self.buffer_size < 4 {
            return Err(Error::Config(format!(
                "buffer size {} cannot hold a word",
                self.buffer_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Slot {
    frame: Option<BoardFrame>,
    fresh: bool,
}

/// Single-slot hand-off of the most recent board frame.
///
/// Publishing replaces any frame not yet taken.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Slot>>,
}

impl LatestFrame {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a frame, superseding the previous one.
    pub fn publish(&self, frame: BoardFrame) {
        let mut slot = self.lock();
        slot.frame = Some(frame);
        slot.fresh = true;
    }

    /// Returns the newest frame if it has not been taken yet.
    #[must_use]
    pub fn take(&self) -> Option<BoardFrame> {
        let mut slot = self.lock();
        if !slot.fresh {
            return None;
        }
        slot.fresh = false;
        slot.frame.clone()
    }

    /// Returns the newest frame whether or not it was taken.
    #[must_use]
    pub fn latest(&self) -> Option<BoardFrame> {
        self.lock().frame.clone()
    }

    /// Id of the newest frame, 0 before the first one.
    #[must_use]
    pub fn latest_id(&self) -> u64 {
        self.lock().frame.as_ref().map_or(0, |f| f.id)
    }
}

/// Background UDP receiver.
///
/// Dropping the receiver stops the worker and waits for it.
pub struct UdpReceiver {
    handle: Option<JoinHandle<Result<StreamStats>>>,
    stop: Arc<AtomicBool>,
    latest: LatestFrame,
    local_addr: SocketAddr,
}

impl UdpReceiver {
    /// Binds the socket and starts the worker.
    ///
    /// # Errors
    /// Returns [`Error::Socket`] if the socket cannot be bound or
    /// configured, or the thread cannot be spawned.
    pub fn spawn(config: &UdpConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = config.endpoint();
        let socket_error = |source| Error::Socket {
            addr: endpoint.clone(),
            source,
        };

        let socket = UdpSocket::bind(&endpoint).map_err(socket_error)?;
        socket
            .set_read_timeout(Some(config.read_timeout))
            .map_err(socket_error)?;
        let local_addr = socket.local_addr().map_err(socket_error)?;

        let stop = Arc::new(AtomicBool::new(false));
        let latest = LatestFrame::new();
        let handle = {
            let stop = Arc::clone(&stop);
            let latest = latest.clone();
            let buffer_size = config.buffer_size;
            thread::Builder::new()
                .name("stripix-udp".into())
                .spawn(move || receive_loop(&socket, buffer_size, &stop, &latest))
                .map_err(socket_error)?
        };
        log::info!("listening for board data on {local_addr}");

        Ok(Self {
            handle: Some(handle),
            stop,
            latest,
            local_addr,
        })
    }

    /// Address the socket is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The frame hand-off cell.
    #[must_use]
    pub fn latest(&self) -> &LatestFrame {
        &self.latest
    }

    /// Returns true while the worker thread runs; false once it stopped on
    /// request or on a receive error.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Asks the worker to stop; it exits within one receive timeout.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Stops the worker, waits for it and returns its framing counters.
    ///
    /// # Errors
    /// Returns [`Error::Socket`] if receiving failed or the worker panicked.
    pub fn join(mut self) -> Result<StreamStats> {
        self.stop();
        let Some(handle) = self.handle.take() else {
            return Ok(StreamStats::default());
        };
        handle.join().map_err(|_| Error::Socket {
            addr: self.local_addr.to_string(),
            source: std::io::Error::other("receiver thread panicked"),
        })?
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn receive_loop(
    socket: &UdpSocket,
    buffer_size: usize,
    stop: &AtomicBool,
    latest: &LatestFrame,
) -> Result<StreamStats> {
    let mut framer = StreamFramer::new();
    let mut buf = vec![0u8; buffer_size];

    while !stop.load(Ordering::SeqCst) {
        match socket.recv(&mut buf) {
            Ok(len) => {
                // Older frames from the same datagram are superseded
                if let Some(frame) = framer.push_bytes(&buf[..len]).pop() {
                    latest.publish(frame);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                log::error!("UDP receive failed: {e}");
                let addr = socket
                    .local_addr()
                    .map_or_else(|_| "unbound".to_string(), |a| a.to_string());
                return Err(Error::Socket { addr, source: e });
            }
        }
    }

    let stats = framer.stats();
    log::info!(
        "UDP receiver stopped: {} frames, {} dropped boards, {} desync warnings",
        stats.frames,
        stats.dropped_boards,
        stats.desync_warnings
    );
    Ok(stats)
}
