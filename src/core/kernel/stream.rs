//! Long-lived streaming subscription with automatic resubscription.
//!
//! A [`StreamManager`] owns one background OS thread running a current-thread
//! tokio runtime. The worker connects, sends the codec's subscription frame and
//! pushes decoded messages into a bounded queue. When the queue is full the
//! worker waits, so nothing is dropped. Transport failures are delivered in-band
//! as `Err` items and the worker reconnects on its own. Each disconnect yields
//! exactly one such item: `ConnectionClosed` for a clean close, otherwise the
//! transport error itself.

use crate::core::errors::UpbitError;
use crate::core::kernel::codec::WsCodec;
use crate::core::kernel::ws::WsSession;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Item delivered to the consumer. `Err` values are sentinels, not fatal.
pub type StreamItem<M> = Result<M, UpbitError>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for a streaming subscription
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Bounded queue size between worker and consumer
    pub queue_capacity: usize,
    /// Interval between keep-alive pings while streaming
    pub keepalive_interval: Duration,
    /// First delay after a failed connect attempt
    pub reconnect_delay: Duration,
    /// Upper bound for the connect backoff
    pub max_reconnect_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            keepalive_interval: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
        }
    }
}

impl StreamConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_delay = initial;
        self.max_reconnect_delay = max;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    Idle = 0,
    Connecting = 1,
    Streaming = 2,
    Reconnecting = 3,
    Terminated = 4,
}

impl StreamState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Connecting,
            2 => Self::Streaming,
            3 => Self::Reconnecting,
            _ => Self::Terminated,
        }
    }
}

/// State shared between the consumer handle and the worker thread.
#[derive(Debug)]
struct Shared {
    alive: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Self {
            alive: AtomicBool::new(false),
            state: AtomicU8::new(StreamState::Idle as u8),
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: StreamState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Streaming subscription manager
///
/// Lazily started: the worker thread is spawned by [`start`](Self::start), or by
/// the first [`get`](Self::get)/[`recv`](Self::recv).
pub struct StreamManager<C: WsCodec, S: WsSession> {
    name: String,
    config: StreamConfig,
    pending: Option<(C, S, mpsc::Sender<StreamItem<C::Message>>)>,
    receiver: mpsc::Receiver<StreamItem<C::Message>>,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<C: WsCodec, S: WsSession> StreamManager<C, S> {
    pub fn new(name: impl Into<String>, codec: C, session: S, config: StreamConfig) -> Result<Self, UpbitError> {
        if config.queue_capacity == 0 {
            return Err(UpbitError::validation(
                "queue_capacity",
                "queue capacity must be at least 1",
            ));
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            name: name.into(),
            config,
            pending: Some((codec, session, sender)),
            receiver,
            shared: Arc::new(Shared::new()),
            shutdown,
            worker: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Spawn the worker thread. Calling it again while running is a no-op.
    pub fn start(&mut self) -> Result<(), UpbitError> {
        if self.shared.state() == StreamState::Terminated {
            return Err(UpbitError::StreamTerminated);
        }
        let Some((codec, session, sender)) = self.pending.take() else {
            return Ok(());
        };

        self.shared.alive.store(true, Ordering::Release);
        self.shared.set_state(StreamState::Connecting);

        let worker = Worker {
            name: self.name.clone(),
            codec,
            session,
            config: self.config.clone(),
            sender,
            shared: Arc::clone(&self.shared),
            shutdown: self.shutdown.subscribe(),
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-stream", self.name))
            .spawn(move || worker.run_on_own_runtime());

        match spawned {
            Ok(handle) => {
                info!(stream = %self.name, "stream worker started");
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                shared.alive.store(false, Ordering::Release);
                shared.set_state(StreamState::Terminated);
                Err(UpbitError::Stream(format!("Failed to spawn stream worker: {}", e)))
            }
        }
    }

    fn start_if_idle(&mut self) -> Result<(), UpbitError> {
        if self.pending.is_some() {
            self.start()?;
        }
        Ok(())
    }

    /// Block the calling thread until the next item is available.
    ///
    /// Must not be called from inside an async runtime; use [`recv`](Self::recv) there.
    pub fn get(&mut self) -> StreamItem<C::Message> {
        self.start_if_idle()?;
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(UpbitError::StreamTerminated))
    }

    /// Async counterpart of [`get`](Self::get).
    pub async fn recv(&mut self) -> StreamItem<C::Message> {
        self.start_if_idle()?;
        self.receiver
            .recv()
            .await
            .unwrap_or(Err(UpbitError::StreamTerminated))
    }

    /// Stop the worker, close the connection and join the thread.
    ///
    /// Items already queued can still be drained afterwards.
    pub fn terminate(&mut self) {
        if self.shared.state() == StreamState::Terminated && self.worker.is_none() {
            return;
        }

        self.shared.alive.store(false, Ordering::Release);
        let _ = self.shutdown.send(true);
        self.pending = None;

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!(stream = %self.name, "stream worker panicked");
            }
        }

        self.shared.set_state(StreamState::Terminated);
        self.receiver.close();
        info!(stream = %self.name, "stream terminated");
    }
}

impl<C: WsCodec, S: WsSession> Drop for StreamManager<C, S> {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl<C: WsCodec, S: WsSession> std::fmt::Debug for StreamManager<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamManager")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum PumpExit {
    /// Connection lost; carries the sentinel handed to the consumer.
    Disconnected(UpbitError),
    Shutdown,
}

struct Worker<C: WsCodec, S: WsSession> {
    name: String,
    codec: C,
    session: S,
    config: StreamConfig,
    sender: mpsc::Sender<StreamItem<C::Message>>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
}

/// Resolves once shutdown was requested or the manager is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

impl<C: WsCodec, S: WsSession> Worker<C, S> {
    fn run_on_own_runtime(self) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(stream = %self.name, error = %e, "failed to build stream runtime");
                let _ = self.sender.try_send(Err(UpbitError::Stream(format!(
                    "Failed to build stream runtime: {}",
                    e
                ))));
                self.shared.alive.store(false, Ordering::Release);
                self.shared.set_state(StreamState::Terminated);
                return;
            }
        };
        runtime.block_on(self.run());
    }

    async fn run(mut self) {
        let mut backoff = self.config.reconnect_delay;
        let mut first_attempt = true;

        while self.shared.is_alive() {
            self.shared.set_state(if first_attempt {
                StreamState::Connecting
            } else {
                StreamState::Reconnecting
            });
            first_attempt = false;

            let opened = tokio::select! {
                () = shutdown_requested(&mut self.shutdown) => break,
                result = Self::open(&self.codec, &mut self.session) => result,
            };

            if let Err(e) = opened {
                warn!(stream = %self.name, error = %e, delay = ?backoff, "stream connect failed");
                if !self.push(Err(e)).await {
                    break;
                }
                tokio::select! {
                    () = shutdown_requested(&mut self.shutdown) => break,
                    () = sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(self.config.max_reconnect_delay);
                continue;
            }

            backoff = self.config.reconnect_delay;
            self.shared.set_state(StreamState::Streaming);
            debug!(stream = %self.name, "subscription sent");

            match self.pump().await {
                PumpExit::Shutdown => break,
                PumpExit::Disconnected(reason) => {
                    info!(stream = %self.name, reason = %reason, "connection lost, reconnecting");
                    if !self.push(Err(reason)).await {
                        break;
                    }
                }
            }
        }

        if self.session.is_connected()
            && timeout(CLOSE_TIMEOUT, self.session.close()).await.is_err()
        {
            warn!(stream = %self.name, "timed out closing connection");
        }
        self.shared.alive.store(false, Ordering::Release);
        self.shared.set_state(StreamState::Terminated);
        debug!(stream = %self.name, "stream worker exited");
    }

    async fn open(codec: &C, session: &mut S) -> Result<(), UpbitError> {
        let headers = codec.connect_headers()?;
        session.connect(&headers).await?;
        let frame = codec.encode_subscription()?;
        session.send_raw(frame).await
    }

    async fn pump(&mut self) -> PumpExit {
        let period = self.config.keepalive_interval;
        let mut keepalive = interval_at(Instant::now() + period, period);

        loop {
            if !self.shared.is_alive() {
                return PumpExit::Shutdown;
            }

            tokio::select! {
                () = shutdown_requested(&mut self.shutdown) => return PumpExit::Shutdown,
                _ = keepalive.tick() => {
                    if let Err(e) = self.session.send_raw(Message::Ping(Vec::new())).await {
                        warn!(stream = %self.name, error = %e, "keep-alive ping failed");
                        return PumpExit::Disconnected(UpbitError::WebSocket(format!(
                            "keep-alive ping failed: {}",
                            e
                        )));
                    }
                }
                next = self.session.next_raw() => match next {
                    Some(Ok(raw)) => {
                        let item = match self.codec.decode_message(raw) {
                            Ok(Some(message)) => Ok(message),
                            Ok(None) => continue,
                            Err(e) => {
                                debug!(stream = %self.name, error = %e, "failed to decode frame");
                                Err(UpbitError::Stream(format!("Failed to decode message: {}", e)))
                            }
                        };
                        if !self.push(item).await {
                            return PumpExit::Shutdown;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(stream = %self.name, error = %e, "stream transport error");
                        return PumpExit::Disconnected(e);
                    }
                    None => return PumpExit::Disconnected(UpbitError::ConnectionClosed),
                },
            }
        }
    }

    /// Enqueue one item, waiting for space. Returns `false` on shutdown.
    async fn push(&mut self, item: StreamItem<C::Message>) -> bool {
        tokio::select! {
            () = shutdown_requested(&mut self.shutdown) => false,
            sent = self.sender.send(item) => sent.is_ok(),
        }
    }
}
