#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Method;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message;
use upbit_connector::core::errors::UpbitError;
use upbit_connector::core::kernel::{HttpResponse, RestClient, SignedRequest, WsSession};

pub const BASE_URL: &str = "https://api.upbit.com/v1";

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// In-memory `RestClient` answering from a route table and recording every request.
#[derive(Clone, Default)]
pub struct ScriptedRest {
    routes: Arc<Mutex<Vec<(Method, String, HttpResponse)>>>,
    queued: Arc<Mutex<VecDeque<(Method, String, HttpResponse)>>>,
    requests: Arc<Mutex<Vec<SignedRequest>>>,
}

impl ScriptedRest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `status` and `body`. Later routes win.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.routes.lock().unwrap().insert(
            0,
            (method, path.to_string(), HttpResponse::new(status, body)),
        );
        self
    }

    pub fn respond_with(&self, method: Method, path: &str, response: HttpResponse) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(0, (method, path.to_string(), response));
        self
    }

    /// Answer the next matching request only, ahead of any standing route.
    /// Queued answers for a route are used in the order they were added.
    pub fn respond_once(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        self.queued.lock().unwrap().push_back((
            method,
            path.to_string(),
            HttpResponse::new(status, body),
        ));
        self
    }

    pub fn requests(&self) -> Vec<SignedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD /path` of every request, in order.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, path_of(&r.url)))
            .collect()
    }
}

pub fn path_of(url: &str) -> &str {
    url.strip_prefix(BASE_URL).unwrap_or(url)
}

#[async_trait]
impl RestClient for ScriptedRest {
    async fn execute(&self, request: SignedRequest) -> Result<HttpResponse, UpbitError> {
        let path = path_of(&request.url).to_string();
        let method = request.method.clone();
        self.requests.lock().unwrap().push(request);

        let mut queued = self.queued.lock().unwrap();
        if let Some(index) = queued.iter().position(|(m, p, _)| *m == method && *p == path) {
            if let Some((_, _, response)) = queued.remove(index) {
                return Ok(response);
            }
        }
        drop(queued);

        let routes = self.routes.lock().unwrap();
        let response = routes
            .iter()
            .find(|(m, p, _)| *m == method && *p == path)
            .map(|(_, _, response)| response.clone())
            .unwrap_or_else(|| {
                HttpResponse::new(
                    404,
                    r#"{"error":{"name":"not_found","message":"no scripted route"}}"#,
                )
            });
        Ok(response)
    }
}

/// Shared observations of a `ScriptedWs`, readable from the test thread.
#[derive(Default)]
pub struct WsTap {
    pub connects: AtomicUsize,
    pub reads: AtomicUsize,
    pub closes: AtomicUsize,
    pub sent: Mutex<Vec<Message>>,
    pub headers: Mutex<Vec<Vec<(String, String)>>>,
}

impl WsTap {
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| match m {
                Message::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

/// One step of a scripted connection.
pub enum ScriptedFrame {
    Frame(Message),
    /// Drop the connection with a transport error.
    Fail(String),
    /// Stay open without delivering anything.
    Hold,
}

impl From<Message> for ScriptedFrame {
    fn from(message: Message) -> Self {
        Self::Frame(message)
    }
}

/// In-memory `WsSession`.
///
/// Each scripted connection yields its frames and then closes. After the last
/// scripted connection has delivered its frames the session stays open and
/// idle until it is closed.
pub struct ScriptedWs {
    connections: VecDeque<Vec<ScriptedFrame>>,
    current: VecDeque<ScriptedFrame>,
    last: bool,
    connect_failures: usize,
    ping_failures: usize,
    connected: bool,
    tap: Arc<WsTap>,
}

impl ScriptedWs {
    pub fn new(connections: Vec<Vec<Message>>) -> (Self, Arc<WsTap>) {
        Self::scripted(
            connections
                .into_iter()
                .map(|frames| frames.into_iter().map(ScriptedFrame::from).collect())
                .collect(),
        )
    }

    pub fn scripted(connections: Vec<Vec<ScriptedFrame>>) -> (Self, Arc<WsTap>) {
        let tap = Arc::new(WsTap::default());
        let session = Self {
            connections: connections.into(),
            current: VecDeque::new(),
            last: false,
            connect_failures: 0,
            ping_failures: 0,
            connected: false,
            tap: Arc::clone(&tap),
        };
        (session, tap)
    }

    /// Fail the first `count` connect attempts.
    pub fn failing_connects(mut self, count: usize) -> Self {
        self.connect_failures = count;
        self
    }

    /// Fail the first `count` pings, dropping the connection each time.
    pub fn failing_pings(mut self, count: usize) -> Self {
        self.ping_failures = count;
        self
    }
}

pub fn text(body: &str) -> Message {
    Message::Text(body.to_string())
}

#[async_trait]
impl WsSession for ScriptedWs {
    async fn connect(&mut self, headers: &[(String, String)]) -> Result<(), UpbitError> {
        self.tap.headers.lock().unwrap().push(headers.to_vec());
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            return Err(UpbitError::WebSocket("scripted connect failure".to_string()));
        }

        self.tap.connects.fetch_add(1, Ordering::SeqCst);
        self.current = self.connections.pop_front().unwrap_or_default().into();
        self.last = self.connections.is_empty();
        self.connected = true;
        Ok(())
    }

    async fn send_raw(&mut self, msg: Message) -> Result<(), UpbitError> {
        if !self.connected {
            return Err(UpbitError::WebSocket("not connected".to_string()));
        }
        if matches!(msg, Message::Ping(_)) && self.ping_failures > 0 {
            self.ping_failures -= 1;
            self.connected = false;
            return Err(UpbitError::WebSocket("broken pipe".to_string()));
        }
        self.tap.sent.lock().unwrap().push(msg);
        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, UpbitError>> {
        match self.current.pop_front() {
            Some(ScriptedFrame::Frame(frame)) => {
                self.tap.reads.fetch_add(1, Ordering::SeqCst);
                return Some(Ok(frame));
            }
            Some(ScriptedFrame::Fail(reason)) => {
                self.connected = false;
                return Some(Err(UpbitError::WebSocket(reason)));
            }
            Some(ScriptedFrame::Hold) => return std::future::pending().await,
            None => {}
        }
        if self.last {
            std::future::pending::<()>().await;
        }
        self.connected = false;
        None
    }

    async fn close(&mut self) -> Result<(), UpbitError> {
        self.tap.closes.fetch_add(1, Ordering::SeqCst);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Poll `condition` until it holds or `limit` elapses.
pub fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

pub fn order_json(uuid: &str, side: &str, state: &str, created_at: &str) -> String {
    format!(
        r#"{{"uuid":"{uuid}","side":"{side}","ord_type":"limit","price":"50000000","state":"{state}","market":"KRW-BTC","created_at":"{created_at}","volume":"0.01","remaining_volume":"0.004","executed_volume":"0.006","trades_count":1}}"#
    )
}
