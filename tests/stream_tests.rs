mod common;

use common::{init_tracing, text, wait_until, ScriptedFrame, ScriptedWs};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use upbit_connector::core::kernel::{Claims, JwtSigner, Signer};
use upbit_connector::exchanges::upbit::{private_stream, public_stream, ChannelType};
use upbit_connector::{StreamConfig, StreamState, UpbitError};

fn ticker(code: &str, price: u64) -> String {
    format!(r#"{{"type":"ticker","code":"{}","trade_price":{}}}"#, code, price)
}

fn fast_config() -> StreamConfig {
    StreamConfig::default()
        .with_reconnect_delay(Duration::from_millis(10), Duration::from_millis(40))
}

fn krw_btc() -> Vec<String> {
    vec!["KRW-BTC".to_string()]
}

fn price_of(item: Result<Value, UpbitError>) -> u64 {
    item.unwrap()["trade_price"].as_u64().unwrap()
}

#[cfg(test)]
mod stream_tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_start() {
        let (session, tap) = ScriptedWs::new(vec![vec![text(&ticker("KRW-BTC", 1))]]);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stream.state(), StreamState::Idle);
        assert!(!stream.is_alive());
        assert_eq!(tap.connects.load(Ordering::SeqCst), 0);

        assert_eq!(price_of(stream.recv().await), 1);
        assert_eq!(stream.state(), StreamState::Streaming);
        assert!(stream.is_alive());
    }

    #[tokio::test]
    async fn test_reconnect_resends_identical_frame() {
        init_tracing();
        let (session, tap) = ScriptedWs::new(vec![
            vec![text(&ticker("KRW-BTC", 1)), text(&ticker("KRW-BTC", 2))],
            vec![text(&ticker("KRW-BTC", 3))],
            vec![text(&ticker("KRW-BTC", 4))],
        ]);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        assert_eq!(price_of(stream.recv().await), 1);
        assert_eq!(price_of(stream.recv().await), 2);
        assert!(matches!(stream.recv().await, Err(UpbitError::ConnectionClosed)));
        assert_eq!(price_of(stream.recv().await), 3);
        assert!(matches!(stream.recv().await, Err(UpbitError::ConnectionClosed)));
        assert_eq!(price_of(stream.recv().await), 4);

        let frames = tap.sent_text();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f == &frames[0]));

        let frame: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(frame[0]["ticket"].as_str().unwrap().len(), 6);
        assert_eq!(frame[1]["type"], "ticker");
        assert_eq!(frame[1]["codes"], serde_json::json!(["KRW-BTC"]));
        assert_eq!(frame[1]["isOnlyRealtime"], true);

        stream.terminate();
    }

    #[test]
    fn test_full_queue_blocks_producer() {
        let frames = (1..=3).map(|p| text(&ticker("KRW-BTC", p))).collect();
        let (session, tap) = ScriptedWs::new(vec![frames]);
        let mut stream = public_stream(
            session,
            ChannelType::Ticker,
            krw_btc(),
            fast_config().with_queue_capacity(1),
        )
        .unwrap();

        stream.start().unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            tap.reads.load(Ordering::SeqCst) == 2
        }));
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(tap.reads.load(Ordering::SeqCst), 2);

        let prices: Vec<u64> = (0..3).map(|_| price_of(stream.get())).collect();
        assert_eq!(prices, vec![1, 2, 3]);
        assert_eq!(tap.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_private_stream_authorizes_each_connection() {
        let (session, tap) = ScriptedWs::new(vec![
            vec![text(r#"{"type":"myAsset","assets":[]}"#)],
            vec![text(r#"{"type":"myAsset","assets":[]}"#)],
        ]);
        let signer: Arc<dyn Signer> = Arc::new(JwtSigner::from_keys("A", "S").unwrap());
        let mut stream =
            private_stream(session, signer, ChannelType::MyAsset, Vec::new(), fast_config())
                .unwrap();

        assert!(stream.recv().await.is_ok());
        assert!(matches!(stream.recv().await, Err(UpbitError::ConnectionClosed)));
        assert!(stream.recv().await.is_ok());
        stream.terminate();

        let headers = tap.headers.lock().unwrap().clone();
        assert_eq!(headers.len(), 2);
        assert_ne!(headers[0], headers[1]);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        for connection in &headers {
            let (name, value) = &connection[0];
            assert_eq!(name, "Authorization");
            let token = value.strip_prefix("Bearer ").unwrap();
            let claims = decode::<Claims>(token, &DecodingKey::from_secret(b"S"), &validation)
                .unwrap()
                .claims;
            assert_eq!(claims.access_key, "A");
            assert!(claims.query_hash.is_none());
        }

        let frame: Value = serde_json::from_str(&tap.sent_text()[0]).unwrap();
        assert_eq!(frame[0]["ticket"].as_str().unwrap().len(), 8);
        assert_eq!(frame[1]["type"], "myAsset");
        assert!(frame[1].get("isOnlyRealtime").is_none());
    }

    #[tokio::test]
    async fn test_connect_failures_back_off_and_recover() {
        init_tracing();
        let (session, tap) = ScriptedWs::new(vec![vec![text(&ticker("KRW-BTC", 7))]]);
        let session = session.failing_connects(2);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        assert!(matches!(stream.recv().await, Err(UpbitError::WebSocket(_))));
        assert!(matches!(stream.recv().await, Err(UpbitError::WebSocket(_))));
        assert_eq!(price_of(stream.recv().await), 7);
        assert_eq!(tap.connects.load(Ordering::SeqCst), 1);
        assert_eq!(tap.headers.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_decode_failure_is_delivered_in_band() {
        let (session, _tap) = ScriptedWs::new(vec![vec![
            text("not json"),
            text(r#"{"error":{"name":"WRONG_FORMAT","message":"bad request"}}"#),
            text(&ticker("KRW-BTC", 9)),
        ]]);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        assert!(matches!(stream.recv().await, Err(UpbitError::Stream(_))));
        match stream.recv().await {
            Err(UpbitError::Stream(message)) => assert!(message.contains("WRONG_FORMAT")),
            other => panic!("expected stream error, got {:?}", other),
        }
        assert_eq!(price_of(stream.recv().await), 9);
    }

    #[tokio::test]
    async fn test_transport_error_is_the_disconnect_sentinel() {
        init_tracing();
        let (session, tap) = ScriptedWs::scripted(vec![
            vec![
                text(&ticker("KRW-BTC", 1)).into(),
                ScriptedFrame::Fail("connection reset by peer".to_string()),
            ],
            vec![text(&ticker("KRW-BTC", 2)).into()],
        ]);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        assert_eq!(price_of(stream.recv().await), 1);
        match stream.recv().await {
            Err(UpbitError::WebSocket(message)) => assert!(message.contains("reset")),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert_eq!(price_of(stream.recv().await), 2);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), stream.recv())
                .await
                .is_err()
        );

        let frames = tap.sent_text();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);
        stream.terminate();
    }

    #[tokio::test]
    async fn test_failed_keepalive_reconnects() {
        let (session, tap) = ScriptedWs::scripted(vec![
            vec![text(&ticker("KRW-BTC", 1)).into(), ScriptedFrame::Hold],
            vec![text(&ticker("KRW-BTC", 2)).into()],
        ]);
        let session = session.failing_pings(1);
        let config = fast_config().with_keepalive_interval(Duration::from_millis(20));
        let mut stream = public_stream(session, ChannelType::Ticker, krw_btc(), config).unwrap();

        assert_eq!(price_of(stream.recv().await), 1);
        match stream.recv().await {
            Err(UpbitError::WebSocket(message)) => assert!(message.contains("keep-alive")),
            other => panic!("expected keep-alive failure, got {:?}", other),
        }
        assert_eq!(price_of(stream.recv().await), 2);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), stream.recv())
                .await
                .is_err()
        );

        assert_eq!(tap.connects.load(Ordering::SeqCst), 2);
        let frames = tap.sent_text();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);
        stream.terminate();
    }

    #[tokio::test]
    async fn test_terminate() {
        let (session, tap) = ScriptedWs::new(vec![vec![
            text(&ticker("KRW-BTC", 1)),
            text(&ticker("KRW-BTC", 2)),
        ]]);
        let mut stream =
            public_stream(session, ChannelType::Ticker, krw_btc(), fast_config()).unwrap();

        assert_eq!(price_of(stream.recv().await), 1);
        assert!(wait_until(Duration::from_secs(2), || {
            tap.reads.load(Ordering::SeqCst) == 2
        }));
        // let the second frame reach the queue
        tokio::time::sleep(Duration::from_millis(50)).await;

        stream.terminate();
        assert_eq!(stream.state(), StreamState::Terminated);
        assert!(!stream.is_alive());
        assert_eq!(tap.closes.load(Ordering::SeqCst), 1);
        assert!(matches!(stream.start(), Err(UpbitError::StreamTerminated)));

        // already queued items can still be drained
        assert_eq!(price_of(stream.recv().await), 2);
        assert!(matches!(stream.recv().await, Err(UpbitError::StreamTerminated)));

        stream.terminate();
        assert_eq!(tap.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_terminate_before_start() {
        let (session, tap) = ScriptedWs::new(Vec::new());
        let mut stream =
            public_stream(session, ChannelType::Trade, krw_btc(), fast_config()).unwrap();

        stream.terminate();
        assert_eq!(stream.state(), StreamState::Terminated);
        assert!(matches!(stream.get(), Err(UpbitError::StreamTerminated)));
        assert_eq!(tap.connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (session, _tap) = ScriptedWs::new(Vec::new());
        let result = public_stream(
            session,
            ChannelType::Ticker,
            krw_btc(),
            StreamConfig::default().with_queue_capacity(0),
        );
        assert!(matches!(result, Err(UpbitError::Validation { .. })));
    }
}
