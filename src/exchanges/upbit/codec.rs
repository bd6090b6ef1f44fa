use crate::core::errors::UpbitError;
use crate::core::kernel::{Signer, WsCodec};
use crate::exchanges::upbit::conversions::validate_market;
use crate::exchanges::upbit::types::ChannelType;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;

const PUBLIC_TICKET_LEN: usize = 6;
const PRIVATE_TICKET_LEN: usize = 8;

/// What one streaming manager subscribes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel: ChannelType,
    pub codes: Vec<String>,
    pub ticket: String,
    pub realtime_only: bool,
}

fn ticket(len: usize) -> String {
    let mut ticket = uuid::Uuid::new_v4().simple().to_string();
    ticket.truncate(len);
    ticket
}

impl Subscription {
    /// Subscription on a public channel. At least one `QUOTE-BASE` code is required.
    pub fn public(channel: ChannelType, codes: Vec<String>) -> Result<Self, UpbitError> {
        if channel.is_private() {
            return Err(UpbitError::validation(
                "type",
                format!("{} is a private channel", channel),
            ));
        }
        if codes.is_empty() {
            return Err(UpbitError::validation(
                "codes",
                "at least one market code is required",
            ));
        }
        codes.iter().try_for_each(|code| validate_market("codes", code))?;

        Ok(Self {
            channel,
            codes,
            ticket: ticket(PUBLIC_TICKET_LEN),
            realtime_only: true,
        })
    }

    /// Subscription on a private channel. Empty `codes` means every market.
    pub fn private(channel: ChannelType, codes: Vec<String>) -> Result<Self, UpbitError> {
        if !channel.is_private() {
            return Err(UpbitError::validation(
                "type",
                format!("{} is not a private channel", channel),
            ));
        }
        codes.iter().try_for_each(|code| validate_market("codes", code))?;

        Ok(Self {
            channel,
            codes,
            ticket: ticket(PRIVATE_TICKET_LEN),
            realtime_only: false,
        })
    }

    /// The JSON request frame sent after every connect.
    pub fn frame(&self) -> Value {
        let mut body = json!({
            "type": self.channel.as_str(),
            "codes": self.codes,
        });
        if self.realtime_only {
            body["isOnlyRealtime"] = Value::Bool(true);
        }
        json!([{ "ticket": self.ticket }, body])
    }
}

/// Codec for Upbit realtime channels
///
/// Messages are passed through as JSON values; the channel decides their shape.
pub struct UpbitCodec {
    subscription: Subscription,
    signer: Option<Arc<dyn Signer>>,
}

impl UpbitCodec {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            signer: None,
        }
    }

    /// Codec whose connections carry an `Authorization` header.
    pub fn authenticated(subscription: Subscription, signer: Arc<dyn Signer>) -> Self {
        Self {
            subscription,
            signer: Some(signer),
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl WsCodec for UpbitCodec {
    type Message = Value;

    fn connect_headers(&self) -> Result<Vec<(String, String)>, UpbitError> {
        match &self.signer {
            // a fresh token per connection, without a query hash
            Some(signer) => Ok(vec![(
                "Authorization".to_string(),
                signer.authorization(None)?,
            )]),
            None => Ok(Vec::new()),
        }
    }

    fn encode_subscription(&self) -> Result<Message, UpbitError> {
        Ok(Message::Text(self.subscription.frame().to_string()))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, UpbitError> {
        let value: Value = match message {
            Message::Text(text) => serde_json::from_str(&text)?,
            Message::Binary(data) => serde_json::from_slice(&data)?,
            _ => return Ok(None),
        };

        if let Some(error) = value.get("error") {
            let name = error.get("name").and_then(Value::as_str).unwrap_or("unknown");
            let message = error.get("message").and_then(Value::as_str).unwrap_or_default();
            return Err(UpbitError::Stream(format!("{}: {}", name, message)));
        }
        // reply to a text keep-alive
        if value.get("status").is_some() && value.get("type").is_none() {
            return Ok(None);
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::JwtSigner;

    fn codes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_public_frame() {
        let sub = Subscription::public(ChannelType::Ticker, codes(&["KRW-BTC", "KRW-ETH"])).unwrap();
        assert_eq!(sub.ticket.len(), 6);

        let frame = sub.frame();
        assert_eq!(frame[0]["ticket"], sub.ticket.as_str());
        assert_eq!(frame[1]["type"], "ticker");
        assert_eq!(frame[1]["codes"], json!(["KRW-BTC", "KRW-ETH"]));
        assert_eq!(frame[1]["isOnlyRealtime"], true);
    }

    #[test]
    fn test_private_frame() {
        let sub = Subscription::private(ChannelType::MyOrder, Vec::new()).unwrap();
        assert_eq!(sub.ticket.len(), 8);

        let frame = sub.frame();
        assert_eq!(frame[1]["type"], "myOrder");
        assert_eq!(frame[1]["codes"], json!([]));
        assert!(frame[1].get("isOnlyRealtime").is_none());
    }

    #[test]
    fn test_public_requires_codes() {
        assert!(matches!(
            Subscription::public(ChannelType::Trade, Vec::new()),
            Err(UpbitError::Validation { .. })
        ));
        assert!(Subscription::public(ChannelType::Trade, codes(&["BTC"])).is_err());
        assert!(Subscription::public(ChannelType::MyAsset, codes(&["KRW-BTC"])).is_err());
        assert!(Subscription::private(ChannelType::Ticker, Vec::new()).is_err());
    }

    #[test]
    fn test_frame_is_stable() {
        let codec = UpbitCodec::new(
            Subscription::public(ChannelType::Orderbook, codes(&["KRW-BTC"])).unwrap(),
        );
        let first = codec.encode_subscription().unwrap();
        let second = codec.encode_subscription().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode() {
        let codec = UpbitCodec::new(
            Subscription::public(ChannelType::Ticker, codes(&["KRW-BTC"])).unwrap(),
        );

        let decoded = codec
            .decode_message(Message::Binary(br#"{"type":"ticker","code":"KRW-BTC"}"#.to_vec()))
            .unwrap()
            .unwrap();
        assert_eq!(decoded["code"], "KRW-BTC");

        assert!(codec
            .decode_message(Message::Text(r#"{"status":"UP"}"#.to_string()))
            .unwrap()
            .is_none());

        let err = codec
            .decode_message(Message::Text(
                r#"{"error":{"name":"INVALID_AUTH","message":"bad token"}}"#.to_string(),
            ))
            .unwrap_err();
        assert!(matches!(err, UpbitError::Stream(ref m) if m.contains("INVALID_AUTH")));

        assert!(matches!(
            codec.decode_message(Message::Text("not json".to_string())),
            Err(UpbitError::Json(_))
        ));
    }

    #[test]
    fn test_private_headers() {
        let public = UpbitCodec::new(
            Subscription::public(ChannelType::Ticker, codes(&["KRW-BTC"])).unwrap(),
        );
        assert!(public.connect_headers().unwrap().is_empty());

        let signer = Arc::new(JwtSigner::from_keys("A", "S").unwrap());
        let private = UpbitCodec::authenticated(
            Subscription::private(ChannelType::MyAsset, Vec::new()).unwrap(),
            signer,
        );
        let first = private.connect_headers().unwrap();
        let second = private.connect_headers().unwrap();
        assert_eq!(first[0].0, "Authorization");
        assert!(first[0].1.starts_with("Bearer "));
        assert_ne!(first[0].1, second[0].1);
    }
}
