use crate::core::errors::UpbitError;
use crate::core::kernel::{Signer, StreamConfig, StreamManager, TungsteniteWs, WsSession};
use crate::exchanges::upbit::codec::{Subscription, UpbitCodec};
use crate::exchanges::upbit::types::ChannelType;
use std::sync::Arc;

/// Streaming manager for the public ticker, trade and orderbook channels.
pub type WebSocketManager<S = TungsteniteWs> = StreamManager<UpbitCodec, S>;

/// Streaming manager for the authenticated myOrder and myAsset channels.
pub type PrivateWebSocketManager<S = TungsteniteWs> = StreamManager<UpbitCodec, S>;

/// Public subscription over `session`. Nothing connects until the first read
/// or an explicit `start()`.
pub fn public_stream<S: WsSession>(
    session: S,
    channel: ChannelType,
    codes: Vec<String>,
    config: StreamConfig,
) -> Result<WebSocketManager<S>, UpbitError> {
    let subscription = Subscription::public(channel, codes)?;
    StreamManager::new(
        format!("upbit-{}", channel),
        UpbitCodec::new(subscription),
        session,
        config,
    )
}

/// Private subscription over `session`; every connect carries a freshly signed
/// `Authorization` header.
pub fn private_stream<S: WsSession>(
    session: S,
    signer: Arc<dyn Signer>,
    channel: ChannelType,
    codes: Vec<String>,
    config: StreamConfig,
) -> Result<PrivateWebSocketManager<S>, UpbitError> {
    let subscription = Subscription::private(channel, codes)?;
    StreamManager::new(
        format!("upbit-{}", channel),
        UpbitCodec::authenticated(subscription, signer),
        session,
        config,
    )
}
