pub mod builder;
pub mod codec;
pub mod connector;
pub mod conversions;
pub mod rest;
pub mod tick_size;
pub mod types;
pub mod websocket;

// Re-export main types for easier importing
pub use builder::{build_connector, build_private_stream, build_public_stream};
pub use codec::{Subscription, UpbitCodec};
pub use connector::{
    Account, CandleQuery, MarketData, Trading, UpbitConnector, Wallet, WithdrawCoin,
};
pub use rest::UpbitRest;
pub use tick_size::{adjust_price, price_unit, RoundingMethod};
pub use types::{
    CandleInterval, ChannelType, OrderRequest, OrderSide, OrderState, OrderType, TimeInForce,
    UpbitAccount, UpbitCandle, UpbitDepositAddress, UpbitMarket, UpbitOrder, UpbitOrderbook,
    UpbitOrderbookLevels, UpbitOrderbookUnit, UpbitTicker, UpbitTransfer,
};
pub use websocket::{private_stream, public_stream, PrivateWebSocketManager, WebSocketManager};
