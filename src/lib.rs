//! Upbit exchange connector.
//!
//! Signed REST access to trading, account and wallet endpoints, public quotation
//! queries, and realtime streaming subscriptions with automatic resubscription.
pub mod core;
pub mod exchanges;

pub use core::config::UpbitConfig;
pub use core::errors::{ApiErrorKind, ErrorContext, ErrorRecord, UpbitError};
pub use core::kernel::{StreamConfig, StreamState};
pub use core::types::{QueryParams, RemainingReq, RestResponse};
pub use exchanges::upbit::{
    build_connector, build_private_stream, build_public_stream, ChannelType,
    PrivateWebSocketManager, UpbitConnector, WebSocketManager,
};
