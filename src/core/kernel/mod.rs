//! Transport kernel shared by the REST and streaming clients.
//!
//! - `RestClient` / `ReqwestRest`: executes prepared requests, no retries
//! - `dispatch`: transport call, failure classification and body decoding
//! - `Signer` / `JwtSigner`: `Authorization` header values
//! - `WsSession` / `TungsteniteWs`: websocket transport
//! - `WsCodec`: subscription frame and message decoding
//! - `StreamManager`: background worker with reconnect and a bounded queue
//!
//! ```rust,no_run
//! use upbit_connector::core::kernel::{dispatch, ReqwestRest, SignedRequest};
//! use upbit_connector::core::types::QueryParams;
//! use reqwest::Method;
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), upbit_connector::core::errors::UpbitError> {
//! let rest = ReqwestRest::new()?;
//! let request = SignedRequest::public(
//!     Method::GET,
//!     "https://api.upbit.com/v1/ticker".to_string(),
//!     QueryParams::new().with("markets", "KRW-BTC"),
//! );
//! let tickers = dispatch::<_, Value>(&rest, request).await?;
//! println!("{:?} {:?}", tickers.data, tickers.remaining_req);
//! # Ok(())
//! # }
//! ```
pub mod codec;
pub mod rest;
pub mod signer;
pub mod stream;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{
    dispatch, HttpResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig,
    SignedRequest,
};
pub use signer::{query_hash, Claims, JwtSigner, Signer};
pub use stream::{StreamConfig, StreamItem, StreamManager, StreamState};
pub use ws::{TungsteniteWs, WsSession};
