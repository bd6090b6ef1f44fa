use crate::core::config::UpbitConfig;
use crate::core::errors::UpbitError;
use crate::core::kernel::{
    JwtSigner, ReqwestRest, RestClientBuilder, RestClientConfig, Signer, StreamConfig,
    TungsteniteWs,
};
use crate::exchanges::upbit::connector::UpbitConnector;
use crate::exchanges::upbit::types::ChannelType;
use crate::exchanges::upbit::websocket::{
    private_stream, public_stream, PrivateWebSocketManager, WebSocketManager,
};
use std::sync::Arc;
use tracing::info;

fn signer_for(config: &UpbitConfig) -> Result<Arc<dyn Signer>, UpbitError> {
    let signer = JwtSigner::from_keys(config.access_key(), config.secret_key())?;
    Ok(Arc::new(signer))
}

/// Create an Upbit connector over reqwest
///
/// Private endpoints are signed when the config carries credentials; without
/// them only quotation calls succeed and private calls fail with `Auth`.
pub fn build_connector(config: UpbitConfig) -> Result<UpbitConnector<ReqwestRest>, UpbitError> {
    let rest_config =
        RestClientConfig::new("upbit".to_string()).with_timeout(config.timeout_seconds);
    let rest = RestClientBuilder::new(rest_config).build()?;

    let signer = if config.has_credentials() {
        Some(signer_for(&config)?)
    } else {
        None
    };
    info!(
        base_url = config.rest_base_url(),
        authenticated = signer.is_some(),
        "upbit connector built"
    );

    Ok(UpbitConnector::new(rest, config.rest_base_url(), signer))
}

/// Create a public streaming subscription (`ticker`, `trade`, `orderbook`)
pub fn build_public_stream(
    config: &UpbitConfig,
    channel: ChannelType,
    codes: Vec<String>,
    stream_config: StreamConfig,
) -> Result<WebSocketManager, UpbitError> {
    let session = TungsteniteWs::new(config.public_ws_url().to_string());
    public_stream(session, channel, codes, stream_config)
}

/// Create a private streaming subscription (`myOrder`, `myAsset`)
pub fn build_private_stream(
    config: &UpbitConfig,
    channel: ChannelType,
    codes: Vec<String>,
    stream_config: StreamConfig,
) -> Result<PrivateWebSocketManager, UpbitError> {
    if !config.has_credentials() {
        return Err(UpbitError::Auth(
            "private streams require an access and secret key".to_string(),
        ));
    }
    let session = TungsteniteWs::new(config.private_stream_url().to_string());
    private_stream(session, signer_for(config)?, channel, codes, stream_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_stream_needs_credentials() {
        let result = build_private_stream(
            &UpbitConfig::read_only(),
            ChannelType::MyOrder,
            Vec::new(),
            StreamConfig::default(),
        );
        assert!(matches!(result, Err(UpbitError::Auth(_))));
    }

    #[test]
    fn test_public_stream_validates_codes() {
        let result = build_public_stream(
            &UpbitConfig::read_only(),
            ChannelType::Ticker,
            vec!["BTC".to_string()],
            StreamConfig::default(),
        );
        assert!(matches!(result, Err(UpbitError::Validation { .. })));
    }
}
