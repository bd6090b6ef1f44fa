use crate::core::errors::UpbitError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for one streaming subscription
///
/// The codec owns the subscription it encodes, so the same frame is produced for
/// every connection the streaming manager opens.
pub trait WsCodec: Send + 'static {
    /// The type representing parsed messages
    type Message: Send + 'static;

    /// Headers for the upgrade request. Called once per connection attempt.
    fn connect_headers(&self) -> Result<Vec<(String, String)>, UpbitError> {
        Ok(Vec::new())
    }

    /// Encode the subscription request sent right after connecting
    fn encode_subscription(&self) -> Result<Message, UpbitError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored by the codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, UpbitError>;
}
