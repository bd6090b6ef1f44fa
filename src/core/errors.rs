use std::fmt;
use thiserror::Error;

/// Error kinds Upbit reports with a stable `error.name`.
///
/// Each kind carries the HTTP status the exchange sends it with and a fixed
/// message template. The server's own message is kept separately on the
/// [`ErrorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    CreateAskError,
    CreateBidError,
    InsufficientFundsAsk,
    InsufficientFundsBid,
    UnderMinTotalAsk,
    UnderMinTotalBid,
    WithdrawAddressNotRegistered,
    ValidationError,
    InvalidQueryPayload,
    JwtVerification,
    ExpiredAccessKey,
    NonceUsed,
    NoAuthorizationIp,
    OutOfScope,
    InvalidAccessKey,
    TooManyRequests,
}

impl ApiErrorKind {
    pub const ALL: [Self; 16] = [
        Self::CreateAskError,
        Self::CreateBidError,
        Self::InsufficientFundsAsk,
        Self::InsufficientFundsBid,
        Self::UnderMinTotalAsk,
        Self::UnderMinTotalBid,
        Self::WithdrawAddressNotRegistered,
        Self::ValidationError,
        Self::InvalidQueryPayload,
        Self::JwtVerification,
        Self::ExpiredAccessKey,
        Self::NonceUsed,
        Self::NoAuthorizationIp,
        Self::OutOfScope,
        Self::InvalidAccessKey,
        Self::TooManyRequests,
    ];

    /// The `error.name` the exchange uses for this kind. For rate limiting
    /// the exchange answers with plain text, so the name is that text.
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateAskError => "create_ask_error",
            Self::CreateBidError => "create_bid_error",
            Self::InsufficientFundsAsk => "insufficient_funds_ask",
            Self::InsufficientFundsBid => "insufficient_funds_bid",
            Self::UnderMinTotalAsk => "under_min_total_ask",
            Self::UnderMinTotalBid => "under_min_total_bid",
            // server spelling
            Self::WithdrawAddressNotRegistered => "withdraw_address_not_registerd",
            Self::ValidationError => "validation_error",
            Self::InvalidQueryPayload => "invalid_query_payload",
            Self::JwtVerification => "jwt_verification",
            Self::ExpiredAccessKey => "expired_access_key",
            Self::NonceUsed => "nonce_used",
            Self::NoAuthorizationIp => "no_authorization_i_p",
            Self::OutOfScope => "out_of_scope",
            Self::InvalidAccessKey => "invalid_access_key",
            Self::TooManyRequests => "Too many API requests.",
        }
    }

    pub const fn code(self) -> u16 {
        match self {
            Self::CreateAskError
            | Self::CreateBidError
            | Self::InsufficientFundsAsk
            | Self::InsufficientFundsBid
            | Self::UnderMinTotalAsk
            | Self::UnderMinTotalBid
            | Self::WithdrawAddressNotRegistered
            | Self::ValidationError => 400,
            Self::InvalidQueryPayload
            | Self::JwtVerification
            | Self::ExpiredAccessKey
            | Self::NonceUsed
            | Self::NoAuthorizationIp
            | Self::OutOfScope
            | Self::InvalidAccessKey => 401,
            Self::TooManyRequests => 429,
        }
    }

    /// Fixed, human readable description of the kind.
    pub const fn message(self) -> &'static str {
        match self {
            Self::CreateAskError => "Sell order request could not be created",
            Self::CreateBidError => "Buy order request could not be created",
            Self::InsufficientFundsAsk => "Insufficient balance to place the sell order",
            Self::InsufficientFundsBid => "Insufficient balance to place the buy order",
            Self::UnderMinTotalAsk => "Sell order total is below the minimum order amount",
            Self::UnderMinTotalBid => "Buy order total is below the minimum order amount",
            Self::WithdrawAddressNotRegistered => "Withdrawal address is not registered",
            Self::ValidationError => "Request parameters failed exchange validation",
            Self::InvalidQueryPayload => "JWT query payload is invalid",
            Self::JwtVerification => "JWT token verification failed",
            Self::ExpiredAccessKey => "API access key has expired",
            Self::NonceUsed => "JWT nonce has already been used",
            Self::NoAuthorizationIp => "Request IP address is not authorized for this key",
            Self::OutOfScope => "API key lacks permission for this operation",
            Self::InvalidAccessKey => "API access key is invalid",
            Self::TooManyRequests => "Request rate limit exceeded",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional call-site details attached to a classified failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub order_id: Option<String>,
    pub field: Option<String>,
    pub side: Option<String>,
}

impl ErrorContext {
    pub fn order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn side(side: impl Into<String>) -> Self {
        Self {
            side: Some(side.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() && self.field.is_none() && self.side.is_none()
    }

    /// Fill unset fields from `other`.
    fn merge(&mut self, other: Self) {
        if self.order_id.is_none() {
            self.order_id = other.order_id;
        }
        if self.field.is_none() {
            self.field = other.field;
        }
        if self.side.is_none() {
            self.side = other.side;
        }
    }
}

/// A failure the exchange reported and the classifier recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub kind: ApiErrorKind,
    pub code: u16,
    /// Literal message returned by the server.
    pub message: String,
    pub context: ErrorContext,
}

impl ErrorRecord {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context.merge(context);
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}", self.code, self.kind.name(), self.kind.message())?;
        if let Some(side) = &self.context.side {
            write!(f, " (side: {})", side)?;
        }
        if let Some(order_id) = &self.context.order_id {
            write!(f, " (order: {})", order_id)?;
        }
        if let Some(field) = &self.context.field {
            write!(f, " (field: {})", field)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum UpbitError {
    #[error("Exchange error: {0}")]
    Exchange(ErrorRecord),

    #[error("API error: {code} {name} - {message}")]
    Api {
        name: String,
        code: u16,
        message: String,
    },

    #[error("Invalid parameters: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("Order error: {message}")]
    Order {
        message: String,
        order_uuid: Option<String>,
        order_side: Option<String>,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Malformed Remaining-Req header: {0}")]
    RateLimitHeader(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Stream terminated")]
    StreamTerminated,
}

impl UpbitError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Exchange error name, for classified and unclassified API failures.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Exchange(record) => Some(record.name()),
            Self::Api { name, .. } => Some(name),
            _ => None,
        }
    }

    /// HTTP status reported by the exchange.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Exchange(record) => Some(record.code),
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Exchange(record) => Some(record.kind),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code() == Some(429)
    }

    /// Attach call-site context to a classified failure; other errors pass through.
    pub fn with_context(self, context: ErrorContext) -> Self {
        match self {
            Self::Exchange(record) => Self::Exchange(record.with_context(context)),
            other => other,
        }
    }
}
