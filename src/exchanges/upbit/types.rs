use crate::core::errors::UpbitError;
use crate::core::types::QueryParams;
use crate::exchanges::upbit::conversions::{validate_market, validate_positive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bid => "bid",
            Self::Ask => "ask",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ord_type` values accepted by `/orders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Limit order
    Limit,
    /// Market buy by total price
    Price,
    /// Market sell by volume
    Market,
    /// Best-price order, requires a time in force
    Best,
}

impl OrderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Price => "price",
            Self::Market => "market",
            Self::Best => "best",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    Ioc,
    Fok,
    PostOnly,
}

impl TimeInForce {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ioc => "ioc",
            Self::Fok => "fok",
            Self::PostOnly => "post_only",
        }
    }
}

impl FromStr for TimeInForce {
    type Err = UpbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ioc" => Ok(Self::Ioc),
            "fok" => Ok(Self::Fok),
            "post_only" => Ok(Self::PostOnly),
            other => Err(UpbitError::validation(
                "time_in_force",
                format!("unsupported time in force: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Wait,
    Watch,
    Done,
    Cancel,
}

impl OrderState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wait => "wait",
            Self::Watch => "watch",
            Self::Done => "done",
            Self::Cancel => "cancel",
        }
    }

    /// Open orders are served by `/orders/open`, the rest by `/orders/closed`.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Wait | Self::Watch)
    }
}

impl FromStr for OrderState {
    type Err = UpbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait" => Ok(Self::Wait),
            "watch" => Ok(Self::Watch),
            "done" => Ok(Self::Done),
            "cancel" => Ok(Self::Cancel),
            other => Err(UpbitError::validation(
                "states",
                format!("unknown order state: {}", other),
            )),
        }
    }
}

/// Realtime channel types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelType {
    Ticker,
    Trade,
    Orderbook,
    MyOrder,
    MyAsset,
}

impl ChannelType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Trade => "trade",
            Self::Orderbook => "orderbook",
            Self::MyOrder => "myOrder",
            Self::MyAsset => "myAsset",
        }
    }

    pub const fn is_private(self) -> bool {
        matches!(self, Self::MyOrder | Self::MyAsset)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = UpbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ticker" => Ok(Self::Ticker),
            "trade" => Ok(Self::Trade),
            "orderbook" => Ok(Self::Orderbook),
            "myorder" => Ok(Self::MyOrder),
            "myasset" => Ok(Self::MyAsset),
            _ => Err(UpbitError::validation(
                "type",
                format!("unknown channel type: {}", s),
            )),
        }
    }
}

/// Candle granularity and the endpoint path serving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleInterval {
    Seconds(u32),
    Minutes(u32),
    Days,
    Weeks,
    Months,
    Years,
}

const MINUTE_UNITS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

impl CandleInterval {
    pub fn path(self) -> String {
        match self {
            Self::Seconds(unit) => format!("/candles/seconds/{}", unit),
            Self::Minutes(unit) => format!("/candles/minutes/{}", unit),
            Self::Days => "/candles/days".to_string(),
            Self::Weeks => "/candles/weeks".to_string(),
            Self::Months => "/candles/months".to_string(),
            Self::Years => "/candles/years".to_string(),
        }
    }
}

impl FromStr for CandleInterval {
    type Err = UpbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UpbitError::validation("interval", format!("unknown candle interval: {}", s));

        match s {
            "day" | "days" => return Ok(Self::Days),
            "week" | "weeks" => return Ok(Self::Weeks),
            "month" | "months" => return Ok(Self::Months),
            "year" | "years" => return Ok(Self::Years),
            _ => {}
        }

        if let Some(unit) = s.strip_prefix("seconds/") {
            let unit: u32 = unit.parse().map_err(|_| invalid())?;
            return if unit == 0 {
                Err(invalid())
            } else {
                Ok(Self::Seconds(unit))
            };
        }

        let unit = s
            .strip_prefix("minutes")
            .or_else(|| s.strip_prefix("minute"))
            .ok_or_else(invalid)?;
        let unit: u32 = unit.parse().map_err(|_| invalid())?;
        if MINUTE_UNITS.contains(&unit) {
            Ok(Self::Minutes(unit))
        } else {
            Err(invalid())
        }
    }
}

// ---------------------------------------------------------------------------
// REST models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitAccount {
    pub currency: String,
    pub balance: Decimal,
    pub locked: Decimal,
    pub avg_buy_price: Decimal,
    #[serde(default)]
    pub avg_buy_price_modified: bool,
    pub unit_currency: String,
}

impl UpbitAccount {
    pub fn total(&self) -> Decimal {
        self.balance + self.locked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitOrder {
    pub uuid: String,
    pub side: OrderSide,
    pub ord_type: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    pub state: String,
    pub market: String,
    pub created_at: String,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub remaining_volume: Option<Decimal>,
    #[serde(default)]
    pub reserved_fee: Option<Decimal>,
    #[serde(default)]
    pub remaining_fee: Option<Decimal>,
    #[serde(default)]
    pub paid_fee: Option<Decimal>,
    #[serde(default)]
    pub locked: Option<Decimal>,
    #[serde(default)]
    pub executed_volume: Option<Decimal>,
    #[serde(default)]
    pub trades_count: Option<u64>,
    #[serde(default)]
    pub time_in_force: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitMarket {
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
    #[serde(default)]
    pub market_warning: Option<String>,
    #[serde(default)]
    pub market_event: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitTicker {
    pub market: String,
    pub trade_price: Decimal,
    #[serde(default)]
    pub opening_price: Option<Decimal>,
    #[serde(default)]
    pub high_price: Option<Decimal>,
    #[serde(default)]
    pub low_price: Option<Decimal>,
    #[serde(default)]
    pub prev_closing_price: Option<Decimal>,
    #[serde(default)]
    pub change: Option<String>,
    #[serde(default)]
    pub signed_change_rate: Option<Decimal>,
    #[serde(default)]
    pub acc_trade_volume_24h: Option<Decimal>,
    #[serde(default)]
    pub acc_trade_price_24h: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitOrderbookUnit {
    pub ask_price: Decimal,
    pub bid_price: Decimal,
    pub ask_size: Decimal,
    pub bid_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitOrderbook {
    pub market: String,
    pub timestamp: i64,
    pub total_ask_size: Decimal,
    pub total_bid_size: Decimal,
    pub orderbook_units: Vec<UpbitOrderbookUnit>,
    #[serde(default)]
    pub level: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitOrderbookLevels {
    pub market: String,
    pub supported_levels: Vec<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitCandle {
    pub market: String,
    pub candle_date_time_utc: String,
    pub candle_date_time_kst: String,
    pub opening_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub trade_price: Decimal,
    pub timestamp: i64,
    pub candle_acc_trade_price: Decimal,
    pub candle_acc_trade_volume: Decimal,
    #[serde(default)]
    pub unit: Option<u32>,
}

/// Deposit or withdrawal record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitTransfer {
    #[serde(rename = "type")]
    pub kind: String,
    pub uuid: String,
    pub currency: String,
    #[serde(default)]
    pub net_type: Option<String>,
    #[serde(default)]
    pub txid: Option<String>,
    pub state: String,
    pub created_at: String,
    #[serde(default)]
    pub done_at: Option<String>,
    pub amount: Decimal,
    pub fee: Decimal,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitDepositAddress {
    pub currency: String,
    #[serde(default)]
    pub net_type: Option<String>,
    #[serde(default)]
    pub deposit_address: Option<String>,
    #[serde(default)]
    pub secondary_address: Option<String>,
}

/// Order parameters for `/orders` and `/orders/test`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub market: String,
    pub side: OrderSide,
    pub ord_type: OrderType,
    pub volume: Option<Decimal>,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub identifier: Option<String>,
}

impl OrderRequest {
    pub fn limit(market: &str, side: OrderSide, price: Decimal, volume: Decimal) -> Self {
        Self {
            market: market.to_string(),
            side,
            ord_type: OrderType::Limit,
            volume: Some(volume),
            price: Some(price),
            time_in_force: None,
            identifier: None,
        }
    }

    /// Market buy spending `total` in the quote currency.
    pub fn market_buy(market: &str, total: Decimal) -> Self {
        Self {
            market: market.to_string(),
            side: OrderSide::Bid,
            ord_type: OrderType::Price,
            volume: None,
            price: Some(total),
            time_in_force: None,
            identifier: None,
        }
    }

    pub fn market_sell(market: &str, volume: Decimal) -> Self {
        Self {
            market: market.to_string(),
            side: OrderSide::Ask,
            ord_type: OrderType::Market,
            volume: Some(volume),
            price: None,
            time_in_force: None,
            identifier: None,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: Option<TimeInForce>) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Local checks run before anything is sent.
    pub fn validate(&self) -> Result<(), UpbitError> {
        validate_market("market", &self.market)?;
        if let Some(price) = self.price {
            validate_positive("price", price)?;
        }
        if let Some(volume) = self.volume {
            validate_positive("volume", volume)?;
        }
        match self.ord_type {
            OrderType::Limit if self.price.is_none() || self.volume.is_none() => Err(
                UpbitError::validation("price", "limit orders need both price and volume"),
            ),
            OrderType::Price if self.price.is_none() => Err(UpbitError::validation(
                "price",
                "market buy orders need a total price",
            )),
            OrderType::Market if self.volume.is_none() => Err(UpbitError::validation(
                "volume",
                "market sell orders need a volume",
            )),
            OrderType::Best if self.time_in_force.is_none() => Err(UpbitError::validation(
                "time_in_force",
                "best orders need ioc or fok",
            )),
            _ => Ok(()),
        }
    }

    pub fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .with("market", &self.market)
            .with("side", self.side.as_str())
            .with("ord_type", self.ord_type.as_str())
            .with_opt("volume", self.volume)
            .with_opt("price", self.price)
            .with_opt("time_in_force", self.time_in_force.map(TimeInForce::as_str))
            .with_opt("identifier", self.identifier.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_interval_parsing() {
        assert_eq!("day".parse::<CandleInterval>().unwrap(), CandleInterval::Days);
        assert_eq!(
            "minute15".parse::<CandleInterval>().unwrap(),
            CandleInterval::Minutes(15)
        );
        assert_eq!(
            "minutes240".parse::<CandleInterval>().unwrap(),
            CandleInterval::Minutes(240)
        );
        assert_eq!(
            "seconds/1".parse::<CandleInterval>().unwrap().path(),
            "/candles/seconds/1"
        );
        assert_eq!("years".parse::<CandleInterval>().unwrap().path(), "/candles/years");
    }

    #[test]
    fn test_unknown_candle_interval() {
        for raw in ["minute7", "hour", "seconds/x", "seconds/0", ""] {
            assert!(matches!(
                raw.parse::<CandleInterval>(),
                Err(UpbitError::Validation { .. })
            ));
        }
    }

    #[test]
    fn test_channel_type_wire_names() {
        assert_eq!(ChannelType::MyOrder.as_str(), "myOrder");
        assert_eq!(
            serde_json::to_string(&ChannelType::MyAsset).unwrap(),
            "\"myAsset\""
        );
        assert_eq!("MYORDER".parse::<ChannelType>().unwrap(), ChannelType::MyOrder);
        assert!(ChannelType::MyAsset.is_private());
        assert!(!ChannelType::Trade.is_private());
    }

    #[test]
    fn test_account_decimal_strings() {
        let account: UpbitAccount = serde_json::from_str(
            r#"{"currency":"BTC","balance":"0.5","locked":"0.25","avg_buy_price":"40000000","avg_buy_price_modified":false,"unit_currency":"KRW"}"#,
        )
        .unwrap();
        assert_eq!(account.total(), Decimal::new(75, 2));
    }

    #[test]
    fn test_order_request_params() {
        let request = OrderRequest::limit("KRW-BTC", OrderSide::Bid, Decimal::new(50_000_000, 0), Decimal::new(1, 3))
            .with_time_in_force(Some(TimeInForce::Ioc));
        assert!(request.validate().is_ok());
        assert_eq!(
            request.to_params().encode(),
            "market=KRW-BTC&ord_type=limit&price=50000000&side=bid&time_in_force=ioc&volume=0.001"
        );
    }

    #[test]
    fn test_order_request_rejects_non_positive() {
        let request = OrderRequest::market_sell("KRW-BTC", Decimal::ZERO);
        assert!(matches!(
            request.validate(),
            Err(UpbitError::Validation { field: Some(ref f), .. }) if f == "volume"
        ));
        let request = OrderRequest::market_buy("KRWBTC", Decimal::ONE);
        assert!(request.validate().is_err());
    }
}
