use crate::core::errors::UpbitError;
use crate::core::kernel::RestClient;
use crate::exchanges::upbit::conversions::{validate_market, validate_range};
use crate::exchanges::upbit::rest::UpbitRest;
use crate::exchanges::upbit::types::{
    CandleInterval, UpbitCandle, UpbitMarket, UpbitOrderbook, UpbitOrderbookLevels, UpbitTicker,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

/// Markets per `/ticker` request.
const TICKER_CHUNK: usize = 200;
const MAX_CANDLE_COUNT: u32 = 200;
const CANDLE_TO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Public quotation queries. No credentials needed.
pub struct MarketData<R: RestClient> {
    rest: UpbitRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &UpbitRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

/// Parameters for a candle query
#[derive(Debug, Clone)]
pub struct CandleQuery<'a> {
    pub market: &'a str,
    pub interval: CandleInterval,
    pub count: u32,
    pub to: Option<DateTime<Utc>>,
    pub converting_price_unit: Option<&'a str>,
}

impl<'a> CandleQuery<'a> {
    pub fn new(market: &'a str, interval: CandleInterval) -> Self {
        Self {
            market,
            interval,
            count: MAX_CANDLE_COUNT,
            to: None,
            converting_price_unit: None,
        }
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Last candle boundary (exclusive), sent as UTC.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn converting_price_unit(mut self, unit: &'a str) -> Self {
        self.converting_price_unit = Some(unit);
        self
    }
}

fn validate_markets(markets: &[String]) -> Result<(), UpbitError> {
    if markets.is_empty() {
        return Err(UpbitError::validation("markets", "at least one market is required"));
    }
    markets
        .iter()
        .try_for_each(|market| validate_market("markets", market))
}

impl<R: RestClient> MarketData<R> {
    /// Listed markets, optionally only those quoted in `fiat` (`KRW`, `BTC`, `USDT`).
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_tickers(
        &self,
        fiat: Option<&str>,
        details: bool,
    ) -> Result<Vec<UpbitMarket>, UpbitError> {
        let markets = self.rest.get_markets(details).await?.into_data();
        Ok(match fiat {
            Some(fiat) => {
                let prefix = format!("{}-", fiat);
                markets
                    .into_iter()
                    .filter(|m| m.market.starts_with(&prefix))
                    .collect()
            }
            None => markets,
        })
    }

    pub async fn get_current_price(&self, market: &str) -> Result<Decimal, UpbitError> {
        let markets = [market.to_string()];
        self.get_current_prices(&markets)
            .await?
            .into_iter()
            .next()
            .map(|t| t.trade_price)
            .ok_or_else(|| UpbitError::Deserialization(format!("no ticker returned for {}", market)))
    }

    /// Tickers for any number of markets, fetched in requests of 200 markets.
    #[instrument(skip(self, markets), fields(exchange = "upbit", market_count = markets.len()))]
    pub async fn get_current_prices(
        &self,
        markets: &[String],
    ) -> Result<Vec<UpbitTicker>, UpbitError> {
        validate_markets(markets)?;

        let mut tickers = Vec::with_capacity(markets.len());
        for chunk in markets.chunks(TICKER_CHUNK) {
            let response = self.rest.get_tickers(chunk).await?;
            if let Some(remaining) = &response.remaining_req {
                debug!(group = %remaining.group, sec = remaining.sec, "ticker request budget");
            }
            tickers.extend(response.into_data());
        }
        Ok(tickers)
    }

    /// Orderbooks, optionally aggregated at a price `level` (KRW markets only).
    #[instrument(skip(self, markets), fields(exchange = "upbit", market_count = markets.len()))]
    pub async fn get_orderbook(
        &self,
        markets: &[String],
        level: Option<Decimal>,
    ) -> Result<Vec<UpbitOrderbook>, UpbitError> {
        validate_markets(markets)?;
        Ok(self.rest.get_orderbooks(markets, level).await?.into_data())
    }

    pub async fn get_orderbook_supported_levels(
        &self,
        markets: &[String],
    ) -> Result<Vec<UpbitOrderbookLevels>, UpbitError> {
        validate_markets(markets)?;
        Ok(self.rest.get_orderbook_levels(markets).await?.into_data())
    }

    #[instrument(skip(self, query), fields(exchange = "upbit", market = query.market))]
    pub async fn get_candles(&self, query: CandleQuery<'_>) -> Result<Vec<UpbitCandle>, UpbitError> {
        validate_market("market", query.market)?;
        validate_range("count", query.count, 1, MAX_CANDLE_COUNT)?;

        let to = query.to.map(|t| t.format(CANDLE_TO_FORMAT).to_string());
        Ok(self
            .rest
            .get_candles(
                query.interval,
                query.market,
                query.count,
                to.as_deref(),
                query.converting_price_unit,
            )
            .await?
            .into_data())
    }

    /// Candles with the interval given as text, e.g. `"minute5"` or `"days"`.
    pub async fn get_ohlcv(
        &self,
        market: &str,
        interval: &str,
        count: u32,
    ) -> Result<Vec<UpbitCandle>, UpbitError> {
        let interval: CandleInterval = interval.parse()?;
        self.get_candles(CandleQuery::new(market, interval).count(count))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_candle_to_format() {
        let to = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(to.format(CANDLE_TO_FORMAT).to_string(), "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_validate_markets() {
        assert!(validate_markets(&[]).is_err());
        assert!(validate_markets(&["KRW-BTC".to_string(), "BTCKRW".to_string()]).is_err());
        assert!(validate_markets(&["KRW-BTC".to_string(), "BTC-ETH".to_string()]).is_ok());
    }
}
