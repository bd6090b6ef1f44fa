use crate::core::errors::UpbitError;
use crate::core::kernel::{dispatch, RestClient, SignedRequest, Signer};
use crate::core::types::{QueryParams, RestResponse};
use crate::exchanges::upbit::types::{
    CandleInterval, OrderRequest, OrderState, UpbitAccount, UpbitCandle, UpbitDepositAddress,
    UpbitMarket, UpbitOrder, UpbitOrderbook, UpbitOrderbookLevels, UpbitTicker, UpbitTransfer,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

pub type RestResult<T> = Result<RestResponse<T>, UpbitError>;

/// Thin typed wrapper around `RestClient` for the Upbit API
///
/// Every method maps to one endpoint and returns the decoded body together with
/// the `Remaining-Req` budget.
pub struct UpbitRest<R: RestClient> {
    client: R,
    base_url: String,
    signer: Option<Arc<dyn Signer>>,
}

impl<R: RestClient + Clone> Clone for UpbitRest<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            signer: self.signer.clone(),
        }
    }
}

impl<R: RestClient> UpbitRest<R> {
    pub fn new(client: R, base_url: String, signer: Option<Arc<dyn Signer>>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        }
    }

    pub fn has_signer(&self) -> bool {
        self.signer.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn public<T: DeserializeOwned>(&self, path: &str, params: QueryParams) -> RestResult<T> {
        let request = SignedRequest::public(Method::GET, self.url(path), params);
        dispatch(&self.client, request).await
    }

    async fn private<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
    ) -> RestResult<T> {
        let signer = self.signer.as_deref().ok_or_else(|| {
            UpbitError::Auth("Authentication required but no credentials configured".to_string())
        })?;
        let request = SignedRequest::signed(method, self.url(path), params, signer)?;
        dispatch(&self.client, request).await
    }

    // -- account ------------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_accounts(&self) -> RestResult<Vec<UpbitAccount>> {
        self.private(Method::GET, "/accounts", QueryParams::new())
            .await
    }

    // -- orders -------------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_orders_chance(&self, market: &str) -> RestResult<Value> {
        let params = QueryParams::new().with("market", market);
        self.private(Method::GET, "/orders/chance", params).await
    }

    /// Single order by uuid (`GET /order`).
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_order(&self, uuid: &str) -> RestResult<UpbitOrder> {
        let params = QueryParams::new().with("uuid", uuid);
        self.private(Method::GET, "/order", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_orders_by_uuids(&self, uuids: &[&str]) -> RestResult<Vec<UpbitOrder>> {
        let params = QueryParams::new()
            .with_list("uuids", uuids.iter().copied())
            .with("order_by", "desc");
        self.private(Method::GET, "/orders/uuids", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_open_orders(
        &self,
        market: &str,
        states: &[OrderState],
        page: u32,
        limit: u32,
    ) -> RestResult<Vec<UpbitOrder>> {
        let params = QueryParams::new()
            .with("market", market)
            .with_list("states", states.iter().map(|s| s.as_str()))
            .with("page", page)
            .with("limit", limit)
            .with("order_by", "desc");
        self.private(Method::GET, "/orders/open", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_closed_orders(
        &self,
        market: &str,
        states: &[OrderState],
        limit: u32,
    ) -> RestResult<Vec<UpbitOrder>> {
        let params = QueryParams::new()
            .with("market", market)
            .with_list("states", states.iter().map(|s| s.as_str()))
            .with("limit", limit)
            .with("order_by", "desc");
        self.private(Method::GET, "/orders/closed", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn cancel_order(&self, uuid: &str) -> RestResult<UpbitOrder> {
        let params = QueryParams::new().with("uuid", uuid);
        self.private(Method::DELETE, "/order", params).await
    }

    #[instrument(skip(self, order), fields(exchange = "upbit", market = %order.market, side = %order.side))]
    pub async fn place_order(&self, order: &OrderRequest) -> RestResult<UpbitOrder> {
        self.private(Method::POST, "/orders", order.to_params())
            .await
    }

    /// Validate an order on the exchange without placing it.
    #[instrument(skip(self, order), fields(exchange = "upbit", market = %order.market, side = %order.side))]
    pub async fn test_order(&self, order: &OrderRequest) -> RestResult<UpbitOrder> {
        self.private(Method::POST, "/orders/test", order.to_params())
            .await
    }

    // -- withdrawals --------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_withdraws(&self, currency: &str) -> RestResult<Vec<UpbitTransfer>> {
        let params = QueryParams::new().with("currency", currency);
        self.private(Method::GET, "/withdraws", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_withdraw(&self, uuid: &str, currency: &str) -> RestResult<UpbitTransfer> {
        let params = QueryParams::new()
            .with("uuid", uuid)
            .with("currency", currency);
        self.private(Method::GET, "/withdraw", params).await
    }

    #[instrument(skip(self, address, secondary_address), fields(exchange = "upbit"))]
    pub async fn withdraw_coin(
        &self,
        currency: &str,
        net_type: &str,
        amount: Decimal,
        address: &str,
        secondary_address: Option<&str>,
        transaction_type: &str,
    ) -> RestResult<UpbitTransfer> {
        let params = QueryParams::new()
            .with("currency", currency)
            .with("net_type", net_type)
            .with("amount", amount)
            .with("address", address)
            .with_opt("secondary_address", secondary_address)
            .with("transaction_type", transaction_type);
        self.private(Method::POST, "/withdraws/coin", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn withdraw_krw(&self, amount: Decimal) -> RestResult<UpbitTransfer> {
        let params = QueryParams::new().with("amount", amount);
        self.private(Method::POST, "/withdraws/krw", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_withdraw_chance(&self, currency: &str, net_type: &str) -> RestResult<Value> {
        let params = QueryParams::new()
            .with("currency", currency)
            .with("net_type", net_type);
        self.private(Method::GET, "/withdraws/chance", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_withdraw_addresses(&self, currency: Option<&str>) -> RestResult<Vec<Value>> {
        let params = QueryParams::new().with_opt("currency", currency);
        self.private(Method::GET, "/withdraws/whitelist_addresses", params)
            .await
    }

    // -- deposits -----------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposits(&self, currency: &str) -> RestResult<Vec<UpbitTransfer>> {
        let params = QueryParams::new().with("currency", currency);
        self.private(Method::GET, "/deposits", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposit(&self, uuid: &str, currency: &str) -> RestResult<UpbitTransfer> {
        let params = QueryParams::new()
            .with("uuid", uuid)
            .with("currency", currency);
        self.private(Method::GET, "/deposit", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposit_chance(&self, currency: &str, net_type: &str) -> RestResult<Value> {
        let params = QueryParams::new()
            .with("currency", currency)
            .with("net_type", net_type);
        self.private(Method::GET, "/deposits/chance/coin", params)
            .await
    }

    /// Request address generation. The exchange may answer with a pending
    /// notice instead of the address itself.
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn generate_deposit_address(
        &self,
        currency: &str,
        net_type: Option<&str>,
    ) -> RestResult<Value> {
        let params = QueryParams::new()
            .with("currency", currency)
            .with_opt("net_type", net_type);
        self.private(Method::POST, "/deposits/generate_coin_address", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposit_addresses(&self) -> RestResult<Vec<UpbitDepositAddress>> {
        self.private(Method::GET, "/deposits/coin_addresses", QueryParams::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposit_address(
        &self,
        currency: &str,
        net_type: Option<&str>,
    ) -> RestResult<UpbitDepositAddress> {
        let params = QueryParams::new()
            .with("currency", currency)
            .with_opt("net_type", net_type);
        self.private(Method::GET, "/deposits/coin_address", params)
            .await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_krw_deposit_info(&self) -> RestResult<Value> {
        self.private(Method::GET, "/deposits/krw", QueryParams::new())
            .await
    }

    // -- service ------------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_wallet_status(&self) -> RestResult<Vec<Value>> {
        self.private(Method::GET, "/status/wallet", QueryParams::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_api_keys(&self) -> RestResult<Vec<Value>> {
        self.private(Method::GET, "/api_keys", QueryParams::new())
            .await
    }

    // -- travel rule --------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_travel_rule_vasps(&self) -> RestResult<Vec<Value>> {
        self.private(Method::GET, "/travel_rule/vasps", QueryParams::new())
            .await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn verify_travel_rule_by_uuid(
        &self,
        deposit_uuid: &str,
        vasp_name: &str,
        vasp_address: &str,
    ) -> RestResult<Value> {
        let params = QueryParams::new()
            .with("deposit_uuid", deposit_uuid)
            .with("vasp_name", vasp_name)
            .with("vasp_address", vasp_address);
        self.private(Method::POST, "/travel_rule/verify", params)
            .await
    }

    // -- quotation ----------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_markets(&self, details: bool) -> RestResult<Vec<UpbitMarket>> {
        let params = QueryParams::new().with("isDetails", details);
        self.public("/market/all", params).await
    }

    #[instrument(skip(self, markets), fields(exchange = "upbit", market_count = markets.len()))]
    pub async fn get_tickers(&self, markets: &[String]) -> RestResult<Vec<UpbitTicker>> {
        let params = QueryParams::new().with("markets", markets.join(","));
        self.public("/ticker", params).await
    }

    #[instrument(skip(self, markets), fields(exchange = "upbit", market_count = markets.len()))]
    pub async fn get_orderbooks(
        &self,
        markets: &[String],
        level: Option<Decimal>,
    ) -> RestResult<Vec<UpbitOrderbook>> {
        let params = QueryParams::new()
            .with("markets", markets.join(","))
            .with_opt("level", level);
        self.public("/orderbook", params).await
    }

    #[instrument(skip(self, markets), fields(exchange = "upbit", market_count = markets.len()))]
    pub async fn get_orderbook_levels(
        &self,
        markets: &[String],
    ) -> RestResult<Vec<UpbitOrderbookLevels>> {
        let params = QueryParams::new().with("markets", markets.join(","));
        self.public("/orderbook/supported_levels", params).await
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_candles(
        &self,
        interval: CandleInterval,
        market: &str,
        count: u32,
        to: Option<&str>,
        converting_price_unit: Option<&str>,
    ) -> RestResult<Vec<UpbitCandle>> {
        let params = QueryParams::new()
            .with("market", market)
            .with("count", count)
            .with_opt("to", to)
            .with_opt("convertingPriceUnit", converting_price_unit);
        self.public(&interval.path(), params).await
    }
}
