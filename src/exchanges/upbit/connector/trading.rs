use crate::core::errors::{ErrorContext, UpbitError};
use crate::core::kernel::RestClient;
use crate::exchanges::upbit::conversions::{
    is_order_uuid, validate_market, validate_non_empty, validate_positive, validate_range,
};
use crate::exchanges::upbit::rest::UpbitRest;
use crate::exchanges::upbit::types::{
    OrderRequest, OrderSide, OrderState, TimeInForce, UpbitOrder,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const MAX_ORDER_PAGE_LIMIT: u32 = 100;

/// Order placement, lookup and cancellation
pub struct Trading<R: RestClient> {
    rest: UpbitRest<R>,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &UpbitRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Trading<R> {
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_chance(&self, market: &str) -> Result<Value, UpbitError> {
        validate_market("market", market)?;
        Ok(self.rest.get_orders_chance(market).await?.into_data())
    }

    /// Orders by uuid, or by market and state.
    ///
    /// Open states (`wait`, `watch`) are served by `/orders/open` and closed
    /// states (`done`, `cancel`) by `/orders/closed`. A mix of both queries both
    /// endpoints and returns the newest `limit` orders of the union. An empty
    /// `states` means `wait`.
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_order(
        &self,
        ticker_or_uuid: &str,
        states: &[OrderState],
        page: u32,
        limit: u32,
    ) -> Result<Vec<UpbitOrder>, UpbitError> {
        validate_non_empty("ticker_or_uuid", ticker_or_uuid)?;

        if is_order_uuid(ticker_or_uuid) {
            return Ok(self
                .rest
                .get_orders_by_uuids(&[ticker_or_uuid])
                .await?
                .into_data());
        }

        validate_market("market", ticker_or_uuid)?;
        validate_range("limit", limit, 1, MAX_ORDER_PAGE_LIMIT)?;
        validate_range("page", page, 1, u32::MAX)?;

        let states = if states.is_empty() {
            &[OrderState::Wait][..]
        } else {
            states
        };
        let (open, closed): (Vec<OrderState>, Vec<OrderState>) =
            states.iter().copied().partition(|s| s.is_open());

        let mut orders = Vec::new();
        if !open.is_empty() {
            let fetched = self
                .rest
                .get_open_orders(ticker_or_uuid, &open, page, limit)
                .await?;
            orders.extend(fetched.into_data());
        }
        if !closed.is_empty() {
            let fetched = self
                .rest
                .get_closed_orders(ticker_or_uuid, &closed, limit)
                .await?;
            orders.extend(fetched.into_data());
        }

        if !open.is_empty() && !closed.is_empty() {
            // ISO-8601 timestamps with a fixed offset sort lexicographically
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders.truncate(limit as usize);
        }
        Ok(orders)
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_individual_order(&self, uuid: &str) -> Result<UpbitOrder, UpbitError> {
        validate_non_empty("uuid", uuid)?;
        self.rest
            .get_orders_by_uuids(&[uuid])
            .await?
            .into_data()
            .into_iter()
            .next()
            .ok_or_else(|| UpbitError::Order {
                message: "order not found".to_string(),
                order_uuid: Some(uuid.to_string()),
                order_side: None,
            })
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn cancel_order(&self, uuid: &str) -> Result<UpbitOrder, UpbitError> {
        validate_non_empty("uuid", uuid)?;
        self.rest
            .cancel_order(uuid)
            .await
            .map(|r| r.into_data())
            .map_err(|e| e.with_context(ErrorContext::order(uuid)))
    }

    async fn submit(&self, order: OrderRequest) -> Result<UpbitOrder, UpbitError> {
        order.validate()?;
        let side = order.side;
        let placed = self
            .rest
            .place_order(&order)
            .await
            .map_err(|e| e.with_context(ErrorContext::side(side.as_str())))?
            .into_data();
        info!(uuid = %placed.uuid, market = %placed.market, side = %side, "order placed");
        Ok(placed)
    }

    pub async fn buy_limit_order(
        &self,
        market: &str,
        price: Decimal,
        volume: Decimal,
        time_in_force: Option<TimeInForce>,
    ) -> Result<UpbitOrder, UpbitError> {
        self.submit(
            OrderRequest::limit(market, OrderSide::Bid, price, volume)
                .with_time_in_force(time_in_force),
        )
        .await
    }

    /// Market buy spending `price` in the quote currency.
    pub async fn buy_market_order(
        &self,
        market: &str,
        price: Decimal,
    ) -> Result<UpbitOrder, UpbitError> {
        self.submit(OrderRequest::market_buy(market, price)).await
    }

    pub async fn sell_market_order(
        &self,
        market: &str,
        volume: Decimal,
    ) -> Result<UpbitOrder, UpbitError> {
        self.submit(OrderRequest::market_sell(market, volume)).await
    }

    pub async fn sell_limit_order(
        &self,
        market: &str,
        price: Decimal,
        volume: Decimal,
        time_in_force: Option<TimeInForce>,
    ) -> Result<UpbitOrder, UpbitError> {
        self.submit(
            OrderRequest::limit(market, OrderSide::Ask, price, volume)
                .with_time_in_force(time_in_force),
        )
        .await
    }

    /// Dry-run an order through `/orders/test`; nothing is placed.
    #[instrument(skip(self, order), fields(exchange = "upbit", market = %order.market))]
    pub async fn test_order(&self, order: OrderRequest) -> Result<UpbitOrder, UpbitError> {
        order.validate()?;
        let side = order.side;
        self.rest
            .test_order(&order)
            .await
            .map(|r| r.into_data())
            .map_err(|e| e.with_context(ErrorContext::side(side.as_str())))
    }

    /// Cancel every waiting order in `market`. Stops at the first failed cancel.
    ///
    /// All pages are collected before the first cancel so that cancelling does
    /// not shift the pages still to be read.
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn cancel_orders_open(&self, market: &str) -> Result<Vec<UpbitOrder>, UpbitError> {
        validate_market("market", market)?;

        let mut open = Vec::new();
        for page in 1.. {
            let fetched = self
                .rest
                .get_open_orders(market, &[OrderState::Wait], page, MAX_ORDER_PAGE_LIMIT)
                .await?
                .into_data();
            let last_page = fetched.len() < MAX_ORDER_PAGE_LIMIT as usize;
            open.extend(fetched);
            if last_page {
                break;
            }
        }
        debug!(market, count = open.len(), "cancelling open orders");

        let mut cancelled = Vec::with_capacity(open.len());
        for order in open {
            cancelled.push(self.cancel_order(&order.uuid).await?);
        }
        Ok(cancelled)
    }

    /// Cancel a limit order and place a replacement on the same side.
    ///
    /// Not atomic: the original order may fill between the two steps. Missing
    /// price or volume fall back to the original order's price and remaining
    /// volume.
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn cancel_and_new_order(
        &self,
        uuid: &str,
        new_price: Option<Decimal>,
        new_volume: Option<Decimal>,
    ) -> Result<UpbitOrder, UpbitError> {
        validate_non_empty("uuid", uuid)?;
        if let Some(price) = new_price {
            validate_positive("price", price)?;
        }
        if let Some(volume) = new_volume {
            validate_positive("volume", volume)?;
        }

        let original = self
            .rest
            .get_order(uuid)
            .await
            .map_err(|e| e.with_context(ErrorContext::order(uuid)))?
            .into_data();

        let order_error = |message: &str| UpbitError::Order {
            message: message.to_string(),
            order_uuid: Some(uuid.to_string()),
            order_side: Some(original.side.as_str().to_string()),
        };

        let price = new_price
            .or(original.price)
            .ok_or_else(|| order_error("original order has no price"))?;
        let volume = new_volume
            .or(original.remaining_volume)
            .ok_or_else(|| order_error("original order has no remaining volume"))?;

        self.cancel_order(uuid).await?;

        let replacement = OrderRequest::limit(&original.market, original.side, price, volume);
        self.submit(replacement).await.map_err(|e| {
            warn!(uuid, error = %e, "replacement order failed after cancel");
            e
        })
    }
}
