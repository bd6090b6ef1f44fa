use crate::core::errors::UpbitError;
use crate::core::kernel::RestClient;
use crate::exchanges::upbit::conversions::split_ticker;
use crate::exchanges::upbit::rest::UpbitRest;
use crate::exchanges::upbit::types::UpbitAccount;
use rust_decimal::Decimal;
use tracing::instrument;

/// Balance queries derived from `/accounts`
pub struct Account<R: RestClient> {
    rest: UpbitRest<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &UpbitRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

fn currency_of(ticker: &str) -> &str {
    split_ticker(ticker).1
}

impl<R: RestClient> Account<R> {
    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_balances(&self) -> Result<Vec<UpbitAccount>, UpbitError> {
        Ok(self.rest.get_accounts().await?.into_data())
    }

    /// Full account record for `ticker` (`KRW-BTC` or a bare currency quoted in KRW).
    pub async fn get_account(&self, ticker: &str) -> Result<Option<UpbitAccount>, UpbitError> {
        let (fiat, currency) = split_ticker(ticker);
        Ok(self
            .get_balances()
            .await?
            .into_iter()
            .find(|a| a.currency == currency && a.unit_currency == fiat))
    }

    /// Available balance, excluding amounts locked in open orders. Zero when
    /// the account holds none.
    pub async fn get_balance(&self, ticker: &str) -> Result<Decimal, UpbitError> {
        Ok(self
            .get_account(ticker)
            .await?
            .map_or(Decimal::ZERO, |a| a.balance))
    }

    /// Balance including locked amounts.
    pub async fn get_balance_total(&self, ticker: &str) -> Result<Decimal, UpbitError> {
        let currency = currency_of(ticker);
        Ok(self
            .get_balances()
            .await?
            .iter()
            .find(|a| a.currency == currency)
            .map_or(Decimal::ZERO, UpbitAccount::total))
    }

    pub async fn get_avg_buy_price(&self, ticker: &str) -> Result<Decimal, UpbitError> {
        let currency = currency_of(ticker);
        Ok(self
            .get_balances()
            .await?
            .iter()
            .find(|a| a.currency == currency)
            .map_or(Decimal::ZERO, |a| a.avg_buy_price))
    }

    /// Purchase amount (average buy price times total holding). `"ALL"` sums
    /// every non-KRW holding.
    pub async fn get_amount(&self, ticker: &str) -> Result<Decimal, UpbitError> {
        let currency = currency_of(ticker);
        let amount = self
            .get_balances()
            .await?
            .iter()
            .filter(|a| a.currency != "KRW")
            .filter(|a| currency == "ALL" || a.currency == currency)
            .map(|a| a.avg_buy_price * a.total())
            .sum();
        Ok(amount)
    }
}
