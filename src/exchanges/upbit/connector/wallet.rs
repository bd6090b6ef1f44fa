use crate::core::errors::UpbitError;
use crate::core::kernel::RestClient;
use crate::exchanges::upbit::conversions::{validate_currency, validate_non_empty, validate_positive};
use crate::exchanges::upbit::rest::UpbitRest;
use crate::exchanges::upbit::types::{UpbitDepositAddress, UpbitTransfer};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, instrument};

pub const DEFAULT_TRANSACTION_TYPE: &str = "default";

/// Withdrawals, deposits, wallet service status and travel-rule checks
pub struct Wallet<R: RestClient> {
    rest: UpbitRest<R>,
}

impl<R: RestClient + Clone> Wallet<R> {
    pub fn new(rest: &UpbitRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

/// Parameters for a coin withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawCoin<'a> {
    pub currency: &'a str,
    pub net_type: &'a str,
    pub amount: Decimal,
    pub address: &'a str,
    pub secondary_address: Option<&'a str>,
    pub transaction_type: &'a str,
}

impl<'a> WithdrawCoin<'a> {
    pub fn new(currency: &'a str, net_type: &'a str, amount: Decimal, address: &'a str) -> Self {
        Self {
            currency,
            net_type,
            amount,
            address,
            secondary_address: None,
            transaction_type: DEFAULT_TRANSACTION_TYPE,
        }
    }

    /// Destination tag or memo for currencies that need one.
    pub fn secondary_address(mut self, secondary_address: &'a str) -> Self {
        self.secondary_address = Some(secondary_address);
        self
    }

    pub fn transaction_type(mut self, transaction_type: &'a str) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    fn validate(&self) -> Result<(), UpbitError> {
        validate_currency("currency", self.currency)?;
        validate_non_empty("net_type", self.net_type)?;
        validate_non_empty("address", self.address)?;
        validate_non_empty("transaction_type", self.transaction_type)?;
        validate_positive("amount", self.amount)
    }
}

impl<R: RestClient> Wallet<R> {
    // -- withdrawals --------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_withdraw_list(&self, currency: &str) -> Result<Vec<UpbitTransfer>, UpbitError> {
        validate_currency("currency", currency)?;
        Ok(self.rest.get_withdraws(currency).await?.into_data())
    }

    pub async fn get_individual_withdraw_order(
        &self,
        uuid: &str,
        currency: &str,
    ) -> Result<UpbitTransfer, UpbitError> {
        validate_non_empty("uuid", uuid)?;
        validate_currency("currency", currency)?;
        Ok(self.rest.get_withdraw(uuid, currency).await?.into_data())
    }

    #[instrument(skip(self, request), fields(exchange = "upbit", currency = request.currency, net_type = request.net_type))]
    pub async fn withdraw_coin(&self, request: WithdrawCoin<'_>) -> Result<UpbitTransfer, UpbitError> {
        request.validate()?;
        let transfer = self
            .rest
            .withdraw_coin(
                request.currency,
                request.net_type,
                request.amount,
                request.address,
                request.secondary_address,
                request.transaction_type,
            )
            .await?
            .into_data();
        info!(uuid = %transfer.uuid, state = %transfer.state, "withdrawal requested");
        Ok(transfer)
    }

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn withdraw_cash(&self, amount: Decimal) -> Result<UpbitTransfer, UpbitError> {
        validate_positive("amount", amount)?;
        Ok(self.rest.withdraw_krw(amount).await?.into_data())
    }

    pub async fn get_withdraw_chance(
        &self,
        currency: &str,
        net_type: &str,
    ) -> Result<Value, UpbitError> {
        validate_currency("currency", currency)?;
        validate_non_empty("net_type", net_type)?;
        Ok(self
            .rest
            .get_withdraw_chance(currency, net_type)
            .await?
            .into_data())
    }

    /// Whitelisted withdrawal addresses, optionally for one currency.
    pub async fn get_withdraw_addresses(
        &self,
        currency: Option<&str>,
    ) -> Result<Vec<Value>, UpbitError> {
        if let Some(currency) = currency {
            validate_currency("currency", currency)?;
        }
        Ok(self.rest.get_withdraw_addresses(currency).await?.into_data())
    }

    // -- deposits -----------------------------------------------------------

    #[instrument(skip(self), fields(exchange = "upbit"))]
    pub async fn get_deposit_list(&self, currency: &str) -> Result<Vec<UpbitTransfer>, UpbitError> {
        validate_currency("currency", currency)?;
        Ok(self.rest.get_deposits(currency).await?.into_data())
    }

    pub async fn get_individual_deposit_order(
        &self,
        uuid: &str,
        currency: &str,
    ) -> Result<UpbitTransfer, UpbitError> {
        validate_non_empty("uuid", uuid)?;
        validate_currency("currency", currency)?;
        Ok(self.rest.get_deposit(uuid, currency).await?.into_data())
    }

    pub async fn get_deposit_chance(
        &self,
        currency: &str,
        net_type: &str,
    ) -> Result<Value, UpbitError> {
        validate_currency("currency", currency)?;
        validate_non_empty("net_type", net_type)?;
        Ok(self
            .rest
            .get_deposit_chance(currency, net_type)
            .await?
            .into_data())
    }

    pub async fn create_deposit_address(
        &self,
        currency: &str,
        net_type: Option<&str>,
    ) -> Result<Value, UpbitError> {
        validate_currency("currency", currency)?;
        Ok(self
            .rest
            .generate_deposit_address(currency, net_type)
            .await?
            .into_data())
    }

    pub async fn get_deposit_addresses(&self) -> Result<Vec<UpbitDepositAddress>, UpbitError> {
        Ok(self.rest.get_deposit_addresses().await?.into_data())
    }

    pub async fn get_deposit_address(
        &self,
        currency: &str,
        net_type: Option<&str>,
    ) -> Result<UpbitDepositAddress, UpbitError> {
        validate_currency("currency", currency)?;
        Ok(self
            .rest
            .get_deposit_address(currency, net_type)
            .await?
            .into_data())
    }

    pub async fn get_krw_deposit_info(&self) -> Result<Value, UpbitError> {
        Ok(self.rest.get_krw_deposit_info().await?.into_data())
    }

    // -- service ------------------------------------------------------------

    pub async fn get_deposit_withdraw_status(&self) -> Result<Vec<Value>, UpbitError> {
        Ok(self.rest.get_wallet_status().await?.into_data())
    }

    pub async fn get_api_key_list(&self) -> Result<Vec<Value>, UpbitError> {
        Ok(self.rest.get_api_keys().await?.into_data())
    }

    // -- travel rule --------------------------------------------------------

    pub async fn get_travel_rule_vasps(&self) -> Result<Vec<Value>, UpbitError> {
        Ok(self.rest.get_travel_rule_vasps().await?.into_data())
    }

    pub async fn verify_travel_rule_by_uuid(
        &self,
        deposit_uuid: &str,
        vasp_name: &str,
        vasp_address: &str,
    ) -> Result<Value, UpbitError> {
        validate_non_empty("deposit_uuid", deposit_uuid)?;
        validate_non_empty("vasp_name", vasp_name)?;
        validate_non_empty("vasp_address", vasp_address)?;
        Ok(self
            .rest
            .verify_travel_rule_by_uuid(deposit_uuid, vasp_name, vasp_address)
            .await?
            .into_data())
    }
}
