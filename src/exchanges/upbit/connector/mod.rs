pub mod account;
pub mod market_data;
pub mod trading;
pub mod wallet;

pub use account::Account;
pub use market_data::{CandleQuery, MarketData};
pub use trading::Trading;
pub use wallet::{Wallet, WithdrawCoin};

use crate::core::kernel::RestClient;
use crate::exchanges::upbit::rest::UpbitRest;

/// Upbit connector composing the four operation groups
///
/// Each group holds its own clone of the REST layer, so they can be used
/// independently and concurrently.
pub struct UpbitConnector<R: RestClient> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    pub account: Account<R>,
    pub wallet: Wallet<R>,
}

impl<R: RestClient + Clone> UpbitConnector<R> {
    pub fn new_with_rest(rest: UpbitRest<R>) -> Self {
        Self {
            market: MarketData::new(&rest),
            trading: Trading::new(&rest),
            account: Account::new(&rest),
            wallet: Wallet::new(&rest),
        }
    }

    /// Connector over `client` against `base_url`, signing private calls when
    /// a signer is given.
    pub fn new(
        client: R,
        base_url: impl Into<String>,
        signer: Option<std::sync::Arc<dyn crate::core::kernel::Signer>>,
    ) -> Self {
        Self::new_with_rest(UpbitRest::new(client, base_url.into(), signer))
    }
}
