use crate::core::errors::UpbitError;
use rust_decimal::Decimal;

/// Check a `QUOTE-BASE` instrument code such as `KRW-BTC`.
pub fn validate_market(field: &str, market: &str) -> Result<(), UpbitError> {
    if market.is_empty() {
        return Err(UpbitError::validation(field, "market code must not be empty"));
    }
    let valid = market.split_once('-').is_some_and(|(quote, base)| {
        is_code_part(quote) && is_code_part(base)
    });
    if valid {
        Ok(())
    } else {
        Err(UpbitError::validation(
            field,
            format!("market code must look like QUOTE-BASE: {}", market),
        ))
    }
}

fn is_code_part(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn validate_currency(field: &str, currency: &str) -> Result<(), UpbitError> {
    if currency.trim().is_empty() {
        return Err(UpbitError::validation(field, "currency must not be empty"));
    }
    Ok(())
}

pub fn validate_non_empty(field: &str, value: &str) -> Result<(), UpbitError> {
    if value.trim().is_empty() {
        return Err(UpbitError::validation(field, format!("{} must not be empty", field)));
    }
    Ok(())
}

pub fn validate_positive(field: &str, value: Decimal) -> Result<(), UpbitError> {
    if value <= Decimal::ZERO {
        return Err(UpbitError::validation(
            field,
            format!("{} must be positive, got {}", field, value),
        ));
    }
    Ok(())
}

pub fn validate_range(field: &str, value: u32, min: u32, max: u32) -> Result<(), UpbitError> {
    if !(min..=max).contains(&value) {
        return Err(UpbitError::validation(
            field,
            format!("{} must be within {}..={}, got {}", field, min, max, value),
        ));
    }
    Ok(())
}

/// Order ids are five hyphen-separated word groups.
pub fn is_order_uuid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .all(|g| !g.is_empty() && g.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Split `KRW-BTC` into `("KRW", "BTC")`; a bare currency gets the KRW quote.
pub fn split_ticker(ticker: &str) -> (&str, &str) {
    ticker.split_once('-').unwrap_or(("KRW", ticker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_codes() {
        assert!(validate_market("market", "KRW-BTC").is_ok());
        assert!(validate_market("market", "USDT-1INCH").is_ok());
        for bad in ["", "KRWBTC", "KRW-", "-BTC", "KRW-BTC-ETH", "KRW BTC"] {
            assert!(validate_market("market", bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_order_uuid_detection() {
        assert!(is_order_uuid("9ca023a5-851b-4fec-9f0a-48cd83c2eaae"));
        assert!(!is_order_uuid("KRW-BTC"));
    }

    #[test]
    fn test_split_ticker() {
        assert_eq!(split_ticker("KRW-ETH"), ("KRW", "ETH"));
        assert_eq!(split_ticker("BTC"), ("KRW", "BTC"));
    }

    #[test]
    fn test_range() {
        assert!(validate_range("limit", 100, 1, 100).is_ok());
        assert!(validate_range("limit", 0, 1, 100).is_err());
        assert!(validate_range("limit", 101, 1, 100).is_err());
    }
}
