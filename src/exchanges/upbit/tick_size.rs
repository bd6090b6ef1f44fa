use crate::core::errors::UpbitError;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMethod {
    #[default]
    Floor,
    /// Round half to even
    Round,
    Ceil,
}

impl FromStr for RoundingMethod {
    type Err = UpbitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "floor" => Ok(Self::Floor),
            "round" => Ok(Self::Round),
            "ceil" => Ok(Self::Ceil),
            other => Err(UpbitError::validation(
                "method",
                format!("unknown rounding method: {}", other),
            )),
        }
    }
}

/// KRW market price unit for `price`.
pub fn price_unit(price: Decimal) -> Decimal {
    // (lower bound, unit), checked top-down
    const TABLE: [(i64, u32, i64, u32); 13] = [
        (2_000_000, 0, 1000, 0),
        (1_000_000, 0, 500, 0),
        (500_000, 0, 100, 0),
        (100_000, 0, 50, 0),
        (10_000, 0, 10, 0),
        (1_000, 0, 1, 0),
        (100, 0, 1, 1),
        (10, 0, 1, 2),
        (1, 0, 1, 3),
        (1, 1, 1, 4),
        (1, 2, 1, 5),
        (1, 3, 1, 6),
        (1, 4, 1, 7),
    ];

    TABLE
        .iter()
        .find(|(bound, bound_scale, _, _)| price >= Decimal::new(*bound, *bound_scale))
        .map_or_else(
            || Decimal::new(1, 8),
            |(_, _, unit, unit_scale)| Decimal::new(*unit, *unit_scale),
        )
}

/// Snap `price` onto the KRW price-unit grid.
pub fn adjust_price(price: Decimal, method: RoundingMethod) -> Decimal {
    let unit = price_unit(price);
    let steps = price / unit;
    let steps = match method {
        RoundingMethod::Floor => steps.floor(),
        RoundingMethod::Round => steps.round(),
        RoundingMethod::Ceil => steps.ceil(),
    };
    (steps * unit).normalize()
}
