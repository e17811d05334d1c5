//! Raw feed tuple normalization
//!
//! Converts `(mantissa, rawTimestamp, scale)` into an [`OracleReading`].
//! A tuple either normalizes completely or fails; no partial readings.

use alloy_primitives::U256;

use crate::{FeedError, FeedResult, FeedSpec, OracleReading, RawFeedTuple, Scale, TimestampUnit};

/// Normalize the raw tuple read for `spec`
pub fn normalize_feed(spec: &FeedSpec, raw: &RawFeedTuple) -> FeedResult<OracleReading> {
    normalize(&spec.name(), raw, spec.source.timestamp_unit())
}

/// Normalize a raw tuple whose timestamp is expressed in `unit`
pub fn normalize(name: &str, raw: &RawFeedTuple, unit: TimestampUnit) -> FeedResult<OracleReading> {
    let raw_price = raw.mantissa.to_string();
    let mantissa: f64 = raw_price
        .parse()
        .map_err(|e| FeedError::unavailable(name, format!("mantissa {raw_price}: {e}")))?;

    let decimals = match raw.scale {
        Scale::Decimals(decimals) => decimals,
        Scale::Exponent(exponent) => u8::try_from(exponent.unsigned_abs())
            .map_err(|_| FeedError::unavailable(name, format!("exponent {exponent} out of range")))?,
    };

    let price = scale_mantissa(mantissa, raw.scale);
    if !price.is_finite() {
        return Err(FeedError::unavailable(name, format!("price {raw_price} not finite")));
    }

    let updated_at = timestamp_secs(raw.raw_timestamp, unit).ok_or_else(|| {
        FeedError::unavailable(name, format!("timestamp {} out of range", raw.raw_timestamp))
    })?;

    Ok(OracleReading {
        name: name.to_string(),
        price,
        updated_at,
        decimals,
        raw_price,
        unsupported: false,
    })
}

/// Apply a scale to a mantissa.
///
/// Negative exponents divide by the positive power of ten, which keeps
/// values like `314917e-5` at the nearest double.
pub fn scale_mantissa(mantissa: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Decimals(decimals) => mantissa / 10f64.powi(decimals as i32),
        Scale::Exponent(exponent) if exponent < 0 => {
            mantissa / 10f64.powi(exponent.saturating_neg())
        }
        Scale::Exponent(exponent) => mantissa * 10f64.powi(exponent),
    }
}

/// Floor a raw timestamp to whole unix seconds
pub fn timestamp_secs(raw: U256, unit: TimestampUnit) -> Option<i64> {
    let secs = raw / U256::from(unit.per_second());
    if secs > U256::from(i64::MAX as u64) {
        return None;
    }
    Some(secs.as_limbs()[0] as i64)
}

/// Narrow a `uint256` decimals field to `u8`
pub fn decimals_from_u256(value: U256) -> Option<u8> {
    if value > U256::from(u8::MAX) {
        return None;
    }
    Some(value.as_limbs()[0] as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::I256;
    use proptest::prelude::*;

    fn tuple(mantissa: i64, ts: u64, scale: Scale) -> RawFeedTuple {
        RawFeedTuple::new(I256::try_from(mantissa).unwrap(), U256::from(ts), scale)
    }

    #[test]
    fn test_linear_decimals() {
        let reading = normalize(
            "Chainlink",
            &tuple(250_000_000_000, 1_000, Scale::Decimals(8)),
            TimestampUnit::Seconds,
        )
        .unwrap();

        assert_eq!(reading.price, 2500.0);
        assert_eq!(reading.decimals, 8);
        assert_eq!(reading.raw_price, "250000000000");
        assert_eq!(reading.updated_at, 1_000);
        assert!(!reading.unsupported);
    }

    #[test]
    fn test_exponent_scale() {
        let reading = normalize(
            "Pyth (MON)",
            &tuple(314_917, 1_000, Scale::Exponent(-5)),
            TimestampUnit::Seconds,
        )
        .unwrap();

        assert!((reading.price - 3.14917).abs() < 1e-12);
        assert_eq!(reading.decimals, 5);
        assert_eq!(reading.raw_price, "314917");
    }

    #[test]
    fn test_nanosecond_timestamp() {
        let raw = RawFeedTuple::new(
            I256::try_from(1i64).unwrap(),
            U256::from(1_700_000_000_123_456_789u64),
            Scale::Decimals(18),
        );
        let reading = normalize("Stork", &raw, TimestampUnit::Nanoseconds).unwrap();
        assert_eq!(reading.updated_at, 1_700_000_000);
    }

    #[test]
    fn test_millisecond_timestamp() {
        let reading = normalize(
            "Supra",
            &tuple(1, 1_700_000_000_999, Scale::Decimals(8)),
            TimestampUnit::Milliseconds,
        )
        .unwrap();
        assert_eq!(reading.updated_at, 1_700_000_000);
    }

    #[test]
    fn test_wide_mantissa_is_kept_exactly() {
        // 18-decimal value beyond f64 integer precision
        let mantissa: I256 = "97123456789012345678901".parse().unwrap();
        let raw = RawFeedTuple::new(mantissa, U256::from(5u64), Scale::Decimals(18));
        let reading = normalize("Chronicle", &raw, TimestampUnit::Seconds).unwrap();

        assert_eq!(reading.raw_price, "97123456789012345678901");
        assert!((reading.price - 97_123.456_789_012_35).abs() < 1e-6);
    }

    #[test]
    fn test_negative_mantissa() {
        let reading = normalize("x", &tuple(-150, 1, Scale::Decimals(2)), TimestampUnit::Seconds).unwrap();
        assert_eq!(reading.price, -1.5);
        assert_eq!(reading.raw_price, "-150");
    }

    #[test]
    fn test_timestamp_overflow_fails() {
        let raw = RawFeedTuple::new(I256::ZERO, U256::MAX, Scale::Decimals(8));
        let err = normalize("Chainlink", &raw, TimestampUnit::Seconds).unwrap_err();
        assert_eq!(err.feed(), "Chainlink");
    }

    #[test]
    fn test_exponent_out_of_range_fails() {
        assert!(normalize("Pyth", &tuple(1, 1, Scale::Exponent(-300)), TimestampUnit::Seconds).is_err());
    }

    #[test]
    fn test_decimals_from_u256() {
        assert_eq!(decimals_from_u256(U256::from(18u64)), Some(18));
        assert_eq!(decimals_from_u256(U256::from(256u64)), None);
    }

    proptest! {
        #[test]
        fn prop_price_reconstructs_from_raw(mantissa in 1i64..i64::MAX, decimals in 0u8..=18) {
            let reading = normalize(
                "feed",
                &tuple(mantissa, 1, Scale::Decimals(decimals)),
                TimestampUnit::Seconds,
            ).unwrap();

            let exact: f64 = format!("{}e-{}", reading.raw_price, reading.decimals).parse().unwrap();
            prop_assert!(((reading.price - exact) / exact).abs() < 1e-9);
        }

        #[test]
        fn prop_exponent_reconstructs_from_raw(mantissa in 1i64..i64::MAX, exponent in -18i32..=0) {
            let reading = normalize(
                "feed",
                &tuple(mantissa, 1, Scale::Exponent(exponent)),
                TimestampUnit::Seconds,
            ).unwrap();

            prop_assert_eq!(reading.decimals as i32, exponent.abs());
            let exact: f64 = format!("{}e{}", reading.raw_price, exponent).parse().unwrap();
            prop_assert!(((reading.price - exact) / exact).abs() < 1e-9);
        }

        #[test]
        fn prop_nanoseconds_floor(ts in 0u64..u64::MAX) {
            let secs = timestamp_secs(U256::from(ts), TimestampUnit::Nanoseconds).unwrap();
            prop_assert_eq!(secs as u64, ts / 1_000_000_000);
        }
    }
}
