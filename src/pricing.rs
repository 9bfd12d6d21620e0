//! Quote calculation: nights stayed and total price, pure and side-effect
//! free. Prices are integer minor currency units.

use chrono::NaiveDate;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub nights: i64,
    pub total: i64,
}

/// Number of nights in the half-open range `[start, end)`. A zero-night or
/// inverted range is invalid.
pub fn nights(start: NaiveDate, end: NaiveDate) -> Result<i64> {
    let nights = (end - start).num_days();
    if nights <= 0 {
        return Err(Error::InvalidDateRange { start, end });
    }
    Ok(nights)
}

/// Total price for the stay: exactly `nights * price_per_night`.
pub fn quote(start: NaiveDate, end: NaiveDate, price_per_night: i64) -> Result<Quote> {
    let nights = nights(start, end)?;
    Ok(Quote {
        nights,
        total: nights * price_per_night,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, d).unwrap()
    }

    #[test_case(1, 2, 1; "one night")]
    #[test_case(1, 3, 2; "two nights")]
    #[test_case(5, 19, 14; "two weeks")]
    fn counts_nights(start: u32, end: u32, expected: i64) {
        assert_eq!(nights(day(start), day(end)).unwrap(), expected);
    }

    #[test_case(3, 3; "zero nights")]
    #[test_case(4, 2; "inverted range")]
    fn rejects_non_positive_ranges(start: u32, end: u32) {
        let err = nights(day(start), day(end)).unwrap_err();
        assert!(matches!(err, Error::InvalidDateRange { .. }));
    }

    #[test_case(1, 3, 120_000, 240_000; "two nights at premium rate")]
    #[test_case(1, 2, 12_000, 12_000; "single night")]
    #[test_case(1, 11, 9_999, 99_990; "ten nights odd price")]
    fn total_is_exact_product(start: u32, end: u32, rate: i64, expected: i64) {
        let q = quote(day(start), day(end), rate).unwrap();
        assert_eq!(q.total, expected);
        assert_eq!(q.total, q.nights * rate);
    }

    #[test]
    fn quote_propagates_invalid_range() {
        assert!(matches!(
            quote(day(2), day(2), 12_000),
            Err(Error::InvalidDateRange { .. })
        ));
    }
}
