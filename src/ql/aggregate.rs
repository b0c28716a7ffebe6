//! Aggregate functions used by the `-g` command

use std::cmp::Ordering;

use crate::core::errors::{Result, StoreError};
use crate::core::schema::{format_duration, parse_decimal, parse_duration, FieldDef, FieldKind};
use crate::ql::ast::Aggregate;

/// Fold the values one field takes across a group into a single value
///
/// Empty values are ignored by every aggregate except `Count`, which
/// counts rows.
pub fn fold(aggregate: Aggregate, field: &FieldDef, values: &[&str]) -> Result<String> {
    let present: Vec<&str> = values.iter().copied().filter(|v| !v.is_empty()).collect();

    match aggregate {
        Aggregate::Count => Ok(values.len().to_string()),
        Aggregate::Collect => Ok(format!("[{}]", present.join(","))),
        Aggregate::Sum => sum(field, &present),
        Aggregate::Min => extremum(field, &present, Ordering::Less),
        Aggregate::Max => extremum(field, &present, Ordering::Greater),
    }
}

fn sum(field: &FieldDef, values: &[&str]) -> Result<String> {
    if values.is_empty() {
        return Ok(String::new());
    }

    match field.kind {
        FieldKind::Decimal => {
            let mut total: i128 = 0;
            let mut scale = 0;
            for value in values {
                let (units, digits) = parse_fixed(value).ok_or_else(|| not_numeric(field, value))?;
                if digits > scale {
                    total = rescale(total, digits - scale).ok_or_else(|| overflow(field))?;
                    scale = digits;
                }
                let units = rescale(units, scale - digits).ok_or_else(|| overflow(field))?;
                total = total.checked_add(units).ok_or_else(|| overflow(field))?;
            }
            Ok(format_fixed(total, scale))
        },
        FieldKind::Duration => {
            let mut minutes: u64 = 0;
            for value in values {
                let value = parse_duration(value).ok_or_else(|| not_numeric(field, value))?;
                minutes = minutes.checked_add(value).ok_or_else(|| overflow(field))?;
            }
            Ok(format_duration(minutes))
        },
        FieldKind::Text | FieldKind::Date => Err(StoreError::InvalidGroupSpec(format!(
            "cannot sum {:?} field {}",
            field.kind, field.name
        ))),
    }
}

/// Parse a decimal into integer units of its last fractional digit
fn parse_fixed(value: &str) -> Option<(i128, u32)> {
    parse_decimal(value)?;

    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let mut units: i128 = 0;
    for b in whole.bytes().chain(fraction.bytes()) {
        units = units.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }

    let scale = u32::try_from(fraction.len()).ok()?;
    Some((if negative { -units } else { units }, scale))
}

fn rescale(units: i128, extra_digits: u32) -> Option<i128> {
    units.checked_mul(10i128.checked_pow(extra_digits)?)
}

fn format_fixed(units: i128, scale: u32) -> String {
    let sign = if units < 0 { "-" } else { "" };
    let magnitude = units.unsigned_abs();
    if scale == 0 {
        return format!("{}{}", sign, magnitude);
    }

    // rescale succeeded for this scale, so the power fits
    let divisor = 10u128.pow(scale);
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / divisor,
        magnitude % divisor,
        width = scale as usize
    )
}

fn overflow(field: &FieldDef) -> StoreError {
    StoreError::invalid_value(&field.name, "sum is out of range")
}

fn extremum(field: &FieldDef, values: &[&str], wanted: Ordering) -> Result<String> {
    let mut best: Option<&str> = None;
    for &value in values {
        best = match best {
            Some(current) if compare(field, value, current)? != wanted => Some(current),
            _ => Some(value),
        };
    }
    Ok(best.unwrap_or_default().to_string())
}

/// Compare two values of a field according to its kind
fn compare(field: &FieldDef, a: &str, b: &str) -> Result<Ordering> {
    match field.kind {
        FieldKind::Decimal => {
            let (a, _) = parse_decimal(a).ok_or_else(|| not_numeric(field, a))?;
            let (b, _) = parse_decimal(b).ok_or_else(|| not_numeric(field, b))?;
            Ok(a.total_cmp(&b))
        },
        FieldKind::Duration => {
            let a = parse_duration(a).ok_or_else(|| not_numeric(field, a))?;
            let b = parse_duration(b).ok_or_else(|| not_numeric(field, b))?;
            Ok(a.cmp(&b))
        },
        FieldKind::Text | FieldKind::Date => Ok(a.cmp(b)),
    }
}

fn not_numeric(field: &FieldDef, value: &str) -> StoreError {
    StoreError::invalid_value(&field.name, format!("'{}' is not a valid {:?} value", value, field.kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev() -> FieldDef {
        FieldDef::new("rev", FieldKind::Decimal)
    }

    #[test]
    fn test_sum() {
        assert_eq!(fold(Aggregate::Sum, &rev(), &["1.00", "2.00"]).unwrap(), "3.00");
        assert_eq!(fold(Aggregate::Sum, &rev(), &["1.5", "2.25", ""]).unwrap(), "3.75");
        assert_eq!(fold(Aggregate::Sum, &rev(), &["0.1", "0.2"]).unwrap(), "0.3");

        assert_eq!(fold(Aggregate::Sum, &rev(), &["-1.50", "0.25"]).unwrap(), "-1.25");
        assert_eq!(fold(Aggregate::Sum, &rev(), &["3", "4"]).unwrap(), "7");

        let viewtime = FieldDef::new("viewtime", FieldKind::Duration);
        assert_eq!(fold(Aggregate::Sum, &viewtime, &["1:45", "0:30"]).unwrap(), "2:15");

        assert!(matches!(
            fold(Aggregate::Sum, &rev(), &["1.00", "free"]),
            Err(StoreError::InvalidFieldValue { .. })
        ));
        assert!(matches!(
            fold(Aggregate::Sum, &FieldDef::new("title", FieldKind::Text), &["a"]),
            Err(StoreError::InvalidGroupSpec(_))
        ));
    }

    #[test]
    fn test_decimal_sum_is_exact() {
        // 2^53 + 1 cents is not representable as an f64
        assert_eq!(
            fold(Aggregate::Sum, &rev(), &["90071992547409.92", "0.01"]).unwrap(),
            "90071992547409.93"
        );
        assert_eq!(fold(Aggregate::Sum, &rev(), &["0.10", "0.20", "0.30"]).unwrap(), "0.60");
    }

    #[test]
    fn test_sum_overflow_is_an_invalid_value() {
        let viewtime = FieldDef::new("viewtime", FieldKind::Duration);
        let large = "307445734561825860:00";
        assert!(matches!(
            fold(Aggregate::Sum, &viewtime, &[large, large]),
            Err(StoreError::InvalidFieldValue { .. })
        ));

        let huge = "99999999999999999999999999999999999999";
        assert!(matches!(
            fold(Aggregate::Sum, &rev(), &[huge, huge, huge, huge, huge]),
            Err(StoreError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn test_min_max_follow_field_kind() {
        // Numerically 10.00 is largest, lexicographically 9.00 is
        assert_eq!(fold(Aggregate::Max, &rev(), &["9.00", "10.00", "2.00"]).unwrap(), "10.00");
        assert_eq!(fold(Aggregate::Min, &rev(), &["9.00", "10.00", "2.00"]).unwrap(), "2.00");

        let title = FieldDef::new("title", FieldKind::Text);
        assert_eq!(fold(Aggregate::Max, &title, &["9.00", "10.00"]).unwrap(), "9.00");

        let viewtime = FieldDef::new("viewtime", FieldKind::Duration);
        assert_eq!(fold(Aggregate::Max, &viewtime, &["9:00", "10:00"]).unwrap(), "10:00");
        assert_eq!(fold(Aggregate::Min, &viewtime, &[]).unwrap(), "");
    }

    #[test]
    fn test_count_and_collect() {
        let stb = FieldDef::new("stb", FieldKind::Text);

        assert_eq!(fold(Aggregate::Count, &stb, &["a", "b", ""]).unwrap(), "3");
        assert_eq!(fold(Aggregate::Collect, &stb, &["b", "a", "", "b"]).unwrap(), "[b,a,b]");
    }
}
