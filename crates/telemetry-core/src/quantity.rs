//! Kubernetes quantity normalization
//!
//! Parses the textual Kubernetes quantity format ("1.5", "25m", "1Ki",
//! "746640510n", "1e3") into canonical integers: nanocores for CPU, bytes
//! for everything else. All entry points are total functions; malformed
//! input yields 0, never an error. The mantissa is carried through i128
//! arithmetic so truncation is exact, with no float rounding on the integer
//! paths.

use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as RawQuantity;
use telemetry_types::Quantity;
use telemetry_types::Resource;

/// Stated base of a pre-split quantity suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixFormat {
    /// Ki/Mi/Gi/..., powers of 1024.
    BinarySi,
    /// k/M/G/..., powers of 1000.
    DecimalSi,
}

const NANOS_PER_CORE: i128 = 1_000_000_000;

/// CPU quantity in nanocores.
///
/// Bare decimals are cores ("1.5" -> 1_500_000_000), "m" is millicores,
/// "n" is nanocores with any fractional nanocore truncated
/// ("111.2n" -> 111). Empty or malformed input yields 0.
pub fn cpu_nano(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    let (number, suffix) = split_suffix(raw);
    let Some((num, den)) = suffix_factor(suffix) else {
        return 0;
    };
    scaled(number, num.saturating_mul(NANOS_PER_CORE), den).unwrap_or(0)
}

/// CPU quantity as fractional cores, for display ("250000000n" -> 0.25).
pub fn cpu_cores(raw: &str) -> f64 {
    cpu_nano(raw) as f64 / NANOS_PER_CORE as f64
}

/// Memory (or storage/count) quantity in bytes.
///
/// Bare integers are bytes, k/M/G/T/P/E scale by powers of 1000,
/// Ki/Mi/Gi/Ti/Pi/Ei by powers of 1024. A milli suffix on a byte quantity
/// truncates the fractional byte ("1123m" -> 1). Empty or malformed input
/// yields 0.
pub fn memory_byte(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    let (number, suffix) = split_suffix(raw);
    let Some((num, den)) = suffix_factor(suffix) else {
        return 0;
    };
    scaled(number, num, den).unwrap_or(0)
}

/// CPU overload for the structured quantity type.
pub fn cpu_nano_quantity(quantity: &RawQuantity) -> i64 {
    cpu_nano(&quantity.0)
}

/// Memory overload for the structured quantity type.
pub fn memory_byte_quantity(quantity: &RawQuantity) -> i64 {
    memory_byte(&quantity.0)
}

/// Convert a pre-split quantity (value plus suffix exponent) to bytes per
/// its stated base: 1024^exponent for binary SI, 1000^exponent for decimal
/// SI. Saturates instead of overflowing.
pub fn memory_byte_scaled(value: i64, exponent: u32, format: SuffixFormat) -> i64 {
    let base: i128 = match format {
        SuffixFormat::BinarySi => 1024,
        SuffixFormat::DecimalSi => 1000,
    };
    let scaled = (value as i128).saturating_mul(base.saturating_pow(exponent));
    scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Normalize a container's requests/limits: the "cpu" key becomes a
/// nanocore quantity, every other key a byte/count quantity.
pub fn resource_from_requirements(requirements: &ResourceRequirements) -> Resource {
    let mut resource = Resource::default();
    if let Some(requests) = &requirements.requests {
        for (key, value) in requests {
            resource
                .requests
                .insert(key.clone(), normalize_keyed(key, value));
        }
    }
    if let Some(limits) = &requirements.limits {
        for (key, value) in limits {
            resource
                .limits
                .insert(key.clone(), normalize_keyed(key, value));
        }
    }
    resource
}

/// Normalize a whole resource map (e.g. node allocatable/capacity) the same
/// way: "cpu" to nanocores, everything else to bytes/count.
pub fn normalize_resource_map(
    map: &std::collections::BTreeMap<String, RawQuantity>,
) -> std::collections::BTreeMap<String, Quantity> {
    map.iter()
        .map(|(key, value)| (key.clone(), normalize_keyed(key, value)))
        .collect()
}

fn normalize_keyed(key: &str, value: &RawQuantity) -> Quantity {
    if key == "cpu" {
        Quantity::nano(cpu_nano(&value.0))
    } else {
        Quantity::bytes(memory_byte(&value.0))
    }
}

/// Split at the first character that cannot belong to the numeric part.
fn split_suffix(raw: &str) -> (&str, &str) {
    let pos = raw
        .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-' && c != '+')
        .unwrap_or(raw.len());
    raw.split_at(pos)
}

/// Multiplier (numerator, denominator) for a quantity suffix, relative to
/// the base unit. `None` for unrecognized suffixes.
fn suffix_factor(suffix: &str) -> Option<(i128, i128)> {
    Some(match suffix {
        "" => (1, 1),
        // scale-down prefixes
        "m" => (1, 1_000),
        "u" => (1, 1_000_000),
        "n" => (1, NANOS_PER_CORE),
        // decimal SI
        "k" => (1_000, 1),
        "M" => (1_000_000, 1),
        "G" => (1_000_000_000, 1),
        "T" => (1_000_000_000_000, 1),
        "P" => (1_000_000_000_000_000, 1),
        "E" => (1_000_000_000_000_000_000, 1),
        // binary SI
        "Ki" => (1 << 10, 1),
        "Mi" => (1 << 20, 1),
        "Gi" => (1 << 30, 1),
        "Ti" => (1 << 40, 1),
        "Pi" => (1 << 50, 1),
        "Ei" => (1 << 60, 1),
        // decimal exponent ("12e3", "3E2")
        _ => {
            let exp = suffix.strip_prefix(['e', 'E'])?;
            let exp: i32 = exp.parse().ok()?;
            if exp >= 0 {
                (10_i128.checked_pow(exp as u32)?, 1)
            } else {
                (1, 10_i128.checked_pow(exp.unsigned_abs())?)
            }
        }
    })
}

/// Exact `number * num / den`, truncated toward zero.
///
/// `number` is a plain decimal ("12", "1.5", ".1", "-2"); anything else is
/// `None`, as is overflow.
fn scaled(number: &str, num: i128, den: i128) -> Option<i64> {
    let (negative, digits) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    // Mantissa as one integer with frac_part.len() implied decimal places.
    let mut mantissa: i128 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(i128::from(b - b'0'))?;
    }
    let frac_scale = 10_i128.checked_pow(u32::try_from(frac_part.len()).ok()?)?;

    let value = mantissa
        .checked_mul(num)?
        .checked_div(den.checked_mul(frac_scale)?)?;
    let value = if negative { -value } else { value };
    i64::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_bare_decimals_are_cores() {
        assert_eq!(cpu_nano("1"), 1_000_000_000);
        assert_eq!(cpu_nano("1.5"), 1_500_000_000);
        assert_eq!(cpu_nano("0.1"), 100_000_000);
        assert_eq!(cpu_nano(".1"), 100_000_000);
    }

    #[test]
    fn cpu_milli_and_nano_suffixes() {
        assert_eq!(cpu_nano("25m"), 25_000_000);
        assert_eq!(cpu_nano("746640510n"), 746_640_510);
        // fractional nanocores truncate
        assert_eq!(cpu_nano("111.2n"), 111);
        assert_eq!(cpu_nano("111.9n"), 111);
    }

    #[test]
    fn cpu_empty_and_malformed_yield_zero() {
        assert_eq!(cpu_nano(""), 0);
        assert_eq!(cpu_nano("   "), 0);
        assert_eq!(cpu_nano("abc"), 0);
        assert_eq!(cpu_nano("1.2.3"), 0);
        assert_eq!(cpu_nano("5x"), 0);
        assert_eq!(cpu_nano("."), 0);
    }

    #[test]
    fn cpu_cores_for_display() {
        assert_eq!(cpu_cores("250000000n"), 0.25);
        assert_eq!(cpu_cores("1.5"), 1.5);
        assert_eq!(cpu_cores("100m"), 0.1);
        assert_eq!(cpu_cores(""), 0.0);
    }

    #[test]
    fn memory_bare_and_decimal_si() {
        assert_eq!(memory_byte("128"), 128);
        assert_eq!(memory_byte("1k"), 1_000);
        assert_eq!(memory_byte("1M"), 1_000_000);
        assert_eq!(memory_byte("2G"), 2_000_000_000);
        assert_eq!(memory_byte("1T"), 1_000_000_000_000);
        assert_eq!(memory_byte("1P"), 1_000_000_000_000_000);
    }

    #[test]
    fn memory_binary_si() {
        assert_eq!(memory_byte("1Ki"), 1024);
        assert_eq!(memory_byte("1Mi"), 1 << 20);
        assert_eq!(memory_byte("1.5Gi"), 3 << 29);
        assert_eq!(memory_byte("4Ti"), 4_i64 << 40);
    }

    #[test]
    fn memory_milli_truncates_fractional_bytes() {
        assert_eq!(memory_byte("1123m"), 1);
        assert_eq!(memory_byte("999m"), 0);
    }

    #[test]
    fn memory_empty_and_malformed_yield_zero() {
        assert_eq!(memory_byte(""), 0);
        assert_eq!(memory_byte("Ki"), 0);
        assert_eq!(memory_byte("1Qi"), 0);
        assert_eq!(memory_byte("--1"), 0);
    }

    #[test]
    fn non_ascii_suffixes_yield_zero() {
        // must not panic splitting inside a multi-byte character
        assert_eq!(cpu_nano("1µ"), 0);
        assert_eq!(memory_byte("1µ"), 0);
        assert_eq!(memory_byte("2µi"), 0);
    }

    #[test]
    fn decimal_exponent_form() {
        assert_eq!(memory_byte("12e3"), 12_000);
        assert_eq!(memory_byte("3E2"), 300);
        assert_eq!(memory_byte("5e-1"), 0);
        assert_eq!(cpu_nano("1e0"), 1_000_000_000);
    }

    #[test]
    fn structured_overloads() {
        assert_eq!(cpu_nano_quantity(&RawQuantity("250m".to_string())), 250_000_000);
        assert_eq!(memory_byte_quantity(&RawQuantity("9Ki".to_string())), 9216);
    }

    #[test]
    fn pre_split_scaling_per_stated_format() {
        assert_eq!(memory_byte_scaled(1, 1, SuffixFormat::BinarySi), 1024);
        assert_eq!(memory_byte_scaled(1, 1, SuffixFormat::DecimalSi), 1000);
        assert_eq!(memory_byte_scaled(3, 2, SuffixFormat::BinarySi), 3 * 1024 * 1024);
        assert_eq!(memory_byte_scaled(i64::MAX, 2, SuffixFormat::DecimalSi), i64::MAX);
    }

    #[test]
    fn huge_mantissas_do_not_wrap() {
        // larger than i64 once scaled
        assert_eq!(cpu_nano("99999999999999999999"), 0);
        assert_eq!(memory_byte("8Ei"), 0); // 2^63, one past i64::MAX
        assert_eq!(memory_byte("7Ei"), 7_i64 << 60);
    }

    #[test]
    fn requirements_normalization() {
        use std::collections::BTreeMap;

        let mut requests = BTreeMap::new();
        requests.insert("cpu".to_string(), RawQuantity("250m".to_string()));
        requests.insert("memory".to_string(), RawQuantity("1Gi".to_string()));
        let mut limits = BTreeMap::new();
        limits.insert("cpu".to_string(), RawQuantity("1".to_string()));

        let requirements = ResourceRequirements {
            requests: Some(requests),
            limits: Some(limits),
            ..Default::default()
        };
        let resource = resource_from_requirements(&requirements);

        assert_eq!(resource.requests["cpu"], Quantity::nano(250_000_000));
        assert_eq!(resource.requests["memory"], Quantity::bytes(1 << 30));
        assert_eq!(resource.limits["cpu"], Quantity::nano(1_000_000_000));
    }
}
