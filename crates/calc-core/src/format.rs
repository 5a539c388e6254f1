//! Display formatting for calculation results.

use crate::number::Number;

/// Magnitude at or above which results switch to scientific notation.
const LARGE: f64 = 1e10;
/// Non-zero magnitude below which results switch to scientific notation.
const SMALL: f64 = 1e-6;

/// Render a result the way the `formatted_result` field shows it.
///
/// - magnitude ≥ 1e10, or non-zero and < 1e-6: scientific, 6 fractional
///   digits, signed two-digit exponent (`1.000000e+12`)
/// - whole numbers: integer literal (`4`, not `4.0`)
/// - otherwise: up to 10 fractional digits with trailing zeros trimmed
#[allow(clippy::cast_possible_truncation)]
pub fn format_result(value: Number) -> String {
    let x = value.as_f64();
    if !x.is_finite() {
        return value.to_string();
    }

    let magnitude = x.abs();
    if magnitude >= LARGE || (magnitude != 0.0 && magnitude < SMALL) {
        return scientific(x);
    }

    match value {
        Number::Int(i) => i.to_string(),
        Number::Float(f) if f.fract() == 0.0 => (f as i64).to_string(),
        Number::Float(f) => {
            let fixed = format!("{f:.10}");
            fixed.trim_end_matches('0').trim_end_matches('.').to_string()
        }
    }
}

/// `{:.6e}` with a sign and at least two exponent digits.
fn scientific(x: f64) -> String {
    let raw = format!("{x:.6e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw,
    }
}
