//! The fixed builtin table: the only names an expression can reach.

use std::f64::consts;

use super::errors::EvalError;
use crate::number::Number;

/// Callable builtin names.
pub const FUNCTIONS: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "log", "ln", "log10",
    "log2", "sqrt", "exp", "pow", "abs", "floor", "ceil", "round", "factorial", "degrees",
    "radians", "gcd", "lcm",
];

/// Constant builtin names.
pub const CONSTANTS: &[&str] = &["pi", "e"];

/// Value of a named constant.
pub fn constant(name: &str) -> Option<Number> {
    match name {
        "pi" => Some(Number::Float(consts::PI)),
        "e" => Some(Number::Float(consts::E)),
        _ => None,
    }
}

/// Invoke a builtin function by name.
pub fn call(name: &str, args: &[Number]) -> Result<Number, EvalError> {
    match name {
        "sin" => real(name, args, f64::sin),
        "cos" => real(name, args, f64::cos),
        "tan" => real(name, args, f64::tan),
        "asin" => real(name, args, |x| guard(x, (-1.0..=1.0).contains(&x), f64::asin)),
        "acos" => real(name, args, |x| guard(x, (-1.0..=1.0).contains(&x), f64::acos)),
        "atan" => real(name, args, f64::atan),
        "sinh" => real(name, args, f64::sinh),
        "cosh" => real(name, args, f64::cosh),
        "tanh" => real(name, args, f64::tanh),
        "log" | "log10" => real(name, args, |x| guard(x, x > 0.0, f64::log10)),
        "ln" => real(name, args, |x| guard(x, x > 0.0, f64::ln)),
        "log2" => real(name, args, |x| guard(x, x > 0.0, f64::log2)),
        "sqrt" => real(name, args, |x| guard(x, x >= 0.0, f64::sqrt)),
        "exp" => real(name, args, f64::exp),
        "degrees" => real(name, args, f64::to_degrees),
        "radians" => real(name, args, f64::to_radians),
        "pow" => {
            let [base, exp] = exactly::<2>(name, args)?;
            base.checked_pow(exp)
        }
        "abs" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(x.abs())
        }
        "floor" => rounding(name, args, f64::floor),
        "ceil" => rounding(name, args, f64::ceil),
        "round" => round(args),
        "factorial" => {
            let [x] = exactly::<1>(name, args)?;
            factorial(integer(x)?)
        }
        "gcd" => gcd_all(args),
        "lcm" => lcm_all(args),
        _ => Err(unknown(name)),
    }
}

/// Error for a name outside the builtin table.
pub fn unknown(name: &str) -> EvalError {
    EvalError::other(format!("name '{name}' is not defined"))
}

fn exactly<const N: usize>(name: &str, args: &[Number]) -> Result<[Number; N], EvalError> {
    <[Number; N]>::try_from(args).map_err(|_| {
        let expected = match N {
            1 => "exactly one argument".to_string(),
            n => format!("exactly {n} arguments"),
        };
        EvalError::other(format!("{name}() takes {expected} ({} given)", args.len()))
    })
}

/// Apply an `f64 -> f64` function, mapping NaN to a domain error and
/// overflow to a range error.
fn real(name: &str, args: &[Number], f: impl Fn(f64) -> f64) -> Result<Number, EvalError> {
    let [x] = exactly::<1>(name, args)?;
    let x = x.as_f64();
    let y = f(x);
    if y.is_nan() && !x.is_nan() {
        return Err(EvalError::domain());
    }
    if y.is_infinite() && x.is_finite() {
        return Err(EvalError::other("math range error"));
    }
    Ok(Number::Float(y))
}

/// Evaluate `f(x)` only inside its domain; NaN is reported by [`real`].
fn guard(x: f64, in_domain: bool, f: impl Fn(f64) -> f64) -> f64 {
    if in_domain { f(x) } else { f64::NAN }
}

fn rounding(name: &str, args: &[Number], f: impl Fn(f64) -> f64) -> Result<Number, EvalError> {
    match exactly::<1>(name, args)? {
        [Number::Int(i)] => Ok(Number::Int(i)),
        [Number::Float(x)] => Number::integral(f(x)),
    }
}

fn round(args: &[Number]) -> Result<Number, EvalError> {
    match args {
        [Number::Int(i)] => Ok(Number::Int(*i)),
        [Number::Float(x)] => Number::integral(x.round_ties_even()),
        [x, digits] => {
            let digits = integer(*digits)?;
            let x = x.as_f64();
            if !x.is_finite() {
                return Ok(Number::Float(x));
            }
            // Beyond f64 precision rounding is either a no-op or yields zero.
            let digits = i32::try_from(digits.clamp(-400, 400)).unwrap_or(0);
            let scale = 10f64.powi(digits.abs());
            let rounded = if digits < 0 && scale.is_infinite() {
                0.0
            } else if digits >= 0 {
                let scaled = x * scale;
                if scaled.is_finite() {
                    scaled.round_ties_even() / scale
                } else {
                    x
                }
            } else {
                (x / scale).round_ties_even() * scale
            };
            Ok(Number::Float(rounded))
        }
        _ => Err(EvalError::other(format!(
            "round() takes at most 2 arguments ({} given)",
            args.len()
        ))),
    }
}

fn integer(x: Number) -> Result<i64, EvalError> {
    match x {
        Number::Int(i) => Ok(i),
        Number::Float(_) => Err(EvalError::other(
            "'float' object cannot be interpreted as an integer",
        )),
    }
}

#[allow(clippy::cast_precision_loss)]
fn factorial(n: i64) -> Result<Number, EvalError> {
    if n < 0 {
        return Err(EvalError::Domain(
            "factorial() not defined for negative values".into(),
        ));
    }
    let mut exact: i64 = 1;
    let mut k = 2;
    while k <= n {
        match exact.checked_mul(k) {
            Some(v) => exact = v,
            None => break,
        }
        k += 1;
    }
    if k > n {
        return Ok(Number::Int(exact));
    }
    // Past i64 range; continue in f64 until it overflows (n > 170).
    let mut approx = exact as f64;
    while k <= n {
        approx *= k as f64;
        if approx.is_infinite() {
            return Err(EvalError::other("math range error"));
        }
        k += 1;
    }
    Ok(Number::Float(approx))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[allow(clippy::cast_precision_loss)]
fn to_number(v: u64) -> Number {
    i64::try_from(v).map_or_else(|_| Number::Float(v as f64), Number::Int)
}

fn gcd_all(args: &[Number]) -> Result<Number, EvalError> {
    let mut acc = 0u64;
    for arg in args {
        acc = gcd(acc, integer(*arg)?.unsigned_abs());
    }
    Ok(to_number(acc))
}

fn lcm_all(args: &[Number]) -> Result<Number, EvalError> {
    let mut acc = 1u64;
    for arg in args {
        let x = integer(*arg)?.unsigned_abs();
        if acc == 0 || x == 0 {
            acc = 0;
            continue;
        }
        acc = (acc / gcd(acc, x))
            .checked_mul(x)
            .ok_or_else(|| EvalError::other("math range error"))?;
    }
    Ok(to_number(acc))
}
