//! Calculator numbers.
//!
//! A [`Number`] is either an exact integer or a float. Integer arithmetic
//! stays integral while it fits in an `i64` and falls back to float on
//! overflow; true division always produces a float. Integers serialize as
//! JSON integers and floats as JSON floats, so `4` and `4.0` stay distinct on
//! the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::eval::EvalError;

/// An integer or floating-point calculator value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// Exact integer.
    Int(i64),
    /// IEEE-754 double.
    Float(f64),
}

impl Number {
    /// Integer zero, the initial value of both session registers.
    pub const ZERO: Self = Self::Int(0);

    /// Lossy conversion to `f64`.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Whether this value is an integer or a finite float without a fraction.
    pub fn is_whole(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    /// Whether this value is finite (integers always are).
    pub fn is_finite(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(f) => f.is_finite(),
        }
    }

    /// Whether this value is zero.
    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    /// `self + rhs`.
    pub fn checked_add(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_add(b)
                .map_or_else(|| Self::Float(self.as_f64() + rhs.as_f64()), Self::Int),
            _ => Self::Float(self.as_f64() + rhs.as_f64()),
        }
    }

    /// `self - rhs`.
    pub fn checked_sub(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_sub(b)
                .map_or_else(|| Self::Float(self.as_f64() - rhs.as_f64()), Self::Int),
            _ => Self::Float(self.as_f64() - rhs.as_f64()),
        }
    }

    /// `self * rhs`.
    pub fn checked_mul(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_mul(b)
                .map_or_else(|| Self::Float(self.as_f64() * rhs.as_f64()), Self::Int),
            _ => Self::Float(self.as_f64() * rhs.as_f64()),
        }
    }

    /// True division `self / rhs`; always a float.
    pub fn checked_div(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        Ok(Self::Float(self.as_f64() / rhs.as_f64()))
    }

    /// Floored modulo `self % rhs`: the result takes the sign of the divisor.
    pub fn checked_rem(self, rhs: Self) -> Result<Self, EvalError> {
        if rhs.is_zero() {
            return Err(EvalError::DivisionByZero);
        }
        match (self, rhs) {
            (Self::Int(a), Self::Int(b)) => {
                let r = a.checked_rem(b).unwrap_or(0);
                if r != 0 && (r < 0) != (b < 0) {
                    Ok(Self::Int(r + b))
                } else {
                    Ok(Self::Int(r))
                }
            }
            _ => {
                let (a, b) = (self.as_f64(), rhs.as_f64());
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    Ok(Self::Float(r + b))
                } else if r == 0.0 {
                    Ok(Self::Float(0.0_f64.copysign(b)))
                } else {
                    Ok(Self::Float(r))
                }
            }
        }
    }

    /// Exponentiation `self ** rhs`.
    pub fn checked_pow(self, rhs: Self) -> Result<Self, EvalError> {
        if let (Self::Int(base), Self::Int(exp)) = (self, rhs) {
            if exp >= 0 {
                if let Some(v) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                    return Ok(Self::Int(v));
                }
                let v = self.as_f64().powf(rhs.as_f64());
                return if v.is_finite() {
                    Ok(Self::Float(v))
                } else {
                    Err(EvalError::Other("math range error".into()))
                };
            }
        }

        let (base, exp) = (self.as_f64(), rhs.as_f64());
        if base == 0.0 && exp < 0.0 {
            return Err(EvalError::DivisionByZero);
        }
        if base < 0.0 && exp.is_finite() && exp.fract() != 0.0 {
            return Err(EvalError::Domain(
                "negative number cannot be raised to a fractional power".into(),
            ));
        }
        let v = base.powf(exp);
        if v.is_infinite() && base.is_finite() && exp.is_finite() {
            return Err(EvalError::Other("Numerical result out of range".into()));
        }
        Ok(Self::Float(v))
    }

    /// Unary minus.
    pub fn negate(self) -> Self {
        match self {
            Self::Int(i) => i
                .checked_neg()
                .map_or_else(|| Self::Float(-self.as_f64()), Self::Int),
            Self::Float(f) => Self::Float(-f),
        }
    }

    /// Absolute value, preserving the number kind.
    pub fn abs(self) -> Self {
        match self {
            Self::Int(i) => i
                .checked_abs()
                .map_or_else(|| Self::Float(self.as_f64().abs()), Self::Int),
            Self::Float(f) => Self::Float(f.abs()),
        }
    }

    /// Convert a whole float to an integer when it fits in `i64`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn integral(value: f64) -> Result<Self, EvalError> {
        if !value.is_finite() {
            return Err(EvalError::Other(
                "cannot convert float infinity or NaN to integer".into(),
            ));
        }
        if value >= i64::MIN as f64 && value < i64::MAX as f64 {
            Ok(Self::Int(value as i64))
        } else {
            Ok(Self::Float(value))
        }
    }
}

impl Default for Number {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}
