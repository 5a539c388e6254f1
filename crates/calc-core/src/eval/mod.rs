//! Sandboxed expression evaluation.
//!
//! Expressions go through [`lexer`] → [`parser`] → a tree walk over the
//! fixed builtin table in [`functions`]. Nothing outside that table is
//! reachable from expression text.

mod errors;
pub mod functions;
mod lexer;
mod parser;

pub use errors::EvalError;
pub use parser::MAX_DEPTH;

use crate::number::Number;
use parser::{AddOp, Expr, MulOp};

/// Literal substituted for `π`.
const PI_LITERAL: &str = "3.141592653589793";
/// Literal substituted for a standalone `e`.
const E_LITERAL: &str = "2.718281828459045";

/// Pure expression evaluation.
///
/// The session dispatcher is generic over this trait so tests can swap in a
/// scripted evaluator.
pub trait Evaluate: Send + Sync {
    /// Evaluate a preprocessed expression.
    fn evaluate(&self, expression: &str) -> Result<Number, EvalError>;
}

/// The scientific evaluator: arithmetic, `**`, and the builtin table.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScientificEvaluator;

impl ScientificEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }
}

impl Evaluate for ScientificEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Number, EvalError> {
        let tokens = lexer::tokenize(expression)?;
        let tree = parser::parse(&tokens)?;
        let value = eval(&tree)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::other("math range error"))
        }
    }
}

fn eval(expr: &Expr) -> Result<Number, EvalError> {
    match expr {
        Expr::Num(n) => Ok(*n),
        Expr::Name(name) => functions::constant(name).ok_or_else(|| {
            if functions::FUNCTIONS.contains(&name.as_str()) {
                EvalError::other(format!("'{name}' is a function, not a number"))
            } else {
                functions::unknown(name)
            }
        }),
        Expr::Call(name, args) => {
            if functions::constant(name).is_some() {
                return Err(EvalError::other("'float' object is not callable"));
            }
            let args = args.iter().map(eval).collect::<Result<Vec<_>, _>>()?;
            functions::call(name, &args)
        }
        Expr::Neg(inner) => Ok(eval(inner)?.negate()),
        Expr::Pos(inner) => eval(inner),
        Expr::Pow(base, exp) => eval(base)?.checked_pow(eval(exp)?),
        Expr::Sum(first, rest) => rest.iter().try_fold(eval(first)?, |acc, (op, operand)| {
            let rhs = eval(operand)?;
            Ok(match op {
                AddOp::Add => acc.checked_add(rhs),
                AddOp::Sub => acc.checked_sub(rhs),
            })
        }),
        Expr::Product(first, rest) => rest.iter().try_fold(eval(first)?, |acc, (op, operand)| {
            let rhs = eval(operand)?;
            match op {
                MulOp::Mul => Ok(acc.checked_mul(rhs)),
                MulOp::Div => acc.checked_div(rhs),
                MulOp::Rem => acc.checked_rem(rhs),
            }
        }),
    }
}

/// Normalize user input before evaluation.
///
/// `^` becomes `**`, `π` becomes its decimal expansion, and an `e` that
/// stands alone (not inside an identifier like `exp` and not the exponent of
/// a literal like `1e5`) becomes Euler's number.
pub fn preprocess(expression: &str) -> String {
    let replaced = expression.replace('^', "**").replace('π', PI_LITERAL);
    let chars: Vec<char> = replaced.chars().collect();
    let mut out = String::with_capacity(replaced.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == 'e' && is_standalone_e(&chars, i) {
            out.push_str(E_LITERAL);
        } else {
            out.push(c);
        }
    }
    out
}

fn is_standalone_e(chars: &[char], i: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let prev = i.checked_sub(1).map(|p| chars[p]);
    let next = chars.get(i + 1).copied();

    // `1e5` and `2.e-3` have a digit or `.` before the marker.
    !(prev.is_some_and(|p| is_word(p) || p == '.') || next.is_some_and(is_word))
}
