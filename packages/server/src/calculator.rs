//! Exact decimal arithmetic performed by the worker.
//!
//! All operations are arbitrary-precision; binary floating point never
//! enters the picture. Division rounds half-up at a fixed scale and then
//! trims trailing zeros, so `5 / 2` yields `2.5`, not `2.5000000000`.

use bigdecimal::{BigDecimal, RoundingMode, Zero};
use calcbus_core::OperationKind;

/// Quotient scale before normalization. Non-terminating quotients such as
/// `1 / 3` are rounded half-up to this many fractional digits.
const DIVISION_SCALE: i64 = 10;

/// Business-level failures carried as data in the reply, never as a fault
/// crossing the bus.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Division by zero is not allowed.")]
    DivisionByZero,
}

/// Evaluates one operation over two exact decimals.
///
/// # Errors
///
/// Returns [`DomainError::DivisionByZero`] for a zero divisor.
pub fn evaluate(
    kind: OperationKind,
    operand1: &BigDecimal,
    operand2: &BigDecimal,
) -> Result<BigDecimal, DomainError> {
    match kind {
        OperationKind::Add => Ok(operand1 + operand2),
        OperationKind::Subtract => Ok(operand1 - operand2),
        OperationKind::Multiply => Ok(operand1 * operand2),
        OperationKind::Divide => {
            if operand2.is_zero() {
                return Err(DomainError::DivisionByZero);
            }
            let quotient = operand1 / operand2;
            Ok(quotient
                .with_scale_round(DIVISION_SCALE, RoundingMode::HalfUp)
                .normalized())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn eval(kind: OperationKind, a: &str, b: &str) -> Result<BigDecimal, DomainError> {
        evaluate(kind, &dec(a), &dec(b))
    }

    #[test]
    fn addition_is_exact() {
        assert_eq!(eval(OperationKind::Add, "2", "3").unwrap(), dec("5"));
        // The classic binary-float trap: must be exactly 0.3.
        assert_eq!(eval(OperationKind::Add, "0.1", "0.2").unwrap(), dec("0.3"));
    }

    #[test]
    fn subtraction_is_exact() {
        assert_eq!(eval(OperationKind::Subtract, "10", "4").unwrap(), dec("6"));
        assert_eq!(
            eval(OperationKind::Subtract, "1", "1.0000000001").unwrap(),
            dec("-0.0000000001")
        );
    }

    #[test]
    fn multiplication_is_exact() {
        assert_eq!(eval(OperationKind::Multiply, "6", "7").unwrap(), dec("42"));
        assert_eq!(
            eval(OperationKind::Multiply, "1.5", "-2.5").unwrap(),
            dec("-3.75")
        );
    }

    #[test]
    fn division_yields_trimmed_decimal() {
        let result = eval(OperationKind::Divide, "5", "2").unwrap();
        assert_eq!(result, dec("2.5"));
        assert_eq!(result.to_string(), "2.5");
    }

    #[test]
    fn division_rounds_half_up_at_fixed_scale() {
        assert_eq!(
            eval(OperationKind::Divide, "1", "3").unwrap().to_string(),
            "0.3333333333"
        );
        // 2/3 = 0.666...; the 10th digit rounds up.
        assert_eq!(
            eval(OperationKind::Divide, "2", "3").unwrap().to_string(),
            "0.6666666667"
        );
    }

    #[test]
    fn exact_division_is_not_padded() {
        assert_eq!(eval(OperationKind::Divide, "10", "4").unwrap().to_string(), "2.5");
        assert_eq!(eval(OperationKind::Divide, "9", "3").unwrap(), dec("3"));
    }

    #[test]
    fn division_by_zero_is_a_domain_error() {
        let err = eval(OperationKind::Divide, "1", "0").unwrap_err();
        assert_eq!(err, DomainError::DivisionByZero);
        assert_eq!(err.to_string(), "Division by zero is not allowed.");

        // Zero with a scale is still zero.
        assert!(eval(OperationKind::Divide, "1", "0.000").is_err());
    }

    #[test]
    fn large_operands_do_not_lose_precision() {
        let big = "123456789012345678901234567890.123456789";
        assert_eq!(
            eval(OperationKind::Add, big, "0.000000001").unwrap(),
            dec("123456789012345678901234567890.123456790")
        );
    }
}
