//! Arithmetic builtins
//!
//! Each function receives exactly the argument count declared in the table;
//! [`abacus_plugin::Operation::execute`] checks it before the call.
//!
//! A result that overflows to infinity (or becomes NaN) from finite operands
//! is a domain error; no builtin ever returns a non-finite value for finite
//! input.

use abacus_core::{CalcError, CalcResult};

/// `result` if finite, otherwise an out-of-range error for `a op b`.
fn in_range(op: char, a: f64, b: f64, result: f64) -> CalcResult<f64> {
    if !result.is_finite() && a.is_finite() && b.is_finite() {
        return Err(CalcError::domain(format!("{} {} {} is out of range", a, op, b)));
    }
    Ok(result)
}

pub fn add(args: &[f64]) -> CalcResult<f64> {
    in_range('+', args[0], args[1], args[0] + args[1])
}

pub fn subtract(args: &[f64]) -> CalcResult<f64> {
    in_range('-', args[0], args[1], args[0] - args[1])
}

pub fn multiply(args: &[f64]) -> CalcResult<f64> {
    in_range('*', args[0], args[1], args[0] * args[1])
}

pub fn divide(args: &[f64]) -> CalcResult<f64> {
    if args[1] == 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    in_range('/', args[0], args[1], args[0] / args[1])
}

pub fn power(args: &[f64]) -> CalcResult<f64> {
    let (base, exponent) = (args[0], args[1]);
    if base == 0.0 && exponent < 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    if base < 0.0 && exponent.fract() != 0.0 {
        return Err(CalcError::domain(format!(
            "negative base {} with fractional exponent {}",
            base, exponent
        )));
    }
    in_range('^', base, exponent, base.powf(exponent))
}

pub fn negate(args: &[f64]) -> CalcResult<f64> {
    Ok(-args[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(add(&[2.0, 3.0]).unwrap(), 5.0);
        assert_eq!(subtract(&[2.0, 3.0]).unwrap(), -1.0);
        assert_eq!(multiply(&[2.0, 3.0]).unwrap(), 6.0);
        assert_eq!(divide(&[3.0, 2.0]).unwrap(), 1.5);
        assert_eq!(negate(&[2.0]).unwrap(), -2.0);
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(divide(&[10.0, 0.0]), Err(CalcError::DivisionByZero));
        assert_eq!(divide(&[10.0, -0.0]), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_power() {
        assert_eq!(power(&[2.0, 10.0]).unwrap(), 1024.0);
        assert_eq!(power(&[-2.0, 3.0]).unwrap(), -8.0);
        assert_eq!(power(&[4.0, 0.5]).unwrap(), 2.0);
        assert_eq!(power(&[0.0, 0.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_overflow_is_a_domain_error() {
        let big = 1e300;
        for result in [
            add(&[f64::MAX, f64::MAX]),
            subtract(&[-f64::MAX, f64::MAX]),
            multiply(&[big, big]),
            divide(&[big, 1e-300]),
            power(&[10.0, 400.0]),
        ] {
            assert!(matches!(result, Err(CalcError::Domain(_))), "{:?}", result);
        }
        assert!(divide(&[1.0, 1e-300]).unwrap().is_finite());
    }

    #[test]
    fn test_power_errors() {
        assert_eq!(power(&[0.0, -1.0]), Err(CalcError::DivisionByZero));
        assert!(matches!(power(&[-8.0, 0.5]), Err(CalcError::Domain(_))));
        assert!(matches!(power(&[10.0, 400.0]), Err(CalcError::Domain(_))));
    }
}
