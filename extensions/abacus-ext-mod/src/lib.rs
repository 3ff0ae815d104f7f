//! `a mod b`: remainder with the sign of the dividend, as an infix operator
//! binding like `*` and `/`.

use abacus_plugin::sdk::NativeExtension;

pub struct Modulo;

impl NativeExtension for Modulo {
    const NAME: &'static str = "mod";
    const ALIASES: &'static [&'static str] = &["modulo"];
    const MIN_PARAMETERS: i32 = 2;
    const MAX_PARAMETERS: i32 = 2;
    const PRIORITY: u32 = 2;
    const OPERATOR: bool = true;

    fn compute(args: &[f64]) -> Result<f64, String> {
        if args[1] == 0.0 {
            return Err("Division by zero in modulo".to_string());
        }
        Ok(args[0] % args[1])
    }
}

abacus_plugin::export_extension!(Modulo);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod() {
        assert_eq!(Modulo::compute(&[7.0, 3.0]).unwrap(), 1.0);
        assert_eq!(Modulo::compute(&[-7.0, 3.0]).unwrap(), -1.0);
        assert_eq!(Modulo::compute(&[7.5, 2.0]).unwrap(), 1.5);
    }

    #[test]
    fn test_mod_by_zero() {
        assert!(Modulo::compute(&[1.0, 0.0]).is_err());
    }
}
