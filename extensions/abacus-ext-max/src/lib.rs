//! `max(a, b, ...)`: largest of one or more arguments

use abacus_plugin::sdk::NativeExtension;

pub struct Max;

impl NativeExtension for Max {
    const NAME: &'static str = "max";
    const MIN_PARAMETERS: i32 = 1;
    const MAX_PARAMETERS: i32 = -1;

    fn compute(args: &[f64]) -> Result<f64, String> {
        if args.iter().any(|a| a.is_nan()) {
            return Err("max of NaN is undefined".to_string());
        }
        Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }
}

abacus_plugin::export_extension!(Max);
