//! `ln(x)`: natural logarithm

use abacus_plugin::sdk::{Host, NativeExtension};

pub struct NaturalLog;

impl NativeExtension for NaturalLog {
    const NAME: &'static str = "ln";
    const ALIASES: &'static [&'static str] = &["naturallog"];
    const MIN_PARAMETERS: i32 = 1;
    const MAX_PARAMETERS: i32 = 1;

    fn compute(args: &[f64]) -> Result<f64, String> {
        let x = args[0];
        if x == 0.0 {
            return Err("Natural logarithm undefined for zero value".to_string());
        }
        if x < 0.0 {
            return Err(format!("Natural logarithm undefined for negative values: {:.6}", x));
        }
        let result = x.ln();
        if !result.is_finite() {
            return Err(format!("Mathematical error in logarithm computation for input: {:.6}", x));
        }
        Ok(result)
    }

    fn initialize(host: &Host) -> Result<(), String> {
        host.log("Natural logarithm extension initialized");
        Ok(())
    }
}

abacus_plugin::export_extension!(NaturalLog);
