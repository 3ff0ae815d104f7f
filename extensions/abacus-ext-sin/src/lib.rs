//! `sin(degrees)`

use abacus_plugin::sdk::{Host, NativeExtension};

const SNAP_EPSILON: f64 = 1e-10;

pub struct Sine;

/// Round values within `SNAP_EPSILON` of 0, 1 or -1 onto them, so special
/// angles give exact results.
pub fn snap(value: f64) -> f64 {
    for exact in [0.0, 1.0, -1.0] {
        if (value - exact).abs() < SNAP_EPSILON {
            return exact;
        }
    }
    value
}

impl NativeExtension for Sine {
    const NAME: &'static str = "sin";
    const ALIASES: &'static [&'static str] = &["sine"];
    const MIN_PARAMETERS: i32 = 1;
    const MAX_PARAMETERS: i32 = 1;

    fn compute(args: &[f64]) -> Result<f64, String> {
        if !args[0].is_finite() {
            return Err(format!("sin undefined for {}", args[0]));
        }
        Ok(snap(args[0].to_radians().sin()))
    }

    fn initialize(host: &Host) -> Result<(), String> {
        host.log("Sine extension initialized (degrees)");
        Ok(())
    }
}

abacus_plugin::export_extension!(Sine);
