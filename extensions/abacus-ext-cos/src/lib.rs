//! `cos(degrees)`

use abacus_plugin::sdk::{Host, NativeExtension};

const SNAP_EPSILON: f64 = 1e-10;

pub struct Cosine;

impl NativeExtension for Cosine {
    const NAME: &'static str = "cos";
    const ALIASES: &'static [&'static str] = &["cosine"];
    const MIN_PARAMETERS: i32 = 1;
    const MAX_PARAMETERS: i32 = 1;

    fn compute(args: &[f64]) -> Result<f64, String> {
        if !args[0].is_finite() {
            return Err(format!("cos undefined for {}", args[0]));
        }
        let result = args[0].to_radians().cos();
        // exact values at multiples of 90 degrees
        Ok([0.0, 1.0, -1.0]
            .into_iter()
            .find(|exact| (result - exact).abs() < SNAP_EPSILON)
            .unwrap_or(result))
    }

    fn initialize(host: &Host) -> Result<(), String> {
        host.log("Cosine extension initialized (degrees)");
        Ok(())
    }
}

abacus_plugin::export_extension!(Cosine);
