//! The `odin_env` import group: console output, traps, clocks, entropy and
//! the math intrinsics the guest expects from its environment.

#![forbid(unsafe_code)]

mod console;
mod env;

pub use console::{ConsoleSink, ConsoleWriter, StdStream, VecSink};
pub use env::{Env, EnvError, EnvHost, SystemHost};

/// Math primitives re-exported to the guest by name. These exist because the
/// guest's own runtime has no libm on the wasm targets.
pub mod math {
    pub fn sqrt(x: f64) -> f64 {
        x.sqrt()
    }

    pub fn sin(x: f64) -> f64 {
        x.sin()
    }

    pub fn cos(x: f64) -> f64 {
        x.cos()
    }

    pub fn pow(x: f64, power: f64) -> f64 {
        x.powf(power)
    }

    pub fn fmuladd(x: f64, y: f64, z: f64) -> f64 {
        x.mul_add(y, z)
    }

    pub fn ln(x: f64) -> f64 {
        x.ln()
    }

    pub fn exp(x: f64) -> f64 {
        x.exp()
    }

    pub fn ldexp(x: f64, exp: i32) -> f64 {
        x * 2f64.powi(exp)
    }
}

#[cfg(test)]
mod tests {
    use super::math;

    #[test]
    fn ldexp_scales_by_powers_of_two() {
        assert_eq!(math::ldexp(1.5, 4), 24.0);
        assert_eq!(math::ldexp(8.0, -3), 1.0);
    }

    #[test]
    fn fmuladd_is_fused() {
        let x = 1e16;
        assert_eq!(math::fmuladd(x, 1.0, 1.0), x.mul_add(1.0, 1.0));
    }
}
