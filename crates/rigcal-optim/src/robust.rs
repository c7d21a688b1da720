use rigcal_core::Real;
use serde::{Deserialize, Serialize};

/// Robust loss kernels for iteratively re-weighted least squares (IRLS).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RobustKernel {
    /// Pure L2.
    #[default]
    None,
    /// Huber loss with a given threshold.
    Huber { delta: Real },
    /// Cauchy loss with a scale parameter.
    Cauchy { c: Real },
    /// Arctangent loss, bounded by `a * pi / 2`.
    Arctan { a: Real },
}

impl RobustKernel {
    /// Return the robust loss `rho(r^2)` and the IRLS weight `w = rho'(r^2)`.
    ///
    /// Residuals and Jacobian rows are scaled by `sqrt(w)` before the
    /// linearised system is solved.
    pub fn rho_and_weight(self, r2: Real) -> (Real, Real) {
        match self {
            RobustKernel::None => (r2, 1.0),
            RobustKernel::Huber { delta } => {
                let r = r2.sqrt();
                if r <= delta {
                    (r2, 1.0)
                } else {
                    (2.0 * delta * r - delta * delta, delta / r)
                }
            }
            RobustKernel::Cauchy { c } => {
                let t = r2 / (c * c);
                (c * c * (1.0 + t).ln(), 1.0 / (1.0 + t))
            }
            RobustKernel::Arctan { a } => {
                let t = r2 / a;
                (a * t.atan(), 1.0 / (1.0 + t * t))
            }
        }
    }

    /// `sqrt(w)` for one residual pair.
    pub fn row_scale(self, r2: Real) -> Real {
        self.rho_and_weight(r2).1.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Real, b: Real, tol: Real) {
        assert!(
            (a - b).abs() <= tol,
            "values differ: {} vs {} (tol={})",
            a,
            b,
            tol
        );
    }

    #[test]
    fn huber_matches_l2_for_small_residuals() {
        let (rho, w) = RobustKernel::Huber { delta: 1.0 }.rho_and_weight(0.25);
        approx_eq(rho, 0.25, 1e-12);
        approx_eq(w, 1.0, 1e-12);
    }

    #[test]
    fn huber_linear_for_large_residuals() {
        let (rho, w) = RobustKernel::Huber { delta: 1.0 }.rho_and_weight(25.0);
        approx_eq(rho, 9.0, 1e-12);
        approx_eq(w, 0.2, 1e-12);
    }

    #[test]
    fn arctan_is_bounded_and_quadratic_near_zero() {
        let kernel = RobustKernel::Arctan { a: 4.0 };
        let (rho_small, w_small) = kernel.rho_and_weight(1e-4);
        approx_eq(rho_small, 1e-4, 1e-9);
        approx_eq(w_small, 1.0, 1e-9);

        let (rho_large, w_large) = kernel.rho_and_weight(1e6);
        assert!(rho_large < 4.0 * std::f64::consts::FRAC_PI_2);
        assert!(w_large < 1e-9, "w_large {w_large}");
    }

    #[test]
    fn weights_decrease_with_residual() {
        for kernel in [
            RobustKernel::Huber { delta: 1.0 },
            RobustKernel::Cauchy { c: 1.0 },
            RobustKernel::Arctan { a: 1.0 },
        ] {
            let (_, w_small) = kernel.rho_and_weight(0.01);
            let (_, w_large) = kernel.rho_and_weight(100.0);
            assert!(w_small > w_large, "{kernel:?}");
        }
        assert_eq!(RobustKernel::None.row_scale(100.0), 1.0);
    }

    #[test]
    fn kernel_config_from_json() {
        let kernel: RobustKernel = serde_json::from_str(r#"{"type": "cauchy", "c": 2.0}"#).unwrap();
        assert_eq!(kernel, RobustKernel::Cauchy { c: 2.0 });
    }
}
