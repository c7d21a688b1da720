//! Solver-facing view of a [`Calibration`].
//!
//! The solver sees a flat parameter vector, a flat residual vector with two
//! rows per indexed detection and a sparsity pattern. Robust kernels are
//! applied by IRLS row scaling: residuals and Jacobian rows are scaled by
//! `sqrt(w_i)` computed from unweighted residuals, without differentiating
//! the weights.

use log::{debug, warn};
use nalgebra::DVector;
use rigcal_core::{Real, Result};

use crate::calibration::Calibration;
use crate::params::Parameters;
use crate::robust::RobustKernel;
use crate::sparsity::{IndexTable, SparsityPattern, RESIDUAL_DIM};

/// Residuals, sparsity and a finite-difference Jacobian over one index table.
#[derive(Debug, Clone)]
pub struct ReprojectionProblem {
    calibration: Calibration,
    index: IndexTable,
    sparsity: SparsityPattern,
    kernel: RobustKernel,
}

impl ReprojectionProblem {
    /// Index the current inliers of `calibration`.
    pub fn new(calibration: Calibration, kernel: RobustKernel) -> Result<Self> {
        let index = calibration.index_table()?;
        let sparsity = calibration.sparsity(&index);
        debug!(
            "reprojection problem: {} residuals, {} params, {} structural non-zeros",
            index.num_residuals(),
            sparsity.cols(),
            sparsity.nnz()
        );
        Ok(Self {
            calibration,
            index,
            sparsity,
            kernel,
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn index(&self) -> &IndexTable {
        &self.index
    }

    pub fn sparsity(&self) -> &SparsityPattern {
        &self.sparsity
    }

    pub fn num_params(&self) -> usize {
        self.sparsity.cols()
    }

    pub fn num_residuals(&self) -> usize {
        self.index.num_residuals()
    }

    /// Starting point for the solver.
    pub fn initial_params(&self) -> DVector<Real> {
        self.calibration.params()
    }

    /// Projected minus detected, two rows per indexed detection.
    ///
    /// A detection whose point no longer projects contributes zero rows.
    pub fn residuals_unweighted(&self, x: &DVector<Real>) -> Result<DVector<Real>> {
        let calibration = self.calibration.with_params(x)?;
        let projected = calibration.projected()?;
        let detected = self.calibration.detections().points();

        let mut r = DVector::zeros(self.num_residuals());
        let mut lost = 0;
        for (i, entry) in self.index.entries().iter().enumerate() {
            match projected.get(entry)? {
                Some(p) => {
                    let d = p - detected[entry.as_slice()];
                    r[RESIDUAL_DIM * i] = d.x;
                    r[RESIDUAL_DIM * i + 1] = d.y;
                }
                None => lost += 1,
            }
        }
        if lost > 0 {
            warn!("{lost} indexed detections could not be projected");
        }
        Ok(r)
    }

    /// Per-row `sqrt(w)` from the kernel, shared by both rows of a detection.
    pub fn row_scales(&self, r_unweighted: &DVector<Real>) -> DVector<Real> {
        let mut scales = DVector::from_element(r_unweighted.len(), 1.0);
        for (pair, out) in r_unweighted
            .as_slice()
            .chunks_exact(RESIDUAL_DIM)
            .zip(scales.as_mut_slice().chunks_exact_mut(RESIDUAL_DIM))
        {
            let r2 = pair.iter().map(|v| v * v).sum::<Real>();
            out.fill(self.kernel.row_scale(r2));
        }
        scales
    }

    /// Weighted residuals used by the solver.
    pub fn residuals(&self, x: &DVector<Real>) -> Result<DVector<Real>> {
        let r = self.residuals_unweighted(x)?;
        let scales = self.row_scales(&r);
        Ok(r.component_mul(&scales))
    }

    /// Robust cost `sum rho(|r_i|^2)` over detections.
    pub fn cost(&self, x: &DVector<Real>) -> Result<Real> {
        let r = self.residuals_unweighted(x)?;
        Ok(r.as_slice()
            .chunks_exact(RESIDUAL_DIM)
            .map(|pair| self.kernel.rho_and_weight(pair.iter().map(|v| v * v).sum()).0)
            .sum())
    }

    /// Forward-difference Jacobian `(row, col, value)` restricted to the sparsity pattern.
    ///
    /// Each column is perturbed by `step`; only rows the pattern marks as
    /// dependent are evaluated. Rows are scaled like [`Self::residuals`].
    pub fn jacobian_triplets(&self, x: &DVector<Real>, step: Real) -> Result<Vec<(usize, usize, Real)>> {
        let r0 = self.residuals_unweighted(x)?;
        let scales = self.row_scales(&r0);
        let mut triplets = Vec::with_capacity(self.sparsity.nnz());

        for (col, rows) in self.sparsity.rows_per_column().into_iter().enumerate() {
            if rows.is_empty() {
                continue;
            }
            let mut xp = x.clone();
            xp[col] += step;
            let rp = self.residuals_unweighted(&xp)?;
            triplets.extend(
                rows.into_iter()
                    .map(|row| (row, col, scales[row] * (rp[row] - r0[row]) / step)),
            );
        }
        Ok(triplets)
    }
}
