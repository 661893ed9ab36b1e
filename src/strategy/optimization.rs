// src/strategy/optimization.rs

//! Parameter estimation shared by the forecast strategies.
//!
//! Estimates are least-squares problems over a residual vector, solved with
//! Levenberg-Marquardt. Parameters that must stay in a bounded region
//! (stationary AR polynomials, invertible MA polynomials) are optimised
//! over unconstrained reals and mapped into the region with the transforms
//! below.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::{DMatrix, DVector, Dyn, Owned};
use std::fmt;

/// Unconstrained coordinates are clamped to this box before being mapped.
pub const UNCONSTRAINED_BOUND: f64 = 30.0;

/// Relative step of the central-difference Jacobian.
const JACOBIAN_STEP: f64 = 1e-6;

/// Residual evaluations allowed per parameter (plus one).
const PATIENCE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub point: Vec<f64>,
    /// Sum of squared residuals at `point`.
    pub sse: f64,
    pub evaluations: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConvergenceFailure {
    /// Residuals are not finite at the starting point.
    NonFiniteStart,
    /// The solver stopped without meeting its tolerances.
    Stopped(String),
}

impl fmt::Display for ConvergenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceFailure::NonFiniteStart => {
                write!(f, "residuals are not finite at the starting point")
            }
            ConvergenceFailure::Stopped(reason) => {
                write!(f, "optimizer did not converge: {reason}")
            }
        }
    }
}

/// A residual function wrapped as a `levenberg_marquardt` problem.
///
/// The residual vector is zero-padded to at least one row per parameter.
/// The Jacobian is taken by central differences.
struct ResidualProblem<F> {
    residuals: F,
    params: DVector<f64>,
    rows: usize,
}

impl<F> ResidualProblem<F>
where
    F: Fn(&[f64]) -> Option<Vec<f64>>,
{
    fn evaluate(&self, point: &[f64]) -> Option<DVector<f64>> {
        let mut values = (self.residuals)(point)?;
        if values.iter().any(|r| !r.is_finite()) {
            return None;
        }
        values.resize(self.rows, 0.0);
        Some(DVector::from_vec(values))
    }
}

impl<F> LeastSquaresProblem<f64, Dyn, Dyn> for ResidualProblem<F>
where
    F: Fn(&[f64]) -> Option<Vec<f64>>,
{
    type ParameterStorage = Owned<f64, Dyn>;
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;

    fn set_params(&mut self, p: &DVector<f64>) {
        self.params.copy_from(p);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.evaluate(self.params.as_slice())
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let n = self.params.len();
        let mut point = self.params.as_slice().to_vec();
        let mut jacobian = DMatrix::zeros(self.rows, n);
        for j in 0..n {
            let original = point[j];
            let h = JACOBIAN_STEP * original.abs().max(1.0);
            point[j] = original + h;
            let up = self.evaluate(&point)?;
            point[j] = original - h;
            let down = self.evaluate(&point)?;
            point[j] = original;
            jacobian.set_column(j, &((up - down) / (2.0 * h)));
        }
        Some(jacobian)
    }
}

/// Minimises the sum of squares of `residuals` starting from `start`.
///
/// `residuals` returns `None` where it is undefined. A zero-dimensional
/// problem is evaluated once.
pub fn least_squares<F>(residuals: F, start: &[f64]) -> Result<LeastSquaresFit, ConvergenceFailure>
where
    F: Fn(&[f64]) -> Option<Vec<f64>>,
{
    let initial = residuals(start)
        .filter(|r| r.iter().all(|v| v.is_finite()))
        .ok_or(ConvergenceFailure::NonFiniteStart)?;
    if start.is_empty() || initial.is_empty() {
        return Ok(LeastSquaresFit {
            point: start.to_vec(),
            sse: initial.iter().map(|r| r * r).sum(),
            evaluations: 1,
        });
    }

    let problem = ResidualProblem {
        rows: initial.len().max(start.len()),
        residuals,
        params: DVector::from_vec(start.to_vec()),
    };
    let (solved, report) = LevenbergMarquardt::new()
        .with_patience(PATIENCE)
        .minimize(problem);

    if !report.termination.was_successful() {
        return Err(ConvergenceFailure::Stopped(describe(&report.termination)));
    }
    let point = solved.params.as_slice().to_vec();
    let sse = solved
        .evaluate(&point)
        .map(|r| r.norm_squared())
        .ok_or_else(|| ConvergenceFailure::Stopped("non-finite residuals at the solution".into()))?;

    Ok(LeastSquaresFit {
        point,
        sse,
        evaluations: report.number_of_evaluations,
    })
}

fn describe(reason: &TerminationReason) -> String {
    match reason {
        TerminationReason::LostPatience => {
            format!("no convergence within {PATIENCE} evaluations per parameter")
        }
        other => format!("{other:?}"),
    }
}

fn clamp_unconstrained(u: f64) -> f64 {
    u.clamp(-UNCONSTRAINED_BOUND, UNCONSTRAINED_BOUND)
}

/// Maps unconstrained reals to the coefficients of a stationary
/// autoregressive polynomial `1 - a1 z - ... - ak z^k`.
///
/// Each real becomes a partial autocorrelation in (-1, 1); the
/// Durbin-Levinson recursion turns those into polynomial coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut coeffs: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for &u in unconstrained {
        let u = clamp_unconstrained(u);
        let r = u / (1.0 + u * u).sqrt();
        let k = coeffs.len();
        let previous = coeffs.clone();
        for j in 0..k {
            coeffs[j] = previous[j] - r * previous[k - 1 - j];
        }
        coeffs.push(r);
    }
    coeffs
}

/// Inverse of `constrain_stationary`. `None` if `coeffs` is not stationary.
pub fn unconstrain_stationary(coeffs: &[f64]) -> Option<Vec<f64>> {
    let mut current = coeffs.to_vec();
    let mut partial = vec![0.0; coeffs.len()];
    for k in (0..coeffs.len()).rev() {
        let r = current[k];
        if !(r.abs() < 1.0) {
            return None;
        }
        partial[k] = r;
        let denom = 1.0 - r * r;
        current = (0..k)
            .map(|j| (current[j] + r * current[k - 1 - j]) / denom)
            .collect();
    }
    Some(partial.iter().map(|r| r / (1.0 - r * r).sqrt()).collect())
}
