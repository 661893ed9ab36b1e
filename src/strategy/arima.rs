// src/strategy/arima.rs

use crate::error::{PlanningError, Result};
use crate::strategy::optimization::{
    constrain_stationary, least_squares, unconstrain_stationary,
};
use crate::strategy::traits::{FitSummary, ForecastStrategy, ModelFit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const MODEL: &str = "ARIMA";

/// Autoregressive order `p`, differencing order `d`, moving-average order `q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Shortest history this order can be fitted to.
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = PlanningError;

    /// Parses `"p,d,q"`, e.g. `"2,1,1"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let invalid = || {
            PlanningError::invalid_parameter(
                "order",
                format!("expected three non-negative integers as 'p,d,q', got '{s}'"),
            )
        };
        if parts.len() != 3 {
            return Err(invalid());
        }
        let mut values = [0usize; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(values[0], values[1], values[2]))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaParams {
    pub order: ArimaOrder,
}

impl ArimaParams {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    ar: Vec<f64>,
    /// Signs follow `1 + theta1 z + ... + thetaq z^q`.
    ma: Vec<f64>,
    mean: f64,
}

impl Coefficients {
    /// One-step conditional-sum-of-squares residuals over a differenced series.
    ///
    /// The first `p` residuals are conditioned to zero.
    fn residuals(&self, w: &[f64]) -> Vec<f64> {
        let p = self.ar.len();
        let mut errors = vec![0.0; w.len()];
        for t in p..w.len() {
            let prediction = self.predict(w, &errors, t);
            errors[t] = w[t] - prediction;
        }
        errors
    }

    /// Predicted value at `t` from values and errors strictly before `t`.
    fn predict(&self, w: &[f64], errors: &[f64], t: usize) -> f64 {
        let ar_part: f64 = self
            .ar
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < t)
            .map(|(i, phi)| phi * (w[t - 1 - i] - self.mean))
            .sum();
        let ma_part: f64 = self
            .ma
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, theta)| theta * errors[t - 1 - j])
            .sum();
        self.mean + ar_part + ma_part
    }

    /// Residuals that depend on the coefficients, i.e. all but the first `p`.
    fn free_residuals(&self, w: &[f64]) -> Vec<f64> {
        let p = self.ar.len();
        self.residuals(w).split_off(p)
    }
}

/// Layout of the unconstrained parameter vector: AR, then MA, then the mean.
#[derive(Debug, Clone, Copy)]
struct Layout {
    p: usize,
    q: usize,
    with_mean: bool,
}

impl Layout {
    fn dimension(&self) -> usize {
        self.p + self.q + usize::from(self.with_mean)
    }

    fn decode(&self, u: &[f64], fixed_mean: f64) -> Coefficients {
        let ar = constrain_stationary(&u[..self.p]);
        let ma = constrain_stationary(&u[self.p..self.p + self.q])
            .into_iter()
            .map(|a| -a)
            .collect();
        let mean = if self.with_mean {
            u[self.p + self.q]
        } else {
            fixed_mean
        };
        Coefficients { ar, ma, mean }
    }
}

fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Coefficients `c_k` with `y_t = sum_k c_k y_{t-k} + (d-th difference at t)`.
fn integration_weights(d: usize) -> Vec<f64> {
    let mut weights = Vec::with_capacity(d);
    let mut binomial = 1.0;
    for k in 1..=d {
        binomial = binomial * (d - k + 1) as f64 / k as f64;
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        weights.push(sign * binomial);
    }
    weights
}

/// Yule-Walker AR estimates via the Durbin-Levinson recursion.
///
/// Returns zeros for a flat series or a singular system.
fn yule_walker(w: &[f64], order: usize) -> Vec<f64> {
    if order == 0 || w.is_empty() {
        return vec![0.0; order];
    }
    let n = w.len();
    let mean = w.iter().sum::<f64>() / n as f64;
    let autocov: Vec<f64> = (0..=order)
        .map(|k| {
            (k..n)
                .map(|i| (w[i] - mean) * (w[i - k] - mean))
                .sum::<f64>()
                / n as f64
        })
        .collect();
    if autocov[0] <= 1e-12 {
        return vec![0.0; order];
    }
    let rho: Vec<f64> = autocov.iter().map(|c| c / autocov[0]).collect();

    let mut coeffs: Vec<f64> = Vec::with_capacity(order);
    for k in 1..=order {
        let numerator = rho[k]
            - coeffs
                .iter()
                .enumerate()
                .map(|(j, phi)| phi * rho[k - 1 - j])
                .sum::<f64>();
        let denominator = 1.0
            - coeffs
                .iter()
                .enumerate()
                .map(|(j, phi)| phi * rho[j + 1])
                .sum::<f64>();
        if denominator.abs() < 1e-12 {
            return vec![0.0; order];
        }
        let reflection = numerator / denominator;
        let previous = coeffs.clone();
        for j in 0..k - 1 {
            coeffs[j] = previous[j] - reflection * previous[k - 2 - j];
        }
        coeffs.push(reflection);
    }
    coeffs
}

impl ForecastStrategy for ArimaParams {
    fn name(&self) -> &'static str {
        MODEL
    }

    fn fit(&self, history: &[f64], horizon: usize) -> Result<ModelFit> {
        let ArimaOrder { p, d, q } = self.order;
        let required = self.order.min_observations();
        if history.len() < required {
            return Err(PlanningError::model_fit(
                MODEL,
                format!(
                    "order ({}) needs at least {required} observations, got {}",
                    self.order,
                    history.len()
                ),
            ));
        }
        if history.iter().any(|v| !v.is_finite()) {
            return Err(PlanningError::model_fit(MODEL, "history contains non-finite values"));
        }

        let w = difference(history, d);
        let layout = Layout {
            p,
            q,
            with_mean: d == 0,
        };
        let sample_mean = w.iter().sum::<f64>() / w.len() as f64;

        let mut start =
            unconstrain_stationary(&yule_walker(&w, p)).unwrap_or_else(|| vec![0.0; p]);
        start.extend(std::iter::repeat(0.0).take(q));
        if layout.with_mean {
            start.push(sample_mean);
        }
        debug_assert_eq!(start.len(), layout.dimension());

        let estimate = least_squares(|u| Some(layout.decode(u, 0.0).free_residuals(&w)), &start)
            .map_err(|e| PlanningError::model_fit(MODEL, e.to_string()))?;
        debug!(
            order = %self.order,
            evaluations = estimate.evaluations,
            "Conditional sum of squares minimised"
        );

        let coefficients = layout.decode(&estimate.point, 0.0);
        let errors = coefficients.residuals(&w);
        let sse: f64 = errors.iter().map(|e| e * e).sum();
        let weights = integration_weights(d);

        // In-sample: undefined until p differenced lags exist.
        let mut fitted = vec![None; history.len()];
        for t in p..w.len() {
            let predicted_diff = w[t] - errors[t];
            let original = t + d;
            let carried: f64 = weights
                .iter()
                .enumerate()
                .map(|(k, c)| c * history[original - 1 - k])
                .sum();
            fitted[original] = Some(predicted_diff + carried);
        }

        // Out-of-sample: future shocks have zero expectation.
        let mut w_ext = w;
        let mut e_ext = errors;
        let mut y_ext = history.to_vec();
        let mut forecast = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let t = w_ext.len();
            let predicted_diff = coefficients.predict(&w_ext, &e_ext, t);
            w_ext.push(predicted_diff);
            e_ext.push(0.0);

            let n = y_ext.len();
            let carried: f64 = weights
                .iter()
                .enumerate()
                .map(|(k, c)| c * y_ext[n - 1 - k])
                .sum();
            let value = predicted_diff + carried;
            y_ext.push(value);
            forecast.push(value);
        }

        let mut parameters: Vec<(String, f64)> = Vec::with_capacity(layout.dimension());
        for (i, phi) in coefficients.ar.iter().enumerate() {
            parameters.push((format!("ar{}", i + 1), *phi));
        }
        for (j, theta) in coefficients.ma.iter().enumerate() {
            parameters.push((format!("ma{}", j + 1), *theta));
        }
        if layout.with_mean {
            parameters.push(("mean".to_string(), coefficients.mean));
        }

        Ok(ModelFit {
            forecast,
            fitted,
            summary: FitSummary {
                model: format!("ARIMA({p},{d},{q})"),
                parameters,
                sse,
            },
        })
    }
}
