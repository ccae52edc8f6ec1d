//! Ordinary least squares with heteroskedasticity-robust (HC1) errors.

use ndarray::{Array1, Array2, Axis};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum OlsError {
    #[error("{n} observations for {k} parameters")]
    TooFewObservations { n: usize, k: usize },
    #[error("design matrix is singular")]
    Singular,
    #[error("design has {rows} rows but response has {len}")]
    Shape { rows: usize, len: usize },
}

/// Relative pivot size below which X'X is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct OlsFit {
    pub terms: Vec<String>,
    pub coef: Vec<f64>,
    pub std_err: Vec<f64>,
    pub z: Vec<f64>,
    pub n: usize,
    pub r_squared: f64,
}

impl OlsFit {
    pub fn term(&self, name: &str) -> Option<(f64, f64)> {
        let i = self.terms.iter().position(|t| t == name)?;
        Some((self.coef[i], self.std_err[i]))
    }
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>, OlsError> {
    let k = a.nrows();
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return Err(OlsError::Singular);
    }

    // Augmented [A | I]
    let mut m = Array2::<f64>::zeros((k, 2 * k));
    for i in 0..k {
        for j in 0..k {
            m[[i, j]] = a[[i, j]];
        }
        m[[i, k + i]] = 1.0;
    }

    for col in 0..k {
        let mut max_row = col;
        let mut max_val = m[[col, col]].abs();
        for row in (col + 1)..k {
            if m[[row, col]].abs() > max_val {
                max_val = m[[row, col]].abs();
                max_row = row;
            }
        }
        if max_val < SINGULAR_TOLERANCE * scale {
            return Err(OlsError::Singular);
        }
        if max_row != col {
            for j in 0..2 * k {
                m.swap([col, j], [max_row, j]);
            }
        }

        let pivot = m[[col, col]];
        for j in 0..2 * k {
            m[[col, j]] /= pivot;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..2 * k {
                m[[row, j]] -= factor * m[[col, j]];
            }
        }
    }

    Ok(m.slice(ndarray::s![.., k..]).to_owned())
}

/// Fit `y = X b + e`. `x` must already contain the intercept column.
///
/// Covariance is `(X'X)^-1 X' diag(e^2) X (X'X)^-1 * n / (n - k)`.
pub fn fit(terms: Vec<String>, x: &Array2<f64>, y: &Array1<f64>) -> Result<OlsFit, OlsError> {
    let (n, k) = x.dim();
    if y.len() != n {
        return Err(OlsError::Shape { rows: n, len: y.len() });
    }
    if n <= k {
        return Err(OlsError::TooFewObservations { n, k });
    }

    let xtx = x.t().dot(x);
    let xtx_inv = invert(&xtx)?;
    let coef = xtx_inv.dot(&x.t().dot(y));

    let residuals = y - &x.dot(&coef);
    let weighted = x * &residuals.view().insert_axis(Axis(1));
    let meat = weighted.t().dot(&weighted);
    let correction = n as f64 / (n - k) as f64;
    let cov = xtx_inv.dot(&meat).dot(&xtx_inv) * correction;

    let std_err: Vec<f64> = cov.diag().iter().map(|v| v.max(0.0).sqrt()).collect();
    let z = coef.iter().zip(&std_err).map(|(b, s)| b / s).collect();

    let y_mean = y.mean().unwrap_or(0.0);
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let ssr: f64 = residuals.iter().map(|e| e * e).sum();
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 0.0 };

    Ok(OlsFit {
        terms,
        coef: coef.to_vec(),
        std_err,
        z,
        n,
        r_squared,
    })
}
