//! Dense helpers for the small matrices the analysis path works with
//! (tens of metrics, hundreds of repositories). Rows are `Vec<f64>`.

use statrs::statistics::Statistics;

const MAX_SWEEPS: usize = 100;

pub fn column(rows: &[Vec<f64>], index: usize) -> Vec<f64> {
    rows.iter().map(|row| row[index]).collect()
}

/// Per-column means; an empty batch yields zeros.
pub fn column_means(rows: &[Vec<f64>], width: usize) -> Vec<f64> {
    if rows.is_empty() {
        return vec![0.0; width];
    }
    (0..width).map(|j| column(rows, j).iter().mean()).collect()
}

/// Covariance with the sample (n - 1) denominator; a single row yields zeros.
pub fn covariance(rows: &[Vec<f64>], width: usize) -> Vec<Vec<f64>> {
    let mut cov = vec![vec![0.0; width]; width];
    if rows.len() < 2 {
        return cov;
    }
    let columns: Vec<Vec<f64>> = (0..width).map(|j| column(rows, j)).collect();
    for i in 0..width {
        for j in i..width {
            cov[i][j] = columns[i].iter().covariance(columns[j].iter());
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Eigenpairs of a symmetric matrix, largest eigenvalue first.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricEigen {
    pub values: Vec<f64>,
    /// `vectors[k]` is the unit eigenvector for `values[k]`, with its
    /// largest-magnitude entry made positive.
    pub vectors: Vec<Vec<f64>>,
}

/// Cyclic Jacobi rotations until the off-diagonal mass vanishes.
pub fn symmetric_eigen(matrix: &[Vec<f64>]) -> SymmetricEigen {
    let n = matrix.len();
    let mut a = matrix.to_vec();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let scale: f64 = a.iter().flatten().map(|x| x * x).sum::<f64>().sqrt();
    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (0..n).filter(move |&q| q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off.sqrt() <= f64::EPSILON * scale.max(f64::MIN_POSITIVE) {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q] == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut pairs: Vec<(f64, Vec<f64>)> = (0..n)
        .map(|k| {
            let mut vector: Vec<f64> = v.iter().map(|row| row[k]).collect();
            let pivot = vector
                .iter()
                .copied()
                .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
            if pivot < 0.0 {
                vector.iter_mut().for_each(|x| *x = -*x);
            }
            (a[k][k], vector)
        })
        .collect();
    pairs.sort_by(|left, right| right.0.total_cmp(&left.0));

    SymmetricEigen {
        values: pairs.iter().map(|(value, _)| *value).collect(),
        vectors: pairs.into_iter().map(|(_, vector)| vector).collect(),
    }
}

/// Minimum-norm solution of `gram · β = rhs` for a symmetric positive
/// semi-definite `gram`; directions with a negligible eigenvalue are dropped.
pub fn solve_symmetric_pinv(gram: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let n = rhs.len();
    let eigen = symmetric_eigen(gram);
    let largest = eigen.values.first().copied().unwrap_or(0.0).abs();
    let tolerance = largest * std::cmp::max(n, 1) as f64 * 1e-12;
    let mut solution = vec![0.0; n];
    for (value, vector) in eigen.values.iter().zip(&eigen.vectors) {
        if *value <= tolerance {
            continue;
        }
        let coefficient = dot(vector, rhs) / value;
        for (slot, component) in solution.iter_mut().zip(vector) {
            *slot += coefficient * component;
        }
    }
    solution
}
