//! Planar homography estimation: normalized DLT and a RANSAC wrapper.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAMPLE_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    TooFewPoints { needed: usize, got: usize },
    LengthMismatch { src: usize, dst: usize },
    NumericalFailure(String),
    /// No non-degenerate minimal sample produced a model
    NoConsensus,
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HomographyError::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            HomographyError::LengthMismatch { src, dst } => {
                write!(f, "{} source points but {} destination points", src, dst)
            }
            HomographyError::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
            HomographyError::NoConsensus => write!(f, "no valid model found"),
        }
    }
}

impl std::error::Error for HomographyError {}

/// Map `(x, y)` through `h`; NaN when the point goes to infinity
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

fn squared_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let (dx, dy) = (p[0] - dst[0], p[1] - dst[1]);
    let e = dx * dx + dy * dy;
    if e.is_nan() {
        f64::INFINITY
    } else {
        e
    }
}

/// Translate the centroid to the origin and scale the mean distance to sqrt(2)
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-15 { std::f64::consts::SQRT_2 / mean_dist } else { 1.0 };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    (t, normalized)
}

/// Least-squares homography with `dst ~ project(H, src)` from four or more
/// correspondences, scaled so that `H[(2, 2)] = 1` when possible.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch { src: src.len(), dst: dst.len() });
    }
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(HomographyError::TooFewPoints { needed: SAMPLE_SIZE, got: n });
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = src_n[i];
        let [dx, dy] = dst_n[i];

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // Null vector of A: eigenvector of the smallest eigenvalue of A^T A
    let eig = SymmetricEigen::new(a.transpose() * &a);
    let min_idx = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.abs().partial_cmp(&y.1.abs()).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::NumericalFailure("normalization not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;
    if h.iter().any(|x| !x.is_finite()) {
        return Err(HomographyError::NumericalFailure("non-finite homography".into()));
    }

    let scale = h[(2, 2)];
    Ok(if scale.abs() < 1e-15 { h } else { h / scale })
}

/// RANSAC settings for homography fitting
#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Upper bound on sampled hypotheses
    pub max_iters: usize,
    /// Maximum reprojection error of an inlier, in pixels
    pub inlier_threshold: f64,
    /// Probability of drawing at least one outlier-free sample
    pub confidence: f64,
    pub seed: u64,
}

impl RansacConfig {
    pub const fn defaults() -> Self {
        Self {
            max_iters: 2000,
            inlier_threshold: 5.0,
            confidence: 0.995,
            seed: 0,
        }
    }
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Debug, Clone)]
pub struct RansacResult {
    pub h: Matrix3<f64>,
    /// `true` for correspondences within the inlier threshold
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
}

fn collinear(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> bool {
    let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
    let scale = ((b[0] - a[0]).abs() + (b[1] - a[1]).abs())
        * ((c[0] - a[0]).abs() + (c[1] - a[1]).abs());
    cross.abs() <= 1e-9 * scale.max(1e-12)
}

/// Any three of the four sample points on one line
fn degenerate(pts: &[[f64; 2]; SAMPLE_SIZE]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|t| collinear(&pts[t[0]], &pts[t[1]], &pts[t[2]]))
}

fn score(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], threshold_sq: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(s, d)| squared_error(h, s, d) <= threshold_sq)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

fn required_iterations(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
    let outlier_free = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if outlier_free >= 1.0 - f64::EPSILON {
        return 1;
    }
    if outlier_free <= f64::EPSILON {
        return max_iters;
    }
    let n = (1.0 - confidence).ln() / (1.0 - outlier_free).ln();
    if n.is_finite() {
        (n.ceil() as usize).clamp(1, max_iters)
    } else {
        max_iters
    }
}

/// Fit a homography to correspondences containing outliers.
///
/// Minimal samples are drawn from a seeded generator, so the result is a
/// pure function of the input and `config`. The best hypothesis is refitted
/// on its inliers; the refit is kept unless it explains fewer points.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Result<RansacResult, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch { src: src.len(), dst: dst.len() });
    }
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(HomographyError::TooFewPoints { needed: SAMPLE_SIZE, got: n });
    }

    let threshold_sq = config.inlier_threshold * config.inlier_threshold;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut iterations = config.max_iters;
    let mut iter = 0;

    while iter < iterations {
        iter += 1;
        let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let mut s4 = [[0.0; 2]; SAMPLE_SIZE];
        let mut d4 = [[0.0; 2]; SAMPLE_SIZE];
        for (k, i) in idx.iter().enumerate() {
            s4[k] = src[i];
            d4[k] = dst[i];
        }
        if degenerate(&s4) || degenerate(&d4) {
            continue;
        }

        let h = match estimate_homography_dlt(&s4, &d4) {
            Ok(h) => h,
            Err(_) => continue,
        };
        let (mask, count) = score(&h, src, dst, threshold_sq);
        if best.as_ref().map_or(true, |b| count > b.2) {
            iterations = required_iterations(config.confidence, count as f64 / n as f64, config.max_iters)
                .max(iter);
            best = Some((h, mask, count));
        }
    }

    let (mut h, mut mask, mut count) = best.ok_or(HomographyError::NoConsensus)?;

    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| mask[i]).map(|i| dst[i]).collect();
    if let Ok(refit) = estimate_homography_dlt(&inlier_src, &inlier_dst) {
        let (refit_mask, refit_count) = score(&refit, src, dst, threshold_sq);
        if refit_count >= count {
            h = refit;
            mask = refit_mask;
            count = refit_count;
        }
    }

    log::debug!("RANSAC: {} of {} inliers after {} iterations", count, n, iter);
    Ok(RansacResult { h, inlier_mask: mask, n_inliers: count })
}
