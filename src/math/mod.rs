//! Linear algebra helpers for the dynamic solver

use nalgebra::{DMatrix, SymmetricEigen};

pub type Mat = DMatrix<f64>;

/// Undamped natural frequencies (rad/s) of `K φ = ω² M φ`, ascending.
///
/// The generalized problem is reduced to a standard symmetric one with the
/// Cholesky factor of `M`: `L⁻¹ K L⁻ᵀ ψ = ω² ψ`. Returns `None` when `M` is
/// not positive definite.
pub fn natural_frequencies(mass: &Mat, stiffness: &Mat) -> Option<Vec<f64>> {
    let l = mass.clone().cholesky()?.unpack();
    let l_inv = l.try_inverse()?;
    let reduced = &l_inv * stiffness * l_inv.transpose();
    // Symmetrize away round-off before the eigen solve
    let reduced = (&reduced + reduced.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(reduced);
    let mut omegas: Vec<f64> = eigen
        .eigenvalues
        .iter()
        .map(|&lambda| lambda.max(0.0).sqrt())
        .collect();
    omegas.sort_by(|a, b| a.total_cmp(b));
    Some(omegas)
}

/// Largest undamped natural frequency (rad/s)
pub fn max_natural_frequency(mass: &Mat, stiffness: &Mat) -> Option<f64> {
    natural_frequencies(mass, stiffness)?.last().copied()
}

/// Peak absolute value of each row
pub fn row_abs_max(m: &Mat) -> Vec<f64> {
    m.row_iter()
        .map(|row| row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())))
        .collect()
}
