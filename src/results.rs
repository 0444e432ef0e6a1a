//! Result types for dynamic analysis

use serde::{Deserialize, Serialize};

use crate::error::{DynaError, DynaResult};
use crate::math::{row_abs_max, Mat};

/// Time histories of every DOF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicResponse {
    /// Sample times in s
    pub time: Vec<f64>,
    /// Displacement `[dof][time]` in m
    pub displacement: Mat,
    /// Velocity `[dof][time]` in m/s
    pub velocity: Mat,
    /// Acceleration `[dof][time]` in m/s²
    pub acceleration: Mat,
}

impl DynamicResponse {
    /// Number of DOFs
    pub fn dofs(&self) -> usize {
        self.displacement.nrows()
    }

    /// Number of time samples
    pub fn steps(&self) -> usize {
        self.time.len()
    }

    /// Displacement history of one DOF
    pub fn displacement_history(&self, dof: usize) -> Option<Vec<f64>> {
        (dof < self.dofs()).then(|| self.displacement.row(dof).iter().copied().collect())
    }

    /// Peak |x| of every DOF
    pub fn peak_displacements(&self) -> Vec<f64> {
        row_abs_max(&self.displacement)
    }
}

/// Dynamic magnification factor of the loaded DOFs.
///
/// `DMF = max|x| / (max|F| / K[dof, dof])`. DOFs never loaded (peak force
/// zero, such as the TLCD DOFs under base excitation) are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DmfSummary {
    /// Indices of the reported DOFs
    pub dofs: Vec<usize>,
    /// DMF of each reported DOF
    pub dmf: Vec<f64>,
    /// Peak |x| of each reported DOF in m
    pub max_displacement: Vec<f64>,
}

impl DmfSummary {
    pub fn compute(displacement: &Mat, force: &Mat, stiffness: &Mat) -> DynaResult<Self> {
        let n = stiffness.nrows();
        if displacement.nrows() != n || force.nrows() != n || stiffness.ncols() != n {
            return Err(DynaError::DimensionMismatch(format!(
                "DMF needs {} rows everywhere: displacement has {}, force has {}",
                n,
                displacement.nrows(),
                force.nrows()
            )));
        }

        let peak_x = row_abs_max(displacement);
        let peak_f = row_abs_max(force);

        let mut summary = Self::default();
        for dof in 0..n {
            if peak_f[dof] == 0.0 {
                continue;
            }
            let static_displacement = peak_f[dof] / stiffness[(dof, dof)];
            summary.dofs.push(dof);
            summary.dmf.push(peak_x[dof] / static_displacement);
            summary.max_displacement.push(peak_x[dof]);
        }
        Ok(summary)
    }

    /// DMF of `dof`, if it was loaded
    pub fn dmf_of(&self, dof: usize) -> Option<f64> {
        self.dofs
            .iter()
            .position(|&d| d == dof)
            .map(|i| self.dmf[i])
    }

    /// Largest DMF among the reported DOFs
    pub fn max_dmf(&self) -> Option<f64> {
        self.dmf.iter().copied().reduce(f64::max)
    }
}

/// Everything produced by a single time-history analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub response: DynamicResponse,
    pub dmf: DmfSummary,
    /// Undamped natural frequencies of the assembled system (rad/s), ascending
    pub natural_frequencies: Vec<f64>,
}

impl AnalysisOutput {
    /// Peak |x| of every DOF
    pub fn peak_displacements(&self) -> Vec<f64> {
        self.response.peak_displacements()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dmf_skips_unloaded_dofs() {
        let x = Mat::from_row_slice(2, 3, &[0.0, 0.02, -0.04, 0.0, 0.5, 0.1]);
        let f = Mat::from_row_slice(2, 3, &[0.0, 100.0, -200.0, 0.0, 0.0, 0.0]);
        let k = Mat::from_row_slice(2, 2, &[1.0e4, 0.0, 0.0, 50.0]);

        let summary = DmfSummary::compute(&x, &f, &k).unwrap();
        assert_eq!(summary.dofs, vec![0]);
        // static = 200 / 1e4 = 0.02
        assert_relative_eq!(summary.dmf[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(summary.max_displacement[0], 0.04);
        assert_eq!(summary.dmf_of(1), None);
        assert_eq!(summary.max_dmf(), Some(summary.dmf[0]));
    }

    #[test]
    fn test_dmf_rejects_mismatched_rows() {
        let x = Mat::zeros(2, 3);
        let f = Mat::zeros(3, 3);
        let k = Mat::identity(2, 2);
        assert!(DmfSummary::compute(&x, &f, &k).is_err());
    }

    #[test]
    fn test_response_histories() {
        let response = DynamicResponse {
            time: vec![0.0, 0.1],
            displacement: Mat::from_row_slice(1, 2, &[0.0, -0.3]),
            velocity: Mat::zeros(1, 2),
            acceleration: Mat::zeros(1, 2),
        };
        assert_eq!(response.steps(), 2);
        assert_eq!(response.displacement_history(0), Some(vec![0.0, -0.3]));
        assert_eq!(response.displacement_history(1), None);
        assert_eq!(response.peak_displacements(), vec![0.3]);
    }
}
