//! Assembly of the mass, damping, stiffness and force matrices
//!
//! DOF ordering: one DOF per story from the ground up, followed by one DOF
//! per TLCD unit. Every TLCD unit sits on the last (top) story.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::elements::{Story, TlcdModel};
use crate::error::DynaResult;
use crate::loads::{time_grid, Excitation};
use crate::math::Mat;

/// Location of the TLCD DOFs in the assembled system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamperDofs {
    /// Index of the first TLCD DOF
    pub first: usize,
    /// Number of TLCD DOFs (one per unit)
    pub count: usize,
    /// Properties shared by every unit
    pub model: TlcdModel,
}

impl DamperDofs {
    /// Indices of every TLCD DOF
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.first..self.first + self.count
    }
}

/// Assembled `M`, `C` and `K` of a structure with its dampers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMatrices {
    pub mass: Mat,
    /// Baseline damping; nonlinear TLCD terms are applied per step on a copy
    pub damping: Mat,
    pub stiffness: Mat,
    /// TLCD DOFs, if any damper is installed
    pub damper: Option<DamperDofs>,
}

impl SystemMatrices {
    /// Total number of DOFs
    pub fn dofs(&self) -> usize {
        self.mass.nrows()
    }

    /// Number of structural (story) DOFs
    pub fn structural_dofs(&self) -> usize {
        self.damper.as_ref().map_or(self.dofs(), |d| d.first)
    }

    /// Largest undamped natural frequency (rad/s)
    pub fn max_natural_frequency(&self) -> Option<f64> {
        crate::math::max_natural_frequency(&self.mass, &self.stiffness)
    }
}

/// Ground acceleration turned into nodal forces on the solver time grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceHistory {
    /// Grid times in s
    pub time: Vec<f64>,
    /// Force per DOF (rows) and time sample (columns)
    pub force: Mat,
}

/// A TLCD with no units behaves exactly like no TLCD at all
fn installed(tlcd: Option<&TlcdModel>) -> Option<&TlcdModel> {
    tlcd.filter(|t| t.amount > 0)
}

fn system_size(stories: &[Story], tlcd: Option<&TlcdModel>) -> usize {
    stories.len() + installed(tlcd).map_or(0, |t| t.amount)
}

/// Assemble the mass matrix
pub fn assemble_mass_matrix(stories: &[Story], tlcd: Option<&TlcdModel>) -> Mat {
    let n = stories.len();
    let size = system_size(stories, tlcd);
    let mut m = Mat::zeros(size, size);

    for (i, story) in stories.iter().enumerate() {
        m[(i, i)] = story.mass;
    }

    if let (Some(tlcd), Some(top)) = (installed(tlcd), n.checked_sub(1)) {
        m[(top, top)] += tlcd.total_mass();
        let coupling = tlcd.coupling_mass();
        for dof in n..n + tlcd.amount {
            m[(dof, dof)] = tlcd.mass;
            m[(dof, top)] = coupling;
            m[(top, dof)] = coupling;
        }
    }

    m
}

/// Assemble the damping matrix from the structural damping ratio
pub fn assemble_damping_matrix(
    stories: &[Story],
    tlcd: Option<&TlcdModel>,
    damping_ratio: f64,
) -> Mat {
    let n = stories.len();
    let size = system_size(stories, tlcd);
    let mut c = Mat::zeros(size, size);
    let tlcd = installed(tlcd);

    for (i, story) in stories.iter().enumerate() {
        let attached = match tlcd {
            Some(t) if i + 1 == n => t.total_mass(),
            _ => 0.0,
        };
        c[(i, i)] = story.damping_coefficient(damping_ratio, attached);
    }

    if let Some(tlcd) = tlcd {
        for dof in n..n + tlcd.amount {
            c[(dof, dof)] = tlcd.damping_coefficient;
        }
    }

    c
}

/// Assemble the shear-building stiffness matrix
pub fn assemble_stiffness_matrix(stories: &[Story], tlcd: Option<&TlcdModel>) -> Mat {
    let n = stories.len();
    let size = system_size(stories, tlcd);
    let mut k = Mat::zeros(size, size);

    for (i, story) in stories.iter().enumerate() {
        k[(i, i)] = story.stiffness();
    }

    // Columns of story i also resist the drift of the floor below
    for i in 1..n {
        let ki = stories[i].stiffness();
        k[(i, i - 1)] = -ki;
        k[(i - 1, i)] = -ki;
        k[(i - 1, i - 1)] += ki;
    }

    if let Some(tlcd) = installed(tlcd) {
        for dof in n..n + tlcd.amount {
            k[(dof, dof)] = tlcd.stiffness;
        }
    }

    k
}

/// Assemble `M`, `C` and `K` together
pub fn assemble_system(
    stories: &[Story],
    tlcd: Option<&TlcdModel>,
    damping_ratio: f64,
) -> SystemMatrices {
    let mass = assemble_mass_matrix(stories, tlcd);
    let damping = assemble_damping_matrix(stories, tlcd, damping_ratio);
    let stiffness = assemble_stiffness_matrix(stories, tlcd);
    let damper = installed(tlcd).map(|t| DamperDofs {
        first: stories.len(),
        count: t.amount,
        model: t.clone(),
    });

    debug!(
        "Assembled {} DOF system ({} stories, {} TLCD units)",
        mass.nrows(),
        stories.len(),
        damper.as_ref().map_or(0, |d| d.count)
    );

    SystemMatrices {
        mass,
        damping,
        stiffness,
        damper,
    }
}

/// Assemble the force matrix for a base excitation.
///
/// Each structural DOF receives its lumped mass times the ground acceleration;
/// the TLCD DOFs (rows `structural_dofs..`) receive no direct force.
pub fn assemble_force_matrix(
    excitation: &Excitation,
    mass: &Mat,
    structural_dofs: usize,
    dt: f64,
    reference_frequency: f64,
) -> DynaResult<ForceHistory> {
    let time = time_grid(excitation.analysis_duration(), dt);
    let ground = excitation.sample(&time, dt, reference_frequency)?;

    let mut force = Mat::zeros(mass.nrows(), time.len());
    for i in 0..structural_dofs.min(mass.nrows()) {
        let story_mass = mass[(i, i)];
        for (j, a) in ground.iter().enumerate() {
            force[(i, j)] = story_mass * a;
        }
    }

    Ok(ForceHistory { time, force })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FluidProperties;
    use crate::elements::{Support, Tlcd};
    use crate::loads::SineWave;
    use approx::assert_relative_eq;

    fn three_stories() -> Vec<Story> {
        vec![
            Story::new(12.0e3, 3.5, 0.4, 0.4, 25.0e9, Support::FixedFixed),
            Story::new(10.0e3, 3.0, 0.35, 0.35, 25.0e9, Support::FixedPinned),
            Story::new(8.0e3, 3.0, 0.3, 0.3, 25.0e9, Support::PinnedPinned),
        ]
    }

    fn tlcd(amount: usize) -> TlcdModel {
        let tlcd = Tlcd::basic(0.3, 5.0, 1.0).with_amount(amount);
        TlcdModel::new(&tlcd, &FluidProperties::water(), false).unwrap()
    }

    #[test]
    fn test_mass_matrix_with_tlcd() {
        let stories = three_stories();
        let t = tlcd(2);
        let m = assemble_mass_matrix(&stories, Some(&t));
        assert_eq!(m.shape(), (5, 5));
        assert_relative_eq!(m[(2, 2)], 8.0e3 + 2.0 * t.mass, max_relative = 1e-12);
        for dof in 3..5 {
            assert_relative_eq!(m[(dof, dof)], t.mass);
            assert_relative_eq!(m[(dof, 2)], t.width / t.length * t.mass);
            assert_eq!(m[(dof, 2)], m[(2, dof)]);
        }
        assert_eq!(m[(3, 4)], 0.0);
        assert_eq!(m[(0, 3)], 0.0);
    }

    #[test]
    fn test_stiffness_is_tridiagonal() {
        let stories = three_stories();
        let k = assemble_stiffness_matrix(&stories, Some(&tlcd(1)));
        let (k1, k2, k3) = (
            stories[0].stiffness(),
            stories[1].stiffness(),
            stories[2].stiffness(),
        );
        assert_relative_eq!(k[(0, 0)], k1 + k2, max_relative = 1e-12);
        assert_relative_eq!(k[(1, 1)], k2 + k3, max_relative = 1e-12);
        assert_relative_eq!(k[(2, 2)], k3, max_relative = 1e-12);
        assert_eq!(k[(0, 1)], -k2);
        assert_eq!(k[(2, 1)], -k3);
        assert_eq!(k[(0, 2)], 0.0);
        assert_eq!(k[(3, 2)], 0.0);
        assert_eq!(k[(3, 3)], tlcd(1).stiffness);
        assert_eq!(k, k.transpose());
    }

    #[test]
    fn test_damping_uses_tlcd_mass_on_top_story() {
        let stories = three_stories();
        let t = tlcd(1);
        let c = assemble_damping_matrix(&stories, Some(&t), 0.05);
        assert_relative_eq!(c[(0, 0)], stories[0].damping_coefficient(0.05, 0.0));
        assert_relative_eq!(c[(2, 2)], stories[2].damping_coefficient(0.05, t.mass));
        assert_relative_eq!(c[(3, 3)], t.damping_coefficient);
    }

    #[test]
    fn test_zero_amount_matches_no_tlcd() {
        let stories = three_stories();
        let none = assemble_system(&stories, None, 0.02);
        let empty = assemble_system(&stories, Some(&tlcd(0)), 0.02);
        assert_eq!(none, empty);
        assert_eq!(empty.dofs(), 3);
        assert!(empty.damper.is_none());

        let excitation = Excitation::Sine(SineWave::new(1.0, 2.0, 1.0, 1.0));
        let f = assemble_force_matrix(&excitation, &empty.mass, empty.structural_dofs(), 0.01, 0.0)
            .unwrap();
        assert_eq!(f.force.nrows(), 3);
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let stories = three_stories();
        let t = tlcd(3);
        let first = assemble_system(&stories, Some(&t), 0.02);
        let second = assemble_system(&stories, Some(&t), 0.02);
        assert_eq!(first, second);
    }

    #[test]
    fn test_force_matrix_rows() {
        let stories = three_stories();
        let t = tlcd(1);
        let system = assemble_system(&stories, Some(&t), 0.02);
        let excitation = Excitation::Sine(SineWave::new(2.0, 3.0, 0.5, 1.0));
        let f = assemble_force_matrix(&excitation, &system.mass, system.structural_dofs(), 0.01, 0.0)
            .unwrap();
        assert_eq!(f.force.shape(), (4, 101));
        assert_eq!(f.time.len(), 101);
        let expected = system.mass[(2, 2)] * 2.0 * (3.0_f64 * 0.25).sin();
        assert_relative_eq!(f.force[(2, 25)], expected, max_relative = 1e-12);
        assert!(f.force.row(3).iter().all(|&v| v == 0.0));
        assert!(f.force.column(80).iter().all(|&v| v == 0.0));
    }
}
