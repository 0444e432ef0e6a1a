//! Frequency sweep building the DMF curve of a structure
//!
//! The assembled system is shared read-only; each frequency rebuilds its own
//! force matrix and runs an independent central-difference solve.

use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "parallel")]
use std::sync::atomic::AtomicUsize;

use log::info;
use serde::{Deserialize, Serialize};

use crate::assembly::{assemble_force_matrix, SystemMatrices};
use crate::error::{DynaError, DynaResult};
use crate::loads::{Excitation, SineWave};
use crate::results::DmfSummary;
use crate::solver::{CentralDifference, SolverOptions};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Excitation frequencies of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values")]
pub enum Frequencies {
    /// Angular frequencies in rad/s
    Absolute(Vec<f64>),
    /// Ratios of the system's largest natural frequency
    Relative(Vec<f64>),
}

impl From<Vec<f64>> for Frequencies {
    fn from(value: Vec<f64>) -> Self {
        Frequencies::Absolute(value)
    }
}

impl Frequencies {
    pub fn len(&self) -> usize {
        match self {
            Self::Absolute(v) | Self::Relative(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_angular(&self, reference_frequency: Option<f64>) -> DynaResult<Vec<f64>> {
        match self {
            Self::Absolute(omegas) => Ok(omegas.clone()),
            Self::Relative(ratios) => {
                let reference = reference_frequency.ok_or(DynaError::SingularMatrix("mass"))?;
                Ok(ratios.iter().map(|r| r * reference).collect())
            }
        }
    }
}

/// DMF and peak displacement per frequency, `[frequency][dof]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    /// Excitation angular frequencies in rad/s
    pub frequencies: Vec<f64>,
    /// Largest undamped natural frequency of the system (rad/s)
    pub reference_frequency: Option<f64>,
    /// Loaded DOFs reported in every row
    pub dofs: Vec<usize>,
    pub dmf: Vec<Vec<f64>>,
    pub max_displacement: Vec<Vec<f64>>,
}

impl SweepResult {
    /// Frequencies as ratios of the reference frequency
    pub fn ratios(&self) -> Option<Vec<f64>> {
        self.reference_frequency
            .map(|w| self.frequencies.iter().map(|f| f / w).collect())
    }

    /// DMF curve of one DOF across the sweep
    pub fn dmf_curve(&self, dof: usize) -> Option<Vec<f64>> {
        let column = self.dofs.iter().position(|&d| d == dof)?;
        Some(self.dmf.iter().map(|row| row[column]).collect())
    }

    /// Frequency (rad/s) and value of the largest DMF of `dof`
    pub fn peak(&self, dof: usize) -> Option<(f64, f64)> {
        let curve = self.dmf_curve(dof)?;
        curve
            .iter()
            .zip(&self.frequencies)
            .map(|(&dmf, &w)| (w, dmf))
            .reduce(|best, item| if item.1 > best.1 { item } else { best })
    }
}

/// Sweep runner over a shared system.
///
/// ```ignore
/// let result = FrequencySweep::new(&system, &sine, options)
///     .with_progress(&|p| println!("{:.0}%", p * 100.0))
///     .run(&Frequencies::Relative(config.dmf_ratios()))?;
/// ```
pub struct FrequencySweep<'a> {
    system: &'a SystemMatrices,
    template: &'a SineWave,
    options: SolverOptions,
    progress: Option<&'a (dyn Fn(f64) + Sync)>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> FrequencySweep<'a> {
    /// `template` supplies amplitude and durations; its frequency is replaced per run
    pub fn new(system: &'a SystemMatrices, template: &'a SineWave, options: SolverOptions) -> Self {
        Self {
            system,
            template,
            options,
            progress: None,
            cancel: None,
        }
    }

    /// Called with the completed fraction after each frequency
    pub fn with_progress(mut self, progress: &'a (dyn Fn(f64) + Sync)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Stop before the next frequency once `cancel` is set
    pub fn with_cancel(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn report(&self, completed: usize, total: usize) {
        if let Some(progress) = self.progress {
            progress(completed as f64 / total as f64);
        }
    }

    /// Solve at one angular frequency
    pub fn run_single(&self, omega: f64) -> DynaResult<DmfSummary> {
        let sine = SineWave {
            frequency: omega,
            relative_frequency: false,
            ..self.template.clone()
        };
        let excitation = Excitation::Sine(sine);
        let history = assemble_force_matrix(
            &excitation,
            &self.system.mass,
            self.system.structural_dofs(),
            self.options.time_step,
            0.0,
        )?;
        let response =
            CentralDifference::new(self.system, self.options).solve(&history.time, &history.force)?;
        DmfSummary::compute(&response.displacement, &history.force, &self.system.stiffness)
    }

    /// Run every frequency, in order
    pub fn run(&self, frequencies: &Frequencies) -> DynaResult<SweepResult> {
        if frequencies.is_empty() {
            return Err(DynaError::InvalidInput(
                "frequency sweep needs at least one frequency".to_string(),
            ));
        }
        if !(self.template.excitation_duration > 0.0) {
            return Err(DynaError::InvalidExcitation(
                "sweep excitation duration must be positive".to_string(),
            ));
        }

        let reference = self.system.max_natural_frequency();
        let omegas = frequencies.to_angular(reference)?;
        let total = omegas.len();
        info!(
            "Starting frequency sweep: {} frequencies from {:.3} to {:.3} rad/s",
            total,
            omegas.first().copied().unwrap_or_default(),
            omegas.last().copied().unwrap_or_default()
        );

        let summaries = self.run_all(&omegas)?;
        let dofs: Vec<usize> = (0..self.system.structural_dofs()).collect();

        let mut dmf = Vec::with_capacity(total);
        let mut max_displacement = Vec::with_capacity(total);
        for summary in &summaries {
            // A DOF left unloaded at this frequency did not move
            dmf.push(dofs.iter().map(|&d| summary.dmf_of(d).unwrap_or(0.0)).collect());
            max_displacement.push(
                dofs.iter()
                    .map(|&d| {
                        summary
                            .dofs
                            .iter()
                            .position(|&s| s == d)
                            .map_or(0.0, |i| summary.max_displacement[i])
                    })
                    .collect(),
            );
        }

        info!("Frequency sweep finished");
        Ok(SweepResult {
            frequencies: omegas,
            reference_frequency: reference,
            dofs,
            dmf,
            max_displacement,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn run_all(&self, omegas: &[f64]) -> DynaResult<Vec<DmfSummary>> {
        let total = omegas.len();
        let mut summaries = Vec::with_capacity(total);
        for (completed, &omega) in omegas.iter().enumerate() {
            if self.cancelled() {
                return Err(DynaError::Cancelled { completed, total });
            }
            summaries.push(self.run_single(omega)?);
            self.report(completed + 1, total);
        }
        Ok(summaries)
    }

    #[cfg(feature = "parallel")]
    fn run_all(&self, omegas: &[f64]) -> DynaResult<Vec<DmfSummary>> {
        let total = omegas.len();
        let completed = AtomicUsize::new(0);
        omegas
            .par_iter()
            .map(|&omega| {
                if self.cancelled() {
                    return Err(DynaError::Cancelled {
                        completed: completed.load(Ordering::Relaxed),
                        total,
                    });
                }
                let summary = self.run_single(omega)?;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                self.report(done, total);
                Ok(summary)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    /// Single DOF, wn = 10 rad/s, 5 % damping
    fn oscillator() -> SystemMatrices {
        let (m, k, zeta) = (1.0, 100.0, 0.05);
        SystemMatrices {
            mass: Mat::from_element(1, 1, m),
            damping: Mat::from_element(1, 1, 2.0 * zeta * (k * m).sqrt()),
            stiffness: Mat::from_element(1, 1, k),
            damper: None,
        }
    }

    fn options() -> SolverOptions {
        SolverOptions {
            time_step: 0.002,
            initial_displacement: 0.0,
            initial_velocity: 0.0,
            nonlinear: false,
        }
    }

    #[test]
    fn test_single_dof_dmf_curve() {
        let system = oscillator();
        let sine = SineWave::new(1.0, 0.0, 20.0, 20.0);
        let result = FrequencySweep::new(&system, &sine, options())
            .run(&Frequencies::Relative(vec![0.05, 0.5, 1.0, 1.5, 4.0]))
            .unwrap();

        assert_eq!(result.reference_frequency.map(|w| w.round()), Some(10.0));
        let curve = result.dmf_curve(0).unwrap();
        assert_eq!(curve.len(), 5);

        // Quasi-static
        assert_relative_eq!(curve[0], 1.0, epsilon = 0.1);
        // Resonance dominates, 1/(2ζ) = 10 at steady state
        assert!(curve[2] > curve[1] && curve[2] > curve[3]);
        assert!(curve[2] > 5.0);
        // Well above resonance the response falls below static
        assert!(curve[4] < 0.5);

        let (w, _) = result.peak(0).unwrap();
        assert_relative_eq!(w, 10.0, epsilon = 0.5);
    }

    #[test]
    fn test_progress_and_order() {
        let system = oscillator();
        let sine = SineWave::new(1.0, 0.0, 2.0, 2.0);
        let seen = Mutex::new(Vec::new());
        let progress = |p: f64| seen.lock().unwrap().push(p);

        let omegas = vec![3.0, 1.0, 2.0];
        let result = FrequencySweep::new(&system, &sine, options())
            .with_progress(&progress)
            .run(&Frequencies::from(omegas.clone()))
            .unwrap();

        assert_eq!(result.frequencies, omegas);
        let mut seen = seen.into_inner().unwrap();
        seen.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(seen.len(), 3);
        assert_relative_eq!(seen[2], 1.0);
    }

    #[test]
    fn test_cancel_before_start() {
        let system = oscillator();
        let sine = SineWave::new(1.0, 0.0, 1.0, 1.0);
        let cancel = AtomicBool::new(true);
        let result = FrequencySweep::new(&system, &sine, options())
            .with_cancel(&cancel)
            .run(&Frequencies::Relative(vec![0.5, 1.0, 1.5]));
        assert!(matches!(
            result,
            Err(DynaError::Cancelled { completed: 0, total: 3 })
        ));
    }

    #[test]
    fn test_empty_sweep_is_rejected() {
        let system = oscillator();
        let sine = SineWave::new(1.0, 0.0, 1.0, 1.0);
        let result = FrequencySweep::new(&system, &sine, options()).run(&Frequencies::Absolute(vec![]));
        assert!(matches!(result, Err(DynaError::InvalidInput(_))));
    }
}
