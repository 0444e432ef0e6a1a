//! Explicit central-difference time integration
//!
//! Solves `M ẍ + C ẋ + K x = F(t)` on a fixed grid with the recurrence
//!
//! ```text
//! α = M/dt² − C/(2dt)     β = K − 2M/dt²     γ = M/dt² + C/(2dt)
//! x[i+1] = γ⁻¹ (F[i] − β x[i] − α x[i−1])
//! ```
//!
//! started from the fictitious displacement `x[−1] = x0 − v0·dt + a0·dt²/2`.
//! Velocity and acceleration are recovered afterwards from central
//! differences of the displacement history.
//!
//! The scheme is only conditionally stable (`dt < 2/ω_max`). The bound is
//! reported with a warning and never enforced.

use log::{debug, info, warn};
use nalgebra::DVector;

use crate::analysis::Configurations;
use crate::assembly::{DamperDofs, SystemMatrices};
use crate::error::{DynaError, DynaResult};
use crate::math::Mat;
use crate::results::DynamicResponse;

/// Integration settings taken from the analysis configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Time step (s)
    pub time_step: f64,
    /// Initial displacement of every DOF (m)
    pub initial_displacement: f64,
    /// Initial velocity of every DOF (m/s)
    pub initial_velocity: f64,
    /// Apply the velocity-dependent TLCD damping at every step
    pub nonlinear: bool,
}

impl From<&Configurations> for SolverOptions {
    fn from(config: &Configurations) -> Self {
        Self {
            time_step: config.time_step,
            initial_displacement: config.initial_displacement,
            initial_velocity: config.initial_velocity,
            nonlinear: config.nonlinear_analysis,
        }
    }
}

/// Damping matrix for one step of a nonlinear analysis.
///
/// Each TLCD diagonal entry is replaced by the baseline coefficient plus the
/// orifice damping at the estimated liquid velocity of that unit. The
/// baseline matrix is never modified, so corrections cannot accumulate.
pub fn effective_damping(baseline: &Mat, damper: &DamperDofs, velocities: &[f64]) -> Mat {
    let mut c = baseline.clone();
    for (dof, &velocity) in damper.indices().zip(velocities) {
        c[(dof, dof)] = baseline[(dof, dof)] + damper.model.effective_damping(velocity);
    }
    c
}

/// Central-difference integrator over an assembled system
pub struct CentralDifference<'a> {
    system: &'a SystemMatrices,
    options: SolverOptions,
}

impl<'a> CentralDifference<'a> {
    /// Create an integrator. Matrix shapes are checked when solving.
    pub fn new(system: &'a SystemMatrices, options: SolverOptions) -> Self {
        Self { system, options }
    }

    /// Whether the per-step TLCD damping correction is active
    fn is_nonlinear(&self) -> bool {
        self.options.nonlinear && self.system.damper.is_some()
    }

    fn check_shapes(&self, force: &Mat) -> DynaResult<()> {
        let n = self.system.dofs();
        let square = |m: &Mat, name: &str| -> DynaResult<()> {
            if m.shape() != (n, n) {
                return Err(DynaError::DimensionMismatch(format!(
                    "{} matrix is {}x{}, expected {}x{}",
                    name,
                    m.nrows(),
                    m.ncols(),
                    n,
                    n
                )));
            }
            Ok(())
        };
        square(&self.system.mass, "mass")?;
        square(&self.system.damping, "damping")?;
        square(&self.system.stiffness, "stiffness")?;

        if force.nrows() != n {
            return Err(DynaError::DimensionMismatch(format!(
                "force matrix has {} rows for a {} DOF system",
                force.nrows(),
                n
            )));
        }
        if force.ncols() < 2 {
            return Err(DynaError::InvalidInput(
                "analysis must span at least two time samples".to_string(),
            ));
        }
        if !(self.options.time_step > 0.0) {
            return Err(DynaError::InvalidConfiguration(
                "time step must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn warn_if_unstable(&self) {
        if let Some(omega_max) = self.system.max_natural_frequency() {
            let critical = 2.0 / omega_max;
            if self.options.time_step >= critical {
                warn!(
                    "Time step {:.3e}s exceeds the central-difference stability bound {:.3e}s (2/ω_max); results may diverge",
                    self.options.time_step, critical
                );
            }
        }
    }

    /// Integrate the response to `force` (one row per DOF, one column per time sample)
    pub fn solve(&self, time: &[f64], force: &Mat) -> DynaResult<DynamicResponse> {
        self.check_shapes(force)?;
        if time.len() != force.ncols() {
            return Err(DynaError::DimensionMismatch(format!(
                "{} time samples for {} force columns",
                time.len(),
                force.ncols()
            )));
        }
        self.warn_if_unstable();

        let SystemMatrices {
            mass: m,
            damping: c,
            stiffness: k,
            ..
        } = self.system;
        let n = self.system.dofs();
        let steps = force.ncols();
        let dt = self.options.time_step;
        let dt2 = dt * dt;

        let x0 = DVector::from_element(n, self.options.initial_displacement);
        let v0 = DVector::from_element(n, self.options.initial_velocity);

        // Equation of motion at t = 0
        let c0 = match (&self.system.damper, self.is_nonlinear()) {
            (Some(damper), true) => {
                effective_damping(c, damper, &vec![self.options.initial_velocity; damper.count])
            }
            _ => c.clone(),
        };
        let f0 = force.column(0).into_owned();
        let a0 = m
            .clone()
            .lu()
            .solve(&(f0 - &c0 * &v0 - k * &x0))
            .ok_or(DynaError::SingularMatrix("mass"))?;

        let x_before = &x0 - &v0 * dt + &a0 * (dt2 / 2.0);

        let m_dt2 = m / dt2;
        let beta = k - &m_dt2 * 2.0;

        let mut x = Mat::zeros(n, steps);
        x.set_column(0, &x0);

        // One extra step past the last sample feeds the final central difference
        let x_after = if self.is_nonlinear() {
            self.integrate_nonlinear(force, &m_dt2, &beta, &x_before, &mut x)?
        } else {
            self.integrate_linear(force, &m_dt2, &beta, &x_before, &mut x)?
        };

        let mut v = Mat::zeros(n, steps);
        let mut a = Mat::zeros(n, steps);
        for i in 0..steps {
            let next = if i + 1 < steps {
                x.column(i + 1).into_owned()
            } else {
                x_after.clone()
            };
            let prev = if i == 0 {
                x_before.clone()
            } else {
                x.column(i - 1).into_owned()
            };
            let current = x.column(i);
            v.set_column(i, &((&next - &prev) / (2.0 * dt)));
            a.set_column(i, &((&next - current * 2.0 + &prev) / dt2));
        }

        info!(
            "Central-difference solve finished: {} DOFs, {} steps, dt = {}s{}",
            n,
            steps,
            dt,
            if self.is_nonlinear() { " (nonlinear TLCD)" } else { "" }
        );

        Ok(DynamicResponse {
            time: time.to_vec(),
            displacement: x,
            velocity: v,
            acceleration: a,
        })
    }

    /// Constant-coefficient recurrence; `γ` is factored once
    fn integrate_linear(
        &self,
        force: &Mat,
        m_dt2: &Mat,
        beta: &Mat,
        x_before: &DVector<f64>,
        x: &mut Mat,
    ) -> DynaResult<DVector<f64>> {
        let c_2dt = &self.system.damping / (2.0 * self.options.time_step);
        let alpha = m_dt2 - &c_2dt;
        let gamma = (m_dt2 + &c_2dt).lu();
        let steps = force.ncols();

        let mut x_after = DVector::zeros(x.nrows());
        for i in 0..steps {
            let prev = if i == 0 {
                x_before.clone()
            } else {
                x.column(i - 1).into_owned()
            };
            let rhs = force.column(i) - beta * x.column(i) - &alpha * prev;
            let next = gamma
                .solve(&rhs)
                .ok_or(DynaError::SingularMatrix("effective mass"))?;

            if i + 1 < steps {
                x.set_column(i + 1, &next);
            } else {
                x_after = next;
            }
        }
        Ok(x_after)
    }

    /// Recurrence with the TLCD damping rebuilt from the latest velocity estimate
    fn integrate_nonlinear(
        &self,
        force: &Mat,
        m_dt2: &Mat,
        beta: &Mat,
        x_before: &DVector<f64>,
        x: &mut Mat,
    ) -> DynaResult<DVector<f64>> {
        let damper = match &self.system.damper {
            Some(damper) => damper,
            None => return self.integrate_linear(force, m_dt2, beta, x_before, x),
        };
        let dt = self.options.time_step;
        let steps = force.ncols();
        let mut velocities = vec![self.options.initial_velocity; damper.count];

        let mut x_after = DVector::zeros(x.nrows());
        for i in 0..steps {
            // Central difference around the previous sample: (x[i] − x[i−2]) / 2dt
            if i > 0 {
                for (slot, dof) in velocities.iter_mut().zip(damper.indices()) {
                    let two_back = if i == 1 {
                        x_before[dof]
                    } else {
                        x[(dof, i - 2)]
                    };
                    *slot = (x[(dof, i)] - two_back) / (2.0 * dt);
                }
            }

            let c = effective_damping(&self.system.damping, damper, &velocities);
            let c_2dt = c / (2.0 * dt);
            let alpha = m_dt2 - &c_2dt;
            let gamma = m_dt2 + &c_2dt;

            let prev = if i == 0 {
                x_before.clone()
            } else {
                x.column(i - 1).into_owned()
            };
            let rhs = force.column(i) - beta * x.column(i) - &alpha * prev;
            let next = gamma
                .lu()
                .solve(&rhs)
                .ok_or(DynaError::SingularMatrix("effective mass"))?;

            if i + 1 < steps {
                x.set_column(i + 1, &next);
            } else {
                x_after = next;
            }
        }

        debug!(
            "Nonlinear TLCD damping applied over {} steps on DOFs {:?}",
            steps,
            damper.indices()
        );
        Ok(x_after)
    }
}
