//! Analysis configuration

use serde::{Deserialize, Serialize};

use crate::error::{DynaError, DynaResult};

/// Time integration method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    /// Explicit central-difference (finite difference) recurrence
    CentralDifference,
}

impl IntegrationMethod {
    /// Label used by the legacy setup files
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Self::CentralDifference => "Método das Diferenças Finitas",
        }
    }

    /// Parse a method label, legacy or English
    pub fn from_label(label: &str) -> DynaResult<Self> {
        match label.trim().to_lowercase().as_str() {
            "método das diferenças finitas" | "metodo das diferencas finitas"
            | "central difference" | "centraldifference" | "finite difference" => {
                Ok(Self::CentralDifference)
            }
            _ => Err(DynaError::InvalidInput(format!(
                "unsupported integration method '{}'",
                label
            ))),
        }
    }
}

impl Default for IntegrationMethod {
    fn default() -> Self {
        Self::CentralDifference
    }
}

/// Properties of the liquid filling the TLCD and the environment it works in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FluidProperties {
    /// Liquid specific mass in kg/m³
    pub specific_mass: f64,
    /// Kinematic viscosity in m²/s
    pub kinematic_viscosity: f64,
    /// Absolute pipe roughness in m
    pub pipe_roughness: f64,
    /// Gravity acceleration in m/s²
    pub gravity: f64,
}

impl FluidProperties {
    /// Water at 20 °C in a smooth pipe
    pub fn water() -> Self {
        Self {
            specific_mass: 998.2071,
            kinematic_viscosity: 1.003e-6,
            pipe_roughness: 0.0015e-3,
            gravity: 9.807,
        }
    }
}

impl Default for FluidProperties {
    fn default() -> Self {
        Self::water()
    }
}

/// Global knobs for a dynamic analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configurations {
    /// Integration method
    pub method: IntegrationMethod,
    /// Time step between iterations (s)
    pub time_step: f64,
    /// Initial displacement applied to every DOF (m)
    pub initial_displacement: f64,
    /// Initial velocity applied to every DOF (m/s)
    pub initial_velocity: f64,
    /// Structural damping as a fraction of critical damping
    pub damping_ratio: f64,
    /// TLCD liquid and gravity
    pub fluid: FluidProperties,
    /// Model TLCD damping with the velocity-dependent orifice law
    pub nonlinear_analysis: bool,
    /// Number of frequency points in a DMF sweep
    pub dmf_points: usize,
    /// Upper sweep limit as a multiple of the largest natural frequency
    pub dmf_upper_limit_factor: f64,
}

impl Default for Configurations {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::CentralDifference,
            time_step: 0.005,
            initial_displacement: 0.0,
            initial_velocity: 0.0,
            damping_ratio: 0.02,
            fluid: FluidProperties::water(),
            nonlinear_analysis: true,
            dmf_points: 200,
            dmf_upper_limit_factor: 2.0,
        }
    }
}

impl Configurations {
    /// Configurations for a linear analysis (constant TLCD damping)
    pub fn linear() -> Self {
        Self {
            nonlinear_analysis: false,
            ..Self::default()
        }
    }

    /// Configurations for a nonlinear analysis (orifice damping)
    pub fn nonlinear() -> Self {
        Self {
            nonlinear_analysis: true,
            ..Self::default()
        }
    }

    /// Set the integration time step
    pub fn with_time_step(mut self, dt: f64) -> Self {
        self.time_step = dt;
        self
    }

    /// Set the initial conditions
    pub fn with_initial_conditions(mut self, displacement: f64, velocity: f64) -> Self {
        self.initial_displacement = displacement;
        self.initial_velocity = velocity;
        self
    }

    /// Set the structural damping ratio
    pub fn with_damping_ratio(mut self, ratio: f64) -> Self {
        self.damping_ratio = ratio;
        self
    }

    /// Set the TLCD fluid properties
    pub fn with_fluid(mut self, fluid: FluidProperties) -> Self {
        self.fluid = fluid;
        self
    }

    /// Set the DMF sweep discretization
    pub fn with_dmf_sweep(mut self, points: usize, upper_limit_factor: f64) -> Self {
        self.dmf_points = points;
        self.dmf_upper_limit_factor = upper_limit_factor;
        self
    }

    /// Frequency ratios swept by default: `factor * k / points` for `k = 1..=points`
    pub fn dmf_ratios(&self) -> Vec<f64> {
        let n = self.dmf_points;
        (1..=n)
            .map(|k| self.dmf_upper_limit_factor * k as f64 / n as f64)
            .collect()
    }

    /// Check every knob against its physical range
    pub fn validate(&self) -> DynaResult<()> {
        let fail = |msg: &str| Err(DynaError::InvalidConfiguration(msg.to_string()));

        if !(self.time_step > 0.0) || !self.time_step.is_finite() {
            return fail("time step must be positive");
        }
        if !self.initial_displacement.is_finite() || !self.initial_velocity.is_finite() {
            return fail("initial conditions must be finite");
        }
        if !(0.0..1.0).contains(&self.damping_ratio) {
            return fail("damping ratio must lie in [0, 1)");
        }
        if !(self.fluid.specific_mass > 0.0) {
            return fail("liquid specific mass must be positive");
        }
        if !(self.fluid.kinematic_viscosity > 0.0) {
            return fail("kinematic viscosity must be positive");
        }
        if !(self.fluid.pipe_roughness >= 0.0) {
            return fail("pipe roughness must not be negative");
        }
        if !(self.fluid.gravity > 0.0) {
            return fail("gravity must be positive");
        }
        if self.dmf_points == 0 {
            return fail("DMF sweep needs at least one point");
        }
        if !(self.dmf_upper_limit_factor > 0.0) {
            return fail("DMF upper limit factor must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = Configurations::default();
        assert!(config.validate().is_ok());
        assert!(config.nonlinear_analysis);
        assert_eq!(config.fluid.gravity, 9.807);
    }

    #[test]
    fn test_dmf_ratios_cover_upper_limit() {
        let config = Configurations::default().with_dmf_sweep(200, 2.0);
        let ratios = config.dmf_ratios();
        assert_eq!(ratios.len(), 200);
        assert_relative_eq!(ratios[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(ratios[199], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_time_step() {
        let config = Configurations::default().with_time_step(0.0);
        assert!(matches!(
            config.validate(),
            Err(DynaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let json = r#"{"time_step": 0.01, "exec": "rm -rf"}"#;
        assert!(serde_json::from_str::<Configurations>(json).is_err());
    }
}
