//! Tuned liquid column damper

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::analysis::FluidProperties;
use crate::error::{DynaError, DynaResult};

/// Default gas column height of a pressurized TLCD (m)
pub const DEFAULT_GAS_HEIGHT: f64 = 0.1;
/// Default gas pressure of a pressurized TLCD (Pa, 2 atm)
pub const DEFAULT_GAS_PRESSURE: f64 = 202_650.0;

/// Ratio of specific heats used for the gas spring
const GAS_POLYTROPIC_INDEX: f64 = 1.4;

/// TLCD variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum TlcdKind {
    /// Open U-tube, hydrostatic restoring force only
    Basic,
    /// Closed U-tube with a pressurized gas column adding a spring term
    Pressurized {
        /// Gas column height in m
        gas_height: f64,
        /// Gas pressure in Pa
        gas_pressure: f64,
    },
}

impl TlcdKind {
    /// Pressurized variant with the default gas column
    pub fn pressurized() -> Self {
        Self::Pressurized {
            gas_height: DEFAULT_GAS_HEIGHT,
            gas_pressure: DEFAULT_GAS_PRESSURE,
        }
    }

    /// Label used by the legacy setup files
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Self::Basic => "TLCD Simples",
            Self::Pressurized { .. } => "TLCD Pressurizado",
        }
    }

    /// Parse a TLCD label, legacy or English
    pub fn from_label(label: &str) -> DynaResult<Self> {
        match label.trim().to_lowercase().as_str() {
            "tlcd simples" | "basic tlcd" | "basic" => Ok(Self::Basic),
            "tlcd pressurizado" | "pressurized tlcd" | "pressurized" => Ok(Self::pressurized()),
            _ => Err(DynaError::InvalidInput(format!("unknown TLCD type '{}'", label))),
        }
    }
}

impl Default for TlcdKind {
    fn default() -> Self {
        Self::Basic
    }
}

fn default_amount() -> usize {
    1
}

fn default_contraction() -> f64 {
    1.0
}

/// Geometry of a TLCD installation on the top story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tlcd {
    /// Variant and its gas column, if any
    #[serde(default)]
    pub kind: TlcdKind,
    /// Tube diameter in m
    pub diameter: f64,
    /// Horizontal width of the tube in m
    pub width: f64,
    /// Water column height at rest in m
    pub water_height: f64,
    /// Number of identical units, each one a DOF
    #[serde(default = "default_amount")]
    pub amount: usize,
    /// Orifice area ratio (1 = no orifice)
    #[serde(default = "default_contraction")]
    pub contraction: f64,
}

impl Tlcd {
    /// Create a single basic TLCD
    pub fn basic(diameter: f64, width: f64, water_height: f64) -> Self {
        Self {
            kind: TlcdKind::Basic,
            diameter,
            width,
            water_height,
            amount: 1,
            contraction: 1.0,
        }
    }

    /// Create a single pressurized TLCD
    pub fn pressurized(
        diameter: f64,
        width: f64,
        water_height: f64,
        gas_height: f64,
        gas_pressure: f64,
    ) -> Self {
        Self {
            kind: TlcdKind::Pressurized {
                gas_height,
                gas_pressure,
            },
            ..Self::basic(diameter, width, water_height)
        }
    }

    /// Set the number of identical units
    pub fn with_amount(mut self, amount: usize) -> Self {
        self.amount = amount;
        self
    }

    /// Set the orifice area ratio
    pub fn with_contraction(mut self, contraction: f64) -> Self {
        self.contraction = contraction;
        self
    }

    /// Reject non-physical geometry. `amount == 0` is valid and means "no damper".
    pub fn validate(&self) -> DynaResult<()> {
        let positive = [
            (self.diameter, "diameter"),
            (self.width, "width"),
            (self.water_height, "water height"),
            (self.contraction, "contraction"),
        ];
        for (value, name) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(DynaError::InvalidTlcd(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.contraction > 1.0 {
            return Err(DynaError::InvalidTlcd(format!(
                "contraction is an area ratio and cannot exceed 1, got {}",
                self.contraction
            )));
        }
        if let TlcdKind::Pressurized {
            gas_height,
            gas_pressure,
        } = self.kind
        {
            if !(gas_height > 0.0) || !(gas_pressure > 0.0) {
                return Err(DynaError::InvalidTlcd(
                    "gas height and gas pressure must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for Tlcd {
    fn default() -> Self {
        Self::basic(0.6, 20.0, 1.0)
    }
}

/// Derived physical properties of one TLCD unit in a given fluid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlcdModel {
    pub diameter: f64,
    pub width: f64,
    pub amount: usize,
    /// Tube cross-section area in m²
    pub area: f64,
    /// Liquid column length in m
    pub length: f64,
    /// Oscillating liquid mass in kg
    pub mass: f64,
    /// Hydrostatic restoring stiffness in N/m
    pub liquid_stiffness: f64,
    /// Gas spring stiffness in N/m (zero for the basic variant)
    pub gas_stiffness: f64,
    /// Total stiffness in N/m
    pub stiffness: f64,
    /// Natural frequency in rad/s
    pub natural_frequency: f64,
    /// Coefficient placed on the damping matrix diagonal
    pub damping_coefficient: f64,
    /// Nominal coefficient scaled by `f(|v|) * |v|` in nonlinear analysis
    pub nonlinear_damping_constant: f64,
    /// Orifice head-loss constant, scaled by `|v|`
    pub contraction_damping_constant: f64,
    pub nonlinear: bool,
    kinematic_viscosity: f64,
    pipe_roughness: f64,
}

impl TlcdModel {
    /// Derive the properties of `tlcd` filled with `fluid`
    pub fn new(tlcd: &Tlcd, fluid: &FluidProperties, nonlinear: bool) -> DynaResult<Self> {
        tlcd.validate()?;

        let rho = fluid.specific_mass;
        let d = tlcd.diameter;
        let area = 0.25 * PI * d.powi(2);
        let length = tlcd.width + 2.0 * tlcd.water_height;
        let mass = PI * (d / 2.0).powi(2) * length * rho;
        let liquid_stiffness = PI * d.powi(2) * rho * fluid.gravity / 2.0;
        let gas_stiffness = match tlcd.kind {
            TlcdKind::Basic => 0.0,
            TlcdKind::Pressurized {
                gas_height,
                gas_pressure,
            } => GAS_POLYTROPIC_INDEX * gas_pressure / gas_height * PI * d.powi(2) / 2.0,
        };
        let stiffness = liquid_stiffness + gas_stiffness;

        let nonlinear_damping_constant = PI * length * d * rho / 8.0;
        let damping_coefficient = if nonlinear {
            0.0
        } else {
            8.0 * PI * length * fluid.kinematic_viscosity * rho
        };
        let contraction_damping_constant =
            0.5 * rho * area * (1.0 / tlcd.contraction - 1.0).powi(2);

        Ok(Self {
            diameter: d,
            width: tlcd.width,
            amount: tlcd.amount,
            area,
            length,
            mass,
            liquid_stiffness,
            gas_stiffness,
            stiffness,
            natural_frequency: (stiffness / mass).sqrt(),
            damping_coefficient,
            nonlinear_damping_constant,
            contraction_damping_constant,
            nonlinear,
            kinematic_viscosity: fluid.kinematic_viscosity,
            pipe_roughness: fluid.pipe_roughness,
        })
    }

    /// Liquid mass of all units together
    pub fn total_mass(&self) -> f64 {
        self.mass * self.amount as f64
    }

    /// Mass coupling between the liquid column and the story it sits on
    pub fn coupling_mass(&self) -> f64 {
        self.width / self.length * self.mass
    }

    /// Reynolds number of the liquid flow
    pub fn reynolds(&self, velocity: f64) -> f64 {
        velocity.abs() * self.diameter / self.kinematic_viscosity
    }

    /// Darcy friction factor from an explicit Colebrook-type correlation.
    /// Zero at rest and wherever the log argument turns non-positive.
    pub fn friction_factor(&self, velocity: f64) -> f64 {
        if velocity == 0.0 {
            return 0.0;
        }

        let re = self.reynolds(velocity);
        let relative = self.pipe_roughness / (3.7 * self.diameter);
        let b = relative - (5.16 / re) * (relative + 5.09 / re.powf(0.87)).log10();

        if b <= 0.0 {
            return 0.0;
        }

        let a = -2.0 * b.log10();
        (1.0 / a).powi(2)
    }

    /// Factor scaling the nominal damping: `f(|v|) * |v|`
    pub fn damping_correction_factor(&self, velocity: f64) -> f64 {
        let speed = velocity.abs();
        self.friction_factor(speed) * speed
    }

    /// Orifice head-loss damping at `velocity`
    pub fn contraction_damping(&self, velocity: f64) -> f64 {
        self.contraction_damping_constant * velocity.abs()
    }

    /// Damping coefficient of one unit at `velocity` in nonlinear analysis
    pub fn effective_damping(&self, velocity: f64) -> f64 {
        self.nonlinear_damping_constant * self.damping_correction_factor(velocity)
            + self.contraction_damping(velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_tlcd() -> TlcdModel {
        TlcdModel::new(&Tlcd::basic(0.1, 1.0, 0.2), &FluidProperties::water(), false).unwrap()
    }

    #[test]
    fn test_basic_tlcd_properties() {
        let model = small_tlcd();
        let rho = 998.2071;
        assert_relative_eq!(model.length, 1.4, epsilon = 1e-12);
        assert_relative_eq!(model.mass, PI * 0.05_f64.powi(2) * 1.4 * rho, max_relative = 1e-12);
        assert_relative_eq!(model.mass, 10.99, epsilon = 0.01);
        assert_relative_eq!(model.stiffness, PI * 0.01 * rho * 9.807 / 2.0, max_relative = 1e-12);
        assert_relative_eq!(model.stiffness, 153.9, epsilon = 0.1);
        assert_relative_eq!(
            model.natural_frequency,
            (model.stiffness / model.mass).sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(model.gas_stiffness, 0.0);
    }

    #[test]
    fn test_pressurized_adds_gas_spring() {
        let fluid = FluidProperties::water();
        let tlcd = Tlcd::pressurized(0.1, 1.0, 0.2, 0.1, 202_650.0);
        let model = TlcdModel::new(&tlcd, &fluid, false).unwrap();
        let gas = 1.4 * 202_650.0 / 0.1 * PI * 0.01 / 2.0;
        assert_relative_eq!(model.gas_stiffness, gas, max_relative = 1e-12);
        assert_relative_eq!(
            model.stiffness,
            model.liquid_stiffness + model.gas_stiffness,
            epsilon = 1e-9
        );
        assert!(model.natural_frequency > small_tlcd().natural_frequency);
    }

    #[test]
    fn test_nonlinear_starts_undamped() {
        let tlcd = Tlcd::basic(0.1, 1.0, 0.2);
        let model = TlcdModel::new(&tlcd, &FluidProperties::water(), true).unwrap();
        assert_eq!(model.damping_coefficient, 0.0);
        assert_relative_eq!(
            model.nonlinear_damping_constant,
            PI * 1.4 * 0.1 * 998.2071 / 8.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_friction_factor_edges() {
        let model = small_tlcd();
        assert_eq!(model.friction_factor(0.0), 0.0);
        assert_eq!(model.damping_correction_factor(0.0), 0.0);

        // Turbulent flow in a smooth pipe sits around f = 0.01..0.03
        let f = model.friction_factor(1.0);
        assert!(f > 0.005 && f < 0.05, "f = {}", f);

        // Sign of the velocity never matters
        assert_eq!(model.friction_factor(-1.0), f);
        assert!(model.damping_correction_factor(-0.5) >= 0.0);
    }

    #[test]
    fn test_friction_factor_clips_negative_term() {
        // Creeping flow drives the implicit term negative
        let model = small_tlcd();
        assert_eq!(model.friction_factor(1e-7), 0.0);
    }

    #[test]
    fn test_contraction_damping() {
        let fluid = FluidProperties::water();
        let open = TlcdModel::new(&Tlcd::basic(0.1, 1.0, 0.2), &fluid, true).unwrap();
        assert_eq!(open.contraction_damping_constant, 0.0);

        let tlcd = Tlcd::basic(0.1, 1.0, 0.2).with_contraction(0.5);
        let orifice = TlcdModel::new(&tlcd, &fluid, true).unwrap();
        assert_relative_eq!(
            orifice.contraction_damping_constant,
            0.5 * 998.2071 * orifice.area,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            orifice.contraction_damping(-2.0),
            2.0 * orifice.contraction_damping_constant,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_invalid_geometry() {
        let tlcd = Tlcd::basic(0.0, 1.0, 0.2);
        assert!(TlcdModel::new(&tlcd, &FluidProperties::water(), false).is_err());
        assert!(TlcdKind::from_label("sloshing tank").is_err());
        assert_eq!(TlcdKind::from_label("TLCD Simples").unwrap(), TlcdKind::Basic);
    }
}
