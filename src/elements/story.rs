//! Story of a shear building

use serde::{Deserialize, Serialize};

use super::Support;
use crate::error::{DynaError, DynaResult};

/// One lumped-mass floor of a shear building, carried by its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Story {
    /// Floor mass in kg
    pub mass: f64,
    /// Story height in m
    pub height: f64,
    /// Column cross-section width in m
    pub width: f64,
    /// Column cross-section depth in m
    pub depth: f64,
    /// Column modulus of elasticity in Pa
    pub elastic_modulus: f64,
    /// Column end conditions
    #[serde(default)]
    pub support: Support,
}

impl Story {
    /// Create a new story
    pub fn new(
        mass: f64,
        height: f64,
        width: f64,
        depth: f64,
        elastic_modulus: f64,
        support: Support,
    ) -> Self {
        Self {
            mass,
            height,
            width,
            depth,
            elastic_modulus,
            support,
        }
    }

    /// Column moment of inertia `I = b * d³ / 12`
    pub fn moment_of_inertia(&self) -> f64 {
        self.width * self.depth.powi(3) / 12.0
    }

    /// Lateral stiffness `k = c * E * I / h³`
    pub fn stiffness(&self) -> f64 {
        self.support.stiffness_constant() * self.elastic_modulus * self.moment_of_inertia()
            / self.height.powi(3)
    }

    /// Natural frequency (rad/s) with `attached_mass` riding on the floor
    pub fn natural_frequency(&self, attached_mass: f64) -> f64 {
        (self.stiffness() / (self.mass + attached_mass)).sqrt()
    }

    /// Critical damping `2 * m * wn` with `attached_mass` riding on the floor
    pub fn critical_damping(&self, attached_mass: f64) -> f64 {
        2.0 * (self.mass + attached_mass) * self.natural_frequency(attached_mass)
    }

    /// Viscous damping coefficient for a damping ratio (fraction of critical)
    pub fn damping_coefficient(&self, damping_ratio: f64, attached_mass: f64) -> f64 {
        self.critical_damping(attached_mass) * damping_ratio
    }

    /// Reject non-physical stories. `index` is 1-based.
    pub fn validate(&self, index: usize) -> DynaResult<()> {
        let checks = [
            (self.mass, "mass"),
            (self.height, "height"),
            (self.width, "column width"),
            (self.depth, "column depth"),
            (self.elastic_modulus, "elastic modulus"),
        ];
        for (value, name) in checks {
            if !(value > 0.0) || !value.is_finite() {
                return Err(DynaError::InvalidStory {
                    index,
                    reason: format!("{} must be positive, got {}", name, value),
                });
            }
        }
        Ok(())
    }
}

impl Default for Story {
    /// 10 t floor on 3 m high 35x35 cm concrete columns
    fn default() -> Self {
        Self::new(10.0e3, 3.0, 0.35, 0.35, 25.0e9, Support::FixedFixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_fixed_stiffness() {
        let story = Story::default();
        let inertia = 0.35_f64.powi(4) / 12.0;
        assert_relative_eq!(story.moment_of_inertia(), inertia, epsilon = 1e-15);
        assert_relative_eq!(
            story.stiffness(),
            24.0 * 25.0e9 * inertia / 27.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_support_scales_stiffness() {
        let fixed = Story::default();
        let pinned = Story {
            support: Support::PinnedPinned,
            ..Story::default()
        };
        assert_relative_eq!(pinned.stiffness() / fixed.stiffness(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_attached_mass_lowers_frequency() {
        let story = Story::default();
        let bare = story.natural_frequency(0.0);
        let loaded = story.natural_frequency(story.mass);
        assert_relative_eq!(bare / loaded, 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            story.critical_damping(0.0),
            2.0 * story.mass * bare,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_validate_rejects_zero_mass() {
        let story = Story {
            mass: 0.0,
            ..Story::default()
        };
        assert!(matches!(
            story.validate(3),
            Err(DynaError::InvalidStory { index: 3, .. })
        ));
    }
}
