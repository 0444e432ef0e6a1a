//! Column end conditions

use serde::{Deserialize, Serialize};

use crate::error::{DynaError, DynaResult};

/// End conditions of the columns of a story (base - top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Support {
    /// Both column ends fixed
    FixedFixed,
    /// Fixed base, pinned top
    FixedPinned,
    /// Pinned base, fixed top
    PinnedFixed,
    /// Both column ends pinned
    PinnedPinned,
}

impl Support {
    /// Constant `c` in the lateral column stiffness `k = c * E * I / h³`
    pub fn stiffness_constant(&self) -> f64 {
        match self {
            Self::FixedFixed => 24.0,
            Self::FixedPinned | Self::PinnedFixed => 15.0,
            Self::PinnedPinned => 6.0,
        }
    }

    /// Label used by the legacy setup files
    pub fn legacy_label(&self) -> &'static str {
        match self {
            Self::FixedFixed => "Engastado-Engastado",
            Self::FixedPinned => "Engastado-Apoiado",
            Self::PinnedFixed => "Apoiado-Engastado",
            Self::PinnedPinned => "Apoiado-Apoiado",
        }
    }

    /// Parse a support label, legacy or English
    pub fn from_label(label: &str) -> DynaResult<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "engastado-engastado" | "fixed-fixed" | "fixedfixed" => Ok(Self::FixedFixed),
            "engastado-apoiado" | "fixed-pinned" | "fixedpinned" => Ok(Self::FixedPinned),
            "apoiado-engastado" | "pinned-fixed" | "pinnedfixed" => Ok(Self::PinnedFixed),
            "apoiado-apoiado" | "pinned-pinned" | "pinnedpinned" => Ok(Self::PinnedPinned),
            _ => Err(DynaError::InvalidInput(format!(
                "unknown support condition '{}'",
                label
            ))),
        }
    }
}

impl Default for Support {
    fn default() -> Self {
        Self::FixedFixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stiffness_constants() {
        assert_eq!(Support::FixedFixed.stiffness_constant(), 24.0);
        assert_eq!(Support::FixedPinned.stiffness_constant(), 15.0);
        assert_eq!(Support::PinnedFixed.stiffness_constant(), 15.0);
        assert_eq!(Support::PinnedPinned.stiffness_constant(), 6.0);
    }

    #[test]
    fn test_labels_round_trip() {
        for support in [
            Support::FixedFixed,
            Support::FixedPinned,
            Support::PinnedFixed,
            Support::PinnedPinned,
        ] {
            assert_eq!(Support::from_label(support.legacy_label()).unwrap(), support);
        }
        assert_eq!(Support::from_label("pinned_fixed").unwrap(), Support::PinnedFixed);
        assert!(Support::from_label("roller").is_err());
    }
}
