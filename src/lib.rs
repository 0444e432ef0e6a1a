//! TLCD Solver - time-domain dynamics of shear buildings with liquid dampers
//!
//! This library models multi-story shear buildings fitted with tuned liquid
//! column dampers (TLCDs) on the top floor and integrates their response to a
//! ground acceleration, supporting:
//! - Story stiffness from column geometry and end conditions
//! - Basic and pressurized TLCDs, one DOF per unit
//! - Sine and tabulated base excitations
//! - Explicit central-difference integration, linear or with
//!   velocity-dependent orifice damping
//! - Dynamic magnification factor (DMF) sweeps over excitation frequency
//!
//! ## Example
//! ```rust
//! use tlcd_solver::prelude::*;
//!
//! let mut model = DynamicModel::new();
//!
//! // 10 t floor on 35x35 cm concrete columns, 3 m high
//! model.add_story(Story::new(10.0e3, 3.0, 0.35, 0.35, 25.0e9, Support::FixedFixed)).unwrap();
//!
//! // One basic TLCD on top
//! model.set_tlcd(Tlcd::basic(0.3, 10.0, 1.0)).unwrap();
//!
//! // Shake at the highest natural frequency of the assembled system (story
//! // and TLCD DOFs) for 3 s, analyse 5 s
//! model.set_excitation(Excitation::Sine(SineWave::relative(5.0, 1.0, 3.0, 5.0))).unwrap();
//! model.set_configurations(Configurations::linear().with_time_step(0.001)).unwrap();
//!
//! let output = model.analyze().unwrap();
//! let peak = output.peak_displacements()[0];
//! assert!(peak > 0.0);
//! ```

pub mod analysis;
pub mod assembly;
pub mod elements;
pub mod error;
pub mod io;
pub mod loads;
pub mod math;
pub mod model;
pub mod results;
pub mod solver;
pub mod sweep;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{Configurations, FluidProperties, IntegrationMethod};
    pub use crate::assembly::{assemble_system, SystemMatrices};
    pub use crate::elements::{Story, Support, Tlcd, TlcdKind, TlcdModel};
    pub use crate::error::{DynaError, DynaResult};
    pub use crate::loads::{Excitation, GeneralExcitation, SineWave};
    pub use crate::model::DynamicModel;
    pub use crate::results::{AnalysisOutput, DmfSummary, DynamicResponse};
    pub use crate::solver::{CentralDifference, SolverOptions};
    pub use crate::sweep::{Frequencies, FrequencySweep, SweepResult};
}
