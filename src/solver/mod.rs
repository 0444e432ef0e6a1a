//! Time integration of the equations of motion

mod central_difference;

pub use central_difference::{effective_damping, CentralDifference, SolverOptions};
