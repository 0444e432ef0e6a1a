//! Base excitations

mod excitation;

pub use excitation::{time_grid, Excitation, GeneralExcitation, SineWave};
