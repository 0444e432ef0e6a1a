//! Structural elements: stories and dampers

mod story;
mod support;
mod tlcd;

pub use story::Story;
pub use support::Support;
pub use tlcd::{Tlcd, TlcdKind, TlcdModel, DEFAULT_GAS_HEIGHT, DEFAULT_GAS_PRESSURE};
