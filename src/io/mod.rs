//! Setup files: JSON, the legacy `.dpfl` layout and excitation tables

pub mod dpfl;
pub mod excitation_table;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;

use crate::error::DynaResult;
use crate::loads::GeneralExcitation;
use crate::model::DynamicModel;

pub use excitation_table::AccelerationUnit;

/// Load a setup, picking the format from the extension (`.dpfl` or JSON)
pub fn load_model(path: impl AsRef<Path>) -> DynaResult<DynamicModel> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let model = if is_legacy(path) {
        dpfl::read(reader)?
    } else {
        let model: DynamicModel = serde_json::from_reader(reader)?;
        model.validate()?;
        model
    };
    info!(
        "Loaded {} stories from {}",
        model.stories.len(),
        path.display()
    );
    Ok(model)
}

/// Save a setup, picking the format from the extension (`.dpfl` or JSON)
pub fn save_model(path: impl AsRef<Path>, model: &DynamicModel) -> DynaResult<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    if is_legacy(path) {
        dpfl::write(writer, model)
    } else {
        serde_json::to_writer_pretty(writer, model)?;
        Ok(())
    }
}

/// Load a tabulated excitation, accelerations converted to m/s²
pub fn load_excitation(path: impl AsRef<Path>, gravity: f64) -> DynaResult<GeneralExcitation> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    excitation_table::read(reader, gravity)
}

fn is_legacy(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dpfl"))
}
