//! TLCD Solver Example - Three-story building with a liquid damper
//!
//! Runs a linear and a nonlinear analysis at resonance, then a coarse DMF
//! sweep. Pass a `.dpfl` or `.json` path as the first argument to save the setup.

use anyhow::Context;
use tlcd_solver::io;
use tlcd_solver::prelude::*;

fn build_model() -> anyhow::Result<DynamicModel> {
    let mut model = DynamicModel::new();

    // Stories from the ground up
    //
    //   ====[TLCD]====   story 3 (8 t)
    //   |            |
    //   ==============   story 2 (10 t)
    //   |            |
    //   ==============   story 1 (12 t)
    //   |            |
    //  ///          ///
    model.add_story(Story::new(12.0e3, 3.5, 0.40, 0.40, 25.0e9, Support::FixedFixed))?;
    model.add_story(Story::new(10.0e3, 3.0, 0.35, 0.35, 25.0e9, Support::FixedFixed))?;
    model.add_story(Story::new(8.0e3, 3.0, 0.30, 0.30, 25.0e9, Support::FixedPinned))?;

    // Two basic TLCDs with a partially closed orifice
    model.set_tlcd(Tlcd::basic(0.3, 4.0, 1.0).with_amount(2).with_contraction(0.5))?;

    // 2 m/s² at the fundamental frequency, measured against the highest mode
    let frequencies = model.natural_frequencies()?;
    let fundamental = frequencies.first().copied().context("no natural frequencies")?;
    let highest = frequencies.last().copied().context("no natural frequencies")?;
    model.set_excitation(Excitation::Sine(SineWave::relative(
        2.0,
        fundamental / highest,
        6.0,
        10.0,
    )))?;

    Ok(model)
}

fn print_peaks(label: &str, output: &AnalysisOutput) {
    println!("{}:", label);
    for (dof, peak) in output.peak_displacements().iter().enumerate() {
        println!("  DOF {}: max |x| = {:.4e} m", dof + 1, peak);
    }
    for (dof, dmf) in output.dmf.dofs.iter().zip(&output.dmf.dmf) {
        println!("  DOF {}: DMF = {:.3}", dof + 1, dmf);
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("=== TLCD Solver Example: Three-Story Building ===\n");

    let mut model = build_model()?;

    println!("Natural frequencies (rad/s):");
    for (i, w) in model.natural_frequencies()?.iter().enumerate() {
        println!("  Mode {}: {:.3}", i + 1, w);
    }
    println!();

    model.set_configurations(Configurations::linear().with_time_step(0.002))?;
    let linear = model.analyze()?;
    print_peaks("Linear TLCD damping", &linear);
    println!();

    model.set_configurations(Configurations::nonlinear().with_time_step(0.002))?;
    let nonlinear = model.analyze()?;
    print_peaks("Nonlinear TLCD damping", &nonlinear);
    println!();

    model.set_configurations(
        Configurations::linear()
            .with_time_step(0.002)
            .with_dmf_sweep(20, 2.0),
    )?;
    let progress = |p: f64| log::info!("Sweep {:.0}%", p * 100.0);
    let sweep = model.dmf_sweep(Some(&progress), None)?;
    println!("DMF sweep of the top story:");
    let top = model.stories.len() - 1;
    if let (Some(curve), Some(ratios)) = (sweep.dmf_curve(top), sweep.ratios()) {
        for (r, dmf) in ratios.iter().zip(curve) {
            println!("  w/w_max = {:.2}: DMF = {:.3}", r, dmf);
        }
    }

    if let Some(path) = std::env::args().nth(1) {
        io::save_model(&path, &model).with_context(|| format!("writing {}", path))?;
        println!("\nSetup written to {}", path);
    }

    Ok(())
}
