//! Dynamic model - structure, damper, excitation and analysis settings

use std::sync::atomic::AtomicBool;

use log::info;
use serde::{Deserialize, Serialize};

use crate::analysis::Configurations;
use crate::assembly::{assemble_force_matrix, assemble_system, ForceHistory, SystemMatrices};
use crate::elements::{Story, Tlcd, TlcdModel};
use crate::error::{DynaError, DynaResult};
use crate::loads::Excitation;
use crate::math;
use crate::results::{AnalysisOutput, DmfSummary};
use crate::solver::{CentralDifference, SolverOptions};
use crate::sweep::{Frequencies, FrequencySweep, SweepResult};

/// A shear building, its optional TLCD and everything needed to analyse it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicModel {
    /// Stories from the ground up
    pub stories: Vec<Story>,
    /// Damper installed on the top story
    #[serde(default)]
    pub tlcd: Option<Tlcd>,
    #[serde(default)]
    pub excitation: Excitation,
    #[serde(default)]
    pub configurations: Configurations,
}

impl DynamicModel {
    /// Create an empty model with default excitation and configurations
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Model Building Methods
    // ========================

    /// Add a story on top of the existing ones
    pub fn add_story(&mut self, story: Story) -> DynaResult<()> {
        story.validate(self.stories.len() + 1)?;
        self.stories.push(story);
        Ok(())
    }

    /// Install a TLCD on the top story, replacing any previous one
    pub fn set_tlcd(&mut self, tlcd: Tlcd) -> DynaResult<()> {
        tlcd.validate()?;
        self.tlcd = Some(tlcd);
        Ok(())
    }

    /// Remove the TLCD
    pub fn remove_tlcd(&mut self) -> Option<Tlcd> {
        self.tlcd.take()
    }

    pub fn set_excitation(&mut self, excitation: Excitation) -> DynaResult<()> {
        excitation.validate()?;
        self.excitation = excitation;
        Ok(())
    }

    pub fn set_configurations(&mut self, configurations: Configurations) -> DynaResult<()> {
        configurations.validate()?;
        self.configurations = configurations;
        Ok(())
    }

    /// Check every record before running anything
    pub fn validate(&self) -> DynaResult<()> {
        if self.stories.is_empty() {
            return Err(DynaError::EmptyStructure);
        }
        for (i, story) in self.stories.iter().enumerate() {
            story.validate(i + 1)?;
        }
        if let Some(tlcd) = &self.tlcd {
            tlcd.validate()?;
        }
        self.excitation.validate()?;
        self.configurations.validate()?;
        Ok(())
    }

    // ========================
    // Assembly
    // ========================

    /// Derived TLCD properties in the configured fluid, if a TLCD is installed
    pub fn tlcd_model(&self) -> DynaResult<Option<TlcdModel>> {
        self.tlcd
            .as_ref()
            .map(|tlcd| {
                TlcdModel::new(
                    tlcd,
                    &self.configurations.fluid,
                    self.configurations.nonlinear_analysis,
                )
            })
            .transpose()
    }

    /// Assemble `M`, `C` and `K`
    pub fn assemble(&self) -> DynaResult<SystemMatrices> {
        self.validate()?;
        let tlcd = self.tlcd_model()?;
        Ok(assemble_system(
            &self.stories,
            tlcd.as_ref(),
            self.configurations.damping_ratio,
        ))
    }

    /// Undamped natural frequencies of the assembled system (rad/s), ascending
    pub fn natural_frequencies(&self) -> DynaResult<Vec<f64>> {
        let system = self.assemble()?;
        math::natural_frequencies(&system.mass, &system.stiffness)
            .ok_or(DynaError::SingularMatrix("mass"))
    }

    /// Frequency that relative excitation frequencies are measured against
    pub fn reference_frequency(system: &SystemMatrices) -> DynaResult<f64> {
        system
            .max_natural_frequency()
            .ok_or(DynaError::SingularMatrix("mass"))
    }

    /// Nodal forces of the configured excitation on the solver time grid
    pub fn force_history(&self, system: &SystemMatrices) -> DynaResult<ForceHistory> {
        let reference = match &self.excitation {
            Excitation::Sine(sine) if sine.relative_frequency => Self::reference_frequency(system)?,
            _ => 0.0,
        };
        assemble_force_matrix(
            &self.excitation,
            &system.mass,
            system.structural_dofs(),
            self.configurations.time_step,
            reference,
        )
    }

    // ========================
    // Analysis
    // ========================

    /// Time-history analysis under the configured excitation
    pub fn analyze(&self) -> DynaResult<AnalysisOutput> {
        let system = self.assemble()?;
        let natural_frequencies = math::natural_frequencies(&system.mass, &system.stiffness)
            .ok_or(DynaError::SingularMatrix("mass"))?;
        let history = self.force_history(&system)?;

        info!(
            "Analyzing {} stories{} over {}s ({} samples)",
            self.stories.len(),
            system
                .damper
                .as_ref()
                .map_or(String::new(), |d| format!(" with {} TLCD units", d.count)),
            self.excitation.analysis_duration(),
            history.time.len()
        );

        let options = SolverOptions::from(&self.configurations);
        let response = CentralDifference::new(&system, options).solve(&history.time, &history.force)?;
        let dmf = DmfSummary::compute(&response.displacement, &history.force, &system.stiffness)?;

        if let Some(peak) = dmf.max_dmf() {
            info!("Peak DMF {:.3}", peak);
        }

        Ok(AnalysisOutput {
            response,
            dmf,
            natural_frequencies,
        })
    }

    /// DMF sweep over the configured ratios of the largest natural frequency
    pub fn dmf_sweep(
        &self,
        progress: Option<&(dyn Fn(f64) + Sync)>,
        cancel: Option<&AtomicBool>,
    ) -> DynaResult<SweepResult> {
        let frequencies = Frequencies::Relative(self.configurations.dmf_ratios());
        self.dmf_sweep_over(&frequencies, progress, cancel)
    }

    /// DMF sweep over arbitrary frequencies, using the configured sine for
    /// amplitude and durations
    pub fn dmf_sweep_over(
        &self,
        frequencies: &Frequencies,
        progress: Option<&(dyn Fn(f64) + Sync)>,
        cancel: Option<&AtomicBool>,
    ) -> DynaResult<SweepResult> {
        let template = match &self.excitation {
            Excitation::Sine(sine) => sine,
            Excitation::General(_) => {
                return Err(DynaError::InvalidExcitation(
                    "a DMF sweep needs a sine excitation".to_string(),
                ))
            }
        };
        let system = self.assemble()?;

        let mut sweep =
            FrequencySweep::new(&system, template, SolverOptions::from(&self.configurations));
        if let Some(progress) = progress {
            sweep = sweep.with_progress(progress);
        }
        if let Some(cancel) = cancel {
            sweep = sweep.with_cancel(cancel);
        }
        sweep.run(frequencies)
    }

    // ========================
    // Serialization
    // ========================

    /// Serialize the setup to pretty JSON
    pub fn to_json(&self) -> DynaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON setup
    pub fn from_json(json: &str) -> DynaResult<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Support;
    use crate::loads::SineWave;
    use approx::assert_relative_eq;

    fn two_story_model() -> DynamicModel {
        let mut model = DynamicModel::new();
        model.add_story(Story::default()).unwrap();
        model
            .add_story(Story::new(8.0e3, 3.0, 0.3, 0.3, 25.0e9, Support::FixedPinned))
            .unwrap();
        model
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let model = DynamicModel::new();
        assert!(matches!(model.assemble(), Err(DynaError::EmptyStructure)));
    }

    #[test]
    fn test_add_story_validates() {
        let mut model = two_story_model();
        let bad = Story {
            height: -1.0,
            ..Story::default()
        };
        assert!(matches!(
            model.add_story(bad),
            Err(DynaError::InvalidStory { index: 3, .. })
        ));
        assert_eq!(model.stories.len(), 2);
    }

    #[test]
    fn test_tlcd_adds_dofs() {
        let mut model = two_story_model();
        assert_eq!(model.assemble().unwrap().dofs(), 2);
        model.set_tlcd(Tlcd::default().with_amount(2)).unwrap();
        assert_eq!(model.assemble().unwrap().dofs(), 4);
        model.remove_tlcd();
        assert_eq!(model.assemble().unwrap().dofs(), 2);
    }

    #[test]
    fn test_analyze_reports_structural_dmf() {
        let mut model = two_story_model();
        model.set_tlcd(Tlcd::default()).unwrap();
        model
            .set_excitation(Excitation::Sine(SineWave::relative(1.0, 0.3, 1.0, 1.0)))
            .unwrap();
        model
            .set_configurations(Configurations::linear().with_time_step(0.001))
            .unwrap();

        let output = model.analyze().unwrap();
        assert_eq!(output.response.dofs(), 3);
        assert_eq!(output.response.steps(), 1001);
        assert_eq!(output.dmf.dofs, vec![0, 1]);
        assert_eq!(output.natural_frequencies.len(), 3);
        assert!(output.dmf.dmf.iter().all(|d| d.is_finite() && *d > 0.0));
    }

    #[test]
    fn test_sweep_needs_sine() {
        let mut model = two_story_model();
        model.excitation = Excitation::General(crate::loads::GeneralExcitation::new(
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ));
        assert!(matches!(
            model.dmf_sweep(None, None),
            Err(DynaError::InvalidExcitation(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let mut model = two_story_model();
        model.set_tlcd(Tlcd::default()).unwrap();
        let json = model.to_json().unwrap();
        let back = DynamicModel::from_json(&json).unwrap();
        assert_eq!(model, back);
    }

    #[test]
    fn test_json_rejects_unknown_fields() {
        let json = r#"{"stories": [], "exec": "rm -rf /"}"#;
        assert!(matches!(
            DynamicModel::from_json(json),
            Err(DynaError::SerializationError(_))
        ));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{"stories": [{"mass": 1.0e4, "height": 3.0, "width": 0.35,
            "depth": 0.35, "elastic_modulus": 2.5e10}]}"#;
        let model = DynamicModel::from_json(json).unwrap();
        assert_eq!(model.configurations, Configurations::default());
        assert!(model.tlcd.is_none());
        let k = model.stories[0].stiffness();
        let w = model.natural_frequencies().unwrap()[0];
        assert_relative_eq!(w, (k / 1.0e4).sqrt(), max_relative = 1e-9);
    }
}
