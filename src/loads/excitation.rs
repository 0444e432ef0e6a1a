//! Base excitations, measured as ground acceleration

use serde::{Deserialize, Serialize};

use crate::error::{DynaError, DynaResult};

/// Slack allowed when a grid time lands on a duration boundary
const TIME_TOLERANCE: f64 = 1e-9;

/// Fixed solver time grid `0, dt, 2dt, ...` up to and including `duration`
pub fn time_grid(duration: f64, dt: f64) -> Vec<f64> {
    let steps = (duration / dt + TIME_TOLERANCE).floor() as usize;
    (0..=steps).map(|i| i as f64 * dt).collect()
}

/// Harmonic ground acceleration `a(t) = amplitude * sin(w * t)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SineWave {
    /// Acceleration amplitude in m/s²
    pub amplitude: f64,
    /// Angular frequency in rad/s, or a ratio when `relative_frequency` is set
    pub frequency: f64,
    /// `frequency` is a ratio of the system's largest natural frequency
    #[serde(default)]
    pub relative_frequency: bool,
    /// Time the ground shakes (s)
    pub excitation_duration: f64,
    /// Total analysed time (s)
    pub analysis_duration: f64,
}

impl SineWave {
    /// Sine wave with an absolute angular frequency (rad/s)
    pub fn new(amplitude: f64, frequency: f64, excitation_duration: f64, analysis_duration: f64) -> Self {
        Self {
            amplitude,
            frequency,
            relative_frequency: false,
            excitation_duration,
            analysis_duration,
        }
    }

    /// Sine wave whose frequency is a ratio of the largest natural frequency
    pub fn relative(amplitude: f64, ratio: f64, excitation_duration: f64, analysis_duration: f64) -> Self {
        Self {
            relative_frequency: true,
            ..Self::new(amplitude, ratio, excitation_duration, analysis_duration)
        }
    }

    /// Same wave at another frequency, keeping the relative/absolute convention
    pub fn at_frequency(&self, frequency: f64) -> Self {
        Self {
            frequency,
            ..self.clone()
        }
    }

    /// Angular frequency in rad/s given the system's largest natural frequency
    pub fn angular_frequency(&self, reference_frequency: f64) -> f64 {
        if self.relative_frequency {
            self.frequency * reference_frequency
        } else {
            self.frequency
        }
    }

    pub fn validate(&self) -> DynaResult<()> {
        if !self.amplitude.is_finite() || !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(DynaError::InvalidExcitation(
                "amplitude must be finite and frequency non-negative".to_string(),
            ));
        }
        if !(self.excitation_duration >= 0.0) || !(self.analysis_duration > 0.0) {
            return Err(DynaError::InvalidExcitation(
                "durations must be positive".to_string(),
            ));
        }
        if self.excitation_duration > self.analysis_duration {
            return Err(DynaError::ExcitationTooLong {
                excitation: self.excitation_duration,
                analysis: self.analysis_duration,
            });
        }
        Ok(())
    }
}

/// Tabulated ground acceleration, linearly interpolated between samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralExcitation {
    /// Sample times in s, strictly increasing
    pub time: Vec<f64>,
    /// Ground acceleration in m/s² at each sample time
    pub acceleration: Vec<f64>,
    /// Total analysed time (s); must stay inside the tabulated range
    pub analysis_duration: f64,
}

impl GeneralExcitation {
    /// Tabulated excitation analysed over its whole record
    pub fn new(time: Vec<f64>, acceleration: Vec<f64>) -> Self {
        let analysis_duration = time.last().copied().unwrap_or(0.0);
        Self {
            time,
            acceleration,
            analysis_duration,
        }
    }

    /// Override the analysed time
    pub fn with_analysis_duration(mut self, duration: f64) -> Self {
        self.analysis_duration = duration;
        self
    }

    /// Interpolated acceleration at `t`. Times outside the record are an error.
    pub fn acceleration_at(&self, t: f64) -> DynaResult<f64> {
        let (first, last) = match (self.time.first(), self.time.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(DynaError::InvalidExcitation(
                    "tabulated excitation has no samples".to_string(),
                ))
            }
        };
        let slack = TIME_TOLERANCE * last.abs().max(1.0);
        if t < first - slack || t > last + slack {
            return Err(DynaError::ExcitationOutOfRange { time: t, first, last });
        }
        let t = t.clamp(first, last);

        // Index of the first sample strictly after t
        let upper = self.time.partition_point(|&ti| ti <= t);
        if upper == self.time.len() {
            return Ok(self.acceleration[self.time.len() - 1]);
        }
        let lower = upper - 1;
        let (t0, t1) = (self.time[lower], self.time[upper]);
        let (a0, a1) = (self.acceleration[lower], self.acceleration[upper]);
        Ok(a0 + (a1 - a0) * (t - t0) / (t1 - t0))
    }

    pub fn validate(&self) -> DynaResult<()> {
        if self.time.len() != self.acceleration.len() {
            return Err(DynaError::InvalidExcitation(format!(
                "{} time samples but {} acceleration samples",
                self.time.len(),
                self.acceleration.len()
            )));
        }
        if self.time.len() < 2 {
            return Err(DynaError::InvalidExcitation(
                "tabulated excitation needs at least two samples".to_string(),
            ));
        }
        if self.time.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(DynaError::InvalidExcitation(
                "sample times must be strictly increasing".to_string(),
            ));
        }
        if self.acceleration.iter().any(|a| !a.is_finite()) {
            return Err(DynaError::InvalidExcitation(
                "accelerations must be finite".to_string(),
            ));
        }
        if !(self.analysis_duration > 0.0) {
            return Err(DynaError::InvalidExcitation(
                "analysis duration must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Base excitation driving every story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Excitation {
    Sine(SineWave),
    General(GeneralExcitation),
}

impl Excitation {
    /// Total analysed time (s)
    pub fn analysis_duration(&self) -> f64 {
        match self {
            Self::Sine(sine) => sine.analysis_duration,
            Self::General(general) => general.analysis_duration,
        }
    }

    /// Check durations and samples
    pub fn validate(&self) -> DynaResult<()> {
        match self {
            Self::Sine(sine) => sine.validate(),
            Self::General(general) => general.validate(),
        }
    }

    /// Ground acceleration sampled on `grid`.
    ///
    /// `reference_frequency` resolves relative sine frequencies and is ignored otherwise.
    pub fn sample(&self, grid: &[f64], dt: f64, reference_frequency: f64) -> DynaResult<Vec<f64>> {
        match self {
            Self::Sine(sine) => {
                let omega = sine.angular_frequency(reference_frequency);
                let shaking = time_grid(sine.excitation_duration, dt).len();
                Ok(grid
                    .iter()
                    .enumerate()
                    .map(|(j, &t)| {
                        if j < shaking {
                            sine.amplitude * (omega * t).sin()
                        } else {
                            0.0
                        }
                    })
                    .collect())
            }
            Self::General(general) => grid.iter().map(|&t| general.acceleration_at(t)).collect(),
        }
    }
}

impl Default for Excitation {
    fn default() -> Self {
        Self::Sine(SineWave::relative(5.0, 1.0, 3.0, 5.0))
    }
}
