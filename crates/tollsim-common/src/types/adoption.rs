//! Adoption model parameters
//!
//! The toll → EV adoption curve is a logistic function mapped onto
//! `[baseline, max_share]`:
//!
//! ```text
//! share = baseline + (max_share - baseline) × σ(steepness × (toll - midpoint))
//! ```
//!
//! Parameters are validated once at construction and never change afterwards.
//! Sensitivity sweeps derive new sets through [`AdoptionModelParameters::with_value`].

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named parameter sets
///
/// The study carried two sets of defaults; both are kept rather than
/// picking one silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionPreset {
    /// 15% baseline, 90% saturation, €2.5 midpoint, k = 0.5
    #[default]
    Calibrated,
    /// 0% baseline, 90% saturation, €1.5 midpoint, k = 0.5
    ZeroBaseline,
}

impl AdoptionPreset {
    pub fn params(&self) -> AdoptionModelParameters {
        match self {
            AdoptionPreset::Calibrated => AdoptionModelParameters {
                baseline: 0.15,
                max_share: 0.90,
                midpoint: 2.5,
                steepness: 0.5,
            },
            AdoptionPreset::ZeroBaseline => AdoptionModelParameters {
                baseline: 0.0,
                max_share: 0.90,
                midpoint: 1.5,
                steepness: 0.5,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdoptionPreset::Calibrated => "calibrated",
            AdoptionPreset::ZeroBaseline => "zero_baseline",
        }
    }
}

impl FromStr for AdoptionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "calibrated" | "default" => Ok(AdoptionPreset::Calibrated),
            "zero_baseline" => Ok(AdoptionPreset::ZeroBaseline),
            other => Err(format!("unknown adoption preset: {}", other)),
        }
    }
}

/// One of the four model parameters a sensitivity sweep can vary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepTarget {
    Baseline,
    MaxShare,
    Midpoint,
    Steepness,
}

impl SweepTarget {
    pub const ALL: [SweepTarget; 4] = [
        SweepTarget::Baseline,
        SweepTarget::MaxShare,
        SweepTarget::Midpoint,
        SweepTarget::Steepness,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SweepTarget::Baseline => "baseline",
            SweepTarget::MaxShare => "max_share",
            SweepTarget::Midpoint => "midpoint",
            SweepTarget::Steepness => "steepness",
        }
    }

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            SweepTarget::Baseline => "Baseline Share",
            SweepTarget::MaxShare => "Max Share",
            SweepTarget::Midpoint => "Midpoint",
            SweepTarget::Steepness => "Steepness (k)",
        }
    }
}

impl fmt::Display for SweepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SweepTarget {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "baseline" | "baseline_share" => Ok(SweepTarget::Baseline),
            "max_share" | "maxShare" => Ok(SweepTarget::MaxShare),
            "midpoint" => Ok(SweepTarget::Midpoint),
            "steepness" | "k" => Ok(SweepTarget::Steepness),
            other => Err(ModelError::UnrecognizedSweepTarget(other.to_string())),
        }
    }
}

/// Validated sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdoptionModelParameters {
    baseline: f64,
    max_share: f64,
    midpoint: f64,
    steepness: f64,
}

impl AdoptionModelParameters {
    /// Create a validated parameter set
    pub fn new(
        baseline: f64,
        max_share: f64,
        midpoint: f64,
        steepness: f64,
    ) -> Result<Self, ModelError> {
        check_probability("baseline", baseline)?;
        check_probability("max_share", max_share)?;
        if max_share < baseline {
            return Err(ModelError::invalid(
                "max_share",
                max_share,
                format!("must not be below baseline ({})", baseline),
            ));
        }
        if !midpoint.is_finite() || midpoint < 0.0 {
            return Err(ModelError::invalid(
                "midpoint",
                midpoint,
                "must be a non-negative finite toll price",
            ));
        }
        if !steepness.is_finite() || steepness < 0.0 {
            return Err(ModelError::invalid(
                "steepness",
                steepness,
                "must be a non-negative finite rate",
            ));
        }

        Ok(Self {
            baseline,
            max_share,
            midpoint,
            steepness,
        })
    }

    pub fn from_preset(preset: AdoptionPreset) -> Self {
        preset.params()
    }

    #[inline]
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    #[inline]
    pub fn max_share(&self) -> f64 {
        self.max_share
    }

    #[inline]
    pub fn midpoint(&self) -> f64 {
        self.midpoint
    }

    #[inline]
    pub fn steepness(&self) -> f64 {
        self.steepness
    }

    /// Share range the sigmoid is mapped onto
    #[inline]
    pub fn span(&self) -> f64 {
        self.max_share - self.baseline
    }

    pub fn get(&self, target: SweepTarget) -> f64 {
        match target {
            SweepTarget::Baseline => self.baseline,
            SweepTarget::MaxShare => self.max_share,
            SweepTarget::Midpoint => self.midpoint,
            SweepTarget::Steepness => self.steepness,
        }
    }

    /// Copy with a single parameter replaced, re-validated
    pub fn with_value(&self, target: SweepTarget, value: f64) -> Result<Self, ModelError> {
        let mut next = *self;
        match target {
            SweepTarget::Baseline => next.baseline = value,
            SweepTarget::MaxShare => next.max_share = value,
            SweepTarget::Midpoint => next.midpoint = value,
            SweepTarget::Steepness => next.steepness = value,
        }
        Self::new(next.baseline, next.max_share, next.midpoint, next.steepness)
    }
}

impl Default for AdoptionModelParameters {
    fn default() -> Self {
        AdoptionPreset::default().params()
    }
}

impl fmt::Display for AdoptionModelParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "baseline={:.2}, max_share={:.2}, midpoint={:.2}, k={:.2}",
            self.baseline, self.max_share, self.midpoint, self.steepness
        )
    }
}

// Deserialization goes through the validating constructor.
impl<'de> Deserialize<'de> for AdoptionModelParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            baseline: f64,
            max_share: f64,
            midpoint: f64,
            steepness: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.baseline, raw.max_share, raw.midpoint, raw.steepness)
            .map_err(serde::de::Error::custom)
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ModelError::invalid(name, value, "must be a probability in [0, 1]"))
    }
}
