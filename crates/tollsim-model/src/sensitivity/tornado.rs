//! Tornado analysis at a single reference toll

use crate::adoption::ev_share;
use serde::Serialize;
use tollsim_common::{AdoptionModelParameters, ModelError, SweepTarget};

/// Low / high variation of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TornadoInput {
    pub target: SweepTarget,
    pub low: f64,
    pub high: f64,
}

impl TornadoInput {
    pub fn new(target: SweepTarget, low: f64, high: f64) -> Self {
        Self { target, low, high }
    }

    /// Roughly ±20% around the calibrated preset; max share is capped at 1.0
    pub fn standard_set() -> Vec<TornadoInput> {
        vec![
            TornadoInput::new(SweepTarget::Midpoint, 2.0, 3.0),
            TornadoInput::new(SweepTarget::Steepness, 0.4, 0.6),
            TornadoInput::new(SweepTarget::Baseline, 0.12, 0.18),
            TornadoInput::new(SweepTarget::MaxShare, 0.72, 1.0),
        ]
    }
}

/// One bar of the tornado diagram; deltas are in share units
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoBar {
    pub parameter: SweepTarget,
    pub low_value: f64,
    pub high_value: f64,
    pub low_delta: f64,
    pub high_delta: f64,
    /// `|high_delta - low_delta|`
    pub impact: f64,
}

/// Bars for every input at `reference_toll`, widest first
pub fn tornado(
    base: &AdoptionModelParameters,
    reference_toll: f64,
    inputs: &[TornadoInput],
) -> Result<Vec<TornadoBar>, ModelError> {
    let reference = ev_share(reference_toll, base);

    let mut bars = inputs
        .iter()
        .map(|input| {
            let low = ev_share(reference_toll, &base.with_value(input.target, input.low)?);
            let high = ev_share(reference_toll, &base.with_value(input.target, input.high)?);
            let low_delta = low - reference;
            let high_delta = high - reference;
            Ok(TornadoBar {
                parameter: input.target,
                low_value: input.low,
                high_value: input.high,
                low_delta,
                high_delta,
                impact: (high_delta - low_delta).abs(),
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    bars.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    Ok(bars)
}
