//! Vehicle classes used for labeling and KPI classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Powertrain class of a simulated vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleClass {
    /// Battery electric, exempt from the toll
    #[serde(rename = "EV")]
    Ev,
    /// Internal combustion, pays the toll and emits CO2
    #[serde(rename = "ICE")]
    Ice,
}

impl VehicleClass {
    /// Simulator vType id
    pub fn type_id(&self) -> &'static str {
        match self {
            VehicleClass::Ev => "EV",
            VehicleClass::Ice => "ICE",
        }
    }

    /// Classify a simulator vType id (`EV`, `ICE`, or ids containing them)
    pub fn from_type_id(id: &str) -> Option<Self> {
        // ICE wins for ids naming both
        if id.contains("ICE") {
            Some(VehicleClass::Ice)
        } else if id.contains("EV") {
            Some(VehicleClass::Ev)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_ev(&self) -> bool {
        matches!(self, VehicleClass::Ev)
    }
}

/// How EV labels are assigned across a scenario's vehicle set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelingPolicy {
    /// Independent Bernoulli draw per vehicle; the EV count varies with the seed
    #[default]
    Bernoulli,
    /// Exactly `round(n × share)` EVs at seeded random positions
    Exact,
}

impl std::str::FromStr for LabelingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bernoulli" => Ok(LabelingPolicy::Bernoulli),
            "exact" => Ok(LabelingPolicy::Exact),
            other => Err(format!("unknown labeling policy: {}", other)),
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_id())
    }
}
