//! Toll scenarios and their canonical names
//!
//! Every simulator run belongs to exactly one toll price. File names on disk
//! are derived from the price: `2.5` → `toll_2_5`, `2` → `toll_2_0`.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

const NAME_PREFIX: &str = "toll_";

/// A single toll price the study is evaluated at
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TollScenario {
    toll_price: f64,
}

impl TollScenario {
    pub fn new(toll_price: f64) -> Result<Self, ModelError> {
        if !toll_price.is_finite() || toll_price < 0.0 {
            return Err(ModelError::NegativeToll(toll_price));
        }
        // -0.0 + 0.0 is +0.0, so both zeros share a name and a seed
        Ok(Self {
            toll_price: toll_price + 0.0,
        })
    }

    #[inline]
    pub fn toll_price(&self) -> f64 {
        self.toll_price
    }

    /// Canonical scenario name, e.g. `toll_0_5`
    pub fn name(&self) -> String {
        // Debug keeps at least one fractional digit ("2.0", "0.5")
        format!("{}{}", NAME_PREFIX, format!("{:?}", self.toll_price).replace('.', "_"))
    }

    /// Inverse of [`TollScenario::name`]; also accepts integer names like `toll_3`
    pub fn from_name(name: &str) -> Option<Self> {
        let price = name.strip_prefix(NAME_PREFIX)?.replace('_', ".");
        price.parse::<f64>().ok().and_then(|p| Self::new(p).ok())
    }
}

impl fmt::Display for TollScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "€{:.2}", self.toll_price)
    }
}
