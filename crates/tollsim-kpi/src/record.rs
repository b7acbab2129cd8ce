//! Per-vehicle trip records
//!
//! A record is built from named fields (`id`, `vType`, `CO2_abs`,
//! `electricity_abs`) without caring which file format they came from.
//! Numeric fields are optional; a missing one contributes zero.

use serde::{Deserialize, Serialize};
use tollsim_common::{TripRecordError, VehicleClass};

/// Field names as written by the simulator
pub mod fields {
    pub const ID: &str = "id";
    pub const VEHICLE_TYPE: &str = "vType";
    /// Absolute CO2 emitted over the trip (mg)
    pub const CO2: &str = "CO2_abs";
    /// Absolute electrical energy consumed over the trip (Wh)
    pub const ELECTRICITY: &str = "electricity_abs";
}

/// One vehicle's trip summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub vehicle_id: Option<String>,
    pub vehicle_type: Option<String>,
    /// CO2 mass (mg)
    pub co2_mg: Option<f64>,
    /// Electrical energy (Wh)
    pub electricity_wh: Option<f64>,
}

impl TripRecord {
    /// Record for a typed vehicle with no emission data
    pub fn new(vehicle_id: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            vehicle_id: Some(vehicle_id.into()),
            vehicle_type: Some(vehicle_type.into()),
            ..Default::default()
        }
    }

    pub fn with_co2_mg(mut self, co2_mg: f64) -> Self {
        self.co2_mg = Some(co2_mg);
        self
    }

    pub fn with_electricity_wh(mut self, electricity_wh: f64) -> Self {
        self.electricity_wh = Some(electricity_wh);
        self
    }

    /// Extract a record from `(name, value)` pairs; unknown names are ignored
    pub fn from_fields<I, K, V>(pairs: I) -> Result<Self, TripRecordError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = TripRecord::default();
        for (name, value) in pairs {
            let value = value.as_ref();
            match name.as_ref() {
                fields::ID => record.vehicle_id = Some(value.to_string()),
                fields::VEHICLE_TYPE => record.vehicle_type = Some(value.to_string()),
                fields::CO2 => record.co2_mg = Some(parse_number(fields::CO2, value)?),
                fields::ELECTRICITY => {
                    record.electricity_wh = Some(parse_number(fields::ELECTRICITY, value)?)
                }
                _ => {}
            }
        }
        Ok(record)
    }

    /// EV / ICE class of the vehicle
    ///
    /// The vType decides; an unrecognised vType falls back to the emission
    /// fields (CO2 → ICE, electricity → EV). A record without vType is malformed.
    pub fn classify(&self) -> Result<VehicleClass, TripRecordError> {
        let vehicle_type = self
            .vehicle_type
            .as_deref()
            .ok_or(TripRecordError::MissingField(fields::VEHICLE_TYPE))?;

        if let Some(class) = VehicleClass::from_type_id(vehicle_type) {
            return Ok(class);
        }
        if self.co2_mg.unwrap_or(0.0) > 0.0 {
            Ok(VehicleClass::Ice)
        } else if self.electricity_wh.unwrap_or(0.0) > 0.0 {
            Ok(VehicleClass::Ev)
        } else {
            Err(TripRecordError::Unclassified {
                vehicle_id: self.vehicle_id.clone().unwrap_or_else(|| "?".to_string()),
                vehicle_type: vehicle_type.to_string(),
            })
        }
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, TripRecordError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TripRecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}
