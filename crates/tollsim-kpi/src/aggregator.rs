//! KPI aggregation over one scenario's trip records
//!
//! Accumulates per-vehicle records into the scenario totals that go into the
//! results table. Malformed records are skipped and counted, never fatal.

use crate::record::TripRecord;
use serde::{Deserialize, Serialize};
use tollsim_common::{KpiConfig, TripRecordError, VehicleClass, MG_PER_KG, WH_PER_KWH};
use tracing::{debug, warn};

/// Aggregated outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioKpis {
    /// Toll price (EUR)
    pub toll_price: f64,
    /// EVs over classified vehicles, 0.0 for an empty log
    pub ev_share: f64,
    /// Total CO2 of ICE trips (kg)
    pub co2_kg: f64,
    /// Total grid energy of EV trips (kWh)
    pub energy_kwh: f64,
    /// Energy × grid price (EUR)
    pub grid_cost_eur: f64,
    /// Toll × ICE count (EUR)
    pub revenue_eur: f64,
    pub ev_count: u64,
    pub ice_count: u64,
    /// Classified vehicles
    pub total_vehicles: u64,
    /// Records skipped as malformed
    pub skipped_records: u64,
}

/// Running totals for one scenario
#[derive(Debug, Clone)]
pub struct KpiAggregator {
    toll_price: f64,
    grid_cost_per_kwh: f64,
    co2_mg: f64,
    energy_wh: f64,
    ev_count: u64,
    ice_count: u64,
    skipped: u64,
}

impl KpiAggregator {
    pub fn new(toll_price: f64, config: &KpiConfig) -> Self {
        Self {
            toll_price,
            grid_cost_per_kwh: config.grid_cost_per_kwh,
            co2_mg: 0.0,
            energy_wh: 0.0,
            ev_count: 0,
            ice_count: 0,
            skipped: 0,
        }
    }

    /// Add one record; returns its class, or `None` if it was skipped
    pub fn push(&mut self, record: &TripRecord) -> Option<VehicleClass> {
        match record.classify() {
            Ok(class) => {
                // CO2 is charged to ICE trips, grid energy to EV trips
                match class {
                    VehicleClass::Ev => {
                        self.ev_count += 1;
                        self.energy_wh += record.electricity_wh.unwrap_or(0.0);
                    }
                    VehicleClass::Ice => {
                        self.ice_count += 1;
                        self.co2_mg += record.co2_mg.unwrap_or(0.0);
                    }
                }
                Some(class)
            }
            Err(err) => {
                self.skip(&err);
                None
            }
        }
    }

    /// Add a record that may have failed to parse
    pub fn push_result(
        &mut self,
        record: Result<TripRecord, TripRecordError>,
    ) -> Option<VehicleClass> {
        match record {
            Ok(record) => self.push(&record),
            Err(err) => {
                self.skip(&err);
                None
            }
        }
    }

    fn skip(&mut self, err: &TripRecordError) {
        self.skipped += 1;
        debug!(toll = self.toll_price, error = %err, "Skipping trip record");
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn finish(self) -> ScenarioKpis {
        let total = self.ev_count + self.ice_count;
        let ev_share = if total == 0 {
            0.0
        } else {
            self.ev_count as f64 / total as f64
        };
        let energy_kwh = self.energy_wh / WH_PER_KWH;

        if self.skipped > 0 {
            warn!(
                toll = self.toll_price,
                skipped = self.skipped,
                "Trip records skipped as malformed"
            );
        }

        ScenarioKpis {
            toll_price: self.toll_price,
            ev_share,
            co2_kg: self.co2_mg / MG_PER_KG,
            energy_kwh,
            grid_cost_eur: energy_kwh * self.grid_cost_per_kwh,
            revenue_eur: self.toll_price * self.ice_count as f64,
            ev_count: self.ev_count,
            ice_count: self.ice_count,
            total_vehicles: total,
            skipped_records: self.skipped,
        }
    }
}

/// Aggregate an in-memory record set
pub fn aggregate<'a, I>(toll_price: f64, config: &KpiConfig, records: I) -> ScenarioKpis
where
    I: IntoIterator<Item = &'a TripRecord>,
{
    let mut aggregator = KpiAggregator::new(toll_price, config);
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}
