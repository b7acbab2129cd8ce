//! Study results table
//!
//! One row per scenario, kept sorted by ascending toll price. Written as CSV
//! for downstream tooling and as a Markdown table for reports.

use crate::aggregator::ScenarioKpis;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use tollsim_common::{Result, TollsimError};
use tracing::info;

/// CSV row layout
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Toll Price (EUR)")]
    toll_price: f64,
    #[serde(rename = "EV Share")]
    ev_share: f64,
    #[serde(rename = "Total CO2 (kg)")]
    co2_kg: f64,
    #[serde(rename = "Grid Cost (EUR)")]
    grid_cost_eur: f64,
    #[serde(rename = "Toll Revenue (EUR)")]
    revenue_eur: f64,
    #[serde(rename = "Total Vehicles")]
    total_vehicles: u64,
    #[serde(rename = "Skipped Records")]
    skipped_records: u64,
}

impl From<&ScenarioKpis> for CsvRow {
    fn from(k: &ScenarioKpis) -> Self {
        Self {
            toll_price: k.toll_price,
            ev_share: k.ev_share,
            co2_kg: k.co2_kg,
            grid_cost_eur: k.grid_cost_eur,
            revenue_eur: k.revenue_eur,
            total_vehicles: k.total_vehicles,
            skipped_records: k.skipped_records,
        }
    }
}

/// Scenario KPIs ordered by toll price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    rows: Vec<ScenarioKpis>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, replacing any row with the same toll price
    pub fn insert(&mut self, kpis: ScenarioKpis) {
        match self
            .rows
            .binary_search_by(|row| row.toll_price.total_cmp(&kpis.toll_price))
        {
            Ok(idx) => self.rows[idx] = kpis,
            Err(idx) => self.rows.insert(idx, kpis),
        }
    }

    pub fn rows(&self) -> &[ScenarioKpis] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, toll_price: f64) -> Option<&ScenarioKpis> {
        self.rows.iter().find(|row| row.toll_price == toll_price)
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_rows(&mut writer)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| TollsimError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| TollsimError::Serialization(e.to_string()))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| TollsimError::Storage(format!("{}: {}", path.display(), e)))?;
        self.write_rows(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), rows = self.rows.len(), "Wrote results table");
        Ok(())
    }

    fn write_rows<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        for row in &self.rows {
            writer
                .serialize(CsvRow::from(row))
                .map_err(|e| TollsimError::Serialization(e.to_string()))?;
        }
        Ok(())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Simulation Results\n\n");
        out.push_str(
            "| Toll Price (EUR) | EV Share | Total CO2 (kg) | Grid Cost (EUR) | Toll Revenue (EUR) | Total Vehicles | Skipped Records |\n",
        );
        out.push_str("|---:|---:|---:|---:|---:|---:|---:|\n");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "| {:.2} | {:.1}% | {:.2} | {:.2} | {:.2} | {} | {} |",
                row.toll_price,
                row.ev_share * 100.0,
                row.co2_kg,
                row.grid_cost_eur,
                row.revenue_eur,
                row.total_vehicles,
                row.skipped_records
            );
        }
        out
    }
}

impl FromIterator<ScenarioKpis> for ResultsTable {
    fn from_iter<I: IntoIterator<Item = ScenarioKpis>>(iter: I) -> Self {
        let mut table = ResultsTable::new();
        for kpis in iter {
            table.insert(kpis);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(toll: f64, ev_share: f64) -> ScenarioKpis {
        ScenarioKpis {
            toll_price: toll,
            ev_share,
            co2_kg: 10.0 * (1.0 - ev_share),
            energy_kwh: 5.0,
            grid_cost_eur: 1.0,
            revenue_eur: toll * 6.0,
            ev_count: 4,
            ice_count: 6,
            total_vehicles: 10,
            skipped_records: 0,
        }
    }

    #[test]
    fn test_rows_sorted_by_toll() {
        let table: ResultsTable = vec![row(2.0, 0.5), row(0.0, 0.3), row(1.0, 0.4)]
            .into_iter()
            .collect();
        let tolls: Vec<f64> = table.rows().iter().map(|r| r.toll_price).collect();
        assert_eq!(tolls, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_insert_replaces_same_toll() {
        let mut table = ResultsTable::new();
        table.insert(row(1.0, 0.4));
        table.insert(row(1.0, 0.6));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(1.0).unwrap().ev_share, 0.6);
    }

    #[test]
    fn test_csv_headers() {
        let table: ResultsTable = std::iter::once(row(0.5, 0.25)).collect();
        let csv = table.to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Toll Price (EUR),EV Share,Total CO2 (kg),Grid Cost (EUR),Toll Revenue (EUR),Total Vehicles,Skipped Records"
        );
        assert_eq!(lines.next().unwrap(), "0.5,0.25,7.5,1.0,3.0,10,0");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simulation_results.csv");
        let table: ResultsTable = vec![row(1.0, 0.4), row(0.0, 0.3)].into_iter().collect();
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("0.0,"));
    }

    #[test]
    fn test_markdown() {
        let table: ResultsTable = std::iter::once(row(2.5, 0.525)).collect();
        let md = table.to_markdown();
        assert!(md.starts_with("# Simulation Results"));
        assert!(md.contains("| 2.50 | 52.5% |"));
    }
}
