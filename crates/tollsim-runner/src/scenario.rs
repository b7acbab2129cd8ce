//! Scenario generation
//!
//! For one toll price: label the base demand's vehicles EV / ICE with the
//! adoption model, write the relabeled route file, and write the simulator
//! config that points at it. Output lands in the scenario directory as
//!
//! ```text
//! routes_toll_2_5.xml
//! config_toll_2_5.sumo.cfg      (tripinfo output: tripinfo_toll_2_5.xml)
//! ```

use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tollsim_common::{
    AdoptionModelParameters, Result, ScenarioSettings, TollScenario, TollsimError, VehicleClass,
};
use tollsim_model::{label_scenario, scenario_rng};
use tracing::{debug, info, instrument};

const VEHICLE: &[u8] = b"vehicle";
const TYPE_ATTR: &[u8] = b"type";

/// Vehicle type definitions inserted at the top of every route file
struct VehicleTypeDef {
    class: VehicleClass,
    emission_class: &'static str,
    color: &'static str,
}

const VEHICLE_TYPES: [VehicleTypeDef; 2] = [
    VehicleTypeDef {
        class: VehicleClass::Ice,
        emission_class: "HBEFA3/PC_G_EU4",
        color: "1,0,0",
    },
    VehicleTypeDef {
        class: VehicleClass::Ev,
        emission_class: "Energy/unknown",
        color: "0,1,0",
    },
];

pub fn routes_file_name(scenario: &TollScenario) -> String {
    format!("routes_{}.xml", scenario.name())
}

pub fn config_file_name(scenario: &TollScenario) -> String {
    format!("config_{}.sumo.cfg", scenario.name())
}

pub fn tripinfo_file_name(scenario: &TollScenario) -> String {
    format!("tripinfo_{}.xml", scenario.name())
}

/// Scenario a `tripinfo_toll_<x>.xml` file belongs to
pub fn parse_tripinfo_file_name(file_name: &str) -> Option<TollScenario> {
    let name = file_name.strip_prefix("tripinfo_")?.strip_suffix(".xml")?;
    TollScenario::from_name(name)
}

/// Files and labeling summary for one generated scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedScenario {
    pub toll_price: f64,
    pub name: String,
    /// Target EV share from the adoption model
    pub ev_share: f64,
    pub vehicles: usize,
    pub ev_count: usize,
    pub routes_file: PathBuf,
    pub config_file: PathBuf,
    /// Where the simulator will write its trip log
    pub tripinfo_file: PathBuf,
}

impl GeneratedScenario {
    pub fn scenario(&self) -> Result<TollScenario> {
        Ok(TollScenario::new(self.toll_price)?)
    }
}

/// Writes scenario files from a base route file
#[derive(Debug, Clone)]
pub struct ScenarioGenerator {
    params: AdoptionModelParameters,
    settings: ScenarioSettings,
}

impl ScenarioGenerator {
    pub fn new(params: AdoptionModelParameters, settings: ScenarioSettings) -> Self {
        Self { params, settings }
    }

    pub fn settings(&self) -> &ScenarioSettings {
        &self.settings
    }

    #[instrument(skip(self, scenario), fields(toll = scenario.toll_price()))]
    pub fn generate(&self, scenario: &TollScenario) -> Result<GeneratedScenario> {
        let base = &self.settings.base_routes_file;
        let out_dir = &self.settings.output_dir;
        fs::create_dir_all(out_dir)?;

        // First pass: the Exact policy needs the fleet size up front
        let vehicles = count_vehicles(open(base)?)?;

        let mut rng = scenario_rng(self.settings.seed, scenario);
        let fleet = label_scenario(
            &self.params,
            scenario,
            vehicles,
            self.settings.labeling,
            &mut rng,
        )?;

        let routes_file = out_dir.join(routes_file_name(scenario));
        let output = File::create(&routes_file).map_err(|e| {
            TollsimError::Storage(format!("cannot create {}: {}", routes_file.display(), e))
        })?;
        let mut output = BufWriter::new(output);
        rewrite_routes(open(base)?, &mut output, &fleet.labels)?;
        output.flush()?;

        let config_file = out_dir.join(config_file_name(scenario));
        let net_ref = path_from_dir(out_dir, &self.settings.net_file);
        fs::write(
            &config_file,
            render_sumo_config(&self.settings, scenario, &net_ref.to_string_lossy()),
        )?;

        info!(
            scenario = %scenario.name(),
            ev_share = fleet.ev_share,
            vehicles,
            evs = fleet.ev_count(),
            "Generated scenario"
        );

        Ok(GeneratedScenario {
            toll_price: scenario.toll_price(),
            name: scenario.name(),
            ev_share: fleet.ev_share,
            vehicles,
            ev_count: fleet.ev_count(),
            routes_file,
            config_file,
            tripinfo_file: out_dir.join(tripinfo_file_name(scenario)),
        })
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| TollsimError::Storage(format!("cannot open {}: {}", path.display(), e)))
}

fn xml_error(err: impl std::fmt::Display) -> TollsimError {
    TollsimError::Serialization(format!("route XML: {}", err))
}

/// Number of `<vehicle>` elements directly under the root
pub fn count_vehicles<R: BufRead>(input: R) -> Result<usize> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut count = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                if depth == 1 && e.name().as_ref() == VEHICLE {
                    count += 1;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 1 && e.name().as_ref() == VEHICLE {
                    count += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(count)
}

/// Copy a route file, inserting the ICE / EV type definitions after the root
/// start tag and setting each top-level vehicle's `type` from `labels`
///
/// Returns the number of vehicles relabeled.
pub fn rewrite_routes<R: BufRead, W: Write>(
    input: R,
    output: W,
    labels: &[VehicleClass],
) -> Result<usize> {
    let mut reader = Reader::from_reader(input);
    let mut writer = Writer::new(output);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut next = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        match event {
            Event::Start(e) if depth == 0 => {
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
                write_vehicle_types(&mut writer)?;
                depth = 1;
            }
            // Root without children
            Event::Empty(e) if depth == 0 => {
                let root = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
                write_vehicle_types(&mut writer)?;
                writer
                    .write_event(Event::Text(BytesText::new("\n")))
                    .map_err(xml_error)?;
                writer
                    .write_event(Event::End(BytesEnd::new(root)))
                    .map_err(xml_error)?;
            }
            Event::Start(e) if depth == 1 && e.name().as_ref() == VEHICLE => {
                let relabeled = relabel(&e, label_at(labels, next)?)?;
                next += 1;
                writer.write_event(Event::Start(relabeled)).map_err(xml_error)?;
                depth += 1;
            }
            Event::Empty(e) if depth == 1 && e.name().as_ref() == VEHICLE => {
                let relabeled = relabel(&e, label_at(labels, next)?)?;
                next += 1;
                writer.write_event(Event::Empty(relabeled)).map_err(xml_error)?;
            }
            Event::Start(e) => {
                writer.write_event(Event::Start(e)).map_err(xml_error)?;
                depth += 1;
            }
            Event::End(e) => {
                writer.write_event(Event::End(e)).map_err(xml_error)?;
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(xml_error)?,
        }
        buf.clear();
    }

    if next != labels.len() {
        return Err(TollsimError::Internal(format!(
            "route file has {} vehicles but {} labels were drawn",
            next,
            labels.len()
        )));
    }
    debug!(vehicles = next, "Relabeled route file");
    Ok(next)
}

fn label_at(labels: &[VehicleClass], idx: usize) -> Result<VehicleClass> {
    labels.get(idx).copied().ok_or_else(|| {
        TollsimError::Internal(format!(
            "route file has more vehicles than the {} labels drawn",
            labels.len()
        ))
    })
}

fn relabel(vehicle: &BytesStart<'_>, class: VehicleClass) -> Result<BytesStart<'static>> {
    let mut out = BytesStart::new(String::from_utf8_lossy(vehicle.name().as_ref()).into_owned());
    for attr in vehicle.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() != TYPE_ATTR {
            out.push_attribute(attr);
        }
    }
    out.push_attribute(("type", class.type_id()));
    Ok(out)
}

fn write_vehicle_types<W: Write>(writer: &mut Writer<W>) -> Result<()> {
    for def in &VEHICLE_TYPES {
        writer
            .write_event(Event::Text(BytesText::new("\n    ")))
            .map_err(xml_error)?;

        let mut vtype = BytesStart::new("vType");
        vtype.push_attribute(("id", def.class.type_id()));
        vtype.push_attribute(("emissionClass", def.emission_class));
        vtype.push_attribute(("color", def.color));
        writer.write_event(Event::Start(vtype)).map_err(xml_error)?;

        writer
            .write_event(Event::Text(BytesText::new("\n        ")))
            .map_err(xml_error)?;
        let mut param = BytesStart::new("param");
        param.push_attribute(("key", "device.emissions.probability"));
        param.push_attribute(("value", "1.0"));
        writer.write_event(Event::Empty(param)).map_err(xml_error)?;

        writer
            .write_event(Event::Text(BytesText::new("\n    ")))
            .map_err(xml_error)?;
        writer
            .write_event(Event::End(BytesEnd::new("vType")))
            .map_err(xml_error)?;
    }
    Ok(())
}

/// Simulator configuration for one scenario
///
/// File references are relative to the scenario directory, where the config
/// itself is written.
pub fn render_sumo_config(
    settings: &ScenarioSettings,
    scenario: &TollScenario,
    net_file: &str,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/sumoConfiguration.xsd">
    <input>
        <net-file value="{net}"/>
        <route-files value="{routes}"/>
    </input>

    <time>
        <begin value="{begin}"/>
        <end value="{end}"/>
        <step-length value="{step}"/>
    </time>

    <output>
        <tripinfo-output value="{tripinfo}"/>
    </output>

    <report>
        <no-step-log value="true"/>
    </report>
</configuration>
"#,
        net = escape(net_file),
        routes = escape(&routes_file_name(scenario)),
        begin = settings.begin,
        end = settings.end,
        step = settings.step_length,
        tripinfo = escape(&tripinfo_file_name(scenario)),
    )
}

/// `target` as seen from inside `dir`
fn path_from_dir(dir: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }

    let mut up = PathBuf::new();
    for component in dir.components() {
        match component {
            Component::Normal(_) => up.push(".."),
            Component::CurDir => {}
            _ => {
                return std::env::current_dir()
                    .map(|cwd| cwd.join(target))
                    .unwrap_or_else(|_| target.to_path_buf())
            }
        }
    }
    up.join(target)
}
