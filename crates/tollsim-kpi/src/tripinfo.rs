//! Streaming reader for simulator trip-info logs
//!
//! Each `<tripinfo>` element describes one finished trip; its emission totals
//! sit in a nested `<emissions>` element:
//!
//! ```xml
//! <tripinfos>
//!     <tripinfo id="veh0" vType="ICE" duration="412.00">
//!         <emissions CO2_abs="1034571.42" electricity_abs="0.00"/>
//!     </tripinfo>
//! </tripinfos>
//! ```
//!
//! The two attribute sets are merged into a single [`TripRecord`]. A record
//! that fails to parse is handed back as an inner `Err` so callers can skip it;
//! broken XML ends the stream with an outer `Err`.

use crate::aggregator::{KpiAggregator, ScenarioKpis};
use crate::record::TripRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tollsim_common::{KpiConfig, Result, TollsimError, TripRecordError};
use tracing::{debug, instrument};

const TRIPINFO: &[u8] = b"tripinfo";
const EMISSIONS: &[u8] = b"emissions";

/// A trip record, or the reason it could not be read
pub type ParsedTrip = std::result::Result<TripRecord, TripRecordError>;

/// Iterator over the trip records of one log
pub struct TripInfoReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    current: Option<Vec<(String, String)>>,
    finished: bool,
}

enum Step {
    Continue,
    Yield(ParsedTrip),
    Fail(String),
    Eof,
}

impl TripInfoReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            TollsimError::Storage(format!("cannot open {}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TripInfoReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::new(),
            current: None,
            finished: false,
        }
    }

    fn step(&mut self) -> Step {
        self.buf.clear();
        match self.reader.read_event_into(&mut self.buf) {
            Err(e) => Step::Fail(e.to_string()),
            Ok(Event::Start(e)) if e.name().as_ref() == TRIPINFO => match attributes(&e) {
                Ok(attrs) => {
                    self.current = Some(attrs);
                    Step::Continue
                }
                Err(msg) => Step::Fail(msg),
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == TRIPINFO => match attributes(&e) {
                Ok(attrs) => Step::Yield(TripRecord::from_fields(attrs)),
                Err(msg) => Step::Fail(msg),
            },
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == EMISSIONS => {
                match self.current.as_mut() {
                    Some(fields) => match attributes(&e) {
                        Ok(attrs) => {
                            fields.extend(attrs);
                            Step::Continue
                        }
                        Err(msg) => Step::Fail(msg),
                    },
                    None => Step::Continue,
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == TRIPINFO => match self.current.take() {
                Some(fields) => Step::Yield(TripRecord::from_fields(fields)),
                None => Step::Continue,
            },
            Ok(Event::Eof) => {
                if self.current.is_some() {
                    Step::Fail("log ends inside a <tripinfo> element".to_string())
                } else {
                    Step::Eof
                }
            }
            Ok(_) => Step::Continue,
        }
    }
}

impl<R: BufRead> Iterator for TripInfoReader<R> {
    type Item = Result<ParsedTrip>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.step() {
                Step::Continue => continue,
                Step::Yield(record) => return Some(Ok(record)),
                Step::Eof => {
                    self.finished = true;
                    return None;
                }
                Step::Fail(msg) => {
                    self.finished = true;
                    return Some(Err(TollsimError::Serialization(format!(
                        "tripinfo XML at byte {}: {}",
                        self.reader.buffer_position(),
                        msg
                    ))));
                }
            }
        }
    }
}

fn attributes(element: &BytesStart<'_>) -> std::result::Result<Vec<(String, String)>, String> {
    element
        .attributes()
        .map(|attr| {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            Ok((key, value.into_owned()))
        })
        .collect()
}

/// Aggregate every record of a log read from `inner`
pub fn aggregate_reader<R: BufRead>(
    inner: R,
    toll_price: f64,
    config: &KpiConfig,
) -> Result<ScenarioKpis> {
    aggregate_records(TripInfoReader::new(inner), toll_price, config)
}

/// Aggregate the trip-info log at `path`
#[instrument(skip(config), fields(path = %path.display()))]
pub fn aggregate_file(path: &Path, toll_price: f64, config: &KpiConfig) -> Result<ScenarioKpis> {
    let kpis = aggregate_records(TripInfoReader::open(path)?, toll_price, config)?;
    debug!(
        vehicles = kpis.total_vehicles,
        skipped = kpis.skipped_records,
        "Aggregated trip log"
    );
    Ok(kpis)
}

fn aggregate_records<R: BufRead>(
    records: TripInfoReader<R>,
    toll_price: f64,
    config: &KpiConfig,
) -> Result<ScenarioKpis> {
    let mut aggregator = KpiAggregator::new(toll_price, config);
    for parsed in records {
        aggregator.push_result(parsed?);
    }
    Ok(aggregator.finish())
}
