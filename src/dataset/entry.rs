// src/dataset/entry.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A measurement series stored alongside `periods` in the weekly data file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Series {
    AreaSc,
    AreaCc,
    SrArea,
    ScGrowthRates,
    CcGrowthRates,
}

impl Series {
    pub const ALL: [Series; 5] = [
        Series::AreaSc,
        Series::AreaCc,
        Series::SrArea,
        Series::ScGrowthRates,
        Series::CcGrowthRates,
    ];

    /// Field name used in the JSON file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Series::AreaSc => "areaSc",
            Series::AreaCc => "areaCc",
            Series::SrArea => "srArea",
            Series::ScGrowthRates => "scGrowthRates",
            Series::CcGrowthRates => "ccGrowthRates",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One week of a query: the period label and whatever measurements exist for it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeriodPoint {
    pub period: String,
    values: [Option<Value>; 5],
}

impl PeriodPoint {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            values: Default::default(),
        }
    }

    pub fn with(mut self, series: Series, value: impl Into<Value>) -> Self {
        self.values[series.slot()] = Some(value.into());
        self
    }

    pub fn get(&self, series: Series) -> Option<&Value> {
        self.values[series.slot()].as_ref()
    }
}

/// All periods of a single query, kept as one ordered list of points so the
/// measurement series can never drift out of alignment with `periods`.
///
/// The file format stores parallel arrays; conversion happens through
/// [`RawEntry`]. A series shorter than `periods` is kept short: values past
/// its end are simply absent on the corresponding points. Values past the
/// last period are kept as a tail and written back after the aligned ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub struct QueryEntry {
    points: Vec<PeriodPoint>,
    /// Series that appeared in the file, re-emitted even when empty.
    series: BTreeSet<Series>,
    /// Values of a series that run past the last period.
    tail: BTreeMap<Series, Vec<Value>>,
    /// Everything else on the entry (e.g. `summary`), passed through untouched.
    extra: Map<String, Value>,
}

impl QueryEntry {
    pub fn from_points(points: Vec<PeriodPoint>) -> Self {
        let series = Series::ALL
            .into_iter()
            .filter(|s| points.iter().any(|p| p.get(*s).is_some()))
            .collect();
        Self {
            points,
            series,
            tail: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn points(&self) -> &[PeriodPoint] {
        &self.points
    }

    pub fn periods(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.period.as_str())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn position(&self, period: &str) -> Option<usize> {
        self.points.iter().position(|p| p.period == period)
    }

    pub fn contains(&self, period: &str) -> bool {
        self.position(period).is_some()
    }

    /// Values of `series` as they would be written to the file.
    pub fn series_values(&self, series: Series) -> Option<Vec<&Value>> {
        if !self.series.contains(&series) {
            return None;
        }
        let aligned = self.points.iter().map_while(|p| p.get(series));
        Some(aligned.chain(self.tail.get(&series).into_iter().flatten()).collect())
    }

    /// Values of `series` that have no period to go with.
    pub fn unaligned(&self, series: Series) -> &[Value] {
        self.tail.get(&series).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Remove the first point labelled `period`, returning it.
    ///
    /// Keeps `summary.totalPeriods` in step with the remaining points when the
    /// entry carries one.
    pub fn remove_period(&mut self, period: &str) -> Option<PeriodPoint> {
        let idx = self.position(period)?;
        let removed = self.points.remove(idx);
        self.refresh_summary();
        Some(removed)
    }

    fn refresh_summary(&mut self) {
        let total = self.points.len();
        if let Some(Value::Object(summary)) = self.extra.get_mut("summary") {
            if summary.get("totalPeriods").is_some_and(Value::is_number) {
                summary.insert("totalPeriods".to_string(), Value::from(total));
            }
        }
    }
}

/// On-disk shape of a query entry: `periods` plus index-aligned arrays.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    periods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area_sc: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    area_cc: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sr_area: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sc_growth_rates: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cc_growth_rates: Option<Vec<Value>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RawEntry {
    fn series_mut(&mut self, series: Series) -> &mut Option<Vec<Value>> {
        match series {
            Series::AreaSc => &mut self.area_sc,
            Series::AreaCc => &mut self.area_cc,
            Series::SrArea => &mut self.sr_area,
            Series::ScGrowthRates => &mut self.sc_growth_rates,
            Series::CcGrowthRates => &mut self.cc_growth_rates,
        }
    }
}

impl From<RawEntry> for QueryEntry {
    fn from(mut raw: RawEntry) -> Self {
        let mut points: Vec<PeriodPoint> = raw.periods.drain(..).map(PeriodPoint::new).collect();
        let mut series = BTreeSet::new();
        let mut tail = BTreeMap::new();

        for s in Series::ALL {
            let Some(mut values) = raw.series_mut(s).take() else {
                continue;
            };
            if values.len() > points.len() {
                tail.insert(s, values.split_off(points.len()));
            }
            for (point, value) in points.iter_mut().zip(values) {
                point.values[s.slot()] = Some(value);
            }
            series.insert(s);
        }

        Self {
            points,
            series,
            tail,
            extra: raw.extra,
        }
    }
}

impl From<QueryEntry> for RawEntry {
    fn from(entry: QueryEntry) -> Self {
        let mut raw = RawEntry {
            periods: entry.points.iter().map(|p| p.period.clone()).collect(),
            area_sc: None,
            area_cc: None,
            sr_area: None,
            sc_growth_rates: None,
            cc_growth_rates: None,
            extra: entry.extra,
        };
        for s in &entry.series {
            let mut values: Vec<Value> = entry
                .points
                .iter()
                .map_while(|p| p.get(*s).cloned())
                .collect();
            if let Some(extra) = entry.tail.get(s) {
                values.extend(extra.iter().cloned());
            }
            *raw.series_mut(*s) = Some(values);
        }
        raw
    }
}
