//! Data Processor Module
//! Cleans incident rows and aggregates them into the dominant animal per
//! borough per year.

use super::loader::{CATEGORY_COL, REGION_COL, YEAR_COL};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Administrative areas outside Greater London that still show up in the
/// export. Compared against lower-cased names.
pub const EXCLUDED_REGIONS: [&str; 4] = ["brentwood", "broxbourne", "epping forest", "tandridge"];

/// Every "Unknown - ..." variant collapses to this label.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// One cleaned rescue event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub year: i64,
    /// Lower-cased borough name.
    pub region: String,
    pub category: String,
}

/// How many raw rows each cleaning rule removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub missing_region: usize,
    pub excluded_region: usize,
    pub missing_year: usize,
    pub missing_category: usize,
    pub unknown_collapsed: usize,
    pub kept: usize,
}

/// Stable first-seen enumeration of category labels.
#[derive(Debug, Clone, Default)]
pub struct CategoryCodes {
    labels: Vec<String>,
    index: HashMap<String, u32>,
}

impl CategoryCodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for `label`, assigning the next free one on first sight.
    pub fn code_for(&mut self, label: &str) -> u32 {
        if let Some(&code) = self.index.get(label) {
            return code;
        }
        let code = self.labels.len() as u32;
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), code);
        code
    }

    /// Labels in code order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

/// The dominant category for one (year, region) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRecord {
    pub year: i64,
    pub region: String,
    pub category: String,
    pub code: u32,
}

/// Aggregated incidents, ordered by year then region.
#[derive(Debug, Clone, Default)]
pub struct AggregateTable {
    pub records: Vec<AggregateRecord>,
    pub codes: CategoryCodes,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Normalize a raw region value for comparison.
pub fn normalize_region(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Collapse every "Unknown - ..." variant. Applying it twice is a no-op.
pub fn collapse_unknown(category: &str) -> &str {
    if category.contains(UNKNOWN_CATEGORY) {
        UNKNOWN_CATEGORY
    } else {
        category
    }
}

pub fn is_excluded_region(region: &str) -> bool {
    EXCLUDED_REGIONS.contains(&region)
}

/// Handles cleaning and aggregation of the incident table.
pub struct DataProcessor;

impl DataProcessor {
    /// Apply the row filters and category normalization.
    ///
    /// Expects the three columns produced by
    /// [`IncidentLoader::load_csv`](super::IncidentLoader::load_csv).
    pub fn clean_incidents(
        df: &DataFrame,
    ) -> Result<(Vec<Incident>, CleaningReport), ProcessorError> {
        let years = df.column(YEAR_COL)?.cast(&DataType::Int64)?;
        let years = years.i64()?;
        let regions = df.column(REGION_COL)?.cast(&DataType::String)?;
        let regions = regions.str()?;
        let categories = df.column(CATEGORY_COL)?.cast(&DataType::String)?;
        let categories = categories.str()?;

        let mut report = CleaningReport {
            input_rows: df.height(),
            ..Default::default()
        };
        let mut incidents = Vec::with_capacity(df.height());

        for ((year, region), category) in years
            .into_iter()
            .zip(regions.into_iter())
            .zip(categories.into_iter())
        {
            let Some(region) = region.map(normalize_region).filter(|r| !r.is_empty()) else {
                report.missing_region += 1;
                continue;
            };
            if is_excluded_region(&region) {
                report.excluded_region += 1;
                continue;
            }
            let Some(year) = year else {
                report.missing_year += 1;
                continue;
            };
            let Some(category) = category else {
                report.missing_category += 1;
                continue;
            };

            let collapsed = collapse_unknown(category);
            if collapsed != category {
                report.unknown_collapsed += 1;
            }

            incidents.push(Incident {
                year,
                region,
                category: collapsed.to_string(),
            });
        }

        report.kept = incidents.len();
        Ok((incidents, report))
    }

    /// Pick the most frequent category per (year, region) and enumerate the
    /// winners in first-seen order.
    ///
    /// Ties go to the category that appeared first within the group.
    pub fn aggregate(incidents: &[Incident]) -> AggregateTable {
        // Per group: (category, count) in first-appearance order.
        let mut groups: BTreeMap<(i64, &str), Vec<(&str, usize)>> = BTreeMap::new();

        for incident in incidents {
            let counts = groups
                .entry((incident.year, incident.region.as_str()))
                .or_default();
            match counts.iter_mut().find(|(c, _)| *c == incident.category) {
                Some((_, n)) => *n += 1,
                None => counts.push((incident.category.as_str(), 1)),
            }
        }

        let mut codes = CategoryCodes::new();
        let records = groups
            .into_iter()
            .filter_map(|((year, region), counts)| {
                let category = Self::most_frequent(&counts)?;
                Some(AggregateRecord {
                    year,
                    region: region.to_string(),
                    category: category.to_string(),
                    code: codes.code_for(category),
                })
            })
            .collect();

        AggregateTable { records, codes }
    }

    /// First entry with the highest count.
    fn most_frequent<'a>(counts: &[(&'a str, usize)]) -> Option<&'a str> {
        let mut best: Option<(&str, usize)> = None;
        for &(category, n) in counts {
            if best.map_or(true, |(_, m)| n > m) {
                best = Some((category, n));
            }
        }
        best.map(|(c, _)| c)
    }

    /// Clean and aggregate in one step, logging what was dropped.
    pub fn prepare(df: &DataFrame) -> Result<AggregateTable, ProcessorError> {
        let (incidents, report) = Self::clean_incidents(df)?;
        tracing::info!(
            input = report.input_rows,
            kept = report.kept,
            missing_region = report.missing_region,
            excluded_region = report.excluded_region,
            unknown_collapsed = report.unknown_collapsed,
            "cleaned incidents"
        );
        if report.missing_year + report.missing_category > 0 {
            tracing::warn!(
                missing_year = report.missing_year,
                missing_category = report.missing_category,
                "dropped incidents without a year or animal group"
            );
        }

        let table = Self::aggregate(&incidents);
        tracing::info!(
            groups = table.len(),
            categories = table.codes.len(),
            "aggregated incidents by year and borough"
        );
        tracing::debug!(labels = ?table.codes.labels(), "category codes");
        Ok(table)
    }
}
