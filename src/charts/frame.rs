//! Joined View Module
//! Attaches boundary geometry to aggregate rows and slices them by year.

use super::renderer::RenderError;
use crate::data::{AggregateRecord, AggregateTable, BoundaryTable, RegionBoundary};
use geo::{BoundingRect, Rect};
use std::collections::BTreeSet;

/// One aggregate row with its region's geometry.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRegion<'a> {
    pub record: &'a AggregateRecord,
    pub boundary: &'a RegionBoundary,
}

/// Aggregates left-joined to boundaries on the lower-cased region name.
#[derive(Debug)]
pub struct JoinedView<'a> {
    rows: Vec<JoinedRegion<'a>>,
}

impl<'a> JoinedView<'a> {
    /// Join every aggregate row to its boundary.
    ///
    /// A row with no matching boundary aborts the join.
    pub fn build(
        aggregates: &'a AggregateTable,
        boundaries: &'a BoundaryTable,
    ) -> Result<Self, RenderError> {
        let rows = aggregates
            .records
            .iter()
            .map(|record| {
                boundaries
                    .get(&record.region)
                    .map(|boundary| JoinedRegion { record, boundary })
                    .ok_or_else(|| RenderError::UnmatchedRegion {
                        region: record.region.clone(),
                        year: record.year,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rows })
    }

    /// Distinct years in ascending order.
    pub fn years(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|r| r.record.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn frame(&self, year: i64) -> YearFrame<'a> {
        YearFrame {
            year,
            regions: self
                .rows
                .iter()
                .filter(|r| r.record.year == year)
                .copied()
                .collect(),
        }
    }

    /// One frame per year, ascending.
    pub fn frames(&self) -> Vec<YearFrame<'a>> {
        self.years().into_iter().map(|y| self.frame(y)).collect()
    }
}

/// The regions drawn for a single year.
#[derive(Debug, Clone)]
pub struct YearFrame<'a> {
    pub year: i64,
    pub regions: Vec<JoinedRegion<'a>>,
}

impl YearFrame<'_> {
    /// Bounding box of every region in the frame.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.regions
            .iter()
            .filter_map(|r| r.boundary.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }
}
