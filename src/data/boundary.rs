//! Borough Boundary Module
//! Reads the boundary shapefile and derives label anchors and area scale.

use super::loader::{ensure_exists, LoaderError};
use super::processor::normalize_region;
use geo::{Centroid, MultiPolygon, Point};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;
use std::collections::HashMap;
use std::path::Path;

pub const NAME_ATTR: &str = "NAME";
pub const HECTARES_ATTR: &str = "HECTARES";

/// A region as read from the boundary file, before derived values.
#[derive(Debug, Clone)]
pub struct RawRegion {
    pub name: String,
    pub hectares: f64,
    pub geometry: MultiPolygon<f64>,
}

/// A region with its derived centroid and normalized area.
#[derive(Debug, Clone)]
pub struct RegionBoundary {
    /// Lower-cased name, the join key.
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub centroid: Point<f64>,
    /// Hectares rescaled to `[-1, 1]` across every region in the table.
    pub normalized_area: f64,
}

/// All regions of the boundary dataset, keyed by lower-cased name.
#[derive(Debug, Clone)]
pub struct BoundaryTable {
    regions: Vec<RegionBoundary>,
    by_name: HashMap<String, usize>,
}

impl BoundaryTable {
    /// Derive centroids and normalized areas for `regions`.
    ///
    /// Fails if the table is empty or if every region has the same area,
    /// since the rescale would divide by zero.
    pub fn from_regions(regions: Vec<RawRegion>) -> Result<Self, LoaderError> {
        let hectares: Vec<f64> = regions.iter().map(|r| r.hectares).collect();
        let normalized = normalize_areas(&hectares)?;

        let mut table = Self {
            regions: Vec::with_capacity(regions.len()),
            by_name: HashMap::with_capacity(regions.len()),
        };

        for (index, (raw, normalized_area)) in regions.into_iter().zip(normalized).enumerate() {
            let name = normalize_region(&raw.name);
            let centroid = raw
                .geometry
                .centroid()
                .ok_or_else(|| LoaderError::UnsupportedShape {
                    shape: "empty polygon".to_string(),
                    index,
                })?;

            if table.by_name.insert(name.clone(), table.regions.len()).is_some() {
                tracing::warn!(region = %name, "duplicate region name; later entry wins the join");
            }
            table.regions.push(RegionBoundary {
                name,
                geometry: raw.geometry,
                centroid,
                normalized_area,
            });
        }

        Ok(table)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&RegionBoundary> {
        self.by_name
            .get(&normalize_region(name))
            .map(|&i| &self.regions[i])
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

/// Linearly map `values` onto `[-1, 1]` using their global min and max.
pub fn normalize_areas(values: &[f64]) -> Result<Vec<f64>, LoaderError> {
    if values.is_empty() {
        return Err(LoaderError::NoRegions);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return Err(LoaderError::DegenerateAreaRange { hectares: min });
    }

    Ok(values
        .iter()
        .map(|&v| {
            // Pin the extremes so they land on exactly -1 and 1.
            if v == min {
                -1.0
            } else if v == max {
                1.0
            } else {
                2.0 * (v - min) / range - 1.0
            }
        })
        .collect())
}

/// Reads borough polygons and attributes from an ESRI shapefile.
pub struct BoundaryLoader;

impl BoundaryLoader {
    pub fn load(path: &Path) -> Result<BoundaryTable, LoaderError> {
        ensure_exists(path)?;
        let mut reader = shapefile::Reader::from_path(path)?;

        let mut regions = Vec::new();
        for (index, item) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = item?;
            regions.push(Self::to_raw_region(index, shape, &record)?);
        }

        let table = BoundaryTable::from_regions(regions)?;
        tracing::info!(
            path = %path.display(),
            regions = table.len(),
            "loaded boundary table"
        );
        Ok(table)
    }

    fn to_raw_region(index: usize, shape: Shape, record: &Record) -> Result<RawRegion, LoaderError> {
        let name = match record.get(NAME_ATTR) {
            Some(FieldValue::Character(Some(name))) => name.clone(),
            _ => return Err(Self::missing(NAME_ATTR, index)),
        };
        let hectares = match record.get(HECTARES_ATTR) {
            Some(FieldValue::Numeric(Some(v))) => *v,
            Some(FieldValue::Float(Some(v))) => f64::from(*v),
            Some(FieldValue::Double(v)) => *v,
            Some(FieldValue::Integer(v)) => f64::from(*v),
            _ => return Err(Self::missing(HECTARES_ATTR, index)),
        };
        let geometry = match shape {
            Shape::Polygon(polygon) => MultiPolygon::<f64>::from(polygon),
            other => {
                return Err(LoaderError::UnsupportedShape {
                    shape: format!("{:?}", other.shapetype()),
                    index,
                })
            }
        };

        Ok(RawRegion {
            name,
            hectares,
            geometry,
        })
    }

    fn missing(attribute: &str, index: usize) -> LoaderError {
        LoaderError::MissingAttribute {
            attribute: attribute.to_string(),
            index,
        }
    }
}
