// In-memory spatial index for zone attribution.
//
// Each reference layer (service areas, counties, ZCTAs) is loaded once
// from GeoJSON, indexed in an R-tree, and shared read-only by every
// classification lookup.
use crate::error::ReportError;
use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::GeoJson;
use rstar::{RTree, RTreeObject, AABB};

pub const UNKNOWN: &str = "Unknown";
pub const OUT_OF_REGION: &str = "Out of Region";

/// A zone polygon stored in the R-tree with its labels.
pub struct ZoneEntry {
    /// Position in the source dataset. Overlapping zones are resolved
    /// by lowest `seq`, i.e. first in canonical dataset order.
    seq: usize,
    /// Primary label: ESO name, county FIPS, or ZCTA ZIP.
    pub id: String,
    /// Secondary label where the layer has one (county name).
    pub name: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Result of classifying one coordinate against one layer.
pub enum ZoneHit<'a> {
    Zone(&'a ZoneEntry),
    /// Either coordinate was missing.
    Unknown,
    /// Both coordinates present but no polygon contains the point.
    OutOfRegion,
}

impl ZoneHit<'_> {
    pub fn id(&self) -> &str {
        match self {
            Self::Zone(e) => &e.id,
            Self::Unknown => UNKNOWN,
            Self::OutOfRegion => OUT_OF_REGION,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Zone(e) => &e.name,
            Self::Unknown => UNKNOWN,
            Self::OutOfRegion => OUT_OF_REGION,
        }
    }
}

/// One polygon collection with a spatial index over it.
pub struct ZoneLayer {
    tree: RTree<ZoneEntry>,
}

impl ZoneLayer {
    /// Build a layer from (id, name, polygon) triples in dataset order.
    pub fn from_entries(
        name: &str,
        entries: Vec<(String, String, MultiPolygon<f64>)>,
    ) -> Result<Self, ReportError> {
        if entries.is_empty() {
            return Err(ReportError::BadZoneLayer {
                layer: name.to_string(),
                reason: "no polygons".to_string(),
            });
        }
        let entries: Vec<ZoneEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(seq, (id, zone_name, polygon))| {
                let envelope = compute_envelope(&polygon);
                ZoneEntry {
                    seq,
                    id,
                    name: zone_name,
                    envelope,
                    polygon,
                }
            })
            .collect();
        log::info!("Indexed {} polygons for zone layer {}", entries.len(), name);
        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    /// Load a layer from a GeoJSON FeatureCollection on disk.
    ///
    /// `id_prop` names the property carrying the zone label; `name_prop`
    /// an optional secondary label (county name). Any feature missing a
    /// label or polygon geometry makes the whole layer unusable: a bad
    /// reference dataset fails once at load, never per point.
    pub fn from_geojson_file(
        path: &str,
        name: &str,
        id_prop: &str,
        name_prop: Option<&str>,
    ) -> Result<Self, ReportError> {
        let raw = std::fs::read_to_string(path)?;
        let geojson: GeoJson = raw.parse()?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(ReportError::BadZoneLayer {
                layer: path.to_string(),
                reason: "not a FeatureCollection".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(collection.features.len());
        for (idx, feature) in collection.features.into_iter().enumerate() {
            let bad = |reason: String| ReportError::BadZoneLayer {
                layer: path.to_string(),
                reason,
            };

            let id = feature
                .properties
                .as_ref()
                .and_then(|p| p.get(id_prop))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| bad(format!("feature {} missing property {}", idx, id_prop)))?;
            let zone_name = match name_prop {
                Some(prop) => feature
                    .properties
                    .as_ref()
                    .and_then(|p| p.get(prop))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| bad(format!("feature {} missing property {}", idx, prop)))?,
                None => id.clone(),
            };

            let geometry = feature
                .geometry
                .ok_or_else(|| bad(format!("feature {} has no geometry", idx)))?;
            let geo_geom: geo::Geometry<f64> = geometry
                .try_into()
                .map_err(|_| bad(format!("feature {} geometry is not convertible", idx)))?;
            let polygon = match geo_geom {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
                _ => return Err(bad(format!("feature {} is not a polygon", idx))),
            };
            entries.push((id, zone_name, polygon));
        }

        Self::from_entries(name, entries)
    }

    /// Point-in-polygon lookup. Candidates come from an envelope query;
    /// among containing polygons the first in dataset order wins, so an
    /// overlap at a boundary resolves the same way on every run.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<&ZoneEntry> {
        let point = geo::Point::new(lon, lat);
        let query_env = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .min_by_key(|entry| entry.seq)
    }

    /// Classify a possibly-missing coordinate. Total: every input maps
    /// to exactly one of zone / `Unknown` / `Out of Region`.
    pub fn classify(&self, lon: Option<f64>, lat: Option<f64>) -> ZoneHit<'_> {
        match (lon, lat) {
            (Some(lon), Some(lat)) => match self.locate(lon, lat) {
                Some(entry) => ZoneHit::Zone(entry),
                None => ZoneHit::OutOfRegion,
            },
            _ => ZoneHit::Unknown,
        }
    }
}

/// The three reference layers used by location resolution.
pub struct ZoneLayers {
    pub eso: ZoneLayer,
    pub county: ZoneLayer,
    pub zcta: ZoneLayer,
}

impl ZoneLayers {
    /// Load all three layers. Property names follow the source datasets:
    /// `NAME` for service areas, `GEOID20`/`NAME20` for counties,
    /// `GEOID20` for ZCTAs.
    pub fn load(eso_path: &str, county_path: &str, zcta_path: &str) -> Result<Self, ReportError> {
        Ok(Self {
            eso: ZoneLayer::from_geojson_file(eso_path, "ESO", "NAME", None)?,
            county: ZoneLayer::from_geojson_file(county_path, "County", "GEOID20", Some("NAME20"))?,
            zcta: ZoneLayer::from_geojson_file(zcta_path, "ZCTA", "GEOID20", None)?,
        })
    }
}

fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
