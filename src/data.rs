use crate::config::InputConfig;
use crate::types::{Region, RegionId};
use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::{info, warn};

pub fn load_regions(config: &InputConfig) -> Result<Vec<Region>> {
    info!("Loading boundaries from {:?}...", config.boundaries);
    let file = File::open(&config.boundaries)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", config.boundaries))?;

    let regions = regions_from_geojson(
        BufReader::new(file),
        &config.id_property,
        &config.name_property,
    )?;

    info!("Loaded {} regions", regions.len());
    Ok(regions)
}

/// Reads a FeatureCollection of (multi)polygons. Features without a usable
/// identifier or with non-areal geometry are skipped with a warning.
pub fn regions_from_geojson<R: Read>(
    reader: R,
    id_property: &str,
    name_property: &str,
) -> Result<Vec<Region>> {
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut regions = Vec::new();
    let mut seen = HashSet::new();

    for (position, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.as_ref();

        let id = match props
            .and_then(|p| p.get(id_property))
            .and_then(RegionId::from_json)
        {
            Some(id) => id,
            None => {
                warn!("Feature {} has no '{}' property, skipping", position, id_property);
                continue;
            }
        };

        let name = match props.and_then(|p| p.get(name_property)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => id.to_string(),
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of region {}: {:?}", id, e))?;

                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!("Region {} is not a polygon, skipping", id);
                        continue;
                    }
                }
            }
            None => {
                warn!("Region {} has no geometry, skipping", id);
                continue;
            }
        };

        if !seen.insert(id.clone()) {
            warn!("Region identifier {} appears more than once", id);
        }

        regions.push(Region { id, name, geometry });
    }

    Ok(regions)
}
