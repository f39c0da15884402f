use crate::error::JoinError;
use crate::types::{EnrichedRegion, IndicatorValue, Region, RegionId};
use crate::workbook::IndicatorTable;
use geo::Centroid;
use serde::Serialize;

/// Result of a left join between regions and one year of an indicator.
#[derive(Debug, Clone)]
pub struct Joined {
    pub year: String,
    pub regions: Vec<EnrichedRegion>,
    pub missing: usize,
}

/// Left-joins `regions` with the `year` column of `table`. Output has one
/// entry per input region, in input order.
pub fn join_indicator(
    regions: &[Region],
    table: &IndicatorTable,
    year: &str,
) -> Result<Joined, JoinError> {
    let year_idx = table.year_index(year).ok_or_else(|| JoinError::MissingYear {
        sheet: table.sheet.clone(),
        year: year.to_string(),
    })?;

    let enriched: Vec<EnrichedRegion> = regions
        .iter()
        .map(|region| EnrichedRegion {
            id: region.id.clone(),
            name: region.name.clone(),
            geometry: region.geometry.clone(),
            value: table.value(&region.id, year_idx),
            centroid: region.geometry.centroid(),
        })
        .collect();

    let missing = enriched.iter().filter(|r| r.value.is_missing()).count();

    Ok(Joined {
        year: table.years[year_idx].clone(),
        regions: enriched,
        missing,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    pub year: String,
    pub value: IndicatorValue,
}

/// Mean of the present values for each year; all-missing years are `NoData`.
pub fn national_averages(table: &IndicatorTable) -> Vec<YearValue> {
    table
        .years
        .iter()
        .enumerate()
        .map(|(idx, year)| {
            let (sum, count) = table
                .column(idx)
                .filter_map(|v| v.value())
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            let value = if count > 0 {
                IndicatorValue::Value(sum / count as f64)
            } else {
                IndicatorValue::NoData
            };
            YearValue {
                year: year.clone(),
                value,
            }
        })
        .collect()
}

/// The region's value for every year, or `None` when the table has no row for it.
pub fn region_series(table: &IndicatorTable, id: &RegionId) -> Option<Vec<YearValue>> {
    let row = table.row(id)?;
    Some(
        table
            .years
            .iter()
            .zip(row.iter())
            .map(|(year, value)| YearValue {
                year: year.clone(),
                value: *value,
            })
            .collect(),
    )
}
