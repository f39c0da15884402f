use crate::config::AppConfig;
use crate::data;
use crate::error::{DashboardError, JoinError};
use crate::join::{self, YearValue};
use crate::locate::RegionIndex;
use crate::selection::{ClickOutcome, Selection};
use crate::style::{Choropleth, ColorScheme, RegionStyle};
use crate::types::{EnrichedRegion, LngLat, Region, RegionId};
use crate::workbook::{Indicator, IndicatorTable, Workbook};
use anyhow::Result;
use geojson::{Feature, FeatureCollection, Geometry};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

pub const NO_REGION_DATA: &str = "No data found for the selected province.";
const UNKNOWN_REGION: &str = "Unknown";

/// Loaded inputs plus the click index. Every method is a pure function of
/// these and the caller's [`Selection`].
pub struct Dashboard {
    regions: Vec<Region>,
    index: RegionIndex,
    workbook: Workbook,
    default_scheme: ColorScheme,
}

#[derive(Debug, Clone)]
pub struct MapView {
    pub indicator: Indicator,
    pub year: String,
    pub regions: Vec<EnrichedRegion>,
    pub choropleth: Choropleth,
    pub selected: Option<RegionId>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionTrend {
    pub id: RegionId,
    pub name: String,
    pub values: Vec<YearValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendChart {
    pub indicator: Indicator,
    pub years: Vec<String>,
    pub national_average: Vec<YearValue>,
    pub region: Option<RegionTrend>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickResult {
    pub selection: Selection,
    #[serde(flatten)]
    pub outcome: ClickOutcome,
    pub name: Option<String>,
    pub warnings: Vec<String>,
}

impl Dashboard {
    pub fn new(regions: Vec<Region>, workbook: Workbook, default_scheme: ColorScheme) -> Self {
        let index = RegionIndex::build(&regions);
        debug!("Indexed {} region boundaries", index.len());
        Dashboard {
            regions,
            index,
            workbook,
            default_scheme,
        }
    }

    pub fn load(config: &AppConfig) -> Result<Self> {
        let regions = data::load_regions(&config.input)?;
        let workbook = Workbook::load(&config.input.workbook, &config.workbook)?;
        info!("Dashboard ready");
        Ok(Self::new(regions, workbook, config.display.default_scheme))
    }

    pub fn default_scheme(&self) -> ColorScheme {
        self.default_scheme
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.workbook.indicators
    }

    /// Falls back to the first indicator when none is chosen.
    pub fn resolve_indicator(&self, code: Option<&str>) -> Result<&Indicator, DashboardError> {
        match code {
            Some(code) => self
                .workbook
                .indicator(code)
                .ok_or_else(|| DashboardError::UnknownIndicator(code.to_string())),
            None => self.indicators().first().ok_or(DashboardError::NoIndicators),
        }
    }

    fn table_for(&self, code: Option<&str>) -> Result<(&Indicator, &IndicatorTable), DashboardError> {
        let indicator = self.resolve_indicator(code)?;
        let table = self.workbook.table(&indicator.sheet)?;
        if table.years.is_empty() {
            return Err(DashboardError::NoYears {
                sheet: table.sheet.clone(),
            });
        }
        Ok((indicator, table))
    }

    pub fn years(&self, code: Option<&str>) -> Result<Vec<String>, DashboardError> {
        let (_, table) = self.table_for(code)?;
        Ok(table.years.clone())
    }

    /// Falls back to the sheet's first year when none is chosen.
    fn resolve_year(table: &IndicatorTable, year: Option<&str>) -> Result<String, DashboardError> {
        match year {
            Some(year) => table
                .year_index(year)
                .map(|i| table.years[i].clone())
                .ok_or_else(|| {
                    JoinError::MissingYear {
                        sheet: table.sheet.clone(),
                        year: year.to_string(),
                    }
                    .into()
                }),
            None => table
                .years
                .first()
                .cloned()
                .ok_or_else(|| DashboardError::NoYears {
                    sheet: table.sheet.clone(),
                }),
        }
    }

    pub fn map_view(&self, selection: &Selection) -> Result<MapView, DashboardError> {
        let (indicator, table) = self.table_for(selection.indicator.as_deref())?;
        let year = Self::resolve_year(table, selection.year.as_deref())?;
        let joined = join::join_indicator(&self.regions, table, &year)?;

        let mut warnings = Vec::new();
        if joined.missing > 0 {
            warnings.push(format!(
                "Some provinces lack data for {} in {}.",
                indicator.code, joined.year
            ));
        }

        let choropleth = Choropleth::build(
            format!("{} - {}", indicator.code, joined.year),
            joined.regions.iter().map(|r| r.value),
            selection.scheme.unwrap_or(self.default_scheme),
            selection.reverse,
        );

        Ok(MapView {
            indicator: indicator.clone(),
            year: joined.year,
            regions: joined.regions,
            choropleth,
            selected: selection.region.clone(),
            warnings,
        })
    }

    pub fn locate(&self, at: LngLat) -> Option<&Region> {
        self.index.locate(at, &self.regions)
    }

    /// Resolves a map click and moves the selection accordingly.
    pub fn click(&self, selection: &Selection, at: LngLat) -> ClickResult {
        let mut selection = selection.clone();
        let located = self.locate(at).map(|r| r.id.clone());
        let outcome = selection.apply_click(located);
        let name = selection.region.as_ref().map(|id| self.region_name(id));
        let warnings = outcome.warning().map(str::to_string).into_iter().collect();
        debug!("Click at ({}, {}) -> {:?}", at.lng, at.lat, outcome);

        ClickResult {
            selection,
            outcome,
            name,
            warnings,
        }
    }

    /// Location sheet name first, then the boundary file's name.
    pub fn region_name(&self, id: &RegionId) -> String {
        self.workbook
            .location_name(id)
            .map(str::to_string)
            .or_else(|| self.regions.iter().find(|r| &r.id == id).map(|r| r.name.clone()))
            .unwrap_or_else(|| UNKNOWN_REGION.to_string())
    }

    pub fn trend(&self, selection: &Selection) -> Result<TrendChart, DashboardError> {
        let (indicator, table) = self.table_for(selection.indicator.as_deref())?;
        let national_average = join::national_averages(table);

        let mut warnings = Vec::new();
        let region = match &selection.region {
            Some(id) => match join::region_series(table, id) {
                Some(values) => Some(RegionTrend {
                    id: id.clone(),
                    name: self.region_name(id),
                    values,
                }),
                None => {
                    warnings.push(NO_REGION_DATA.to_string());
                    None
                }
            },
            None => None,
        };

        Ok(TrendChart {
            indicator: indicator.clone(),
            years: table.years.clone(),
            national_average,
            region,
            warnings,
        })
    }
}

impl MapView {
    pub fn to_geojson(&self, id_property: &str, name_property: &str) -> FeatureCollection {
        let features = self
            .regions
            .iter()
            .map(|region| {
                let selected = self.selected.as_ref() == Some(&region.id);
                let style = RegionStyle::for_region(&self.choropleth, region.value, selected);

                let mut props = Map::new();
                props.insert(id_property.to_string(), id_to_json(&region.id));
                props.insert(name_property.to_string(), json!(region.name));
                props.insert("value".to_string(), json!(region.value.value()));
                props.insert("fill".to_string(), json!(style.fill));
                props.insert("stroke".to_string(), json!(style.stroke));
                props.insert("weight".to_string(), json!(style.weight));
                props.insert("dashed".to_string(), json!(style.dashed));
                props.insert("lat".to_string(), json!(region.centroid.map(|c| c.y())));
                props.insert("lon".to_string(), json!(region.centroid.map(|c| c.x())));
                props.insert("selected".to_string(), json!(selected));

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&region.geometry))),
                    id: None,
                    properties: Some(props),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn id_to_json(id: &RegionId) -> Value {
    match id {
        RegionId::Code(code) => json!(code),
        RegionId::Label(label) => json!(label),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::WorkbookConfig;
    use crate::data::tests::two_squares;
    use crate::error::WorkbookError;
    use crate::selection::UNRESOLVED_CLICK;
    use crate::style::{NO_DATA_FILL, SELECTED_STROKE};
    use crate::types::IndicatorValue;
    use crate::workbook::tests::{sample_workbook, sheet};

    pub(crate) fn sample_dashboard() -> Dashboard {
        Dashboard::new(two_squares(), sample_workbook(), ColorScheme::Reds)
    }

    fn at(lng: f64, lat: f64) -> LngLat {
        LngLat { lng, lat }
    }

    #[test]
    fn defaults_to_first_indicator_and_year() {
        let d = sample_dashboard();
        let view = d.map_view(&Selection::default()).unwrap();
        assert_eq!(view.indicator.code, "E01");
        assert_eq!(view.year, "2019");
        assert_eq!(view.regions.len(), 2);
        assert_eq!(view.regions[0].value, IndicatorValue::Value(8.0));
        assert_eq!(view.regions[1].value, IndicatorValue::NoData);
        assert_eq!(view.warnings, vec!["Some provinces lack data for E01 in 2019."]);
    }

    #[test]
    fn unknown_year_and_indicator_are_recoverable() {
        let d = sample_dashboard();
        let bad_year = Selection {
            year: Some("1999".to_string()),
            ..Selection::default()
        };
        assert!(matches!(d.map_view(&bad_year), Err(DashboardError::Join(_))));

        let bad_code = Selection {
            indicator: Some("X9".to_string()),
            ..Selection::default()
        };
        assert_eq!(
            d.map_view(&bad_code).unwrap_err(),
            DashboardError::UnknownIndicator("X9".to_string())
        );
    }

    #[test]
    fn missing_sheet_surfaces_when_selected() {
        let d = sample_dashboard();
        let err = d.years(Some("E02")).unwrap_err();
        assert_eq!(
            err,
            DashboardError::Workbook(WorkbookError::MissingSheet("Enrollment".to_string()))
        );
        assert_eq!(d.years(Some("E01")).unwrap(), vec!["2019", "2020"]);
    }

    #[test]
    fn click_inside_selects_and_outside_clears() {
        let d = sample_dashboard();
        let hit = d.click(&Selection::default(), at(0.5, 0.5));
        assert_eq!(hit.selection.region, Some(RegionId::Code(1)));
        assert_eq!(hit.name.as_deref(), Some("Alpha"));
        assert!(hit.warnings.is_empty());

        let miss = d.click(&hit.selection, at(100.0, 100.0));
        assert_eq!(miss.outcome, ClickOutcome::Cleared);
        assert!(miss.selection.region.is_none());
        assert_eq!(miss.warnings, vec![UNRESOLVED_CLICK]);
    }

    #[test]
    fn trend_includes_selected_region() {
        let d = sample_dashboard();
        let mut selection = Selection::default();
        selection.select_region(RegionId::Code(1));
        let chart = d.trend(&selection).unwrap();

        assert_eq!(chart.years, vec!["2019", "2020"]);
        assert_eq!(chart.national_average[0].value, IndicatorValue::Value(6.0));
        assert_eq!(chart.national_average[1].value, IndicatorValue::Value(10.0));
        let region = chart.region.unwrap();
        assert_eq!(region.name, "Alpha");
        assert_eq!(region.values[1].value, IndicatorValue::Value(10.0));
    }

    #[test]
    fn trend_for_region_without_row_warns() {
        let d = sample_dashboard();
        let mut selection = Selection::default();
        selection.select_region(RegionId::Code(2));
        let chart = d.trend(&selection).unwrap();
        assert!(chart.region.is_none());
        assert_eq!(chart.warnings, vec![NO_REGION_DATA]);
        assert_eq!(chart.national_average.len(), 2);
    }

    #[test]
    fn region_name_prefers_location_sheet() {
        let d = sample_dashboard();
        assert_eq!(d.region_name(&RegionId::Code(2)), "Beta");
        assert_eq!(d.region_name(&RegionId::Code(42)), "Unknown");
    }

    #[test]
    fn region_name_falls_back_to_boundary_name() {
        let index = sheet("Index", "index code,index\nE01,Literacy\n");
        let location = sheet("Location ID", "ID_1,NAME_1\n1,Alpha\n");
        let config = WorkbookConfig::default();
        let workbook = Workbook::from_sheets(&index, &location, Vec::new(), &config).unwrap();
        let d = Dashboard::new(two_squares(), workbook, ColorScheme::Reds);

        assert_eq!(d.region_name(&RegionId::Code(1)), "Alpha");
        // Region 2 is only named in the boundary file.
        assert_eq!(d.region_name(&RegionId::Code(2)), "B");
        assert_eq!(d.region_name(&RegionId::Code(3)), "Unknown");
    }

    #[test]
    fn unset_scheme_uses_configured_default() {
        let d = Dashboard::new(two_squares(), sample_workbook(), ColorScheme::Greens);
        let view = d.map_view(&Selection::default()).unwrap();
        assert_eq!(view.choropleth.entries[0].color, ColorScheme::Greens.palette(false)[0]);

        let explicit = Selection {
            scheme: Some(ColorScheme::Blues),
            ..Selection::default()
        };
        let view = d.map_view(&explicit).unwrap();
        assert_eq!(view.choropleth.entries[0].color, ColorScheme::Blues.palette(false)[0]);
    }

    #[test]
    fn locate_returns_the_region_containing_the_point() {
        let mut regions = two_squares();
        // Both boundaries now share one identifier.
        regions[1].id = RegionId::Code(1);
        let d = Dashboard::new(regions, sample_workbook(), ColorScheme::Reds);

        assert_eq!(d.locate(at(5.5, 5.5)).unwrap().name, "B");
        assert_eq!(d.locate(at(0.5, 0.5)).unwrap().name, "A");
        assert!(d.locate(at(100.0, 100.0)).is_none());
    }

    #[test]
    fn geojson_carries_values_and_styles() {
        let d = sample_dashboard();
        let selection = Selection {
            year: Some("2020".to_string()),
            scheme: Some(ColorScheme::Blues),
            region: Some(RegionId::Code(2)),
            ..Selection::default()
        };
        let fc = d.map_view(&selection).unwrap().to_geojson("ID_1", "NAME_1");
        assert_eq!(fc.features.len(), 2);

        let first = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(first["ID_1"], json!(1));
        assert_eq!(first["value"], json!(10.0));
        assert_eq!(first["selected"], json!(false));

        let second = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(second["value"], Value::Null);
        assert_eq!(second["fill"], json!(NO_DATA_FILL));
        assert_eq!(second["stroke"], json!(SELECTED_STROKE));
        assert!((second["lat"].as_f64().unwrap() - 5.5).abs() < 1e-9);
    }
}
