use crate::types::IndicatorValue;
use serde::{Deserialize, Serialize};

pub const NO_DATA_FILL: &str = "#f0f0f0";
pub const NO_DATA_STROKE: &str = "#cccccc";
pub const DEFAULT_STROKE: &str = "#ffffff";
pub const SELECTED_STROKE: &str = "#000000";

const CLASSES: usize = 6;

// ColorBrewer 6-class sequential palettes, light to dark.
const REDS: [&str; CLASSES] = ["#fee5d9", "#fcbba1", "#fc9272", "#fb6a4a", "#de2d26", "#a50f15"];
const BLUES: [&str; CLASSES] = ["#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#3182bd", "#08519c"];
const GREENS: [&str; CLASSES] = ["#edf8e9", "#c7e9c0", "#a1d99b", "#74c476", "#31a354", "#006d2c"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ColorScheme {
    #[default]
    #[serde(alias = "Red", alias = "reds")]
    Reds,
    #[serde(alias = "Blue", alias = "blues")]
    Blues,
    #[serde(alias = "Green", alias = "greens")]
    Greens,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 3] = [ColorScheme::Reds, ColorScheme::Blues, ColorScheme::Greens];

    pub fn palette(self, reverse: bool) -> Vec<&'static str> {
        let base = match self {
            ColorScheme::Reds => REDS,
            ColorScheme::Blues => BLUES,
            ColorScheme::Greens => GREENS,
        };
        let mut colors = base.to_vec();
        if reverse {
            colors.reverse();
        }
        colors
    }

    /// Menu label shown next to the scheme.
    pub fn label(self) -> &'static str {
        match self {
            ColorScheme::Reds => "Red",
            ColorScheme::Blues => "Blue",
            ColorScheme::Greens => "Green",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub min: f64,
    pub max: f64,
    pub color: &'static str,
}

/// Equal-width classes between the smallest and largest present value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choropleth {
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub no_data: &'static str,
}

impl Choropleth {
    pub fn build<I>(title: String, values: I, scheme: ColorScheme, reverse: bool) -> Self
    where
        I: IntoIterator<Item = IndicatorValue>,
    {
        let present: Vec<f64> = values.into_iter().filter_map(|v| v.value()).collect();
        let palette = scheme.palette(reverse);

        let entries = match min_max(&present) {
            Some((min, max)) => {
                let width = (max - min) / CLASSES as f64;
                palette
                    .into_iter()
                    .enumerate()
                    .map(|(i, color)| LegendEntry {
                        min: min + width * i as f64,
                        max: if i + 1 == CLASSES { max } else { min + width * (i + 1) as f64 },
                        color,
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        Choropleth {
            title,
            entries,
            no_data: NO_DATA_FILL,
        }
    }

    pub fn fill(&self, value: IndicatorValue) -> &'static str {
        let Some(v) = value.value() else {
            return self.no_data;
        };
        let Some(first) = self.entries.first() else {
            return self.no_data;
        };
        let width = first.max - first.min;
        if width <= 0.0 {
            return first.color;
        }
        let class = ((v - first.min) / width).floor();
        let class = if class < 0.0 { 0 } else { (class as usize).min(self.entries.len() - 1) };
        self.entries[class].color
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// Outline and fill for one region on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStyle {
    pub fill: &'static str,
    pub stroke: &'static str,
    pub weight: u8,
    pub dashed: bool,
}

impl RegionStyle {
    pub fn for_region(choropleth: &Choropleth, value: IndicatorValue, selected: bool) -> Self {
        let (stroke, weight, dashed) = match (selected, value.is_missing()) {
            (true, _) => (SELECTED_STROKE, 3, false),
            (false, true) => (NO_DATA_STROKE, 1, true),
            (false, false) => (DEFAULT_STROKE, 1, false),
        };
        RegionStyle {
            fill: choropleth.fill(value),
            stroke,
            weight,
            dashed,
        }
    }
}
