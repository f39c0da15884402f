use crate::style::ColorScheme;
use crate::types::{blank_as_none, RegionId};
use serde::{Deserialize, Serialize};

pub const UNRESOLVED_CLICK: &str = "Could not identify the selected province.";

/// Per-session dashboard state. Owned by the caller and passed into every
/// interaction; nothing here is stored server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    #[serde(deserialize_with = "blank_as_none")]
    pub indicator: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub year: Option<String>,
    /// `None` means the dashboard's configured default.
    #[serde(deserialize_with = "blank_as_none")]
    pub scheme: Option<ColorScheme>,
    pub reverse: bool,
    #[serde(deserialize_with = "blank_as_none")]
    pub region: Option<RegionId>,
}

/// What a map click did to the selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    Selected { region: RegionId },
    Unchanged { region: RegionId },
    Cleared,
}

impl ClickOutcome {
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            ClickOutcome::Cleared => Some(UNRESOLVED_CLICK),
            _ => None,
        }
    }
}

impl Selection {
    pub fn select_region(&mut self, id: RegionId) {
        self.region = Some(id);
    }

    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// "Reset Selection" only forgets the clicked region; menu choices stay.
    pub fn reset(&mut self) {
        self.clear_region();
    }

    pub fn apply_click(&mut self, located: Option<RegionId>) -> ClickOutcome {
        match located {
            Some(id) if self.region.as_ref() == Some(&id) => ClickOutcome::Unchanged { region: id },
            Some(id) => {
                self.select_region(id.clone());
                ClickOutcome::Selected { region: id }
            }
            None => {
                self.clear_region();
                ClickOutcome::Cleared
            }
        }
    }
}
