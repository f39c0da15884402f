//! The indicator workbook, read either from a spreadsheet file or from a
//! directory holding one CSV file per sheet.
//!
//! Three kinds of sheet are read: the index sheet (indicator code, label and
//! data sheet), the location sheet (region identifier to display name) and
//! one data sheet per indicator whose all-digit headers are year columns.

use crate::config::WorkbookConfig;
use crate::error::WorkbookError;
use crate::types::{IndicatorValue, RegionId};
use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Reader, Sheets};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Raw sheet contents.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    headers: StringRecord,
    records: Vec<StringRecord>,
}

impl Sheet {
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, WorkbookError> {
        let malformed = |e: csv::Error| WorkbookError::Malformed {
            sheet: name.to_string(),
            message: e.to_string(),
        };

        let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers().map_err(malformed)?.clone();
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        Ok(Sheet {
            name: name.to_string(),
            headers,
            records,
        })
    }

    /// The first row holds the headers.
    pub fn from_rows<I, R>(name: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = String>,
    {
        let mut rows = rows.into_iter().map(|row| row.into_iter().collect::<StringRecord>());
        let headers = rows.next().unwrap_or_default();
        Sheet {
            name: name.to_string(),
            headers,
            records: rows.collect(),
        }
    }

    pub fn column(&self, column: &str) -> Result<usize, WorkbookError> {
        self.headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| WorkbookError::MissingColumn {
                sheet: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter()
    }

    pub fn rows(&self) -> impl Iterator<Item = &StringRecord> {
        self.records.iter()
    }
}

/// Locates sheets by name inside the workbook directory.
#[derive(Debug, Clone)]
pub struct WorkbookDir {
    dir: PathBuf,
}

impl WorkbookDir {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf() }
    }

    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", name))
    }

    pub fn read_sheet(&self, name: &str) -> Result<Sheet, WorkbookError> {
        let path = self.sheet_path(name);
        if !path.is_file() {
            return Err(WorkbookError::MissingSheet(name.to_string()));
        }
        let file = File::open(&path).map_err(|e| WorkbookError::Malformed {
            sheet: name.to_string(),
            message: e.to_string(),
        })?;
        Sheet::from_reader(name, file)
    }
}

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Where sheets are read from, chosen by the path's extension.
pub enum SheetSource {
    Spreadsheet(Sheets<BufReader<File>>),
    Csv(WorkbookDir),
}

impl SheetSource {
    pub fn open(path: &Path) -> Result<Self> {
        let is_spreadsheet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SPREADSHEET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if is_spreadsheet {
            let sheets = open_workbook_auto(path)
                .with_context(|| format!("Failed to open workbook {:?}", path))?;
            Ok(SheetSource::Spreadsheet(sheets))
        } else {
            Ok(SheetSource::Csv(WorkbookDir::new(path)))
        }
    }

    pub fn read_sheet(&mut self, name: &str) -> Result<Sheet, WorkbookError> {
        let sheets = match self {
            SheetSource::Csv(dir) => return dir.read_sheet(name),
            SheetSource::Spreadsheet(sheets) => sheets,
        };
        if !sheets.sheet_names().iter().any(|s| s == name) {
            return Err(WorkbookError::MissingSheet(name.to_string()));
        }
        let range = sheets
            .worksheet_range(name)
            .map_err(|e| WorkbookError::Malformed {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;

        // Whole-number cells display without a fraction, so a 2019 header
        // stays a year column and 7.0 stays region 7.
        Ok(Sheet::from_rows(
            name,
            range.rows().map(|row| row.iter().map(|cell| cell.to_string())),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub code: String,
    pub label: String,
    #[serde(skip)]
    pub sheet: String,
}

/// One data sheet keyed by region identifier. Rows keep sheet order; the
/// first row wins when an identifier repeats.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    pub sheet: String,
    pub years: Vec<String>,
    rows: Vec<(RegionId, Vec<IndicatorValue>)>,
    by_id: HashMap<RegionId, usize>,
}

impl IndicatorTable {
    pub fn from_sheet(sheet: &Sheet, id_column: &str) -> Result<Self, WorkbookError> {
        let id_idx = sheet.column(id_column)?;

        let year_cols: Vec<(usize, String)> = sheet
            .headers()
            .enumerate()
            .map(|(i, h)| (i, h.trim()))
            .filter(|(_, h)| !h.is_empty() && h.chars().all(|c| c.is_ascii_digit()))
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut rows = Vec::new();
        let mut by_id = HashMap::new();

        for record in sheet.rows() {
            let Some(id) = record.get(id_idx).and_then(RegionId::normalize) else {
                continue;
            };
            if by_id.contains_key(&id) {
                warn!("Sheet '{}' repeats region {}, keeping the first row", sheet.name, id);
                continue;
            }
            let values = year_cols
                .iter()
                .map(|(i, _)| IndicatorValue::parse(record.get(*i).unwrap_or("")))
                .collect();
            by_id.insert(id.clone(), rows.len());
            rows.push((id, values));
        }

        Ok(IndicatorTable {
            sheet: sheet.name.clone(),
            years: year_cols.into_iter().map(|(_, y)| y).collect(),
            rows,
            by_id,
        })
    }

    pub fn year_index(&self, year: &str) -> Option<usize> {
        self.years.iter().position(|y| y == year.trim())
    }

    pub fn row(&self, id: &RegionId) -> Option<&[IndicatorValue]> {
        self.by_id.get(id).map(|&i| self.rows[i].1.as_slice())
    }

    pub fn value(&self, id: &RegionId, year_idx: usize) -> IndicatorValue {
        self.row(id)
            .and_then(|values| values.get(year_idx).copied())
            .unwrap_or(IndicatorValue::NoData)
    }

    pub fn column(&self, year_idx: usize) -> impl Iterator<Item = IndicatorValue> + '_ {
        self.rows
            .iter()
            .map(move |(_, values)| values.get(year_idx).copied().unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything read from the workbook at startup.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub indicators: Vec<Indicator>,
    locations: HashMap<RegionId, String>,
    tables: HashMap<String, Result<IndicatorTable, WorkbookError>>,
}

impl Workbook {
    /// The index and location sheets are required. A data sheet that fails
    /// to load is remembered and reported when its indicator is selected.
    pub fn load(path: &Path, config: &WorkbookConfig) -> Result<Self> {
        info!("Loading workbook from {:?}...", path);
        let mut source = SheetSource::open(path)?;

        let index = source
            .read_sheet(&config.index_sheet)
            .context("Error parsing Excel mappings")?;
        let location = source
            .read_sheet(&config.location_sheet)
            .context("Error parsing Excel mappings")?;

        let indicators = parse_index(&index, config)?;
        let data = indicators
            .iter()
            .map(|ind| (ind.sheet.clone(), source.read_sheet(&ind.sheet)))
            .collect();

        let workbook = Self::assemble(indicators, &location, data, config)?;
        info!(
            "Loaded {} indicators, {} locations",
            workbook.indicators.len(),
            workbook.locations.len()
        );
        Ok(workbook)
    }

    pub fn from_sheets(
        index: &Sheet,
        location: &Sheet,
        data: Vec<(String, Result<Sheet, WorkbookError>)>,
        config: &WorkbookConfig,
    ) -> Result<Self, WorkbookError> {
        let indicators = parse_index(index, config)?;
        Self::assemble(indicators, location, data, config)
    }

    fn assemble(
        indicators: Vec<Indicator>,
        location: &Sheet,
        data: Vec<(String, Result<Sheet, WorkbookError>)>,
        config: &WorkbookConfig,
    ) -> Result<Self, WorkbookError> {
        let locations = parse_locations(location, config)?;

        let mut tables = HashMap::new();
        for (name, sheet) in data {
            let table = sheet.and_then(|s| IndicatorTable::from_sheet(&s, &config.data_id_column));
            if let Err(e) = &table {
                warn!("{}", e);
            }
            tables.insert(name, table);
        }

        Ok(Workbook {
            indicators,
            locations,
            tables,
        })
    }

    pub fn indicator(&self, code: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|ind| ind.code == code.trim())
    }

    pub fn table(&self, sheet: &str) -> Result<&IndicatorTable, WorkbookError> {
        match self.tables.get(sheet) {
            Some(Ok(table)) => Ok(table),
            Some(Err(e)) => Err(e.clone()),
            None => Err(WorkbookError::MissingSheet(sheet.to_string())),
        }
    }

    pub fn location_name(&self, id: &RegionId) -> Option<&str> {
        self.locations.get(id).map(String::as_str)
    }
}

fn parse_index(sheet: &Sheet, config: &WorkbookConfig) -> Result<Vec<Indicator>, WorkbookError> {
    let code_idx = sheet.column(&config.index_code_column)?;
    let label_idx = sheet.column(&config.index_label_column)?;
    let sheet_idx = match &config.index_sheet_column {
        Some(column) => Some(sheet.column(column)?),
        None => None,
    };

    let mut indicators: Vec<Indicator> = Vec::new();
    for record in sheet.rows() {
        let code = record.get(code_idx).unwrap_or("").trim();
        let label = record.get(label_idx).unwrap_or("").trim();
        if code.is_empty() || label.is_empty() {
            continue;
        }
        let data_sheet = sheet_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(label);

        if indicators.iter().any(|ind| ind.code == code) {
            warn!("Index sheet repeats indicator code {}", code);
            continue;
        }
        indicators.push(Indicator {
            code: code.to_string(),
            label: label.to_string(),
            sheet: data_sheet.to_string(),
        });
    }
    Ok(indicators)
}

fn parse_locations(
    sheet: &Sheet,
    config: &WorkbookConfig,
) -> Result<HashMap<RegionId, String>, WorkbookError> {
    let id_idx = sheet.column(&config.location_id_column)?;
    let name_idx = sheet.column(&config.location_name_column)?;

    Ok(sheet
        .rows()
        .filter_map(|record| {
            let id = record.get(id_idx).and_then(RegionId::normalize)?;
            let name = record.get(name_idx)?.trim().to_string();
            Some((id, name))
        })
        .collect())
}
