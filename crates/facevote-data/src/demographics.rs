//! District demographics from American Community Survey exports.
//!
//! ACS CSV exports carry a machine header (`GEO_ID,NAME,S1701_C03_001E,...`)
//! followed by one human-readable label row, then one row per geography.
//! Districts are numbered by row position.

use crate::error::DataError;
use crate::study::{AcsFiles, StateInfo};
use crate::tabular::write_csv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const POVERTY_PERCENT: &str = "S1701_C03_001E";
pub const MEDIAN_INCOME: &str = "B29004_001E";
pub const POP_TOTAL: &str = "B01001_001E";
pub const POP_MALE: &str = "B01001_002E";
pub const POP_FEMALE: &str = "B01001_026E";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictDemographics {
    #[serde(rename = "District")]
    pub district: u32,
    #[serde(rename = "Poverty (%)")]
    pub poverty: Option<f64>,
    #[serde(rename = "Median_Household_Income")]
    pub median_income: Option<f64>,
    #[serde(rename = "Pop_Total")]
    pub pop_total: Option<f64>,
    #[serde(rename = "Pop_M")]
    pub pop_male: Option<f64>,
    #[serde(rename = "Pop_F")]
    pub pop_female: Option<f64>,
    #[serde(rename = "Sex Ratio")]
    pub sex_ratio: Option<f64>,
}

/// Read `columns` from the first `districts` geography rows of an ACS export.
///
/// Returns one vector per row, in `columns` order. Cells that do not parse
/// as numbers (ACS uses `-`, `N` and `(X)` for suppressed values) are `None`.
pub fn read_acs_columns(
    path: &Path,
    columns: &[&str],
    districts: u32,
) -> Result<Vec<Vec<Option<f64>>>, DataError> {
    let csv_err = |source| DataError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let positions = columns
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h.trim() == *name)
                .ok_or_else(|| DataError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for record in reader.records().skip(1).take(districts as usize) {
        let record = record.map_err(csv_err)?;
        rows.push(
            positions
                .iter()
                .map(|&i| record.get(i).and_then(|v| v.trim().parse::<f64>().ok()))
                .collect(),
        );
    }
    debug!(path = %path.display(), rows = rows.len(), "read ACS export");
    Ok(rows)
}

fn sex_ratio(male: Option<f64>, female: Option<f64>) -> Option<f64> {
    match (male, female) {
        (Some(m), Some(f)) if f != 0.0 => Some(m / f),
        _ => None,
    }
}

fn district_entry(
    joined: &mut BTreeMap<u32, DistrictDemographics>,
    position: usize,
) -> &mut DistrictDemographics {
    let district = position as u32 + 1;
    joined.entry(district).or_insert_with(|| DistrictDemographics {
        district,
        ..Default::default()
    })
}

/// Join the poverty, income and population exports on district.
///
/// Every district that appears in any of the three files gets a row; values
/// a file did not supply stay empty.
pub fn build_demographics(
    acs_dir: &Path,
    files: &AcsFiles,
    state: &StateInfo,
) -> Result<Vec<DistrictDemographics>, DataError> {
    let poverty = read_acs_columns(&acs_dir.join(&files.poverty), &[POVERTY_PERCENT], state.districts)?;
    let income = read_acs_columns(&acs_dir.join(&files.income), &[MEDIAN_INCOME], state.districts)?;
    let population = read_acs_columns(
        &acs_dir.join(&files.population),
        &[POP_TOTAL, POP_MALE, POP_FEMALE],
        state.districts,
    )?;

    let mut joined: BTreeMap<u32, DistrictDemographics> = BTreeMap::new();

    for (i, row) in poverty.iter().enumerate() {
        district_entry(&mut joined, i).poverty = row[0];
    }
    for (i, row) in income.iter().enumerate() {
        district_entry(&mut joined, i).median_income = row[0];
    }
    for (i, row) in population.iter().enumerate() {
        let d = district_entry(&mut joined, i);
        d.pop_total = row[0];
        d.pop_male = row[1];
        d.pop_female = row[2];
        d.sex_ratio = sex_ratio(row[1], row[2]);
    }

    Ok(joined.into_values().collect())
}

/// Build and write one year's demographics table.
pub fn write_demographics(
    acs_dir: &Path,
    files: &AcsFiles,
    state: &StateInfo,
    out: &Path,
) -> Result<usize, DataError> {
    let rows = build_demographics(acs_dir, files, state)?;
    write_csv(out, &rows)?;
    info!(path = %out.display(), districts = rows.len(), "wrote district demographics");
    Ok(rows.len())
}
