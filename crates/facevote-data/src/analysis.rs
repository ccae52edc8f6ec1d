//! Analysis dataset: complete cases of the merged table plus derived
//! variables and indicator columns.

use crate::merge::CandidateRecord;
use crate::study::{CityThresholds, Study};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CityType {
    Rural,
    Transition,
    Urban,
}

impl CityType {
    pub fn classify(median_income: f64, population: f64, t: &CityThresholds) -> Self {
        if median_income >= t.urban_income && population >= t.urban_population {
            CityType::Urban
        } else if median_income < t.rural_income && population < t.rural_population {
            CityType::Rural
        } else {
            CityType::Transition
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CityType::Rural => "rural",
            CityType::Transition => "transition",
            CityType::Urban => "urban",
        }
    }
}

/// Ordinal education level; `None` for values outside the coded set.
pub fn edu_level(edu: &str) -> Option<u8> {
    match edu {
        "Master" | "Doctor" => Some(3),
        "Bachelor" => Some(2),
        "High_school" => Some(1),
        _ => None,
    }
}

fn flag(b: bool) -> u8 {
    u8::from(b)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "District")]
    pub district: u32,
    #[serde(rename = "Party")]
    pub party: String,
    #[serde(rename = "Incumbent")]
    pub incumbent: u8,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Edu")]
    pub edu: String,
    pub score: u8,
    #[serde(rename = "score_CNN")]
    pub score_cnn: u8,
    pub vote_share: f64,
    pub ln_vote_share: f64,
    #[serde(rename = "Poverty (%)")]
    pub poverty: f64,
    #[serde(rename = "Median_Household_Income")]
    pub median_income: f64,
    #[serde(rename = "Pop_Total")]
    pub pop_total: f64,
    #[serde(rename = "Sex Ratio")]
    pub sex_ratio: f64,
    #[serde(rename = "Agesq")]
    pub agesq: i32,
    #[serde(rename = "Edu_Level")]
    pub edu_level: Option<u8>,
    #[serde(rename = "Master & Above")]
    pub master_above: u8,
    #[serde(rename = "College")]
    pub college: u8,
    #[serde(rename = "High School")]
    pub high_school: u8,
    #[serde(rename = "Republican")]
    pub republican: u8,
    #[serde(rename = "Democratic")]
    pub democratic: u8,
    #[serde(rename = "Other")]
    pub other: u8,
    pub city_type: CityType,
    #[serde(rename = "Incumbent_0")]
    pub incumbent_0: u8,
    #[serde(rename = "Incumbent_1")]
    pub incumbent_1: u8,
    #[serde(rename = "Gender_F")]
    pub gender_f: u8,
    #[serde(rename = "Gender_M")]
    pub gender_m: u8,
    pub city_type_rural: u8,
    pub city_type_transition: u8,
    pub city_type_urban: u8,
}

impl AnalysisRow {
    /// Build a row from a merged record, or `None` when any analysis column
    /// is missing.
    pub fn from_record(r: &CandidateRecord, thresholds: &CityThresholds) -> Option<Self> {
        let gender = r.gender.clone()?;
        let age = r.age?;
        let edu = r.edu.clone()?;
        let score = r.score?;
        let score_cnn = r.score_cnn?;
        let vote_share = r.vote_share?;
        let ln_vote_share = r.ln_vote_share?;
        let poverty = r.poverty?;
        let median_income = r.median_income?;
        let pop_total = r.pop_total?;
        let sex_ratio = r.sex_ratio?;

        let city_type = CityType::classify(median_income, pop_total, thresholds);
        let party = r.party.as_str();

        Some(Self {
            year: r.year,
            district: r.district,
            party: r.party.clone(),
            incumbent: r.incumbent,
            age,
            score,
            score_cnn,
            vote_share,
            ln_vote_share,
            poverty,
            median_income,
            pop_total,
            sex_ratio,
            agesq: age * age,
            edu_level: edu_level(&edu),
            master_above: flag(edu == "Master" || edu == "Doctor"),
            college: flag(edu == "Bachelor"),
            high_school: flag(edu == "High_school"),
            republican: flag(party == "Republican"),
            democratic: flag(party == "Democratic"),
            other: flag(party == "Green" || party == "No party preference"),
            city_type,
            incumbent_0: flag(r.incumbent == 0),
            incumbent_1: flag(r.incumbent == 1),
            gender_f: flag(gender == "F"),
            gender_m: flag(gender == "M"),
            city_type_rural: flag(city_type == CityType::Rural),
            city_type_transition: flag(city_type == CityType::Transition),
            city_type_urban: flag(city_type == CityType::Urban),
            gender,
            edu,
        })
    }

    /// Numeric column by its published name.
    pub fn value(&self, column: &str) -> Option<f64> {
        let v = match column {
            "Year" => self.year as f64,
            "District" => self.district as f64,
            "Incumbent" => self.incumbent as f64,
            "Age" => self.age as f64,
            "Agesq" => self.agesq as f64,
            "score" => self.score as f64,
            "score_CNN" => self.score_cnn as f64,
            "vote_share" => self.vote_share,
            "ln_vote_share" => self.ln_vote_share,
            "Poverty (%)" => self.poverty,
            "Median_Household_Income" => self.median_income,
            "Pop_Total" => self.pop_total,
            "Sex Ratio" => self.sex_ratio,
            "Edu_Level" => return self.edu_level.map(f64::from),
            "Master & Above" => self.master_above as f64,
            "College" => self.college as f64,
            "High School" => self.high_school as f64,
            "Republican" => self.republican as f64,
            "Democratic" => self.democratic as f64,
            "Other" => self.other as f64,
            "Incumbent_0" => self.incumbent_0 as f64,
            "Incumbent_1" => self.incumbent_1 as f64,
            "Gender_F" => self.gender_f as f64,
            "Gender_M" => self.gender_m as f64,
            "city_type_rural" => self.city_type_rural as f64,
            "city_type_transition" => self.city_type_transition as f64,
            "city_type_urban" => self.city_type_urban as f64,
            _ => return None,
        };
        Some(v)
    }

    /// Categorical level of a column, as it appears in term names
    /// (`C(Gender)[T.M]`, `C(Incumbent)[T.1]`).
    pub fn category(&self, column: &str) -> Option<String> {
        match column {
            "Gender" => Some(self.gender.clone()),
            "Incumbent" => Some(self.incumbent.to_string()),
            "Year" => Some(self.year.to_string()),
            "Edu_Level" => self.edu_level.map(|l| l.to_string()),
            "Edu" => Some(self.edu.clone()),
            "Party" => Some(self.party.clone()),
            "city_type" => Some(self.city_type.name().to_string()),
            _ => None,
        }
    }
}

/// Complete cases of `records`, with derived columns. City thresholds come
/// from the study election matching each record's year.
pub fn build_analysis(records: &[CandidateRecord], study: &Study) -> Vec<AnalysisRow> {
    let thresholds: HashMap<i32, CityThresholds> =
        study.elections.iter().map(|e| (e.year, e.city)).collect();

    let mut rows = Vec::new();
    let mut incomplete = 0usize;
    for record in records {
        let Some(t) = thresholds.get(&record.year) else {
            warn!(id = %record.id, year = record.year, "no study election for record year");
            continue;
        };
        match AnalysisRow::from_record(record, t) {
            Some(row) => rows.push(row),
            None => incomplete += 1,
        }
    }
    debug!(kept = rows.len(), incomplete, "built analysis dataset");
    rows
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const T2018: CityThresholds = CityThresholds {
        urban_income: 100000.0,
        urban_population: 760000.0,
        rural_income: 75000.0,
        rural_population: 720000.0,
    };

    pub(crate) fn record(id: &str, score: u8, vote_share: f64) -> CandidateRecord {
        CandidateRecord {
            year: 2018,
            state: "CA".into(),
            district: 1,
            name: id.into(),
            photo: String::new(),
            photo_downloadable: true,
            party: "Democratic".into(),
            votes: Some(1.0),
            incumbent: 0,
            id: id.into(),
            gender: Some("M".into()),
            year_of_birth: Some(1968),
            edu: Some("Bachelor".into()),
            score: Some(score),
            score_cnn: Some(score),
            poverty: Some(10.0),
            median_income: Some(80000.0),
            pop_total: Some(740000.0),
            pop_male: Some(370000.0),
            pop_female: Some(370000.0),
            sex_ratio: Some(1.0),
            total_votes: Some(2.0),
            vote_share: Some(vote_share),
            ln_vote_share: Some(vote_share.ln()),
            age: Some(50),
        }
    }

    #[test]
    fn test_city_type_boundaries() {
        assert_eq!(CityType::classify(100000.0, 760000.0, &T2018), CityType::Urban);
        assert_eq!(CityType::classify(99999.0, 900000.0, &T2018), CityType::Transition);
        assert_eq!(CityType::classify(74999.0, 719999.0, &T2018), CityType::Rural);
        assert_eq!(CityType::classify(75000.0, 700000.0, &T2018), CityType::Transition);
    }

    #[test]
    fn test_derived_columns() {
        let row = AnalysisRow::from_record(&record("CA_1_1", 80, 0.6), &T2018).unwrap();
        assert_eq!(row.agesq, 2500);
        assert_eq!(row.edu_level, Some(2));
        assert_eq!((row.master_above, row.college, row.high_school), (0, 1, 0));
        assert_eq!((row.republican, row.democratic, row.other), (0, 1, 0));
        assert_eq!((row.incumbent_0, row.incumbent_1), (1, 0));
        assert_eq!((row.gender_f, row.gender_m), (0, 1));
        assert_eq!(row.city_type, CityType::Transition);
        assert_eq!(row.city_type_transition, 1);

        assert_eq!(row.value("Agesq"), Some(2500.0));
        assert_eq!(row.value("Democratic"), Some(1.0));
        assert_eq!(row.value("nope"), None);
        assert_eq!(row.category("Gender").as_deref(), Some("M"));
        assert_eq!(row.category("Incumbent").as_deref(), Some("0"));
        assert_eq!(row.category("city_type").as_deref(), Some("transition"));
    }

    #[test]
    fn test_other_party_and_unknown_edu() {
        let mut r = record("CA_1_1", 80, 0.6);
        r.party = "No party preference".into();
        r.edu = Some("Associate".into());
        let row = AnalysisRow::from_record(&r, &T2018).unwrap();
        assert_eq!(row.other, 1);
        assert_eq!(row.edu_level, None);
        assert_eq!(row.value("Edu_Level"), None);
        assert_eq!(row.category("Edu_Level"), None);
    }

    #[test]
    fn test_incomplete_records_are_dropped() {
        let study = Study::builtin().unwrap();
        let mut missing_score = record("CA_1_2", 70, 0.4);
        missing_score.score = None;
        let mut zero_share = record("CA_1_3", 70, 0.0);
        zero_share.ln_vote_share = None;
        let mut other_year = record("CA_1_4", 70, 0.4);
        other_year.year = 2016;

        let rows = build_analysis(
            &[record("CA_1_1", 80, 0.6), missing_score, zero_share, other_year],
            &study,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 80);
    }
}
