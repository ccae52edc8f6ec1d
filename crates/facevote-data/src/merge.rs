//! Joins election results, candidate details, photo scores and district
//! demographics into one record per candidate.

use crate::demographics::DistrictDemographics;
use crate::election::ElectionRow;
use crate::error::DataError;
use crate::layout::DataLayout;
use crate::study::Study;
use crate::tabular::{read_csv, tf_flag, write_csv};
use facevote_core::batch::read_scores;
use facevote_core::ScoreRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Hand-collected candidate details, keyed by candidate ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Gender", deserialize_with = "csv::invalid_option")]
    pub gender: Option<String>,
    #[serde(rename = "Year_of_Birth", deserialize_with = "csv::invalid_option")]
    pub year_of_birth: Option<i32>,
    #[serde(rename = "Edu", deserialize_with = "csv::invalid_option")]
    pub edu: Option<String>,
}

/// One row of the merged table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "District")]
    pub district: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Photo")]
    pub photo: String,
    #[serde(rename = "Photo_Downloadable", with = "tf_flag")]
    pub photo_downloadable: bool,
    #[serde(rename = "Party")]
    pub party: String,
    #[serde(rename = "Votes")]
    pub votes: Option<f64>,
    #[serde(rename = "Incumbent")]
    pub incumbent: u8,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "Year_of_Birth")]
    pub year_of_birth: Option<i32>,
    #[serde(rename = "Edu")]
    pub edu: Option<String>,
    pub score: Option<u8>,
    #[serde(rename = "score_CNN")]
    pub score_cnn: Option<u8>,
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
    pub total_votes: Option<f64>,
    pub vote_share: Option<f64>,
    pub ln_vote_share: Option<f64>,
    #[serde(rename = "Age")]
    pub age: Option<i32>,
}

/// Parse a vote count as printed on Wikipedia (`"123,456"`).
pub fn parse_votes(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse().ok()
}

/// Inputs for one election year.
#[derive(Debug, Clone, Copy)]
pub struct YearTables<'a> {
    pub election: &'a [ElectionRow],
    pub candidates: &'a [CandidateInfo],
    pub scores: &'a [ScoreRecord],
    pub demographics: &'a [DistrictDemographics],
}

/// Merge one year. Election rows are the spine; every other table is
/// left-joined onto them.
pub fn merge_year(tables: YearTables<'_>) -> Vec<CandidateRecord> {
    let candidates: HashMap<&str, &CandidateInfo> =
        tables.candidates.iter().map(|c| (c.id.as_str(), c)).collect();
    let scores: HashMap<&str, &ScoreRecord> =
        tables.scores.iter().map(|s| (s.id.as_str(), s)).collect();
    let demographics: HashMap<u32, &DistrictDemographics> =
        tables.demographics.iter().map(|d| (d.district, d)).collect();

    let mut totals: HashMap<(i32, u32), f64> = HashMap::new();
    for row in tables.election {
        let entry = totals.entry((row.year, row.district)).or_insert(0.0);
        if let Some(v) = parse_votes(&row.votes) {
            *entry += v;
        }
    }

    tables
        .election
        .iter()
        .map(|row| {
            let info = candidates.get(row.id.as_str());
            let score = scores.get(row.id.as_str());
            let demo = demographics.get(&row.district);

            let votes = parse_votes(&row.votes);
            let total_votes = totals.get(&(row.year, row.district)).copied();
            let vote_share = match (votes, total_votes) {
                (Some(v), Some(t)) if t > 0.0 => Some(v / t),
                _ => None,
            };
            let ln_vote_share = vote_share.filter(|s| *s > 0.0).map(f64::ln);
            let year_of_birth = info.and_then(|i| i.year_of_birth);

            CandidateRecord {
                year: row.year,
                state: row.state.clone(),
                district: row.district,
                name: row.name.clone(),
                photo: row.photo.clone(),
                photo_downloadable: row.photo_downloadable,
                party: row.party.clone(),
                votes,
                incumbent: row.incumbent,
                id: row.id.clone(),
                gender: info.and_then(|i| i.gender.clone()),
                year_of_birth,
                edu: info.and_then(|i| i.edu.clone()),
                score: score.map(|s| s.score),
                score_cnn: score.map(|s| s.score_cnn),
                poverty: demo.and_then(|d| d.poverty),
                median_income: demo.and_then(|d| d.median_income),
                pop_total: demo.and_then(|d| d.pop_total),
                pop_male: demo.and_then(|d| d.pop_male),
                pop_female: demo.and_then(|d| d.pop_female),
                sex_ratio: demo.and_then(|d| d.sex_ratio),
                total_votes,
                vote_share,
                ln_vote_share,
                age: year_of_birth.map(|y| row.year - y),
            }
        })
        .collect()
}

/// Read every year's processed inputs, merge them and concatenate.
pub fn merge_study(layout: &DataLayout, study: &Study) -> Result<Vec<CandidateRecord>, DataError> {
    let mut all = Vec::new();
    for election in &study.elections {
        let year = election.year;
        let election_rows: Vec<ElectionRow> = read_csv(&layout.election_csv(year))?;
        let candidates: Vec<CandidateInfo> = read_csv(&layout.candidate_csv(year))?;
        let scores = read_scores(&layout.scores_csv(year))?;
        let demographics: Vec<DistrictDemographics> = read_csv(&layout.demographics_csv(year))?;

        let known: std::collections::HashSet<&str> =
            election_rows.iter().map(|r| r.id.as_str()).collect();
        let orphans = scores.iter().filter(|s| !known.contains(s.id.as_str())).count();
        if orphans > 0 {
            warn!(year, orphans, "scores with no matching election row were dropped");
        }

        let merged = merge_year(YearTables {
            election: &election_rows,
            candidates: &candidates,
            scores: &scores,
            demographics: &demographics,
        });
        info!(year, candidates = merged.len(), "merged election year");
        all.extend(merged);
    }
    Ok(all)
}

/// Merge the whole study and write the final table.
pub fn write_final(layout: &DataLayout, study: &Study) -> Result<usize, DataError> {
    let records = merge_study(layout, study)?;
    let path = layout.final_csv();
    write_csv(&path, &records)?;
    info!(path = %path.display(), rows = records.len(), "wrote merged dataset");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn election_row(district: u32, k: u32, votes: &str) -> ElectionRow {
        ElectionRow {
            year: 2018,
            state: "CA".into(),
            district,
            name: format!("Candidate {district}-{k}"),
            photo: String::new(),
            photo_downloadable: true,
            party: "Democratic".into(),
            votes: votes.into(),
            incumbent: 0,
            id: format!("CA_{district}_{k}"),
        }
    }

    #[test]
    fn test_parse_votes() {
        assert_eq!(parse_votes("123,456"), Some(123456.0));
        assert_eq!(parse_votes(" 7 "), Some(7.0));
        assert_eq!(parse_votes("Unopposed"), None);
        assert_eq!(parse_votes(""), None);
    }

    #[test]
    fn test_vote_share_and_joins() {
        let election = vec![
            election_row(1, 1, "3,000"),
            election_row(1, 2, "1,000"),
            election_row(2, 1, "500"),
            election_row(2, 2, "0"),
        ];
        let candidates = vec![CandidateInfo {
            id: "CA_1_1".into(),
            gender: Some("F".into()),
            year_of_birth: Some(1970),
            edu: Some("Master".into()),
        }];
        let scores = vec![ScoreRecord { id: "CA_1_2".into(), score: 81, score_cnn: 77 }];
        let demographics = vec![DistrictDemographics {
            district: 2,
            median_income: Some(90000.0),
            ..Default::default()
        }];

        let merged = merge_year(YearTables {
            election: &election,
            candidates: &candidates,
            scores: &scores,
            demographics: &demographics,
        });
        assert_eq!(merged.len(), 4);

        assert_eq!(merged[0].total_votes, Some(4000.0));
        assert_eq!(merged[0].vote_share, Some(0.75));
        assert!((merged[0].ln_vote_share.unwrap() - 0.75f64.ln()).abs() < 1e-12);
        assert_eq!(merged[0].age, Some(48));
        assert_eq!(merged[0].gender.as_deref(), Some("F"));
        assert_eq!(merged[0].score, None);

        assert_eq!(merged[1].score, Some(81));
        assert_eq!(merged[1].score_cnn, Some(77));
        assert_eq!(merged[1].age, None);

        assert_eq!(merged[2].median_income, Some(90000.0));
        assert_eq!(merged[2].vote_share, Some(1.0));
        // Zero votes: share is zero, its log is undefined.
        assert_eq!(merged[3].vote_share, Some(0.0));
        assert_eq!(merged[3].ln_vote_share, None);
    }

    #[test]
    fn test_candidate_info_tolerates_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");
        std::fs::write(
            &path,
            "ID,Name,Gender,Year_of_Birth,Edu\nCA_1_1,A,M,1960,Bachelor\nCA_1_2,B,,unknown,\n",
        )
        .unwrap();
        let rows: Vec<CandidateInfo> = read_csv(&path).unwrap();
        assert_eq!(rows[0].year_of_birth, Some(1960));
        assert_eq!(rows[1].gender, None);
        assert_eq!(rows[1].year_of_birth, None);
        assert_eq!(rows[1].edu, None);
    }
}
