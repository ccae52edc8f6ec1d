//! Descriptive statistics over the analysis dataset.

use crate::analysis::AnalysisRow;
use crate::error::DataError;
use crate::tabular::{cell, round4, write_rows};
use std::path::Path;

/// Right-closed bins over a numeric column.
///
/// With `include_lowest` the first bin also takes its left edge, so
/// `[0, 70, 75]` yields `[0, 70]` and `(70, 75]`.
#[derive(Debug, Clone, Copy)]
pub struct Bins {
    pub edges: &'static [f64],
    pub labels: &'static [&'static str],
    pub include_lowest: bool,
}

pub const FOUR_SCORE_GROUPS: Bins = Bins {
    edges: &[0.0, 70.0, 75.0, 80.0, 100.0],
    labels: &["below 69.99", "70-74.99", "75-79.99", "above 80"],
    include_lowest: true,
};

pub const THREE_SCORE_GROUPS: Bins = Bins {
    edges: &[0.0, 75.0, 80.0, 100.0],
    labels: &["below 74.99", "75-79.99", "above 80"],
    include_lowest: true,
};

pub const AGE_GROUPS: Bins = Bins {
    edges: &[0.0, 40.0, 50.0, 60.0, 70.0, 100.0],
    labels: &["<40", "40-50", "50-60", "60-70", ">70"],
    include_lowest: false,
};

impl Bins {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Zero-based bin of `v`, or `None` when it falls outside every bin.
    pub fn index(&self, v: f64) -> Option<usize> {
        if self.include_lowest && self.edges.first() == Some(&v) {
            return Some(0);
        }
        self.edges
            .windows(2)
            .position(|w| v > w[0] && v <= w[1])
    }

    /// One-based group number, the regressor used in the models.
    pub fn group(&self, v: f64) -> Option<u8> {
        self.index(v).map(|i| i as u8 + 1)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with one degree of freedom removed.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Rounded summary of one variable within one group.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub n: usize,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        Self {
            mean: mean(values).map(round4),
            std: sample_std(values).map(round4),
            min: values.iter().copied().reduce(f64::min).map(round4),
            max: values.iter().copied().reduce(f64::max).map(round4),
            n: values.len(),
        }
    }
}

fn column(rows: &[&AnalysisRow], name: &str) -> Vec<f64> {
    rows.iter().filter_map(|r| r.value(name)).collect()
}

/// Rows whose indicator column equals one.
fn with_flag<'a>(rows: &'a [AnalysisRow], flag: &str) -> Vec<&'a AnalysisRow> {
    rows.iter().filter(|r| r.value(flag) == Some(1.0)).collect()
}

pub const GENDER_TABLE_VARIABLES: &[&str] = &[
    "vote_share", "ln_vote_share", "score", "score_CNN",
    "Republican", "Democratic", "Other",
    "Incumbent_0", "Incumbent_1",
    "Age", "Master & Above", "College", "High School",
    "city_type_rural", "city_type_transition", "city_type_urban",
    "Poverty (%)", "Median_Household_Income", "Pop_Total", "Sex Ratio",
];

pub const PARTY_TABLE_VARIABLES: &[&str] = &[
    "vote_share", "ln_vote_share", "score", "score_CNN",
    "Gender_M", "Gender_F",
    "Incumbent_0", "Incumbent_1",
    "Age", "Master & Above", "College", "High School",
    "city_type_rural", "city_type_transition", "city_type_urban",
    "Poverty (%)", "Median_Household_Income", "Pop_Total", "Sex Ratio",
];

pub const CANDIDATE_FEATURES: &[&str] = &[
    "Gender_M", "Gender_F",
    "Master & Above", "College", "High School",
    "Republican", "Democratic", "Other",
    "Incumbent_0", "Incumbent_1",
    "city_type_rural", "city_type_transition", "city_type_urban",
];

/// Summaries of several variables for several row groups.
#[derive(Debug, Clone)]
pub struct GroupTable {
    pub variables: Vec<String>,
    /// Group name and one summary per variable.
    pub groups: Vec<(String, Vec<Summary>)>,
}

impl GroupTable {
    fn build(variables: &[&str], groups: Vec<(&str, Vec<&AnalysisRow>)>) -> Self {
        Self {
            variables: variables.iter().map(|v| v.to_string()).collect(),
            groups: groups
                .into_iter()
                .map(|(name, rows)| {
                    let summaries = variables.iter().map(|v| Summary::of(&column(&rows, v))).collect();
                    (name.to_string(), summaries)
                })
                .collect(),
        }
    }

    pub fn summary(&self, group: &str, variable: &str) -> Option<&Summary> {
        let vi = self.variables.iter().position(|v| v == variable)?;
        let (_, summaries) = self.groups.iter().find(|(g, _)| g == group)?;
        summaries.get(vi)
    }

    /// Two header lines (group, statistic), one line per variable and a
    /// closing `N` line with the group size under every statistic.
    pub fn write(&self, path: &Path) -> Result<(), DataError> {
        let mut top = vec![String::new()];
        let mut stat = vec![String::new()];
        for (group, _) in &self.groups {
            for s in ["Mean", "Std", "Min", "Max"] {
                top.push(group.clone());
                stat.push(s.to_string());
            }
        }

        let mut rows = Vec::with_capacity(self.variables.len() + 1);
        for (i, variable) in self.variables.iter().enumerate() {
            let mut line = vec![variable.clone()];
            for (_, summaries) in &self.groups {
                let s = summaries[i];
                line.extend([cell(s.mean), cell(s.std), cell(s.min), cell(s.max)]);
            }
            rows.push(line);
        }
        let mut n_line = vec!["N".to_string()];
        for (_, summaries) in &self.groups {
            let n = summaries.first().map(|s| s.n).unwrap_or(0).to_string();
            n_line.extend(std::iter::repeat(n).take(4));
        }
        rows.push(n_line);

        write_rows(path, &[top, stat], &rows)
    }
}

/// Total, male and female columns.
pub fn by_gender(rows: &[AnalysisRow]) -> GroupTable {
    GroupTable::build(
        GENDER_TABLE_VARIABLES,
        vec![
            ("Total", rows.iter().collect()),
            ("Male", with_flag(rows, "Gender_M")),
            ("Female", with_flag(rows, "Gender_F")),
        ],
    )
}

/// Total, Republican, Democratic and other-party columns.
pub fn by_party(rows: &[AnalysisRow]) -> GroupTable {
    GroupTable::build(
        PARTY_TABLE_VARIABLES,
        vec![
            ("Total", rows.iter().collect()),
            ("Republican", with_flag(rows, "Republican")),
            ("Democratic", with_flag(rows, "Democratic")),
            ("Other", with_flag(rows, "Other")),
        ],
    )
}

/// Mean, std and count of both scores within one candidate group.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScores {
    pub feature: String,
    pub score: Summary,
    pub score_cnn: Summary,
}

fn feature_scores(feature: String, rows: &[&AnalysisRow]) -> FeatureScores {
    FeatureScores {
        feature,
        score: Summary::of(&column(rows, "score")),
        score_cnn: Summary::of(&column(rows, "score_CNN")),
    }
}

/// Score by candidate feature, then by age group (`Age: <40`, ...).
pub fn scores_by_feature(rows: &[AnalysisRow]) -> Vec<FeatureScores> {
    let mut out: Vec<FeatureScores> = CANDIDATE_FEATURES
        .iter()
        .map(|f| feature_scores(f.to_string(), &with_flag(rows, f)))
        .collect();

    for (i, label) in AGE_GROUPS.labels.iter().enumerate() {
        let members: Vec<&AnalysisRow> = rows
            .iter()
            .filter(|r| AGE_GROUPS.index(r.age as f64) == Some(i))
            .collect();
        out.push(feature_scores(format!("Age: {label}"), &members));
    }
    out
}

pub fn write_feature_scores(path: &Path, table: &[FeatureScores]) -> Result<(), DataError> {
    let header = [
        "Feature", "Score (Mean)", "Score (Std)", "N", "Score_CNN (Mean)", "Score_CNN (Std)", "N_CNN",
    ]
    .map(String::from)
    .to_vec();
    let rows: Vec<Vec<String>> = table
        .iter()
        .map(|f| {
            vec![
                f.feature.clone(),
                cell(f.score.mean),
                cell(f.score.std),
                f.score.n.to_string(),
                cell(f.score_cnn.mean),
                cell(f.score_cnn.std),
                f.score_cnn.n.to_string(),
            ]
        })
        .collect();
    write_rows(path, &[header], &rows)
}

/// Vote share within one score bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreGroupStats {
    pub label: &'static str,
    pub vote_share: Summary,
    pub ln_vote_share: Summary,
}

/// Vote share by bin of `score_column` (`score` or `score_CNN`). Every bin
/// is reported, empty ones included.
pub fn vote_share_by_score_group(rows: &[AnalysisRow], score_column: &str, bins: &Bins) -> Vec<ScoreGroupStats> {
    bins.labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let members: Vec<&AnalysisRow> = rows
                .iter()
                .filter(|r| r.value(score_column).and_then(|s| bins.index(s)) == Some(i))
                .collect();
            ScoreGroupStats {
                label: *label,
                vote_share: Summary::of(&column(&members, "vote_share")),
                ln_vote_share: Summary::of(&column(&members, "ln_vote_share")),
            }
        })
        .collect()
}

pub fn write_score_groups(path: &Path, table: &[ScoreGroupStats]) -> Result<(), DataError> {
    let header = [
        "score_group",
        "vote_share (mean)",
        "vote_share (std)",
        "ln_vote_share (mean)",
        "ln_vote_share (std)",
        "count",
    ]
    .map(String::from)
    .to_vec();
    let rows: Vec<Vec<String>> = table
        .iter()
        .map(|g| {
            vec![
                g.label.to_string(),
                cell(g.vote_share.mean),
                cell(g.vote_share.std),
                cell(g.ln_vote_share.mean),
                cell(g.ln_vote_share.std),
                g.vote_share.n.to_string(),
            ]
        })
        .collect();
    write_rows(path, &[header], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;
    use crate::study::Study;

    fn rows() -> Vec<AnalysisRow> {
        let study = Study::builtin().unwrap();
        let mut a = record("CA_1_1", 70, 0.6);
        a.gender = Some("F".into());
        a.age = Some(40);
        let mut b = record("CA_1_2", 78, 0.3);
        b.party = "Republican".into();
        b.age = Some(41);
        let mut c = record("CA_2_1", 85, 0.8);
        c.age = Some(72);
        crate::analysis::build_analysis(&[a, b, c], &study)
    }

    #[test]
    fn test_bins_are_right_closed() {
        assert_eq!(FOUR_SCORE_GROUPS.group(0.0), Some(1));
        assert_eq!(FOUR_SCORE_GROUPS.group(70.0), Some(1));
        assert_eq!(FOUR_SCORE_GROUPS.group(70.5), Some(2));
        assert_eq!(FOUR_SCORE_GROUPS.group(80.0), Some(3));
        assert_eq!(FOUR_SCORE_GROUPS.group(100.0), Some(4));
        assert_eq!(THREE_SCORE_GROUPS.group(75.0), Some(1));
        assert_eq!(THREE_SCORE_GROUPS.group(76.0), Some(2));
        assert_eq!(AGE_GROUPS.index(0.0), None);
        assert_eq!(AGE_GROUPS.index(40.0), Some(0));
        assert_eq!(AGE_GROUPS.index(101.0), None);
    }

    #[test]
    fn test_summary() {
        let s = Summary::of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.mean, Some(2.5));
        assert_eq!(s.std, Some(1.291));
        assert_eq!((s.min, s.max, s.n), (Some(1.0), Some(4.0), 4));

        let single = Summary::of(&[5.0]);
        assert_eq!(single.std, None);
        assert_eq!(Summary::of(&[]).mean, None);
    }

    #[test]
    fn test_group_tables() {
        let rows = rows();
        let gender = by_gender(&rows);
        assert_eq!(gender.summary("Total", "score").unwrap().n, 3);
        assert_eq!(gender.summary("Female", "score").unwrap().mean, Some(70.0));
        assert_eq!(gender.summary("Male", "score").unwrap().mean, Some(81.5));

        let party = by_party(&rows);
        assert_eq!(party.summary("Republican", "vote_share").unwrap().n, 1);
        assert_eq!(party.summary("Other", "vote_share").unwrap().n, 0);
        assert!(party.summary("Other", "nope").is_none());
    }

    #[test]
    fn test_feature_and_age_scores() {
        let table = scores_by_feature(&rows());
        let female = table.iter().find(|f| f.feature == "Gender_F").unwrap();
        assert_eq!(female.score.n, 1);
        let under40 = table.iter().find(|f| f.feature == "Age: <40").unwrap();
        assert_eq!(under40.score.n, 1);
        let forties = table.iter().find(|f| f.feature == "Age: 40-50").unwrap();
        assert_eq!(forties.score.mean, Some(78.0));
        let over70 = table.iter().find(|f| f.feature == "Age: >70").unwrap();
        assert_eq!(over70.score_cnn.n, 1);
        assert_eq!(table.len(), CANDIDATE_FEATURES.len() + AGE_GROUPS.len());
    }

    #[test]
    fn test_vote_share_by_score_group() {
        let groups = vote_share_by_score_group(&rows(), "score", &FOUR_SCORE_GROUPS);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].vote_share.n, 1);
        assert_eq!(groups[1].vote_share.n, 0);
        assert_eq!(groups[2].vote_share.mean, Some(0.3));
        assert_eq!(groups[3].label, "above 80");
    }

    #[test]
    fn test_write_gender_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        by_gender(&rows()).write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with(",Total,Total,Total,Total,Male"));
        assert!(lines[1].starts_with(",Mean,Std,Min,Max"));
        assert_eq!(lines.len(), 2 + GENDER_TABLE_VARIABLES.len() + 1);
        assert!(lines.last().unwrap().starts_with("N,3,3,3,3,2,2,2,2,1,1,1,1"));
    }
}
