//! Regression models of log vote share on the binned attractiveness score.
//!
//! Each model is a list of terms over analysis columns. Categorical terms are
//! treatment-coded against their first sorted level and named the way
//! formula-based tools print them (`C(Gender)[T.M]`,
//! `score_group:C(Incumbent)[T.1]`).

use crate::analysis::AnalysisRow;
use crate::error::DataError;
use crate::ols::{self, OlsError, OlsFit};
use crate::stats::{Bins, FOUR_SCORE_GROUPS, THREE_SCORE_GROUPS};
use crate::tabular::write_rows;
use ndarray::{Array1, Array2};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

pub const RESPONSE: &str = "ln_vote_share";
pub const INTERCEPT: &str = "Intercept";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Numeric(&'static str),
    Categorical(&'static str),
    NumericByNumeric(&'static str, &'static str),
    NumericByCategorical(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    All,
    Democratic,
    NotDemocratic,
    Incumbent,
    NotIncumbent,
}

impl Subset {
    pub fn contains(self, row: &AnalysisRow) -> bool {
        match self {
            Subset::All => true,
            Subset::Democratic => row.party == "Democratic",
            Subset::NotDemocratic => row.party != "Democratic",
            Subset::Incumbent => row.incumbent == 1,
            Subset::NotIncumbent => row.incumbent == 0,
        }
    }
}

/// Which detector's score feeds the score-group regressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreColumn {
    Score,
    ScoreCnn,
}

impl ScoreColumn {
    pub fn regressor(self) -> &'static str {
        match self {
            ScoreColumn::Score => "score_group",
            ScoreColumn::ScoreCnn => "score_group_CNN",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub name: String,
    pub bins: Bins,
    pub subset: Subset,
    pub terms: Vec<Term>,
}

/// Design matrix and response for one model.
#[derive(Debug, Clone)]
pub struct Design {
    pub names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl ModelSpec {
    /// Numeric value of a column, with the score groups derived from the
    /// model's bins.
    fn numeric(&self, row: &AnalysisRow, column: &str) -> Option<f64> {
        match column {
            "score_group" => self.bins.group(row.score as f64).map(f64::from),
            "score_group_CNN" => self.bins.group(row.score_cnn as f64).map(f64::from),
            other => row.value(other),
        }
    }

    fn complete(&self, row: &AnalysisRow) -> bool {
        row.value(RESPONSE).is_some()
            && self.terms.iter().all(|t| match *t {
                Term::Numeric(n) => self.numeric(row, n).is_some(),
                Term::Categorical(c) => row.category(c).is_some(),
                Term::NumericByNumeric(a, b) => {
                    self.numeric(row, a).is_some() && self.numeric(row, b).is_some()
                }
                Term::NumericByCategorical(a, c) => {
                    self.numeric(row, a).is_some() && row.category(c).is_some()
                }
            })
    }

    pub fn has(&self, term: Term) -> bool {
        self.terms.contains(&term)
    }

    /// Build the design over the model's subset, dropping rows with any
    /// missing value.
    pub fn design(&self, rows: &[AnalysisRow]) -> Design {
        let kept: Vec<&AnalysisRow> = rows
            .iter()
            .filter(|r| self.subset.contains(r) && self.complete(r))
            .collect();

        // Non-reference levels of every categorical column in use.
        let mut levels: HashMap<&str, Vec<String>> = HashMap::new();
        for term in &self.terms {
            if let Term::Categorical(c) | Term::NumericByCategorical(_, c) = *term {
                levels.entry(c).or_insert_with(|| {
                    let all: BTreeSet<String> = kept.iter().filter_map(|r| r.category(c)).collect();
                    all.into_iter().skip(1).collect()
                });
            }
        }
        let levels_of = |c: &str| levels.get(c).map(Vec::as_slice).unwrap_or(&[]);

        let mut names = vec![INTERCEPT.to_string()];
        for term in &self.terms {
            match *term {
                Term::Numeric(n) => names.push(n.to_string()),
                Term::Categorical(c) => {
                    names.extend(levels_of(c).iter().map(|l| format!("C({c})[T.{l}]")))
                }
                Term::NumericByNumeric(a, b) => names.push(format!("{a}:{b}")),
                Term::NumericByCategorical(a, c) => {
                    names.extend(levels_of(c).iter().map(|l| format!("{a}:C({c})[T.{l}]")))
                }
            }
        }

        let mut x = Array2::<f64>::zeros((kept.len(), names.len()));
        let mut y = Array1::<f64>::zeros(kept.len());
        for (i, row) in kept.iter().enumerate() {
            y[i] = row.value(RESPONSE).unwrap_or(f64::NAN);
            x[[i, 0]] = 1.0;
            let mut j = 1;
            for term in &self.terms {
                match *term {
                    Term::Numeric(n) => {
                        x[[i, j]] = self.numeric(row, n).unwrap_or(f64::NAN);
                        j += 1;
                    }
                    Term::Categorical(c) => {
                        let level = row.category(c);
                        for l in levels_of(c) {
                            x[[i, j]] = if level.as_deref() == Some(l.as_str()) { 1.0 } else { 0.0 };
                            j += 1;
                        }
                    }
                    Term::NumericByNumeric(a, b) => {
                        let va = self.numeric(row, a).unwrap_or(f64::NAN);
                        let vb = self.numeric(row, b).unwrap_or(f64::NAN);
                        x[[i, j]] = va * vb;
                        j += 1;
                    }
                    Term::NumericByCategorical(a, c) => {
                        let va = self.numeric(row, a).unwrap_or(f64::NAN);
                        let level = row.category(c);
                        for l in levels_of(c) {
                            x[[i, j]] = if level.as_deref() == Some(l.as_str()) { va } else { 0.0 };
                            j += 1;
                        }
                    }
                }
            }
        }

        Design { names, x, y }
    }

    pub fn fit(&self, rows: &[AnalysisRow]) -> Result<OlsFit, OlsError> {
        let design = self.design(rows);
        debug!(model = %self.name, n = design.x.nrows(), k = design.x.ncols(), "fitting model");
        ols::fit(design.names, &design.x, &design.y)
    }
}

/// Optional controls shared by every model family.
#[derive(Debug, Clone, Copy, Default)]
struct Controls {
    edu: bool,
    democratic: bool,
    incumbent: bool,
    city: bool,
}

/// `Age + Agesq + C(Gender) [+ C(Edu_Level)] [+ Democratic] [+ C(Incumbent)]
/// [+ C(city_type)] + C(Year)`
fn controls(c: Controls) -> Vec<Term> {
    let mut terms = vec![Term::Numeric("Age"), Term::Numeric("Agesq"), Term::Categorical("Gender")];
    if c.edu {
        terms.push(Term::Categorical("Edu_Level"));
    }
    if c.democratic {
        terms.push(Term::Numeric("Democratic"));
    }
    if c.incumbent {
        terms.push(Term::Categorical("Incumbent"));
    }
    if c.city {
        terms.push(Term::Categorical("city_type"));
    }
    terms.push(Term::Categorical("Year"));
    terms
}

fn spec(name: &str, score: ScoreColumn, bins: Bins, subset: Subset, mut terms: Vec<Term>) -> ModelSpec {
    let suffix = match score {
        ScoreColumn::Score => "",
        ScoreColumn::ScoreCnn => " (CNN)",
    };
    terms.insert(0, Term::Numeric(score.regressor()));
    ModelSpec {
        name: format!("{name}{suffix}"),
        bins,
        subset,
        terms,
    }
}

const BOTH_SCORES: [ScoreColumn; 2] = [ScoreColumn::Score, ScoreColumn::ScoreCnn];

/// The fourteen main-effect models for one binning.
pub fn main_models(bins: Bins) -> Vec<ModelSpec> {
    let full = Controls { edu: true, democratic: true, incumbent: true, city: true };
    let pooled = [
        ("Total", Controls { edu: false, city: false, ..full }),
        ("Total_edu", Controls { city: false, ..full }),
        ("Total_edu_city", full),
    ];
    let mut models = Vec::new();
    for (name, c) in pooled {
        for score in BOTH_SCORES {
            models.push(spec(name, score, bins, Subset::All, controls(c)));
        }
    }
    for score in BOTH_SCORES {
        for (name, subset) in [("Not Democratic", Subset::NotDemocratic), ("Democratic", Subset::Democratic)] {
            models.push(spec(name, score, bins, subset, controls(Controls { democratic: false, ..full })));
        }
    }
    for score in BOTH_SCORES {
        for (name, subset) in [("Not Incumbent", Subset::NotIncumbent), ("Incumbent", Subset::Incumbent)] {
            models.push(spec(name, score, bins, subset, controls(Controls { incumbent: false, ..full })));
        }
    }
    models
}

/// Which pooled control sets the interaction families run with.
const INTERACTION_CONTROLS: [(bool, bool); 3] = [(false, false), (true, false), (true, true)];

/// Score group interacted with incumbency, for three and four groups.
pub fn incumbent_interaction_models() -> Vec<ModelSpec> {
    let mut models = Vec::new();
    for bins in [THREE_SCORE_GROUPS, FOUR_SCORE_GROUPS] {
        for (edu, city) in INTERACTION_CONTROLS {
            for score in BOTH_SCORES {
                let mut terms = vec![
                    Term::Categorical("Incumbent"),
                    Term::NumericByCategorical(score.regressor(), "Incumbent"),
                ];
                terms.extend(controls(Controls { edu, democratic: true, incumbent: false, city }));
                models.push(spec("Total", score, bins, Subset::All, terms));
            }
        }
    }
    models
}

/// Score group interacted with the Democratic indicator.
pub fn party_interaction_models() -> Vec<ModelSpec> {
    let mut models = Vec::new();
    for bins in [THREE_SCORE_GROUPS, FOUR_SCORE_GROUPS] {
        for (edu, city) in INTERACTION_CONTROLS {
            for score in BOTH_SCORES {
                let mut terms = vec![
                    Term::Numeric("Democratic"),
                    Term::NumericByNumeric(score.regressor(), "Democratic"),
                ];
                terms.extend(controls(Controls { edu, democratic: false, incumbent: true, city }));
                models.push(spec("Total", score, bins, Subset::All, terms));
            }
        }
    }
    models
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedEffect {
    Age,
    Gender,
    Education,
    Party,
    Incumbent,
    City,
    Year,
}

impl FixedEffect {
    pub fn label(self) -> &'static str {
        match self {
            FixedEffect::Age => "Age FE",
            FixedEffect::Gender => "Gender FE",
            FixedEffect::Education => "Education FE",
            FixedEffect::Party => "Party FE",
            FixedEffect::Incumbent => "Incumbent FE",
            FixedEffect::City => "City FE",
            FixedEffect::Year => "Year FE",
        }
    }

    fn term(self) -> Term {
        match self {
            FixedEffect::Age => Term::Numeric("Age"),
            FixedEffect::Gender => Term::Categorical("Gender"),
            FixedEffect::Education => Term::Categorical("Edu_Level"),
            FixedEffect::Party => Term::Numeric("Democratic"),
            FixedEffect::Incumbent => Term::Categorical("Incumbent"),
            FixedEffect::City => Term::Categorical("city_type"),
            FixedEffect::Year => Term::Categorical("Year"),
        }
    }
}

/// A set of models reported side by side.
#[derive(Debug, Clone)]
pub struct ModelTable {
    pub file: &'static str,
    pub models: Vec<ModelSpec>,
    pub covariates: &'static [&'static str],
    pub fixed_effects: &'static [FixedEffect],
}

const MAIN_COVARIATES: &[&str] = &["score_group", "score_group_CNN", "Democratic", "C(Incumbent)[T.1]", INTERCEPT];

const MAIN_EFFECTS: &[FixedEffect] = &[
    FixedEffect::Age,
    FixedEffect::Gender,
    FixedEffect::Education,
    FixedEffect::Party,
    FixedEffect::Incumbent,
    FixedEffect::City,
    FixedEffect::Year,
];

/// Every published table.
pub fn tables() -> Vec<ModelTable> {
    vec![
        ModelTable {
            file: "lnVoteShare_3.csv",
            models: main_models(THREE_SCORE_GROUPS),
            covariates: MAIN_COVARIATES,
            fixed_effects: MAIN_EFFECTS,
        },
        ModelTable {
            file: "lnVoteShare_4.csv",
            models: main_models(FOUR_SCORE_GROUPS),
            covariates: MAIN_COVARIATES,
            fixed_effects: MAIN_EFFECTS,
        },
        ModelTable {
            file: "lnVoteShare_Incumbent.csv",
            models: incumbent_interaction_models(),
            covariates: &[
                "score_group",
                "score_group:C(Incumbent)[T.1]",
                "score_group_CNN",
                "score_group_CNN:C(Incumbent)[T.1]",
                "C(Incumbent)[T.1]",
                INTERCEPT,
            ],
            fixed_effects: &[
                FixedEffect::Age,
                FixedEffect::Gender,
                FixedEffect::Education,
                FixedEffect::Party,
                FixedEffect::City,
                FixedEffect::Year,
            ],
        },
        ModelTable {
            file: "lnVoteShare_Party.csv",
            models: party_interaction_models(),
            covariates: &[
                "score_group",
                "score_group:Democratic",
                "score_group_CNN",
                "score_group_CNN:Democratic",
                "Democratic",
                INTERCEPT,
            ],
            fixed_effects: &[
                FixedEffect::Age,
                FixedEffect::Gender,
                FixedEffect::Education,
                FixedEffect::Incumbent,
                FixedEffect::City,
                FixedEffect::Year,
            ],
        },
    ]
}

/// Significance stars from a normal z statistic: 10%, 5% and 1% two-sided.
pub fn stars(z: f64) -> &'static str {
    let z = z.abs();
    if z >= 2.5758 {
        "***"
    } else if z >= 1.9600 {
        "**"
    } else if z >= 1.6449 {
        "*"
    } else {
        ""
    }
}

impl ModelTable {
    /// Fit every model; a model that cannot be estimated is logged and
    /// reported as an empty column.
    pub fn fit(&self, rows: &[AnalysisRow]) -> Vec<Option<OlsFit>> {
        self.models
            .iter()
            .map(|m| match m.fit(rows) {
                Ok(fit) => Some(fit),
                Err(e) => {
                    warn!(table = self.file, model = %m.name, error = %e, "model skipped");
                    None
                }
            })
            .collect()
    }

    /// Coefficient rows (estimate with stars, then standard error in
    /// parentheses), fixed-effect indicator rows, observations and R².
    pub fn render(&self, fits: &[Option<OlsFit>]) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        let mut header = vec![String::new()];
        header.extend(self.models.iter().map(|m| m.name.clone()));
        let mut groups = vec!["Score Groups".to_string()];
        groups.extend(self.models.iter().map(|m| m.bins.len().to_string()));

        let mut rows = Vec::new();
        for covariate in self.covariates {
            let mut coef = vec![covariate.to_string()];
            let mut se = vec![String::new()];
            for fit in fits {
                let i = fit.as_ref().and_then(|f| f.terms.iter().position(|t| t == covariate));
                match (fit, i) {
                    (Some(f), Some(i)) => {
                        coef.push(format!("{:.4}{}", f.coef[i], stars(f.z[i])));
                        se.push(format!("({:.4})", f.std_err[i]));
                    }
                    _ => {
                        coef.push(String::new());
                        se.push(String::new());
                    }
                }
            }
            rows.push(coef);
            rows.push(se);
        }

        for fe in self.fixed_effects {
            let mut line = vec![fe.label().to_string()];
            line.extend(
                self.models
                    .iter()
                    .map(|m| if m.has(fe.term()) { "V".to_string() } else { String::new() }),
            );
            rows.push(line);
        }

        let mut n = vec!["Observations".to_string()];
        let mut r2 = vec!["R2".to_string()];
        for fit in fits {
            n.push(fit.as_ref().map(|f| f.n.to_string()).unwrap_or_default());
            r2.push(fit.as_ref().map(|f| format!("{:.4}", f.r_squared)).unwrap_or_default());
        }
        rows.push(n);
        rows.push(r2);

        (vec![header, groups], rows)
    }

    pub fn write(&self, dir: &Path, rows: &[AnalysisRow]) -> Result<Vec<Option<OlsFit>>, DataError> {
        let fits = self.fit(rows);
        let (headers, body) = self.render(&fits);
        let path = dir.join(self.file);
        write_rows(&path, &headers, &body)?;
        let fitted = fits.iter().filter(|f| f.is_some()).count();
        info!(path = %path.display(), fitted, models = fits.len(), "wrote regression table");
        Ok(fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::record;
    use crate::analysis::build_analysis;
    use crate::study::Study;

    /// Synthetic sample where ln vote share rises with the score group.
    fn sample() -> Vec<AnalysisRow> {
        let study = Study::builtin().unwrap();
        let mut records = Vec::new();
        for i in 0..60u32 {
            let score = 60 + (i * 7 % 40) as u8;
            let group = FOUR_SCORE_GROUPS.group(score as f64).unwrap() as f64;
            let noise = ((i * 37 % 11) as f64 - 5.0) / 100.0;
            let share = (-1.5 + 0.2 * group + noise).exp();
            let mut r = record(&format!("CA_{i}_1"), score, share);
            r.ln_vote_share = Some(share.ln());
            r.score_cnn = Some(60 + (i * 11 % 40) as u8);
            r.year = if (i / 2) % 2 == 0 { 2018 } else { 2020 };
            r.age = Some(35 + (i * 13 % 40) as i32);
            r.gender = Some(if i % 3 == 0 { "F" } else { "M" }.into());
            r.party = if i % 2 == 1 { "Democratic" } else { "Republican" }.into();
            r.incumbent = u8::from(i % 4 == 0);
            r.edu = Some(["Bachelor", "Master", "High_school", "Doctor"][((i * 7 + i / 5) % 4) as usize].into());
            r.median_income = Some(60000.0 + (i * 9173 % 60000) as f64);
            r.pop_total = Some(700000.0 + (i * 3001 % 90000) as f64);
            records.push(r);
        }
        build_analysis(&records, &study)
    }

    #[test]
    fn test_family_sizes_and_names() {
        let main = main_models(THREE_SCORE_GROUPS);
        assert_eq!(main.len(), 14);
        let names: Vec<&str> = main.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(&names[..2], &["Total", "Total (CNN)"]);
        assert_eq!(&names[6..10], &["Not Democratic", "Democratic", "Not Democratic (CNN)", "Democratic (CNN)"]);
        assert_eq!(names[13], "Incumbent (CNN)");
        assert_eq!(incumbent_interaction_models().len(), 12);
        assert_eq!(party_interaction_models().len(), 12);
        assert_eq!(tables().len(), 4);
    }

    #[test]
    fn test_term_names_and_treatment_coding() {
        let rows = sample();
        let model = &incumbent_interaction_models()[4];
        assert!(model.has(Term::Categorical("city_type")));
        let design = model.design(&rows);
        assert_eq!(design.names[0], "Intercept");
        assert_eq!(design.names[1], "score_group");
        assert_eq!(design.names[2], "C(Incumbent)[T.1]");
        assert_eq!(design.names[3], "score_group:C(Incumbent)[T.1]");
        assert!(design.names.contains(&"C(Gender)[T.M]".to_string()));
        assert!(design.names.contains(&"C(Year)[T.2020]".to_string()));
        assert!(design.names.contains(&"C(Edu_Level)[T.3]".to_string()));
        assert!(!design.names.contains(&"C(Gender)[T.F]".to_string()));
        assert_eq!(design.x.ncols(), design.names.len());
        assert_eq!(design.x.nrows(), rows.len());

        // Interaction equals the group for incumbents and zero otherwise.
        for (i, row) in rows.iter().enumerate() {
            let expected = if row.incumbent == 1 { design.x[[i, 1]] } else { 0.0 };
            assert_eq!(design.x[[i, 3]], expected);
        }
    }

    #[test]
    fn test_subsets_filter_rows() {
        let rows = sample();
        let main = main_models(FOUR_SCORE_GROUPS);
        let democratic = main.iter().find(|m| m.name == "Democratic").unwrap();
        let design = democratic.design(&rows);
        assert_eq!(design.x.nrows(), rows.iter().filter(|r| r.party == "Democratic").count());
        assert!(!design.names.contains(&"Democratic".to_string()));
    }

    #[test]
    fn test_score_group_recovered() {
        let rows = sample();
        let total = &main_models(FOUR_SCORE_GROUPS)[0];
        let fit = total.fit(&rows).unwrap();
        let (b, se) = fit.term("score_group").unwrap();
        assert!((b - 0.2).abs() < 0.05, "coef {b}");
        assert!(se > 0.0);
        assert_eq!(fit.n, rows.len());
    }

    #[test]
    fn test_single_party_subset_is_skipped_not_fatal() {
        let rows: Vec<AnalysisRow> = sample().into_iter().filter(|r| r.party == "Democratic").collect();
        let table = &tables()[0];
        let fits = table.fit(&rows);
        // Pooled models include a constant Democratic column and cannot be fitted.
        assert!(fits[0].is_none());
        let (_, body) = table.render(&fits);
        assert_eq!(body.last().unwrap().len(), table.models.len() + 1);
    }

    #[test]
    fn test_write_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = &tables()[3];
        let fits = table.write(dir.path(), &sample()).unwrap();
        assert!(fits.iter().all(Option::is_some));
        let text = std::fs::read_to_string(dir.path().join("lnVoteShare_Party.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with(",Total,Total (CNN)"));
        assert!(lines[1].starts_with("Score Groups,3,3,3,3,3,3,4,4"));
        assert!(lines[2].starts_with("score_group,"));
        assert!(text.contains("\nIncumbent FE,V,V"));
        assert!(text.contains("\nObservations,"));
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(3.0), "***");
        assert_eq!(stars(-2.0), "**");
        assert_eq!(stars(1.7), "*");
        assert_eq!(stars(0.5), "");
    }
}
