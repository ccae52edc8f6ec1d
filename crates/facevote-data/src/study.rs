//! Study definition: which state, which elections, and the per-year inputs.
//!
//! The California study is compiled in from `contrib/study/ca.toml`; another
//! state can be run by pointing `FACEVOTE_STUDY` at a file of the same shape.

use crate::error::DataError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_STUDY: &str = include_str!("../../../contrib/study/ca.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Study {
    pub state: StateInfo,
    #[serde(rename = "election")]
    pub elections: Vec<Election>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateInfo {
    /// Postal code, used in candidate IDs and file names.
    pub code: String,
    /// Full name as it appears in Wikipedia table captions.
    pub name: String,
    pub districts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Election {
    pub year: i32,
    pub url: String,
    pub acs: AcsFiles,
    pub city: CityThresholds,
}

/// ACS exports, relative to the raw demographics directory.
#[derive(Debug, Clone, Deserialize)]
pub struct AcsFiles {
    pub poverty: PathBuf,
    pub income: PathBuf,
    pub population: PathBuf,
}

/// District classification cut-offs on median income and population.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CityThresholds {
    pub urban_income: f64,
    pub urban_population: f64,
    pub rural_income: f64,
    pub rural_population: f64,
}

impl Study {
    /// The compiled-in California study.
    pub fn builtin() -> Result<Self, DataError> {
        Ok(toml::from_str(DEFAULT_STUDY)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Load `path` if given, otherwise the built-in study.
    pub fn load(path: Option<&Path>) -> Result<Self, DataError> {
        match path {
            Some(p) => {
                tracing::info!(path = %p.display(), "loading study definition");
                Self::from_file(p)
            }
            None => Self::builtin(),
        }
    }

    pub fn election(&self, year: i32) -> Option<&Election> {
        self.elections.iter().find(|e| e.year == year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_study_parses() {
        let study = Study::builtin().unwrap();
        assert_eq!(study.state.code, "CA");
        assert_eq!(study.state.districts, 53);
        assert_eq!(study.elections.len(), 2);
        let e2020 = study.election(2020).unwrap();
        assert_eq!(e2020.city.rural_population, 730000.0);
        assert_eq!(study.election(2018).unwrap().city.rural_population, 720000.0);
        assert!(study.election(2016).is_none());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tx.toml");
        std::fs::write(
            &path,
            r#"
[state]
code = "TX"
name = "Texas"
districts = 36

[[election]]
year = 2022
url = "https://example.org/tx"
acs = { poverty = "p.csv", income = "i.csv", population = "pop.csv" }
city = { urban_income = 1.0, urban_population = 2.0, rural_income = 3.0, rural_population = 4.0 }
"#,
        )
        .unwrap();
        let study = Study::load(Some(&path)).unwrap();
        assert_eq!(study.state.name, "Texas");
        assert_eq!(study.elections[0].acs.income, PathBuf::from("i.csv"));
    }

    #[test]
    fn test_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[state]\ncode = 1").unwrap();
        assert!(matches!(Study::from_file(&path), Err(DataError::Study(_))));
    }
}
