//! On-disk layout of raw inputs, processed tables and results.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub state: String,
}

impl DataLayout {
    pub fn new(data_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>, state: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            results_dir: results_dir.into(),
            state: state.to_string(),
        }
    }

    fn raw(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    fn processed(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn election_csv(&self, year: i32) -> PathBuf {
        self.raw()
            .join("election_result")
            .join(format!("{}_house_election_{year}.csv", self.state))
    }

    /// Downloaded photos, before manual curation.
    pub fn raw_photo_dir(&self, year: i32) -> PathBuf {
        self.raw().join("candidate_images").join(&self.state).join(year.to_string())
    }

    /// Curated photos; one sub-directory per year.
    pub fn photo_root(&self) -> PathBuf {
        self.processed().join("candidate_images").join(&self.state)
    }

    pub fn scores_csv(&self, year: i32) -> PathBuf {
        self.photo_root().join(format!("{year}_scores.csv"))
    }

    pub fn candidate_csv(&self, year: i32) -> PathBuf {
        self.processed()
            .join("candidate_data")
            .join(format!("{}_candidate_data_{year}.csv", self.state))
    }

    pub fn raw_demographics_dir(&self) -> PathBuf {
        self.raw().join("District_Demographics")
    }

    pub fn demographics_csv(&self, year: i32) -> PathBuf {
        self.processed()
            .join("District_Demographics")
            .join(format!("{}_District_Demographics_{year}.csv", self.state))
    }

    pub fn final_csv(&self) -> PathBuf {
        self.processed().join(format!("{}_final.csv", self.state))
    }

    pub fn alldata_csv(&self) -> PathBuf {
        self.results_dir.join(format!("alldata_{}.csv", self.state))
    }

    pub fn descriptive_dir(&self) -> PathBuf {
        self.results_dir.join("descriptive_statistics")
    }

    pub fn table_dir(&self) -> PathBuf {
        self.results_dir.join("table")
    }
}
