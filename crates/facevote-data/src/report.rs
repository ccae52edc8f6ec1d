//! Writes every analysis output from the merged table.

use crate::analysis::{build_analysis, AnalysisRow};
use crate::error::DataError;
use crate::layout::DataLayout;
use crate::merge::CandidateRecord;
use crate::models;
use crate::stats::{self, FOUR_SCORE_GROUPS, THREE_SCORE_GROUPS};
use crate::study::Study;
use crate::tabular::{read_csv, write_csv};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub merged: usize,
    pub complete: usize,
    pub models_fitted: usize,
    pub models_skipped: usize,
}

/// Descriptive tables for the analysis rows.
pub fn write_descriptive(layout: &DataLayout, rows: &[AnalysisRow]) -> Result<(), DataError> {
    let dir = layout.descriptive_dir();
    let state = &layout.state;

    stats::by_gender(rows).write(&dir.join(format!("descriptive_statistics_{state}.csv")))?;
    stats::by_party(rows).write(&dir.join(format!("descriptive_stats_{state}.csv")))?;
    stats::write_feature_scores(
        &dir.join(format!("grouped_score_statistics_{state}.csv")),
        &stats::scores_by_feature(rows),
    )?;

    let score_groups = [
        ("score_group_statistics_1.csv", "score", FOUR_SCORE_GROUPS),
        ("score_group_statistics_2.csv", "score", THREE_SCORE_GROUPS),
        ("score_group_statistics_CNN_1.csv", "score_CNN", FOUR_SCORE_GROUPS),
        ("score_group_statistics_CNN_2.csv", "score_CNN", THREE_SCORE_GROUPS),
    ];
    for (file, column, bins) in score_groups {
        stats::write_score_groups(
            &dir.join(file),
            &stats::vote_share_by_score_group(rows, column, &bins),
        )?;
    }
    info!(dir = %dir.display(), "wrote descriptive statistics");
    Ok(())
}

/// Read the merged table and write the analysis dataset, descriptive
/// statistics and regression tables.
pub fn write_report(layout: &DataLayout, study: &Study) -> Result<ReportSummary, DataError> {
    let records: Vec<CandidateRecord> = read_csv(&layout.final_csv())?;
    let rows = build_analysis(&records, study);
    write_csv(&layout.alldata_csv(), &rows)?;
    info!(merged = records.len(), complete = rows.len(), "wrote analysis dataset");

    write_descriptive(layout, &rows)?;

    let mut summary = ReportSummary {
        merged: records.len(),
        complete: rows.len(),
        ..Default::default()
    };
    let table_dir = layout.table_dir();
    for table in models::tables() {
        let fits = table.write(&table_dir, &rows)?;
        let fitted = fits.iter().filter(|f| f.is_some()).count();
        summary.models_fitted += fitted;
        summary.models_skipped += fits.len() - fitted;
    }
    Ok(summary)
}
