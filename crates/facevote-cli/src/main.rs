use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facevote_core::batch;
use facevote_core::{DetectorVariant, DualScorer, OnnxLandmarkSource};
use facevote_data::election::{self, ElectionRow};
use facevote_data::study::Election;
use facevote_data::{demographics, merge, photos, report, tabular, DataLayout, Study};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "facevote", about = "Candidate facial attractiveness and vote share pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape district election results
    Scrape {
        /// Only this election year
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Download candidate photos listed in the scraped results
    Download {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Score curated candidate photos with both detectors
    Score,
    /// Build district demographics from ACS exports
    Demographics {
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// Merge results, candidate data, scores and demographics
    Merge,
    /// Write the analysis dataset, descriptive statistics and regressions
    Analyze,
    /// Every stage in order
    Run,
}

struct Pipeline {
    config: Config,
    study: Study,
    layout: DataLayout,
}

impl Pipeline {
    fn load() -> Result<Self> {
        let config = Config::from_env();
        let study = Study::load(config.study_path.as_deref()).context("loading study definition")?;
        let layout = DataLayout::new(&config.data_dir, &config.results_dir, &study.state.code);
        Ok(Self { config, study, layout })
    }

    fn elections(&self, year: Option<i32>) -> Result<Vec<Election>> {
        match year {
            Some(y) => {
                let e = self
                    .study
                    .election(y)
                    .with_context(|| format!("no {y} election in the {} study", self.study.state.code))?;
                Ok(vec![e.clone()])
            }
            None => Ok(self.study.elections.clone()),
        }
    }

    async fn scrape(&self, year: Option<i32>) -> Result<()> {
        let client = reqwest::Client::new();
        for e in self.elections(year)? {
            let rows = election::scrape_election(&client, &e, &self.study.state)
                .await
                .with_context(|| format!("scraping {}", e.url))?;
            let path = self.layout.election_csv(e.year);
            tabular::write_csv(&path, &rows)?;
            tracing::info!(year = e.year, path = %path.display(), candidates = rows.len(), "election results saved");
        }
        Ok(())
    }

    async fn download(&self, year: Option<i32>) -> Result<()> {
        let client = photos::photo_client()?;
        for e in self.elections(year)? {
            let path = self.layout.election_csv(e.year);
            let rows: Vec<ElectionRow> =
                tabular::read_csv(&path).with_context(|| format!("reading {}", path.display()))?;
            photos::download_photos(&client, &rows, &self.layout.raw_photo_dir(e.year)).await?;
        }
        Ok(())
    }

    async fn score(&self) -> Result<()> {
        let fast = self.config.detector(DetectorVariant::Fast);
        let accurate = self.config.detector(DetectorVariant::Accurate);
        let landmark_model = self.config.landmark_model_path();
        let root = self.layout.photo_root();

        let summaries = tokio::task::spawn_blocking(move || -> Result<_> {
            let mut scorer = DualScorer::new(
                Box::new(OnnxLandmarkSource::load(DetectorVariant::Fast, &fast, &landmark_model)?),
                Box::new(OnnxLandmarkSource::load(DetectorVariant::Accurate, &accurate, &landmark_model)?),
            );
            Ok(batch::score_root(&mut scorer, &root)?)
        })
        .await
        .context("scoring task panicked")??;

        for s in summaries {
            tracing::info!(batch = %s.batch, scored = s.scored, skipped = s.skipped, output = %s.output.display(), "batch scored");
        }
        Ok(())
    }

    fn demographics(&self, year: Option<i32>) -> Result<()> {
        let acs_dir = self.layout.raw_demographics_dir();
        for e in self.elections(year)? {
            demographics::write_demographics(&acs_dir, &e.acs, &self.study.state, &self.layout.demographics_csv(e.year))
                .with_context(|| format!("building {} demographics", e.year))?;
        }
        Ok(())
    }

    fn merge(&self) -> Result<()> {
        merge::write_final(&self.layout, &self.study).context("merging datasets")?;
        Ok(())
    }

    fn analyze(&self) -> Result<()> {
        let summary = report::write_report(&self.layout, &self.study).context("writing analysis outputs")?;
        tracing::info!(
            complete = summary.complete,
            fitted = summary.models_fitted,
            skipped = summary.models_skipped,
            "analysis complete"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let pipeline = Pipeline::load()?;

    match cli.command {
        Commands::Scrape { year } => pipeline.scrape(year).await?,
        Commands::Download { year } => pipeline.download(year).await?,
        Commands::Score => pipeline.score().await?,
        Commands::Demographics { year } => pipeline.demographics(year)?,
        Commands::Merge => pipeline.merge()?,
        Commands::Analyze => pipeline.analyze()?,
        Commands::Run => {
            pipeline.scrape(None).await?;
            pipeline.download(None).await?;
            pipeline.demographics(None)?;
            pipeline.score().await?;
            pipeline.merge()?;
            pipeline.analyze()?;
        }
    }

    Ok(())
}
