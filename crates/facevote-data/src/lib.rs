//! facevote-data — election scraping, district demographics, dataset
//! assembly, descriptive statistics and regression tables.

pub mod analysis;
pub mod demographics;
pub mod election;
pub mod error;
pub mod layout;
pub mod merge;
pub mod models;
pub mod ols;
pub mod photos;
pub mod report;
pub mod stats;
pub mod study;
pub mod tabular;

pub use error::{DataError, ScrapeError};
pub use layout::DataLayout;
pub use study::Study;
