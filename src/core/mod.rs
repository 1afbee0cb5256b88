pub mod aggregator;
pub mod etl;
pub mod filter;
pub mod loader;
pub mod reporter;

pub use crate::domain::model::{ExpenseRecord, Record, RecordSet, RunReport};
pub use crate::domain::ports::{Advisor, DiagnosticSink, Pipeline, Storage};
pub use crate::utils::error::Result;
