pub mod optin_pipeline;
pub mod savings_pipeline;

pub use optin_pipeline::{OptInOutput, OptInPipeline};
pub use savings_pipeline::{SavingsOutput, SavingsPipeline};
