// Adapters layer: concrete implementations for external collaborators.

pub mod advisor;

pub use advisor::{request_advice, HttpAdvisor};
