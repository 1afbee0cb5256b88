use crate::domain::model::RunReport;
use crate::utils::error::{Result, RowValidationError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Where `path` lives, as reported back to the user.
    fn location(&self, path: &str) -> String;
}

/// Receives recoverable row problems. Passed explicitly to every component
/// that can skip rows.
pub trait DiagnosticSink: Send + Sync {
    fn row_skipped(&self, source: &str, issue: &RowValidationError);
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Loaded: Send;
    type Output: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Loaded>;
    async fn transform(&self, data: Self::Loaded) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<RunReport>;
}

/// What the external agent layer is given: a task in plain words plus the
/// data it should look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub task: String,
    pub context: serde_json::Value,
}

impl AdvisoryRequest {
    pub fn new(task: impl Into<String>, context: serde_json::Value) -> Self {
        Self {
            task: task.into(),
            context,
        }
    }
}

/// Opaque advisor output. Displayed, never interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub text: String,
}

#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<Advice>;
}
