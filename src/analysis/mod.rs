mod client;
mod types;

pub use client::{AnalysisProvider, HttpAnalysisClient};
pub use types::{AnalysisError, AnalysisRequest, AnalysisResponse};
