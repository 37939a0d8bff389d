pub mod analyzer;
pub mod config;
pub mod github;
pub mod metrics;
pub mod report;
pub mod transport;
pub mod types;

pub use analyzer::{AnalyzerError, RepoAnalyzer};
pub use config::{AnalyzerConfig, AnalyzerSettings, ConfigError, RepoId};
pub use github::GitHubTransport;
pub use transport::{Transport, TransportError};
