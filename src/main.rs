use anyhow::Context;
use repostats::report::write_full_report;
use repostats::{AnalyzerConfig, AnalyzerSettings, GitHubTransport, RepoAnalyzer};
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run inputs. Read from `REPOSTATS_*` variables, prompted for when the URL is not set.
#[derive(Debug, Default, Deserialize)]
struct RunInputs {
    token: Option<String>,
    repo_url: Option<String>,
    date_begin: Option<String>,
    date_end: Option<String>,
    branch: Option<String>,
}

impl RunInputs {
    fn from_env() -> anyhow::Result<Self> {
        envy::prefixed("REPOSTATS_")
            .from_env()
            .context("failed to read REPOSTATS_* variables")
    }

    fn prompt_missing(mut self) -> anyhow::Result<Self> {
        if self.repo_url.is_some() {
            if self.token.is_none() {
                self.token = Some(prompt("Input, please, token(required)")?);
            }
            return Ok(self);
        }

        if self.token.is_none() {
            self.token = Some(prompt("Input, please, token(required)")?);
        }
        self.repo_url = Some(prompt("Input, please, github repository url(required)")?);
        self.date_begin = Some(prompt(
            "Input, please, date for start analyze(ex. 01.01.2017)(not required)",
        )?);
        self.date_end = Some(prompt("Input, please, date end(ex. 01.01.2017)(not required)")?);
        self.branch = Some(prompt("Input, please, name branch(default=master)(not required)")?);
        Ok(self)
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing (logging). Stdout is reserved for the report.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repostats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let settings = AnalyzerSettings::from_env()?;
    let inputs = RunInputs::from_env()?.prompt_missing()?;

    let config = AnalyzerConfig::new(
        inputs.repo_url.as_deref().unwrap_or_default(),
        inputs.date_begin.as_deref(),
        inputs.date_end.as_deref(),
        inputs.branch.as_deref(),
        inputs.token.as_deref(),
        settings,
    )?;

    tracing::info!(
        repo = %config.repo,
        branch = %config.branch,
        window = ?config.window,
        "Analyzing repository"
    );

    let transport = GitHubTransport::new(&config.credential, &config.settings.base_url)?;
    let analyzer = RepoAnalyzer::new(config, transport);

    let mut stdout = io::stdout().lock();
    write_full_report(&analyzer, &mut stdout).await?;

    Ok(())
}
