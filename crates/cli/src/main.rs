use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use eps_core::config::{resolve_examples_dir, validity_weeks_from_env_value};
use eps_core::constants::DEFAULT_API_PREFIX;
use eps_core::validation::validate_api_base_url;
use eps_core::{generate_examples, CoreConfig, RefreshService};
use eps_identifiers::{LongFormId, ShortFormId};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod sandbox;

use sandbox::HttpSandboxClient;

#[derive(Parser)]
#[command(name = "eps")]
#[command(about = "EPS prescription identifiers and example maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a short-form prescription id
    PrescriptionId {
        /// ODS code of the prescribing organisation
        organisation_code: String,
        /// Also print a long-form (UUID) prescription id
        #[arg(long)]
        long: bool,
    },
    /// Check the structure and check character of a short-form prescription id
    VerifyId {
        /// Short-form prescription id, e.g. A7B2C1-A83008-5E0F14
        id: String,
    },
    /// Generate resource, request and response examples from an OpenAPI document
    GenerateExamples {
        /// OpenAPI JSON document
        spec_file: PathBuf,
        /// Output directory
        out_dir: PathBuf,
    },
    /// Refresh stored prescription examples through a sandbox API
    UpdatePrescriptions {
        /// Sandbox base URL, e.g. http://localhost:9000
        api_base_url: String,
        /// Examples root (defaults to EPS_EXAMPLES_DIR, then models/examples)
        #[arg(long)]
        examples_dir: Option<PathBuf>,
    },
}

/// Entry point for the `eps` tool.
///
/// # Environment Variables
/// - `EPS_EXAMPLES_DIR`: examples root for `update-prescriptions` (default: `models/examples`)
/// - `EPS_VALIDITY_WEEKS`: repeat-dispensing validity period in weeks (default: 4)
/// - `RUST_LOG`: log filter, in addition to `eps=info`
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("eps=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PrescriptionId {
            organisation_code,
            long,
        } => {
            let short_id = ShortFormId::generate(&organisation_code)?;
            println!("{short_id}");
            if long {
                println!("{}", LongFormId::new());
            }
        }
        Commands::VerifyId { id } => {
            let parsed = ShortFormId::parse(&id)?;
            println!(
                "{parsed} is valid (organisation {}, check character {})",
                parsed.organisation_code(),
                parsed.check()
            );
        }
        Commands::GenerateExamples { spec_file, out_dir } => {
            let report = generate_examples(&spec_file, &out_dir)
                .with_context(|| format!("generating examples from {}", spec_file.display()))?;
            println!("Wrote {} example files to {}", report.written.len(), out_dir.display());

            if !report.is_complete() {
                for (component, error) in &report.failed {
                    eprintln!("{component}: {error}");
                }
                bail!("{} component schemas could not be synthesized", report.failed.len());
            }
        }
        Commands::UpdatePrescriptions {
            api_base_url,
            examples_dir,
        } => {
            let base_url = validate_api_base_url(&api_base_url)?;

            let override_dir =
                examples_dir.or_else(|| std::env::var_os("EPS_EXAMPLES_DIR").map(PathBuf::from));
            let examples_dir = resolve_examples_dir(override_dir)?;
            let validity_weeks =
                validity_weeks_from_env_value(std::env::var("EPS_VALIDITY_WEEKS").ok())?;

            let cfg = Arc::new(CoreConfig::new(
                examples_dir,
                DEFAULT_API_PREFIX.into(),
                validity_weeks,
            )?);
            let client = HttpSandboxClient::new(base_url, cfg.api_prefix().to_string());

            let report = RefreshService::new(cfg.clone(), client).refresh_all(chrono::Utc::now())?;
            println!(
                "Refreshed {} prescriptions ({} files) under {}",
                report.exchanges.len(),
                report.files_written(),
                cfg.examples_dir().display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_generate_examples() {
        let cli = Cli::try_parse_from(["eps", "generate-examples", "openapi.json", "out"]).unwrap();

        assert!(matches!(
            cli.command,
            Commands::GenerateExamples { ref spec_file, ref out_dir }
                if spec_file == &PathBuf::from("openapi.json") && out_dir == &PathBuf::from("out")
        ));
    }

    #[test]
    fn test_parses_update_prescriptions_with_examples_dir() {
        let cli = Cli::try_parse_from([
            "eps",
            "update-prescriptions",
            "http://localhost:9000",
            "--examples-dir",
            "corpus",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::UpdatePrescriptions { ref examples_dir, .. }
                if examples_dir.as_deref() == Some(std::path::Path::new("corpus"))
        ));
    }
}
