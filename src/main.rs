//! newsletter-digest - Entry point for the digest CLI

use std::path::PathBuf;

use clap::Parser;
use newsletter_digest::config::Settings;
use newsletter_digest::App;

/// Mail yourself a digest of the links in recent newsletters.
#[derive(Debug, Parser)]
#[command(name = "newsletter-digest", version, about)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long = "config-file", alias = "config_file", value_name = "PATH")]
    config_file: PathBuf,

    /// Print the digest instead of sending it.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(config = %cli.config_file.display(), "Starting newsletter-digest");

    if let Err(e) = run(cli).await {
        tracing::error!("Run failed: {:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&cli.config_file)?;
    let summary = App::new(settings).run(cli.dry_run).await?;

    if cli.dry_run {
        println!("{}", summary.digest.body());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn accepts_both_flag_spellings() {
        let dashed = Cli::try_parse_from(["newsletter-digest", "--config-file", "a.json"]).unwrap();
        assert_eq!(dashed.config_file, PathBuf::from("a.json"));
        assert!(!dashed.dry_run);

        let underscored =
            Cli::try_parse_from(["newsletter-digest", "--config_file", "b.json", "--dry-run"])
                .unwrap();
        assert_eq!(underscored.config_file, PathBuf::from("b.json"));
        assert!(underscored.dry_run);
    }

    #[test]
    fn config_file_is_required() {
        assert!(Cli::try_parse_from(["newsletter-digest"]).is_err());
    }
}
