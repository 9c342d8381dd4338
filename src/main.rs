use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vid2doc::cli::{Cli, Commands};
use vid2doc::config::Config;
use vid2doc::pipeline::Pipeline;
use vid2doc::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "vid2doc=debug"
    } else {
        "vid2doc=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load().await?;

    match cli.command {
        Commands::Convert {
            input,
            output,
            image_width,
            model,
            keep_video,
        } => {
            // Check for required external tools before doing any work
            let missing_deps = utils::check_dependencies().await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            if let Some(width) = image_width {
                config.app.image_width_inches = width;
            }
            if let Some(model) = model {
                config.app.whisper_model = model;
            }
            if keep_video {
                config.app.keep_video = true;
            }
            config.app.quiet = cli.quiet;

            let pipeline = Pipeline::new(config)?;

            tracing::info!("Starting conversion of: {}", input);

            let report = pipeline.run(&input, &output).await?;

            if !report.failures.is_empty() {
                eprintln!(
                    "⚠️  {} segment(s) were skipped:",
                    report.failures.len()
                );
                for failure in &report.failures {
                    eprintln!(
                        "   • segment {} at {:.2}s: {}",
                        failure.segment_index, failure.start, failure.error
                    );
                }
            }

            println!(
                "Document with {} step(s) saved to: {}",
                report.steps_written,
                report.output_path.display()
            );
        }
        Commands::Formats => {
            println!("Supported output formats (selected by the output file extension):");
            println!("  • doc / docx - Word document with embedded frames");
            println!("  • pdf        - fixed-layout document (via LibreOffice)");
            println!("  • md         - Markdown referencing a frames directory");
            println!("  • html       - templated page referencing a frames directory");
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.interactive_setup().await?;
            }
        }
    }

    Ok(())
}
