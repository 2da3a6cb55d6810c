//! folio CLI tool
//!
//! Command-line interface for building a site context from a mirrored drive tree.
//!
//! ## Commands
//!
//! - `build <content_root>`: Resolve sections, menus, links and index pages, then write the site
//! - `links <file>`: Rewrite the drive links of one rendered file and report the count

use clap::{Parser, Subcommand};
use folio_core::{
    codec::{discover::discover, SiteCompiler},
    config::{SiteConfig, CONFIG_NAME},
    site::{resolve_sections, LinkRewriter},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "A tool for turning a mirrored drive tree into a static site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site from a content root and write it to the output directory
    Build {
        /// Root of the mirrored tree (contains the page paths and folio.toml)
        content_root: PathBuf,

        /// Configuration file path (default: <content_root>/folio.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base URL every site-relative link is qualified against.
        /// Can also be set via FOLIO_SITE_URL environment variable
        #[arg(long)]
        site_url: Option<String>,

        /// Output directory (default: output_path from the config, else <content_root>/output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Build the top-level menu from folders when no hand-authored menu exists
        #[arg(long)]
        auto_menu: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Rewrite drive links in one rendered file, in place
    Links {
        /// Rendered HTML file to rewrite
        file: PathBuf,

        /// Root of the mirrored tree used to look up link targets
        #[arg(long)]
        content_root: PathBuf,

        /// Configuration file path (default: <content_root>/folio.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(
    content_root: &std::path::Path,
    config: Option<PathBuf>,
) -> Result<SiteConfig, folio_core::FolioError> {
    SiteConfig::load(config.unwrap_or_else(|| content_root.join(CONFIG_NAME)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Build { verbose: true, .. });
    let default_filter = if verbose { "debug" } else { "info" };
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Build {
            content_root,
            config,
            site_url,
            output,
            auto_menu,
            verbose: _,
        } => {
            let mut config = load_config(&content_root, config)?;
            if let Some(site_url) = site_url {
                config.site_url = site_url;
            }
            config.auto_menu |= auto_menu;
            let config = config.validated()?;
            let output = output
                .or_else(|| config.output_path.clone())
                .unwrap_or_else(|| content_root.join("output"));

            let mut compiler = SiteCompiler::new(config);
            let report = compiler.build(&content_root)?.clone();
            compiler.emit(&output)?;

            println!("\n=== Build Results ===");
            println!("Records: {}", compiler.store().len());
            println!("Sections: {}", compiler.sections().len());
            println!("Index pages: {}", compiler.index_pages().len());
            println!("Link substitutions: {}", report.substitutions);
            if let Some(top) = compiler.top_menu() {
                println!("Top-level menu: {} ({:?})", top.dir, top.source);
            }
            for diagnostic in report.diagnostics.iter() {
                println!("{diagnostic}");
            }
            println!("Failed items: {}", report.failed_count());
            for location in report.failed_locations() {
                println!("  {location}");
            }
            println!("Output: {}", output.display());

            if report.failed_count() > 0 {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Links {
            file,
            content_root,
            config,
        } => {
            let config = load_config(&content_root, config)?;
            let discovery = discover(&content_root, &config)?;
            let failed = resolve_sections(&discovery.store).failed;
            let rewriter =
                LinkRewriter::new(&discovery.store, &config.site_url).excluding(&failed);

            let content = std::fs::read_to_string(&file)?;
            let rewrite = rewriter.rewrite(&content);
            if rewrite.substitutions > 0 {
                std::fs::write(&file, rewrite.content)?;
            }
            println!("{}: {} substitution(s)", file.display(), rewrite.substitutions);
            Ok(())
        }
    }
}
