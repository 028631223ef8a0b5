use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use get_version::config;
use get_version::domain::Target;
use get_version::vcs::VcsSelection;
use get_version::Resolver;

mod ui;

#[derive(clap::Parser)]
#[command(
    name = "get-version",
    version,
    about = "Print a Python package's version from VCS tags, sdist metadata or installed metadata"
)]
struct Args {
    #[arg(
        value_name = "TARGET",
        help = "Module path (…/mod.py, …/pkg/__init__.py) or distribution name"
    )]
    target: PathBuf,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Tag regex; must define a named group 'base'")]
    pattern: Option<String>,

    #[arg(long, help = "VCS to look for: any, git or mercurial")]
    vcs: Option<VcsSelection>,

    #[arg(short, long, help = "Distribution name, if it differs from the module name")]
    dist_name: Option<String>,

    #[arg(long, help = "Never add the dirty marker")]
    no_dirty: bool,

    #[arg(long, help = "Log each resolution stage to stderr")]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Project-level configuration lives next to the module's project root
    let project_root = Target::from_path(&args.target, args.dist_name.as_deref())
        .ok()
        .and_then(|target| target.parent().map(|p| p.to_path_buf()));

    let mut config = config::load_config(args.config.as_deref(), project_root.as_deref())
        .context("Error loading config")?;

    if let Some(pattern) = args.pattern {
        config.pattern = pattern;
    }
    if let Some(vcs) = args.vcs {
        config.vcs = vcs;
    }
    if args.dist_name.is_some() {
        config.dist_name = args.dist_name;
    }
    if args.no_dirty {
        config.dirty = false;
    }

    let resolver = match Resolver::new(config) {
        Ok(resolver) => resolver,
        Err(e) => {
            ui::display_resolution_error(&e);
            std::process::exit(1);
        }
    };

    match resolver.resolve(&args.target) {
        Ok(version) => ui::display_version(&version),
        Err(e) => {
            ui::display_resolution_error(&e);
            std::process::exit(1);
        }
    }

    Ok(())
}
