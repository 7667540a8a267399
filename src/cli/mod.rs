use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{load_config, resolve_config_path, Config};
use crate::core::document::Document;
use crate::core::release::{PackageRelease, ReleaseId};
use crate::error::{ReleaseGraphError, Result};
use crate::graph::analytics::{aggregate_by_package, betweenness, page_rank, top_n};
use crate::graph::builder::{build_graph, BuildReport};
use crate::graph::filter::{filter_by_time_window, filter_to_latest_per_package};
use crate::graph::query::{
    direct_dependents, latest_transitive_closure, releases_between, transitive_closure,
};
use crate::graph::{GraphError, ReleaseGraph};
use crate::util::{dates, output};

#[derive(Parser, Debug)]
#[command(name = "releasegraph", version)]
#[command(about = "Release-level dependency graph explorer", long_about = None)]
pub struct Cli {
    /// Package document (JSON) to build the graph from.
    #[arg(short, long, env = "RELEASEGRAPH_INPUT")]
    pub input: PathBuf,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[arg(short, long)]
    pub quiet: bool,
    #[arg(long)]
    pub no_color: bool,
    /// Read dependency ranges as Maven version ranges.
    #[arg(long)]
    pub maven: bool,
    #[arg(short, long)]
    pub jobs: Option<usize>,
    #[arg(long)]
    pub no_progress: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise the built graph.
    Stats(StatsArgs),
    /// List releases published inside a time window.
    Window(WindowArgs),
    /// Transitive dependencies of one release.
    Deps(DepsArgs),
    /// Releases that directly depend on one release.
    Dependents(DependentsArgs),
    /// PageRank over the (optionally windowed) graph.
    Rank(RankArgs),
    /// Betweenness centrality over the (optionally windowed) graph.
    Betweenness(BetweennessArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct WindowFlags {
    /// Window start: RFC 3339, YYYY-MM-DD or DD-MM-YYYY.
    #[arg(long)]
    pub from: Option<String>,
    /// Window end, inclusive; a bare day covers the whole day.
    #[arg(long)]
    pub to: Option<String>,
}

impl WindowFlags {
    /// Parses `--from`/`--to`; `None` when neither was given. A window that
    /// ends before it starts is rejected.
    fn resolve(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let Some((begin, end)) = dates::parse_window(self.from.as_deref(), self.to.as_deref())?
        else {
            return Ok(None);
        };
        if begin > end {
            return Err(GraphError::InvalidWindow { begin, end }.into());
        }
        Ok(Some((begin, end)))
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct WindowArgs {
    #[command(flatten)]
    pub window: WindowFlags,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    pub name: String,
    pub version: String,
    /// Collapse each dependency package to its most recent release.
    #[arg(long)]
    pub latest: bool,
    #[command(flatten)]
    pub window: WindowFlags,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DependentsArgs {
    pub name: String,
    pub version: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RankArgs {
    #[arg(long)]
    pub top: Option<usize>,
    #[command(flatten)]
    pub window: WindowFlags,
    /// Sum release scores per package name.
    #[arg(long)]
    pub by_package: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BetweennessArgs {
    #[arg(long)]
    pub top: Option<usize>,
    #[command(flatten)]
    pub window: WindowFlags,
    /// Keep only the latest release of each package before scoring.
    #[arg(long)]
    pub latest: bool,
    #[arg(long)]
    pub json: bool,
}

pub fn run() {
    let cli = Cli::parse();
    if cli.no_color {
        output::set_colors(false);
    }
    init_tracing(cli.verbose, cli.quiet);
    if let Err(err) = dispatch(cli) {
        output::error(&err.to_string());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_env("RELEASEGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match (quiet, verbose) {
            (true, _) => "releasegraph=error",
            (false, 0) => "releasegraph=warn",
            (false, 1) => "releasegraph=info",
            (false, _) => "releasegraph=debug",
        })
    });

    let format = env::var("RELEASEGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout is reserved for command output
    let _ = match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
}

fn dispatch(cli: Cli) -> Result<()> {
    let session = Session::open(&cli)?;
    match cli.command {
        Commands::Stats(args) => handle_stats(session, args),
        Commands::Window(args) => handle_window(session, args),
        Commands::Deps(args) => handle_deps(session, args),
        Commands::Dependents(args) => handle_dependents(session, args),
        Commands::Rank(args) => handle_rank(session, args),
        Commands::Betweenness(args) => handle_betweenness(session, args),
    }
}

/// A freshly built graph plus the settings it was built with. Filters are
/// destructive, so every invocation builds its own.
struct Session {
    config: Config,
    graph: ReleaseGraph,
    report: BuildReport,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self> {
        let cwd = env::current_dir()?;
        let mut config = match resolve_config_path(cli.config.clone(), &cwd) {
            Some(path) => load_config(&path)?,
            None => Config::default(),
        };
        if cli.maven {
            config.build.maven = true;
        }
        if cli.jobs.is_some() {
            config.build.jobs = cli.jobs;
        }
        if cli.no_progress || cli.quiet {
            config.build.progress = false;
        }

        if !cli.quiet {
            output::step(&format!("loading {}", cli.input.display()));
        }
        let document = Document::load(&cli.input)?;
        let (graph, report) = build_graph(&document, &config.build.options())?;
        if report.duplicate_releases > 0 && !cli.quiet {
            output::warn(&format!(
                "ignored {} duplicate release(s)",
                report.duplicate_releases
            ));
        }
        Ok(Self {
            config,
            graph,
            report,
        })
    }

    fn apply_window(&mut self, window: &WindowFlags) -> Result<()> {
        if let Some((begin, end)) = window.resolve()? {
            filter_by_time_window(&mut self.graph, begin, end);
        }
        Ok(())
    }

    fn top(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.analytics.top)
    }
}

#[derive(Debug, Serialize)]
struct ReleaseView {
    id: ReleaseId,
    name: String,
    version: String,
    published: String,
}

impl From<&PackageRelease> for ReleaseView {
    fn from(release: &PackageRelease) -> Self {
        Self {
            id: release.id,
            name: release.name.clone(),
            version: release.version.raw.clone(),
            published: release.published.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReleaseScoreView {
    #[serde(flatten)]
    release: ReleaseView,
    score: f64,
}

#[derive(Debug, Serialize)]
struct PackageScoreView {
    name: String,
    score: f64,
}

#[derive(Debug, Serialize)]
struct StatsView<'a> {
    #[serde(flatten)]
    report: &'a BuildReport,
    known_packages: usize,
}

fn handle_stats(session: Session, args: StatsArgs) -> Result<()> {
    let report = &session.report;
    if args.json {
        return print_json(&StatsView {
            report,
            known_packages: session.graph.package_count(),
        });
    }

    println!("packages:            {}", report.packages);
    println!("releases:            {}", report.releases);
    println!("dependencies:        {}", report.dependencies);
    println!("duplicate releases:  {}", report.duplicate_releases);
    println!("skipped ranges:      {}", report.skipped_ranges);
    println!("skipped candidates:  {}", report.skipped_candidates);
    println!("self dependencies:   {}", report.self_loops);
    Ok(())
}

fn handle_window(session: Session, args: WindowArgs) -> Result<()> {
    let (begin, end) = args
        .window
        .resolve()?
        .ok_or_else(|| anyhow::anyhow!("window needs --from and/or --to"))?;
    let releases = releases_between(&session.graph, begin, end);
    print_releases(&releases, args.json)
}

fn handle_deps(mut session: Session, args: DepsArgs) -> Result<()> {
    session.apply_window(&args.window)?;
    let releases = if args.latest {
        latest_transitive_closure(&session.graph, &args.name, &args.version)
    } else {
        transitive_closure(&session.graph, &args.name, &args.version)
    };
    if releases.is_empty() && !args.json {
        output::warn(&format!(
            "no dependencies found for {}-{}",
            args.name, args.version
        ));
        return Ok(());
    }
    print_releases(&releases, args.json)
}

fn handle_dependents(session: Session, args: DependentsArgs) -> Result<()> {
    if session.graph.lookup(&args.name, &args.version).is_none() {
        return Err(ReleaseGraphError::Other(anyhow::anyhow!(
            "unknown release {}-{}",
            args.name,
            args.version
        )));
    }
    let releases = direct_dependents(&session.graph, &args.name, &args.version);
    print_releases(&releases, args.json)
}

fn handle_rank(mut session: Session, args: RankArgs) -> Result<()> {
    session.apply_window(&args.window)?;
    let top = session.top(args.top);
    let scores = page_rank(&session.graph, &session.config.analytics.pagerank());

    if args.by_package {
        let by_package = aggregate_by_package(&session.graph, &scores);
        let rows: Vec<PackageScoreView> = top_n(&by_package, top)
            .into_iter()
            .map(|(name, score)| PackageScoreView { name, score })
            .collect();
        if args.json {
            return print_json(&rows);
        }
        for row in rows {
            println!("{:.6}  {}", row.score, row.name);
        }
        return Ok(());
    }

    print_release_scores(&session.graph, &scores, top, args.json)
}

fn handle_betweenness(mut session: Session, args: BetweennessArgs) -> Result<()> {
    session.apply_window(&args.window)?;
    if args.latest {
        filter_to_latest_per_package(&mut session.graph);
    }
    let top = session.top(args.top);
    let scores = betweenness(&session.graph);
    print_release_scores(&session.graph, &scores, top, args.json)
}

fn print_release_scores(
    graph: &ReleaseGraph,
    scores: &std::collections::HashMap<ReleaseId, f64>,
    top: usize,
    json: bool,
) -> Result<()> {
    let rows: Vec<ReleaseScoreView> = top_n(scores, top)
        .into_iter()
        .filter_map(|(id, score)| {
            graph.release(id).map(|release| ReleaseScoreView {
                release: ReleaseView::from(release),
                score,
            })
        })
        .collect();
    if json {
        return print_json(&rows);
    }
    for row in rows {
        println!(
            "{:.6}  {}-{}",
            row.score, row.release.name, row.release.version
        );
    }
    Ok(())
}

fn print_releases(releases: &[PackageRelease], json: bool) -> Result<()> {
    if json {
        let views: Vec<ReleaseView> = releases.iter().map(ReleaseView::from).collect();
        return print_json(&views);
    }
    for release in releases {
        println!("{}  {}", release, release.published.to_rfc3339());
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode json")?;
    println!("{}", json);
    Ok(())
}
