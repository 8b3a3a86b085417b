use std::rc::Rc;

use charmrepo_charm::{CharmUrl, Schema};
use charmrepo_config::config::{self, get_config, Config};
use charmrepo_core::{infer_repository, CharmRevision, RepoError, Result};
use clap::Parser;
use cli::{Args, Commands};
use logging::setup_logging;
use nu_ansi_term::Color::{Blue, Cyan, Green, Red};
use tracing::{debug, info};
use utils::{Colored, COLOR};

mod cli;
mod logging;
mod utils;

fn parse_url(raw: &str) -> Result<CharmUrl> {
    Ok(CharmUrl::parse(raw)?)
}

fn get_charm(config: &Config, raw: &str) -> Result<()> {
    let url = parse_url(raw)?;
    let repo = infer_repository(&url, config)?;
    let charm = repo.get(&url)?;

    info!(
        "{} revision {}",
        Colored(Blue, charm.name()),
        Colored(Green, charm.revision())
    );
    info!("{}", charm.path().display());
    Ok(())
}

type LatestResult = std::result::Result<CharmRevision, Rc<RepoError>>;

/// Queries each backend once for all of its urls and returns the results in
/// input order. A backend that cannot be set up fails only its own urls.
fn collect_latest(config: &Config, urls: &[CharmUrl]) -> Vec<Option<LatestResult>> {
    let mut results: Vec<Option<LatestResult>> = urls.iter().map(|_| None).collect();
    for schema in [Schema::CharmStore, Schema::Local] {
        let (indices, batch): (Vec<usize>, Vec<CharmUrl>) = urls
            .iter()
            .enumerate()
            .filter(|(_, url)| url.schema == schema)
            .map(|(idx, url)| (idx, url.clone()))
            .unzip();
        let Some(first) = batch.first() else {
            continue;
        };

        debug!("querying {} {} url(s)", batch.len(), schema);
        match infer_repository(first, config).and_then(|repo| repo.latest(&batch)) {
            Ok(revisions) => {
                for (idx, revision) in indices.into_iter().zip(revisions) {
                    results[idx] = Some(revision.map_err(Rc::new));
                }
            }
            Err(err) => {
                let err = Rc::new(err);
                for idx in indices {
                    results[idx] = Some(Err(err.clone()));
                }
            }
        }
    }
    results
}

fn latest_revisions(config: &Config, raws: &[String]) -> Result<()> {
    let urls = raws
        .iter()
        .map(|raw| parse_url(raw))
        .collect::<Result<Vec<_>>>()?;

    for (url, result) in urls.iter().zip(collect_latest(config, &urls)) {
        match result {
            Some(Ok(revision)) => info!("{}: {}", Colored(Cyan, url), revision.revision),
            Some(Err(err)) => info!("{}: {}: {}", Colored(Cyan, url), Colored(Red, "error"), err),
            None => {}
        }
    }
    Ok(())
}

fn resolve_url(config: &Config, raw: &str) -> Result<()> {
    let url = parse_url(raw)?;
    let repo = infer_repository(&url, config)?;
    let resolved = repo.resolve(&url)?;

    info!("{}", Colored(Cyan, &resolved.url));
    if !resolved.supported_series.is_empty() {
        info!("supported series: {}", resolved.supported_series.join(", "));
    }
    Ok(())
}

fn handle_cli() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap();
        *color = false;
    }

    if let Some(ref c) = args.config {
        config::set_config_path(c)?;
    }
    config::init()?;

    let mut config = get_config();
    if let Some(user_agent) = args.user_agent {
        config.user_agent = Some(user_agent);
    }

    match args.command {
        Commands::Get { url } => get_charm(&config, &url),
        Commands::Latest { urls } => latest_revisions(&config, &urls),
        Commands::Resolve { url } => resolve_url(&config, &url),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        let code = if err.is_not_found() { 2 } else { 1 };
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
