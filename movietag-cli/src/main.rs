mod cli;

use clap::Parser;
use cli::{Cli, Command};
use movietag_core::{
    ingest, query, AppError, CollectionLayout, IngestOutcome, IngestRequest, MetadataClient,
    TerminalPrompt,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movietag=warn,movietag_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let layout = CollectionLayout::new(cli.collection_root()?);

    // 每次运行都确保分类目录存在
    if let Err(e) = layout.ensure().await {
        return Ok(report(e));
    }

    let result = match cli.command() {
        Some(Command::Add(source)) => add(&cli, layout, source).await,
        Some(Command::Query(fragment)) => list(&layout, &fragment).await,
        None => Ok(()),
    };

    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    })
}

async fn add(cli: &Cli, layout: CollectionLayout, source: PathBuf) -> Result<(), AppError> {
    let request = IngestRequest {
        source,
        layout,
        country: cli.country.clone(),
        title: cli.title.clone(),
        options: cli.search_options(),
    };
    let client = MetadataClient::new(cli.api_url.clone());

    match ingest(&request, &client, &mut TerminalPrompt).await? {
        IngestOutcome::Cataloged { title, links, .. } => {
            println!("Added \"{}\" ({} links)", title, links.len());
        }
        IngestOutcome::AlreadyCataloged { .. } => println!("Movie already in collection"),
        IngestOutcome::NoSelection => println!("No movie selected"),
    }
    Ok(())
}

async fn list(layout: &CollectionLayout, fragment: &str) -> Result<(), AppError> {
    let movies = query(layout, fragment).await?;
    if movies.is_empty() {
        println!("No movies found");
    }
    for movie in movies {
        match movie.directors.first() {
            Some(director) => println!(
                "{} ({} - {}) [{}]",
                movie.title, director, movie.year, movie.id
            ),
            None => println!("{} ({}) [{}]", movie.title, movie.year, movie.id),
        }
    }
    Ok(())
}

fn report(err: AppError) -> ExitCode {
    tracing::debug!(error = ?err, "Command failed");
    eprintln!("{}", err);
    ExitCode::from(err.exit_code())
}
