use anyhow::Context;
use clap::{Args, Parser};
use movietag_core::{ActorDetail, SearchOptions, DEFAULT_API_URL, DEFAULT_COUNTRY, DEFAULT_LIMIT};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "movietag", version, about = "MovieTAG: a movie tagging system")]
pub struct Cli {
    #[command(flatten)]
    pub action: Action,

    /// Collection root directory (default ~/Videos)
    #[arg(short, long, value_name = "DIRECTORY", env = "MOVIETAG_ROOT")]
    pub root: Option<PathBuf>,

    /// Title used in country (default the original title)
    #[arg(
        short,
        long,
        value_name = "COUNTRY",
        env = "MOVIETAG_COUNTRY",
        default_value = DEFAULT_COUNTRY
    )]
    pub country: String,

    /// Movie to search for; asked interactively when omitted
    #[arg(short, long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Maximum number of candidates requested
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,

    /// Cast detail requested from the service: none, simple or full
    #[arg(long, default_value = "simple")]
    pub actors: ActorDetail,

    /// Base URL of the movie search service
    #[arg(long, value_name = "URL", env = "MOVIETAG_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct Action {
    /// Add movie
    #[arg(short, long, value_name = "MOVIE")]
    pub add: Option<PathBuf>,

    /// Movie file to add, same as --add
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Search movie in the collection
    #[arg(short, long, value_name = "MOVIE")]
    pub query: Option<String>,
}

pub enum Command {
    Add(PathBuf),
    Query(String),
}

impl Cli {
    pub fn command(&self) -> Option<Command> {
        if let Some(fragment) = &self.action.query {
            return Some(Command::Query(fragment.clone()));
        }
        self.action
            .add
            .as_ref()
            .or(self.action.file.as_ref())
            .map(|path| Command::Add(path.clone()))
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            actors: self.actors,
            limit: self.limit,
        }
    }

    pub fn collection_root(&self) -> anyhow::Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => default_root(),
        }
    }
}

fn default_root() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory, pass --root")?;
    Ok(home.join("Videos"))
}
