use crate::catalog::{Catalog, CatalogTx};
use crate::error::AppError;
use crate::layout::CollectionLayout;
use crate::metadata::{MovieSearch, SearchOptions};
use crate::models::{CatalogedMovie, MovieRecord, Role};
use crate::placement::Placement;
use crate::prompt::Prompt;
use std::path::PathBuf;

pub struct IngestRequest {
    pub source: PathBuf,
    pub layout: CollectionLayout,
    pub country: String,
    /// Search term; asked interactively when absent.
    pub title: Option<String>,
    pub options: SearchOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Cataloged {
        movie_id: String,
        title: String,
        links: Vec<PathBuf>,
    },
    AlreadyCataloged {
        movie_id: String,
    },
    NoSelection,
}

/// Search, let the user pick a candidate, then catalog and link the file.
///
/// Nothing is written until a candidate is accepted. A movie that is already
/// cataloged is reported as [`IngestOutcome::AlreadyCataloged`] without touching
/// the filesystem.
pub async fn ingest<S, P>(
    request: &IngestRequest,
    search: &S,
    prompt: &mut P,
) -> Result<IngestOutcome, AppError>
where
    S: MovieSearch + ?Sized,
    P: Prompt + ?Sized,
{
    if !request.source.is_file() {
        return Err(AppError::SourceMissing(request.source.clone()));
    }

    let query = match &request.title {
        Some(title) => title.clone(),
        None => prompt.input("Movie to search")?,
    };

    let candidates = search.search(&query, request.options).await?;
    let Some(movie) = disambiguate(&candidates, &request.country, prompt)? else {
        tracing::info!(query = %query, candidates = candidates.len(), "No candidate accepted");
        return Ok(IngestOutcome::NoSelection);
    };

    let catalog = Catalog::open(&request.layout.catalog_file()).await?;
    let result = catalog_movie(&catalog, request, movie).await;
    catalog.close().await;
    result
}

/// First candidate the user accepts, asked in upstream order.
pub fn disambiguate<'a, P>(
    candidates: &'a [MovieRecord],
    country: &str,
    prompt: &mut P,
) -> Result<Option<&'a MovieRecord>, AppError>
where
    P: Prompt + ?Sized,
{
    for movie in candidates {
        let question = format!("Is \"{}\"", movie.summary(country));
        if prompt.confirm(&question)? {
            return Ok(Some(movie));
        }
    }
    Ok(None)
}

async fn catalog_movie(
    catalog: &Catalog,
    request: &IngestRequest,
    movie: &MovieRecord,
) -> Result<IngestOutcome, AppError> {
    let mut tx = catalog.begin().await?;

    if tx.exists(&movie.id).await? {
        tracing::info!(movie_id = %movie.id, "Movie already cataloged");
        tx.rollback().await;
        return Ok(IngestOutcome::AlreadyCataloged {
            movie_id: movie.id.clone(),
        });
    }

    let title = movie.title_for(&request.country).to_string();
    persist(&mut tx, movie, &title).await?;

    let placement = Placement::new(request.layout.clone(), request.country.clone());
    let staged = placement.stage(&request.source).await?;
    let links = placement.place(&mut tx, &staged, movie).await?;

    tx.commit().await;
    placement.remove_source(&staged).await?;

    tracing::info!(movie_id = %movie.id, title = %title, links = links.len(), "Movie cataloged");
    Ok(IngestOutcome::Cataloged {
        movie_id: movie.id.clone(),
        title,
        links,
    })
}

async fn persist(tx: &mut CatalogTx, movie: &MovieRecord, title: &str) -> Result<(), AppError> {
    tx.insert_movie(movie, title).await?;

    for director in &movie.directors {
        tx.insert_person_if_absent(director).await?;
        tx.insert_credit(&movie.id, &director.id, Role::Director)
            .await?;
    }
    for actor in &movie.actors {
        tx.insert_person_if_absent(actor).await?;
        tx.insert_credit(&movie.id, &actor.id, Role::Actor).await?;
    }
    for genre in &movie.genres {
        tx.insert_genre_tag(&movie.id, genre).await?;
    }
    Ok(())
}

/// Cataloged movies whose title contains `fragment`. A collection without a
/// catalog file yields no results and is left untouched.
pub async fn query(
    layout: &CollectionLayout,
    fragment: &str,
) -> Result<Vec<CatalogedMovie>, AppError> {
    let path = layout.catalog_file();
    if !path.is_file() {
        return Ok(Vec::new());
    }

    let catalog = Catalog::open(&path).await?;
    let result = catalog.find_by_title(fragment).await;
    catalog.close().await;
    result
}
