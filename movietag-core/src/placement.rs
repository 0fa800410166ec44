use crate::catalog::CatalogTx;
use crate::error::AppError;
use crate::layout::{Category, CollectionLayout};
use crate::models::MovieRecord;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Hardlinks accepted movies into the category trees of a collection.
pub struct Placement {
    layout: CollectionLayout,
    country: String,
}

impl Placement {
    pub fn new(layout: CollectionLayout, country: impl Into<String>) -> Self {
        Self {
            layout,
            country: country.into(),
        }
    }

    /// Normalized `<title>.<extension>` name for the movie's links.
    pub fn file_name(&self, source: &Path, movie: &MovieRecord) -> String {
        let title = component(movie.title_for(&self.country));
        match source.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", title, ext),
            _ => title,
        }
    }

    /// Category directories the movie belongs to, in link order.
    pub fn destinations(&self, movie: &MovieRecord) -> Vec<(Category, PathBuf)> {
        let title = component(movie.title_for(&self.country));
        let letter = title
            .chars()
            .next()
            .map(|c| component(&c.to_lowercase().collect::<String>()))
            .unwrap_or_else(|| "_".to_string());

        let mut dirs = vec![
            (Category::Name, self.layout.dir(Category::Name).join(letter)),
            (
                Category::Year,
                self.layout.dir(Category::Year).join(component(&movie.year)),
            ),
        ];
        for director in &movie.directors {
            dirs.push((
                Category::Director,
                self.layout
                    .dir(Category::Director)
                    .join(component(&director.name)),
            ));
        }
        for actor in &movie.actors {
            dirs.push((
                Category::Actor,
                self.layout.dir(Category::Actor).join(component(&actor.name)),
            ));
        }
        for genre in &movie.genres {
            dirs.push((
                Category::Genre,
                self.layout.dir(Category::Genre).join(component(genre)),
            ));
        }
        dirs
    }

    /// Moves the source into the collection root so every link stays on one filesystem.
    pub async fn stage(&self, source: &Path) -> Result<PathBuf, AppError> {
        let file_name = source.file_name().ok_or_else(|| {
            AppError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid source file: {}", source.display()),
            ))
        })?;
        let staged = self.layout.root().join(file_name);

        // 相对路径 (如 `movie.mkv`) 需先解析, 否则无法判断是否已在根目录
        let resolved = fs::canonicalize(source).await?;
        let root = fs::canonicalize(self.layout.root()).await?;
        if resolved.parent() == Some(root.as_path()) {
            return Ok(staged);
        }
        if staged.exists() {
            return Err(AppError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", staged.display()),
            )));
        }

        tracing::info!(from = %source.display(), to = %staged.display(), "Staging source file");
        robust_move(source, &staged).await?;
        Ok(staged)
    }

    /// Links `source` into every destination and records each link in `tx`.
    pub async fn place(
        &self,
        tx: &mut CatalogTx,
        source: &Path,
        movie: &MovieRecord,
    ) -> Result<Vec<PathBuf>, AppError> {
        let file_name = self.file_name(source, movie);

        let mut created = Vec::new();
        for (category, dir) in self.destinations(movie) {
            let dest = link_file(source, &dir, &file_name).await?;
            tx.insert_location(&movie.id, &dest).await?;
            tracing::debug!(category = ?category, path = %dest.display(), "Linked file");
            created.push(dest);
        }
        Ok(created)
    }

    /// Removes the staged source once all links exist. Not reversible.
    pub async fn remove_source(&self, source: &Path) -> Result<(), AppError> {
        fs::remove_file(source).await?;
        Ok(())
    }
}

/// Single path component that cannot escape its category directory.
/// Unix keeps everything but `/` and NUL; Windows gets the full sanitizer.
fn component(name: &str) -> String {
    let name = name.trim();
    let safe = if cfg!(windows) {
        sanitize_filename::sanitize(name)
    } else {
        name.chars().filter(|c| *c != '/' && *c != '\0').collect()
    };

    if safe.is_empty() || safe.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        safe
    }
}

async fn link_file(source: &Path, dir: &Path, file_name: &str) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir).await?;
    let dest = dir.join(file_name);
    fs::hard_link(source, &dest).await?;
    Ok(dest)
}

async fn robust_move(src: &Path, dest: &Path) -> Result<(), AppError> {
    if let Err(e) = fs::rename(src, dest).await {
        // EXDEV: 跨设备无法 rename
        tracing::warn!(
            "Rename failed ({:?}), trying copy+delete for {}",
            e,
            src.display()
        );
        fs::copy(src, dest).await?;
        fs::remove_file(src).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalizedTitle, Person};

    fn movie() -> MovieRecord {
        MovieRecord {
            id: "tt1".into(),
            title: "Sample".into(),
            year: "2001".into(),
            poster: None,
            directors: vec![Person {
                id: "d1".into(),
                name: "Jane Doe".into(),
            }],
            actors: vec![
                Person {
                    id: "a1".into(),
                    name: "John Roe".into(),
                },
                Person {
                    id: "a2".into(),
                    name: "Ann Poe".into(),
                },
            ],
            genres: vec!["Drama".into(), "Crime".into()],
            akas: vec![LocalizedTitle {
                country: "Italy".into(),
                title: "Esempio".into(),
            }],
        }
    }

    #[test]
    fn test_destinations_order_and_count() {
        let placement = Placement::new(CollectionLayout::new("/c"), "(original title)");
        let dirs = placement.destinations(&movie());

        let categories: Vec<Category> = dirs.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            categories,
            vec![
                Category::Name,
                Category::Year,
                Category::Director,
                Category::Actor,
                Category::Actor,
                Category::Genre,
                Category::Genre,
            ]
        );
        assert_eq!(dirs[0].1, PathBuf::from("/c/By Name/s"));
        assert_eq!(dirs[1].1, PathBuf::from("/c/By Year/2001"));
        assert_eq!(dirs[2].1, PathBuf::from("/c/By Director/Jane Doe"));
        assert_eq!(dirs[6].1, PathBuf::from("/c/By Genre/Crime"));
    }

    #[test]
    fn test_file_name_uses_localized_title_and_extension() {
        let placement = Placement::new(CollectionLayout::new("/c"), "italy");
        assert_eq!(
            placement.file_name(Path::new("/in/movie.mkv"), &movie()),
            "Esempio.mkv"
        );
        assert_eq!(placement.file_name(Path::new("/in/movie"), &movie()), "Esempio");

        let dirs = placement.destinations(&movie());
        assert_eq!(dirs[0].1, PathBuf::from("/c/By Name/e"));
    }

    #[test]
    fn test_names_cannot_escape_category() {
        let mut m = movie();
        m.title = "AC/DC".into();
        m.directors[0].name = "../etc".into();

        let placement = Placement::new(CollectionLayout::new("/c"), "(original title)");
        let dirs = placement.destinations(&m);
        for (category, dir) in &dirs {
            assert_eq!(dir.parent().unwrap(), placement.layout.dir(*category));
        }
        assert!(!placement.file_name(Path::new("a.avi"), &m).contains('/'));
    }

    #[cfg(unix)]
    #[test]
    fn test_punctuation_in_titles_is_kept() {
        let mut m = movie();
        m.title = "Alien: Resurrection?".into();
        m.genres = vec!["Sci-Fi | Horror".into()];

        let placement = Placement::new(CollectionLayout::new("/c"), "(original title)");
        assert_eq!(
            placement.file_name(Path::new("/in/a.mkv"), &m),
            "Alien: Resurrection?.mkv"
        );
        let dirs = placement.destinations(&m);
        assert_eq!(dirs[0].1, PathBuf::from("/c/By Name/a"));
        assert_eq!(dirs[5].1, PathBuf::from("/c/By Genre/Sci-Fi | Horror"));
    }

    #[test]
    fn test_dot_names_become_placeholder() {
        assert_eq!(component(".."), "_");
        assert_eq!(component("."), "_");
        assert_eq!(component("  "), "_");
        assert_eq!(component(".hack"), ".hack");
    }

    #[tokio::test]
    async fn test_stage_moves_into_root() {
        let tmp = tempfile::tempdir().unwrap();
        let incoming = tmp.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let source = incoming.join("movie.mkv");
        std::fs::write(&source, b"frames").unwrap();

        let layout = CollectionLayout::new(tmp.path().join("root"));
        layout.ensure().await.unwrap();
        let placement = Placement::new(layout.clone(), "(original title)");

        let staged = placement.stage(&source).await.unwrap();
        assert_eq!(staged, layout.root().join("movie.mkv"));
        assert!(!source.exists());
        assert_eq!(std::fs::read(&staged).unwrap(), b"frames");

        // 已在根目录的文件不再移动
        assert_eq!(placement.stage(&staged).await.unwrap(), staged);
    }
}
