use crate::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CATALOG_FILE: &str = ".movies.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Actor,
    Director,
    Name,
    Genre,
    Year,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Actor,
        Category::Director,
        Category::Name,
        Category::Genre,
        Category::Year,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Actor => "By Actor",
            Category::Director => "By Director",
            Category::Name => "By Name",
            Category::Genre => "By Genre",
            Category::Year => "By Year",
        }
    }
}

/// The collection root and its fixed category directories.
#[derive(Debug, Clone)]
pub struct CollectionLayout {
    root: PathBuf,
}

impl CollectionLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root and every category directory that is missing.
    /// Returns the category directories in `Category::ALL` order.
    pub async fn ensure(&self) -> Result<Vec<PathBuf>, AppError> {
        fs::create_dir_all(&self.root).await?;

        let mut created = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let dir = self.dir(category);
            if !dir.is_dir() {
                tracing::info!(dir = %dir.display(), "Creating category directory");
                fs::create_dir_all(&dir).await?;
            }
            created.push(dir);
        }
        Ok(created)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }
}
