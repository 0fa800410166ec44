use crate::error::AppError;
use crate::models::{CatalogedMovie, MovieRecord, Person, Role};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;

const SCHEMA: [&str; 5] = [
    "CREATE TABLE movies (
        movieid TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        year TEXT NOT NULL,
        poster TEXT
    )",
    "CREATE TABLE people (
        peopleid TEXT PRIMARY KEY,
        name TEXT NOT NULL
    )",
    "CREATE TABLE people_movies (
        movieid TEXT NOT NULL REFERENCES movies(movieid),
        peopleid TEXT NOT NULL REFERENCES people(peopleid),
        role TEXT NOT NULL
    )",
    "CREATE TABLE genres (
        movieid TEXT NOT NULL REFERENCES movies(movieid),
        genre TEXT NOT NULL
    )",
    "CREATE TABLE locations (
        movieid TEXT NOT NULL REFERENCES movies(movieid),
        path TEXT NOT NULL
    )",
];

/// Handle on the single-file catalog. One per ingest; call [`Catalog::close`] when done.
pub struct Catalog {
    db: SqlitePool,
}

impl Catalog {
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Off)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let catalog = Self { db };
        if catalog.bootstrap().await? {
            tracing::info!(path = %path.display(), "Created catalog schema");
        }
        Ok(catalog)
    }

    /// Creates the schema if the database holds no objects yet.
    async fn bootstrap(&self) -> Result<bool, AppError> {
        let objects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master")
            .fetch_one(&self.db)
            .await?;
        if objects > 0 {
            return Ok(false);
        }

        let mut tx = self.db.begin().await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    /// Starts the unit of work for one ingest.
    pub async fn begin(&self) -> Result<CatalogTx, AppError> {
        Ok(CatalogTx {
            tx: self.db.begin().await?,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Movies whose stored title contains `fragment`, ordered by title.
    pub async fn find_by_title(&self, fragment: &str) -> Result<Vec<CatalogedMovie>, AppError> {
        let escaped = fragment
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let rows = sqlx::query(
            "SELECT movieid, title, year, poster FROM movies
             WHERE title LIKE ? ESCAPE '\\'
             ORDER BY title COLLATE NOCASE",
        )
        .bind(pattern)
        .fetch_all(&self.db)
        .await?;

        let mut movies = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("movieid");
            let directors: Vec<String> = sqlx::query_scalar(
                "SELECT p.name FROM people_movies pm
                 JOIN people p ON p.peopleid = pm.peopleid
                 WHERE pm.movieid = ? AND pm.role = ?
                 ORDER BY pm.rowid",
            )
            .bind(&id)
            .bind(Role::Director.as_str())
            .fetch_all(&self.db)
            .await?;

            movies.push(CatalogedMovie {
                id,
                title: row.get("title"),
                year: row.get("year"),
                poster: row.get("poster"),
                directors,
            });
        }
        Ok(movies)
    }

    /// Releases the handle. Close failures are not reported.
    pub async fn close(self) {
        self.db.close().await;
    }
}

/// Pending writes of one ingest. Dropping it without [`CatalogTx::commit`] rolls back.
pub struct CatalogTx {
    tx: Transaction<'static, Sqlite>,
}

impl CatalogTx {
    pub async fn exists(&mut self, movie_id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(movieid) FROM movies WHERE movieid = ?")
            .bind(movie_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count > 0)
    }

    /// Stores the movie under `title`, the title resolved for the user's country.
    pub async fn insert_movie(&mut self, movie: &MovieRecord, title: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO movies (movieid, title, year, poster) VALUES (?, ?, ?, ?)")
            .bind(&movie.id)
            .bind(title)
            .bind(&movie.year)
            .bind(&movie.poster)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    /// Returns `true` when the person was not known yet.
    pub async fn insert_person_if_absent(&mut self, person: &Person) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO people (peopleid, name) VALUES (?, ?) ON CONFLICT(peopleid) DO NOTHING",
        )
        .bind(&person.id)
        .bind(&person.name)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_credit(
        &mut self,
        movie_id: &str,
        person_id: &str,
        role: Role,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO people_movies (movieid, peopleid, role) VALUES (?, ?, ?)")
            .bind(movie_id)
            .bind(person_id)
            .bind(role.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn insert_genre_tag(&mut self, movie_id: &str, genre: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO genres (movieid, genre) VALUES (?, ?)")
            .bind(movie_id)
            .bind(genre)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    pub async fn insert_location(&mut self, movie_id: &str, path: &Path) -> Result<(), AppError> {
        let query =
            sqlx::query("INSERT INTO locations (movieid, path) VALUES (?, ?)").bind(movie_id);
        // 非 UTF-8 路径按原始字节存为 BLOB
        let query = match path.to_str() {
            Some(text) => query.bind(text.to_string()),
            None => {
                tracing::warn!(path = %path.display(), "Recording non UTF-8 location as raw bytes");
                query.bind(path.as_os_str().as_encoded_bytes().to_vec())
            }
        };
        query.execute(&mut *self.tx).await?;
        Ok(())
    }

    pub async fn commit(self) {
        if let Err(e) = self.tx.commit().await {
            tracing::warn!("Catalog commit failed: {}", e);
        }
    }

    pub async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            tracing::warn!("Catalog rollback failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MovieRecord {
        MovieRecord {
            id: "tt1".into(),
            title: "Sample".into(),
            year: "2001".into(),
            poster: Some("http://img/tt1.jpg".into()),
            directors: vec![Person {
                id: "d1".into(),
                name: "Jane Doe".into(),
            }],
            actors: vec![],
            genres: vec!["Drama".into()],
            akas: vec![],
        }
    }

    async fn count(catalog: &Catalog, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(catalog.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_is_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".movies.db");

        let catalog = Catalog::open(&path).await.unwrap();
        let tables: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
                .fetch_one(catalog.pool())
                .await
                .unwrap();
        assert_eq!(tables, 5);
        catalog.close().await;

        // 第二次打开不能重复建表
        let catalog = Catalog::open(&path).await.unwrap();
        assert_eq!(count(&catalog, "movies").await, 0);
        catalog.close().await;
    }

    #[tokio::test]
    async fn test_commit_persists_and_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&tmp.path().join(".movies.db")).await.unwrap();
        let movie = sample();

        let mut tx = catalog.begin().await.unwrap();
        assert!(!tx.exists("tt1").await.unwrap());
        tx.insert_movie(&movie, "Sample").await.unwrap();
        assert!(tx.insert_person_if_absent(&movie.directors[0]).await.unwrap());
        assert!(!tx.insert_person_if_absent(&movie.directors[0]).await.unwrap());
        tx.insert_credit("tt1", "d1", Role::Director).await.unwrap();
        tx.insert_genre_tag("tt1", "Drama").await.unwrap();
        tx.insert_location("tt1", Path::new("/c/By Year/2001/Sample.mkv"))
            .await
            .unwrap();
        assert!(tx.exists("tt1").await.unwrap());
        tx.commit().await;

        assert_eq!(count(&catalog, "movies").await, 1);
        assert_eq!(count(&catalog, "people").await, 1);
        assert_eq!(count(&catalog, "people_movies").await, 1);
        assert_eq!(count(&catalog, "genres").await, 1);
        assert_eq!(count(&catalog, "locations").await, 1);
        catalog.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_location_is_stored_exactly() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&tmp.path().join(".movies.db")).await.unwrap();
        let raw: &[u8] = b"/c/By Name/c/Caf\xe9.mkv";

        let mut tx = catalog.begin().await.unwrap();
        tx.insert_movie(&sample(), "Sample").await.unwrap();
        tx.insert_location("tt1", Path::new(OsStr::from_bytes(raw)))
            .await
            .unwrap();
        tx.commit().await;

        let row = sqlx::query("SELECT typeof(path) AS kind, path FROM locations")
            .fetch_one(catalog.pool())
            .await
            .unwrap();
        let kind: String = row.get("kind");
        let stored: Vec<u8> = row.get("path");
        assert_eq!(kind, "blob");
        assert_eq!(stored, raw);
        catalog.close().await;
    }

    #[tokio::test]
    async fn test_dropped_tx_rolls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&tmp.path().join(".movies.db")).await.unwrap();

        {
            let mut tx = catalog.begin().await.unwrap();
            tx.insert_movie(&sample(), "Sample").await.unwrap();
        }

        assert_eq!(count(&catalog, "movies").await, 0);
        catalog.close().await;
    }

    #[tokio::test]
    async fn test_credit_requires_known_person() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&tmp.path().join(".movies.db")).await.unwrap();

        let mut tx = catalog.begin().await.unwrap();
        tx.insert_movie(&sample(), "Sample").await.unwrap();
        let result = tx.insert_credit("tt1", "nobody", Role::Actor).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        tx.rollback().await;
        catalog.close().await;
    }

    #[tokio::test]
    async fn test_find_by_title() {
        let tmp = tempfile::tempdir().unwrap();
        let catalog = Catalog::open(&tmp.path().join(".movies.db")).await.unwrap();
        let movie = sample();

        let mut tx = catalog.begin().await.unwrap();
        tx.insert_movie(&movie, "Sample").await.unwrap();
        tx.insert_person_if_absent(&movie.directors[0]).await.unwrap();
        tx.insert_credit("tt1", "d1", Role::Director).await.unwrap();
        tx.commit().await;

        let found = catalog.find_by_title("samp").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "tt1");
        assert_eq!(found[0].directors, vec!["Jane Doe".to_string()]);

        assert!(catalog.find_by_title("100%").await.unwrap().is_empty());
        catalog.close().await;
    }
}
