use crate::error::AppError;
use crate::models::{LocalizedTitle, MovieRecord, Person};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "http://www.myapifilms.com";
pub const DEFAULT_LIMIT: u32 = 10;

/// How much cast information the upstream should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActorDetail {
    None,
    #[default]
    Simple,
    Full,
}

impl ActorDetail {
    fn code(&self) -> &'static str {
        match self {
            ActorDetail::None => "N",
            ActorDetail::Simple => "S",
            ActorDetail::Full => "F",
        }
    }
}

impl FromStr for ActorDetail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(ActorDetail::None),
            "simple" | "s" => Ok(ActorDetail::Simple),
            "full" | "f" => Ok(ActorDetail::Full),
            other => Err(format!(
                "unknown actor detail '{}', expected none, simple or full",
                other
            )),
        }
    }
}

impl fmt::Display for ActorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorDetail::None => "none",
            ActorDetail::Simple => "simple",
            ActorDetail::Full => "full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub actors: ActorDetail,
    pub limit: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            actors: ActorDetail::Simple,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A source of movie candidates for a free-text title.
#[async_trait]
pub trait MovieSearch: Send + Sync {
    async fn search(
        &self,
        title: &str,
        options: SearchOptions,
    ) -> Result<Vec<MovieRecord>, AppError>;
}

pub struct MetadataClient {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let user_agent = concat!("MovieTAG/", env!("CARGO_PKG_VERSION"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build reqwest client: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl MovieSearch for MetadataClient {
    async fn search(
        &self,
        title: &str,
        options: SearchOptions,
    ) -> Result<Vec<MovieRecord>, AppError> {
        tracing::info!(title = %title, actors = %options.actors, limit = options.limit, "Searching metadata service");

        let limit = options.limit.to_string();
        let resp = self
            .client
            .get(self.search_url())
            .query(&[
                ("format", "JSON"),
                ("aka", "1"),
                ("title", title),
                ("actors", options.actors.code()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(status = %status, "Metadata service returned a bad status");
            return Err(AppError::ServiceUnavailable(status.as_u16()));
        }

        let body = resp.text().await?;
        let candidates = parse_candidates(&body)?;
        tracing::info!(count = candidates.len(), "Received search candidates");
        Ok(candidates)
    }
}

/// Decodes a search response body into validated candidates, in upstream order.
pub fn parse_candidates(body: &str) -> Result<Vec<MovieRecord>, AppError> {
    // 上游会把反斜杠转义两次
    let body = body.replace("\\\\", "\\");

    let value: Value = serde_json::from_str(&body)
        .map_err(|e| AppError::Metadata(format!("Invalid search response: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            tracing::warn!(response = %other, "Metadata service returned no candidate list");
            return Ok(Vec::new());
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let parsed = serde_json::from_value::<WireMovie>(item)
            .map_err(|e| e.to_string())
            .and_then(MovieRecord::try_from);

        match parsed {
            Ok(record) => records.push(record),
            Err(reason) => {
                tracing::warn!(index, reason = %reason, "Skipping malformed search candidate")
            }
        }
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireYear {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct WireDirector {
    #[serde(rename = "nameId")]
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireActor {
    #[serde(rename = "actorId")]
    id: String,
    #[serde(rename = "actorName")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireAka {
    country: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct WireMovie {
    #[serde(rename = "idIMDB")]
    id: Option<String>,
    title: Option<String>,
    year: Option<WireYear>,
    #[serde(rename = "urlPoster")]
    poster: Option<String>,
    #[serde(default)]
    directors: Vec<WireDirector>,
    #[serde(default)]
    actors: Vec<WireActor>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    akas: Vec<WireAka>,
}

fn required(field: &str, value: Option<String>) -> Result<String, String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing field '{}'", field))
}

impl TryFrom<WireMovie> for MovieRecord {
    type Error = String;

    fn try_from(wire: WireMovie) -> Result<Self, Self::Error> {
        let id = required("idIMDB", wire.id)?;
        let title = required("title", wire.title)?;
        let year = required(
            "year",
            wire.year.map(|year| match year {
                WireYear::Text(text) => text,
                WireYear::Number(number) => number.to_string(),
            }),
        )?;

        Ok(MovieRecord {
            id,
            title,
            year,
            poster: wire.poster.filter(|p| !p.is_empty()),
            directors: wire
                .directors
                .into_iter()
                .map(|d| Person {
                    id: d.id,
                    name: d.name,
                })
                .collect(),
            actors: wire
                .actors
                .into_iter()
                .map(|a| Person {
                    id: a.id,
                    name: a.name,
                })
                .collect(),
            genres: wire.genres,
            akas: wire
                .akas
                .into_iter()
                .map(|aka| LocalizedTitle {
                    country: aka.country,
                    title: aka.title,
                })
                .collect(),
        })
    }
}
