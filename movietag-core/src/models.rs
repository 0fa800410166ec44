use serde::Serialize;

/// Title preference used when the user does not ask for a specific country.
pub const DEFAULT_COUNTRY: &str = "(original title)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedTitle {
    pub country: String,
    pub title: String,
}

/// A validated search candidate. Lists keep the order the upstream returned them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieRecord {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub directors: Vec<Person>,
    pub actors: Vec<Person>,
    pub genres: Vec<String>,
    pub akas: Vec<LocalizedTitle>,
}

impl MovieRecord {
    /// Localized title for `country` (case-insensitive), falling back to the default title.
    pub fn title_for(&self, country: &str) -> &str {
        self.akas
            .iter()
            .find(|aka| aka.country.to_lowercase() == country.to_lowercase())
            .map(|aka| aka.title.as_str())
            .unwrap_or(&self.title)
    }

    pub fn lead_director(&self) -> Option<&Person> {
        self.directors.first()
    }

    /// One-line summary shown while disambiguating candidates.
    pub fn summary(&self, country: &str) -> String {
        match self.lead_director() {
            Some(director) => format!(
                "{} ({} - {})",
                self.title_for(country),
                director.name,
                self.year
            ),
            None => format!("{} ({})", self.title_for(country), self.year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Actor,
    Director,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Actor => "actor",
            Role::Director => "director",
        }
    }
}

/// A movie row read back from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogedMovie {
    pub id: String,
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub directors: Vec<String>,
}
