use chrono::{DateTime, Utc};

/// One ranked entry of a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntity {
    pub entity_id: i64,
    pub name: String,
    pub score: f64,
}

/// A cached query result: the literal query text, the access timestamp
/// used for eviction, and the ranked entity list.
#[derive(Debug, Clone)]
pub struct Searchresult {
    pub query: String,
    pub last_access_date: DateTime<Utc>,
    pub results: Vec<ScoredEntity>,
}

impl Searchresult {
    pub fn new(query: impl Into<String>, results: Vec<ScoredEntity>) -> Self {
        Self {
            query: query.into(),
            last_access_date: Utc::now(),
            results,
        }
    }

    /// Bump the access timestamp to now.
    pub fn touch(&mut self) {
        self.last_access_date = Utc::now();
    }
}
