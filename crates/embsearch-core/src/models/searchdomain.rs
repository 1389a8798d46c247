use super::SearchdomainSettings;

/// A persisted searchdomain row: a named, isolated index.
#[derive(Debug, Clone)]
pub struct SearchdomainRecord {
    pub id: i64,
    pub name: String,
    pub settings: SearchdomainSettings,
}
