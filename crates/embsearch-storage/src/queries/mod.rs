//! Query modules, one per table cluster. All parameter binding goes
//! through `params![]`; none of these assemble SQL from caller input.

pub mod datapoint_ops;
pub mod entity_ops;
pub mod hydrate;
pub mod searchdomain_ops;

/// Helper trait to make `query_row` return `Option` on not-found.
pub(crate) trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalRow<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
