mod entity;
mod search_result;
mod searchdomain;
mod settings;

pub use entity::{Attribute, Datapoint, DatapointSpec, Entity, StoredEmbedding};
pub use search_result::{ScoredEntity, Searchresult};
pub use searchdomain::SearchdomainRecord;
pub use settings::{MutationKind, SearchdomainSettings};
