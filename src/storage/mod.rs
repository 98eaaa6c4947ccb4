pub mod postgres;
pub mod retrying;
pub mod sqlite;
pub mod trait_def;

pub use postgres::PostgresStorage;
pub use retrying::RetryingStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{CollectionPatch, ProfileCollection, Storage, StorageError, StorageResult};
