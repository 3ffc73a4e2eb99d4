pub mod batch;
pub mod config;
pub mod export;
pub mod load;
pub mod store;
pub mod table;

pub use config::LoaderConfig;
pub use load::{load, LoadError, LoadErrorKind, Loader};
pub use store::TableStore;
pub use table::{NormalizedTable, Record};
