pub mod config;
pub mod error;
pub mod table;

pub use config::{
    load_dotenv, AthenaSettings, AwsConfig, Credentials, ExtractConfig, PathsConfig,
    SchedulerConfig, TableNames,
};
pub use error::ConfigError;
pub use table::SourceTable;
