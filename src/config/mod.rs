pub mod schema;

pub use schema::{
    default_config_path, AuthConfig, Config, DatabaseConfig, ReportConfig, ScenesConfig,
};
