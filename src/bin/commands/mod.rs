pub mod census_cmd;
pub mod metadata_cmd;

pub use census_cmd::cmd_census;
pub use metadata_cmd::cmd_metadata;
