mod export_results;
mod import_matches;
mod import_results;
mod ranking;

pub use export_results::cmd_export_results;
pub use import_matches::cmd_import_matches;
pub use import_results::cmd_import_results;
pub use ranking::cmd_ranking;
