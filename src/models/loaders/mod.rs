pub mod toml_loader;

pub use toml_loader::{load_criteria_file, parse_criteria, CriteriaFile};
