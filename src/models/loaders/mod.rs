pub mod toml_loader;

pub use toml_loader::{load_all_scripts, load_script_file, AttemptScript, ScriptedAnswer, ScriptedResponse};
