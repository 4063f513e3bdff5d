//! Saving and loading world configurations as RON.

pub mod config_io;

pub use config_io::{
    config_filename, config_path, ensure_configs_dir, list_configs, load_config, save_config,
    ConfigIoError, CONFIGS_DIR,
};
