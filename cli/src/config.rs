use std::path::PathBuf;

use kyotest_core::Config;

use crate::{cmd::GlobalArgs, util};

pub const APP_NAME: &str = "kyotest";

/// `~/.config/kyotest/kyotest.toml` on Linux.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(Config::FILENAME))
}

/// `--config`, else the nearest kyotest.toml, else the user config, else defaults.
pub fn load_config(args: &GlobalArgs) -> anyhow::Result<Config> {
    let cfg = match &args.config {
        Some(path) => Config::from_toml_file(path.clone())?,
        None => Config::load(util::current_dir(), user_config_file())?,
    };
    if let Some(path) = &cfg.source_config_file {
        log::info!(
            "Loaded config {:?}",
            util::replace_homedir_to_tilde(path.clone())
        );
    }
    Ok(cfg)
}
