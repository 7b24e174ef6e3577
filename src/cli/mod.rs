//! CLI command handling

pub mod check;
pub mod output;
pub mod run;
pub mod send;

pub use check::*;
pub use output::*;
pub use run::*;
pub use send::*;

use std::path::Path;

use anyhow::Result;

use crate::config::NotifyConfig;

/// 加载配置：指定路径或默认位置，再用环境变量补全凭据
pub fn load_config(path: Option<&Path>) -> Result<NotifyConfig> {
    let config = match path {
        Some(path) => NotifyConfig::load(path)?,
        None => NotifyConfig::load_default()?,
    };
    Ok(config.with_env_fallback())
}
