pub mod build_info;
pub mod persistence;

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Once,
};

use crate::errors::Result;

const DEFAULT_DIR_NAME: &str = ".cashflow_core";
const HOME_ENV: &str = "CASHFLOW_CORE_HOME";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `RUST_LOG` directives are honoured; the crate itself logs at `info` unless
/// told otherwise.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "cashflow_core=info".parse() {
            filter = filter.add_directive(directive);
        }
        // Another subscriber may already be installed by the host application.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Application data directory, `~/.cashflow_core` unless `CASHFLOW_CORE_HOME`
/// points elsewhere.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
