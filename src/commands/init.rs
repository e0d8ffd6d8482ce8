use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{PromptBudgetError, Result};

/// Options for the `init` command.
pub struct InitOptions {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub force: bool,
}

/// Result of a successful `init` operation.
#[derive(Debug)]
pub struct InitResult {
    pub config_path: PathBuf,
    pub config: Config,
}

/// Run the init command: write a default config file.
pub fn run(options: InitOptions) -> Result<InitResult> {
    if !options.root.is_dir() {
        return Err(PromptBudgetError::config(format!(
            "'{}' is not a directory",
            options.root.display()
        )));
    }

    let config_path = options
        .config_path
        .unwrap_or_else(|| options.root.join(CONFIG_FILE_NAME));

    if config_path.exists() && !options.force {
        return Err(PromptBudgetError::config(format!(
            "config already exists at '{}' (use --force to overwrite)",
            config_path.display()
        )));
    }

    let config = Config::default();
    config.save(&config_path)?;

    Ok(InitResult {
        config_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(InitOptions {
            root: dir.path().to_path_buf(),
            config_path: None,
            force: false,
        })
        .unwrap();

        assert_eq!(result.config_path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(Config::load(&result.config_path).unwrap(), Config::default());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let options = || InitOptions {
            root: dir.path().to_path_buf(),
            config_path: None,
            force: false,
        };
        run(options()).unwrap();
        let err = run(options()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn init_force_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "token_limit = 12\n").unwrap();

        run(InitOptions {
            root: dir.path().to_path_buf(),
            config_path: Some(path.clone()),
            force: true,
        })
        .unwrap();
        assert_eq!(Config::load(&path).unwrap().token_limit, 4096);
    }

    #[test]
    fn init_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(InitOptions {
            root: dir.path().join("missing"),
            config_path: None,
            force: false,
        });
        assert!(result.is_err());
    }
}
