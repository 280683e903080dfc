use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use imprint_core::Options;
use serde::{Deserialize, Serialize};

/// Complete configuration that merges CLI args, env vars, the config file,
/// and defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImprintConfig {
    /// Where the project lives and where its config file is.
    pub build: BuildConfig,
    /// The resolved options record handed to imprint-core.
    pub options: Options,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Project root directory
    pub root: String,
    /// Configuration file path
    pub config: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            config: "./imprint.toml".to_string(),
        }
    }
}

impl ImprintConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (IMPRINT_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .get_one::<String>("config")
            .cloned()
            .unwrap_or_else(|| "./imprint.toml".to_string());

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::with_name(&config_file.replace(".toml", "")));
        }

        // 3. Add environment variables with IMPRINT_ prefix
        builder = builder.add_source(
            Environment::with_prefix("IMPRINT")
                .prefix_separator("_")
                .separator("__"), // Use double underscore for nested keys
        );

        // 4. Override with CLI arguments (highest priority)
        let mut cli_overrides = HashMap::new();

        if let Some(root) = args.get_one::<String>("root") {
            cli_overrides.insert("build.root".to_string(), root.clone());
        }
        if let Some(dest) = args.get_one::<String>("dest") {
            cli_overrides.insert("options.dest".to_string(), dest.clone());
        }
        if let Some(config) = args.get_one::<String>("config") {
            cli_overrides.insert("build.config".to_string(), config.clone());
        }
        if let Some(path) = args.try_get_one::<String>("typecheck-config").unwrap_or(None) {
            cli_overrides.insert("options.typecheck_config".to_string(), path.clone());
        }
        if args.try_get_one::<bool>("overwrite").unwrap_or(None) == Some(&true) {
            cli_overrides.insert("options.overwrite".to_string(), "true".to_string());
        }
        if args.try_get_one::<bool>("minify").unwrap_or(None) == Some(&true) {
            cli_overrides.insert("options.minify".to_string(), "true".to_string());
        }
        if args.try_get_one::<bool>("log").unwrap_or(None) == Some(&true) {
            cli_overrides.insert("options.logging".to_string(), "true".to_string());
        }

        if !cli_overrides.is_empty() {
            builder = builder.add_source(config::Config::try_from(&cli_overrides)?);
        }

        // Build and deserialize
        let config = builder.build()?;
        let mut resolved: ImprintConfig = config.try_deserialize()?;

        // Excluded names accumulate across sources rather than replacing.
        if let Some(names) = args.try_get_many::<String>("exclude").unwrap_or(None) {
            resolved.options.exclude.extend(names.cloned());
        }

        Ok(resolved)
    }
}

/// Load configuration specifically for build commands
pub fn load_build_config(args: &ArgMatches) -> Result<ImprintConfig> {
    ImprintConfig::load(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::build::add_build_args;
    use clap::Command;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = ImprintConfig::default();
        assert_eq!(config.build.root, ".");
        assert_eq!(config.build.config, "./imprint.toml");
        assert_eq!(config.options.dest, PathBuf::from("./build"));
        assert!(!config.options.overwrite);
    }

    #[test]
    fn test_cli_args_override() {
        let app = add_build_args(Command::new("test"));

        let matches = app
            .try_get_matches_from(vec![
                "test",
                "--root",
                "/custom/site",
                "--dest",
                "/custom/out",
                "--overwrite",
            ])
            .unwrap();

        let config = ImprintConfig::load(&matches).unwrap();
        assert_eq!(config.build.root, "/custom/site");
        assert_eq!(config.options.dest, PathBuf::from("/custom/out"));
        assert!(config.options.overwrite);
        // Should still have defaults for non-overridden values
        assert!(!config.options.minify);
    }

    #[test]
    fn test_exclude_accumulates() {
        let app = add_build_args(Command::new("test"));

        let matches = app
            .try_get_matches_from(vec![
                "test",
                "--exclude",
                "draft",
                "--exclude",
                "notes",
            ])
            .unwrap();

        let config = ImprintConfig::load(&matches).unwrap();
        assert!(config.options.exclude.contains("draft"));
        assert!(config.options.exclude.contains("notes"));
    }

    #[test]
    fn test_typecheck_config_flag() {
        let app = add_build_args(Command::new("test"));

        let matches = app
            .try_get_matches_from(vec!["test", "--typecheck-config", "./tsconfig.json"])
            .unwrap();

        let config = ImprintConfig::load(&matches).unwrap();
        assert_eq!(
            config.options.typecheck_config,
            Some(PathBuf::from("./tsconfig.json"))
        );
    }
}
