// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{
    ConfigFile, NodeConfig, ProjectConfig, RawConfigFile, RawNodeSection, RawScriptsSection,
    ScriptsConfig,
};
use crate::distribution::{DistributionResolver, parse_node_version};
use crate::errors::{FrontdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FrontdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let node = validate_node(raw.node)?;
        let scripts = validate_scripts(&raw.scripts)?;
        validate_environment(&raw.environment)?;
        validate_directories(&raw.project.directory, &raw.project.cache_directory)?;

        Ok(ConfigFile {
            node,
            project: ProjectConfig {
                directory: raw.project.directory,
                cache_directory: raw.project.cache_directory,
                fingerprint_storage: raw.project.fingerprint_storage,
            },
            scripts,
            environment: raw.environment,
        })
    }
}

fn validate_node(raw: RawNodeSection) -> Result<NodeConfig> {
    let version = raw.version.as_deref().ok_or_else(|| {
        FrontdagError::ConfigError("[node].version is required".to_string())
    })?;
    let version = parse_node_version(version)?;

    if raw.distribution_provided && raw.distribution_path.is_none() {
        return Err(FrontdagError::ConfigError(
            "[node].distribution_provided requires [node].distribution_path".to_string(),
        ));
    }

    // Surface URL mistakes before anything runs.
    DistributionResolver::new(&raw.distribution_url_root, &raw.distribution_url_path_pattern)?;

    if raw.install_directory.as_os_str().is_empty() {
        return Err(FrontdagError::ConfigError(
            "[node].install_directory must not be empty".to_string(),
        ));
    }

    Ok(NodeConfig {
        version,
        distribution_provided: raw.distribution_provided,
        distribution_path: raw.distribution_path,
        distribution_url_root: raw.distribution_url_root,
        distribution_url_path_pattern: raw.distribution_url_path_pattern,
        install_directory: raw.install_directory,
    })
}

fn validate_scripts(raw: &RawScriptsSection) -> Result<ScriptsConfig> {
    let split = |name: &str, value: &Option<String>| -> Result<Option<Vec<String>>> {
        match value {
            None => Ok(None),
            Some(script) => {
                let args: Vec<String> = script.split_whitespace().map(str::to_string).collect();
                if args.is_empty() {
                    return Err(FrontdagError::ConfigError(format!(
                        "[scripts].{name} must not be empty"
                    )));
                }
                Ok(Some(args))
            }
        }
    };

    Ok(ScriptsConfig {
        install: split("install", &raw.install)?,
        clean: split("clean", &raw.clean)?,
        check: split("check", &raw.check)?,
        assemble: split("assemble", &raw.assemble)?,
        publish: split("publish", &raw.publish)?,
    })
}

fn validate_environment(env: &BTreeMap<String, String>) -> Result<()> {
    for key in env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(FrontdagError::ConfigError(format!(
                "[environment] has invalid variable name '{key}'"
            )));
        }
    }
    Ok(())
}

fn validate_directories(project: &std::path::Path, cache: &std::path::Path) -> Result<()> {
    if project.as_os_str().is_empty() {
        return Err(FrontdagError::ConfigError(
            "[project].directory must not be empty".to_string(),
        ));
    }
    if cache.as_os_str().is_empty() {
        return Err(FrontdagError::ConfigError(
            "[project].cache_directory must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse("[node]\nversion = \"20.11.1\"\n").unwrap();
        assert_eq!(cfg.node.version.to_string(), "20.11.1");
        assert_eq!(cfg.node.install_directory, std::path::PathBuf::from("node"));
        assert_eq!(cfg.project.cache_directory, std::path::PathBuf::from(".frontdag"));
        assert!(cfg.scripts.install.is_none());
    }

    #[test]
    fn default_raw_config_with_only_a_version_is_valid() {
        let mut raw = RawConfigFile::default();
        raw.node.version = Some("20.11.1".to_string());

        let cfg = ConfigFile::try_from(raw).unwrap();

        assert_eq!(cfg.node.distribution_url_root, crate::distribution::DEFAULT_URL_ROOT);
        assert_eq!(
            cfg.node.distribution_url_path_pattern,
            crate::distribution::DEFAULT_URL_PATH_PATTERN
        );
        assert_eq!(cfg.node.install_directory, std::path::PathBuf::from("node"));
    }

    #[test]
    fn scripts_are_split_into_arguments() {
        let cfg = parse(
            "[node]\nversion = \"20.11.1\"\n[scripts]\nassemble = \"run  build --prod\"\n",
        )
        .unwrap();
        assert_eq!(
            cfg.scripts.assemble,
            Some(vec!["run".to_string(), "build".to_string(), "--prod".to_string()])
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            "",
            "[node]\nversion = \"12.0.0\"\n",
            "[node]\nversion = \"20.0.0\"\ndistribution_provided = true\n",
            "[node]\nversion = \"20.0.0\"\ndistribution_url_root = \"::nope\"\n",
            "[node]\nversion = \"20.0.0\"\n[scripts]\nclean = \"   \"\n",
            "[node]\nversion = \"20.0.0\"\n[environment]\n\"A=B\" = \"1\"\n",
        ];
        for case in cases {
            assert!(
                matches!(parse(case), Err(FrontdagError::ConfigError(_))),
                "expected config error for {case:?}"
            );
        }
    }

    #[test]
    fn unknown_keys_are_toml_errors() {
        assert!(matches!(
            parse("[node]\nversion = \"20.0.0\"\nflavour = \"lts\"\n"),
            Err(FrontdagError::TomlError(_))
        ));
    }
}
