//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use scp_core::config::{self, ConfigFile};

fn resolve(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| "Failed to parse config file")
}

/// Print one value, addressed as `table.key`
pub fn config_get(config_path: Option<&PathBuf>, key: &str) -> Result<()> {
    let path = resolve(config_path);
    if !path.exists() {
        print_error(&format!("Config file not found: {:?}", path));
        print_info("Run 'rscp config init' to create one");
        return Ok(());
    }

    let table = read_table(&path)?;
    let mut current = &toml::Value::Table(table);
    for part in key.split('.') {
        match current.get(part) {
            Some(value) => current = value,
            None => {
                print_error(&format!("Key not found: {}", key));
                return Ok(());
            }
        }
    }

    match current {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(current)?),
        other => println!("{}", other),
    }
    Ok(())
}

/// Set one value, addressed as `table.key`
///
/// The edited file must still load as a valid configuration.
pub fn config_set(config_path: Option<&PathBuf>, key: &str, value: &str) -> Result<()> {
    let path = resolve(config_path);
    if !path.exists() {
        print_info("Creating default configuration...");
        config_init(config_path, false)?;
    }

    let mut table = read_table(&path)?;
    let (parents, last) = match key.rsplit_once('.') {
        Some((parents, last)) => (parents.split('.').collect::<Vec<_>>(), last),
        None => (Vec::new(), key),
    };
    if last.is_empty() {
        anyhow::bail!("Invalid key: {:?}", key);
    }

    let mut current = &mut table;
    for part in parents {
        current = current
            .entry(part)
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow::anyhow!("Cannot navigate to key: {}", key))?;
    }
    current.insert(last.to_string(), parse_value(value));

    let new_content = toml::to_string_pretty(&table)?;
    toml::from_str::<ConfigFile>(&new_content)
        .with_context(|| format!("Invalid value for {}: {}", key, value))?;
    std::fs::write(&path, new_content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    print_success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn parse_value(value: &str) -> toml::Value {
    // Leading zero marks an octal mode, which is stored as a string
    let octal = value.len() > 1 && value.starts_with('0');
    if let Ok(b) = value.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let (false, Ok(i)) = (octal, value.parse::<i64>()) {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(value.to_string())
    }
}

/// Show the configuration file
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve(config_path);
    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Run 'rscp config init' to create one");
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);
    Ok(())
}

/// Write a configuration file holding the defaults
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve(config_path);
    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    config::save_config(&path, &ConfigFile::default())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));
    Ok(())
}

/// Print where the configuration file is looked up
pub fn config_path(config_path: Option<&PathBuf>) {
    println!("{}", resolve(config_path).display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), toml::Value::Boolean(true));
        assert_eq!(parse_value("2222"), toml::Value::Integer(2222));
        assert_eq!(parse_value("0600"), toml::Value::String("0600".to_string()));
        assert_eq!(
            parse_value("checked"),
            toml::Value::String("checked".to_string())
        );
    }

    #[test]
    fn test_init_then_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        config_init(Some(&path), false).unwrap();
        config_set(Some(&path), "transfer.ack_mode", "checked").unwrap();
        config_set(Some(&path), "connection.port", "2222").unwrap();

        let settings: ConfigFile = config::load_config(&path).unwrap();
        assert_eq!(settings.transfer.ack_mode, config::AckMode::Checked);
        assert_eq!(settings.connection.port, 2222);
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        config_init(Some(&path), false).unwrap();
        assert!(config_set(Some(&path), "transfer.ack_mode", "sometimes").is_err());

        let settings: ConfigFile = config::load_config(&path).unwrap();
        assert_eq!(settings.transfer.ack_mode, config::AckMode::Stream);
    }
}
