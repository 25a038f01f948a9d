use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::StorageError;

const APP_DIR: &str = "timetable_planner";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
	#[serde(default)]
	pub data_dir: Option<PathBuf>,
	#[serde(default)]
	pub log: Option<String>,
}

/// Reads the config file named on the command line, by `TIMETABLE_CONFIG`, or
/// at the default location. Only an explicitly named file has to exist.
pub fn load_config(cli_path: Option<&Path>) -> Result<AppConfig, StorageError> {
	let explicit = cli_path
		.map(Path::to_path_buf)
		.or_else(|| non_empty_var(&read_var, "TIMETABLE_CONFIG").map(PathBuf::from));

	if let Some(path) = explicit {
		return parse_config(&fs::read_to_string(path)?);
	}

	let Some(path) = default_config_path(&read_var) else {
		return Ok(AppConfig::default());
	};
	match fs::read_to_string(path) {
		Ok(raw) => parse_config(&raw),
		Err(err) if err.kind() == ErrorKind::NotFound => Ok(AppConfig::default()),
		Err(err) => Err(StorageError::Io(err)),
	}
}

pub fn parse_config(raw: &str) -> Result<AppConfig, StorageError> {
	Ok(toml::from_str(raw)?)
}

pub fn resolve_data_dir(cli_dir: Option<PathBuf>, config: &AppConfig) -> PathBuf {
	resolve_data_dir_with(cli_dir, config, &read_var)
}

pub fn log_directives(config: &AppConfig) -> String {
	non_empty_var(&read_var, "TIMETABLE_LOG")
		.and_then(|value| value.into_string().ok())
		.or_else(|| config.log.clone())
		.unwrap_or_else(|| "warn".to_string())
}

fn resolve_data_dir_with(
	cli_dir: Option<PathBuf>,
	config: &AppConfig,
	var: &dyn Fn(&str) -> Option<OsString>,
) -> PathBuf {
	if let Some(path) = cli_dir {
		return absolutize(path);
	}

	if let Some(path) = non_empty_var(var, "TIMETABLE_HOME") {
		return absolutize(PathBuf::from(path));
	}

	if let Some(path) = &config.data_dir {
		return absolutize(path.clone());
	}

	if let Some(path) = non_empty_var(var, "XDG_STATE_HOME") {
		return PathBuf::from(path).join(APP_DIR);
	}

	if let Some(path) = non_empty_var(var, "HOME") {
		return PathBuf::from(path).join(".local").join("state").join(APP_DIR);
	}

	PathBuf::from(format!(".{APP_DIR}"))
}

fn default_config_path(var: &dyn Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
	if let Some(path) = non_empty_var(var, "XDG_CONFIG_HOME") {
		return Some(PathBuf::from(path).join(APP_DIR).join(CONFIG_FILE));
	}

	non_empty_var(var, "HOME").map(|path| PathBuf::from(path).join(".config").join(APP_DIR).join(CONFIG_FILE))
}

fn read_var(name: &str) -> Option<OsString> {
	env::var_os(name)
}

fn non_empty_var(var: &dyn Fn(&str) -> Option<OsString>, name: &str) -> Option<OsString> {
	var(name).filter(|value| !value.is_empty())
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;
	use std::ffi::OsString;
	use std::path::PathBuf;

	use super::{AppConfig, default_config_path, parse_config, resolve_data_dir_with};

	fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
		let map = pairs
			.iter()
			.map(|(key, value)| (key.to_string(), OsString::from(value)))
			.collect::<HashMap<_, _>>();
		move |name: &str| map.get(name).cloned()
	}

	#[test]
	fn data_dir_precedence() {
		let config = AppConfig {
			data_dir: Some(PathBuf::from("/srv/from-config")),
			log: None,
		};
		let all = vars(&[
			("TIMETABLE_HOME", "/srv/from-env"),
			("XDG_STATE_HOME", "/home/u/.state"),
			("HOME", "/home/u"),
		]);

		assert_eq!(
			resolve_data_dir_with(Some(PathBuf::from("/srv/from-flag")), &config, &all),
			PathBuf::from("/srv/from-flag")
		);
		assert_eq!(resolve_data_dir_with(None, &config, &all), PathBuf::from("/srv/from-env"));

		let no_env = vars(&[("XDG_STATE_HOME", "/home/u/.state"), ("HOME", "/home/u")]);
		assert_eq!(resolve_data_dir_with(None, &config, &no_env), PathBuf::from("/srv/from-config"));
		assert_eq!(
			resolve_data_dir_with(None, &AppConfig::default(), &no_env),
			PathBuf::from("/home/u/.state/timetable_planner")
		);

		let home_only = vars(&[("HOME", "/home/u"), ("XDG_STATE_HOME", "")]);
		assert_eq!(
			resolve_data_dir_with(None, &AppConfig::default(), &home_only),
			PathBuf::from("/home/u/.local/state/timetable_planner")
		);
		assert_eq!(
			resolve_data_dir_with(None, &AppConfig::default(), &vars(&[])),
			PathBuf::from(".timetable_planner")
		);
	}

	#[test]
	fn config_file_locations() {
		assert_eq!(
			default_config_path(&vars(&[("XDG_CONFIG_HOME", "/cfg"), ("HOME", "/home/u")])),
			Some(PathBuf::from("/cfg/timetable_planner/config.toml"))
		);
		assert_eq!(
			default_config_path(&vars(&[("HOME", "/home/u")])),
			Some(PathBuf::from("/home/u/.config/timetable_planner/config.toml"))
		);
		assert_eq!(default_config_path(&vars(&[])), None);
	}

	#[test]
	fn parses_partial_config() {
		let config = parse_config("log = \"timetable_planner=debug\"\n").expect("config should parse");
		assert_eq!(config.data_dir, None);
		assert_eq!(config.log.as_deref(), Some("timetable_planner=debug"));
		assert!(parse_config("data_dir = 3").is_err());
	}
}
