// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, bail, miette};
use std::time::Duration;
use tokio::fs::read_to_string;

const DEFAULT_RECONCILE_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_MUTED_ROLE_NAME: &str = "Muted";
const DEFAULT_CLAIM_COOLDOWN_HOURS: u64 = 24;

#[derive(Debug)]
pub struct ConfigData {
	pub discord: DiscordConfig,
	pub database: DatabaseConfig,
	pub moderation: ModerationConfig,
	pub economy: EconomyConfig,
}

#[derive(Debug)]
pub struct DiscordConfig {
	pub bot_token: String,
}

#[derive(Debug)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: Option<u16>,
	pub username: String,
	pub password: String,
	pub database: String,
}

#[derive(Debug)]
pub struct ModerationConfig {
	/// How often the mute reconciler scans for expired mutes
	pub reconcile_interval: Duration,
	/// The name of the role used to mute members
	pub muted_role_name: String,
}

impl Default for ModerationConfig {
	fn default() -> Self {
		Self {
			reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECONDS),
			muted_role_name: String::from(DEFAULT_MUTED_ROLE_NAME),
		}
	}
}

#[derive(Debug)]
pub struct EconomyConfig {
	/// Minimum time between two role income claims by the same user
	pub claim_cooldown: chrono::Duration,
}

impl Default for EconomyConfig {
	fn default() -> Self {
		Self {
			claim_cooldown: chrono::Duration::hours(DEFAULT_CLAIM_COOLDOWN_HOURS as i64),
		}
	}
}

pub async fn parse_config(config_path: &str) -> miette::Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	parse_config_str(&config_file_contents)
}

pub fn parse_config_str(config_file_contents: &str) -> miette::Result<ConfigData> {
	let document: KdlDocument = config_file_contents.parse()?;

	let discord = section(&document, "discord")?;
	let discord = DiscordConfig {
		bot_token: required_string(discord, "discord", "bot_token")?,
	};

	let database = section(&document, "database")?;
	let port = match database.get_arg("port") {
		Some(value) => {
			let Some(port) = value.as_integer() else {
				bail!("database.port must be an integer");
			};
			let port: u16 = port
				.try_into()
				.map_err(|_| miette!("database.port is out of range: {}", port))?;
			Some(port)
		}
		None => None,
	};
	let database = DatabaseConfig {
		host: required_string(database, "database", "host")?,
		port,
		username: required_string(database, "database", "username")?,
		password: required_string(database, "database", "password")?,
		database: required_string(database, "database", "database")?,
	};

	let mut moderation = ModerationConfig::default();
	if let Some(moderation_section) = optional_section(&document, "moderation") {
		if let Some(seconds) = positive_integer(moderation_section, "moderation", "reconcile_interval_seconds")? {
			moderation.reconcile_interval = Duration::from_secs(seconds);
		}
		if let Some(name) = moderation_section.get_arg("muted_role_name") {
			moderation.muted_role_name = string_value(name, "moderation", "muted_role_name")?;
		}
	}

	let mut economy = EconomyConfig::default();
	if let Some(economy_section) = optional_section(&document, "economy") {
		if let Some(hours) = positive_integer(economy_section, "economy", "claim_cooldown_hours")? {
			economy.claim_cooldown = chrono::Duration::hours(hours as i64);
		}
	}

	Ok(ConfigData {
		discord,
		database,
		moderation,
		economy,
	})
}

fn optional_section<'a>(document: &'a KdlDocument, name: &str) -> Option<&'a KdlDocument> {
	document.get(name).and_then(|node| node.children())
}

fn section<'a>(document: &'a KdlDocument, name: &str) -> miette::Result<&'a KdlDocument> {
	optional_section(document, name).ok_or_else(|| miette!("Missing required config block `{}`", name))
}

fn required_string(section: &KdlDocument, section_name: &str, key: &str) -> miette::Result<String> {
	let Some(value) = section.get_arg(key) else {
		bail!("Missing required config value `{}.{}`", section_name, key);
	};
	string_value(value, section_name, key)
}

fn string_value(value: &KdlValue, section_name: &str, key: &str) -> miette::Result<String> {
	match value.as_string() {
		Some(value) => Ok(value.to_string()),
		None => bail!("Config value `{}.{}` must be a string", section_name, key),
	}
}

fn positive_integer(section: &KdlDocument, section_name: &str, key: &str) -> miette::Result<Option<u64>> {
	let Some(value) = section.get_arg(key) else {
		return Ok(None);
	};
	let Some(value) = value.as_integer() else {
		bail!("Config value `{}.{}` must be an integer", section_name, key);
	};
	if value <= 0 {
		bail!("Config value `{}.{}` must be positive", section_name, key);
	}
	let value: u64 = value
		.try_into()
		.map_err(|_| miette!("Config value `{}.{}` is out of range", section_name, key))?;
	Ok(Some(value))
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
discord {
	bot_token "token"
}
database {
	host "localhost"
	username "bot"
	password "hunter2"
	database "hearthkeeper"
}
"#;

	#[test]
	fn minimal_config_uses_defaults() {
		let config = parse_config_str(MINIMAL).unwrap();
		assert_eq!(config.discord.bot_token, "token");
		assert_eq!(config.database.port, None);
		assert_eq!(config.moderation.reconcile_interval, Duration::from_secs(60));
		assert_eq!(config.moderation.muted_role_name, "Muted");
		assert_eq!(config.economy.claim_cooldown, chrono::Duration::hours(24));
	}

	#[test]
	fn optional_blocks_override_defaults() {
		let config = format!(
			"{}\nmoderation {{\n\treconcile_interval_seconds 15\n\tmuted_role_name \"Silenced\"\n}}\neconomy {{\n\tclaim_cooldown_hours 12\n}}\n",
			MINIMAL
		);
		let config = parse_config_str(&config).unwrap();
		assert_eq!(config.moderation.reconcile_interval, Duration::from_secs(15));
		assert_eq!(config.moderation.muted_role_name, "Silenced");
		assert_eq!(config.economy.claim_cooldown, chrono::Duration::hours(12));
	}

	#[test]
	fn missing_token_is_rejected() {
		let config = MINIMAL.replace("bot_token \"token\"", "");
		assert!(parse_config_str(&config).is_err());
	}

	#[test]
	fn zero_interval_is_rejected() {
		let config = format!("{}\nmoderation {{\n\treconcile_interval_seconds 0\n}}\n", MINIMAL);
		assert!(parse_config_str(&config).is_err());
	}
}
