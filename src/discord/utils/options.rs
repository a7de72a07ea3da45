// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed access to slash command options.
//!
//! Discord enforces required options and their types, so a missing required option or a value of the wrong type means
//! our command definitions and handlers disagree. Those cases are handler errors, not user errors.

use miette::bail;
use twilight_model::application::interaction::application_command::{CommandDataOption, CommandOptionValue};
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};

pub struct CommandOptions<'a> {
	command: &'a str,
	options: &'a [CommandDataOption],
}

impl<'a> CommandOptions<'a> {
	pub fn new(command: &'a str, options: &'a [CommandDataOption]) -> Self {
		Self { command, options }
	}

	fn find(&self, name: &str) -> Option<&'a CommandOptionValue> {
		self.options
			.iter()
			.find(|option| option.name == name)
			.map(|option| &option.value)
	}

	pub fn string(&self, name: &str) -> miette::Result<Option<&'a str>> {
		match self.find(name) {
			Some(CommandOptionValue::String(value)) => Ok(Some(value.as_str())),
			Some(other) => bail!("Option {} of {} should be a string; got {:?}", name, self.command, other),
			None => Ok(None),
		}
	}

	pub fn integer(&self, name: &str) -> miette::Result<Option<i64>> {
		match self.find(name) {
			Some(CommandOptionValue::Integer(value)) => Ok(Some(*value)),
			Some(other) => bail!("Option {} of {} should be an integer; got {:?}", name, self.command, other),
			None => Ok(None),
		}
	}

	pub fn number(&self, name: &str) -> miette::Result<Option<f64>> {
		match self.find(name) {
			Some(CommandOptionValue::Number(value)) => Ok(Some(*value)),
			Some(CommandOptionValue::Integer(value)) => Ok(Some(*value as f64)),
			Some(other) => bail!("Option {} of {} should be a number; got {:?}", name, self.command, other),
			None => Ok(None),
		}
	}

	pub fn user(&self, name: &str) -> miette::Result<Option<Id<UserMarker>>> {
		match self.find(name) {
			Some(CommandOptionValue::User(value)) => Ok(Some(*value)),
			Some(other) => bail!("Option {} of {} should be a user; got {:?}", name, self.command, other),
			None => Ok(None),
		}
	}

	pub fn role(&self, name: &str) -> miette::Result<Option<Id<RoleMarker>>> {
		match self.find(name) {
			Some(CommandOptionValue::Role(value)) => Ok(Some(*value)),
			Some(other) => bail!("Option {} of {} should be a role; got {:?}", name, self.command, other),
			None => Ok(None),
		}
	}

	pub fn required_string(&self, name: &str) -> miette::Result<&'a str> {
		match self.string(name)? {
			Some(value) => Ok(value),
			None => bail!("Required option {} missing from {}", name, self.command),
		}
	}

	pub fn required_integer(&self, name: &str) -> miette::Result<i64> {
		match self.integer(name)? {
			Some(value) => Ok(value),
			None => bail!("Required option {} missing from {}", name, self.command),
		}
	}

	pub fn required_number(&self, name: &str) -> miette::Result<f64> {
		match self.number(name)? {
			Some(value) => Ok(value),
			None => bail!("Required option {} missing from {}", name, self.command),
		}
	}

	pub fn required_user(&self, name: &str) -> miette::Result<Id<UserMarker>> {
		match self.user(name)? {
			Some(value) => Ok(value),
			None => bail!("Required option {} missing from {}", name, self.command),
		}
	}

	pub fn required_role(&self, name: &str) -> miette::Result<Id<RoleMarker>> {
		match self.role(name)? {
			Some(value) => Ok(value),
			None => bail!("Required option {} missing from {}", name, self.command),
		}
	}
}
