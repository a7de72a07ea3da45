// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use miette::bail;
use twilight_model::application::command::Command;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::gateway::payload::incoming::InteractionCreate;

mod catalog;
mod economy;
mod moderation;
mod tickets;

pub fn command_definitions() -> Vec<Command> {
	let mut commands = economy::command_definitions();
	commands.extend(catalog::command_definitions());
	commands.extend(moderation::command_definitions());
	commands.push(tickets::command_definition());
	commands
}

pub async fn route_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	match command_data.name.as_str() {
		"balance" | "work" | "claim" | "rob" | "crime" | "buy" | "shop" | "inventory" => {
			economy::handle_command(interaction, command_data, context).await
		}
		"addjob" | "removejob" | "addrobbery" | "removerobbery" | "additem" | "removeitem" | "addroleincome"
		| "removeroleincome" => catalog::handle_command(interaction, command_data, context).await,
		"purge" | "kick" | "ban" | "unban" | "banlist" | "mute" | "unmute" | "timeout" | "untimeout" => {
			moderation::handle_command(interaction, command_data, context).await
		}
		"tickets" => tickets::handle_command(interaction, command_data, context).await,
		_ => bail!("Unknown command encountered: {}\n{:?}", command_data.name, command_data),
	}
}
