// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::discord::context::BotContext;
use crate::discord::utils::components::create_ticket_button;
use crate::discord::utils::options::CommandOptions;
use crate::discord::utils::responses::{
	SOMETHING_WENT_WRONG, deferred_response, embed_response, follow_up, respond, text_response,
};
use crate::tickets::channels::set_up_ticket_channels;
use crate::tickets::{CLOSED_CATEGORY_NAME, OPENED_CATEGORY_NAME, get_settings, reset_settings, save_new_settings};
use miette::{IntoDiagnostic, bail};
use twilight_mention::fmt::Mention;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::{CommandData, CommandOptionValue};
use twilight_model::channel::message::Embed;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker};
use twilight_util::builder::command::{CommandBuilder, RoleBuilder, SubCommandBuilder};
use twilight_util::builder::embed::EmbedBuilder;

const SUCCESS_COLOR: u32 = 0x2ECC71;
const NOT_AN_ADMIN: &str = "Only administrators can manage the ticket system.";

pub fn command_definition() -> Command {
	let admin_role = RoleBuilder::new("admin_role", "The role that handles tickets")
		.required(true)
		.build();
	let setup = SubCommandBuilder::new("setup", "Set up the ticket system").option(admin_role);
	let panel = SubCommandBuilder::new("panel", "Post a panel members can open tickets from");
	let reset = SubCommandBuilder::new("reset-settings", "Clear the ticket system settings for this server");
	let help = SubCommandBuilder::new("help", "How to set up the ticket system");
	let open = SubCommandBuilder::new("open", "Open a ticket");

	CommandBuilder::new("tickets", "Ticket management commands", CommandType::ChatInput)
		.contexts([InteractionContextType::Guild])
		.option(setup)
		.option(panel)
		.option(reset)
		.option(help)
		.option(open)
		.build()
}

/// The embed members press the button under to open a ticket
pub fn ticket_panel_embed() -> Embed {
	EmbedBuilder::new()
		.description("Press the button to create a new ticket!")
		.build()
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let Some(guild) = interaction.guild_id else {
		bail!("Tickets command was used outside of a guild");
	};
	let Some(subcommand) = command_data.options.first() else {
		bail!("Tickets command invoked with no subcommand");
	};
	let CommandOptionValue::SubCommand(subcommand_options) = &subcommand.value else {
		bail!("Tickets command has an unexpected option: {:?}", subcommand);
	};

	let is_admin = interaction
		.member
		.as_ref()
		.and_then(|member| member.permissions)
		.is_some_and(|permissions| permissions.contains(Permissions::ADMINISTRATOR));

	match subcommand.name.as_str() {
		"help" => help(interaction, context).await,
		"open" => {
			let response = embed_response(ticket_panel_embed(), vec![create_ticket_button()], true);
			respond(context, interaction, &response).await
		}
		"setup" | "panel" | "reset-settings" if !is_admin => {
			respond(context, interaction, &text_response(NOT_AN_ADMIN, true)).await
		}
		"setup" => {
			let options = CommandOptions::new("tickets setup", subcommand_options);
			let admin_role = options.required_role("admin_role")?;
			setup(interaction, context, guild, admin_role).await
		}
		"panel" => panel(interaction, context).await,
		"reset-settings" => reset(interaction, context, guild).await,
		_ => bail!("Unknown tickets subcommand: {}", subcommand.name),
	}
}

async fn help(interaction: &InteractionCreate, context: &BotContext) -> miette::Result<()> {
	let embed = EmbedBuilder::new()
		.title("Ticket system.")
		.description("Run `/tickets setup [admin-role]` to set up.\nIf you want to reset the settings, use `/tickets reset-settings`.\nTo send the button to create a ticket, use `/tickets panel`.")
		.build();
	respond(context, interaction, &embed_response(embed, Vec::new(), true)).await
}

async fn setup(
	interaction: &InteractionCreate,
	context: &BotContext,
	guild: Id<GuildMarker>,
	admin_role: Id<RoleMarker>,
) -> miette::Result<()> {
	const ALREADY_SET_UP: &str = "Ticket system is already set up for this server. Use `/tickets reset-settings` to reset the configuration if needed.";

	respond(context, interaction, &deferred_response(true)).await?;

	let existing_settings = match get_settings(&context.db_connection_pool, guild) {
		Ok(settings) => settings,
		Err(error) => {
			follow_up(context, interaction, SOMETHING_WENT_WRONG).await?;
			return Err(error.into());
		}
	};
	if existing_settings.is_some() {
		return follow_up(context, interaction, ALREADY_SET_UP).await;
	}

	let ticket_channels = match set_up_ticket_channels(&context.http_client, guild, admin_role).await {
		Ok(ticket_channels) => ticket_channels,
		Err(error) => {
			tracing::warn!(source = ?error, guild = %guild, "couldn't create ticket channels");
			let message = format!("❌ Failed to set up the ticket channels: {}", error);
			return follow_up(context, interaction, &message).await;
		}
	};
	let saved = match save_new_settings(&context.db_connection_pool, &ticket_channels.settings) {
		Ok(saved) => saved,
		Err(error) => {
			follow_up(context, interaction, SOMETHING_WENT_WRONG).await?;
			return Err(error.into());
		}
	};
	if !saved {
		return follow_up(context, interaction, ALREADY_SET_UP).await;
	}

	let log_channel = ticket_channels.settings.get_log_channel();
	let log_channel_line = if ticket_channels.reused_log_channel {
		format!("Found existing channel {}. Updated its permissions.", log_channel.mention())
	} else {
		format!("Using {} for transcripts.", log_channel.mention())
	};
	let embed = EmbedBuilder::new()
		.title("Success.")
		.description(format!(
			"Created categories called \"{}\" and \"{}\"\n{}\nNow you can use `/tickets panel` to send the button to create a ticket.",
			OPENED_CATEGORY_NAME, CLOSED_CATEGORY_NAME, log_channel_line
		))
		.color(SUCCESS_COLOR)
		.build();
	context
		.http_client
		.interaction(context.application_id)
		.create_followup(&interaction.token)
		.embeds(&[embed])
		.await
		.into_diagnostic()?;
	Ok(())
}

async fn panel(interaction: &InteractionCreate, context: &BotContext) -> miette::Result<()> {
	let Some(channel) = interaction.channel.as_ref() else {
		bail!("Ticket panel was requested outside of a channel");
	};
	respond(context, interaction, &text_response("Sending panel...", true)).await?;
	context
		.http_client
		.create_message(channel.id)
		.embeds(&[ticket_panel_embed()])
		.components(&[create_ticket_button()])
		.await
		.into_diagnostic()?;
	Ok(())
}

async fn reset(interaction: &InteractionCreate, context: &BotContext, guild: Id<GuildMarker>) -> miette::Result<()> {
	let content = match reset_settings(&context.db_connection_pool, guild) {
		Ok(true) => "Ticket system settings have been cleared for this server.",
		Ok(false) => "The ticket system isn't set up for this server.",
		Err(error) => {
			respond(context, interaction, &text_response(SOMETHING_WENT_WRONG, true)).await?;
			return Err(error.into());
		}
	};
	respond(context, interaction, &text_response(content, true)).await
}
