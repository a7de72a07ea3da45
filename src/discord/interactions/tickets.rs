// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::discord::context::BotContext;
use crate::discord::utils::components::{close_ticket_button, delete_ticket_button};
use crate::discord::utils::responses::{SOMETHING_WENT_WRONG, deferred_response, follow_up, respond, text_response};
use crate::discord::utils::transcript::{fetch_transcript_lines, render_transcript, transcript_file_name};
use crate::discord::utils::users::{UserData, interaction_user_data};
use crate::model::TicketSettings;
use crate::tickets::channels::{close_ticket_channel, create_ticket_channel, find_open_ticket};
use crate::tickets::get_settings;
use miette::{IntoDiagnostic, bail};
use tokio::time::{Duration, sleep};
use twilight_mention::fmt::Mention;
use twilight_model::channel::Channel;
use twilight_model::channel::message::AllowedMentions;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::attachment::Attachment;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_util::builder::embed::EmbedBuilder;

const NOT_CONFIGURED: &str = "Ticket system is not configured for this server. Run `/tickets setup`";
const TICKET_COLOR: u32 = 0x5865F2;
/// How long members get to read "closing"/"deleting" notices before it happens
const NOTICE_DELAY: Duration = Duration::from_secs(3);

pub async fn route_ticket_interaction(
	interaction: &InteractionCreate,
	custom_id_path: &[&str],
	context: &BotContext,
) -> miette::Result<()> {
	let Some(guild) = interaction.guild_id else {
		bail!("Ticket button was used outside of a guild");
	};
	let Some(user) = interaction.author_id() else {
		bail!("Ticket button was used without an author");
	};

	let settings = match get_settings(&context.db_connection_pool, guild) {
		Ok(Some(settings)) => settings,
		Ok(None) => return respond(context, interaction, &text_response(NOT_CONFIGURED, true)).await,
		Err(error) => {
			respond(context, interaction, &text_response(SOMETHING_WENT_WRONG, true)).await?;
			return Err(error.into());
		}
	};

	match custom_id_path.get(1).copied() {
		Some("create") => create_ticket(interaction, context, &settings, user).await,
		Some("close") => close_ticket(interaction, context, &settings, user).await,
		Some("delete") => delete_ticket(interaction, context, &settings, user).await,
		_ => bail!("Invalid custom ID for ticket interaction (parts: {:?})", custom_id_path),
	}
}

/// Posts a line to the guild's ticket log channel. The log is best-effort.
async fn log_ticket_event(context: &BotContext, log_channel: Id<ChannelMarker>, content: &str) {
	let log_result = context
		.http_client
		.create_message(log_channel)
		.content(content)
		.allowed_mentions(Some(&AllowedMentions::default()))
		.await;
	if let Err(error) = log_result {
		tracing::warn!(source = ?error, channel = %log_channel, "couldn't write to the ticket log channel");
	}
}

/// The name a new ticket channel is built from. Falls back to the user id when the interaction carries no username.
fn ticket_owner_name(user_data: Option<UserData>, user: Id<UserMarker>) -> String {
	user_data
		.map(|user_data| user_data.username)
		.filter(|username| !username.trim().is_empty())
		.unwrap_or_else(|| user.to_string())
}

async fn create_ticket(
	interaction: &InteractionCreate,
	context: &BotContext,
	settings: &TicketSettings,
	user: Id<UserMarker>,
) -> miette::Result<()> {
	respond(context, interaction, &deferred_response(true)).await?;

	let _ticket_guard = context.ticket_locks.lock(&[(settings.get_guild(), user)]).await;

	let existing_ticket = match find_open_ticket(&context.http_client, settings, user).await {
		Ok(existing_ticket) => existing_ticket,
		Err(error) => {
			tracing::warn!(source = ?error, user = %user, "couldn't look for an open ticket");
			return follow_up(context, interaction, &format!("❌ Failed to create a ticket: {}", error)).await;
		}
	};
	if let Some(channel) = existing_ticket {
		let message = format!("You already have a ticket open in {}", channel.mention());
		return follow_up(context, interaction, &message).await;
	}

	let user_name = ticket_owner_name(interaction_user_data(interaction), user);
	let channel = match create_ticket_channel(&context.http_client, settings, user, &user_name, context.bot_user).await {
		Ok(channel) => channel,
		Err(error) => {
			tracing::warn!(source = ?error, user = %user, "couldn't create a ticket channel");
			return follow_up(context, interaction, &format!("❌ Failed to create a ticket: {}", error)).await;
		}
	};

	let admin_role = settings.get_admin_role();
	let admin_ping = admin_role.mention().to_string();
	let embed = EmbedBuilder::new()
		.title("Ticket Created!")
		.description("A staff member will assist you shortly.")
		.color(TICKET_COLOR)
		.build();
	let allowed_mentions = AllowedMentions {
		roles: vec![admin_role],
		..AllowedMentions::default()
	};
	context
		.http_client
		.create_message(channel.id)
		.content(&admin_ping)
		.embeds(&[embed])
		.components(&[close_ticket_button()])
		.allowed_mentions(Some(&allowed_mentions))
		.await
		.into_diagnostic()?;

	follow_up(
		context,
		interaction,
		&format!("Created your ticket in {}", channel.id.mention()),
	)
	.await?;

	let log_line = format!(
		"Ticket created by {} in {} ({})",
		user.mention(),
		channel.id.mention(),
		channel.name.as_deref().unwrap_or_default()
	);
	log_ticket_event(context, settings.get_log_channel(), &log_line).await;
	Ok(())
}

async fn close_ticket(
	interaction: &InteractionCreate,
	context: &BotContext,
	settings: &TicketSettings,
	user: Id<UserMarker>,
) -> miette::Result<()> {
	let Some(channel) = interaction.channel.as_ref() else {
		bail!("Ticket close button was used outside of a channel");
	};
	if channel.parent_id != Some(settings.get_opened_tickets_category()) {
		return respond(context, interaction, &text_response("This isn't an open ticket.", true)).await;
	}

	respond(context, interaction, &text_response("Closing this ticket in 3 seconds...", false)).await?;
	sleep(NOTICE_DELAY).await;

	if let Err(error) = close_ticket_channel(&context.http_client, settings, channel.id, context.bot_user).await {
		tracing::warn!(source = ?error, channel = %channel.id, "couldn't close ticket");
		return follow_up(context, interaction, &format!("❌ Failed to close the ticket: {}", error)).await;
	}

	let embed = EmbedBuilder::new()
		.description("Ticket Closed!")
		.color(TICKET_COLOR)
		.build();
	context
		.http_client
		.create_message(channel.id)
		.embeds(&[embed])
		.components(&[delete_ticket_button()])
		.await
		.into_diagnostic()?;

	post_transcript(context, settings, channel, user).await;
	Ok(())
}

/// Posts a transcript of the ticket to the log channel as a text file
async fn post_transcript(context: &BotContext, settings: &TicketSettings, channel: &Channel, closed_by: Id<UserMarker>) {
	let channel_name = channel.name.clone().unwrap_or_else(|| channel.id.to_string());
	let lines = match fetch_transcript_lines(&context.http_client, channel.id).await {
		Ok(lines) => lines,
		Err(error) => {
			tracing::warn!(source = ?error, channel = %channel.id, "couldn't read ticket history for its transcript");
			return;
		}
	};
	let transcript = render_transcript(&channel_name, &lines);
	let attachment = Attachment::from_bytes(transcript_file_name(&channel_name), transcript.into_bytes(), 1);
	let content = format!("Ticket **{}** closed by {}.", channel_name, closed_by.mention());

	let post_result = context
		.http_client
		.create_message(settings.get_log_channel())
		.content(&content)
		.attachments(&[attachment])
		.allowed_mentions(Some(&AllowedMentions::default()))
		.await;
	if let Err(error) = post_result {
		tracing::warn!(source = ?error, channel = %channel.id, "couldn't post ticket transcript");
	}
}

async fn delete_ticket(
	interaction: &InteractionCreate,
	context: &BotContext,
	settings: &TicketSettings,
	user: Id<UserMarker>,
) -> miette::Result<()> {
	let Some(channel) = interaction.channel.as_ref() else {
		bail!("Ticket delete button was used outside of a channel");
	};
	if channel.parent_id != Some(settings.get_closed_tickets_category()) {
		return respond(context, interaction, &text_response("Only closed tickets can be deleted.", true)).await;
	}

	respond(context, interaction, &text_response("Deleting the ticket in 3 seconds...", false)).await?;
	sleep(NOTICE_DELAY).await;

	let channel_name = channel.name.clone().unwrap_or_else(|| channel.id.to_string());
	let log_line = format!("Ticket **{}** deleted by {}", channel_name, user.mention());
	log_ticket_event(context, settings.get_log_channel(), &log_line).await;

	context
		.http_client
		.delete_channel(channel.id)
		.await
		.into_diagnostic()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tickets::ticket_channel_name;

	#[test]
	fn tickets_are_named_after_the_username() {
		let user_data = UserData {
			display_name: String::from("Someone Else"),
			username: String::from("someone"),
		};
		let name = ticket_owner_name(Some(user_data), Id::new(42));
		assert_eq!(ticket_channel_name(&name), "someone-ticket");
	}

	#[test]
	fn missing_usernames_fall_back_to_the_user_id() {
		let user = Id::new(123_456_789);
		assert_eq!(ticket_channel_name(&ticket_owner_name(None, user)), "123456789-ticket");

		let blank = UserData {
			display_name: String::new(),
			username: String::from("  "),
		};
		assert_eq!(ticket_owner_name(Some(blank), user), "123456789");
	}
}
