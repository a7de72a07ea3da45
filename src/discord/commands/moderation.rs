// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::StoreError;
use crate::discord::context::BotContext;
use crate::discord::utils::options::CommandOptions;
use crate::discord::utils::responses::{
	SOMETHING_WENT_WRONG, deferred_response, embed_response, follow_up, respond, text_response,
};
use crate::discord::utils::timestamp::{relative_time, timestamp_from_datetime};
use crate::model::ModActionKind;
use crate::moderation::input::{DurationError, DurationUnit, MuteDuration, Reason, timeout_length};
use crate::moderation::mutes::{ModerationError, MuteOutcome, UnmuteOutcome};
use crate::moderation::restrictions::PlatformError;
use crate::moderation::store::{ModActionLog, new_mod_action};
use chrono::{DateTime, Utc};
use miette::bail;
use twilight_http::client::Client;
use twilight_http::request::AuditLogReason;
use twilight_mention::fmt::Mention;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_util::builder::command::{CommandBuilder, IntegerBuilder, StringBuilder, UserBuilder};
use twilight_util::builder::embed::EmbedBuilder;
use twilight_validate::embed::DESCRIPTION_LENGTH;

const BAN_LIST_COLOR: u32 = 0xFF0000;
const MAX_PURGE: i64 = 100;

fn moderation_command(name: &str, description: &str, permissions: Permissions) -> CommandBuilder {
	CommandBuilder::new(name, description, CommandType::ChatInput)
		.contexts([InteractionContextType::Guild])
		.default_member_permissions(permissions)
}

fn member_option(description: &str) -> UserBuilder {
	UserBuilder::new("member", description).required(true)
}

fn reason_option() -> StringBuilder {
	StringBuilder::new("reason", "Why this is being done").required(true)
}

fn unit_option(required: bool) -> StringBuilder {
	StringBuilder::new("unit", "The unit of the duration")
		.choices([("seconds", "s"), ("minutes", "m"), ("hours", "h"), ("days", "d")])
		.required(required)
}

pub fn command_definitions() -> Vec<Command> {
	vec![
		moderation_command("purge", "Delete recent messages in this channel", Permissions::MANAGE_MESSAGES)
			.option(
				IntegerBuilder::new("amount", "How many messages to delete")
					.min_value(1)
					.max_value(MAX_PURGE)
					.required(true),
			)
			.option(reason_option())
			.build(),
		moderation_command("kick", "Kick a member", Permissions::KICK_MEMBERS)
			.option(member_option("The member to kick"))
			.option(reason_option())
			.build(),
		moderation_command("ban", "Ban a member", Permissions::BAN_MEMBERS)
			.option(member_option("The member to ban"))
			.option(reason_option())
			.build(),
		moderation_command("unban", "Unban a user", Permissions::BAN_MEMBERS)
			.option(UserBuilder::new("user", "The user to unban").required(true))
			.option(reason_option())
			.build(),
		moderation_command("banlist", "List banned users", Permissions::BAN_MEMBERS).build(),
		moderation_command("mute", "Mute a member", Permissions::MANAGE_ROLES)
			.option(member_option("The member to mute"))
			.option(reason_option())
			.option(
				IntegerBuilder::new("duration", "How long to mute for; 0 mutes until unmuted")
					.min_value(0)
					.required(false),
			)
			.option(unit_option(false))
			.build(),
		moderation_command("unmute", "Unmute a member", Permissions::MANAGE_ROLES)
			.option(member_option("The member to unmute"))
			.option(reason_option())
			.build(),
		moderation_command("timeout", "Time out a member", Permissions::MODERATE_MEMBERS)
			.option(member_option("The member to time out"))
			.option(
				IntegerBuilder::new("duration", "How long the timeout lasts")
					.min_value(1)
					.required(true),
			)
			.option(unit_option(true))
			.option(reason_option())
			.build(),
		moderation_command("untimeout", "Remove a member's timeout", Permissions::MODERATE_MEMBERS)
			.option(member_option("The member whose timeout to remove"))
			.option(reason_option())
			.build(),
	]
}

enum ModerationRequest {
	Purge { channel: Id<ChannelMarker>, amount: u16 },
	Kick(Id<UserMarker>),
	Ban(Id<UserMarker>),
	Unban(Id<UserMarker>),
	Mute { member: Id<UserMarker>, duration: MuteDuration },
	Unmute(Id<UserMarker>),
	Timeout { member: Id<UserMarker>, amount: i64, unit: DurationUnit },
	Untimeout(Id<UserMarker>),
}

impl ModerationRequest {
	fn kind(&self) -> ModActionKind {
		match self {
			Self::Purge { .. } => ModActionKind::Purge,
			Self::Kick(_) => ModActionKind::Kick,
			Self::Ban(_) => ModActionKind::Ban,
			Self::Unban(_) => ModActionKind::Unban,
			Self::Mute { .. } => ModActionKind::Mute,
			Self::Unmute(_) => ModActionKind::Unmute,
			Self::Timeout { .. } => ModActionKind::Timeout,
			Self::Untimeout(_) => ModActionKind::Untimeout,
		}
	}
}

/// Reads the request out of the command. Input the moderator got wrong comes back as `Err` with the message to show
/// them.
fn read_request(
	interaction: &InteractionCreate,
	command_data: &CommandData,
) -> miette::Result<Result<ModerationRequest, String>> {
	let options = CommandOptions::new(&command_data.name, &command_data.options);
	let request = match command_data.name.as_str() {
		"purge" => {
			let Some(channel) = interaction.channel.as_ref().map(|channel| channel.id) else {
				bail!("Purge command was used outside of a channel");
			};
			let amount = options.required_integer("amount")?.clamp(1, MAX_PURGE);
			ModerationRequest::Purge {
				channel,
				amount: amount as u16,
			}
		}
		"kick" => ModerationRequest::Kick(options.required_user("member")?),
		"ban" => ModerationRequest::Ban(options.required_user("member")?),
		"unban" => ModerationRequest::Unban(options.required_user("user")?),
		"mute" => {
			let amount = options.integer("duration")?.unwrap_or(0);
			let unit = options.string("unit")?.map(DurationUnit::from_suffix).unwrap_or_default();
			match MuteDuration::new(amount, unit) {
				Ok(duration) => ModerationRequest::Mute {
					member: options.required_user("member")?,
					duration,
				},
				Err(error) => return Ok(Err(error.to_string())),
			}
		}
		"unmute" => ModerationRequest::Unmute(options.required_user("member")?),
		"timeout" => {
			let amount = options.required_integer("duration")?;
			let unit = DurationUnit::from_suffix(options.required_string("unit")?);
			if let Err(error) = timeout_length(amount, unit) {
				return Ok(Err(error.to_string()));
			}
			ModerationRequest::Timeout {
				member: options.required_user("member")?,
				amount,
				unit,
			}
		}
		"untimeout" => ModerationRequest::Untimeout(options.required_user("member")?),
		_ => bail!("Unknown moderation command: {}", command_data.name),
	};
	Ok(Ok(request))
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let Some(guild) = interaction.guild_id else {
		bail!("Moderation command {} was used outside of a guild", command_data.name);
	};
	if command_data.name == "banlist" {
		return ban_list(interaction, context, guild).await;
	}
	let Some(moderator) = interaction.author_id() else {
		bail!("Moderation command {} was used without an author", command_data.name);
	};

	let request = match read_request(interaction, command_data)? {
		Ok(request) => request,
		Err(message) => return respond(context, interaction, &text_response(message, true)).await,
	};
	let kind = request.kind();

	let options = CommandOptions::new(&command_data.name, &command_data.options);
	let Some(reason) = Reason::parse(options.required_string("reason")?) else {
		let message = format!("You must provide a valid reason to {}.", kind.verb());
		return respond(context, interaction, &text_response(message, true)).await;
	};

	respond(context, interaction, &deferred_response(false)).await?;

	match carry_out(context, guild, moderator, request, &reason, Utc::now()).await {
		Ok(content) => follow_up(context, interaction, &content).await,
		Err(ModerationError::Store(error)) => {
			follow_up(context, interaction, SOMETHING_WENT_WRONG).await?;
			Err(error.into())
		}
		Err(error) => {
			tracing::warn!(source = ?error, action = %kind, guild = %guild, "moderation action failed");
			follow_up(context, interaction, &format!("❌ Failed to {}: {}", kind.verb(), error)).await
		}
	}
}

fn record(
	context: &BotContext,
	guild: Id<GuildMarker>,
	user: Option<Id<UserMarker>>,
	moderator: Id<UserMarker>,
	kind: ModActionKind,
	reason: &Reason,
	now: DateTime<Utc>,
) -> Result<(), StoreError> {
	context
		.mutes
		.store()
		.append_action(&new_mod_action(guild, user, moderator, kind, reason, now))
}

/// Performs the action on the platform, then records it. Nothing is recorded if the platform refused.
async fn carry_out(
	context: &BotContext,
	guild: Id<GuildMarker>,
	moderator: Id<UserMarker>,
	request: ModerationRequest,
	reason: &Reason,
	now: DateTime<Utc>,
) -> Result<String, ModerationError> {
	let http_client = &context.http_client;
	let kind = request.kind();
	let content = match request {
		ModerationRequest::Purge { channel, amount } => {
			let deleted = purge_messages(http_client, channel, amount, reason).await?;
			record(context, guild, None, moderator, kind, reason, now)?;
			format!("🧹 Deleted {} messages.", deleted)
		}
		ModerationRequest::Kick(member) => {
			http_client
				.remove_guild_member(guild, member)
				.reason(reason.as_str())
				.await?;
			record(context, guild, Some(member), moderator, kind, reason, now)?;
			format!("👢 Kicked {}. Reason: {}", member.mention(), reason)
		}
		ModerationRequest::Ban(member) => {
			http_client.create_ban(guild, member).reason(reason.as_str()).await?;
			record(context, guild, Some(member), moderator, kind, reason, now)?;
			format!("🔨 Banned {}. Reason: {}", member.mention(), reason)
		}
		ModerationRequest::Unban(user) => {
			http_client.delete_ban(guild, user).reason(reason.as_str()).await?;
			record(context, guild, Some(user), moderator, kind, reason, now)?;
			format!("✅ Unbanned {}. Reason: {}", user.mention(), reason)
		}
		ModerationRequest::Mute { member, duration } => {
			match context.mutes.mute(guild, member, moderator, duration, reason, now).await? {
				MuteOutcome::Muted { unmute_at } => {
					let mut content = format!("🔇 Muted {} for {}. Reason: {}", member.mention(), duration, reason);
					if let Some(unmute_at) = unmute_at {
						content.push_str(&format!("\n-# The mute ends {}.", relative_time(unmute_at)));
					}
					content
				}
				MuteOutcome::AlreadyMuted => format!("{} is already muted.", member.mention()),
			}
		}
		ModerationRequest::Unmute(member) => match context.mutes.unmute(guild, member, moderator, reason, now).await? {
			UnmuteOutcome::Unmuted => format!("🔊 Unmuted {}. Reason: {}", member.mention(), reason),
			UnmuteOutcome::NotMuted => format!("{} is not muted.", member.mention()),
		},
		ModerationRequest::Timeout { member, amount, unit } => {
			let length = timeout_length(amount, unit)?;
			let until = now.checked_add_signed(length).ok_or(DurationError::TooLong)?;
			let until = timestamp_from_datetime(until).map_err(|_| DurationError::TooLong)?;
			http_client
				.update_guild_member(guild, member)
				.communication_disabled_until(Some(until))
				.reason(reason.as_str())
				.await?;
			record(context, guild, Some(member), moderator, kind, reason, now)?;
			format!(
				"⏲️ Timed out {} for {}{}. Reason: {}",
				member.mention(),
				amount,
				unit.suffix(),
				reason
			)
		}
		ModerationRequest::Untimeout(member) => {
			http_client
				.update_guild_member(guild, member)
				.communication_disabled_until(None)
				.reason(reason.as_str())
				.await?;
			record(context, guild, Some(member), moderator, kind, reason, now)?;
			format!("⏲️ Timeout removed from {}. Reason: {}", member.mention(), reason)
		}
	};
	Ok(content)
}

/// Deletes the `amount` most recent messages in the channel, returning how many were deleted
async fn purge_messages(
	http_client: &Client,
	channel: Id<ChannelMarker>,
	amount: u16,
	reason: &Reason,
) -> Result<usize, PlatformError> {
	let messages = http_client.channel_messages(channel).limit(amount).await?.models().await?;
	let message_ids: Vec<Id<MessageMarker>> = messages.iter().map(|message| message.id).collect();
	match message_ids.as_slice() {
		[] => (),
		[message_id] => {
			http_client
				.delete_message(channel, *message_id)
				.reason(reason.as_str())
				.await?;
		}
		_ => {
			http_client
				.delete_messages(channel, &message_ids)
				.reason(reason.as_str())
				.await?;
		}
	}
	Ok(message_ids.len())
}

/// Lists banned users one per line, stopping before the text would be longer than `limit`
fn ban_list_description<'a>(bans: impl IntoIterator<Item = (&'a str, Id<UserMarker>)>, limit: usize) -> String {
	let mut description = String::new();
	for (name, id) in bans {
		let line = format!("{} (ID: {})\n", name, id);
		if description.chars().count() + line.chars().count() > limit {
			break;
		}
		description.push_str(&line);
	}
	description
}

async fn ban_list(interaction: &InteractionCreate, context: &BotContext, guild: Id<GuildMarker>) -> miette::Result<()> {
	let bans = match context.http_client.bans(guild).await {
		Ok(response) => response.models().await.map_err(PlatformError::from),
		Err(error) => Err(PlatformError::from(error)),
	};
	let bans = match bans {
		Ok(bans) => bans,
		Err(error) => {
			tracing::warn!(source = ?error, guild = %guild, "couldn't list bans");
			let message = format!("❌ Failed to list bans: {}", error);
			return respond(context, interaction, &text_response(message, true)).await;
		}
	};
	if bans.is_empty() {
		return respond(context, interaction, &text_response("No users are banned.", true)).await;
	}

	let description = ban_list_description(
		bans.iter().map(|ban| (ban.user.name.as_str(), ban.user.id)),
		DESCRIPTION_LENGTH,
	);
	let embed = EmbedBuilder::new()
		.title("Banned Users")
		.color(BAN_LIST_COLOR)
		.description(description)
		.build();
	respond(context, interaction, &embed_response(embed, Vec::new(), true)).await
}
