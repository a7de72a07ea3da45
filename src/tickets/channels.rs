// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Creating, closing, and finding ticket channels on the platform.

use super::{CLOSED_CATEGORY_NAME, LOG_CHANNEL_NAME, OPENED_CATEGORY_NAME, ticket_channel_name, ticket_owner, ticket_topic};
use crate::model::TicketSettings;
use crate::moderation::restrictions::PlatformError;
use twilight_http::client::Client;
use twilight_model::channel::permission_overwrite::{PermissionOverwrite, PermissionOverwriteType};
use twilight_model::channel::{Channel, ChannelType};
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GenericMarker, GuildMarker, RoleMarker, UserMarker};

fn allow(id: Id<GenericMarker>, kind: PermissionOverwriteType, permissions: Permissions) -> PermissionOverwrite {
	PermissionOverwrite {
		allow: permissions,
		deny: Permissions::empty(),
		id,
		kind,
	}
}

fn hidden_from_everyone(guild: Id<GuildMarker>) -> PermissionOverwrite {
	PermissionOverwrite {
		allow: Permissions::empty(),
		deny: Permissions::VIEW_CHANNEL,
		id: guild.cast(),
		kind: PermissionOverwriteType::Role,
	}
}

fn staff_access(admin_role: Id<RoleMarker>) -> PermissionOverwrite {
	allow(
		admin_role.cast(),
		PermissionOverwriteType::Role,
		Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES,
	)
}

fn member_access(user: Id<UserMarker>) -> PermissionOverwrite {
	allow(
		user.cast(),
		PermissionOverwriteType::Member,
		Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
	)
}

/// The log channel is only visible to the admin role
pub fn log_channel_overwrites(guild: Id<GuildMarker>, admin_role: Id<RoleMarker>) -> Vec<PermissionOverwrite> {
	vec![
		hidden_from_everyone(guild),
		allow(
			admin_role.cast(),
			PermissionOverwriteType::Role,
			Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
		),
	]
}

/// An open ticket is visible to the member who opened it, the admin role, and us
pub fn open_ticket_overwrites(
	guild: Id<GuildMarker>,
	admin_role: Id<RoleMarker>,
	owner: Id<UserMarker>,
	bot_user: Id<UserMarker>,
) -> Vec<PermissionOverwrite> {
	vec![
		hidden_from_everyone(guild),
		staff_access(admin_role),
		member_access(owner),
		member_access(bot_user),
	]
}

/// A closed ticket loses the member who opened it
pub fn closed_ticket_overwrites(
	guild: Id<GuildMarker>,
	admin_role: Id<RoleMarker>,
	bot_user: Id<UserMarker>,
) -> Vec<PermissionOverwrite> {
	vec![
		hidden_from_everyone(guild),
		staff_access(admin_role),
		member_access(bot_user),
	]
}

/// Finds the ticket `user` has open, if any
pub async fn find_open_ticket(
	http_client: &Client,
	settings: &TicketSettings,
	user: Id<UserMarker>,
) -> Result<Option<Id<ChannelMarker>>, PlatformError> {
	let channels = http_client.guild_channels(settings.get_guild()).await?.models().await?;
	let opened_category = settings.get_opened_tickets_category();
	let open_ticket = channels.into_iter().find(|channel| {
		channel.parent_id == Some(opened_category)
			&& channel.topic.as_deref().and_then(ticket_owner) == Some(user)
	});
	Ok(open_ticket.map(|channel| channel.id))
}

/// The result of setting up the ticket channels in a guild
pub struct TicketChannels {
	pub settings: TicketSettings,
	/// Whether a log channel already existed and was taken over
	pub reused_log_channel: bool,
}

/// Creates the ticket categories and sets up the log channel, reusing one with the usual name if the guild has it.
pub async fn set_up_ticket_channels(
	http_client: &Client,
	guild: Id<GuildMarker>,
	admin_role: Id<RoleMarker>,
) -> Result<TicketChannels, PlatformError> {
	let opened_category = http_client
		.create_guild_channel(guild, OPENED_CATEGORY_NAME)
		.kind(ChannelType::GuildCategory)
		.await?
		.model()
		.await?;
	let closed_category = http_client
		.create_guild_channel(guild, CLOSED_CATEGORY_NAME)
		.kind(ChannelType::GuildCategory)
		.await?
		.model()
		.await?;

	let overwrites = log_channel_overwrites(guild, admin_role);
	let channels = http_client.guild_channels(guild).await?.models().await?;
	let existing_log_channel = channels.into_iter().find(|channel| {
		channel.kind == ChannelType::GuildText && channel.name.as_deref() == Some(LOG_CHANNEL_NAME)
	});
	let (log_channel, reused_log_channel) = match existing_log_channel {
		Some(channel) => {
			http_client
				.update_channel(channel.id)
				.permission_overwrites(&overwrites)
				.await?;
			(channel.id, true)
		}
		None => {
			let channel = http_client
				.create_guild_channel(guild, LOG_CHANNEL_NAME)
				.kind(ChannelType::GuildText)
				.permission_overwrites(&overwrites)
				.await?
				.model()
				.await?;
			(channel.id, false)
		}
	};

	let settings = TicketSettings::new(guild, admin_role, opened_category.id, closed_category.id, log_channel);
	Ok(TicketChannels {
		settings,
		reused_log_channel,
	})
}

/// Creates the private channel for a new ticket opened by `owner`
pub async fn create_ticket_channel(
	http_client: &Client,
	settings: &TicketSettings,
	owner: Id<UserMarker>,
	owner_name: &str,
	bot_user: Id<UserMarker>,
) -> Result<Channel, PlatformError> {
	let guild = settings.get_guild();
	let name = ticket_channel_name(owner_name);
	let topic = ticket_topic(owner);
	let overwrites = open_ticket_overwrites(guild, settings.get_admin_role(), owner, bot_user);
	let channel = http_client
		.create_guild_channel(guild, &name)
		.kind(ChannelType::GuildText)
		.parent_id(settings.get_opened_tickets_category())
		.topic(&topic)
		.permission_overwrites(&overwrites)
		.await?
		.model()
		.await?;
	Ok(channel)
}

/// Moves a ticket to the closed category and takes the owner's access away
pub async fn close_ticket_channel(
	http_client: &Client,
	settings: &TicketSettings,
	channel: Id<ChannelMarker>,
	bot_user: Id<UserMarker>,
) -> Result<(), PlatformError> {
	let overwrites = closed_ticket_overwrites(settings.get_guild(), settings.get_admin_role(), bot_user);
	http_client
		.update_channel(channel)
		.parent_id(Some(settings.get_closed_tickets_category()))
		.permission_overwrites(&overwrites)
		.await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	const GUILD: Id<GuildMarker> = Id::new(1000);
	const ADMIN: Id<RoleMarker> = Id::new(2000);
	const OWNER: Id<UserMarker> = Id::new(3000);
	const BOT: Id<UserMarker> = Id::new(4000);

	fn can_view(overwrites: &[PermissionOverwrite], id: u64) -> Option<bool> {
		let overwrite = overwrites.iter().find(|overwrite| overwrite.id.get() == id)?;
		if overwrite.deny.contains(Permissions::VIEW_CHANNEL) {
			return Some(false);
		}
		Some(overwrite.allow.contains(Permissions::VIEW_CHANNEL))
	}

	#[test]
	fn open_tickets_are_private_to_owner_staff_and_bot() {
		let overwrites = open_ticket_overwrites(GUILD, ADMIN, OWNER, BOT);
		assert_eq!(can_view(&overwrites, GUILD.get()), Some(false));
		assert_eq!(can_view(&overwrites, ADMIN.get()), Some(true));
		assert_eq!(can_view(&overwrites, OWNER.get()), Some(true));
		assert_eq!(can_view(&overwrites, BOT.get()), Some(true));
	}

	#[test]
	fn closing_removes_the_owner() {
		let overwrites = closed_ticket_overwrites(GUILD, ADMIN, BOT);
		assert_eq!(can_view(&overwrites, OWNER.get()), None);
		assert_eq!(can_view(&overwrites, GUILD.get()), Some(false));
		assert_eq!(can_view(&overwrites, ADMIN.get()), Some(true));
	}

	#[test]
	fn log_channel_is_staff_only() {
		let overwrites = log_channel_overwrites(GUILD, ADMIN);
		assert_eq!(overwrites.len(), 2);
		assert_eq!(can_view(&overwrites, GUILD.get()), Some(false));
		assert_eq!(can_view(&overwrites, ADMIN.get()), Some(true));
		let admin = overwrites.iter().find(|overwrite| overwrite.id.get() == ADMIN.get()).unwrap();
		assert_eq!(admin.kind, PermissionOverwriteType::Role);
	}
}
