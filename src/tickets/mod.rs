// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support tickets: private channels between a member and the guild's staff.
//!
//! A ticket is just a channel. The channel topic starts with the ID of the member who opened it, which is how we find a
//! member's open ticket again and who to take access away from when it's closed.

pub mod channels;

use crate::database::{DbPool, StoreError};
use crate::model::{TicketSettings, database_id_from_discord_id};
use crate::schema::ticket_settings;
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

pub const OPENED_CATEGORY_NAME: &str = "Opened Tickets";
pub const CLOSED_CATEGORY_NAME: &str = "Closed Tickets";
pub const LOG_CHANNEL_NAME: &str = "transcripts";

const TOPIC_WARNING: &str = "DO NOT CHANGE THE TOPIC OF THIS CHANNEL!";
const MAX_CHANNEL_NAME_LENGTH: usize = 100;
const CHANNEL_NAME_SUFFIX: &str = "-ticket";

impl TicketSettings {
	pub fn new(
		guild: Id<GuildMarker>,
		admin_role: Id<RoleMarker>,
		opened_tickets_category: Id<ChannelMarker>,
		closed_tickets_category: Id<ChannelMarker>,
		log_channel: Id<ChannelMarker>,
	) -> Self {
		Self {
			guild_id: database_id_from_discord_id(guild.get()),
			admin_role: database_id_from_discord_id(admin_role.get()),
			opened_tickets_category: database_id_from_discord_id(opened_tickets_category.get()),
			closed_tickets_category: database_id_from_discord_id(closed_tickets_category.get()),
			log_channel: database_id_from_discord_id(log_channel.get()),
		}
	}
}

pub fn get_settings(db_connection_pool: &DbPool, guild: Id<GuildMarker>) -> Result<Option<TicketSettings>, StoreError> {
	let mut db_connection = db_connection_pool.get()?;
	let db_guild_id = database_id_from_discord_id(guild.get());
	let settings: Option<TicketSettings> = ticket_settings::table
		.find(db_guild_id)
		.first(&mut db_connection)
		.optional()?;
	Ok(settings)
}

/// Stores settings for a guild that has none yet. Returns `false` (and changes nothing) if the guild was already set
/// up.
pub fn save_new_settings(db_connection_pool: &DbPool, settings: &TicketSettings) -> Result<bool, StoreError> {
	let mut db_connection = db_connection_pool.get()?;
	let inserted = diesel::insert_into(ticket_settings::table)
		.values(settings)
		.on_conflict_do_nothing()
		.execute(&mut db_connection)?;
	Ok(inserted > 0)
}

pub fn reset_settings(db_connection_pool: &DbPool, guild: Id<GuildMarker>) -> Result<bool, StoreError> {
	let mut db_connection = db_connection_pool.get()?;
	let db_guild_id = database_id_from_discord_id(guild.get());
	let removed = diesel::delete(ticket_settings::table.find(db_guild_id)).execute(&mut db_connection)?;
	Ok(removed > 0)
}

/// The topic for a new ticket channel opened by `user`
pub fn ticket_topic(user: Id<UserMarker>) -> String {
	format!("{} {}", user, TOPIC_WARNING)
}

/// Who opened the ticket with this channel topic
pub fn ticket_owner(topic: &str) -> Option<Id<UserMarker>> {
	let owner = topic.split_whitespace().next()?;
	owner.parse().ok()
}

/// The channel name for a ticket opened by the user with the given name
pub fn ticket_channel_name(user_name: &str) -> String {
	let mut name: String = user_name
		.trim()
		.to_lowercase()
		.chars()
		.map(|character| if character.is_whitespace() { '-' } else { character })
		.collect();
	if name.is_empty() {
		name.push_str("member");
	}
	let max_base_length = MAX_CHANNEL_NAME_LENGTH - CHANNEL_NAME_SUFFIX.len();
	if name.chars().count() > max_base_length {
		name = name.chars().take(max_base_length).collect();
	}
	name.push_str(CHANNEL_NAME_SUFFIX);
	name
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn topic_names_the_owner() {
		let user = Id::new(123456789012345678);
		let topic = ticket_topic(user);
		assert_eq!(topic, "123456789012345678 DO NOT CHANGE THE TOPIC OF THIS CHANNEL!");
		assert_eq!(ticket_owner(&topic), Some(user));
	}

	#[test]
	fn foreign_topics_have_no_owner() {
		assert_eq!(ticket_owner(""), None);
		assert_eq!(ticket_owner("general chat"), None);
		assert_eq!(ticket_owner("0 zero isn't an ID"), None);
	}

	#[test]
	fn channel_names_are_lowercase_and_bounded() {
		assert_eq!(ticket_channel_name("Sheep Fan"), "sheep-fan-ticket");
		assert_eq!(ticket_channel_name("   "), "member-ticket");
		let long_name = "a".repeat(150);
		let channel_name = ticket_channel_name(&long_name);
		assert_eq!(channel_name.chars().count(), 100);
		assert!(channel_name.ends_with("-ticket"));
	}
}
