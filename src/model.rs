// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{
	accounts, crimes, inventory, jobs, last_claims, mod_actions, mutes, role_income, shop_items, ticket_settings,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use std::fmt;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

/// A user's wallet. Exactly one row exists per user once they've been referenced by any economy action.
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = accounts)]
pub struct Account {
	/// The ID of the user owning the account
	pub user_id: i64,
	/// The current balance. This may be negative.
	pub balance: i64,
}

/// A job that can be picked by `/work`
#[derive(Clone, Debug, Insertable, PartialEq, Eq, Queryable)]
#[diesel(table_name = jobs)]
pub struct Job {
	pub name: String,
	pub payout_min: i64,
	pub payout_max: i64,
}

/// A crime scenario that can be picked by `/crime`
#[derive(Clone, Debug, Insertable, PartialEq, Queryable)]
#[diesel(table_name = crimes)]
pub struct Crime {
	pub name: String,
	/// Chance of success on a scale of 0 to 100
	pub success_chance: f64,
	pub reward_min: i64,
	pub reward_max: i64,
}

/// An item that can be bought in the shop. Names are stored case-folded.
#[derive(Clone, Debug, Insertable, PartialEq, Eq, Queryable)]
#[diesel(table_name = shop_items)]
pub struct ShopItem {
	pub name: String,
	pub price: i64,
}

/// A quantity of a shop item owned by a user
#[derive(Clone, Debug, Insertable, PartialEq, Eq, Queryable)]
#[diesel(table_name = inventory)]
pub struct InventoryEntry {
	/// The ID of the user who owns the items
	pub user_id: i64,
	pub item_name: String,
	pub quantity: i64,
}

/// The income paid out to members of a role when they claim
#[derive(Clone, Debug, Insertable, PartialEq, Eq, Queryable)]
#[diesel(table_name = role_income)]
pub struct RoleIncome {
	/// The ID of the role that receives the income.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_role].
	pub role_id: i64,
	pub income_amount: i64,
}

impl RoleIncome {
	pub fn get_role(&self) -> Id<RoleMarker> {
		Id::new(discord_id_from_database_id(self.role_id))
	}
}

#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = last_claims)]
pub struct ClaimRecord {
	pub user_id: i64,
	/// When the user last claimed role income; `None` if they never have
	pub last_claim: Option<DateTime<Utc>>,
}

/// An active mute.
///
/// There's at most one record for each guild/user pair.
#[derive(Clone, Debug, Insertable, PartialEq, Eq, Queryable)]
#[diesel(table_name = mutes)]
pub struct MuteRecord {
	/// The ID of the guild in which the user is muted.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// The ID of the muted user.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_user].
	pub user_id: i64,
	/// When the mute should be lifted automatically. Indefinite mutes have no expiry and are only lifted manually.
	pub unmute_at: Option<DateTime<Utc>>,
}

impl MuteRecord {
	pub fn new(guild: Id<GuildMarker>, user: Id<UserMarker>, unmute_at: Option<DateTime<Utc>>) -> Self {
		Self {
			guild_id: database_id_from_discord_id(guild.get()),
			user_id: database_id_from_discord_id(user.get()),
			unmute_at,
		}
	}

	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_user(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.user_id))
	}

	/// Whether the mute should have been lifted by the given time
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		match self.unmute_at {
			Some(unmute_at) => unmute_at <= now,
			None => false,
		}
	}
}

#[derive(Clone, Copy, DbEnum, Debug, Eq, PartialEq)]
#[ExistingTypePath = "crate::schema::sql_types::ModActionKind"]
pub enum ModActionKind {
	Kick,
	Ban,
	Unban,
	Mute,
	Unmute,
	Timeout,
	Untimeout,
	Purge,
	AutoUnmute,
}

impl ModActionKind {
	pub fn verb(&self) -> &'static str {
		match self {
			Self::Kick => "kick",
			Self::Ban => "ban",
			Self::Unban => "unban",
			Self::Mute => "mute",
			Self::Unmute => "unmute",
			Self::Timeout => "timeout",
			Self::Untimeout => "remove timeout",
			Self::Purge => "purge",
			Self::AutoUnmute => "automatically unmute",
		}
	}
}

impl fmt::Display for ModActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Kick => "kick",
			Self::Ban => "ban",
			Self::Unban => "unban",
			Self::Mute => "mute",
			Self::Unmute => "unmute",
			Self::Timeout => "timeout",
			Self::Untimeout => "untimeout",
			Self::Purge => "purge",
			Self::AutoUnmute => "auto_unmute",
		};
		write!(f, "{}", name)
	}
}

/// An entry in the moderation audit trail. Entries are only ever appended.
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = mod_actions)]
pub struct ModAction {
	pub id: String,
	/// The ID of the guild in which the action was taken.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_guild].
	pub guild_id: i64,
	/// The ID of the user the action targeted. Guild-wide actions (like purges) have no target user.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_user].
	pub user_id: Option<i64>,
	/// The ID of the user who took the action.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_moderator].
	pub moderator_id: i64,
	pub action: ModActionKind,
	pub reason: String,
	pub action_time: DateTime<Utc>,
}

impl ModAction {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_user(&self) -> Option<Id<UserMarker>> {
		self.user_id
			.map(|database_id| Id::new(discord_id_from_database_id(database_id)))
	}

	pub fn get_moderator(&self) -> Id<UserMarker> {
		Id::new(discord_id_from_database_id(self.moderator_id))
	}
}

/// The ticket system configuration for a guild
#[derive(Clone, Debug, Insertable, Queryable)]
#[diesel(table_name = ticket_settings)]
pub struct TicketSettings {
	pub guild_id: i64,
	/// The role that can see and manage all tickets.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_admin_role].
	pub admin_role: i64,
	/// The category in which open tickets are created.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_opened_tickets_category].
	pub opened_tickets_category: i64,
	/// The category to which tickets are moved when closed.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_closed_tickets_category].
	pub closed_tickets_category: i64,
	/// The channel to which ticket events and transcripts are posted.
	///
	/// To get a Discord-facing version of this more easily, use [Self::get_log_channel].
	pub log_channel: i64,
}

impl TicketSettings {
	pub fn get_guild(&self) -> Id<GuildMarker> {
		Id::new(discord_id_from_database_id(self.guild_id))
	}

	pub fn get_admin_role(&self) -> Id<RoleMarker> {
		Id::new(discord_id_from_database_id(self.admin_role))
	}

	pub fn get_opened_tickets_category(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.opened_tickets_category))
	}

	pub fn get_closed_tickets_category(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.closed_tickets_category))
	}

	pub fn get_log_channel(&self) -> Id<ChannelMarker> {
		Id::new(discord_id_from_database_id(self.log_channel))
	}
}

/// Converts an ID used with Discord (unsigned) to an ID for Postgres use (signed)
pub fn database_id_from_discord_id(discord_id: u64) -> i64 {
	discord_id as i64
}

/// Converts an ID retrieved from the database (signed) to an ID for use with Discord (unsigned)
pub fn discord_id_from_database_id(database_id: i64) -> u64 {
	database_id as u64
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn ids_survive_the_signed_round_trip() {
		let large_snowflake = u64::MAX - 7;
		let stored = database_id_from_discord_id(large_snowflake);
		assert!(stored < 0);
		assert_eq!(discord_id_from_database_id(stored), large_snowflake);
	}

	#[test]
	fn indefinite_mutes_never_expire() {
		let record = MuteRecord::new(Id::new(1), Id::new(2), None);
		assert!(!record.is_expired(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()));
	}

	#[test]
	fn mute_expires_at_its_deadline() {
		let deadline = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
		let record = MuteRecord::new(Id::new(1), Id::new(2), Some(deadline));
		assert!(!record.is_expired(deadline - chrono::Duration::seconds(1)));
		assert!(record.is_expired(deadline));
	}
}
