// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::input::Reason;
use crate::database::{DbPool, StoreError};
use crate::model::{ModAction, ModActionKind, MuteRecord, database_id_from_discord_id};
use crate::schema::{mod_actions, mutes};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

/// The durable set of active mutes
pub trait MuteRegistry: Send + Sync {
	fn find_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<Option<MuteRecord>, StoreError>;
	/// Stores the mute, replacing any existing record for the same guild and user
	fn upsert_mute(&self, record: &MuteRecord) -> Result<(), StoreError>;
	fn remove_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, StoreError>;
	/// Every mute with an expiry at or before `now`. Indefinite mutes are never included.
	fn expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, StoreError>;
}

/// The append-only moderation audit trail
pub trait ModActionLog: Send + Sync {
	fn append_action(&self, action: &ModAction) -> Result<(), StoreError>;
}

/// Builds a new audit trail entry
pub fn new_mod_action(
	guild: Id<GuildMarker>,
	user: Option<Id<UserMarker>>,
	moderator: Id<UserMarker>,
	action: ModActionKind,
	reason: &Reason,
	action_time: DateTime<Utc>,
) -> ModAction {
	ModAction {
		id: cuid2::create_id(),
		guild_id: database_id_from_discord_id(guild.get()),
		user_id: user.map(|user| database_id_from_discord_id(user.get())),
		moderator_id: database_id_from_discord_id(moderator.get()),
		action,
		reason: reason.as_str().to_string(),
		action_time,
	}
}

pub struct PgModerationStore {
	db_connection_pool: DbPool,
}

impl PgModerationStore {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}
}

impl MuteRegistry for PgModerationStore {
	fn find_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<Option<MuteRecord>, StoreError> {
		let mut db_connection = self.db_connection_pool.get()?;
		let db_guild_id = database_id_from_discord_id(guild.get());
		let db_user_id = database_id_from_discord_id(user.get());
		let record: Option<MuteRecord> = mutes::table
			.find((db_guild_id, db_user_id))
			.first(&mut db_connection)
			.optional()?;
		Ok(record)
	}

	fn upsert_mute(&self, record: &MuteRecord) -> Result<(), StoreError> {
		let mut db_connection = self.db_connection_pool.get()?;
		diesel::insert_into(mutes::table)
			.values(record)
			.on_conflict((mutes::guild_id, mutes::user_id))
			.do_update()
			.set(mutes::unmute_at.eq(record.unmute_at))
			.execute(&mut db_connection)?;
		Ok(())
	}

	fn remove_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, StoreError> {
		let mut db_connection = self.db_connection_pool.get()?;
		let db_guild_id = database_id_from_discord_id(guild.get());
		let db_user_id = database_id_from_discord_id(user.get());
		let removed = diesel::delete(mutes::table.find((db_guild_id, db_user_id))).execute(&mut db_connection)?;
		Ok(removed > 0)
	}

	fn expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, StoreError> {
		let mut db_connection = self.db_connection_pool.get()?;
		let records: Vec<MuteRecord> = mutes::table
			.filter(mutes::unmute_at.is_not_null())
			.filter(mutes::unmute_at.le(now))
			.order(mutes::unmute_at)
			.load(&mut db_connection)?;
		Ok(records)
	}
}

impl ModActionLog for PgModerationStore {
	fn append_action(&self, action: &ModAction) -> Result<(), StoreError> {
		let mut db_connection = self.db_connection_pool.get()?;
		diesel::insert_into(mod_actions::table)
			.values(action)
			.execute(&mut db_connection)?;
		Ok(())
	}
}
