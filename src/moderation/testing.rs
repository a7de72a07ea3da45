// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory stand-ins for the moderation store and the platform.

use super::restrictions::{LiftOutcome, PlatformError, Restrictions};
use super::store::{ModActionLog, MuteRegistry};
use crate::database::StoreError;
use crate::model::{ModAction, MuteRecord, database_id_from_discord_id};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, Semaphore};
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

#[derive(Default)]
pub struct MemoryModerationStore {
	mutes: Mutex<BTreeMap<(i64, i64), MuteRecord>>,
	actions: Mutex<Vec<ModAction>>,
	failing_appends: Mutex<HashSet<Id<UserMarker>>>,
	fail_mute_writes: AtomicBool,
}

impl MemoryModerationStore {
	/// Makes appending any audit entry about `user` fail
	pub fn fail_appends_for(&self, user: Id<UserMarker>) {
		self.failing_appends
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(user);
	}

	/// Lets audit entries about `user` through again
	pub fn allow_appends_for(&self, user: Id<UserMarker>) {
		self.failing_appends
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&user);
	}

	/// Makes every mute record write fail
	pub fn fail_mute_writes(&self) {
		self.fail_mute_writes.store(true, Ordering::SeqCst);
	}

	pub fn mute_records(&self) -> Vec<MuteRecord> {
		self.mutes
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.values()
			.cloned()
			.collect()
	}

	pub fn actions(&self) -> Vec<ModAction> {
		self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}
}

fn key(guild: Id<GuildMarker>, user: Id<UserMarker>) -> (i64, i64) {
	(
		database_id_from_discord_id(guild.get()),
		database_id_from_discord_id(user.get()),
	)
}

impl MuteRegistry for MemoryModerationStore {
	fn find_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<Option<MuteRecord>, StoreError> {
		let mutes = self.mutes.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(mutes.get(&key(guild, user)).cloned())
	}

	fn upsert_mute(&self, record: &MuteRecord) -> Result<(), StoreError> {
		if self.fail_mute_writes.load(Ordering::SeqCst) {
			return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
		}
		let mut mutes = self.mutes.lock().unwrap_or_else(PoisonError::into_inner);
		mutes.insert((record.guild_id, record.user_id), record.clone());
		Ok(())
	}

	fn remove_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, StoreError> {
		let mut mutes = self.mutes.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(mutes.remove(&key(guild, user)).is_some())
	}

	fn expired_mutes(&self, now: DateTime<Utc>) -> Result<Vec<MuteRecord>, StoreError> {
		let mutes = self.mutes.lock().unwrap_or_else(PoisonError::into_inner);
		Ok(mutes.values().filter(|record| record.is_expired(now)).cloned().collect())
	}
}

impl ModActionLog for MemoryModerationStore {
	fn append_action(&self, action: &ModAction) -> Result<(), StoreError> {
		let failing = self.failing_appends.lock().unwrap_or_else(PoisonError::into_inner);
		if action.get_user().is_some_and(|user| failing.contains(&user)) {
			return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
		}
		self.actions
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(action.clone());
		Ok(())
	}
}

/// Pauses every `remove_mute` call until the test lets it through
pub struct RemovalGate {
	pub entered: Notify,
	pub permits: Semaphore,
}

#[derive(Default)]
pub struct FakeRestrictions {
	muted: Mutex<HashSet<(Id<GuildMarker>, Id<UserMarker>)>>,
	departed: Mutex<HashSet<Id<UserMarker>>>,
	gate: Option<Arc<RemovalGate>>,
}

impl FakeRestrictions {
	pub fn gated() -> (Self, Arc<RemovalGate>) {
		let gate = Arc::new(RemovalGate {
			entered: Notify::new(),
			permits: Semaphore::new(0),
		});
		let restrictions = Self {
			gate: Some(Arc::clone(&gate)),
			..Self::default()
		};
		(restrictions, gate)
	}

	pub fn give_role(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) {
		self.muted
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert((guild, user));
	}

	pub fn holds_role(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> bool {
		self.muted
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(&(guild, user))
	}

	/// The member leaves every guild
	pub fn depart(&self, user: Id<UserMarker>) {
		self.departed
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(user);
		self.muted
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.retain(|(_, muted_user)| *muted_user != user);
	}
}

#[async_trait]
impl Restrictions for FakeRestrictions {
	async fn is_muted(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, PlatformError> {
		Ok(self.holds_role(guild, user))
	}

	async fn add_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, _reason: &str) -> Result<(), PlatformError> {
		self.give_role(guild, user);
		Ok(())
	}

	async fn remove_mute(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		_reason: &str,
	) -> Result<LiftOutcome, PlatformError> {
		if let Some(gate) = self.gate.as_ref() {
			gate.entered.notify_one();
			if let Ok(permit) = gate.permits.acquire().await {
				permit.forget();
			}
		}
		let departed = self
			.departed
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.contains(&user);
		if departed {
			return Ok(LiftOutcome::Gone);
		}
		let removed = self
			.muted
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(&(guild, user));
		if removed {
			Ok(LiftOutcome::Lifted)
		} else {
			Ok(LiftOutcome::NotHeld)
		}
	}
}
