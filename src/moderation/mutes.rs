// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Muting and unmuting members.
//!
//! Every transition for a guild/user pair happens under that pair's lock, whether it was started by a moderator or by
//! the reconciler. The platform is changed first; the registry and audit trail are only written once it succeeded.

use super::input::{AUTO_UNMUTE_REASON, DurationError, MuteDuration, Reason};
use super::restrictions::{LiftOutcome, PlatformError, Restrictions};
use super::store::{ModActionLog, MuteRegistry, new_mod_action};
use crate::database::StoreError;
use crate::locks::KeyedLocks;
use crate::model::{ModActionKind, MuteRecord};
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use std::fmt;
use std::sync::Arc;
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, UserMarker};

#[derive(Debug, Diagnostic)]
pub enum ModerationError {
	Platform(PlatformError),
	Store(StoreError),
	Duration(DurationError),
}

impl From<PlatformError> for ModerationError {
	fn from(error: PlatformError) -> Self {
		Self::Platform(error)
	}
}

impl From<twilight_http::Error> for ModerationError {
	fn from(error: twilight_http::Error) -> Self {
		Self::Platform(PlatformError::from(error))
	}
}

impl From<StoreError> for ModerationError {
	fn from(error: StoreError) -> Self {
		Self::Store(error)
	}
}

impl From<DurationError> for ModerationError {
	fn from(error: DurationError) -> Self {
		Self::Duration(error)
	}
}

impl std::error::Error for ModerationError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Platform(error) => Some(error),
			Self::Store(error) => Some(error),
			Self::Duration(error) => Some(error),
		}
	}
}

impl fmt::Display for ModerationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Platform(error) => write!(f, "{}", error),
			Self::Store(error) => write!(f, "{}", error),
			Self::Duration(error) => write!(f, "{}", error),
		}
	}
}

#[derive(Debug, Eq, PartialEq)]
pub enum MuteOutcome {
	Muted { unmute_at: Option<DateTime<Utc>> },
	AlreadyMuted,
}

#[derive(Debug, Eq, PartialEq)]
pub enum UnmuteOutcome {
	Unmuted,
	NotMuted,
}

/// What happened to an expired mute
#[derive(Debug, Eq, PartialEq)]
pub enum ExpiryOutcome {
	/// The mute is over and the lift was logged
	Lifted,
	/// The member, guild, or role was already gone; the record was dropped without a log entry
	Cleared,
	/// The record changed since it was read (unmuted, or re-muted for longer) so there was nothing to do
	Skipped,
}

pub struct MuteService<S, P> {
	store: Arc<S>,
	restrictions: P,
	locks: KeyedLocks<(Id<GuildMarker>, Id<UserMarker>)>,
}

impl<S: MuteRegistry + ModActionLog, P: Restrictions> MuteService<S, P> {
	pub fn new(store: Arc<S>, restrictions: P) -> Self {
		Self {
			store,
			restrictions,
			locks: KeyedLocks::new(),
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	#[cfg(test)]
	pub fn restrictions(&self) -> &P {
		&self.restrictions
	}

	/// Mutes a member. A member who already holds the muted role is left alone.
	pub async fn mute(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		moderator: Id<UserMarker>,
		duration: MuteDuration,
		reason: &Reason,
		now: DateTime<Utc>,
	) -> Result<MuteOutcome, ModerationError> {
		let _guard = self.locks.lock(&[(guild, user)]).await;

		if self.restrictions.is_muted(guild, user).await? {
			return Ok(MuteOutcome::AlreadyMuted);
		}
		let unmute_at = duration.expiry(now)?;

		self.restrictions.add_mute(guild, user, reason.as_str()).await?;
		if let Err(error) = self.store.upsert_mute(&MuteRecord::new(guild, user, unmute_at)) {
			// Without a record the mute would never expire, so take the role back off
			if let Err(rollback_error) = self.restrictions.remove_mute(guild, user, reason.as_str()).await {
				tracing::warn!(
					source = ?rollback_error,
					guild = %guild,
					user = %user,
					"couldn't take back a mute that failed to record"
				);
			}
			return Err(error.into());
		}
		self.store
			.append_action(&new_mod_action(guild, Some(user), moderator, ModActionKind::Mute, reason, now))?;
		Ok(MuteOutcome::Muted { unmute_at })
	}

	/// Unmutes a member who either holds the muted role or still has a mute on record.
	pub async fn unmute(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		moderator: Id<UserMarker>,
		reason: &Reason,
		now: DateTime<Utc>,
	) -> Result<UnmuteOutcome, ModerationError> {
		let _guard = self.locks.lock(&[(guild, user)]).await;

		let record = self.store.find_mute(guild, user)?;
		if record.is_none() && !self.restrictions.is_muted(guild, user).await? {
			return Ok(UnmuteOutcome::NotMuted);
		}

		self.restrictions.remove_mute(guild, user, reason.as_str()).await?;
		self.store.remove_mute(guild, user)?;
		self.store
			.append_action(&new_mod_action(guild, Some(user), moderator, ModActionKind::Unmute, reason, now))?;
		Ok(UnmuteOutcome::Unmuted)
	}

	/// Lifts a mute the registry reported as expired, acting as `bot_user`.
	///
	/// The record is read again under the lock, so a mute that was lifted or extended in the meantime is skipped. On
	/// error the record stays in the registry for the next attempt.
	pub async fn expire(
		&self,
		expired: &MuteRecord,
		bot_user: Id<UserMarker>,
		now: DateTime<Utc>,
	) -> Result<ExpiryOutcome, ModerationError> {
		let guild = expired.get_guild();
		let user = expired.get_user();
		let _guard = self.locks.lock(&[(guild, user)]).await;

		let current = self.store.find_mute(guild, user)?;
		if !current.is_some_and(|record| record.is_expired(now)) {
			return Ok(ExpiryOutcome::Skipped);
		}

		// NotHeld covers a retry after the role was taken off but the audit entry didn't make it
		let outcome = match self.restrictions.remove_mute(guild, user, AUTO_UNMUTE_REASON).await? {
			LiftOutcome::Lifted | LiftOutcome::NotHeld => {
				self.store.append_action(&new_mod_action(
					guild,
					Some(user),
					bot_user,
					ModActionKind::AutoUnmute,
					&Reason::automatic_unmute(),
					now,
				))?;
				ExpiryOutcome::Lifted
			}
			LiftOutcome::Gone => ExpiryOutcome::Cleared,
		};
		self.store.remove_mute(guild, user)?;
		Ok(outcome)
	}
}
