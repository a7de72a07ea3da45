// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::mutes::{ExpiryOutcome, MuteService};
use super::restrictions::Restrictions;
use super::store::{ModActionLog, MuteRegistry};
use crate::database::StoreError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// Tallies for a single reconciliation pass
#[derive(Debug, Default, Eq, PartialEq)]
pub struct PassReport {
	/// Mutes whose role was removed and logged
	pub lifted: usize,
	/// Records dropped because there was nothing left to unmute
	pub cleared: usize,
	/// Records that changed under the pass and were left alone
	pub skipped: usize,
	/// Records that hit an error and stay in the registry for the next pass
	pub failed: usize,
}

#[derive(Debug, Eq, PartialEq)]
pub enum PassOutcome {
	Completed(PassReport),
	AlreadyRunning,
}

/// Periodically lifts mutes whose time is up.
pub struct MuteReconciler<S, P> {
	mutes: Arc<MuteService<S, P>>,
	bot_user: Id<UserMarker>,
	pass_running: Mutex<()>,
}

impl<S: MuteRegistry + ModActionLog, P: Restrictions> MuteReconciler<S, P> {
	pub fn new(mutes: Arc<MuteService<S, P>>, bot_user: Id<UserMarker>) -> Self {
		Self {
			mutes,
			bot_user,
			pass_running: Mutex::new(()),
		}
	}

	/// Runs one pass over every mute expired as of `now`.
	///
	/// Only one pass runs at a time; calling this while a pass is in progress returns [PassOutcome::AlreadyRunning]
	/// without looking at the registry. A failure on one record doesn't stop the rest of the pass.
	pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassOutcome, StoreError> {
		let Ok(_pass_guard) = self.pass_running.try_lock() else {
			return Ok(PassOutcome::AlreadyRunning);
		};

		let expired = self.mutes.store().expired_mutes(now)?;
		let mut report = PassReport::default();
		for record in expired.iter() {
			match self.mutes.expire(record, self.bot_user, now).await {
				Ok(ExpiryOutcome::Lifted) => report.lifted += 1,
				Ok(ExpiryOutcome::Cleared) => report.cleared += 1,
				Ok(ExpiryOutcome::Skipped) => report.skipped += 1,
				Err(error) => {
					tracing::warn!(
						source = ?error,
						guild = %record.get_guild(),
						user = %record.get_user(),
						"failed to lift expired mute; will retry next pass"
					);
					report.failed += 1;
				}
			}
		}
		Ok(PassOutcome::Completed(report))
	}

	/// Runs a pass every `period` forever
	pub async fn run(self: Arc<Self>, period: Duration) {
		let mut ticker = interval(period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			match self.run_pass(Utc::now()).await {
				Ok(PassOutcome::Completed(report)) => {
					if report != PassReport::default() {
						tracing::info!(?report, "mute reconciliation pass finished");
					}
				}
				Ok(PassOutcome::AlreadyRunning) => tracing::debug!("previous mute reconciliation pass still running"),
				Err(error) => tracing::error!(source = ?error, "couldn't load expired mutes"),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{ModActionKind, MuteRecord};
	use crate::moderation::testing::{FakeRestrictions, MemoryModerationStore};
	use chrono::TimeZone;
	use twilight_model::id::marker::GuildMarker;

	const GUILD: Id<GuildMarker> = Id::new(10);
	const BOT: Id<UserMarker> = Id::new(1);

	fn now() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).unwrap()
	}

	fn reconciler(
		restrictions: FakeRestrictions,
	) -> (
		Arc<MuteReconciler<MemoryModerationStore, FakeRestrictions>>,
		Arc<MuteService<MemoryModerationStore, FakeRestrictions>>,
	) {
		let mutes = Arc::new(MuteService::new(Arc::new(MemoryModerationStore::default()), restrictions));
		let reconciler = Arc::new(MuteReconciler::new(Arc::clone(&mutes), BOT));
		(reconciler, mutes)
	}

	fn muted_until(
		mutes: &MuteService<MemoryModerationStore, FakeRestrictions>,
		user: Id<UserMarker>,
		unmute_at: Option<DateTime<Utc>>,
	) {
		mutes.restrictions().give_role(GUILD, user);
		mutes.store().upsert_mute(&MuteRecord::new(GUILD, user, unmute_at)).unwrap();
	}

	#[tokio::test]
	async fn only_expired_mutes_are_lifted() {
		let (reconciler, mutes) = reconciler(FakeRestrictions::default());
		let expired_user = Id::new(20);
		let pending_user = Id::new(21);
		muted_until(&mutes, expired_user, Some(now() - chrono::Duration::seconds(1)));
		let pending = Some(now() + chrono::Duration::minutes(5));
		muted_until(&mutes, pending_user, pending);

		let outcome = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(
			outcome,
			PassOutcome::Completed(PassReport {
				lifted: 1,
				..PassReport::default()
			})
		);

		assert_eq!(
			mutes.store().mute_records(),
			vec![MuteRecord::new(GUILD, pending_user, pending)]
		);
		assert!(!mutes.restrictions().holds_role(GUILD, expired_user));
		assert!(mutes.restrictions().holds_role(GUILD, pending_user));

		let actions = mutes.store().actions();
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].action, ModActionKind::AutoUnmute);
		assert_eq!(actions[0].get_user(), Some(expired_user));
		assert_eq!(actions[0].get_moderator(), BOT);
		assert_eq!(actions[0].reason, "Automatic unmute after timed mute expired");
	}

	#[tokio::test]
	async fn indefinite_mutes_are_never_reconciled() {
		let (reconciler, mutes) = reconciler(FakeRestrictions::default());
		let user = Id::new(22);
		muted_until(&mutes, user, None);

		let far_future = now() + chrono::Duration::days(3650);
		let outcome = reconciler.run_pass(far_future).await.unwrap();
		assert_eq!(outcome, PassOutcome::Completed(PassReport::default()));
		assert_eq!(mutes.store().mute_records().len(), 1);
		assert!(mutes.restrictions().holds_role(GUILD, user));
	}

	#[tokio::test]
	async fn departed_members_are_cleared_without_a_log_entry() {
		let (reconciler, mutes) = reconciler(FakeRestrictions::default());
		let user = Id::new(23);
		muted_until(&mutes, user, Some(now()));
		mutes.restrictions().depart(user);

		let outcome = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(
			outcome,
			PassOutcome::Completed(PassReport {
				cleared: 1,
				..PassReport::default()
			})
		);
		assert!(mutes.store().mute_records().is_empty());
		assert!(mutes.store().actions().is_empty());
	}

	#[tokio::test]
	async fn one_failure_does_not_stop_the_pass() {
		let (reconciler, mutes) = reconciler(FakeRestrictions::default());
		let unlucky = Id::new(24);
		let fine = Id::new(25);
		let expiry = Some(now() - chrono::Duration::minutes(1));
		muted_until(&mutes, unlucky, expiry);
		muted_until(&mutes, fine, expiry);
		mutes.store().fail_appends_for(unlucky);

		let outcome = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(
			outcome,
			PassOutcome::Completed(PassReport {
				lifted: 1,
				failed: 1,
				..PassReport::default()
			})
		);
		assert_eq!(
			mutes.store().mute_records(),
			vec![MuteRecord::new(GUILD, unlucky, expiry)]
		);
		assert_eq!(mutes.store().actions().len(), 1);
	}

	#[tokio::test]
	async fn retried_lift_is_still_logged_once() {
		let (reconciler, mutes) = reconciler(FakeRestrictions::default());
		let user = Id::new(27);
		muted_until(&mutes, user, Some(now()));
		mutes.store().fail_appends_for(user);

		let outcome = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(
			outcome,
			PassOutcome::Completed(PassReport {
				failed: 1,
				..PassReport::default()
			})
		);
		assert!(!mutes.restrictions().holds_role(GUILD, user));
		assert_eq!(mutes.store().mute_records().len(), 1);

		// The role came off in the first pass; the retry only has the audit entry and the record left to deal with.
		mutes.store().allow_appends_for(user);
		let outcome = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(
			outcome,
			PassOutcome::Completed(PassReport {
				lifted: 1,
				..PassReport::default()
			})
		);
		assert!(mutes.store().mute_records().is_empty());
		let auto_unmutes = mutes
			.store()
			.actions()
			.iter()
			.filter(|action| action.action == ModActionKind::AutoUnmute && action.get_user() == Some(user))
			.count();
		assert_eq!(auto_unmutes, 1);
	}

	#[tokio::test]
	async fn overlapping_passes_are_rejected() {
		let (restrictions, gate) = FakeRestrictions::gated();
		let (reconciler, mutes) = reconciler(restrictions);
		let user = Id::new(26);
		muted_until(&mutes, user, Some(now()));

		let first_pass = tokio::spawn({
			let reconciler = Arc::clone(&reconciler);
			async move { reconciler.run_pass(now()).await }
		});
		gate.entered.notified().await;

		let second = reconciler.run_pass(now()).await.unwrap();
		assert_eq!(second, PassOutcome::AlreadyRunning);

		gate.permits.add_permits(1);
		let first = first_pass.await.unwrap().unwrap();
		assert_eq!(
			first,
			PassOutcome::Completed(PassReport {
				lifted: 1,
				..PassReport::default()
			})
		);
		assert_eq!(mutes.store().actions().len(), 1);
	}
}
