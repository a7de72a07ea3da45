// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::ledger::{Ledger, LedgerTransaction};
use crate::database::StoreError;
use crate::locks::KeyedLocks;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;

/// Serializes balance changes.
///
/// Every mutation holds the locks of the accounts it touches for the whole of its unit of work, so two changes to the
/// same account never interleave. Changes to unrelated accounts run side by side.
pub struct BalanceMutator<L> {
	ledger: L,
	locks: KeyedLocks<Id<UserMarker>>,
}

impl<L: Ledger> BalanceMutator<L> {
	pub fn new(ledger: L) -> Self {
		Self {
			ledger,
			locks: KeyedLocks::new(),
		}
	}

	/// Locks the given accounts and runs `work` as a single unit of work.
	///
	/// This is how callers compose several dependent writes (like a cooldown check followed by a credit); use
	/// [apply_within] for the balance changes inside.
	pub async fn with_accounts<T, F>(&self, users: &[Id<UserMarker>], work: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut dyn LedgerTransaction) -> Result<T, StoreError>,
	{
		let _guard = self.locks.lock(users).await;
		self.ledger.unit_of_work(work)
	}

	/// Runs read-only (or catalog) work without taking any account locks
	pub fn unlocked<T, F>(&self, work: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut dyn LedgerTransaction) -> Result<T, StoreError>,
	{
		self.ledger.unit_of_work(work)
	}

	pub fn balance(&self, user: Id<UserMarker>) -> Result<i64, StoreError> {
		self.unlocked(|transaction| transaction.balance(user))
	}

	#[cfg(test)]
	pub fn ledger(&self) -> &L {
		&self.ledger
	}

	/// Atomically adds `delta` to the user's balance in its own unit of work
	pub async fn apply(&self, user: Id<UserMarker>, delta: i64) -> Result<i64, StoreError> {
		self.with_accounts(&[user], |transaction| apply_within(transaction, user, delta))
			.await
	}
}

/// Adds `delta` to the user's balance as part of a unit of work the caller already holds
pub fn apply_within(
	transaction: &mut dyn LedgerTransaction,
	user: Id<UserMarker>,
	delta: i64,
) -> Result<i64, StoreError> {
	transaction.add_balance(user, delta)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::economy::testing::MemoryLedger;
	use std::sync::Arc;
	use std::time::Duration;

	#[tokio::test]
	async fn balances_may_go_negative() {
		let mutator = BalanceMutator::new(MemoryLedger::default());
		let user = Id::new(1);
		assert_eq!(mutator.balance(user).unwrap(), 0);
		assert_eq!(mutator.apply(user, 50).await.unwrap(), 50);
		assert_eq!(mutator.apply(user, -70).await.unwrap(), -20);
		assert_eq!(mutator.balance(user).unwrap(), -20);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_deltas_all_land() {
		let ledger = MemoryLedger::default().with_commit_delay(Duration::from_millis(1));
		let mutator = Arc::new(BalanceMutator::new(ledger));
		let alice = Id::new(10);
		let bob = Id::new(11);

		let mut tasks = Vec::new();
		for round in 0..50i64 {
			for (user, delta) in [(alice, round), (bob, -round), (alice, -3)] {
				let mutator = Arc::clone(&mutator);
				tasks.push(tokio::spawn(async move { mutator.apply(user, delta).await }));
			}
		}
		for task in tasks {
			task.await.unwrap().unwrap();
		}

		let rounds_total: i64 = (0..50).sum();
		assert_eq!(mutator.balance(alice).unwrap(), rounds_total - 150);
		assert_eq!(mutator.balance(bob).unwrap(), -rounds_total);
	}

	#[tokio::test]
	async fn failed_work_leaves_no_trace() {
		let mutator = BalanceMutator::new(MemoryLedger::default());
		let user = Id::new(5);
		mutator.apply(user, 40).await.unwrap();

		let result: Result<(), StoreError> = mutator
			.with_accounts(&[user], |transaction| {
				apply_within(transaction, user, -40)?;
				Err(StoreError::Query(diesel::result::Error::RollbackTransaction))
			})
			.await;
		assert!(result.is_err());
		assert_eq!(mutator.balance(user).unwrap(), 40);
	}
}
