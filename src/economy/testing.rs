// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory stand-ins for the economy store and random source.

use super::actions::RandomSource;
use super::ledger::{Ledger, LedgerTransaction};
use crate::database::StoreError;
use crate::model::{Crime, InventoryEntry, Job, RoleIncome, ShopItem, database_id_from_discord_id};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};

#[derive(Clone, Default)]
struct EconomyTables {
	accounts: HashMap<Id<UserMarker>, i64>,
	last_claims: HashMap<Id<UserMarker>, Option<DateTime<Utc>>>,
	jobs: BTreeMap<String, Job>,
	crimes: BTreeMap<String, Crime>,
	shop_items: BTreeMap<String, ShopItem>,
	role_income: BTreeMap<Id<RoleMarker>, i64>,
	inventory: BTreeMap<(Id<UserMarker>, String), i64>,
}

/// A [Ledger] that keeps everything in memory.
///
/// Each unit of work runs against a snapshot of the tables taken without holding the table lock across the work, the
/// way a database without row locks would behave. On success only the rows the work wrote are copied back. Two units
/// touching the same account at once can therefore lose an update unless the caller serializes them.
#[derive(Default)]
pub struct MemoryLedger {
	tables: Mutex<EconomyTables>,
	fail_inventory_writes: AtomicBool,
	commit_delay: Duration,
}

impl MemoryLedger {
	/// Widens the window between a unit of work reading its snapshot and committing it
	pub fn with_commit_delay(mut self, commit_delay: Duration) -> Self {
		self.commit_delay = commit_delay;
		self
	}

	/// Makes every inventory write fail, to simulate the store dying halfway through a purchase
	pub fn fail_inventory_writes(&self) {
		self.fail_inventory_writes.store(true, Ordering::SeqCst);
	}

	/// The raw inventory row, without provisioning anything
	pub fn owned(&self, user: Id<UserMarker>, item_name: &str) -> Option<i64> {
		let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
		tables.inventory.get(&(user, item_name.to_string())).copied()
	}
}

impl Ledger for MemoryLedger {
	fn unit_of_work<T, F>(&self, work: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut dyn LedgerTransaction) -> Result<T, StoreError>,
	{
		let mut scratch = self.tables.lock().unwrap_or_else(PoisonError::into_inner).clone();
		let mut transaction = MemoryTransaction {
			tables: &mut scratch,
			written: WrittenRows::default(),
			fail_inventory_writes: self.fail_inventory_writes.load(Ordering::SeqCst),
		};
		let result = work(&mut transaction)?;
		let written = transaction.written;
		if !self.commit_delay.is_zero() {
			std::thread::sleep(self.commit_delay);
		}

		let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
		written.commit(&scratch, &mut tables);
		Ok(result)
	}
}

/// The rows a unit of work wrote, so a commit only overwrites those
#[derive(Default)]
struct WrittenRows {
	accounts: HashSet<Id<UserMarker>>,
	last_claims: HashSet<Id<UserMarker>>,
	inventory: HashSet<(Id<UserMarker>, String)>,
	catalog: bool,
}

impl WrittenRows {
	fn commit(self, scratch: &EconomyTables, tables: &mut EconomyTables) {
		for (user, balance) in scratch.accounts.iter() {
			if self.accounts.contains(user) {
				tables.accounts.insert(*user, *balance);
			} else {
				tables.accounts.entry(*user).or_insert(*balance);
			}
		}
		for (user, last_claim) in scratch.last_claims.iter() {
			if self.last_claims.contains(user) {
				tables.last_claims.insert(*user, *last_claim);
			} else {
				tables.last_claims.entry(*user).or_insert(*last_claim);
			}
		}
		for key in self.inventory {
			if let Some(quantity) = scratch.inventory.get(&key) {
				tables.inventory.insert(key, *quantity);
			}
		}
		if self.catalog {
			tables.jobs = scratch.jobs.clone();
			tables.crimes = scratch.crimes.clone();
			tables.shop_items = scratch.shop_items.clone();
			tables.role_income = scratch.role_income.clone();
		}
	}
}

struct MemoryTransaction<'a> {
	tables: &'a mut EconomyTables,
	written: WrittenRows,
	fail_inventory_writes: bool,
}

impl LedgerTransaction for MemoryTransaction<'_> {
	fn balance(&mut self, user: Id<UserMarker>) -> Result<i64, StoreError> {
		Ok(*self.tables.accounts.entry(user).or_insert(0))
	}

	fn add_balance(&mut self, user: Id<UserMarker>, delta: i64) -> Result<i64, StoreError> {
		self.written.accounts.insert(user);
		let balance = self.tables.accounts.entry(user).or_insert(0);
		*balance += delta;
		Ok(*balance)
	}

	fn last_claim(&mut self, user: Id<UserMarker>) -> Result<Option<DateTime<Utc>>, StoreError> {
		Ok(*self.tables.last_claims.entry(user).or_insert(None))
	}

	fn set_last_claim(&mut self, user: Id<UserMarker>, claimed_at: DateTime<Utc>) -> Result<(), StoreError> {
		self.written.last_claims.insert(user);
		self.tables.last_claims.insert(user, Some(claimed_at));
		Ok(())
	}

	fn jobs(&mut self) -> Result<Vec<Job>, StoreError> {
		Ok(self.tables.jobs.values().cloned().collect())
	}

	fn upsert_job(&mut self, job: &Job) -> Result<(), StoreError> {
		self.written.catalog = true;
		self.tables.jobs.insert(job.name.clone(), job.clone());
		Ok(())
	}

	fn remove_job(&mut self, name: &str) -> Result<bool, StoreError> {
		self.written.catalog = true;
		Ok(self.tables.jobs.remove(name).is_some())
	}

	fn crimes(&mut self) -> Result<Vec<Crime>, StoreError> {
		Ok(self.tables.crimes.values().cloned().collect())
	}

	fn upsert_crime(&mut self, crime: &Crime) -> Result<(), StoreError> {
		self.written.catalog = true;
		self.tables.crimes.insert(crime.name.clone(), crime.clone());
		Ok(())
	}

	fn remove_crime(&mut self, name: &str) -> Result<bool, StoreError> {
		self.written.catalog = true;
		Ok(self.tables.crimes.remove(name).is_some())
	}

	fn shop_item(&mut self, name: &str) -> Result<Option<ShopItem>, StoreError> {
		Ok(self.tables.shop_items.get(name).cloned())
	}

	fn shop_items(&mut self) -> Result<Vec<ShopItem>, StoreError> {
		Ok(self.tables.shop_items.values().cloned().collect())
	}

	fn upsert_shop_item(&mut self, item: &ShopItem) -> Result<(), StoreError> {
		self.written.catalog = true;
		self.tables.shop_items.insert(item.name.clone(), item.clone());
		Ok(())
	}

	fn remove_shop_item(&mut self, name: &str) -> Result<bool, StoreError> {
		self.written.catalog = true;
		Ok(self.tables.shop_items.remove(name).is_some())
	}

	fn role_incomes(&mut self, roles: &[Id<RoleMarker>]) -> Result<Vec<RoleIncome>, StoreError> {
		let incomes = roles
			.iter()
			.filter_map(|role| {
				self.tables.role_income.get(role).map(|income_amount| RoleIncome {
					role_id: database_id_from_discord_id(role.get()),
					income_amount: *income_amount,
				})
			})
			.collect();
		Ok(incomes)
	}

	fn upsert_role_income(&mut self, income: &RoleIncome) -> Result<(), StoreError> {
		self.written.catalog = true;
		self.tables
			.role_income
			.insert(income.get_role(), income.income_amount);
		Ok(())
	}

	fn remove_role_income(&mut self, role: Id<RoleMarker>) -> Result<bool, StoreError> {
		self.written.catalog = true;
		Ok(self.tables.role_income.remove(&role).is_some())
	}

	fn add_inventory(&mut self, user: Id<UserMarker>, item_name: &str, quantity: i64) -> Result<i64, StoreError> {
		if self.fail_inventory_writes {
			return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
		}
		self.tables.accounts.entry(user).or_insert(0);
		self.written.inventory.insert((user, item_name.to_string()));
		let owned = self
			.tables
			.inventory
			.entry((user, item_name.to_string()))
			.or_insert(0);
		*owned += quantity;
		Ok(*owned)
	}

	fn inventory(&mut self, user: Id<UserMarker>) -> Result<Vec<InventoryEntry>, StoreError> {
		let entries = self
			.tables
			.inventory
			.iter()
			.filter(|((owner, _), _)| *owner == user)
			.map(|((owner, item_name), quantity)| InventoryEntry {
				user_id: database_id_from_discord_id(owner.get()),
				item_name: item_name.clone(),
				quantity: *quantity,
			})
			.collect();
		Ok(entries)
	}
}

/// A [RandomSource] that replays queued values. Running out of values is a test bug and panics.
#[derive(Default)]
pub struct ScriptedRandom {
	units: VecDeque<f64>,
	integers: VecDeque<i64>,
	indices: VecDeque<usize>,
}

impl ScriptedRandom {
	pub fn units(mut self, values: impl IntoIterator<Item = f64>) -> Self {
		self.units.extend(values);
		self
	}

	pub fn integers(mut self, values: impl IntoIterator<Item = i64>) -> Self {
		self.integers.extend(values);
		self
	}

	pub fn indices(mut self, values: impl IntoIterator<Item = usize>) -> Self {
		self.indices.extend(values);
		self
	}
}

impl RandomSource for ScriptedRandom {
	fn unit(&mut self) -> f64 {
		self.units.pop_front().expect("no scripted unit value left")
	}

	fn between(&mut self, min: i64, max: i64) -> i64 {
		let value = self.integers.pop_front().expect("no scripted integer left");
		assert!(
			(min..=max).contains(&value),
			"scripted {} is outside [{}, {}]",
			value,
			min,
			max
		);
		value
	}

	fn index(&mut self, len: usize) -> usize {
		let index = self.indices.pop_front().expect("no scripted index left");
		assert!(index < len, "scripted index {} is outside 0..{}", index, len);
		index
	}
}
