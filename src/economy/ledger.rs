// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::{DbPool, StoreError};
use crate::model::{
	Account, ClaimRecord, Crime, InventoryEntry, Job, RoleIncome, ShopItem, database_id_from_discord_id,
};
use crate::schema::{accounts, crimes, inventory, jobs, last_claims, role_income, shop_items};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use twilight_model::id::Id;
use twilight_model::id::marker::{RoleMarker, UserMarker};

/// Everything a single unit of work may read or write in the economy store.
///
/// Accounts are provisioned with a zero balance the first time they're touched, whether that's a read or a write.
pub trait LedgerTransaction {
	fn balance(&mut self, user: Id<UserMarker>) -> Result<i64, StoreError>;
	/// Adds `delta` to the user's balance and returns the new balance. Nothing stops a balance from going negative.
	fn add_balance(&mut self, user: Id<UserMarker>, delta: i64) -> Result<i64, StoreError>;

	fn last_claim(&mut self, user: Id<UserMarker>) -> Result<Option<DateTime<Utc>>, StoreError>;
	fn set_last_claim(&mut self, user: Id<UserMarker>, claimed_at: DateTime<Utc>) -> Result<(), StoreError>;

	fn jobs(&mut self) -> Result<Vec<Job>, StoreError>;
	fn upsert_job(&mut self, job: &Job) -> Result<(), StoreError>;
	fn remove_job(&mut self, name: &str) -> Result<bool, StoreError>;

	fn crimes(&mut self) -> Result<Vec<Crime>, StoreError>;
	fn upsert_crime(&mut self, crime: &Crime) -> Result<(), StoreError>;
	fn remove_crime(&mut self, name: &str) -> Result<bool, StoreError>;

	fn shop_item(&mut self, name: &str) -> Result<Option<ShopItem>, StoreError>;
	fn shop_items(&mut self) -> Result<Vec<ShopItem>, StoreError>;
	fn upsert_shop_item(&mut self, item: &ShopItem) -> Result<(), StoreError>;
	fn remove_shop_item(&mut self, name: &str) -> Result<bool, StoreError>;

	fn role_incomes(&mut self, roles: &[Id<RoleMarker>]) -> Result<Vec<RoleIncome>, StoreError>;
	fn upsert_role_income(&mut self, income: &RoleIncome) -> Result<(), StoreError>;
	fn remove_role_income(&mut self, role: Id<RoleMarker>) -> Result<bool, StoreError>;

	/// Adds items to the user's inventory and returns how many of the item they now own
	fn add_inventory(&mut self, user: Id<UserMarker>, item_name: &str, quantity: i64) -> Result<i64, StoreError>;
	fn inventory(&mut self, user: Id<UserMarker>) -> Result<Vec<InventoryEntry>, StoreError>;
}

/// A store that can run [LedgerTransaction] work atomically: either everything the work writes is committed, or (if
/// it returns an error) nothing is.
pub trait Ledger: Send + Sync {
	fn unit_of_work<T, F>(&self, work: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut dyn LedgerTransaction) -> Result<T, StoreError>;
}

pub struct PgLedger {
	db_connection_pool: DbPool,
}

impl PgLedger {
	pub fn new(db_connection_pool: DbPool) -> Self {
		Self { db_connection_pool }
	}
}

impl Ledger for PgLedger {
	fn unit_of_work<T, F>(&self, work: F) -> Result<T, StoreError>
	where
		F: FnOnce(&mut dyn LedgerTransaction) -> Result<T, StoreError>,
	{
		let mut pooled_connection = self.db_connection_pool.get()?;
		let db_connection: &mut PgConnection = &mut pooled_connection;
		db_connection.transaction::<T, StoreError, _>(|db_connection| {
			let mut transaction = PgLedgerTransaction { db_connection };
			work(&mut transaction)
		})
	}
}

struct PgLedgerTransaction<'a> {
	db_connection: &'a mut PgConnection,
}

impl PgLedgerTransaction<'_> {
	fn provision_account(&mut self, user_id: i64) -> Result<(), StoreError> {
		let account = Account { user_id, balance: 0 };
		diesel::insert_into(accounts::table)
			.values(&account)
			.on_conflict_do_nothing()
			.execute(self.db_connection)?;
		Ok(())
	}
}

impl LedgerTransaction for PgLedgerTransaction<'_> {
	fn balance(&mut self, user: Id<UserMarker>) -> Result<i64, StoreError> {
		let user_id = database_id_from_discord_id(user.get());
		self.provision_account(user_id)?;
		let balance: i64 = accounts::table
			.find(user_id)
			.select(accounts::balance)
			.for_update()
			.first(self.db_connection)?;
		Ok(balance)
	}

	fn add_balance(&mut self, user: Id<UserMarker>, delta: i64) -> Result<i64, StoreError> {
		let user_id = database_id_from_discord_id(user.get());
		self.provision_account(user_id)?;
		let balance: i64 = diesel::update(accounts::table.find(user_id))
			.set(accounts::balance.eq(accounts::balance + delta))
			.returning(accounts::balance)
			.get_result(self.db_connection)?;
		Ok(balance)
	}

	fn last_claim(&mut self, user: Id<UserMarker>) -> Result<Option<DateTime<Utc>>, StoreError> {
		let user_id = database_id_from_discord_id(user.get());
		let record = ClaimRecord {
			user_id,
			last_claim: None,
		};
		diesel::insert_into(last_claims::table)
			.values(&record)
			.on_conflict_do_nothing()
			.execute(self.db_connection)?;
		// Locking the row keeps a concurrent claim from another process waiting until this one commits.
		let last_claim: Option<DateTime<Utc>> = last_claims::table
			.find(user_id)
			.select(last_claims::last_claim)
			.for_update()
			.first(self.db_connection)?;
		Ok(last_claim)
	}

	fn set_last_claim(&mut self, user: Id<UserMarker>, claimed_at: DateTime<Utc>) -> Result<(), StoreError> {
		let record = ClaimRecord {
			user_id: database_id_from_discord_id(user.get()),
			last_claim: Some(claimed_at),
		};
		diesel::insert_into(last_claims::table)
			.values(&record)
			.on_conflict(last_claims::user_id)
			.do_update()
			.set(last_claims::last_claim.eq(Some(claimed_at)))
			.execute(self.db_connection)?;
		Ok(())
	}

	fn jobs(&mut self) -> Result<Vec<Job>, StoreError> {
		let jobs: Vec<Job> = jobs::table.order(jobs::name).load(self.db_connection)?;
		Ok(jobs)
	}

	fn upsert_job(&mut self, job: &Job) -> Result<(), StoreError> {
		diesel::insert_into(jobs::table)
			.values(job)
			.on_conflict(jobs::name)
			.do_update()
			.set((
				jobs::payout_min.eq(job.payout_min),
				jobs::payout_max.eq(job.payout_max),
			))
			.execute(self.db_connection)?;
		Ok(())
	}

	fn remove_job(&mut self, name: &str) -> Result<bool, StoreError> {
		let removed = diesel::delete(jobs::table.find(name)).execute(self.db_connection)?;
		Ok(removed > 0)
	}

	fn crimes(&mut self) -> Result<Vec<Crime>, StoreError> {
		let crimes: Vec<Crime> = crimes::table.order(crimes::name).load(self.db_connection)?;
		Ok(crimes)
	}

	fn upsert_crime(&mut self, crime: &Crime) -> Result<(), StoreError> {
		diesel::insert_into(crimes::table)
			.values(crime)
			.on_conflict(crimes::name)
			.do_update()
			.set((
				crimes::success_chance.eq(crime.success_chance),
				crimes::reward_min.eq(crime.reward_min),
				crimes::reward_max.eq(crime.reward_max),
			))
			.execute(self.db_connection)?;
		Ok(())
	}

	fn remove_crime(&mut self, name: &str) -> Result<bool, StoreError> {
		let removed = diesel::delete(crimes::table.find(name)).execute(self.db_connection)?;
		Ok(removed > 0)
	}

	fn shop_item(&mut self, name: &str) -> Result<Option<ShopItem>, StoreError> {
		let item: Option<ShopItem> = shop_items::table
			.find(name)
			.first(self.db_connection)
			.optional()?;
		Ok(item)
	}

	fn shop_items(&mut self) -> Result<Vec<ShopItem>, StoreError> {
		let items: Vec<ShopItem> = shop_items::table
			.order(shop_items::name)
			.load(self.db_connection)?;
		Ok(items)
	}

	fn upsert_shop_item(&mut self, item: &ShopItem) -> Result<(), StoreError> {
		diesel::insert_into(shop_items::table)
			.values(item)
			.on_conflict(shop_items::name)
			.do_update()
			.set(shop_items::price.eq(item.price))
			.execute(self.db_connection)?;
		Ok(())
	}

	fn remove_shop_item(&mut self, name: &str) -> Result<bool, StoreError> {
		let removed = diesel::delete(shop_items::table.find(name)).execute(self.db_connection)?;
		Ok(removed > 0)
	}

	fn role_incomes(&mut self, roles: &[Id<RoleMarker>]) -> Result<Vec<RoleIncome>, StoreError> {
		let role_ids: Vec<i64> = roles
			.iter()
			.map(|role| database_id_from_discord_id(role.get()))
			.collect();
		let incomes: Vec<RoleIncome> = role_income::table
			.filter(role_income::role_id.eq_any(role_ids))
			.load(self.db_connection)?;
		Ok(incomes)
	}

	fn upsert_role_income(&mut self, income: &RoleIncome) -> Result<(), StoreError> {
		diesel::insert_into(role_income::table)
			.values(income)
			.on_conflict(role_income::role_id)
			.do_update()
			.set(role_income::income_amount.eq(income.income_amount))
			.execute(self.db_connection)?;
		Ok(())
	}

	fn remove_role_income(&mut self, role: Id<RoleMarker>) -> Result<bool, StoreError> {
		let role_id = database_id_from_discord_id(role.get());
		let removed = diesel::delete(role_income::table.find(role_id)).execute(self.db_connection)?;
		Ok(removed > 0)
	}

	fn add_inventory(&mut self, user: Id<UserMarker>, item_name: &str, quantity: i64) -> Result<i64, StoreError> {
		let user_id = database_id_from_discord_id(user.get());
		self.provision_account(user_id)?;
		let entry = InventoryEntry {
			user_id,
			item_name: item_name.to_string(),
			quantity,
		};
		let owned: i64 = diesel::insert_into(inventory::table)
			.values(&entry)
			.on_conflict((inventory::user_id, inventory::item_name))
			.do_update()
			.set(inventory::quantity.eq(inventory::quantity + quantity))
			.returning(inventory::quantity)
			.get_result(self.db_connection)?;
		Ok(owned)
	}

	fn inventory(&mut self, user: Id<UserMarker>) -> Result<Vec<InventoryEntry>, StoreError> {
		let user_id = database_id_from_discord_id(user.get());
		let entries: Vec<InventoryEntry> = inventory::table
			.filter(inventory::user_id.eq(user_id))
			.order(inventory::item_name)
			.load(self.db_connection)?;
		Ok(entries)
	}
}
