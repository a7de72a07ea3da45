// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The economy game: wallets, the actions that move money in and out of them, and the shop.

pub mod actions;
pub mod catalog;
pub mod cooldown;
pub mod ledger;
pub mod mutator;

#[cfg(test)]
pub mod testing;

use actions::{RandomSource, claim_total, purchase_cost, roll_crime, roll_robbery, roll_work};
use catalog::normalize_item_name;
use chrono::{DateTime, Utc};
use cooldown::{ClaimCooldown, CooldownStatus};
use ledger::Ledger;
use mutator::{BalanceMutator, apply_within};

use crate::database::StoreError;
use crate::model::{Crime, InventoryEntry, Job, RoleIncome, ShopItem};
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

#[derive(Debug, Eq, PartialEq)]
pub enum WorkOutcome {
	Paid { job: String, amount: i64, balance: i64 },
	NoJobs,
}

#[derive(Debug, Eq, PartialEq)]
pub enum CrimeOutcome {
	Succeeded { crime: String, reward: i64, balance: i64 },
	Failed { crime: String, loss: i64, balance: i64 },
	NoCrimes,
}

#[derive(Debug, Eq, PartialEq)]
pub enum RobOutcome {
	SelfTarget,
	TargetTooPoor,
	Succeeded { amount: i64 },
	Caught { amount: i64 },
}

#[derive(Debug, Eq, PartialEq)]
pub enum ClaimOutcome {
	/// The claim went through. `incomes` lists every role that paid out; it may be empty, in which case nothing was
	/// credited but the cooldown still started.
	Claimed { total: i64, incomes: Vec<RoleIncome> },
	OnCooldown { available_at: DateTime<Utc> },
}

#[derive(Debug, Eq, PartialEq)]
pub enum PurchaseOutcome {
	Bought { item: String, quantity: i64, cost: i64 },
	UnknownItem,
	InsufficientFunds { cost: i64, balance: i64 },
	InvalidQuantity,
}

pub struct Economy<L> {
	mutator: BalanceMutator<L>,
	claim_cooldown: ClaimCooldown,
}

impl<L: Ledger> Economy<L> {
	pub fn new(ledger: L, claim_cooldown: ClaimCooldown) -> Self {
		Self {
			mutator: BalanceMutator::new(ledger),
			claim_cooldown,
		}
	}

	pub fn balance(&self, user: Id<UserMarker>) -> Result<i64, StoreError> {
		self.mutator.balance(user)
	}

	pub async fn work<R: RandomSource + Send>(
		&self,
		user: Id<UserMarker>,
		rng: &mut R,
	) -> Result<WorkOutcome, StoreError> {
		self.mutator
			.with_accounts(&[user], |transaction| {
				let jobs = transaction.jobs()?;
				let Some(roll) = roll_work(&jobs, rng) else {
					return Ok(WorkOutcome::NoJobs);
				};
				let balance = apply_within(transaction, user, roll.payout)?;
				Ok(WorkOutcome::Paid {
					job: roll.job,
					amount: roll.payout,
					balance,
				})
			})
			.await
	}

	pub async fn crime<R: RandomSource + Send>(
		&self,
		user: Id<UserMarker>,
		rng: &mut R,
	) -> Result<CrimeOutcome, StoreError> {
		self.mutator
			.with_accounts(&[user], |transaction| {
				let crimes = transaction.crimes()?;
				let Some(roll) = roll_crime(&crimes, rng) else {
					return Ok(CrimeOutcome::NoCrimes);
				};
				let balance = apply_within(transaction, user, roll.delta())?;
				if roll.succeeded {
					Ok(CrimeOutcome::Succeeded {
						crime: roll.crime,
						reward: roll.amount,
						balance,
					})
				} else {
					Ok(CrimeOutcome::Failed {
						crime: roll.crime,
						loss: roll.amount,
						balance,
					})
				}
			})
			.await
	}

	/// Robs `target`. Both accounts stay locked from the balance check until the money has moved.
	pub async fn rob<R: RandomSource + Send>(
		&self,
		robber: Id<UserMarker>,
		target: Id<UserMarker>,
		rng: &mut R,
	) -> Result<RobOutcome, StoreError> {
		if robber == target {
			return Ok(RobOutcome::SelfTarget);
		}
		self.mutator
			.with_accounts(&[robber, target], |transaction| {
				let target_balance = transaction.balance(target)?;
				let Some(roll) = roll_robbery(target_balance, rng) else {
					return Ok(RobOutcome::TargetTooPoor);
				};
				apply_within(transaction, robber, roll.robber_delta())?;
				if roll.target_delta() != 0 {
					apply_within(transaction, target, roll.target_delta())?;
				}
				if roll.succeeded {
					Ok(RobOutcome::Succeeded { amount: roll.amount })
				} else {
					Ok(RobOutcome::Caught { amount: roll.amount })
				}
			})
			.await
	}

	/// Pays out the income of every role the member holds in `guild`.
	///
	/// The cooldown is stamped before the income is worked out, in the same unit of work as the credit.
	pub async fn claim(
		&self,
		user: Id<UserMarker>,
		guild: Id<GuildMarker>,
		roles: &[Id<RoleMarker>],
		now: DateTime<Utc>,
	) -> Result<ClaimOutcome, StoreError> {
		// The @everyone role shares the guild's ID and never pays out.
		let everyone_role: Id<RoleMarker> = guild.cast();
		let paying_roles: Vec<Id<RoleMarker>> = roles.iter().copied().filter(|role| *role != everyone_role).collect();
		let cooldown = self.claim_cooldown;

		self.mutator
			.with_accounts(&[user], |transaction| {
				let last_claim = transaction.last_claim(user)?;
				if let CooldownStatus::Waiting { available_at } = cooldown.status(last_claim, now) {
					return Ok(ClaimOutcome::OnCooldown { available_at });
				}
				transaction.set_last_claim(user, now)?;

				let incomes = transaction.role_incomes(&paying_roles)?;
				let total = claim_total(&incomes);
				apply_within(transaction, user, total)?;
				Ok(ClaimOutcome::Claimed { total, incomes })
			})
			.await
	}

	/// Buys `quantity` of a shop item. The debit and the inventory grant commit together or not at all.
	pub async fn buy(
		&self,
		user: Id<UserMarker>,
		item_name: &str,
		quantity: i64,
	) -> Result<PurchaseOutcome, StoreError> {
		if quantity < 1 {
			return Ok(PurchaseOutcome::InvalidQuantity);
		}
		let item_name = normalize_item_name(item_name);

		self.mutator
			.with_accounts(&[user], |transaction| {
				let Some(item) = transaction.shop_item(&item_name)? else {
					return Ok(PurchaseOutcome::UnknownItem);
				};
				let Some(cost) = purchase_cost(item.price, quantity) else {
					return Ok(PurchaseOutcome::InvalidQuantity);
				};
				let balance = transaction.balance(user)?;
				if balance < cost {
					return Ok(PurchaseOutcome::InsufficientFunds { cost, balance });
				}
				apply_within(transaction, user, -cost)?;
				transaction.add_inventory(user, &item.name, quantity)?;
				Ok(PurchaseOutcome::Bought {
					item: item.name,
					quantity,
					cost,
				})
			})
			.await
	}

	pub fn shop_items(&self) -> Result<Vec<ShopItem>, StoreError> {
		self.mutator.unlocked(|transaction| transaction.shop_items())
	}

	pub fn inventory(&self, user: Id<UserMarker>) -> Result<Vec<InventoryEntry>, StoreError> {
		self.mutator.unlocked(|transaction| transaction.inventory(user))
	}

	pub fn add_job(&self, job: &Job) -> Result<(), StoreError> {
		self.mutator.unlocked(|transaction| transaction.upsert_job(job))
	}

	pub fn remove_job(&self, name: &str) -> Result<bool, StoreError> {
		self.mutator.unlocked(|transaction| transaction.remove_job(name.trim()))
	}

	pub fn add_crime(&self, crime: &Crime) -> Result<(), StoreError> {
		self.mutator.unlocked(|transaction| transaction.upsert_crime(crime))
	}

	pub fn remove_crime(&self, name: &str) -> Result<bool, StoreError> {
		self.mutator.unlocked(|transaction| transaction.remove_crime(name.trim()))
	}

	pub fn add_shop_item(&self, item: &ShopItem) -> Result<(), StoreError> {
		self.mutator.unlocked(|transaction| transaction.upsert_shop_item(item))
	}

	pub fn remove_shop_item(&self, name: &str) -> Result<bool, StoreError> {
		let name = normalize_item_name(name);
		self.mutator.unlocked(|transaction| transaction.remove_shop_item(&name))
	}

	pub fn add_role_income(&self, income: &RoleIncome) -> Result<(), StoreError> {
		self.mutator.unlocked(|transaction| transaction.upsert_role_income(income))
	}

	pub fn remove_role_income(&self, role: Id<RoleMarker>) -> Result<bool, StoreError> {
		self.mutator.unlocked(|transaction| transaction.remove_role_income(role))
	}
}
