// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The dice rolls behind each game action. Nothing in here touches storage; these only decide what should happen.

use crate::model::{Crime, Job, RoleIncome};
use rand::Rng;

/// Targets with less than this can't be robbed.
pub const MIN_ROBBABLE_BALANCE: i64 = 100;
pub const MIN_ROBBERY_AMOUNT: i64 = 50;
pub const MAX_ROBBERY_AMOUNT: i64 = 500;
const ROBBERY_SUCCESS_CHANCE: f64 = 0.5;

/// Source of randomness for game actions
pub trait RandomSource {
	/// A value in `[0, 1)`
	fn unit(&mut self) -> f64;
	/// An integer in `[min, max]`
	fn between(&mut self, min: i64, max: i64) -> i64;
	/// An index in `[0, len)`. `len` must be non-zero.
	fn index(&mut self, len: usize) -> usize;
}

impl<R: Rng> RandomSource for R {
	fn unit(&mut self) -> f64 {
		self.gen_range(0.0..1.0)
	}

	fn between(&mut self, min: i64, max: i64) -> i64 {
		if min >= max {
			return min;
		}
		self.gen_range(min..=max)
	}

	fn index(&mut self, len: usize) -> usize {
		self.gen_range(0..len)
	}
}

#[derive(Debug, Eq, PartialEq)]
pub struct WorkRoll {
	pub job: String,
	pub payout: i64,
}

/// Picks a job and its payout. Returns `None` if there are no jobs to pick from.
pub fn roll_work(jobs: &[Job], rng: &mut impl RandomSource) -> Option<WorkRoll> {
	if jobs.is_empty() {
		return None;
	}
	let job = &jobs[rng.index(jobs.len())];
	let payout = rng.between(job.payout_min, job.payout_max);
	Some(WorkRoll {
		job: job.name.clone(),
		payout,
	})
}

#[derive(Debug, Eq, PartialEq)]
pub struct CrimeRoll {
	pub crime: String,
	pub succeeded: bool,
	/// Won on success, lost on failure
	pub amount: i64,
}

impl CrimeRoll {
	pub fn delta(&self) -> i64 {
		if self.succeeded { self.amount } else { -self.amount }
	}
}

/// Picks a crime, whether it succeeded, and how much is at stake. Returns `None` if there are no crimes to pick from.
pub fn roll_crime(crimes: &[Crime], rng: &mut impl RandomSource) -> Option<CrimeRoll> {
	if crimes.is_empty() {
		return None;
	}
	let crime = &crimes[rng.index(crimes.len())];
	let succeeded = rng.unit() < crime.success_chance / 100.0;
	let amount = rng.between(crime.reward_min, crime.reward_max);
	Some(CrimeRoll {
		crime: crime.name.clone(),
		succeeded,
		amount,
	})
}

#[derive(Debug, Eq, PartialEq)]
pub struct RobRoll {
	pub succeeded: bool,
	pub amount: i64,
}

impl RobRoll {
	pub fn robber_delta(&self) -> i64 {
		if self.succeeded { self.amount } else { -self.amount }
	}

	/// A caught robber doesn't take anything, so the target only loses money on success.
	pub fn target_delta(&self) -> i64 {
		if self.succeeded { -self.amount } else { 0 }
	}
}

/// Rolls a robbery against a target holding `target_balance`. Returns `None` if the target is too poor to rob.
pub fn roll_robbery(target_balance: i64, rng: &mut impl RandomSource) -> Option<RobRoll> {
	if target_balance < MIN_ROBBABLE_BALANCE {
		return None;
	}
	let succeeded = rng.unit() < ROBBERY_SUCCESS_CHANCE;
	let amount = rng.between(MIN_ROBBERY_AMOUNT, MAX_ROBBERY_AMOUNT.min(target_balance));
	Some(RobRoll { succeeded, amount })
}

/// Income stacks across every role that has some configured; there's no cap.
pub fn claim_total(incomes: &[RoleIncome]) -> i64 {
	incomes
		.iter()
		.fold(0i64, |total, income| total.saturating_add(income.income_amount))
}

/// The price of `quantity` items, or `None` if it doesn't fit in a balance
pub fn purchase_cost(price: i64, quantity: i64) -> Option<i64> {
	price.checked_mul(quantity)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::economy::testing::ScriptedRandom;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn crime(name: &str, success_chance: f64, reward_min: i64, reward_max: i64) -> Crime {
		Crime {
			name: name.to_string(),
			success_chance,
			reward_min,
			reward_max,
		}
	}

	#[test]
	fn work_needs_a_job() {
		let mut rng = ScriptedRandom::default();
		assert_eq!(roll_work(&[], &mut rng), None);
	}

	#[test]
	fn work_pays_the_rolled_amount_for_the_picked_job() {
		let jobs = vec![
			Job {
				name: String::from("baker"),
				payout_min: 10,
				payout_max: 20,
			},
			Job {
				name: String::from("miner"),
				payout_min: 30,
				payout_max: 60,
			},
		];
		let mut rng = ScriptedRandom::default().indices([1]).integers([45]);
		let roll = roll_work(&jobs, &mut rng).unwrap();
		assert_eq!(
			roll,
			WorkRoll {
				job: String::from("miner"),
				payout: 45
			}
		);
	}

	#[test]
	fn real_rng_stays_in_the_payout_range() {
		let jobs = vec![Job {
			name: String::from("clerk"),
			payout_min: 5,
			payout_max: 9,
		}];
		let mut rng = StdRng::seed_from_u64(17);
		for _ in 0..200 {
			let roll = roll_work(&jobs, &mut rng).unwrap();
			assert!((5..=9).contains(&roll.payout));
		}
	}

	#[test]
	fn crime_succeeds_only_below_the_chance() {
		let crimes = vec![crime("heist", 40.0, 100, 200)];

		let mut rng = ScriptedRandom::default().indices([0]).units([0.39]).integers([150]);
		let roll = roll_crime(&crimes, &mut rng).unwrap();
		assert!(roll.succeeded);
		assert_eq!(roll.delta(), 150);

		let mut rng = ScriptedRandom::default().indices([0]).units([0.4]).integers([150]);
		let roll = roll_crime(&crimes, &mut rng).unwrap();
		assert!(!roll.succeeded);
		assert_eq!(roll.delta(), -150);
	}

	#[test]
	fn certain_and_impossible_crimes() {
		let crimes = vec![crime("jaywalking", 100.0, 1, 1), crime("moon theft", 0.0, 1, 1)];

		let mut rng = ScriptedRandom::default().indices([0]).units([0.999]).integers([1]);
		assert!(roll_crime(&crimes, &mut rng).unwrap().succeeded);

		let mut rng = ScriptedRandom::default().indices([1]).units([0.0]).integers([1]);
		assert!(!roll_crime(&crimes, &mut rng).unwrap().succeeded);
	}

	#[test]
	fn crime_needs_a_crime() {
		let mut rng = ScriptedRandom::default();
		assert_eq!(roll_crime(&[], &mut rng), None);
	}

	#[test]
	fn poor_targets_cannot_be_robbed() {
		let mut rng = ScriptedRandom::default();
		assert_eq!(roll_robbery(99, &mut rng), None);
		assert_eq!(roll_robbery(-500, &mut rng), None);
	}

	#[test]
	fn robbery_amount_is_capped_by_target_balance() {
		let mut rng = StdRng::seed_from_u64(3);
		for _ in 0..200 {
			let roll = roll_robbery(120, &mut rng).unwrap();
			assert!((MIN_ROBBERY_AMOUNT..=120).contains(&roll.amount));
		}
		for _ in 0..200 {
			let roll = roll_robbery(10_000, &mut rng).unwrap();
			assert!((MIN_ROBBERY_AMOUNT..=MAX_ROBBERY_AMOUNT).contains(&roll.amount));
		}
	}

	#[test]
	fn caught_robbers_leave_the_target_alone() {
		let mut rng = ScriptedRandom::default().units([0.5]).integers([75]);
		let roll = roll_robbery(1_000, &mut rng).unwrap();
		assert!(!roll.succeeded);
		assert_eq!(roll.robber_delta(), -75);
		assert_eq!(roll.target_delta(), 0);

		let mut rng = ScriptedRandom::default().units([0.49]).integers([75]);
		let roll = roll_robbery(1_000, &mut rng).unwrap();
		assert!(roll.succeeded);
		assert_eq!(roll.robber_delta(), 75);
		assert_eq!(roll.target_delta(), -75);
	}

	#[test]
	fn claim_stacks_every_role() {
		let incomes = vec![
			RoleIncome {
				role_id: 1,
				income_amount: 100,
			},
			RoleIncome {
				role_id: 2,
				income_amount: 0,
			},
			RoleIncome {
				role_id: 3,
				income_amount: 250,
			},
		];
		assert_eq!(claim_total(&incomes), 350);
		assert_eq!(claim_total(&[]), 0);
	}

	#[test]
	fn purchase_cost_overflow_is_caught() {
		assert_eq!(purchase_cost(10, 3), Some(30));
		assert_eq!(purchase_cost(i64::MAX, 2), None);
	}
}
