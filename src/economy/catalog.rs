// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Crime, Job, RoleIncome, ShopItem, database_id_from_discord_id};
use std::fmt;
use twilight_model::id::Id;
use twilight_model::id::marker::RoleMarker;

/// Why an administrator's catalog entry was refused. The display text is shown to the administrator.
#[derive(Debug, PartialEq)]
pub enum CatalogError {
	EmptyName,
	NegativeAmount(i64),
	InvertedRange { min: i64, max: i64 },
	ChanceOutOfRange(f64),
}

impl fmt::Display for CatalogError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::EmptyName => write!(f, "The name can't be empty."),
			Self::NegativeAmount(amount) => write!(f, "Amounts can't be negative (got {}).", amount),
			Self::InvertedRange { min, max } => write!(
				f,
				"The minimum ({}) can't be larger than the maximum ({}).",
				min, max
			),
			Self::ChanceOutOfRange(chance) => {
				write!(f, "The success chance must be between 0 and 100 (got {}).", chance)
			}
		}
	}
}

impl std::error::Error for CatalogError {}

/// Shop item names are matched case-insensitively, so they're stored folded.
pub fn normalize_item_name(name: &str) -> String {
	name.trim().to_lowercase()
}

/// Capitalizes the first letter of each word, for showing stored item names
pub fn title_case(name: &str) -> String {
	let mut titled = String::with_capacity(name.len());
	let mut at_word_start = true;
	for character in name.chars() {
		if character.is_alphabetic() {
			if at_word_start {
				titled.extend(character.to_uppercase());
			} else {
				titled.extend(character.to_lowercase());
			}
			at_word_start = false;
		} else {
			titled.push(character);
			at_word_start = true;
		}
	}
	titled
}

fn checked_name(name: &str) -> Result<String, CatalogError> {
	let name = name.trim();
	if name.is_empty() {
		return Err(CatalogError::EmptyName);
	}
	Ok(name.to_string())
}

fn checked_range(min: i64, max: i64) -> Result<(), CatalogError> {
	if min < 0 {
		return Err(CatalogError::NegativeAmount(min));
	}
	if max < 0 {
		return Err(CatalogError::NegativeAmount(max));
	}
	if min > max {
		return Err(CatalogError::InvertedRange { min, max });
	}
	Ok(())
}

pub fn job(name: &str, payout_min: i64, payout_max: i64) -> Result<Job, CatalogError> {
	let name = checked_name(name)?;
	checked_range(payout_min, payout_max)?;
	Ok(Job {
		name,
		payout_min,
		payout_max,
	})
}

pub fn crime(name: &str, success_chance: f64, reward_min: i64, reward_max: i64) -> Result<Crime, CatalogError> {
	let name = checked_name(name)?;
	if !(0.0..=100.0).contains(&success_chance) {
		return Err(CatalogError::ChanceOutOfRange(success_chance));
	}
	checked_range(reward_min, reward_max)?;
	Ok(Crime {
		name,
		success_chance,
		reward_min,
		reward_max,
	})
}

pub fn shop_item(name: &str, price: i64) -> Result<ShopItem, CatalogError> {
	let name = normalize_item_name(&checked_name(name)?);
	if price < 0 {
		return Err(CatalogError::NegativeAmount(price));
	}
	Ok(ShopItem { name, price })
}

pub fn role_income(role: Id<RoleMarker>, income_amount: i64) -> Result<RoleIncome, CatalogError> {
	if income_amount < 0 {
		return Err(CatalogError::NegativeAmount(income_amount));
	}
	Ok(RoleIncome {
		role_id: database_id_from_discord_id(role.get()),
		income_amount,
	})
}
