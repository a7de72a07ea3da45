// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CooldownStatus {
	Ready,
	Waiting { available_at: DateTime<Utc> },
}

/// Enforces the minimum interval between two role income claims by the same user
#[derive(Clone, Copy, Debug)]
pub struct ClaimCooldown {
	interval: Duration,
}

impl ClaimCooldown {
	pub fn new(interval: Duration) -> Self {
		Self { interval }
	}

	pub fn status(&self, last_claim: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CooldownStatus {
		let Some(last_claim) = last_claim else {
			return CooldownStatus::Ready;
		};
		if now - last_claim >= self.interval {
			CooldownStatus::Ready
		} else {
			CooldownStatus::Waiting {
				available_at: last_claim + self.interval,
			}
		}
	}
}

impl Default for ClaimCooldown {
	fn default() -> Self {
		Self::new(Duration::hours(24))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn noon() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2025, 5, 4, 12, 0, 0).unwrap()
	}

	#[test]
	fn first_claim_is_always_ready() {
		assert_eq!(ClaimCooldown::default().status(None, noon()), CooldownStatus::Ready);
	}

	#[test]
	fn claim_inside_the_window_waits() {
		let cooldown = ClaimCooldown::default();
		let last_claim = noon();
		let status = cooldown.status(Some(last_claim), last_claim + Duration::hours(23) + Duration::minutes(59));
		assert_eq!(
			status,
			CooldownStatus::Waiting {
				available_at: last_claim + Duration::hours(24)
			}
		);
	}

	#[test]
	fn claim_exactly_at_the_boundary_is_ready() {
		let cooldown = ClaimCooldown::default();
		let last_claim = noon();
		assert_eq!(
			cooldown.status(Some(last_claim), last_claim + Duration::hours(24)),
			CooldownStatus::Ready
		);
	}

	#[test]
	fn claim_stamped_in_the_future_waits() {
		let cooldown = ClaimCooldown::new(Duration::hours(1));
		let last_claim = noon() + Duration::minutes(5);
		assert!(matches!(
			cooldown.status(Some(last_claim), noon()),
			CooldownStatus::Waiting { .. }
		));
	}
}
