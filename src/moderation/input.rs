// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Moderator-supplied arguments, checked before anything touches the platform.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// The longest timeout the platform accepts
pub const MAX_TIMEOUT_DAYS: i64 = 28;

pub const AUTO_UNMUTE_REASON: &str = "Automatic unmute after timed mute expired";

/// A moderation reason. Never empty or only whitespace.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reason(String);

impl Reason {
	pub fn parse(reason: &str) -> Option<Self> {
		let reason = reason.trim();
		if reason.is_empty() {
			None
		} else {
			Some(Self(reason.to_string()))
		}
	}

	/// The reason recorded when an expired mute is lifted
	pub fn automatic_unmute() -> Self {
		Self(String::from(AUTO_UNMUTE_REASON))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Reason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DurationUnit {
	Seconds,
	#[default]
	Minutes,
	Hours,
	Days,
}

impl DurationUnit {
	/// Reads a unit suffix. Anything unrecognized is taken as minutes.
	pub fn from_suffix(suffix: &str) -> Self {
		match suffix.trim().to_lowercase().as_str() {
			"s" => Self::Seconds,
			"h" => Self::Hours,
			"d" => Self::Days,
			_ => Self::Minutes,
		}
	}

	pub fn seconds(&self) -> i64 {
		match self {
			Self::Seconds => 1,
			Self::Minutes => 60,
			Self::Hours => 3600,
			Self::Days => 86400,
		}
	}

	pub fn suffix(&self) -> &'static str {
		match self {
			Self::Seconds => "s",
			Self::Minutes => "m",
			Self::Hours => "h",
			Self::Days => "d",
		}
	}
}

#[derive(Debug, Eq, PartialEq)]
pub enum DurationError {
	NotPositive,
	TooLong,
}

impl fmt::Display for DurationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotPositive => write!(f, "The duration must be greater than zero."),
			Self::TooLong => write!(f, "That duration is too long."),
		}
	}
}

impl std::error::Error for DurationError {}

fn span(amount: i64, unit: DurationUnit) -> Result<Duration, DurationError> {
	amount
		.checked_mul(unit.seconds())
		.and_then(Duration::try_seconds)
		.ok_or(DurationError::TooLong)
}

/// How long a mute lasts
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MuteDuration {
	/// Lifted only by a moderator
	Indefinite,
	Timed { amount: i64, unit: DurationUnit },
}

impl MuteDuration {
	/// A zero (or negative) amount makes the mute indefinite.
	pub fn new(amount: i64, unit: DurationUnit) -> Result<Self, DurationError> {
		if amount <= 0 {
			return Ok(Self::Indefinite);
		}
		span(amount, unit)?;
		Ok(Self::Timed { amount, unit })
	}

	/// When a mute starting at `now` should be lifted, or `None` if it never should be automatically
	pub fn expiry(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, DurationError> {
		match self {
			Self::Indefinite => Ok(None),
			Self::Timed { amount, unit } => {
				let length = span(*amount, *unit)?;
				now.checked_add_signed(length).map(Some).ok_or(DurationError::TooLong)
			}
		}
	}
}

impl fmt::Display for MuteDuration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Indefinite => write!(f, "an indefinite time"),
			Self::Timed { amount, unit } => write!(f, "{}{}", amount, unit.suffix()),
		}
	}
}

/// Works out the length of a timeout, which the platform caps.
pub fn timeout_length(amount: i64, unit: DurationUnit) -> Result<Duration, DurationError> {
	if amount <= 0 {
		return Err(DurationError::NotPositive);
	}
	let length = span(amount, unit)?;
	if length > Duration::days(MAX_TIMEOUT_DAYS) {
		return Err(DurationError::TooLong);
	}
	Ok(length)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn blank_reasons_are_rejected() {
		assert_eq!(Reason::parse(""), None);
		assert_eq!(Reason::parse(" \t\n"), None);
		assert_eq!(Reason::parse("  spam  ").unwrap().as_str(), "spam");
	}

	#[test]
	fn unknown_units_fall_back_to_minutes() {
		assert_eq!(DurationUnit::from_suffix("H"), DurationUnit::Hours);
		assert_eq!(DurationUnit::from_suffix("fortnight"), DurationUnit::Minutes);
		assert_eq!(DurationUnit::from_suffix(""), DurationUnit::Minutes);
		assert_eq!(DurationUnit::default(), DurationUnit::Minutes);
	}

	#[test]
	fn zero_duration_mutes_are_indefinite() {
		let duration = MuteDuration::new(0, DurationUnit::Hours).unwrap();
		assert_eq!(duration, MuteDuration::Indefinite);
		assert_eq!(duration.expiry(Utc::now()).unwrap(), None);
	}

	#[test]
	fn timed_mutes_expire_after_the_span() {
		let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
		let duration = MuteDuration::new(2, DurationUnit::Days).unwrap();
		assert_eq!(duration.expiry(now).unwrap(), Some(now + Duration::seconds(2 * 86400)));
		assert_eq!(duration.to_string(), "2d");
	}

	#[test]
	fn absurd_mute_lengths_are_refused() {
		assert_eq!(MuteDuration::new(i64::MAX, DurationUnit::Days), Err(DurationError::TooLong));
	}

	#[test]
	fn timeouts_are_capped_at_four_weeks() {
		assert_eq!(timeout_length(28, DurationUnit::Days), Ok(Duration::days(28)));
		assert_eq!(timeout_length(29, DurationUnit::Days), Err(DurationError::TooLong));
		assert_eq!(timeout_length(0, DurationUnit::Seconds), Err(DurationError::NotPositive));
		assert_eq!(timeout_length(90, DurationUnit::Minutes), Ok(Duration::minutes(90)));
	}
}
