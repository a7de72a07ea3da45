// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, TimeZone, Utc};
use twilight_model::util::datetime::{Timestamp, TimestampParseError};

/// Gets the [DateTime] object for a timestamp from Discord. If any failures occur in the conversion, returns `None`.
pub fn datetime_from_timestamp(timestamp: &Timestamp) -> Option<DateTime<Utc>> {
	let micros = timestamp.as_micros();
	Utc.timestamp_micros(micros).single()
}

/// Gets a Discord [Timestamp] for a point in time
pub fn timestamp_from_datetime(datetime: DateTime<Utc>) -> Result<Timestamp, TimestampParseError> {
	Timestamp::from_micros(datetime.timestamp_micros())
}

/// Formats a point in time as a Discord relative timestamp ("in 3 hours")
pub fn relative_time(datetime: DateTime<Utc>) -> String {
	format!("<t:{}:R>", datetime.timestamp())
}
