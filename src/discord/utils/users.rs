// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::user::User;

/// Names for a user, preferring their guild nickname for display
#[derive(Debug)]
pub struct UserData {
	pub display_name: String,
	pub username: String,
}

impl UserData {
	fn from_user(user: User, nickname: Option<String>) -> Self {
		let display_name = nickname.or(user.global_name).unwrap_or_else(|| user.name.clone());
		Self {
			display_name,
			username: user.name,
		}
	}
}

/// Gets the data of whoever used an interaction, from the interaction itself
pub fn interaction_user_data(interaction: &InteractionCreate) -> Option<UserData> {
	if let Some(member) = interaction.member.as_ref() {
		let user = member.user.clone()?;
		return Some(UserData::from_user(user, member.nick.clone()));
	}
	interaction.user.clone().map(|user| UserData::from_user(user, None))
}
