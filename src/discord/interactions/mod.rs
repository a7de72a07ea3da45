// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::context::BotContext;
use miette::bail;
use twilight_model::application::interaction::message_component::MessageComponentInteractionData;
use twilight_model::gateway::payload::incoming::InteractionCreate;

mod tickets;

pub async fn route_interaction(
	interaction: &InteractionCreate,
	interaction_data: &MessageComponentInteractionData,
	context: &BotContext,
) -> miette::Result<()> {
	let custom_id_path: Vec<&str> = interaction_data.custom_id.split('/').collect();

	match custom_id_path.first().copied() {
		Some("ticket") => tickets::route_ticket_interaction(interaction, &custom_id_path, context).await,
		_ => bail!("Unknown component interaction: {}", interaction_data.custom_id),
	}
}
