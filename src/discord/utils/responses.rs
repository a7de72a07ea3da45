// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::discord::context::BotContext;
use miette::IntoDiagnostic;
use twilight_model::channel::message::component::Component;
use twilight_model::channel::message::{Embed, MessageFlags};
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::{InteractionResponse, InteractionResponseType};
use twilight_util::builder::InteractionResponseDataBuilder;

pub const NOT_IN_GUILD: &str = "This command can only be used in a server.";
pub const SOMETHING_WENT_WRONG: &str = "❌ Something went wrong. Please try again later.";

/// Formats an amount of money with thousands separators, like `$1,234`
pub fn format_money(amount: i64) -> String {
	let digits = amount.unsigned_abs().to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 2);
	grouped.push('$');
	if amount < 0 {
		grouped.push('-');
	}
	for (index, digit) in digits.chars().enumerate() {
		if index > 0 && (digits.len() - index) % 3 == 0 {
			grouped.push(',');
		}
		grouped.push(digit);
	}
	grouped
}

pub fn text_response(content: impl Into<String>, ephemeral: bool) -> InteractionResponse {
	let mut data = InteractionResponseDataBuilder::new().content(content);
	if ephemeral {
		data = data.flags(MessageFlags::EPHEMERAL);
	}
	InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(data.build()),
	}
}

pub fn embed_response(embed: Embed, components: Vec<Component>, ephemeral: bool) -> InteractionResponse {
	let mut data = InteractionResponseDataBuilder::new().embeds([embed]);
	if !components.is_empty() {
		data = data.components(components);
	}
	if ephemeral {
		data = data.flags(MessageFlags::EPHEMERAL);
	}
	InteractionResponse {
		kind: InteractionResponseType::ChannelMessageWithSource,
		data: Some(data.build()),
	}
}

/// Tells Discord we're working on it, for responses that need more than a few seconds.
pub fn deferred_response(ephemeral: bool) -> InteractionResponse {
	let data = ephemeral.then(|| {
		InteractionResponseDataBuilder::new()
			.flags(MessageFlags::EPHEMERAL)
			.build()
	});
	InteractionResponse {
		kind: InteractionResponseType::DeferredChannelMessageWithSource,
		data,
	}
}

pub async fn respond(
	context: &BotContext,
	interaction: &InteractionCreate,
	response: &InteractionResponse,
) -> miette::Result<()> {
	context
		.http_client
		.interaction(context.application_id)
		.create_response(interaction.id, &interaction.token, response)
		.await
		.into_diagnostic()?;
	Ok(())
}

/// Sends a follow-up message to a deferred response
pub async fn follow_up(context: &BotContext, interaction: &InteractionCreate, content: &str) -> miette::Result<()> {
	context
		.http_client
		.interaction(context.application_id)
		.create_followup(&interaction.token)
		.content(content)
		.await
		.into_diagnostic()?;
	Ok(())
}
