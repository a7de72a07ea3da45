// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::commands::{command_definitions, route_command};
use super::context::BotContext;
use super::interactions::route_interaction;
use crate::config::ConfigData;
use crate::database::DbPool;
use crate::economy::Economy;
use crate::economy::cooldown::ClaimCooldown;
use crate::economy::ledger::PgLedger;
use crate::locks::KeyedLocks;
use crate::moderation::mutes::MuteService;
use crate::moderation::reconciler::MuteReconciler;
use crate::moderation::restrictions::RoleRestrictions;
use crate::moderation::store::PgModerationStore;
use miette::IntoDiagnostic;
use std::sync::Arc;
use twilight_cache_inmemory::{DefaultInMemoryCache, ResourceType};
use twilight_gateway::{EventTypeFlags, Intents, Shard, ShardId, StreamExt};
use twilight_http::client::Client;
use twilight_model::application::interaction::InteractionData;
use twilight_model::gateway::event::Event;

pub fn set_up_client(config: &ConfigData) -> Arc<Client> {
	Arc::new(Client::new(config.discord.bot_token.clone()))
}

pub async fn run_bot(db_connection_pool: DbPool, config: Arc<ConfigData>, http_client: Arc<Client>) -> miette::Result<()> {
	let intents = Intents::GUILDS | Intents::GUILD_MEMBERS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;

	let mut shard = Shard::new(ShardId::ONE, config.discord.bot_token.clone(), intents);

	let cache = Arc::new(
		DefaultInMemoryCache::builder()
			.resource_types(ResourceType::all())
			.build(),
	);

	let application_id = {
		let application_response = http_client.current_user_application().await.into_diagnostic()?;
		application_response.model().await.into_diagnostic()?.id
	};
	let bot_user = {
		let user_response = http_client.current_user().await.into_diagnostic()?;
		user_response.model().await.into_diagnostic()?.id
	};

	{
		let interaction_client = http_client.interaction(application_id);
		let commands = command_definitions();
		interaction_client
			.set_global_commands(&commands)
			.await
			.into_diagnostic()?;
	}

	let moderation_store = Arc::new(PgModerationStore::new(db_connection_pool.clone()));
	let restrictions = RoleRestrictions::new(
		Arc::clone(&http_client),
		Arc::clone(&cache),
		config.moderation.muted_role_name.clone(),
	);
	let mutes = Arc::new(MuteService::new(moderation_store, restrictions));

	let reconciler = Arc::new(MuteReconciler::new(Arc::clone(&mutes), bot_user));
	tokio::spawn(reconciler.run(config.moderation.reconcile_interval));

	let economy = Economy::new(
		PgLedger::new(db_connection_pool.clone()),
		ClaimCooldown::new(config.economy.claim_cooldown),
	);

	let context = Arc::new(BotContext {
		http_client,
		application_id,
		bot_user,
		db_connection_pool,
		economy,
		mutes,
		ticket_locks: KeyedLocks::new(),
	});

	while let Some(event) = shard.next_event(EventTypeFlags::all()).await {
		let event = match event {
			Ok(event) => event,
			Err(error) => {
				tracing::warn!(source = ?error, "error receiving event");
				continue;
			}
		};
		cache.update(&event);

		tokio::spawn(handle_event(event, Arc::clone(&context)));
	}

	Ok(())
}

async fn handle_event(event: Event, context: Arc<BotContext>) {
	let event_result = handle_event_route(event, &context).await;
	if let Err(error) = event_result {
		tracing::error!(source = ?error, "An error occurred handling a gateway event");
	}
}

async fn handle_event_route(event: Event, context: &BotContext) -> miette::Result<()> {
	tracing::debug!("Incoming gateway message: {:?}", event);
	match event {
		Event::InteractionCreate(interaction) => match &interaction.data {
			Some(InteractionData::ApplicationCommand(command_data)) => {
				route_command(&interaction, command_data, context).await?;
			}
			Some(InteractionData::MessageComponent(interaction_data)) => {
				route_interaction(&interaction, interaction_data, context).await?;
			}
			_ => (),
		},
		Event::Ready(ready) => {
			tracing::info!(user = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway is ready");
		}
		_ => (),
	}
	Ok(())
}
