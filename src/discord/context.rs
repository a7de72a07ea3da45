// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::DbPool;
use crate::economy::Economy;
use crate::economy::ledger::PgLedger;
use crate::locks::KeyedLocks;
use crate::moderation::mutes::MuteService;
use crate::moderation::restrictions::RoleRestrictions;
use crate::moderation::store::PgModerationStore;
use std::sync::Arc;
use twilight_http::client::Client;
use twilight_model::id::Id;
use twilight_model::id::marker::{ApplicationMarker, GuildMarker, UserMarker};

pub type BotMuteService = MuteService<PgModerationStore, RoleRestrictions>;

/// Everything an event handler might need, shared between all of them
pub struct BotContext {
	pub http_client: Arc<Client>,
	pub application_id: Id<ApplicationMarker>,
	pub bot_user: Id<UserMarker>,
	pub db_connection_pool: DbPool,
	pub economy: Economy<PgLedger>,
	pub mutes: Arc<BotMuteService>,
	/// Held while a member's ticket is being opened, so they can't open two at once
	pub ticket_locks: KeyedLocks<(Id<GuildMarker>, Id<UserMarker>)>,
}
