// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The platform side of a mute: the muted role and who holds it.

use async_trait::async_trait;
use miette::Diagnostic;
use std::fmt;
use std::sync::Arc;
use twilight_cache_inmemory::DefaultInMemoryCache;
use twilight_http::client::Client;
use twilight_http::error::{Error, ErrorType};
use twilight_http::request::AuditLogReason;
use twilight_http::response::{DeserializeBodyError, StatusCode};
use twilight_model::guild::Permissions;
use twilight_model::http::permission_overwrite::{PermissionOverwrite, PermissionOverwriteType};
use twilight_model::id::Id;
use twilight_model::id::marker::{GuildMarker, RoleMarker, UserMarker};

/// Errors from talking to the chat platform
#[derive(Debug, Diagnostic)]
pub enum PlatformError {
	Http(Error),
	Deserialize(DeserializeBodyError),
}

impl PlatformError {
	/// Whether the platform reported that the thing we tried to act on doesn't exist (anymore)
	pub fn is_not_found(&self) -> bool {
		match self {
			Self::Http(error) => matches!(error.kind(), ErrorType::Response { status, .. } if *status == StatusCode::NOT_FOUND),
			Self::Deserialize(_) => false,
		}
	}
}

impl From<Error> for PlatformError {
	fn from(error: Error) -> Self {
		Self::Http(error)
	}
}

impl From<DeserializeBodyError> for PlatformError {
	fn from(error: DeserializeBodyError) -> Self {
		Self::Deserialize(error)
	}
}

impl std::error::Error for PlatformError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Http(error) => Some(error),
			Self::Deserialize(error) => Some(error),
		}
	}
}

impl fmt::Display for PlatformError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Http(error) => write!(f, "HTTP error: {}", error),
			Self::Deserialize(error) => write!(f, "deserialization error: {}", error),
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LiftOutcome {
	/// The member was muted and no longer is
	Lifted,
	/// The member is still in the guild but doesn't hold the muted role
	NotHeld,
	/// The guild, member, or muted role no longer exists
	Gone,
}

/// Applies and removes the platform-level restriction behind a mute
#[async_trait]
pub trait Restrictions: Send + Sync {
	async fn is_muted(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, PlatformError>;
	async fn add_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, reason: &str) -> Result<(), PlatformError>;
	async fn remove_mute(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		reason: &str,
	) -> Result<LiftOutcome, PlatformError>;
}

/// Mutes members by giving them the guild's muted role
pub struct RoleRestrictions {
	http_client: Arc<Client>,
	cache: Arc<DefaultInMemoryCache>,
	muted_role_name: String,
}

impl RoleRestrictions {
	pub fn new(http_client: Arc<Client>, cache: Arc<DefaultInMemoryCache>, muted_role_name: String) -> Self {
		Self {
			http_client,
			cache,
			muted_role_name,
		}
	}

	fn cached_muted_role(&self, guild: Id<GuildMarker>) -> Option<Id<RoleMarker>> {
		let role_ids = self.cache.guild_roles(guild)?;
		role_ids.iter().copied().find(|role_id| {
			self.cache
				.role(*role_id)
				.is_some_and(|role| role.resource().name == self.muted_role_name)
		})
	}

	async fn muted_role(&self, guild: Id<GuildMarker>) -> Result<Option<Id<RoleMarker>>, PlatformError> {
		if let Some(role_id) = self.cached_muted_role(guild) {
			return Ok(Some(role_id));
		}
		let roles = self.http_client.roles(guild).await?.models().await?;
		Ok(roles
			.into_iter()
			.find(|role| role.name == self.muted_role_name)
			.map(|role| role.id))
	}

	/// Creates the muted role and denies it speaking in every channel of the guild.
	async fn create_muted_role(&self, guild: Id<GuildMarker>) -> Result<Id<RoleMarker>, PlatformError> {
		let role = self
			.http_client
			.create_role(guild)
			.name(&self.muted_role_name)
			.permissions(Permissions::empty())
			.reason("Needed for muting")
			.await?
			.model()
			.await?;
		tracing::info!(guild = %guild, role = %role.id, "created muted role");

		let overwrite = PermissionOverwrite {
			allow: None,
			deny: Some(Permissions::SEND_MESSAGES | Permissions::ADD_REACTIONS | Permissions::SPEAK),
			id: role.id.cast(),
			kind: PermissionOverwriteType::Role,
		};
		let channels = self.http_client.guild_channels(guild).await?.models().await?;
		for channel in channels {
			let update_result = self
				.http_client
				.update_channel_permission(channel.id, &overwrite)
				.reason("Needed for muting")
				.await;
			if let Err(error) = update_result {
				tracing::debug!(source = ?error, channel = %channel.id, "couldn't restrict muted role in channel");
			}
		}

		Ok(role.id)
	}

	async fn member_roles(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
	) -> Result<Option<Vec<Id<RoleMarker>>>, PlatformError> {
		if let Some(member) = self.cache.member(guild, user) {
			return Ok(Some(member.roles().to_vec()));
		}
		let member_response = match self.http_client.guild_member(guild, user).await {
			Ok(response) => response,
			Err(error) => {
				let error = PlatformError::from(error);
				if error.is_not_found() {
					return Ok(None);
				}
				return Err(error);
			}
		};
		let member = member_response.model().await?;
		Ok(Some(member.roles))
	}
}

#[async_trait]
impl Restrictions for RoleRestrictions {
	async fn is_muted(&self, guild: Id<GuildMarker>, user: Id<UserMarker>) -> Result<bool, PlatformError> {
		let Some(muted_role) = self.muted_role(guild).await? else {
			return Ok(false);
		};
		let roles = self.member_roles(guild, user).await?;
		Ok(roles.is_some_and(|roles| roles.contains(&muted_role)))
	}

	async fn add_mute(&self, guild: Id<GuildMarker>, user: Id<UserMarker>, reason: &str) -> Result<(), PlatformError> {
		let muted_role = match self.muted_role(guild).await? {
			Some(role) => role,
			None => self.create_muted_role(guild).await?,
		};
		self.http_client
			.add_guild_member_role(guild, user, muted_role)
			.reason(reason)
			.await?;
		Ok(())
	}

	async fn remove_mute(
		&self,
		guild: Id<GuildMarker>,
		user: Id<UserMarker>,
		reason: &str,
	) -> Result<LiftOutcome, PlatformError> {
		let muted_role = match self.muted_role(guild).await {
			Ok(Some(role)) => role,
			Ok(None) => return Ok(LiftOutcome::Gone),
			Err(error) if error.is_not_found() => return Ok(LiftOutcome::Gone),
			Err(error) => return Err(error),
		};
		let Some(member_roles) = self.member_roles(guild, user).await? else {
			return Ok(LiftOutcome::Gone);
		};
		if !member_roles.contains(&muted_role) {
			return Ok(LiftOutcome::NotHeld);
		}

		let remove_result = self
			.http_client
			.remove_guild_member_role(guild, user, muted_role)
			.reason(reason)
			.await;
		match remove_result {
			Ok(_) => Ok(LiftOutcome::Lifted),
			Err(error) => {
				let error = PlatformError::from(error);
				if error.is_not_found() {
					Ok(LiftOutcome::Gone)
				} else {
					Err(error)
				}
			}
		}
	}
}
