// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use hearthkeeper::config::parse_config;
use hearthkeeper::database::{connect_db, run_embedded_migrations};
use hearthkeeper::discord::{run_bot, set_up_client};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.kdl";

#[tokio::main]
async fn main() -> miette::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config_path = std::env::args()
		.nth(1)
		.unwrap_or_else(|| String::from(DEFAULT_CONFIG_PATH));
	let config = Arc::new(parse_config(&config_path).await?);

	let db_connection_pool = connect_db(&config.database)?;
	run_embedded_migrations(&db_connection_pool)?;
	tracing::info!("database is ready");

	let http_client = set_up_client(&config);
	run_bot(db_connection_pool, config, http_client).await
}
