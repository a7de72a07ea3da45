// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::database::StoreError;
use crate::discord::context::BotContext;
use crate::discord::utils::options::CommandOptions;
use crate::discord::utils::responses::{
	NOT_IN_GUILD, SOMETHING_WENT_WRONG, embed_response, format_money, respond, text_response,
};
use crate::discord::utils::timestamp::relative_time;
use crate::discord::utils::users::interaction_user_data;
use crate::economy::catalog::title_case;
use crate::economy::{ClaimOutcome, CrimeOutcome, PurchaseOutcome, RobOutcome, WorkOutcome};
use chrono::Utc;
use miette::bail;
use rand::SeedableRng;
use rand::rngs::StdRng;
use twilight_mention::fmt::Mention;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::http::interaction::InteractionResponse;
use twilight_model::id::Id;
use twilight_model::id::marker::UserMarker;
use twilight_util::builder::command::{CommandBuilder, IntegerBuilder, StringBuilder, UserBuilder};
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder};
use twilight_validate::embed::FIELD_COUNT;

const ECONOMY_COLOR: u32 = 0xF1C40F;

fn guild_command(name: &str, description: &str) -> CommandBuilder {
	CommandBuilder::new(name, description, CommandType::ChatInput).contexts([InteractionContextType::Guild])
}

pub fn command_definitions() -> Vec<Command> {
	let rob_target = UserBuilder::new("target", "The member to rob").required(true).build();
	let item = StringBuilder::new("item", "The item to buy").required(true).build();
	let quantity = IntegerBuilder::new("quantity", "How many to buy")
		.min_value(1)
		.required(false)
		.build();

	vec![
		guild_command("balance", "Check your balance").build(),
		guild_command("work", "Work a job to earn money").build(),
		guild_command("claim", "Claim the income from your roles").build(),
		guild_command("rob", "Try to rob another member").option(rob_target).build(),
		guild_command("crime", "Commit a crime for a chance at a reward").build(),
		guild_command("buy", "Buy an item from the shop")
			.option(item)
			.option(quantity)
			.build(),
		guild_command("shop", "See what's for sale").build(),
		guild_command("inventory", "See the items you own").build(),
	]
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let Some(user) = interaction.author_id() else {
		bail!("Economy command {} was used without an author", command_data.name);
	};
	let options = CommandOptions::new(&command_data.name, &command_data.options);

	let reply = match command_data.name.as_str() {
		"balance" => balance(context, user),
		"work" => work(context, user).await,
		"claim" => claim(interaction, context, user).await,
		"rob" => {
			let target = options.required_user("target")?;
			rob(context, user, target).await
		}
		"crime" => crime(context, user).await,
		"buy" => {
			let item = options.required_string("item")?;
			let quantity = options.integer("quantity")?.unwrap_or(1);
			buy(context, user, item, quantity).await
		}
		"shop" => shop(context),
		"inventory" => inventory(interaction, context, user),
		_ => bail!("Unknown economy command: {}", command_data.name),
	};

	match reply {
		Ok(response) => respond(context, interaction, &response).await,
		Err(error) => {
			respond(context, interaction, &text_response(SOMETHING_WENT_WRONG, true)).await?;
			Err(error.into())
		}
	}
}

fn balance(context: &BotContext, user: Id<UserMarker>) -> Result<InteractionResponse, StoreError> {
	let balance = context.economy.balance(user)?;
	Ok(text_response(
		format!("💰 {}, you have **{}**", user.mention(), format_money(balance)),
		false,
	))
}

async fn work(context: &BotContext, user: Id<UserMarker>) -> Result<InteractionResponse, StoreError> {
	let mut rng = StdRng::from_entropy();
	let content = match context.economy.work(user, &mut rng).await? {
		WorkOutcome::Paid { job, amount, .. } => {
			format!("🛠️ You worked as a **{}** and earned **{}**!", job, format_money(amount))
		}
		WorkOutcome::NoJobs => {
			return Ok(text_response(
				"No jobs available. Ask an admin to add some using `/addjob`.",
				true,
			));
		}
	};
	Ok(text_response(content, false))
}

async fn claim(
	interaction: &InteractionCreate,
	context: &BotContext,
	user: Id<UserMarker>,
) -> Result<InteractionResponse, StoreError> {
	let (Some(guild), Some(member)) = (interaction.guild_id, interaction.member.as_ref()) else {
		return Ok(text_response(NOT_IN_GUILD, true));
	};

	let outcome = context.economy.claim(user, guild, &member.roles, Utc::now()).await?;
	let response = match outcome {
		ClaimOutcome::OnCooldown { available_at } => text_response(
			format!(
				"🕒 You already claimed your role income. Come back {}!",
				relative_time(available_at)
			),
			true,
		),
		ClaimOutcome::Claimed { incomes, .. } if incomes.is_empty() => text_response(
			"✅ Claim successful, but none of your roles have income configured.\n-# If you are an admin, use `/addroleincome` to set income for roles.",
			false,
		),
		ClaimOutcome::Claimed { total, incomes } => {
			let mut content = format!("💼 You claimed **{}** from your roles.", format_money(total));
			for income in incomes.iter() {
				content.push_str(&format!(
					"\n-# {}: {}",
					income.get_role().mention(),
					format_money(income.income_amount)
				));
			}
			text_response(content, false)
		}
	};
	Ok(response)
}

async fn rob(
	context: &BotContext,
	robber: Id<UserMarker>,
	target: Id<UserMarker>,
) -> Result<InteractionResponse, StoreError> {
	let mut rng = StdRng::from_entropy();
	let response = match context.economy.rob(robber, target, &mut rng).await? {
		RobOutcome::SelfTarget => text_response("You can't rob yourself.", true),
		RobOutcome::TargetTooPoor => text_response("Target doesn't have enough money.", true),
		RobOutcome::Succeeded { amount } => text_response(
			format!(
				"💰 You successfully robbed {} for **{}**!",
				target.mention(),
				format_money(amount)
			),
			false,
		),
		RobOutcome::Caught { amount } => text_response(
			format!("🚓 You got caught and lost **{}**!", format_money(amount)),
			false,
		),
	};
	Ok(response)
}

async fn crime(context: &BotContext, user: Id<UserMarker>) -> Result<InteractionResponse, StoreError> {
	let mut rng = StdRng::from_entropy();
	let response = match context.economy.crime(user, &mut rng).await? {
		CrimeOutcome::Succeeded { crime, reward, .. } => text_response(
			format!(
				"🦹‍♂️ You succeeded in **{}** and earned **{}**!",
				crime,
				format_money(reward)
			),
			false,
		),
		CrimeOutcome::Failed { crime, loss, .. } => text_response(
			format!("👮 You failed in **{}** and lost **{}**!", crime, format_money(loss)),
			false,
		),
		CrimeOutcome::NoCrimes => text_response(
			"No crimes available. Ask an admin to add some using `/addrobbery`.",
			true,
		),
	};
	Ok(response)
}

async fn buy(
	context: &BotContext,
	user: Id<UserMarker>,
	item: &str,
	quantity: i64,
) -> Result<InteractionResponse, StoreError> {
	let response = match context.economy.buy(user, item, quantity).await? {
		PurchaseOutcome::Bought { item, quantity, cost } => text_response(
			format!(
				"✅ You bought {}x **{}** for **{}**",
				quantity,
				title_case(&item),
				format_money(cost)
			),
			false,
		),
		PurchaseOutcome::UnknownItem => text_response("Item not found.", true),
		PurchaseOutcome::InsufficientFunds { cost, balance } => text_response(
			format!(
				"You don't have enough money. That costs **{}** and you have **{}**.",
				format_money(cost),
				format_money(balance)
			),
			true,
		),
		PurchaseOutcome::InvalidQuantity => text_response("You can't buy that many.", true),
	};
	Ok(response)
}

fn shop(context: &BotContext) -> Result<InteractionResponse, StoreError> {
	let items = context.economy.shop_items()?;
	if items.is_empty() {
		return Ok(text_response("No items in the shop.", true));
	}

	let mut embed = EmbedBuilder::new().title("🛒 Shop").color(ECONOMY_COLOR);
	for item in items.iter().take(FIELD_COUNT) {
		embed = embed.field(EmbedFieldBuilder::new(title_case(&item.name), format_money(item.price)).inline());
	}
	Ok(embed_response(embed.build(), Vec::new(), false))
}

fn inventory(
	interaction: &InteractionCreate,
	context: &BotContext,
	user: Id<UserMarker>,
) -> Result<InteractionResponse, StoreError> {
	let entries = context.economy.inventory(user)?;
	if entries.is_empty() {
		return Ok(text_response("Your inventory is empty.", true));
	}

	let title = match interaction_user_data(interaction) {
		Some(user_data) => format!("{}'s Inventory", user_data.display_name),
		None => String::from("Inventory"),
	};
	let mut embed = EmbedBuilder::new().title(title).color(ECONOMY_COLOR);
	for entry in entries.iter().take(FIELD_COUNT) {
		embed = embed.field(EmbedFieldBuilder::new(title_case(&entry.item_name), format!("x{}", entry.quantity)).inline());
	}
	Ok(embed_response(embed.build(), Vec::new(), true))
}
