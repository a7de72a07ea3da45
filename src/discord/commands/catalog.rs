// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Administrator commands for the jobs, crimes, shop items, and role incomes the economy draws from.

use crate::database::StoreError;
use crate::discord::context::BotContext;
use crate::discord::utils::options::CommandOptions;
use crate::discord::utils::responses::{SOMETHING_WENT_WRONG, format_money, respond, text_response};
use crate::economy::catalog::{self, title_case};
use miette::bail;
use twilight_mention::fmt::Mention;
use twilight_model::application::command::{Command, CommandType};
use twilight_model::application::interaction::InteractionContextType;
use twilight_model::application::interaction::application_command::CommandData;
use twilight_model::gateway::payload::incoming::InteractionCreate;
use twilight_model::guild::Permissions;
use twilight_model::id::Id;
use twilight_model::id::marker::RoleMarker;
use twilight_util::builder::command::{CommandBuilder, IntegerBuilder, NumberBuilder, RoleBuilder, StringBuilder};

fn admin_command(name: &str, description: &str) -> CommandBuilder {
	CommandBuilder::new(name, description, CommandType::ChatInput)
		.contexts([InteractionContextType::Guild])
		.default_member_permissions(Permissions::ADMINISTRATOR)
}

fn name_option(description: &str) -> StringBuilder {
	StringBuilder::new("name", description).required(true)
}

fn amount_option(name: &str, description: &str) -> IntegerBuilder {
	IntegerBuilder::new(name, description).min_value(0).required(true)
}

pub fn command_definitions() -> Vec<Command> {
	vec![
		admin_command("addjob", "Add a job that members can work")
			.option(name_option("The name of the job"))
			.option(amount_option("min", "The smallest payout"))
			.option(amount_option("max", "The largest payout"))
			.build(),
		admin_command("removejob", "Remove a job")
			.option(name_option("The name of the job"))
			.build(),
		admin_command("addrobbery", "Add a crime that members can commit")
			.option(name_option("The name of the crime"))
			.option(
				NumberBuilder::new("chance", "Chance of success, from 0 to 100")
					.min_value(0.0)
					.max_value(100.0)
					.required(true),
			)
			.option(amount_option("min", "The smallest reward or loss"))
			.option(amount_option("max", "The largest reward or loss"))
			.build(),
		admin_command("removerobbery", "Remove a crime")
			.option(name_option("The name of the crime"))
			.build(),
		admin_command("additem", "Add an item to the shop")
			.option(name_option("The name of the item"))
			.option(amount_option("price", "The price of one item"))
			.build(),
		admin_command("removeitem", "Remove an item from the shop")
			.option(name_option("The name of the item"))
			.build(),
		admin_command("addroleincome", "Set the income members of a role receive when they claim")
			.option(RoleBuilder::new("role", "The role to pay").required(true))
			.option(amount_option("amount", "The income paid per claim"))
			.build(),
		admin_command("removeroleincome", "Stop paying income to a role")
			.option(RoleBuilder::new("role", "The role to stop paying").required(true))
			.build(),
	]
}

/// What an administrator asked for, once the options are read
enum CatalogChange<'a> {
	AddJob { name: &'a str, min: i64, max: i64 },
	RemoveJob(&'a str),
	AddCrime { name: &'a str, chance: f64, min: i64, max: i64 },
	RemoveCrime(&'a str),
	AddItem { name: &'a str, price: i64 },
	RemoveItem(&'a str),
	AddRoleIncome { role: Id<RoleMarker>, amount: i64 },
	RemoveRoleIncome(Id<RoleMarker>),
}

fn read_change<'a>(command_data: &'a CommandData) -> miette::Result<CatalogChange<'a>> {
	let options = CommandOptions::new(&command_data.name, &command_data.options);
	let change = match command_data.name.as_str() {
		"addjob" => CatalogChange::AddJob {
			name: options.required_string("name")?,
			min: options.required_integer("min")?,
			max: options.required_integer("max")?,
		},
		"removejob" => CatalogChange::RemoveJob(options.required_string("name")?),
		"addrobbery" => CatalogChange::AddCrime {
			name: options.required_string("name")?,
			chance: options.required_number("chance")?,
			min: options.required_integer("min")?,
			max: options.required_integer("max")?,
		},
		"removerobbery" => CatalogChange::RemoveCrime(options.required_string("name")?),
		"additem" => CatalogChange::AddItem {
			name: options.required_string("name")?,
			price: options.required_integer("price")?,
		},
		"removeitem" => CatalogChange::RemoveItem(options.required_string("name")?),
		"addroleincome" => CatalogChange::AddRoleIncome {
			role: options.required_role("role")?,
			amount: options.required_integer("amount")?,
		},
		"removeroleincome" => CatalogChange::RemoveRoleIncome(options.required_role("role")?),
		_ => bail!("Unknown catalog command: {}", command_data.name),
	};
	Ok(change)
}

pub async fn handle_command(
	interaction: &InteractionCreate,
	command_data: &CommandData,
	context: &BotContext,
) -> miette::Result<()> {
	let change = read_change(command_data)?;

	match apply_change(context, change) {
		Ok(content) => respond(context, interaction, &text_response(content, true)).await,
		Err(error) => {
			respond(context, interaction, &text_response(SOMETHING_WENT_WRONG, true)).await?;
			Err(error.into())
		}
	}
}

/// Applies the change and describes the result for the administrator. Invalid entries are described, not stored.
fn apply_change(
	context: &BotContext,
	change: CatalogChange<'_>,
) -> Result<String, StoreError> {
	let economy = &context.economy;
	let content = match change {
		CatalogChange::AddJob { name, min, max } => {
			let job = match catalog::job(name, min, max) {
				Ok(job) => job,
				Err(invalid) => return Ok(format!("❌ {}", invalid)),
			};
			economy.add_job(&job)?;
			format!(
				"✅ Job **{}** added with payout range {}–{}",
				job.name,
				format_money(job.payout_min),
				format_money(job.payout_max)
			)
		}
		CatalogChange::RemoveJob(name) => {
			if economy.remove_job(name)? {
				format!("🗑️ Job **{}** removed.", name.trim())
			} else {
				format!("❌ No job named **{}** found.", name.trim())
			}
		}
		CatalogChange::AddCrime { name, chance, min, max } => {
			let crime = match catalog::crime(name, chance, min, max) {
				Ok(crime) => crime,
				Err(invalid) => return Ok(format!("❌ {}", invalid)),
			};
			economy.add_crime(&crime)?;
			format!(
				"✅ Robbery **{}** added with success chance {:.2}% and reward range {}–{}",
				crime.name,
				crime.success_chance,
				format_money(crime.reward_min),
				format_money(crime.reward_max)
			)
		}
		CatalogChange::RemoveCrime(name) => {
			if economy.remove_crime(name)? {
				format!("🗑️ Robbery **{}** removed.", name.trim())
			} else {
				format!("❌ No robbery named **{}** found.", name.trim())
			}
		}
		CatalogChange::AddItem { name, price } => {
			let item = match catalog::shop_item(name, price) {
				Ok(item) => item,
				Err(invalid) => return Ok(format!("❌ {}", invalid)),
			};
			economy.add_shop_item(&item)?;
			format!(
				"🛍️ Added item **{}** for {}",
				title_case(&item.name),
				format_money(item.price)
			)
		}
		CatalogChange::RemoveItem(name) => {
			if economy.remove_shop_item(name)? {
				format!("🗑️ Item **{}** removed from the shop.", title_case(name.trim()))
			} else {
				format!("❌ No item named **{}** found.", name.trim())
			}
		}
		CatalogChange::AddRoleIncome { role, amount } => {
			let income = match catalog::role_income(role, amount) {
				Ok(income) => income,
				Err(invalid) => return Ok(format!("❌ {}", invalid)),
			};
			economy.add_role_income(&income)?;
			format!(
				"✅ Set role {} to receive {} on claim.",
				role.mention(),
				format_money(income.income_amount)
			)
		}
		CatalogChange::RemoveRoleIncome(role) => {
			if economy.remove_role_income(role)? {
				format!("🗑️ Removed income for role {}.", role.mention())
			} else {
				format!("❌ No income set for role {}.", role.mention())
			}
		}
	};
	Ok(content)
}
