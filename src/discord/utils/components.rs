// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use twilight_model::channel::message::EmojiReactionType;
use twilight_model::channel::message::component::{ActionRow, Button, ButtonStyle, Component};

pub const CREATE_TICKET_ID: &str = "ticket/create";
pub const CLOSE_TICKET_ID: &str = "ticket/close";
pub const DELETE_TICKET_ID: &str = "ticket/delete";

fn single_button(custom_id: &str, label: &str, emoji: &str, style: ButtonStyle) -> Component {
	let button = Button {
		custom_id: Some(String::from(custom_id)),
		disabled: false,
		emoji: Some(EmojiReactionType::Unicode {
			name: String::from(emoji),
		}),
		label: Some(String::from(label)),
		style,
		url: None,
		sku_id: None,
	};
	Component::ActionRow(ActionRow {
		components: vec![Component::Button(button)],
	})
}

pub fn create_ticket_button() -> Component {
	single_button(CREATE_TICKET_ID, "Create Ticket", "🎫", ButtonStyle::Primary)
}

pub fn close_ticket_button() -> Component {
	single_button(CLOSE_TICKET_ID, "Close the ticket", "🔒", ButtonStyle::Danger)
}

pub fn delete_ticket_button() -> Component {
	single_button(DELETE_TICKET_ID, "Delete the ticket", "🗑️", ButtonStyle::Danger)
}
