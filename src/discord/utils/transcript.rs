// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plain-text transcripts of ticket channels.

use super::timestamp::datetime_from_timestamp;
use crate::moderation::restrictions::PlatformError;
use chrono::{DateTime, Utc};
use twilight_http::client::Client;
use twilight_model::channel::Message;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

/// Discord won't return more than this many messages per request
const PAGE_SIZE: u16 = 100;
/// Transcripts stop after this many messages
const MAX_TRANSCRIPT_PAGES: usize = 20;

#[derive(Debug)]
pub struct TranscriptLine {
	pub sent_at: Option<DateTime<Utc>>,
	pub author: String,
	pub content: String,
	pub attachments: Vec<String>,
}

impl From<&Message> for TranscriptLine {
	fn from(message: &Message) -> Self {
		Self {
			sent_at: datetime_from_timestamp(&message.timestamp),
			author: message.author.name.clone(),
			content: message.content.clone(),
			attachments: message.attachments.iter().map(|attachment| attachment.url.clone()).collect(),
		}
	}
}

/// Reads the channel's history, oldest message first
pub async fn fetch_transcript_lines(
	http_client: &Client,
	channel: Id<ChannelMarker>,
) -> Result<Vec<TranscriptLine>, PlatformError> {
	let mut lines = Vec::new();
	let mut before = None;
	for _ in 0..MAX_TRANSCRIPT_PAGES {
		let page = match before {
			Some(message_id) => {
				http_client
					.channel_messages(channel)
					.before(message_id)
					.limit(PAGE_SIZE)
					.await?
					.models()
					.await?
			}
			None => http_client.channel_messages(channel).limit(PAGE_SIZE).await?.models().await?,
		};
		let Some(oldest) = page.last() else {
			break;
		};
		before = Some(oldest.id);
		let page_len = page.len();
		lines.extend(page.iter().map(TranscriptLine::from));
		if page_len < usize::from(PAGE_SIZE) {
			break;
		}
	}
	lines.reverse();
	Ok(lines)
}

pub fn render_transcript(channel_name: &str, lines: &[TranscriptLine]) -> String {
	let mut transcript = format!("Transcript of #{}\n{} messages\n\n", channel_name, lines.len());
	for line in lines {
		let sent_at = match line.sent_at {
			Some(sent_at) => sent_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
			None => String::from("unknown time"),
		};
		transcript.push_str(&format!("[{}] {}: {}\n", sent_at, line.author, line.content));
		for attachment in line.attachments.iter() {
			transcript.push_str(&format!("    attachment: {}\n", attachment));
		}
	}
	transcript
}

pub fn transcript_file_name(channel_name: &str) -> String {
	format!("{}-transcript.txt", channel_name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	#[test]
	fn transcript_lists_messages_in_order() {
		let lines = vec![
			TranscriptLine {
				sent_at: Some(Utc.with_ymd_and_hms(2025, 5, 1, 9, 30, 0).unwrap()),
				author: String::from("alice"),
				content: String::from("my shop purchase vanished"),
				attachments: vec![String::from("https://cdn.example/receipt.png")],
			},
			TranscriptLine {
				sent_at: None,
				author: String::from("staff"),
				content: String::from("looking into it"),
				attachments: Vec::new(),
			},
		];
		let transcript = render_transcript("alice-ticket", &lines);
		assert_eq!(
			transcript,
			"Transcript of #alice-ticket\n2 messages\n\n\
			[2025-05-01 09:30:00 UTC] alice: my shop purchase vanished\n\
			\x20   attachment: https://cdn.example/receipt.png\n\
			[unknown time] staff: looking into it\n"
		);
	}

	#[test]
	fn empty_channels_still_get_a_header() {
		assert_eq!(render_transcript("quiet", &[]), "Transcript of #quiet\n0 messages\n\n");
		assert_eq!(transcript_file_name("quiet"), "quiet-transcript.txt");
	}
}
