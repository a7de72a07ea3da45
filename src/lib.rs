// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod database;
pub mod discord;
pub mod economy;
pub mod locks;
pub mod model;
pub mod moderation;
pub mod schema;
pub mod tickets;
