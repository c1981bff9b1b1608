// The core module contains all business logic.
// Each feature gets its own submodule; storage and external APIs are
// reached through traits defined next to the services that use them.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "url_safety/mod.rs"]
pub mod url_safety;
