pub mod channel_commands;
pub mod event_commands;
