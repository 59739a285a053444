pub mod accept_kit_command;
pub mod create_kit_command;
pub mod reject_kit_command;
