pub mod accept_return_command;
pub mod create_return_command;
pub mod reject_return_command;
