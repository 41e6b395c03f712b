pub mod events;
pub mod public_key;
pub mod server;
pub mod shell_user;
