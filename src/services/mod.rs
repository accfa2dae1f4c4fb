// Services module - external collaborators and command handling

pub mod bank;
pub mod notifier;
pub mod pairing;
pub mod telegram;
pub mod xcontest;
