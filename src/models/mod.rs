// Models module - domain entities shared by the pipelines and the store

pub mod flight;
pub mod membership;
pub mod transaction;

pub use flight::{Flight, Pilot};
pub use membership::{Membership, MembershipType};
pub use transaction::Transaction;
