pub mod card;
pub mod contract;
pub mod profile;
pub mod recommendation;
