pub mod matches;
pub mod predictions;
pub mod settlement;
pub mod user;
