pub mod prelude;

pub mod matches;
pub mod predictions;
pub mod users;
