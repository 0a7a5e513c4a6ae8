pub use super::matches::Entity as Matches;
pub use super::predictions::Entity as Predictions;
pub use super::users::Entity as Users;
