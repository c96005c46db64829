//! Database entities.

pub mod users;

pub mod prelude {
    pub use super::users::Entity as Users;
}
