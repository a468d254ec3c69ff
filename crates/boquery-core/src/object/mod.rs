//! Business objects and the identity map.

mod business_object;
mod key;
mod manager;

pub use business_object::{BusinessObject, ObjectStatus};
pub use key::ObjectKey;
pub use manager::ObjectManager;
