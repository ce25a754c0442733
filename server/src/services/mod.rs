//! Services module
//!
//! Business logic services that coordinate between handlers, the
//! repository and the blob store.

pub mod catalog;
pub mod identity;
pub mod listing;
pub mod sessions;

pub use catalog::{Download, NoteCatalog};
pub use identity::IdentityStore;
pub use listing::ListingService;
pub use sessions::SessionStore;
