//! Lifecycle managers sitting between the HTTP layer and the entity
//! store. All reviewer-rotation policy decisions live here and in
//! `roster_core::selection`; the store only enforces atomicity.

mod pr;
mod team;
mod user;

pub use pr::PrService;
pub use team::TeamService;
pub use user::UserService;
