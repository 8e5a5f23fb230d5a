//! Shared ids and value types used by every zonesim crate.

pub mod types;

pub use types::{
    Capabilities, EntityKind, EntityState, Placement, PlayerInput, SessionId, Stat,
};
