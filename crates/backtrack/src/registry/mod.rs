mod arena;
mod entity;

pub use arena::EntityRegistry;
pub use entity::{EntityId, EntityTrack};
