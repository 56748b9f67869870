//! Specialized collection types

pub use slotmap::{new_key_type, SlotMap, SecondaryMap};

new_key_type! {
    /// Stable handle to a node stored in a [`crate::scene::SceneGraph`]
    pub struct NodeHandle;
}
