//! Feature engines. Each owns its in-memory state and talks to the outside
//! world only through the platform and store traits.

pub mod counting;
pub mod embed_builder;
pub mod reaction_roles;
