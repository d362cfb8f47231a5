//! Terrain collaborator interface and the collision boxes it is built from.

pub mod boxes;
pub mod terrain;

pub use boxes::{Aabb, BoxHit, CollisionBox};
pub use terrain::{BoxTerrain, FlatGround, GroundContact, NoTerrain, TerrainQuery};
