pub mod connection;
pub mod geometry;
pub mod item;
pub mod layout;
pub mod node;
pub mod scene;
