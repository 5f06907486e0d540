//! The shared board: canonical store, demo seed, and the client-side mirror.

pub mod mirror;
pub mod seed;
pub mod store;

pub use mirror::BoardMirror;
pub use store::{BoardStore, StoreHandle};
