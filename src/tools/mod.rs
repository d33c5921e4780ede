//! Leaf helpers shared by the codec modules.

pub mod bytepack;
