//! Discovery side: the raw table, class mapping, and the containment tree.

pub mod class_mapper;
pub mod table;
pub mod tree;
