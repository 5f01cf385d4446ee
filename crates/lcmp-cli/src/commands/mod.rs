pub mod compare;
pub mod explain;
pub mod render;
pub mod rules;
