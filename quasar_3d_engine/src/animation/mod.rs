/// Animation module - skeletal animation evaluation

pub mod animator;

pub use animator::*;
