pub mod grid;
pub mod int3;
pub mod piece;
pub mod rng;
pub mod voxel;
