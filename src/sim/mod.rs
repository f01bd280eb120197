pub mod engine;
pub mod layers;
pub mod photon;
pub mod tissue;
