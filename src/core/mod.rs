//! Core data: activation containers, DNN masks, and stimulus categories.

pub mod activation;
pub mod category;
pub mod mask;
