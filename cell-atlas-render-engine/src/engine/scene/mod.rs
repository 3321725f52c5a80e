/// Instanced front/back cell batch construction from the filtered dataset.
pub mod cell_batches;

/// Camera-distance detail selection over the precomputed sphere levels.
pub mod lod;

/// Dataset loading and one-shot scene assembly.
pub mod setup;
