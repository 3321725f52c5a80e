/// Cell dataset records and the sentinel-filtered instance store.
pub mod cell_dataset;

/// Per-cell spot documents and the gene colour lookup sheet.
pub mod enrichment;

/// Surface-detail normal map with flat fallback on load failure.
pub mod surface_textures;
