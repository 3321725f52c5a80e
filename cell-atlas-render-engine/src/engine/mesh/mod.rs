/// Unit sphere construction at the detail levels used by the cell batches.
pub mod cell_sphere;
