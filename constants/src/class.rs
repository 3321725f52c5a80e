/// Reserved class name marking cells excluded from rendering and tree construction.
pub const EXCLUDED_CLASS: &str = "ZeroXXX";

/// Separator between hierarchy levels in a class name ("Astro.1" -> Astro > 1).
pub const CLASS_NAME_SEPARATOR: char = '.';

/// Fixed label of the class filter tree root.
pub const CLASS_TREE_ROOT_LABEL: &str = "Cell Classes";

/// Whether a class name takes part in rendering and tree construction.
pub fn is_renderable_class(name: &str) -> bool {
    name != EXCLUDED_CLASS
}
