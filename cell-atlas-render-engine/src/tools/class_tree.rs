use crate::engine::assets::cell_dataset::CellRecord;
use constants::class::{CLASS_NAME_SEPARATOR, CLASS_TREE_ROOT_LABEL, is_renderable_class};
use serde::Serialize;
use std::collections::BTreeSet;

/// One node of the class filter tree handed to the frontend tree widget.
///
/// Interior nodes share the cumulative dotted prefix of their subtree; leaves
/// additionally carry `layer` and `id` equal to their full dotted path, which
/// maps selections back to cell records. Serialized field names follow the
/// tree widget's contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassTreeNode {
    pub text: String,
    pub collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(rename = "selectAllCheckbox", skip_serializing_if = "Option::is_none")]
    pub select_all_checkbox: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClassTreeNode>,
}

impl ClassTreeNode {
    fn new(text: String) -> Self {
        Self {
            text,
            collapsed: true,
            id: None,
            layer: None,
            select_all_checkbox: None,
            children: Vec::new(),
        }
    }
}

/// Deduplicated, sorted class names with the sentinel class excluded.
pub fn unique_class_names(records: &[CellRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|record| is_renderable_class(&record.top_class))
        .map(|record| record.top_class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Build the filter tree by inserting each dot-split name under the shared
/// root, so names with common prefixes share one interior node.
pub fn build_class_tree(names: &[String]) -> ClassTreeNode {
    let mut root = ClassTreeNode {
        text: CLASS_TREE_ROOT_LABEL.to_string(),
        collapsed: false,
        id: None,
        layer: None,
        select_all_checkbox: Some(true),
        children: Vec::new(),
    };

    for name in names {
        let segments: Vec<&str> = name.split(CLASS_NAME_SEPARATOR).collect();
        insert_path(&mut root, &segments, "");
    }

    root
}

/// Recursive insert keyed by the dotted prefix accumulated along the path.
fn insert_path(parent: &mut ClassTreeNode, segments: &[&str], prefix: &str) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    let text = if prefix.is_empty() {
        (*head).to_string()
    } else {
        format!("{prefix}{CLASS_NAME_SEPARATOR}{head}")
    };

    let index = match parent.children.iter().position(|child| child.text == text) {
        Some(index) => index,
        None => {
            parent.children.push(ClassTreeNode::new(text.clone()));
            parent.select_all_checkbox = Some(true);
            parent.children.len() - 1
        }
    };

    let child = &mut parent.children[index];
    if rest.is_empty() {
        child.layer = Some(text.clone());
        child.id = Some(text);
    } else {
        insert_path(child, rest, &text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn record(label: &str, class: &str) -> CellRecord {
        CellRecord {
            label: label.to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            r: 0,
            g: 0,
            b: 0,
            top_class: class.to_string(),
        }
    }

    #[test]
    fn names_are_deduplicated_sorted_and_sentinel_free() {
        let records = vec![
            record("c0", "Oligo"),
            record("c1", "Astro.1"),
            record("c2", "ZeroXXX"),
            record("c3", "Astro.1"),
        ];

        assert_eq!(unique_class_names(&records), names(&["Astro.1", "Oligo"]));
    }

    #[test]
    fn shared_prefixes_share_one_parent_node() {
        let tree = build_class_tree(&names(&["Astro.1", "Astro.2", "Oligo"]));

        assert_eq!(tree.text, "Cell Classes");
        assert_eq!(tree.select_all_checkbox, Some(true));
        assert_eq!(tree.children.len(), 2);

        let astro = &tree.children[0];
        assert_eq!(astro.text, "Astro");
        assert_eq!(astro.select_all_checkbox, Some(true));
        assert_eq!(astro.layer, None);
        assert_eq!(astro.children.len(), 2);

        for (child, expected) in astro.children.iter().zip(["Astro.1", "Astro.2"]) {
            assert_eq!(child.text, expected);
            assert_eq!(child.layer.as_deref(), Some(expected));
            assert_eq!(child.id.as_deref(), Some(expected));
            assert!(child.children.is_empty());
        }

        let oligo = &tree.children[1];
        assert_eq!(oligo.text, "Oligo");
        assert_eq!(oligo.layer.as_deref(), Some("Oligo"));
        assert_eq!(oligo.id.as_deref(), Some("Oligo"));
        assert!(oligo.children.is_empty());
    }

    #[test]
    fn a_name_can_be_both_a_leaf_and_a_parent() {
        let tree = build_class_tree(&names(&["Astro", "Astro.1"]));

        let astro = &tree.children[0];
        assert_eq!(astro.layer.as_deref(), Some("Astro"));
        assert_eq!(astro.select_all_checkbox, Some(true));
        assert_eq!(astro.children.len(), 1);
        assert_eq!(astro.children[0].layer.as_deref(), Some("Astro.1"));
    }

    #[test]
    fn deep_paths_accumulate_the_dotted_prefix_at_every_level() {
        let tree = build_class_tree(&names(&["Astro.1.a"]));

        let astro = &tree.children[0];
        assert_eq!(astro.text, "Astro");
        let middle = &astro.children[0];
        assert_eq!(middle.text, "Astro.1");
        assert_eq!(middle.layer, None);
        let leaf = &middle.children[0];
        assert_eq!(leaf.text, "Astro.1.a");
        assert_eq!(leaf.layer.as_deref(), Some("Astro.1.a"));
    }

    #[test]
    fn serialized_shape_matches_the_widget_contract() {
        let tree = build_class_tree(&names(&["Oligo"]));
        let value = serde_json::to_value(&tree).expect("tree serializes");

        assert_eq!(
            value,
            serde_json::json!({
                "text": "Cell Classes",
                "collapsed": false,
                "selectAllCheckbox": true,
                "children": [{
                    "text": "Oligo",
                    "collapsed": true,
                    "id": "Oligo",
                    "layer": "Oligo",
                }],
            })
        );
    }
}
