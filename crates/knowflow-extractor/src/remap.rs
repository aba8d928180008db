//! Batch-scoped id remapping
//!
//! Extraction ids are only unique within one model response. Before merging
//! into the document tree, each worker's yield gets a worker prefix
//! (`t{worker}_`) and the combined batch a batch prefix (`b{batch}_`), so
//! ids stay globally unique across batches and workers without a central
//! allocator. Both passes rewrite parent/children references and rebuild
//! ancestor paths.

use knowflow_domain::{build_ancestor_paths, KnowledgePoint};
use std::collections::HashMap;

/// Prefix for worker `index` within a batch.
pub fn worker_prefix(index: usize) -> String {
    format!("t{}_", index)
}

/// Prefix for committed batch number `index`.
pub fn batch_prefix(index: u32) -> String {
    format!("b{}_", index)
}

/// Prepend `prefix` to every id, rewriting parent and children references
/// that point inside the slice; references to ids outside it are left
/// untouched. Ancestor paths are rebuilt afterwards.
pub fn remap_with_prefix(prefix: &str, points: &mut Vec<KnowledgePoint>) {
    let id_map: HashMap<String, String> = points
        .iter()
        .map(|kp| (kp.id.clone(), format!("{}{}", prefix, kp.id)))
        .collect();

    for kp in points.iter_mut() {
        if let Some(mapped) = id_map.get(&kp.id) {
            kp.id = mapped.clone();
        }
        if let Some(parent) = &kp.parent_id {
            if let Some(mapped) = id_map.get(parent) {
                kp.parent_id = Some(mapped.clone());
            }
        }
        for child in kp.children.iter_mut() {
            if let Some(mapped) = id_map.get(child) {
                *child = mapped.clone();
            }
        }
    }

    build_ancestor_paths(points);
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowflow_domain::KnowledgeType;

    fn kp(id: &str, parent: Option<&str>, children: &[&str]) -> KnowledgePoint {
        KnowledgePoint {
            id: id.to_string(),
            title: String::new(),
            content: String::new(),
            kind: KnowledgeType::Concept,
            level: 0,
            parent_id: parent.map(String::from),
            children: children.iter().map(|c| c.to_string()).collect(),
            selected: false,
            has_answer: true,
            answer: None,
            question_number: None,
            ancestor_path: Vec::new(),
            created_at: 0,
        }
    }

    #[test]
    fn test_remap_rewrites_references() {
        let mut points = vec![kp("1", None, &["2"]), kp("2", Some("1"), &[])];
        remap_with_prefix("b3_", &mut points);

        assert_eq!(points[0].id, "b3_1");
        assert_eq!(points[0].children, vec!["b3_2"]);
        assert_eq!(points[1].parent_id.as_deref(), Some("b3_1"));
        assert_eq!(points[1].ancestor_path, vec!["b3_1", "b3_2"]);
    }

    #[test]
    fn test_remap_leaves_external_references() {
        // A parent from an earlier batch keeps its already-final id.
        let mut points = vec![kp("1", Some("b1_t0_4"), &[])];
        remap_with_prefix("b2_", &mut points);

        assert_eq!(points[0].id, "b2_1");
        assert_eq!(points[0].parent_id.as_deref(), Some("b1_t0_4"));
    }

    #[test]
    fn test_layered_prefixes_encode_batch_and_worker() {
        let mut points = vec![kp("1", None, &[])];
        remap_with_prefix(&worker_prefix(1), &mut points);
        remap_with_prefix(&batch_prefix(4), &mut points);
        assert_eq!(points[0].id, "b4_t1_1");
    }

    #[test]
    fn test_ids_unique_across_workers_and_batches() {
        let mut seen = std::collections::HashSet::new();
        for batch in 1..=3u32 {
            let mut combined = Vec::new();
            for worker in 0..2usize {
                let mut points = vec![kp("1", None, &[]), kp("2", None, &[])];
                remap_with_prefix(&worker_prefix(worker), &mut points);
                combined.extend(points);
            }
            remap_with_prefix(&batch_prefix(batch), &mut combined);
            for point in &combined {
                assert!(seen.insert(point.id.clone()), "duplicate id {}", point.id);
            }
        }
        assert_eq!(seen.len(), 12);
    }
}
