//! Knowledge points - the fundamental unit of extracted document content

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Category of a knowledge point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeType {
    /// A definition or concept
    Concept,
    /// A theorem, lemma, or formula (with its proof if present)
    Theorem,
    /// A worked example
    Example,
    /// An exercise, possibly awaiting an answer
    Exercise,
    /// Anything that does not fit the other categories
    Other,
}

impl KnowledgeType {
    /// Coerce a raw model-reported type string; anything unrecognized
    /// becomes [`KnowledgeType::Other`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "concept" => KnowledgeType::Concept,
            "theorem" => KnowledgeType::Theorem,
            "example" => KnowledgeType::Example,
            "exercise" => KnowledgeType::Exercise,
            _ => KnowledgeType::Other,
        }
    }

    /// Lowercase wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            KnowledgeType::Concept => "concept",
            KnowledgeType::Theorem => "theorem",
            KnowledgeType::Example => "example",
            KnowledgeType::Exercise => "exercise",
            KnowledgeType::Other => "other",
        }
    }
}

/// One self-contained unit of extracted document content.
///
/// Ids are batch-scoped on extraction and remapped to globally unique ids
/// (`b{batch}_t{worker}_{raw}`) before entering a document's knowledge tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    /// Unique identifier within the owning document
    pub id: String,
    /// Short title for tree display and context passing
    pub title: String,
    /// Full content, original wording preserved
    pub content: String,
    /// Category
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
    /// Hierarchy depth, 0 at the root
    pub level: u32,
    /// Parent id within the same document, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Child ids within the same document
    #[serde(default)]
    pub children: Vec<String>,
    /// Selected for question generation
    #[serde(default)]
    pub selected: bool,
    /// Whether an answer is attached (exercises only carry meaning here)
    pub has_answer: bool,
    /// Answer content, once matched or extracted inline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Question number used for answer matching (e.g. "1", "2.3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_number: Option<String>,
    /// Ordered id chain from root to self, derived from `parent_id` links
    #[serde(default)]
    pub ancestor_path: Vec<String>,
    /// Creation timestamp (epoch millis)
    pub created_at: u64,
}

impl KnowledgePoint {
    /// Short summary carried in the learning context.
    pub fn summary(&self) -> KnowledgeSummary {
        KnowledgeSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            kind: self.kind,
        }
    }
}

/// Compact reference to a recently extracted knowledge point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSummary {
    /// Id of the referenced knowledge point
    pub id: String,
    /// Its short title
    pub title: String,
    /// Its category
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
}

/// Rebuild `ancestor_path` for every point from its `parent_id` chain.
///
/// Parent links come from model output and may be malformed; a seen-set
/// guards the walk so it terminates even when the links form a cycle, and a
/// path never contains duplicate ids. Parents outside the slice still appear
/// in the path (the link is kept, the walk just stops there).
pub fn build_ancestor_paths(points: &mut [KnowledgePoint]) {
    let parent_by_id: HashMap<String, Option<String>> = points
        .iter()
        .map(|kp| (kp.id.clone(), kp.parent_id.clone()))
        .collect();

    for kp in points.iter_mut() {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = Some(kp.id.clone());
        while let Some(id) = cur {
            if !seen.insert(id.clone()) {
                break;
            }
            cur = parent_by_id.get(&id).cloned().flatten();
            path.push(id);
        }
        path.reverse();
        kp.ancestor_path = path;
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn point(i: usize) -> KnowledgePoint {
        KnowledgePoint {
            id: i.to_string(),
            title: String::new(),
            content: String::new(),
            kind: KnowledgeType::Other,
            level: 0,
            parent_id: None,
            children: Vec::new(),
            selected: false,
            has_answer: true,
            answer: None,
            question_number: None,
            ancestor_path: Vec::new(),
            created_at: 0,
        }
    }

    proptest! {
        /// Property: ancestor-path computation terminates and is duplicate-free
        /// for arbitrary (possibly cyclic) parent links.
        #[test]
        fn test_paths_terminate(parents in proptest::collection::vec(proptest::option::of(0usize..8), 8)) {
            let mut points: Vec<KnowledgePoint> = parents
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let mut k = point(i);
                    k.parent_id = p.map(|p| p.to_string());
                    k
                })
                .collect();
            build_ancestor_paths(&mut points);
            for kp in &points {
                let unique: std::collections::HashSet<_> = kp.ancestor_path.iter().collect();
                prop_assert_eq!(unique.len(), kp.ancestor_path.len());
                prop_assert_eq!(kp.ancestor_path.last(), Some(&kp.id));
            }
        }
    }
}
