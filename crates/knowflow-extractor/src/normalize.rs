//! Normalization of parsed model output
//!
//! Turns the recovered JSON value into a canonical extraction response:
//! knowledge points with defaults filled and types coerced, plus the
//! response-level context fields. Individual malformed entries are dropped;
//! the rest of the batch survives.

use knowflow_domain::{
    build_ancestor_paths, KnowledgePoint, KnowledgeType, PendingAnswer, RegionType,
};
use serde_json::Value;

/// Canonical form of one extraction response.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResponse {
    /// Accepted knowledge points, ancestor paths computed
    pub knowledge_points: Vec<KnowledgePoint>,
    /// New hierarchy segment entered on this unit, if any
    pub path_change: Option<String>,
    /// Trailing incomplete content to carry into the next unit
    pub fragment: Option<String>,
    /// Answers the model matched to question numbers on this unit
    pub matched_answers: Vec<PendingAnswer>,
    /// Region the model believes this unit belongs to
    pub region_type: Option<RegionType>,
}

/// Maximum title length synthesized from content when the model omits one.
const SYNTHESIZED_TITLE_CHARS: usize = 60;

/// Normalize a parsed model response.
pub fn normalize_response(value: &Value) -> ExtractionResponse {
    ExtractionResponse {
        knowledge_points: knowledge_points_from(value),
        path_change: non_empty_string(value.get("pathChange")),
        fragment: non_empty_string(value.get("fragment")),
        matched_answers: value
            .get("matchedAnswers")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(answer_from).collect())
            .unwrap_or_default(),
        region_type: value
            .get("regionType")
            .and_then(Value::as_str)
            .and_then(RegionType::from_raw),
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn answer_from(value: &Value) -> Option<PendingAnswer> {
    Some(PendingAnswer {
        question_number: value.get("questionNumber")?.as_str()?.to_string(),
        answer: value.get("answer")?.as_str()?.to_string(),
    })
}

fn knowledge_points_from(value: &Value) -> Vec<KnowledgePoint> {
    let Some(list) = value.get("knowledgePoints").and_then(Value::as_array) else {
        return Vec::new();
    };
    let now = knowflow_domain::epoch_millis();

    let mut points: Vec<KnowledgePoint> = list
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            // Entries without string content are rejected outright
            let content = item.get("content")?.as_str()?.to_string();

            let id = item
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| (idx + 1).to_string());
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| content.chars().take(SYNTHESIZED_TITLE_CHARS).collect());
            let kind = item
                .get("type")
                .and_then(Value::as_str)
                .map(KnowledgeType::from_raw)
                .unwrap_or(KnowledgeType::Other);
            let level = item.get("level").and_then(Value::as_u64).unwrap_or(0) as u32;
            let parent_id = item
                .get("parentId")
                .filter(|v| !v.is_null())
                .and_then(Value::as_str)
                .map(str::to_string);
            let children = item
                .get("children")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .map(|c| match c {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default();
            // Present unless the model explicitly says false
            let has_answer = !matches!(item.get("hasAnswer"), Some(Value::Bool(false)));
            let answer = item.get("answer").and_then(Value::as_str).map(str::to_string);
            let question_number = item
                .get("questionNumber")
                .and_then(Value::as_str)
                .map(str::to_string);

            Some(KnowledgePoint {
                id,
                title,
                content,
                kind,
                level,
                parent_id,
                children,
                selected: false,
                has_answer,
                answer,
                question_number,
                ancestor_path: Vec::new(),
                created_at: now,
            })
        })
        .collect();

    build_ancestor_paths(&mut points);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_response() {
        let value = json!({
            "knowledgePoints": [
                {"id": "1", "title": "t", "content": "c", "type": "exercise",
                 "level": 1, "questionNumber": "1.1", "hasAnswer": false}
            ],
            "pathChange": "Chapter 2",
            "fragment": "half a question",
            "matchedAnswers": [{"questionNumber": "3", "answer": "B"}],
            "regionType": "exercises"
        });
        let response = normalize_response(&value);
        assert_eq!(response.knowledge_points.len(), 1);
        assert_eq!(response.path_change.as_deref(), Some("Chapter 2"));
        assert_eq!(response.fragment.as_deref(), Some("half a question"));
        assert_eq!(response.matched_answers.len(), 1);
        assert_eq!(response.region_type, Some(RegionType::Exercises));

        let kp = &response.knowledge_points[0];
        assert_eq!(kp.kind, KnowledgeType::Exercise);
        assert!(!kp.has_answer);
        assert_eq!(kp.question_number.as_deref(), Some("1.1"));
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let value = json!({"knowledgePoints": [{"content": "only content"}, {"content": "second"}]});
        let points = normalize_response(&value).knowledge_points;
        assert_eq!(points.len(), 2);
        // Positional 1-based ids
        assert_eq!(points[0].id, "1");
        assert_eq!(points[1].id, "2");
        // Title synthesized from content
        assert_eq!(points[0].title, "only content");
        assert_eq!(points[0].kind, KnowledgeType::Other);
        assert_eq!(points[0].level, 0);
        assert!(points[0].has_answer);
    }

    #[test]
    fn test_entries_without_content_dropped() {
        let value = json!({"knowledgePoints": [
            {"title": "no content"},
            {"content": 42},
            {"content": "kept"}
        ]});
        let points = normalize_response(&value).knowledge_points;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].content, "kept");
        // Positional id reflects the original slot
        assert_eq!(points[0].id, "3");
    }

    #[test]
    fn test_unknown_type_coerced_to_other() {
        let value = json!({"knowledgePoints": [{"content": "c", "type": "riddle"}]});
        let points = normalize_response(&value).knowledge_points;
        assert_eq!(points[0].kind, KnowledgeType::Other);
    }

    #[test]
    fn test_ancestor_paths_built() {
        let value = json!({"knowledgePoints": [
            {"id": "1", "content": "parent"},
            {"id": "2", "content": "child", "parentId": "1"}
        ]});
        let points = normalize_response(&value).knowledge_points;
        assert_eq!(points[1].ancestor_path, vec!["1", "2"]);
    }

    #[test]
    fn test_blank_fragment_is_none() {
        let value = json!({"knowledgePoints": [], "fragment": "   "});
        assert!(normalize_response(&value).fragment.is_none());
    }

    #[test]
    fn test_missing_collections_default_empty() {
        let response = normalize_response(&json!({}));
        assert!(response.knowledge_points.is_empty());
        assert!(response.matched_answers.is_empty());
        assert!(response.region_type.is_none());
    }

    #[test]
    fn test_malformed_matched_answers_dropped() {
        let value = json!({"matchedAnswers": [
            {"questionNumber": "1", "answer": "A"},
            {"questionNumber": "2"},
            {"answer": "C"}
        ]});
        let response = normalize_response(&value);
        assert_eq!(response.matched_answers.len(), 1);
    }
}
