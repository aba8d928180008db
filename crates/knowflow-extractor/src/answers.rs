//! Answer matching
//!
//! Exercises and their answers can arrive pages apart, in either order.
//! Reported (questionNumber, answer) pairs are reconciled against the
//! existing tree first, then the awaiting-answer queue; an answer whose
//! exercise has not been extracted yet waits in the reverse queue. Both
//! queues are capacity-bounded, evicting their oldest entries.

use crate::numbering::question_numbers_match;
use knowflow_domain::{KnowledgePoint, KnowledgeType, LearningContext, PendingAnswer, PendingExercise};
use tracing::debug;

/// Reconcile reported answers and newly extracted exercises.
///
/// `existing` is the document's current tree, `incoming` the new batch
/// (already remapped to final ids). Returns how many answers were attached.
pub fn match_answers(
    existing: &mut [KnowledgePoint],
    incoming: &mut [KnowledgePoint],
    reported: &[PendingAnswer],
    context: &mut LearningContext,
) -> usize {
    let mut matched = 0;

    for pair in reported {
        // 1. An unanswered exercise already in the tree
        if let Some(kp) = existing.iter_mut().find(|kp| {
            kp.kind == KnowledgeType::Exercise
                && !kp.has_answer
                && kp
                    .question_number
                    .as_deref()
                    .is_some_and(|qn| question_numbers_match(qn, &pair.question_number))
        }) {
            kp.has_answer = true;
            kp.answer = Some(pair.answer.clone());
            matched += 1;
            debug!(question = %pair.question_number, "answer matched against the tree");
            continue;
        }

        // 2. An exercise waiting in the queue
        if let Some(idx) = context
            .pending
            .exercises_awaiting_answer
            .position(|e| question_numbers_match(&e.question_number, &pair.question_number))
        {
            let target_id = context
                .pending
                .exercises_awaiting_answer
                .iter()
                .nth(idx)
                .map(|e| e.id.clone());
            if let Some(kp) = target_id
                .and_then(|id| existing.iter_mut().find(|kp| kp.id == id))
            {
                kp.has_answer = true;
                kp.answer = Some(pair.answer.clone());
                context.pending.exercises_awaiting_answer.remove(idx);
                matched += 1;
                debug!(question = %pair.question_number, "answer matched from the waiting queue");
            }
            continue;
        }

        // 3. Answer precedes its question
        debug!(question = %pair.question_number, "answer arrived before its exercise, queued");
        context.pending.answers_awaiting_question.push(pair.clone());
    }

    // 4. Newly extracted exercises: adopt queued answers, or start waiting
    for kp in incoming.iter_mut() {
        if kp.kind != KnowledgeType::Exercise {
            continue;
        }
        let Some(question_number) = kp.question_number.clone() else {
            continue;
        };

        if let Some(idx) = context
            .pending
            .answers_awaiting_question
            .position(|a| question_numbers_match(&a.question_number, &question_number))
        {
            if let Some(pending) = context.pending.answers_awaiting_question.remove(idx) {
                kp.has_answer = true;
                kp.answer = Some(pending.answer);
                matched += 1;
                debug!(question = %question_number, "new exercise adopted a queued answer");
            }
        } else if !kp.has_answer {
            context.pending.exercises_awaiting_answer.push(PendingExercise {
                id: kp.id.clone(),
                question_number,
                title: kp.title.clone(),
            });
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(id: &str, number: &str, has_answer: bool) -> KnowledgePoint {
        KnowledgePoint {
            id: id.to_string(),
            title: format!("exercise {}", number),
            content: String::new(),
            kind: KnowledgeType::Exercise,
            level: 0,
            parent_id: None,
            children: Vec::new(),
            selected: false,
            has_answer,
            answer: None,
            question_number: Some(number.to_string()),
            ancestor_path: Vec::new(),
            created_at: 0,
        }
    }

    fn pair(number: &str, answer: &str) -> PendingAnswer {
        PendingAnswer {
            question_number: number.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn test_answer_matches_existing_exercise() {
        let mut existing = vec![exercise("b1_t0_1", "3", false)];
        let mut incoming = vec![];
        let mut context = LearningContext::default();

        let matched = match_answers(&mut existing, &mut incoming, &[pair("3.", "X")], &mut context);
        assert_eq!(matched, 1);
        assert!(existing[0].has_answer);
        assert_eq!(existing[0].answer.as_deref(), Some("X"));
    }

    #[test]
    fn test_answered_exercise_not_overwritten() {
        let mut existing = vec![exercise("a", "3", true)];
        let mut context = LearningContext::default();

        let matched = match_answers(&mut existing, &mut [], &[pair("3", "Y")], &mut context);
        assert_eq!(matched, 0);
        assert!(existing[0].answer.is_none());
        // Unmatched answer waits for a future exercise
        assert_eq!(context.pending.answers_awaiting_question.len(), 1);
    }

    #[test]
    fn test_queue_match_attaches_by_id() {
        // The tree copy lost its number (e.g. OCR noise), but the queue
        // entry recorded at extraction time still references it by id.
        let mut existing = vec![exercise("b1_t0_7", "5", false)];
        existing[0].question_number = None;
        let mut context = LearningContext::default();
        context.pending.exercises_awaiting_answer.push(PendingExercise {
            id: "b1_t0_7".to_string(),
            question_number: "5".to_string(),
            title: "t".to_string(),
        });

        let matched = match_answers(&mut existing, &mut [], &[pair("(5)", "answer five")], &mut context);
        assert_eq!(matched, 1);
        assert_eq!(existing[0].answer.as_deref(), Some("answer five"));
        assert!(context.pending.exercises_awaiting_answer.is_empty());
    }

    #[test]
    fn test_answer_before_question_round_trip() {
        let mut context = LearningContext::default();

        // Batch 1: the answer area is read first.
        let matched = match_answers(&mut [], &mut [], &[pair("3", "X")], &mut context);
        assert_eq!(matched, 0);
        assert_eq!(context.pending.answers_awaiting_question.len(), 1);

        // Batch 2: the exercise appears and adopts the queued answer.
        let mut incoming = vec![exercise("b2_t0_1", "3", false)];
        let matched = match_answers(&mut [], &mut incoming, &[], &mut context);
        assert_eq!(matched, 1);
        assert!(incoming[0].has_answer);
        assert_eq!(incoming[0].answer.as_deref(), Some("X"));
        assert!(context.pending.answers_awaiting_question.is_empty());
    }

    #[test]
    fn test_unanswered_new_exercise_enqueues() {
        let mut context = LearningContext::default();
        let mut incoming = vec![exercise("b1_t0_2", "7", false)];

        match_answers(&mut [], &mut incoming, &[], &mut context);
        assert_eq!(context.pending.exercises_awaiting_answer.len(), 1);
        let entry = context.pending.exercises_awaiting_answer.iter().next().unwrap();
        assert_eq!(entry.id, "b1_t0_2");
        assert_eq!(entry.question_number, "7");
    }

    #[test]
    fn test_answered_new_exercise_not_enqueued() {
        let mut context = LearningContext::default();
        let mut incoming = vec![exercise("a", "7", true)];

        match_answers(&mut [], &mut incoming, &[], &mut context);
        assert!(context.pending.exercises_awaiting_answer.is_empty());
    }

    #[test]
    fn test_same_batch_answer_and_exercise() {
        // The answer pair and its exercise arrive in one batch: the pair is
        // queued in step 3, then adopted in step 4.
        let mut context = LearningContext::default();
        let mut incoming = vec![exercise("x", "12", false)];

        let matched = match_answers(&mut [], &mut incoming, &[pair("第12题", "D")], &mut context);
        assert_eq!(matched, 1);
        assert_eq!(incoming[0].answer.as_deref(), Some("D"));
        assert!(context.pending.answers_awaiting_question.is_empty());
        assert!(context.pending.exercises_awaiting_answer.is_empty());
    }

    #[test]
    fn test_garbage_numbers_never_match() {
        let mut existing = vec![exercise("a", "()", false)];
        let mut context = LearningContext::default();

        let matched = match_answers(&mut existing, &mut [], &[pair("()", "noise")], &mut context);
        assert_eq!(matched, 0);
        assert!(!existing[0].has_answer);
    }

    #[test]
    fn test_queues_stay_bounded() {
        let mut context = LearningContext::default();
        let reported: Vec<PendingAnswer> =
            (0..60).map(|n| pair(&n.to_string(), "A")).collect();

        match_answers(&mut [], &mut [], &reported, &mut context);
        assert_eq!(context.pending.answers_awaiting_question.len(), 50);
        // Oldest evicted first
        let first = context.pending.answers_awaiting_question.iter().next().unwrap();
        assert_eq!(first.question_number, "10");
    }
}
