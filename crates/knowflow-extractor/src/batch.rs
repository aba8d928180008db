//! Batch orchestration
//!
//! One batch fans out to 1 or 2 extraction workers, each consuming one unit
//! of the source from a pre-computed provisional offset. Results are merged
//! deterministically: ids remapped per worker and per batch, answers
//! reconciled, the learning context advanced, and the cursor moved to the
//! maximum offset any worker reached. Nothing is committed until every
//! worker's outcome is known; an orchestration failure rolls the document
//! back to pending with the cursor untouched.

use crate::answers::match_answers;
use crate::chunking::{provisional_step, ChunkReader};
use crate::classify::classify;
use crate::config::ExtractorConfig;
use crate::context::{finalize_context, update_context, ContextUpdate};
use crate::error::ExtractorError;
use crate::normalize::{normalize_response, ExtractionResponse};
use crate::parser::parse_model_json;
use crate::prompt::{PromptBuilder, EXTRACTION_SYSTEM_PROMPT};
use crate::remap::{batch_prefix, remap_with_prefix, worker_prefix};
use knowflow_domain::traits::{ChatProvider, PageRasterizer};
use knowflow_domain::{
    Document, DocumentStatus, DocumentType, KnowledgePoint, LearningContext, SourceDescriptor,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one committed batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Knowledge points merged into the tree by this batch
    pub produced: usize,
    /// Answers attached during reconciliation
    pub matched_answers: usize,
    /// Cursor after the batch
    pub final_offset: u64,
    /// The source is now fully consumed
    pub done: bool,
    /// Workers whose responses defeated every parse recovery strategy
    pub parse_failures: usize,
}

struct WorkerYield {
    new_offset: u64,
    response: ExtractionResponse,
    detected: Option<DocumentType>,
    parse_failed: bool,
}

/// Runs extraction batches against a source/document pair.
pub struct BatchRunner<P, R> {
    provider: Arc<P>,
    rasterizer: Arc<R>,
    config: ExtractorConfig,
}

impl<P, R> BatchRunner<P, R>
where
    P: ChatProvider,
    R: PageRasterizer,
{
    /// Create a runner; the configuration is validated up front.
    pub fn new(
        provider: Arc<P>,
        rasterizer: Arc<R>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            provider,
            rasterizer,
            config,
        })
    }

    /// Run one batch. On success the document and source are committed in a
    /// single step; on failure the document reverts to pending and the
    /// cursor keeps its last committed value.
    pub async fn run_batch(
        &self,
        document: &mut Document,
        source: &mut SourceDescriptor,
    ) -> Result<BatchReport, ExtractorError> {
        if source.exhausted() {
            document.status = DocumentStatus::Done;
            document.has_more = false;
            document.touch();
            return Ok(BatchReport {
                produced: 0,
                matched_answers: 0,
                final_offset: source.processed_offset,
                done: true,
                parse_failures: 0,
            });
        }

        document.status = DocumentStatus::Processing;
        document.batch_target = self.config.batch_target * self.config.worker_count;
        document.batch_produced_count = 0;
        document.touch();

        match self.execute(document, source).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(error = %e, "batch failed, rolling document back to pending");
                document.status = DocumentStatus::Pending;
                document.batch_produced_count = 0;
                document.touch();
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        document: &mut Document,
        source: &mut SourceDescriptor,
    ) -> Result<BatchReport, ExtractorError> {
        let base_context = document.learning_context.clone();

        // Provisional worker offsets from static step sizes. A text worker's
        // actual snapped offset may land before the next worker's start; the
        // cursor is reconciled to the maximum actual offset at merge time.
        let mut offsets = Vec::new();
        let mut cursor = source.processed_offset;
        for _ in 0..self.config.worker_count {
            if cursor >= source.total_units {
                break;
            }
            offsets.push(cursor);
            cursor = provisional_step(source.kind, cursor, self.config.text_chunk_size, source.total_units);
        }

        let results = {
            let reader = ChunkReader::new(source, &*self.provider, &*self.rasterizer, &self.config);
            let tasks = offsets.iter().enumerate().map(|(worker, &offset)| {
                // Only the first worker consumes the carried fragment.
                let context = if worker == 0 {
                    base_context.clone()
                } else {
                    base_context.without_fragment()
                };
                self.run_worker(&reader, offset, context)
            });
            // Join-all: state changes only once every outcome is known.
            let settled = futures::future::join_all(tasks).await;
            settled.into_iter().collect::<Result<Vec<_>, _>>()?
        };

        let mut final_offset = source.processed_offset;
        let mut batch_points: Vec<KnowledgePoint> = Vec::new();
        let mut last_fragment = None;
        let mut last_path_change = None;
        let mut last_region = None;
        let mut reported_answers = Vec::new();
        let mut detected = base_context.document_type;
        let mut parse_failures = 0;

        for (worker, yielded) in results.into_iter().enumerate() {
            final_offset = final_offset.max(yielded.new_offset);

            let mut points = yielded.response.knowledge_points;
            remap_with_prefix(&worker_prefix(worker), &mut points);
            batch_points.extend(points);

            if yielded.response.fragment.is_some() {
                last_fragment = yielded.response.fragment;
            }
            if yielded.response.path_change.is_some() {
                last_path_change = yielded.response.path_change;
            }
            if yielded.response.region_type.is_some() {
                last_region = yielded.response.region_type;
            }
            reported_answers.extend(yielded.response.matched_answers);
            if detected.is_none() {
                detected = yielded.detected;
            }
            if yielded.parse_failed {
                parse_failures += 1;
            }
        }

        let next_batch_index = document.batch_index + 1;
        remap_with_prefix(&batch_prefix(next_batch_index), &mut batch_points);

        let mut context = base_context;
        let matched_answers = match_answers(
            &mut document.knowledge_points,
            &mut batch_points,
            &reported_answers,
            &mut context,
        );

        update_context(
            &mut context,
            ContextUpdate {
                path_change: last_path_change,
                fragment: last_fragment,
                region_type: last_region,
                document_type: detected,
                new_knowledge: batch_points.iter().map(KnowledgePoint::summary).collect(),
            },
        );

        let done = final_offset >= source.total_units;
        if done {
            finalize_context(&mut context);
        }

        // Single-step commit
        source.advance(final_offset);
        let produced = batch_points.len();
        document.knowledge_points.extend(batch_points);
        document.processed_count = document.knowledge_points.len();
        document.batch_index = next_batch_index;
        document.batch_produced_count = produced;
        document.content_cursor = source.processed_offset;
        document.content_total = source.total_units;
        document.has_more = !done;
        document.status = if done {
            DocumentStatus::Done
        } else {
            DocumentStatus::Pending
        };
        document.learning_context = context;
        document.touch();

        info!(
            batch = next_batch_index,
            produced,
            matched_answers,
            cursor = source.processed_offset,
            total = source.total_units,
            done,
            "batch committed"
        );

        Ok(BatchReport {
            produced,
            matched_answers,
            final_offset: source.processed_offset,
            done,
            parse_failures,
        })
    }

    async fn run_worker(
        &self,
        reader: &ChunkReader<'_, P, R>,
        offset: u64,
        context: LearningContext,
    ) -> Result<WorkerYield, ExtractorError> {
        let Some(unit) = reader.next_unit(offset).await? else {
            return Ok(WorkerYield {
                new_offset: offset,
                response: ExtractionResponse::default(),
                detected: None,
                parse_failed: false,
            });
        };

        // Prepend the carried fragment so the model reads it first.
        let text = match &context.pending.fragment {
            Some(fragment) => format!("{}\n{}", fragment, unit.text),
            None => unit.text,
        };

        let file_name = &reader.source().file_name;
        let detected = if context.document_type.is_none() {
            let archetype = classify(&text, file_name);
            debug!(archetype = archetype.as_str(), file = %file_name, "document type detected");
            Some(archetype)
        } else {
            None
        };
        let archetype = context
            .document_type
            .or(detected)
            .unwrap_or(DocumentType::General);

        let instruction = PromptBuilder::new(self.config.batch_target, archetype)
            .with_context(&context)
            .build();
        let prompt = format!(
            "{}\n\n[File name]\n{}\n\n[Text to process begins]\n{}\n[Text to process ends]",
            instruction, file_name, text
        );

        let raw = self
            .provider
            .chat(Some(EXTRACTION_SYSTEM_PROMPT), &prompt)
            .await
            .map_err(|e| ExtractorError::Llm(e.to_string()))?;

        match parse_model_json(&raw) {
            Ok(parsed) => {
                debug!(method = ?parsed.method, "extraction response parsed");
                Ok(WorkerYield {
                    new_offset: unit.new_offset,
                    response: normalize_response(&parsed.value),
                    detected,
                    parse_failed: false,
                })
            }
            Err(failure) => {
                // Expected failure mode: the batch yields nothing, but the
                // chunk was consumed, so the cursor still advances.
                warn!(
                    reason = %failure.reason,
                    preview = %failure.preview,
                    "extraction response unparseable, zero yield for this unit"
                );
                Ok(WorkerYield {
                    new_offset: unit.new_offset,
                    response: ExtractionResponse::default(),
                    detected,
                    parse_failed: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowflow_llm::{MockProvider, MockRasterizer};

    fn simple_response(id: &str, content: &str) -> String {
        format!(
            r#"{{"knowledgePoints":[{{"id":"{}","content":"{}","type":"concept"}}]}}"#,
            id, content
        )
    }

    fn runner(provider: MockProvider, config: ExtractorConfig) -> BatchRunner<MockProvider, MockRasterizer> {
        BatchRunner::new(Arc::new(provider), Arc::new(MockRasterizer::new(3)), config).unwrap()
    }

    #[tokio::test]
    async fn test_three_batches_consume_nine_thousand_chars() {
        let mut provider = MockProvider::new("{}");
        provider.queue_responses([
            simple_response("1", "first"),
            simple_response("1", "second"),
            simple_response("1", "third"),
        ]);
        let runner = runner(provider, ExtractorConfig::default());

        let mut source = SourceDescriptor::from_text("a".repeat(9000), "long.txt");
        let mut document = Document::new("long", source.total_units);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.final_offset, 3000);
        assert!(!report.done);
        assert_eq!(document.status, DocumentStatus::Pending);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.final_offset, 6000);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.final_offset, 9000);
        assert!(report.done);
        assert_eq!(document.status, DocumentStatus::Done);
        assert!(!document.has_more);
        assert!(document.learning_context.pending.fragment.is_none());

        // One point per batch, ids unique with recoverable encoding
        let ids: Vec<&str> = document.knowledge_points.iter().map(|kp| kp.id.as_str()).collect();
        assert_eq!(ids, vec!["b1_t0_1", "b2_t0_1", "b3_t0_1"]);
        assert_eq!(document.batch_index, 3);
    }

    #[tokio::test]
    async fn test_completed_source_short_circuits() {
        let provider = MockProvider::new("{}");
        let runner = runner(provider.clone(), ExtractorConfig::default());

        let mut source = SourceDescriptor::from_text("abc", "a.txt");
        source.advance(3);
        let mut document = Document::new("a", 3);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert!(report.done);
        assert_eq!(document.status, DocumentStatus::Done);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_parse_failure_still_advances_cursor() {
        let provider = MockProvider::new("this is not json at all");
        let runner = runner(provider, ExtractorConfig::default());

        let mut source = SourceDescriptor::from_text("a".repeat(100), "a.txt");
        let mut document = Document::new("a", source.total_units);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.produced, 0);
        assert_eq!(report.parse_failures, 1);
        assert_eq!(report.final_offset, 100);
        assert!(report.done);
        assert_eq!(source.processed_offset, 100);
    }

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        type Error = String;

        async fn chat(&self, _system: Option<&str>, _prompt: &str) -> Result<String, String> {
            Err("network down".to_string())
        }

        async fn recognize(&self, _mime: &str, _image: &[u8]) -> Result<String, String> {
            Err("network down".to_string())
        }
    }

    #[tokio::test]
    async fn test_transport_failure_rolls_back() {
        let runner = BatchRunner::new(
            Arc::new(FailingProvider),
            Arc::new(MockRasterizer::new(1)),
            ExtractorConfig::default(),
        )
        .unwrap();

        let mut source = SourceDescriptor::from_text("a".repeat(100), "a.txt");
        let mut document = Document::new("a", source.total_units);
        document.batch_produced_count = 7;

        let result = runner.run_batch(&mut document, &mut source).await;
        assert!(matches!(result, Err(ExtractorError::Llm(_))));
        assert_eq!(document.status, DocumentStatus::Pending);
        assert_eq!(document.batch_produced_count, 0);
        // Cursor untouched: the batch is retriable from scratch
        assert_eq!(source.processed_offset, 0);
        assert_eq!(document.batch_index, 0);
    }

    #[tokio::test]
    async fn test_two_workers_prefix_and_max_offset() {
        let mut provider = MockProvider::new("{}");
        provider.queue_responses([
            simple_response("1", "from worker zero"),
            simple_response("1", "from worker one"),
        ]);
        let mut config = ExtractorConfig::default();
        config.worker_count = 2;
        config.text_chunk_size = 50;
        let runner = runner(provider, config);

        let mut source = SourceDescriptor::from_text("a".repeat(200), "a.txt");
        let mut document = Document::new("a", source.total_units);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.produced, 2);
        // Worker 0 covered 0..50, worker 1 covered 50..100
        assert_eq!(report.final_offset, 100);

        let ids: Vec<&str> = document.knowledge_points.iter().map(|kp| kp.id.as_str()).collect();
        assert_eq!(ids, vec!["b1_t0_1", "b1_t1_1"]);
    }

    #[tokio::test]
    async fn test_fragment_carried_then_cleared_on_completion() {
        let mut provider = MockProvider::new("{}");
        provider.queue_responses([
            r#"{"knowledgePoints":[],"fragment":"half a question"}"#.to_string(),
            simple_response("1", "rest"),
        ]);
        let mut config = ExtractorConfig::default();
        config.text_chunk_size = 50;
        let runner = runner(provider, config);

        let mut source = SourceDescriptor::from_text("a".repeat(100), "a.txt");
        let mut document = Document::new("a", source.total_units);

        runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(
            document.learning_context.pending.fragment.as_deref(),
            Some("half a question")
        );

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert!(report.done);
        assert!(document.learning_context.pending.fragment.is_none());
    }

    #[tokio::test]
    async fn test_document_type_sticky_after_first_batch() {
        let mut provider = MockProvider::new("{}");
        provider.queue_responses([simple_response("1", "x"), simple_response("1", "y")]);
        let mut config = ExtractorConfig::default();
        config.text_chunk_size = 50;
        let runner = runner(provider, config);

        // Exercise-looking file name short-circuits classification.
        let mut source = SourceDescriptor::from_text("a".repeat(100), "final exam.txt");
        let mut document = Document::new("final exam", source.total_units);

        runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(
            document.learning_context.document_type,
            Some(DocumentType::Exercises)
        );

        runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(
            document.learning_context.document_type,
            Some(DocumentType::Exercises)
        );
    }

    #[tokio::test]
    async fn test_reported_answers_reach_existing_tree() {
        let mut provider = MockProvider::new("{}");
        provider.queue_responses([
            // Batch 1 extracts an unanswered exercise
            r#"{"knowledgePoints":[{"id":"1","content":"compute the limit","type":"exercise","hasAnswer":false,"questionNumber":"3"}]}"#.to_string(),
            // Batch 2 reads the answer area
            r#"{"knowledgePoints":[],"matchedAnswers":[{"questionNumber":"3.","answer":"X"}],"regionType":"answers"}"#.to_string(),
        ]);
        let mut config = ExtractorConfig::default();
        config.text_chunk_size = 50;
        let runner = runner(provider, config);

        let mut source = SourceDescriptor::from_text("a".repeat(100), "a.txt");
        let mut document = Document::new("a", source.total_units);

        runner.run_batch(&mut document, &mut source).await.unwrap();
        assert!(!document.knowledge_points[0].has_answer);

        let report = runner.run_batch(&mut document, &mut source).await.unwrap();
        assert_eq!(report.matched_answers, 1);
        assert!(document.knowledge_points[0].has_answer);
        assert_eq!(document.knowledge_points[0].answer.as_deref(), Some("X"));
        assert_eq!(
            document.learning_context.current_region,
            Some(knowflow_domain::RegionType::Answers)
        );
    }
}
