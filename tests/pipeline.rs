use std::{collections::HashMap, sync::Arc, time::Duration};

use foa_tagger::{
    data::documents::DocumentRecord,
    ontology::{Category, OntologySnapshot, TagId},
    pipeline::{DocStatus, DocumentPipeline, PipelineHandle, PipelineOptions},
    tagging::{
        encoder::{EmbeddingUnavailableError, HashedNgramEncoder, TextEncoder},
        Method, TagCandidate,
    },
};

const VOCAB: &str = r#"
research_domains:
  - name: artificial_intelligence
    synonyms: ["AI", "machine learning"]
populations:
  - name: underserved_communities
    synonyms: ["underserved", "rural"]
"#;

fn snapshot() -> Arc<OntologySnapshot> {
    Arc::new(OntologySnapshot::from_yaml_str(VOCAB).expect("valid vocab"))
}

fn options() -> PipelineOptions {
    PipelineOptions {
        embedding_threshold: 0.35,
        high_confidence_cutoff: 0.75,
        lexical_floor: 0.15,
        lexical_cap: 6.0,
        max_tags: 10,
        encode_timeout: Duration::from_millis(5_000),
        concurrency: 4,
        lexical_only: false,
    }
}

fn doc(id: &str, title: &str, body: &str) -> DocumentRecord {
    DocumentRecord {
        doc_id: id.to_string(),
        title: title.to_string(),
        body: body.to_string(),
    }
}

/// Fails encoding for any text containing a marker token.
struct SelectiveEncoder {
    inner: HashedNgramEncoder,
}

impl TextEncoder for SelectiveEncoder {
    fn id(&self) -> &str {
        "selective"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError> {
        if texts.iter().any(|text| text.contains("poison")) {
            return Err(EmbeddingUnavailableError::Backend {
                backend: "selective".to_string(),
                message: "poisoned input".to_string(),
            });
        }
        self.inner.encode(texts)
    }
}

struct SlowEncoder {
    inner: HashedNgramEncoder,
    delay: Duration,
}

impl TextEncoder for SlowEncoder {
    fn id(&self) -> &str {
        "slow"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError> {
        std::thread::sleep(self.delay);
        self.inner.encode(texts)
    }
}

struct DeadEncoder;

impl TextEncoder for DeadEncoder {
    fn id(&self) -> &str {
        "dead"
    }

    fn dimension(&self) -> usize {
        8
    }

    fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingUnavailableError> {
        Err(EmbeddingUnavailableError::Backend {
            backend: "dead".to_string(),
            message: "model never loaded".to_string(),
        })
    }
}

#[tokio::test]
async fn batch_results_sort_by_doc_id() {
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(HashedNgramEncoder::default()),
        options(),
    )
    .expect("pipeline builds");
    let docs = vec![
        doc("doc-3", "", "AI everywhere"),
        doc("doc-1", "", "rural communities"),
        doc("doc-2", "", "machine learning"),
    ];
    let records = pipeline.tag_batch(&docs, &HashMap::new()).await;
    let ids: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, vec!["doc-1", "doc-2", "doc-3"]);
    assert!(records.iter().all(|r| r.status == DocStatus::Ok));
}

#[tokio::test]
async fn one_failing_document_degrades_alone() {
    let mut options = options();
    options.high_confidence_cutoff = 0.3;
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(SelectiveEncoder {
            inner: HashedNgramEncoder::default(),
        }),
        options,
    )
    .expect("pipeline builds");
    let docs = vec![
        doc("doc-1", "", "AI for rural regions"),
        doc("doc-2", "", "poison pill for underserved rural areas"),
    ];
    let records = pipeline.tag_batch(&docs, &HashMap::new()).await;
    assert_eq!(records[0].status, DocStatus::Ok);
    assert_eq!(records[1].status, DocStatus::Degraded);
    assert!(records[1]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("poisoned"));
    // lexical evidence still flows for the degraded document
    assert!(!records[1].tags.is_empty());
    assert!(records[1]
        .tags
        .iter()
        .all(|tag| tag.methods == vec![Method::Lexical]));
}

#[tokio::test]
async fn slow_encoder_times_out_to_degraded() {
    let mut options = options();
    options.encode_timeout = Duration::from_millis(20);
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(SlowEncoder {
            inner: HashedNgramEncoder::default(),
            delay: Duration::from_millis(250),
        }),
        options,
    )
    .expect("pipeline builds");
    let records = pipeline
        .tag_batch(&[doc("doc-1", "", "AI research")], &HashMap::new())
        .await;
    assert_eq!(records[0].status, DocStatus::Degraded);
    assert!(records[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("exceeded"));
}

#[tokio::test]
async fn hints_promote_borderline_tags() {
    let mut options = options();
    options.lexical_only = true;
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(HashedNgramEncoder::default()),
        options,
    )
    .expect("pipeline builds");
    let mut hints = HashMap::new();
    hints.insert(
        "doc-1".to_string(),
        vec![TagCandidate::new(
            "research_domains/artificial_intelligence"
                .parse()
                .expect("valid tag"),
            0.5,
            Method::Llm,
        )],
    );
    let records = pipeline.tag_batch(&[doc("doc-1", "", "AI pilot")], &hints).await;
    assert_eq!(records[0].status, DocStatus::Ok);
    let tags = &records[0].tags;
    assert_eq!(tags.len(), 1);
    assert!(tags[0].agreement);
    assert_eq!(tags[0].methods, vec![Method::Lexical, Method::Llm]);
    assert_eq!(tags[0].confidence, 0.5);
}

#[tokio::test]
async fn rogue_hint_fails_only_its_document() {
    let mut options = options();
    options.lexical_only = true;
    options.high_confidence_cutoff = 0.3;
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(HashedNgramEncoder::default()),
        options,
    )
    .expect("pipeline builds");
    let mut hints = HashMap::new();
    hints.insert(
        "doc-2".to_string(),
        vec![TagCandidate::new(
            TagId::new(Category::Methods, "made_up"),
            0.9,
            Method::Llm,
        )],
    );
    let docs = vec![doc("doc-1", "", "AI again and AI"), doc("doc-2", "", "rural")];
    let records = pipeline.tag_batch(&docs, &hints).await;
    assert_eq!(records[0].status, DocStatus::Ok);
    assert!(!records[0].tags.is_empty());
    assert_eq!(records[1].status, DocStatus::Failed);
    assert!(records[1].tags.is_empty());
    assert!(records[1].error.is_some());
}

#[tokio::test]
async fn dead_backend_degrades_whole_run_but_still_tags() {
    let mut options = options();
    options.high_confidence_cutoff = 0.3;
    let pipeline = DocumentPipeline::build_with_fallback(snapshot(), Arc::new(DeadEncoder), options);
    let records = pipeline
        .tag_batch(
            &[doc("doc-1", "", "Underserved rural communities")],
            &HashMap::new(),
        )
        .await;
    assert_eq!(records[0].status, DocStatus::Degraded);
    assert!(records[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("dead"));
    assert!(!records[0].tags.is_empty());
}

#[tokio::test]
async fn explicit_lexical_only_stays_ok() {
    let mut options = options();
    options.lexical_only = true;
    let pipeline = DocumentPipeline::build(
        snapshot(),
        Arc::new(HashedNgramEncoder::default()),
        options,
    )
    .expect("pipeline builds");
    let records = pipeline
        .tag_batch(&[doc("doc-1", "", "machine learning")], &HashMap::new())
        .await;
    assert_eq!(records[0].status, DocStatus::Ok);
    assert!(records[0].error.is_none());
}

#[tokio::test]
async fn handle_swaps_without_disturbing_held_pipelines() {
    let first = Arc::new(
        DocumentPipeline::build(
            snapshot(),
            Arc::new(HashedNgramEncoder::default()),
            options(),
        )
        .expect("pipeline builds"),
    );
    let handle = PipelineHandle::new(Arc::clone(&first));
    let held = handle.current();

    let second_snapshot = snapshot();
    let second = Arc::new(
        DocumentPipeline::build(
            Arc::clone(&second_snapshot),
            Arc::new(HashedNgramEncoder::default()),
            options(),
        )
        .expect("pipeline builds"),
    );
    let replaced = handle.swap(Arc::clone(&second));
    assert_eq!(replaced.snapshot().version(), held.snapshot().version());
    assert_eq!(
        handle.current().snapshot().version(),
        second_snapshot.version()
    );
    assert_ne!(held.snapshot().version(), second_snapshot.version());

    // the held pipeline still tags on the snapshot it was built with
    let record = held.tag_document(&doc("doc-1", "AI", ""), &[]).await;
    assert_eq!(record.status, DocStatus::Ok);
}
