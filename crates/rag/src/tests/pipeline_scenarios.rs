//! End-to-end query scenarios against in-process fakes.

use super::support::{
    record, serve_once, FailingEmbedder, FailingSearch, PendingSearch, ScriptedLlm, StaticFacts,
    StaticSearch,
};
use crate::embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockProvider};
use crate::executor::{RetrievalSettings, ToolExecutor};
use crate::pipeline::{HybridQueryEngine, PipelineState, QueryAnswer, Stage};
use crate::planner::Planner;
use crate::sources::{FactStore, PassageSearch};
use crate::synthesizer::Synthesizer;
use catalyst_core::AppError;
use catalyst_llm::{LlmClient, OpenAiClient, ResponseMode};
use catalyst_prompt::PromptLibrary;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

const FACTS_PLAN: &str =
    r#"{"tool_calls":[{"tool":"get_mission_facts","arguments":{"mission_name":"X"}}]}"#;

const HYBRID_PLAN: &str = r#"```json
{"tool_calls":[
  {"tool":"get_mission_facts","arguments":{"mission_name":"X"}},
  {"tool":"find_mission_context","arguments":{"search_query":"X launch delays"}}
]}
```"#;

fn engine(
    planner_llm: Arc<dyn LlmClient>,
    synth_llm: Arc<dyn LlmClient>,
    facts: Arc<dyn FactStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    backends: Vec<Arc<dyn PassageSearch>>,
) -> HybridQueryEngine {
    let prompts = Arc::new(PromptLibrary::builtin().unwrap());
    let timeout = Duration::from_secs(30);
    HybridQueryEngine::new(
        Planner::new(planner_llm, prompts.clone(), "gpt-4o", timeout),
        ToolExecutor::new(facts, embedder, backends, RetrievalSettings::default()),
        Synthesizer::new(synth_llm, prompts, "gpt-4o", timeout),
    )
}

fn mission_x() -> StaticFacts {
    StaticFacts::with(
        "X",
        record(json!({"mission_name": "X", "status": "in transit", "launch_year": 2031})),
    )
}

#[tokio::test]
async fn test_mission_status_answered_from_facts() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(FACTS_PLAN.to_string()),
        Ok("Mission X is in transit.".to_string()),
    ]));
    let engine = engine(
        llm.clone(),
        llm.clone(),
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("What is the status of mission X?").await;

    assert_eq!(
        run.states,
        vec![
            PipelineState::Received,
            PipelineState::Planning,
            PipelineState::Retrieving,
            PipelineState::Synthesizing,
            PipelineState::Answered,
        ]
    );
    let answer = run.result.unwrap();
    assert_eq!(
        serde_json::to_value(&answer).unwrap(),
        json!({"answer": "Mission X is in transit."})
    );

    let prompt = run.synthesis_prompt.unwrap();
    assert!(prompt.contains("\"status\": \"in transit\""));
    assert!(prompt.contains("What is the status of mission X?"));
    assert!(prompt.contains("No narrative context was found."));

    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].mode, ResponseMode::Json);
    assert_eq!(requests[1].mode, ResponseMode::Text);
}

#[tokio::test]
async fn test_hybrid_plan_merges_passages_from_both_backends() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(HYBRID_PLAN.to_string()),
        Ok("Delayed by weather.".to_string()),
    ]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        vec![
            Arc::new(StaticSearch::new(
                "mission_knowledge",
                &[("Launch slipped two days for weather.", 0.82)],
            )),
            Arc::new(StaticSearch::new("comments", &[("Range crew reported high winds.", 0.91)])),
        ],
    );

    let run = engine.run("Why was X delayed?").await;
    assert_eq!(run.final_state(), PipelineState::Answered);

    let prompt = run.synthesis_prompt.unwrap();
    assert!(prompt.contains("1. [comments] Range crew reported high winds."));
    assert!(prompt.contains("2. [mission_knowledge] Launch slipped two days for weather."));
    assert!(prompt.contains("\"mission_name\": \"X\""));
    assert_eq!(run.plan.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unrecognized_tool_does_not_block_the_answer() {
    let plan = r#"{"tool_calls":[
        {"tool":"launch_rocket","arguments":{"count":"3"}},
        {"tool":"get_mission_facts","arguments":{"mission_name":"X"}}
    ]}"#;
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(plan.to_string()), Ok("ok".to_string())]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("Status of X?").await;
    assert_eq!(run.final_state(), PipelineState::Answered);
    assert!(run.synthesis_prompt.unwrap().contains("in transit"));
}

#[tokio::test]
async fn test_unreachable_embedding_service_still_synthesizes() {
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let embedder =
        HttpEmbeddingProvider::new(format!("http://{}/embed", closed), reqwest::Client::new());

    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(HYBRID_PLAN.to_string()),
        Ok("Facts only.".to_string()),
    ]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(mission_x()),
        Arc::new(embedder),
        vec![Arc::new(StaticSearch::new("mission_knowledge", &[("unused", 0.9)]))],
    );

    let run = engine.run("Why was X delayed?").await;
    assert_eq!(
        run.result.unwrap(),
        QueryAnswer {
            answer: "Facts only.".to_string()
        }
    );

    let prompt = run.synthesis_prompt.unwrap();
    assert!(prompt.contains("in transit"));
    assert!(prompt.contains("No narrative context was found."));
    assert!(!prompt.contains("unused"));
}

#[tokio::test]
async fn test_every_backend_failing_still_answers() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(HYBRID_PLAN.to_string()),
        Ok("I could not find evidence.".to_string()),
    ]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(StaticFacts::failing()),
        Arc::new(MockProvider::new(32)),
        vec![
            Arc::new(FailingSearch::new("mission_knowledge")),
            Arc::new(FailingSearch::new("comments")),
        ],
    );

    let run = engine.run("Why was X delayed?").await;
    assert_eq!(run.final_state(), PipelineState::Answered);

    let prompt = run.synthesis_prompt.unwrap();
    assert!(prompt.contains("No structured data was found."));
    assert!(prompt.contains("No narrative context was found."));
}

#[tokio::test]
async fn test_embedding_failure_and_fact_failure_together_still_answer() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(HYBRID_PLAN.to_string()),
        Ok("Nothing found.".to_string()),
    ]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(StaticFacts::failing()),
        Arc::new(FailingEmbedder),
        vec![Arc::new(StaticSearch::new("comments", &[("unused", 0.5)]))],
    );

    assert!(engine.answer("Why was X delayed?").await.is_ok());
}

#[tokio::test]
async fn test_synthesis_server_error_is_generic_500() {
    let (url, server) = serve_once(500, r#"{"error":{"message":"internal stack trace"}}"#).await;
    let synth_llm = Arc::new(OpenAiClient::new(url, "sk-test", reqwest::Client::new()));
    let planner_llm = Arc::new(ScriptedLlm::new(vec![Ok(FACTS_PLAN.to_string())]));

    let engine = engine(
        planner_llm,
        synth_llm,
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("Status of X?").await;
    assert_eq!(run.final_state(), PipelineState::Failed(Stage::Synthesizing));

    let err = run.result.unwrap_err();
    assert!(matches!(err.source, AppError::Synthesis(_)));

    let body = serde_json::to_string(&err.to_response()).unwrap();
    assert_eq!(body, r#"{"error":"Error synthesizing answer","status":500}"#);
    assert!(!body.contains("stack trace"));

    let request = server.await.unwrap();
    assert!(request.contains("in transit"));
}

#[tokio::test]
async fn test_missing_argument_fails_before_synthesis() {
    let plan = r#"{"tool_calls":[{"tool":"get_mission_facts","arguments":{"mission":"X"}}]}"#;
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(plan.to_string()),
        Ok("never sent".to_string()),
    ]));
    let facts = Arc::new(mission_x());
    let engine = engine(
        llm.clone(),
        llm.clone(),
        facts.clone(),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("Status of X?").await;
    assert_eq!(run.final_state(), PipelineState::Failed(Stage::Retrieving));
    assert!(run.synthesis_prompt.is_none());

    let err = run.result.unwrap_err();
    assert!(matches!(err.source, AppError::MissingArgument { .. }));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "Error executing plan");

    assert_eq!(llm.requests().len(), 1);
    assert_eq!(facts.calls(), 0);
}

#[tokio::test]
async fn test_unparseable_plan_fails_in_planning() {
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(
        "Sure! I'd look up mission X first.".to_string()
    )]));
    let engine = engine(
        llm.clone(),
        llm.clone(),
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("Status of X?").await;
    assert_eq!(
        run.states,
        vec![
            PipelineState::Received,
            PipelineState::Planning,
            PipelineState::Failed(Stage::Planning),
        ]
    );

    let err = run.result.unwrap_err();
    match &err.source {
        AppError::PlanParse { raw, .. } => assert_eq!(raw, "Sure! I'd look up mission X first."),
        other => panic!("expected PlanParse, got {:?}", other),
    }
    assert_eq!(err.public_message(), "Error planning query");
    assert_eq!(llm.requests().len(), 1);
}

#[tokio::test]
async fn test_planning_model_failure_is_fatal() {
    let llm = Arc::new(ScriptedLlm::new(vec![Err(AppError::Llm(
        "connection reset".to_string(),
    ))]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let err = engine.answer("Status of X?").await.unwrap_err();
    assert_eq!(err.stage, Stage::Planning);
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_blank_question_is_rejected_without_model_calls() {
    let llm = Arc::new(ScriptedLlm::new(Vec::new()));
    let engine = engine(
        llm.clone(),
        llm.clone(),
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let run = engine.run("   ").await;
    assert_eq!(run.final_state(), PipelineState::Failed(Stage::Input));

    let response = run.result.unwrap_err().to_response();
    assert_eq!(response.status, 400);
    assert_eq!(response.error, "form value 'question' is required");
    assert!(llm.requests().is_empty());
}

#[tokio::test]
async fn test_same_evidence_gives_identical_synthesis_prompt() {
    let mut prompts = Vec::new();

    for _ in 0..2 {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(HYBRID_PLAN.to_string()),
            Ok("answer".to_string()),
        ]));
        let engine = engine(
            llm.clone(),
            llm,
            Arc::new(mission_x()),
            Arc::new(MockProvider::new(32)),
            vec![
                Arc::new(StaticSearch::new("mission_knowledge", &[("a", 0.5), ("b", 0.5)])),
                Arc::new(StaticSearch::new("comments", &[("c", 0.7)])),
            ],
        );
        prompts.push(engine.run("Why was X delayed?").await.synthesis_prompt.unwrap());
    }

    assert_eq!(prompts[0].as_bytes(), prompts[1].as_bytes());
}

#[tokio::test]
async fn test_fact_record_survives_the_prompt_round_trip() {
    let stored = json!({
        "mission_name": "X",
        "status": "in transit",
        "crew": ["Ng", "O'Brien"],
        "notes": "Uses <angle> & \"quoted\" text"
    });
    let llm = Arc::new(ScriptedLlm::plan_then_echo(FACTS_PLAN));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(StaticFacts::with("X", record(stored.clone()))),
        Arc::new(MockProvider::new(32)),
        Vec::new(),
    );

    let answer = engine.answer("Status of X?").await.unwrap().answer;

    let section = answer
        .split_once("Structured data:")
        .map(|(_, rest)| rest.trim_start())
        .unwrap();
    let parsed: Value = serde_json::Deserializer::from_str(section)
        .into_iter::<Value>()
        .next()
        .unwrap()
        .unwrap();

    assert_eq!(parsed["mission"], stored);
}

#[tokio::test]
async fn test_dropping_the_request_cancels_outstanding_searches() {
    let (pending, dropped) = PendingSearch::new();
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(HYBRID_PLAN.to_string())]));
    let engine = engine(
        llm.clone(),
        llm,
        Arc::new(mission_x()),
        Arc::new(MockProvider::new(32)),
        vec![Arc::new(pending)],
    );

    let outcome = tokio::time::timeout(Duration::from_millis(100), engine.answer("Why?")).await;
    assert!(outcome.is_err());
    assert!(dropped.load(Ordering::SeqCst));
}
