use std::time::Duration;

use pitchline_core::{ExternalServiceError, PitchlineError, ResearchSource};
use pitchline_llm::{
    CompletionRequest, HttpResearchTool, LlmCapabilities, LlmProvider, OpenAIChatProvider,
    OpenAIClient, PitchCapabilities, ResearchQuery, ResearchTool, TokenUsage,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_provider(server: &MockServer) -> OpenAIChatProvider {
    let client = OpenAIClient::new("sk-test", 600)
        .with_base_url(server.uri())
        .without_min_interval();
    OpenAIChatProvider::new(client, "gpt-4o")
}

fn acme_query() -> ResearchQuery {
    ResearchQuery {
        company: "Acme Corp".to_string(),
        industry: "Manufacturing".to_string(),
        website: "https://acme.example".to_string(),
    }
}

#[tokio::test]
async fn openai_parses_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "message": { "role": "assistant", "content": "hello" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
        })))
        .mount(&server)
        .await;

    let provider = chat_provider(&server);
    let completion = provider
        .complete(&CompletionRequest::new("system", "hi"))
        .await
        .unwrap();

    assert_eq!(completion.content, "hello");
    assert_eq!(completion.model, "gpt-4o-2024-08-06");
    assert_eq!(completion.usage, Some(TokenUsage::new(12, 3)));
}

#[tokio::test]
async fn openai_maps_429_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(json!({"error": {"message": "slow down", "type": "rate_limit"}})),
        )
        .mount(&server)
        .await;

    let err = chat_provider(&server)
        .complete(&CompletionRequest::new("s", "u"))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        PitchlineError::External(ExternalServiceError::RateLimited {
            service: "openai".to_string(),
            retry_after_ms: 2000,
        })
        .to_string()
    );
}

#[tokio::test]
async fn openai_surfaces_api_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = chat_provider(&server)
        .complete(&CompletionRequest::new("s", "u"))
        .await
        .unwrap_err();

    match err {
        PitchlineError::External(ExternalServiceError::RequestFailed { status, message, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Incorrect API key provided");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn openai_rejects_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = chat_provider(&server)
        .complete(&CompletionRequest::new("s", "u"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PitchlineError::External(ExternalServiceError::InvalidResponse { .. })
    ));
}

#[tokio::test]
async fn research_tool_maps_findings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tools/research"))
        .and(body_partial_json(json!({
            "company": "Acme Corp",
            "industry": "Manufacturing",
            "website": "https://acme.example"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "trends": ["reshoring", "predictive maintenance"],
            "pain_points": ["downtime"],
            "opportunities": [],
            "competitive_landscape": {"leaders": ["Initech"]},
            "recommendations": ["lead with uptime"]
        })))
        .mount(&server)
        .await;

    let tool = HttpResearchTool::new(Some(server.uri()), Duration::from_secs(5));
    let findings = tool.research(&acme_query()).await.unwrap();

    assert_eq!(findings.trends.len(), 2);
    assert_eq!(findings.pain_points, vec![json!("downtime")]);
    assert_eq!(findings.competitive_landscape, json!({"leaders": ["Initech"]}));
}

#[tokio::test]
async fn research_tool_non_200_is_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tools/research"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let tool = HttpResearchTool::new(Some(server.uri()), Duration::from_secs(5));
    let err = tool.research(&acme_query()).await.unwrap_err();
    assert!(matches!(
        err,
        PitchlineError::External(ExternalServiceError::RequestFailed { status: 502, .. })
    ));
}

#[tokio::test]
async fn research_tool_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tools/research"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let tool = HttpResearchTool::new(Some(server.uri()), Duration::from_millis(50));
    let err = tool.research(&acme_query()).await.unwrap_err();
    assert!(matches!(
        err,
        PitchlineError::External(ExternalServiceError::Timeout { timeout_ms: 50, .. })
    ));
}

#[tokio::test]
async fn capabilities_fall_back_when_tool_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tools/research"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Acme faces margin pressure."}}],
            "usage": {"prompt_tokens": 40, "completion_tokens": 8}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let caps = LlmCapabilities::new(
        chat_provider(&server),
        HttpResearchTool::new(Some(server.uri()), Duration::from_secs(5)),
    );
    let customer = pitchline_core::CustomerProfile::new("Jane Doe", "Acme Corp", "Manufacturing");
    let out = caps.research(&customer).await.unwrap();

    assert_eq!(out.output.source, Some(ResearchSource::DirectModel));
    assert_eq!(out.output.findings.research, json!("Acme faces margin pressure."));
    assert_eq!(out.usage.map(|u| u.total_tokens), Some(48));
}
