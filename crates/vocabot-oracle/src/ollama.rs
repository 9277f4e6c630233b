//! Ollama (local LLM) oracle implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use vocabot_core::config::OracleConfig;
use vocabot_core::model::{Answer, Question};
use vocabot_core::traits::AnswerOracle;

use crate::error::OracleError;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama-backed answer oracle.
pub struct OllamaOracle {
    base_url: String,
    model: String,
    system_prompt: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

/// A model available on the Ollama instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let base = if config.base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.trim_end_matches('/')
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base.to_string(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One generate round trip.
    async fn generate(&self, question: &Question) -> Result<Answer, OracleError> {
        let prompt = serde_json::to_string(question)
            .map_err(|e| OracleError::MalformedAnswer(format!("unserializable question: {e}")))?;

        let body = GenerateRequest {
            model: &self.model,
            system: &self.system_prompt,
            prompt,
            format: answer_schema(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    OracleError::NetworkError(format!(
                        "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                        self.base_url
                    ))
                } else {
                    OracleError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(OracleError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                self.model, self.model
            )));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError {
                status,
                message: body,
            });
        }

        let api_response: GenerateResponse =
            response.json().await.map_err(|e| OracleError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        parse_answer(&api_response.response)
    }

    /// Fetch the models available on the Ollama instance.
    pub async fn list_models_async(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|_| {
                OracleError::NetworkError(format!(
                    "Ollama not reachable at {}. Is it running? Start with: ollama serve",
                    self.base_url
                ))
            })?;

        let tags: TagsResponse = response.json().await.map_err(|e| OracleError::ApiError {
            status: 0,
            message: format!("failed to parse tags response: {e}"),
        })?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                name: m.name,
                size: m.size,
            })
            .collect())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    format: Value,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
    #[serde(default)]
    size: u64,
}

/// Structured-output schema the model must follow: the question echoed
/// back, the chosen answer, and the choices.
fn answer_schema() -> Value {
    let choice = json!({
        "type": "object",
        "properties": {
            "answer": {"type": "string"},
            "code": {"type": "string"}
        },
        "required": ["answer", "code"]
    });
    json!({
        "type": "object",
        "properties": {
            "question": {"type": "string"},
            "answer": choice,
            "choices": {"type": "array", "items": choice}
        },
        "required": ["question", "answer", "choices"]
    })
}

/// Parse the model's `response` text into an answer.
fn parse_answer(text: &str) -> Result<Answer, OracleError> {
    let answer: Answer =
        serde_json::from_str(text).map_err(|e| OracleError::MalformedAnswer(e.to_string()))?;
    if answer.chosen.answer_code.trim().is_empty() && answer.chosen.display_text.trim().is_empty() {
        return Err(OracleError::MalformedAnswer("empty answer".into()));
    }
    Ok(answer)
}

#[async_trait]
impl AnswerOracle for OllamaOracle {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, question), fields(model = %self.model))]
    async fn ask(&self, question: &Question) -> anyhow::Result<Answer> {
        let start = Instant::now();
        let answer = match self.generate(question).await {
            Ok(answer) => answer,
            Err(e) if e.is_permanent() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("oracle attempt failed, asking again: {e}");
                self.generate(question).await?
            }
        };
        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            code = %answer.chosen.answer_code,
            "oracle answered"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocabot_core::model::Choice;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oracle_for(server: &MockServer) -> OllamaOracle {
        let config = OracleConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        OllamaOracle::new(&config).unwrap()
    }

    fn sample_question() -> Question {
        Question {
            context: None,
            prompt: "Terse means:".into(),
            choices: vec![Choice::new("brief", "k1"), Choice::new("long", "k2")],
            completed: false,
        }
    }

    fn model_reply(answer: &str, code: &str) -> Value {
        let inner = json!({
            "question": "Terse means:",
            "answer": {"answer": answer, "code": code},
            "choices": [{"answer": "brief", "code": "k1"}, {"answer": "long", "code": "k2"}]
        });
        json!({
            "model": "llama3.1:8b-instruct-q5_K_S",
            "response": inner.to_string(),
            "done": true
        })
    }

    #[tokio::test]
    async fn successful_answer() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama3.1:8b-instruct-q5_K_S",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("brief", "k1")))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let answer = oracle.ask(&sample_question()).await.unwrap();
        assert_eq!(answer.chosen.answer_code, "k1");
        assert_eq!(answer.chosen.display_text, "brief");
        assert_eq!(answer.choices.len(), 2);
    }

    #[tokio::test]
    async fn request_carries_question_and_schema() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "format": {"required": ["question", "answer", "choices"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("brief", "k1")))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        oracle.ask(&sample_question()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let prompt: Value = serde_json::from_str(body["prompt"].as_str().unwrap()).unwrap();
        assert_eq!(prompt["question"], "Terse means:");
        assert_eq!(prompt["choices"][1]["code"], "k2");
        assert!(body["system"].as_str().unwrap().contains("vocabulary"));
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let err = oracle.ask(&sample_question()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(matches!(
            err.downcast_ref::<OracleError>(),
            Some(OracleError::ModelNotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_reply_is_retried_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"response": "not json"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("long", "k2")))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let answer = oracle.ask(&sample_question()).await.unwrap();
        assert_eq!(answer.chosen.answer_code, "k2");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn persistent_malformed_reply_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": "{\"question\": \"q\"}"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let err = oracle.ask(&sample_question()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OracleError>(),
            Some(OracleError::MalformedAnswer(_))
        ));
    }

    #[test]
    fn empty_answer_is_malformed() {
        let text = r#"{"question": "q", "answer": {"answer": " ", "code": ""}, "choices": []}"#;
        assert!(matches!(
            parse_answer(text),
            Err(OracleError::MalformedAnswer(_))
        ));
    }

    #[tokio::test]
    async fn dynamic_model_listing() {
        let server = MockServer::start().await;

        let response_body = json!({
            "models": [
                {"name": "llama3.1:8b-instruct-q5_K_S", "size": 5600000000_u64},
                {"name": "mistral:7b"}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let oracle = oracle_for(&server);
        let models = oracle.list_models_async().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3.1:8b-instruct-q5_K_S");
        assert_eq!(models[1].size, 0);
    }
}
