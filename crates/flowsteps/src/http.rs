use async_trait::async_trait;
use flowcore::{StepAction, StepContext, StepError, StepResult, Value};
use flowruntime::{ActionFactory, ActionMetadata, ConfigKey};
use indexmap::IndexMap;
use std::collections::HashMap;

/// HTTP request action
pub struct HttpRequestAction {
    client: reqwest::Client,
    method: String,
    url: Option<String>,
    url_input: Option<String>,
    headers: Vec<(String, String)>,
    body_input: Option<String>,
}

impl HttpRequestAction {
    fn resolve_url(&self, ctx: &StepContext) -> Result<String, StepError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let value = ctx.input_or_single(self.url_input.as_deref())?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StepError::InvalidInputType {
                field: "url".to_string(),
                expected: "string".to_string(),
                actual: value.type_name().to_string(),
            })
    }
}

#[async_trait]
impl StepAction for HttpRequestAction {
    fn action_type(&self) -> &str {
        "http.request"
    }

    async fn invoke(&self, ctx: StepContext) -> StepResult {
        let url = self.resolve_url(&ctx)?;

        ctx.events.info(format!("{} {}", self.method, url));

        let mut request = match self.method.as_str() {
            "GET" => self.client.get(&url),
            "POST" => self.client.post(&url),
            "PUT" => self.client.put(&url),
            "DELETE" => self.client.delete(&url),
            other => return Err(StepError::Configuration(format!("Unsupported method: {}", other))),
        };

        if let Some(name) = &self.body_input {
            match ctx.require_input(name)? {
                Value::String(text) => request = request.body(text.clone()),
                other => request = request.json(&other.to_json()),
            }
        }

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StepError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers: IndexMap<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string())))
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| StepError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        ctx.events.info(format!("Response status: {}", status));

        let mut output = IndexMap::new();
        output.insert("status".to_string(), Value::from(status as i64));
        output.insert("body".to_string(), Value::String(body));
        output.insert("headers".to_string(), Value::Object(headers));
        Ok(Value::Object(output))
    }
}

pub struct HttpRequestActionFactory;

impl ActionFactory for HttpRequestActionFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn StepAction>, StepError> {
        let text = |key: &str| config.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let method = text("method").unwrap_or_else(|| "GET".to_string()).to_uppercase();
        if !matches!(method.as_str(), "GET" | "POST" | "PUT" | "DELETE") {
            return Err(StepError::Configuration(format!("Unsupported method: {}", method)));
        }

        let headers = match config.get("headers") {
            None => Vec::new(),
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
            Some(other) => {
                return Err(StepError::Configuration(format!(
                    "headers must be an object, got {}",
                    other.type_name()
                )))
            }
        };

        Ok(Box::new(HttpRequestAction {
            client: reqwest::Client::new(),
            method,
            url: text("url"),
            url_input: text("url_input"),
            headers,
            body_input: text("body_input"),
        }))
    }

    fn action_type(&self) -> &str {
        "http.request"
    }

    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Make HTTP requests".to_string(),
            category: "http".to_string(),
            config: vec![
                ConfigKey::optional("url", "Request URL; otherwise read from an input"),
                ConfigKey::optional("url_input", "Dependency holding the URL"),
                ConfigKey::optional("method", "GET, POST, PUT or DELETE (default GET)"),
                ConfigKey::optional("headers", "Object of header names to values"),
                ConfigKey::optional("body_input", "Dependency whose output is sent as the body"),
            ],
        }
    }
}
