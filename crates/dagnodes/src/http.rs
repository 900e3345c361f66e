use async_trait::async_trait;
use dagcore::{
    Node, NodeContext, NodeDescriptor, NodeError, NodeOutput, ParameterSpec, Value, ValueKind,
};
use std::collections::BTreeMap;

/// HTTP request node
pub struct HttpRequestNode {
    descriptor: NodeDescriptor,
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            descriptor: NodeDescriptor::new("http.request")
                .with_name("HTTP Request")
                .with_description("Make HTTP requests")
                .with_category("http")
                .with_tag("http")
                .with_tag("network")
                .with_parameter(ParameterSpec::required("url", ValueKind::String))
                .with_parameter(
                    ParameterSpec::optional("method", ValueKind::String).with_default("GET"),
                )
                .with_parameter(
                    ParameterSpec::optional("body", ValueKind::Any)
                        .with_default(Value::Null)
                        .with_description("Sent as JSON, or as raw text when a string"),
                )
                .with_parameter(
                    ParameterSpec::optional("headers", ValueKind::Object)
                        .with_default(Value::Object(BTreeMap::new())),
                )
                .with_output("status", ValueKind::Number)
                .with_output("body", ValueKind::String)
                .with_output("headers", ValueKind::Object),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let url = ctx.require_str("url")?;
        let method_value = ctx.get_input_or("method", Value::from("GET"));
        let method = method_value.as_str().unwrap_or("GET").to_uppercase();

        let request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "PUT" => self.client.put(url),
            "DELETE" => self.client.delete(url),
            _ => return Err(NodeError::Configuration(format!("Unsupported method: {}", method))),
        };

        let request = match ctx.inputs.get("body") {
            Some(Value::String(text)) => request.body(text.clone()),
            Some(body) if !body.is_null() => request.json(&body.to_json()),
            _ => request,
        };

        let request = match ctx.inputs.get("headers").and_then(Value::as_object) {
            Some(headers) => headers.iter().fold(request, |req, (key, value)| {
                req.header(key.as_str(), value.to_string())
            }),
            None => request,
        };

        ctx.events.info(format!("{} {}", method, url));

        let response = tokio::select! {
            sent = request.send() => sent
                .map_err(|e| NodeError::ExecutionFailed(format!("HTTP request failed: {}", e)))?,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let status = response.status().as_u16();
        let headers_map: BTreeMap<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(v.to_str().unwrap_or(""))))
            .collect();

        let body_text = response
            .text()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        ctx.events.info(format!("Response status: {}", status));

        Ok(NodeOutput::new()
            .with_output("status", status as f64)
            .with_output("body", body_text)
            .with_output("headers", Value::Object(headers_map)))
    }
}
