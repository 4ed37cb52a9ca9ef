use std::collections::BTreeMap;

use modkit::api::OperationSpec;
use serde_json::{json, Map, Value};

use crate::model::ComponentsRegistry;

pub const BEARER_SCHEME: &str = "bearerAuth";

#[derive(serde::Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: Value,
    pub components: OpenApiComponents,
}

#[derive(serde::Serialize)]
pub struct OpenApiInfo {
    pub title: &'static str,
    pub version: String,
    pub description: Option<&'static str>,
}

#[derive(serde::Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiComponents {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, Value>,
}

/// `$ref` to a registered component, or a minimal inline schema by content type.
fn make_schema(components: &ComponentsRegistry, content_type: &str, name: Option<&str>) -> Value {
    if let Some(name) = name {
        if components.has_schema(name) {
            return json!({ "$ref": format!("#/components/schemas/{name}") });
        }
    }
    match content_type {
        "application/json" => json!({ "type": "object" }),
        "text/plain" | "text/html" => json!({ "type": "string" }),
        _ => json!({}),
    }
}

fn make_content(components: &ComponentsRegistry, content_type: &str, name: Option<&str>) -> Value {
    json!({ content_type: { "schema": make_schema(components, content_type, name) } })
}

fn operation_object(spec: &OperationSpec, components: &ComponentsRegistry) -> Value {
    let mut op = Map::new();

    // Prefer explicit operation_id, fallback to handler_id
    let op_id = spec
        .operation_id
        .clone()
        .unwrap_or_else(|| spec.handler_id.clone());
    op.insert("operationId".into(), Value::String(op_id));

    if let Some(summary) = &spec.summary {
        op.insert("summary".into(), Value::String(summary.clone()));
    }
    if let Some(description) = &spec.description {
        op.insert("description".into(), Value::String(description.clone()));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }

    if let Some(req) = &spec.request_body {
        let mut rb = Map::new();
        if let Some(desc) = &req.description {
            rb.insert("description".into(), Value::String(desc.clone()));
        }
        rb.insert("required".into(), Value::Bool(req.required));
        rb.insert(
            "content".into(),
            make_content(components, req.content_type, req.schema_name.as_deref()),
        );
        op.insert("requestBody".into(), Value::Object(rb));
    }

    let mut responses = Map::new();
    for r in &spec.responses {
        responses.insert(
            r.status.to_string(),
            json!({
                "description": r.description,
                "content": make_content(components, r.content_type, r.schema_name.as_deref()),
            }),
        );
    }
    op.insert("responses".into(), Value::Object(responses));

    if spec.bearer_auth {
        op.insert("security".into(), json!([{ BEARER_SCHEME: [] }]));
    }

    Value::Object(op)
}

/// Assemble an OpenAPI 3.0 document from operation specs and collected components.
pub fn build_document<'a>(
    specs: impl IntoIterator<Item = &'a OperationSpec>,
    components: &ComponentsRegistry,
) -> OpenApi {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    let mut any_bearer = false;

    for spec in specs {
        any_bearer |= spec.bearer_auth;
        paths
            .entry(spec.path.clone())
            .or_default()
            .insert(spec.method.as_str().to_lowercase(), operation_object(spec, components));
    }

    let mut security_schemes = BTreeMap::new();
    if any_bearer {
        security_schemes.insert(
            BEARER_SCHEME.to_string(),
            json!({ "type": "http", "scheme": "bearer" }),
        );
    }

    OpenApi {
        openapi: "3.0.3",
        info: OpenApiInfo {
            title: "Chhaav API",
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: Some("Chhaav session & profile server"),
        },
        paths: json!(paths),
        components: OpenApiComponents {
            schemas: components.schemas.clone(),
            security_schemes,
        },
    }
}
