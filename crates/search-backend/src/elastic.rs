//! Elasticsearch HTTP backend.
//!
//! Speaks the JSON REST API directly over reqwest: `_bulk` with NDJSON
//! bodies, `_update` with Painless scripts, `_update_by_query` and
//! `_delete_by_query` with bool-filter queries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use search_types::{Filter, Settings, SortField, SortOrder};

use crate::backend::SearchBackend;
use crate::error::BackendError;
use crate::requests::{
    BulkItemFailure, BulkRequest, BulkResponse, DeleteByQueryRequest, DeleteRequest,
    IndexRequest, SearchHit, SearchRequest, SearchResponse, UpdateBody, UpdateByQueryRequest,
    UpdateRequest,
};
use crate::schema::IndexDefinition;

/// Connection settings for [`ElasticBackend`].
#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Endpoint, e.g. "http://localhost:9200"
    pub base_url: String,

    /// Basic-auth user
    pub username: Option<String>,

    /// Basic-auth password
    pub password: Option<SecretString>,

    /// Request timeout
    pub timeout: Duration,
}

impl ElasticConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.backend_url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone().map(SecretString::from),
            timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`SearchBackend`] over the Elasticsearch REST API.
pub struct ElasticBackend {
    client: Client,
    base_url: Url,
    config: ElasticConfig,
}

impl ElasticBackend {
    pub fn new(config: ElasticConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            BackendError::Config(format!("Invalid backend URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "Invalid backend URL {}",
                config.base_url
            )));
        }

        info!(url = %config.base_url, "Elasticsearch backend configured");
        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config(format!("Invalid backend URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, BackendError> {
        let builder = self.client.request(method, self.url(segments)?);
        Ok(match &self.config.username {
            Some(user) => builder.basic_auth(
                user,
                self.config.password.as_ref().map(|p| p.expose_secret().to_string()),
            ),
            None => builder,
        })
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, BackendError> {
        let response = check(builder.send().await?).await?;
        let text = response.text().await?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

async fn check(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND.as_u16() {
        if let Some(index) = missing_index(&body) {
            return Err(BackendError::IndexNotFound(index));
        }
    }
    Err(BackendError::Status { status, body })
}

/// Name of the missing index if `body` is an `index_not_found_exception`.
fn missing_index(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = &value["error"];
    (error["type"] == "index_not_found_exception")
        .then(|| error["index"].as_str().unwrap_or_default().to_string())
}

fn refresh_param(refresh: bool) -> &'static str {
    if refresh {
        "true"
    } else {
        "false"
    }
}

/// Render a [`Filter`] as a query DSL body.
pub fn filter_to_query(filter: &Filter) -> Value {
    match filter {
        Filter::MatchAll => json!({ "match_all": {} }),
        Filter::Term { field, value } => json!({ "term": { field.dotted(): value } }),
        Filter::Terms { field, values } => json!({ "terms": { field.dotted(): values } }),
        Filter::Match { field, text } => json!({ "match": { field.dotted(): text } }),
        Filter::Range { field, gte, lte } => {
            let mut bounds = Map::new();
            if let Some(gte) = gte {
                bounds.insert("gte".to_string(), gte.clone());
            }
            if let Some(lte) = lte {
                bounds.insert("lte".to_string(), lte.clone());
            }
            json!({ "range": { field.dotted(): Value::Object(bounds) } })
        }
        Filter::Exists { field } => json!({ "exists": { "field": field.dotted() } }),
        Filter::All(parts) => {
            let parts: Vec<Value> = parts.iter().map(filter_to_query).collect();
            json!({ "bool": { "filter": parts } })
        }
        Filter::Any(parts) => {
            let parts: Vec<Value> = parts.iter().map(filter_to_query).collect();
            json!({ "bool": { "should": parts, "minimum_should_match": 1 } })
        }
        Filter::Not(inner) => json!({ "bool": { "must_not": [filter_to_query(inner)] } }),
    }
}

fn sort_to_json(sort: &[SortField]) -> Value {
    sort.iter()
        .map(|s| {
            let order = match s.order {
                SortOrder::Ascending => "asc",
                SortOrder::Descending => "desc",
            };
            json!({ s.field.dotted(): { "order": order } })
        })
        .collect()
}

/// NDJSON body for `_bulk`.
fn bulk_body(request: &BulkRequest) -> Result<String, BackendError> {
    let mut body = String::new();
    for op in &request.operations {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), json!(op.index));
        meta.insert("_id".to_string(), json!(op.id.to_string()));
        if let Some(pipeline) = &op.pipeline {
            meta.insert("pipeline".to_string(), json!(pipeline));
        }
        body.push_str(&serde_json::to_string(&json!({ "index": meta }))?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&op.source)?);
        body.push('\n');
    }
    Ok(body)
}

fn parse_bulk_response(body: &Value) -> BulkResponse {
    let mut response = BulkResponse::default();
    let items = body["items"].as_array().cloned().unwrap_or_default();
    for item in items {
        let Some((_, result)) = item.as_object().and_then(|o| o.iter().next()) else {
            continue;
        };
        let status = result["status"].as_u64().unwrap_or(0) as u16;
        match result.get("error") {
            Some(error) if !error.is_null() => response.failures.push(BulkItemFailure {
                id: result["_id"].as_str().unwrap_or_default().to_string(),
                status,
                reason: error["reason"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string()),
            }),
            _ => response.indexed += 1,
        }
    }
    response
}

fn parse_search_response(body: &Value) -> SearchResponse {
    let total = match &body["hits"]["total"] {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        other => other["value"].as_u64().unwrap_or(0),
    };
    let hits = body["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| SearchHit {
                    id: match &hit["_id"] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                    source: hit.get("_source").cloned(),
                })
                .collect()
        })
        .unwrap_or_default();
    SearchResponse { total, hits }
}

#[async_trait]
impl SearchBackend for ElasticBackend {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError> {
        let response = self.request(Method::HEAD, &[index])?.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), BackendError> {
        definition.validate()?;
        self.send_json(
            self.request(Method::PUT, &[definition.name()])?
                .json(&definition.to_json()),
        )
        .await?;
        info!(index = %definition.name(), "Created index");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), BackendError> {
        let response = self.request(Method::DELETE, &[index])?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(index, "Index already absent");
            return Ok(());
        }
        check(response).await?;
        info!(index, "Deleted index");
        Ok(())
    }

    async fn bulk_index(&self, request: BulkRequest) -> Result<BulkResponse, BackendError> {
        if request.is_empty() {
            return Ok(BulkResponse::default());
        }
        let body = bulk_body(&request)?;
        let result = self
            .send_json(
                self.request(Method::POST, &["_bulk"])?
                    .query(&[("refresh", refresh_param(request.refresh))])
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
            )
            .await?;
        let response = parse_bulk_response(&result);
        debug!(
            items = request.len(),
            indexed = response.indexed,
            failed = response.failures.len(),
            "Bulk request completed"
        );
        Ok(response)
    }

    async fn index_document(&self, request: IndexRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        let mut builder = self
            .request(Method::PUT, &[request.index.as_str(), "_doc", id.as_str()])?
            .query(&[("refresh", refresh_param(request.refresh))]);
        if let Some(pipeline) = &request.pipeline {
            builder = builder.query(&[("pipeline", pipeline.as_str())]);
        }
        self.send_json(builder.json(&request.source)).await?;
        Ok(())
    }

    async fn update_document(&self, request: UpdateRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        let body = match &request.body {
            UpdateBody::Script(script) => json!({ "script": script.to_json() }),
            UpdateBody::Doc { doc, upsert } => json!({ "doc": doc, "doc_as_upsert": upsert }),
        };
        let response = self
            .request(Method::POST, &[request.index.as_str(), "_update", id.as_str()])?
            .query(&[("refresh", refresh_param(request.refresh))])
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            if missing_index(&body).is_some() {
                return Err(BackendError::IndexNotFound(request.index));
            }
            return Err(BackendError::DocumentNotFound(format!("{}/{}", request.index, id)));
        }
        check(response).await?;
        Ok(())
    }

    async fn update_by_query(&self, request: UpdateByQueryRequest) -> Result<u64, BackendError> {
        let body = json!({
            "query": filter_to_query(&request.query),
            "script": request.script.to_json(),
        });
        let result = self
            .send_json(
                self.request(Method::POST, &[request.index.as_str(), "_update_by_query"])?
                    .query(&[
                        ("refresh", refresh_param(request.refresh)),
                        ("conflicts", "proceed"),
                    ])
                    .json(&body),
            )
            .await?;
        let updated = result["updated"].as_u64().unwrap_or(0);
        if let Some(failures) = result["failures"].as_array().filter(|f| !f.is_empty()) {
            warn!(index = %request.index, failures = failures.len(), "Update by query had failures");
        }
        Ok(updated)
    }

    async fn delete_document(&self, request: DeleteRequest) -> Result<(), BackendError> {
        let id = request.id.to_string();
        let response = self
            .request(Method::DELETE, &[request.index.as_str(), "_doc", id.as_str()])?
            .query(&[("refresh", refresh_param(request.refresh))])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(index = %request.index, id = %request.id, "Document already absent");
            return Ok(());
        }
        check(response).await?;
        Ok(())
    }

    async fn delete_by_query(&self, request: DeleteByQueryRequest) -> Result<u64, BackendError> {
        let body = json!({ "query": filter_to_query(&request.query) });
        let result = self
            .send_json(
                self.request(Method::POST, &[request.index.as_str(), "_delete_by_query"])?
                    .query(&[
                        ("refresh", refresh_param(request.refresh)),
                        ("conflicts", "proceed"),
                    ])
                    .json(&body),
            )
            .await?;
        Ok(result["deleted"].as_u64().unwrap_or(0))
    }

    async fn flush(&self, index: &str) -> Result<(), BackendError> {
        self.send_json(self.request(Method::POST, &[index, "_flush"])?)
            .await?;
        Ok(())
    }

    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        self.send_json(self.request(Method::POST, &[index, "_refresh"])?)
            .await?;
        Ok(())
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, BackendError> {
        let mut body = Map::new();
        body.insert("query".to_string(), filter_to_query(&request.query));
        body.insert("track_total_hits".to_string(), json!(true));
        if request.only_ids {
            body.insert("_source".to_string(), json!(false));
        }
        if !request.sort.is_empty() {
            body.insert("sort".to_string(), sort_to_json(&request.sort));
        }
        if let Some(from) = request.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = request.size {
            body.insert("size".to_string(), json!(size));
        }

        let result = self
            .send_json(
                self.request(Method::POST, &[request.index.as_str(), "_search"])?
                    .json(&Value::Object(body)),
            )
            .await?;
        Ok(parse_search_response(&result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_types::{EntityId, FieldPath, IndexMapping, UpdateScript};
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::requests::BulkOperation;

    async fn backend(server: &MockServer) -> ElasticBackend {
        ElasticBackend::new(ElasticConfig::new(server.uri())).unwrap()
    }

    #[test]
    fn test_filter_to_query() {
        let filter = Filter::tenant(3).and(Filter::Not(Box::new(Filter::Exists {
            field: FieldPath::parse("DeletedOn"),
        })));
        assert_eq!(
            filter_to_query(&filter),
            json!({
                "bool": {
                    "filter": [
                        { "term": { "tenantId": 3 } },
                        { "bool": { "must_not": [{ "exists": { "field": "deletedOn" } }] } }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_range_omits_open_bounds() {
        let filter = Filter::Range {
            field: FieldPath::parse("Size"),
            gte: Some(json!(10)),
            lte: None,
        };
        assert_eq!(filter_to_query(&filter), json!({ "range": { "size": { "gte": 10 } } }));
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let mut request = BulkRequest::new(false);
        request.push(BulkOperation {
            index: "files".to_string(),
            id: EntityId::Int(1),
            pipeline: Some("attachments".to_string()),
            source: json!({ "id": 1 }),
        });
        let body = bulk_body(&request).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let meta: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(meta["index"]["_id"], "1");
        assert_eq!(meta["index"]["pipeline"], "attachments");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_parse_bulk_item_failures() {
        let body = json!({
            "errors": true,
            "items": [
                { "index": { "_id": "1", "status": 201 } },
                { "index": { "_id": "2", "status": 400,
                    "error": { "type": "mapper_parsing_exception", "reason": "bad field" } } }
            ]
        });
        let response = parse_bulk_response(&body);
        assert_eq!(response.indexed, 1);
        assert_eq!(
            response.failures,
            vec![BulkItemFailure {
                id: "2".to_string(),
                status: 400,
                reason: "bad field".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_index_exists() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        assert!(backend.index_exists("files").await.unwrap());
        assert!(!backend.index_exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_index_sends_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/files"))
            .and(body_partial_json(json!({
                "settings": { "analysis": { "char_filter": { "html": { "type": "html_strip" } } } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "acknowledged": true })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let def = IndexDefinition::new("files", IndexMapping::new().text("Title"));
        backend.create_index(&def).await.unwrap();
    }

    #[tokio::test]
    async fn test_bulk_index_reports_item_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(query_param("refresh", "true"))
            .and(body_string_contains("\"pipeline\":\"attachments\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": true,
                "items": [
                    { "index": { "_id": "1", "status": 201 } },
                    { "index": { "_id": "2", "status": 429, "error": { "reason": "rejected" } } }
                ]
            })))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let mut request = BulkRequest::new(true);
        for id in 1..=2i64 {
            request.push(BulkOperation {
                index: "files".to_string(),
                id: id.into(),
                pipeline: Some("attachments".to_string()),
                source: json!({ "id": id }),
            });
        }
        let response = backend.bulk_index(request).await.unwrap();
        assert_eq!(response.indexed, 1);
        assert_eq!(response.failures[0].status, 429);
    }

    #[tokio::test]
    async fn test_update_script_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_update/7"))
            .and(body_partial_json(json!({
                "script": { "lang": "painless", "params": { "p_title": "new" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "updated" })))
            .expect(1)
            .mount(&server)
            .await;

        let mut script = UpdateScript::new();
        script.insert_param("p_title", json!("new"));
        script.push(search_types::ScriptStatement::Set {
            path: FieldPath::parse("title"),
            param: "p_title".to_string(),
        });

        let backend = backend(&server).await;
        backend
            .update_document(UpdateRequest {
                index: "files".to_string(),
                id: EntityId::Int(7),
                body: UpdateBody::Script(script),
                refresh: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_query_is_tenant_filtered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_delete_by_query"))
            .and(body_partial_json(json!({
                "query": { "term": { "tenantId": 5 } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": 4 })))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let deleted = backend
            .delete_by_query(DeleteByQueryRequest {
                index: "files".to_string(),
                query: Filter::tenant(5),
                refresh: true,
            })
            .await
            .unwrap();
        assert_eq!(deleted, 4);
    }

    #[tokio::test]
    async fn test_search_parses_hits_and_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_search"))
            .and(body_partial_json(json!({ "_source": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": {
                    "total": { "value": 42, "relation": "eq" },
                    "hits": [ { "_id": "1" }, { "_id": "2" } ]
                }
            })))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let mut request = SearchRequest::new("files", Filter::tenant(1));
        request.only_ids = true;
        let response = backend.search(request).await.unwrap();
        assert_eq!(response.total, 42);
        let ids: Vec<_> = response.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(response.hits[0].source.is_none());
    }

    #[tokio::test]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_refresh"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let err = backend.refresh("files").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_string_ids_are_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/files/_doc/a%2Fb"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "result": "created" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/files/_doc/q%3F%23x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "deleted" })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        backend
            .index_document(IndexRequest {
                index: "files".to_string(),
                id: EntityId::Str("a/b".to_string()),
                pipeline: None,
                source: json!({ "id": "a/b" }),
                refresh: false,
            })
            .await
            .unwrap();
        backend
            .delete_document(DeleteRequest {
                index: "files".to_string(),
                id: EntityId::Str("q?#x".to_string()),
                refresh: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_with_slash_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_update/2024%2F07"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "updated" })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        backend
            .update_document(UpdateRequest {
                index: "files".to_string(),
                id: EntityId::Str("2024/07".to_string()),
                body: UpdateBody::Doc {
                    doc: json!({ "title": "July" }),
                    upsert: true,
                },
                refresh: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_distinguishes_missing_index_from_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/files/_update/1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "index_not_found_exception", "index": "files" },
                "status": 404
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files/_update/2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "document_missing_exception", "index": "files" },
                "status": 404
            })))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let update = |id: i64| UpdateRequest {
            index: "files".to_string(),
            id: EntityId::Int(id),
            body: UpdateBody::Doc {
                doc: json!({ "title": "x" }),
                upsert: false,
            },
            refresh: false,
        };

        let err = backend.update_document(update(1)).await.unwrap_err();
        assert!(matches!(err, BackendError::IndexNotFound(ref index) if index == "files"));
        let err = backend.update_document(update(2)).await.unwrap_err();
        assert!(matches!(err, BackendError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_search_on_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mail/_search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "type": "index_not_found_exception", "index": "mail" },
                "status": 404
            })))
            .mount(&server)
            .await;

        let backend = backend(&server).await;
        let err = backend
            .search(SearchRequest::new("mail", Filter::tenant(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::IndexNotFound(ref index) if index == "mail"));
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            ElasticBackend::new(ElasticConfig::new("mailto:ops@example.com")),
            Err(BackendError::Config(_))
        ));
    }
}
