//! Best-effort remote document store.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{Artifact, RecordSink};
use crate::errors::SinkWriteError;
use crate::records::{IdentitySchema, Record};

/// Field holding the stable document id.
pub const DOCUMENT_ID_FIELD: &str = "_id";

/// A remote collection of JSON documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts or replaces documents. Returns how many were accepted.
    async fn upsert(&self, collection: &str, documents: Vec<Value>) -> Result<usize, SinkWriteError>;

    /// Where the store lives, for reports.
    fn location(&self) -> String;
}

/// Turns records into documents carrying `_id = sha256(dedup key)`.
#[must_use]
pub fn to_documents(records: &[Record], schema: &IdentitySchema) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let mut doc = Map::with_capacity(record.len() + 1);
            doc.insert(
                DOCUMENT_ID_FIELD.to_string(),
                Value::String(schema.key(record).digest()),
            );
            for (key, value) in record.fields() {
                if key != DOCUMENT_ID_FIELD {
                    doc.insert(key.clone(), value.clone());
                }
            }
            Value::Object(doc)
        })
        .collect()
}

/// Record sink that forwards to a [`DocumentStore`].
pub struct RemoteRecordSink {
    store: Arc<dyn DocumentStore>,
    collection: String,
    schema: IdentitySchema,
}

impl RemoteRecordSink {
    /// Creates a sink writing into `collection`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>, schema: IdentitySchema) -> Self {
        Self {
            store,
            collection: collection.into(),
            schema,
        }
    }
}

impl std::fmt::Debug for RemoteRecordSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRecordSink")
            .field("location", &self.store.location())
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordSink for RemoteRecordSink {
    fn name(&self) -> &str {
        "remote"
    }

    async fn persist(&self, records: &[Record]) -> Result<Artifact, SinkWriteError> {
        let documents = to_documents(records, &self.schema);
        let accepted = self.store.upsert(&self.collection, documents).await?;
        Ok(Artifact::remote(
            "remote",
            format!("{}/{}", self.store.location(), self.collection),
            accepted,
        ))
    }
}

#[cfg(feature = "remote")]
pub use http::HttpDocumentStore;

#[cfg(feature = "remote")]
mod http {
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;

    use super::DocumentStore;
    use crate::config::RemoteStoreConfig;
    use crate::errors::SinkWriteError;

    const SINK: &str = "remote";

    /// Document store reached over HTTP.
    ///
    /// POSTs `{"documents": [...]}` to
    /// `<uri>/collections/<collection>/documents`.
    #[derive(Debug, Clone)]
    pub struct HttpDocumentStore {
        client: reqwest::Client,
        base_uri: String,
    }

    impl HttpDocumentStore {
        /// Builds a client with a request timeout.
        pub fn new(base_uri: &str, timeout: Duration) -> Result<Self, SinkWriteError> {
            if !(base_uri.starts_with("http://") || base_uri.starts_with("https://")) {
                return Err(SinkWriteError::new(SINK, format!("not an http(s) URI: {base_uri}")));
            }
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| SinkWriteError::new(SINK, e.to_string()))?;
            Ok(Self {
                client,
                base_uri: base_uri.trim_end_matches('/').to_string(),
            })
        }

        /// Builds a client from remote-store settings.
        pub fn from_config(config: &RemoteStoreConfig) -> Result<Self, SinkWriteError> {
            Self::new(&config.uri, crate::config::seconds(config.timeout_secs))
        }

        /// Endpoint for one collection.
        #[must_use]
        pub fn endpoint(&self, collection: &str) -> String {
            format!("{}/collections/{collection}/documents", self.base_uri)
        }
    }

    #[async_trait]
    impl DocumentStore for HttpDocumentStore {
        async fn upsert(&self, collection: &str, documents: Vec<Value>) -> Result<usize, SinkWriteError> {
            let count = documents.len();
            let response = self
                .client
                .post(self.endpoint(collection))
                .json(&serde_json::json!({ "documents": documents }))
                .send()
                .await
                .map_err(|e| SinkWriteError::new(SINK, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                return Err(SinkWriteError::new(SINK, format!("HTTP {status}: {body}")));
            }
            tracing::debug!(collection, count, "Documents accepted by remote store");
            Ok(count)
        }

        fn location(&self) -> String {
            self.base_uri.clone()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_endpoint() {
            let store = HttpDocumentStore::new("https://db.test/api/", Duration::from_secs(5)).unwrap();
            assert_eq!(store.endpoint("reviews"), "https://db.test/api/collections/reviews/documents");
        }

        #[test]
        fn test_rejects_non_http_uri() {
            assert!(HttpDocumentStore::new("mongodb://localhost", Duration::from_secs(5)).is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with_field("author", "kim").with_field("title", "a"),
            Record::new().with_field("author", "lee").with_field("title", "b"),
        ]
    }

    #[test]
    fn test_documents_carry_stable_id_first() {
        let schema = IdentitySchema::threads();
        let docs = to_documents(&records(), &schema);

        assert_eq!(docs.len(), 2);
        let first = docs[0].as_object().unwrap();
        assert_eq!(first.keys().next().unwrap(), "_id");
        assert_eq!(first["_id"], schema.key(&records()[0]).digest());
        assert_ne!(docs[0]["_id"], docs[1]["_id"]);
    }

    #[tokio::test]
    async fn test_sink_forwards_to_store() {
        let mut store = MockDocumentStore::new();
        store
            .expect_upsert()
            .withf(|collection, docs| collection.eq_ignore_ascii_case("threads") && docs.len() == 2)
            .times(1)
            .returning(|_, docs| Ok(docs.len()));
        store.expect_location().return_const("https://db.test".to_string());

        let sink = RemoteRecordSink::new(Arc::new(store), "threads", IdentitySchema::threads());
        let artifact = sink.persist(&records()).await.unwrap();

        assert_eq!(artifact.records, 2);
        assert_eq!(artifact.location, "https://db.test/threads");
    }

    #[tokio::test]
    async fn test_store_failure_is_sink_error() {
        let mut store = MockDocumentStore::new();
        store
            .expect_upsert()
            .returning(|_, _| Err(SinkWriteError::new("remote", "connection refused")));
        store.expect_location().return_const("https://db.test".to_string());

        let sink = RemoteRecordSink::new(Arc::new(store), "threads", IdentitySchema::threads());
        let err = sink.persist(&records()).await.unwrap_err();
        assert_eq!(err.sink, "remote");
    }
}
