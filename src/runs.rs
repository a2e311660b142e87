//! Asynchronous run resources and the create-then-poll convenience layer.
//!
//! Every processing endpoint follows the same lifecycle: `POST` creates a run
//! in a non-terminal status, `GET /{id}` refreshes it. [`RunResource`] captures
//! exactly those two calls so [`create_and_poll`] can drive any of them.

use std::{fmt, sync::Arc};

use futures_util::future::BoxFuture;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    client::ClientInner,
    errors::{Result, SchemaConversionError, ValidationError},
    http::{ApiCall, RequestOptions},
    identifiers::{FileId, ProcessorId, RunId, WorkflowId},
    polling::{poll_until_done, PollingOptions},
    schema::{convert, ObjectSchema},
};

/// Status value of a run.
pub trait RunStatusKind {
    fn as_str(&self) -> &str;
    fn is_terminal(&self) -> bool;
}

/// A snapshot of a run as returned by create/retrieve.
pub trait RunSnapshot {
    type Status: RunStatusKind;

    fn id(&self) -> &RunId;
    fn status(&self) -> &Self::Status;

    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

macro_rules! string_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
        pending: [$($pending:ident),+]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A status this SDK does not know about yet.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Other(other) => other.as_str(),
                }
            }

            /// Whether polling should stop. Unknown statuses count as terminal.
            pub fn is_terminal(&self) -> bool {
                !matches!(self, $($name::$pending)|+)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl RunStatusKind for $name {
            fn as_str(&self) -> &str {
                $name::as_str(self)
            }

            fn is_terminal(&self) -> bool {
                $name::is_terminal(self)
            }
        }
    };
}

string_status_enum! {
    /// Status of an extract, classify or split run.
    ProcessorRunStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Processed => "PROCESSED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
    pending: [Pending, Processing]
}

string_status_enum! {
    /// Status of a workflow run. `NEEDS_REVIEW` is terminal for polling purposes.
    WorkflowRunStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        NeedsReview => "NEEDS_REVIEW",
        Rejected => "REJECTED",
        Processed => "PROCESSED",
        Failed => "FAILED",
        Cancelled => "CANCELLED",
    }
    pending: [Pending, Processing]
}

/// An extract, classify or split run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorRun {
    pub id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    pub status: ProcessorRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Remaining fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProcessorRun {
    /// Decode the run output into a caller type.
    ///
    /// Extraction outputs wrap the data in `{"value": ...}`; that envelope is
    /// unwrapped when present.
    pub fn output_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(output) = &self.output else {
            return Ok(None);
        };
        let value = output.get("value").unwrap_or(output);
        Ok(Some(serde_json::from_value(value.clone())?))
    }
}

impl RunSnapshot for ProcessorRun {
    type Status = ProcessorRunStatus;

    fn id(&self) -> &RunId {
        &self.id
    }

    fn status(&self) -> &ProcessorRunStatus {
        &self.status
    }
}

/// A workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: RunId,
    pub status: WorkflowRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunSnapshot for WorkflowRun {
    type Status = WorkflowRunStatus;

    fn id(&self) -> &RunId {
        &self.id
    }

    fn status(&self) -> &WorkflowRunStatus {
        &self.status
    }
}

/// Document input for a run. Exactly one of `url`, `id` or `text` must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FileInput {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn from_id(id: impl Into<FileId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self, field: &str) -> Result<()> {
        let set = [
            self.url.as_deref().is_some_and(|s| !s.trim().is_empty()),
            self.id.as_ref().is_some_and(|id| !id.is_empty()),
            self.text.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count();
        if set != 1 {
            return Err(ValidationError::new("provide exactly one of url, id or text")
                .with_field(field)
                .into());
        }
        Ok(())
    }
}

/// Reference to a saved extractor, classifier or splitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorRef {
    pub id: ProcessorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_config: Option<Value>,
}

impl ProcessorRef {
    pub fn new(id: impl Into<ProcessorId>) -> Self {
        Self {
            id: id.into(),
            version: None,
            override_config: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Inline extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConfig {
    /// Wire-format JSON schema of the fields to extract.
    pub schema: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExtractConfig {
    /// Build a config whose schema is converted from a typed object schema.
    pub fn from_schema(schema: &ObjectSchema) -> Result<Self, SchemaConversionError> {
        Ok(Self {
            schema: convert(schema)?,
            extra: Map::new(),
        })
    }

    /// Set an extra config key (e.g. `baseProcessor`, `advancedOptions`).
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

fn validate_processor(
    processor: &Option<ProcessorRef>,
    has_config: bool,
    field: &str,
) -> Result<()> {
    let has_ref = processor.as_ref().is_some_and(|p| !p.id.is_empty());
    if !has_ref && !has_config {
        return Err(ValidationError::new("provide a processor reference or an inline config")
            .with_field(field)
            .into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRunCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<ProcessorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ExtractConfig>,
    pub file: FileInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ExtractRunCreateRequest {
    pub fn with_extractor(extractor: ProcessorRef, file: FileInput) -> Self {
        Self {
            extractor: Some(extractor),
            config: None,
            file,
            priority: None,
            metadata: None,
        }
    }

    pub fn with_config(config: ExtractConfig, file: FileInput) -> Self {
        Self {
            extractor: None,
            config: Some(config),
            file,
            priority: None,
            metadata: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_processor(&self.extractor, self.config.is_some(), "extractor")?;
        self.file.validate("file")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRunCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ProcessorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub file: FileInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ClassifyRunCreateRequest {
    pub fn validate(&self) -> Result<()> {
        validate_processor(&self.classifier, self.config.is_some(), "classifier")?;
        self.file.validate("file")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRunCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitter: Option<ProcessorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub file: FileInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SplitRunCreateRequest {
    pub fn validate(&self) -> Result<()> {
        validate_processor(&self.splitter, self.config.is_some(), "splitter")?;
        self.file.validate("file")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRef {
    pub id: WorkflowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRunCreateRequest {
    pub workflow: WorkflowRef,
    pub file: FileInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl WorkflowRunCreateRequest {
    pub fn new(workflow: impl Into<WorkflowId>, file: FileInput) -> Self {
        Self {
            workflow: WorkflowRef {
                id: workflow.into(),
                version: None,
            },
            file,
            priority: None,
            metadata: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workflow.id.is_empty() {
            return Err(ValidationError::new("workflow id is required")
                .with_field("workflow.id")
                .into());
        }
        self.file.validate("file")
    }
}

/// The two transport calls the polling layer needs from a run endpoint.
pub trait RunResource: Send + Sync {
    type CreateRequest: Send;
    type Run: RunSnapshot + Send;

    fn create(&self, request: Self::CreateRequest) -> BoxFuture<'_, Result<Self::Run>>;

    fn retrieve<'a>(&'a self, id: &'a RunId) -> BoxFuture<'a, Result<Self::Run>>;
}

/// Create a run and wait for it to reach a terminal status.
///
/// When the create response is already terminal it is returned without any
/// retrieve call.
pub async fn create_and_poll<R>(
    resource: &R,
    request: R::CreateRequest,
    options: &PollingOptions,
) -> Result<R::Run>
where
    R: RunResource + ?Sized,
{
    let created = resource.create(request).await?;
    if created.is_terminal() {
        return Ok(created);
    }
    let id = created.id().clone();
    #[cfg(feature = "tracing")]
    tracing::debug!(run_id = %id, status = created.status().as_str(), "polling run");
    let id = &id;
    poll_until_done(
        move || resource.retrieve(id),
        |run: &R::Run| run.is_terminal(),
        options,
    )
    .await
}

fn require_id(id: &RunId) -> Result<()> {
    if id.is_empty() {
        return Err(ValidationError::new("run id is required")
            .with_field("id")
            .into());
    }
    Ok(())
}

macro_rules! run_resource_client {
    (
        $(#[$meta:meta])*
        $client:ident, $path:literal, $request:ty, $run:ty
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $client {
            pub(crate) inner: Arc<ClientInner>,
        }

        impl $client {
            pub async fn create(&self, request: $request) -> Result<$run> {
                self.create_with_options(request, &RequestOptions::default())
                    .await
            }

            pub async fn create_with_options(
                &self,
                request: $request,
                options: &RequestOptions,
            ) -> Result<$run> {
                request.validate()?;
                let body = serde_json::to_value(&request)?;
                self.inner
                    .send(ApiCall::Create { collection: $path, body }, options)
                    .await
            }

            pub async fn retrieve(&self, id: &RunId) -> Result<$run> {
                require_id(id)?;
                self.inner
                    .send(
                        ApiCall::Retrieve { collection: $path, id },
                        &RequestOptions::default(),
                    )
                    .await
            }

            /// Create a run and poll until it reaches a terminal status.
            pub async fn create_and_poll(
                &self,
                request: $request,
                options: &PollingOptions,
            ) -> Result<$run> {
                create_and_poll(self, request, options).await
            }
        }

        impl RunResource for $client {
            type CreateRequest = $request;
            type Run = $run;

            fn create(&self, request: $request) -> BoxFuture<'_, Result<$run>> {
                Box::pin($client::create(self, request))
            }

            fn retrieve<'a>(&'a self, id: &'a RunId) -> BoxFuture<'a, Result<$run>> {
                Box::pin($client::retrieve(self, id))
            }
        }
    };
}

run_resource_client!(
    /// `/extract_runs`
    ExtractRunsClient,
    "extract_runs",
    ExtractRunCreateRequest,
    ProcessorRun
);

run_resource_client!(
    /// `/classify_runs`
    ClassifyRunsClient,
    "classify_runs",
    ClassifyRunCreateRequest,
    ProcessorRun
);

run_resource_client!(
    /// `/split_runs`
    SplitRunsClient,
    "split_runs",
    SplitRunCreateRequest,
    ProcessorRun
);

run_resource_client!(
    /// `/workflow_runs`
    WorkflowRunsClient,
    "workflow_runs",
    WorkflowRunCreateRequest,
    WorkflowRun
);
