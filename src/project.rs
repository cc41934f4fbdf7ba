//! Project-scoped REDCap operations.
//!
//! [`RedcapProject`] is the high-level surface for one project: each
//! operation validates its arguments, builds a fresh parameter set,
//! delegates to [`RedcapClient::call`], checks the response for the
//! application-error envelope, and decodes per the requested format.
//! [`Redcap`] is the super-token entry point for project creation.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::batch::{self, RecordIdBatches};
use crate::client::RedcapClient;
use crate::error::{application_error, RedcapError, Result};
use crate::params::RequestParameters;
use crate::transport::FileUpload;
use crate::validate::{self, ApiToken, Format};

/// Formats accepted as project-creation data.
const PROJECT_DATA_FORMATS: &[Format] = &[Format::Json, Format::Csv, Format::Xml];

/// Layout of record data on the wire: one row per record (`flat`) or
/// one row per value (`eav`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordType {
    #[default]
    Flat,
    Eav,
}

impl RecordType {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Eav => "eav",
        }
    }
}

/// Export coded values (`raw`) or their display labels (`label`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOrLabel {
    Raw,
    Label,
}

impl RawOrLabel {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Label => "label",
        }
    }
}

/// What a record import reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnContent {
    /// The number of records imported or updated.
    #[default]
    Count,
    /// The ids of the imported records.
    Ids,
}

impl ReturnContent {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Ids => "ids",
        }
    }
}

/// Date layout of imported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Ymd,
    Mdy,
    Dmy,
}

impl DateFormat {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Ymd => "YMD",
            Self::Mdy => "MDY",
            Self::Dmy => "DMY",
        }
    }
}

/// Query parameters for exporting records.
///
/// # Example
///
/// ```
/// use redcapi::ExportRecordsQuery;
///
/// let query = ExportRecordsQuery {
///     fields: vec!["record_id".to_string(), "age".to_string()],
///     filter_logic: Some("[age] > 30".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExportRecordsQuery {
    /// Restrict to these record ids; empty means all records.
    pub records: Vec<String>,
    /// Restrict to these fields; empty means all fields.
    pub fields: Vec<String>,
    /// Restrict to these instruments.
    pub forms: Vec<String>,
    /// Restrict to these events (longitudinal projects).
    pub events: Vec<String>,
    /// Server-evaluated predicate restricting which records are
    /// included, e.g. `[age] > 30`.
    pub filter_logic: Option<String>,
    pub record_type: RecordType,
    pub raw_or_label: Option<RawOrLabel>,
    pub export_checkbox_label: bool,
    pub export_survey_fields: bool,
    pub export_data_access_groups: bool,
}

/// Options for importing records.
#[derive(Debug, Clone, Default)]
pub struct ImportRecordsOptions {
    pub record_type: RecordType,
    /// Overwrite existing values with imported blanks. Off by default;
    /// turning it on is destructive.
    pub overwrite: bool,
    pub return_content: ReturnContent,
    pub date_format: Option<DateFormat>,
}

/// Outcome of a record import, per the requested
/// [`ReturnContent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    Count(u64),
    Ids(Vec<String>),
}

impl ImportResult {
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count(count) => Some(*count),
            Self::Ids(_) => None,
        }
    }

    pub fn ids(&self) -> Option<&[String]> {
        match self {
            Self::Count(_) => None,
            Self::Ids(ids) => Some(ids),
        }
    }
}

/// Query parameters for exporting metadata (the field dictionary).
#[derive(Debug, Clone, Default)]
pub struct MetadataQuery {
    pub fields: Vec<String>,
    pub forms: Vec<String>,
}

/// One REDCap project, scoped by its 32-character API token.
///
/// Cheap to clone; clones share the underlying [`RedcapClient`].
///
/// # Example
///
/// ```no_run
/// use redcapi::{ExportRecordsQuery, RedcapClient, RedcapProject};
///
/// # async fn example() -> redcapi::Result<()> {
/// let client = RedcapClient::new("https://redcap.example.edu/api/")?;
/// let project = RedcapProject::new(client, "1234567890ABCDEF1234567890ABCDEF")?;
///
/// let records = project.export_records(&ExportRecordsQuery::default()).await?;
/// println!("exported {} records", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RedcapProject {
    client: RedcapClient,
    token: ApiToken,
}

impl RedcapProject {
    /// Create a project handle. The token must be a 32-character project
    /// token; super tokens are rejected.
    pub fn new(client: RedcapClient, token: &str) -> Result<Self> {
        Ok(Self {
            client,
            token: ApiToken::project(token)?,
        })
    }

    /// The connection this project issues calls through.
    pub fn client(&self) -> &RedcapClient {
        &self.client
    }

    /// The project's validated API token.
    pub fn token(&self) -> &ApiToken {
        &self.token
    }

    // ---- records ------------------------------------------------------

    /// Export records decoded to native structures.
    #[tracing::instrument(skip(self))]
    pub async fn export_records(&self, query: &ExportRecordsQuery) -> Result<Vec<Value>> {
        let params = self.record_export_params(Format::Php, query)?;
        let body = self.call_checked(params).await?;
        decode_array(&body)
    }

    /// Export records as raw text in `format`.
    #[tracing::instrument(skip(self))]
    pub async fn export_records_raw(
        &self,
        format: Format,
        query: &ExportRecordsQuery,
    ) -> Result<String> {
        let format = format.check_allowed(validate::RECORD_FORMATS, "record export")?;
        let params = self.record_export_params(format, query)?;
        self.call_checked(params).await
    }

    /// Import records given as decoded structures (serialized as JSON on
    /// the wire).
    #[tracing::instrument(skip(self, records))]
    pub async fn import_records(
        &self,
        records: &[Value],
        options: &ImportRecordsOptions,
    ) -> Result<ImportResult> {
        let data = serde_json::to_string(records)?;
        self.import_records_encoded(&data, Format::Json, options)
            .await
    }

    /// Import records from already-encoded text in `format`.
    #[tracing::instrument(skip(self, data))]
    pub async fn import_records_raw(
        &self,
        data: &str,
        format: Format,
        options: &ImportRecordsOptions,
    ) -> Result<ImportResult> {
        if format == Format::Php {
            return Err(RedcapError::InvalidArgument(
                "format 'php' does not apply to encoded data; use import_records".to_string(),
            ));
        }
        let format = format.check_allowed(validate::RECORD_FORMATS, "record import")?;
        self.import_records_encoded(data, format, options).await
    }

    async fn import_records_encoded(
        &self,
        data: &str,
        format: Format,
        options: &ImportRecordsOptions,
    ) -> Result<ImportResult> {
        let mut params = RequestParameters::new(&self.token, "record");
        params.set_format(format);
        params.set("type", options.record_type.wire_name());
        params.set(
            "overwriteBehavior",
            if options.overwrite { "overwrite" } else { "normal" },
        );
        params.set("returnContent", options.return_content.wire_name());
        if let Some(date_format) = options.date_format {
            params.set("dateFormat", date_format.wire_name());
        }
        params.set("data", data);

        let body = self.call_checked(params).await?;
        match options.return_content {
            ReturnContent::Count => Ok(ImportResult::Count(decode_count(&body)?)),
            ReturnContent::Ids => {
                let ids: Vec<String> = serde_json::from_str(body.trim())?;
                Ok(ImportResult::Ids(ids))
            }
        }
    }

    /// Delete records by id, returning the number deleted. The id list
    /// must be explicit and non-empty.
    #[tracing::instrument(skip(self))]
    pub async fn delete_records(&self, records: &[String], arm: Option<&str>) -> Result<u64> {
        if records.is_empty() {
            return Err(RedcapError::InvalidArgument(
                "deleting records requires a non-empty list of record ids".to_string(),
            ));
        }
        validate::record_ids(records)?;

        let mut params = RequestParameters::new(&self.token, "record");
        params.set("action", "delete");
        params.set_indexed("records", records);
        params.set_opt("arm", arm);

        let body = self.call_checked(params).await?;
        decode_count(&body)
    }

    fn record_export_params(
        &self,
        format: Format,
        query: &ExportRecordsQuery,
    ) -> Result<RequestParameters> {
        validate::record_ids(&query.records)?;

        let mut params = RequestParameters::new(&self.token, "record");
        params.set_format(format);
        params.set("type", query.record_type.wire_name());
        params.set_indexed("records", &query.records);
        params.set_indexed("fields", &query.fields);
        params.set_indexed("forms", &query.forms);
        params.set_indexed("events", &query.events);
        params.set_opt("filterLogic", query.filter_logic.as_deref());
        if let Some(raw_or_label) = query.raw_or_label {
            params.set("rawOrLabel", raw_or_label.wire_name());
        }
        if query.export_checkbox_label {
            params.set_bool("exportCheckboxLabel", true);
        }
        if query.export_survey_fields {
            params.set_bool("exportSurveyFields", true);
        }
        if query.export_data_access_groups {
            params.set_bool("exportDataAccessGroups", true);
        }
        Ok(params)
    }

    // ---- batching -----------------------------------------------------

    /// Export the ordered, duplicate-free universe of record ids
    /// matching `filter_logic` (all records when `None`).
    #[tracing::instrument(skip(self))]
    pub async fn export_record_ids(&self, filter_logic: Option<&str>) -> Result<Vec<String>> {
        let id_field = self.record_id_field().await?;
        let query = ExportRecordsQuery {
            fields: vec![id_field.clone()],
            filter_logic: filter_logic.map(str::to_string),
            ..Default::default()
        };
        let records = self.export_records(&query).await?;

        let ids = records
            .iter()
            .filter_map(|record| record.get(&id_field).and_then(id_from_value))
            .collect();
        Ok(batch::dedup_in_order(ids))
    }

    /// Plan batches of at most `batch_size` record ids over the universe
    /// matching `filter_logic`.
    ///
    /// The batch size is validated before the id universe is fetched; an
    /// invalid size never touches the network. The filter fixes only the
    /// id set, not field values: per-batch data fetches must reapply it.
    #[tracing::instrument(skip(self))]
    pub async fn record_id_batches(
        &self,
        batch_size: usize,
        filter_logic: Option<&str>,
    ) -> Result<RecordIdBatches> {
        let batch_size = validate::batch_size(batch_size)?;
        let ids = self.export_record_ids(filter_logic).await?;
        RecordIdBatches::new(ids, batch_size)
    }

    /// Export all records matching `query` in batches of `batch_size`
    /// ids, decoded and merged into one sequence.
    ///
    /// Batches are fetched strictly one after another and an error on
    /// any batch aborts the rest. `query.records` must be empty; the
    /// planner chooses the ids.
    #[tracing::instrument(skip(self))]
    pub async fn export_records_in_batches(
        &self,
        batch_size: usize,
        query: &ExportRecordsQuery,
    ) -> Result<Vec<Value>> {
        let batches = self.plan_batches(batch_size, query).await?;

        let mut all = Vec::new();
        for ids in batches {
            let batch_query = ExportRecordsQuery {
                records: ids,
                ..query.clone()
            };
            all.extend(self.export_records(&batch_query).await?);
        }
        Ok(all)
    }

    /// Export all records matching `query` in batches of `batch_size`
    /// ids, as raw text in `format`.
    ///
    /// Tabular output keeps only the first batch's header line; other
    /// formats concatenate as independent documents (callers needing one
    /// well-formed document must merge them themselves).
    #[tracing::instrument(skip(self))]
    pub async fn export_records_in_batches_raw(
        &self,
        format: Format,
        batch_size: usize,
        query: &ExportRecordsQuery,
    ) -> Result<String> {
        let format = format.check_allowed(validate::RECORD_FORMATS, "record export")?;
        let batches = self.plan_batches(batch_size, query).await?;

        let mut parts = Vec::new();
        for ids in batches {
            let batch_query = ExportRecordsQuery {
                records: ids,
                ..query.clone()
            };
            parts.push(self.export_records_raw(format, &batch_query).await?);
        }

        if format.is_tabular() {
            Ok(batch::stitch_tabular(parts))
        } else {
            Ok(parts.concat())
        }
    }

    async fn plan_batches(
        &self,
        batch_size: usize,
        query: &ExportRecordsQuery,
    ) -> Result<RecordIdBatches> {
        if !query.records.is_empty() {
            return Err(RedcapError::InvalidArgument(
                "a batched export chooses its own record ids; leave query.records empty"
                    .to_string(),
            ));
        }
        self.record_id_batches(batch_size, query.filter_logic.as_deref())
            .await
    }

    // ---- metadata -----------------------------------------------------

    /// Export the field dictionary decoded to native structures.
    #[tracing::instrument(skip(self))]
    pub async fn export_metadata(&self, query: &MetadataQuery) -> Result<Vec<Value>> {
        let params = self.metadata_export_params(Format::Php, query);
        let body = self.call_checked(params).await?;
        decode_array(&body)
    }

    /// Export the field dictionary as raw text in `format`.
    #[tracing::instrument(skip(self))]
    pub async fn export_metadata_raw(
        &self,
        format: Format,
        query: &MetadataQuery,
    ) -> Result<String> {
        let format = format.check_allowed(validate::CONTENT_FORMATS, "metadata export")?;
        let params = self.metadata_export_params(format, query);
        self.call_checked(params).await
    }

    /// Import a field dictionary given as decoded structures, returning
    /// the number of fields imported.
    #[tracing::instrument(skip(self, metadata))]
    pub async fn import_metadata(&self, metadata: &[Value]) -> Result<u64> {
        let data = serde_json::to_string(metadata)?;
        self.import_metadata_encoded(&data, Format::Json).await
    }

    /// Import a field dictionary from already-encoded text in `format`.
    #[tracing::instrument(skip(self, data))]
    pub async fn import_metadata_raw(&self, data: &str, format: Format) -> Result<u64> {
        if format == Format::Php {
            return Err(RedcapError::InvalidArgument(
                "format 'php' does not apply to encoded data; use import_metadata".to_string(),
            ));
        }
        let format = format.check_allowed(validate::CONTENT_FORMATS, "metadata import")?;
        self.import_metadata_encoded(data, format).await
    }

    async fn import_metadata_encoded(&self, data: &str, format: Format) -> Result<u64> {
        let mut params = RequestParameters::new(&self.token, "metadata");
        params.set_format(format);
        params.set("data", data);
        let body = self.call_checked(params).await?;
        decode_count(&body)
    }

    fn metadata_export_params(&self, format: Format, query: &MetadataQuery) -> RequestParameters {
        let mut params = RequestParameters::new(&self.token, "metadata");
        params.set_format(format);
        params.set_indexed("fields", &query.fields);
        params.set_indexed("forms", &query.forms);
        params
    }

    /// The project's record-id field: the first field of the metadata.
    #[tracing::instrument(skip(self))]
    pub async fn record_id_field(&self) -> Result<String> {
        let metadata = self.export_metadata(&MetadataQuery::default()).await?;
        metadata
            .first()
            .and_then(|field| field.get("field_name"))
            .and_then(|name| name.as_str())
            .map(str::to_string)
            .ok_or_else(|| RedcapError::ApiError {
                message: "metadata export returned no fields".to_string(),
                status_code: None,
            })
    }

    // ---- project configuration ---------------------------------------

    /// Export the project's settings and attributes.
    #[tracing::instrument(skip(self))]
    pub async fn export_project_info(&self) -> Result<Value> {
        let mut params = RequestParameters::new(&self.token, "project");
        params.set_format(Format::Php);
        let body = self.call_checked(params).await?;
        Ok(serde_json::from_str(body.trim())?)
    }

    /// Import project settings, returning the number of values accepted.
    #[tracing::instrument(skip(self, settings))]
    pub async fn import_project_info(&self, settings: &Value) -> Result<u64> {
        let mut params = RequestParameters::new(&self.token, "project_settings");
        params.set_format(Format::Json);
        params.set("data", &serde_json::to_string(settings)?);
        let body = self.call_checked(params).await?;
        decode_count(&body)
    }

    /// Export the arms of a longitudinal project.
    #[tracing::instrument(skip(self))]
    pub async fn export_arms(&self) -> Result<Vec<Value>> {
        let body = self.export_content("arm", Format::Php, &[]).await?;
        decode_array(&body)
    }

    /// Export the events of a longitudinal project.
    #[tracing::instrument(skip(self))]
    pub async fn export_events(&self) -> Result<Vec<Value>> {
        let body = self.export_content("event", Format::Php, &[]).await?;
        decode_array(&body)
    }

    /// Export the project's instruments (data collection forms).
    #[tracing::instrument(skip(self))]
    pub async fn export_instruments(&self) -> Result<Vec<Value>> {
        let body = self.export_content("instrument", Format::Php, &[]).await?;
        decode_array(&body)
    }

    /// The REDCap version the server is running.
    #[tracing::instrument(skip(self))]
    pub async fn export_version(&self) -> Result<String> {
        let params = RequestParameters::new(&self.token, "version");
        let body = self.call_checked(params).await?;
        Ok(body.trim().to_string())
    }

    /// One validated request/response round trip for an arbitrary
    /// content type, returning the raw body.
    ///
    /// `extras` supplies operation-specific keys; re-supplying a key
    /// this method already sets fails with
    /// [`RedcapError::TooManyArguments`].
    #[tracing::instrument(skip(self))]
    pub async fn export_content(
        &self,
        content: &str,
        format: Format,
        extras: &[(String, String)],
    ) -> Result<String> {
        validate::required("content", content)?;
        let mut params = RequestParameters::new(&self.token, content);
        params.set_format(format);
        params.extend_extra(extras)?;
        self.call_checked(params).await
    }

    // ---- files --------------------------------------------------------

    /// Export the file stored in `field` for `record`, as raw bytes.
    /// Exporting an absent file fails with [`RedcapError::ApiError`].
    #[tracing::instrument(skip(self))]
    pub async fn export_file(
        &self,
        record: &str,
        field: &str,
        event: Option<&str>,
        repeat_instance: Option<u32>,
    ) -> Result<Vec<u8>> {
        let params = self.file_params("export", record, field, event, repeat_instance)?;
        let outcome = self.client.call(params).await?;
        if let Ok(text) = std::str::from_utf8(&outcome.body) {
            if let Some(message) = application_error(text) {
                return Err(RedcapError::ApiError {
                    message,
                    status_code: Some(outcome.info.status_code),
                });
            }
        }
        Ok(outcome.body)
    }

    /// Export a stored file and write it to `path`.
    #[tracing::instrument(skip(self))]
    pub async fn export_file_to(
        &self,
        path: &Path,
        record: &str,
        field: &str,
        event: Option<&str>,
        repeat_instance: Option<u32>,
    ) -> Result<()> {
        let content = self
            .export_file(record, field, event, repeat_instance)
            .await?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| RedcapError::OutputFileError {
                path: path.display().to_string(),
                source: e,
            })
    }

    /// Upload a local file into `field` for `record` as multipart
    /// content.
    #[tracing::instrument(skip(self))]
    pub async fn import_file(
        &self,
        path: &Path,
        record: &str,
        field: &str,
        event: Option<&str>,
        repeat_instance: Option<u32>,
    ) -> Result<()> {
        let content = read_input_file(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let params = self.file_params("import", record, field, event, repeat_instance)?;
        let upload = FileUpload {
            field: "file".to_string(),
            file_name,
            content,
        };

        let outcome = self.client.call_with_file(params, upload).await?;
        let text = outcome.text();
        if let Some(message) = application_error(&text) {
            return Err(RedcapError::ApiError {
                message,
                status_code: Some(outcome.info.status_code),
            });
        }
        Ok(())
    }

    /// Delete the file stored in `field` for `record`.
    #[tracing::instrument(skip(self))]
    pub async fn delete_file(
        &self,
        record: &str,
        field: &str,
        event: Option<&str>,
    ) -> Result<()> {
        let params = self.file_params("delete", record, field, event, None)?;
        self.call_checked(params).await?;
        Ok(())
    }

    fn file_params(
        &self,
        action: &str,
        record: &str,
        field: &str,
        event: Option<&str>,
        repeat_instance: Option<u32>,
    ) -> Result<RequestParameters> {
        validate::required("record", record)?;
        validate::required("field", field)?;
        validate::repeat_instance(repeat_instance)?;

        let mut params = RequestParameters::new(&self.token, "file");
        params.set("action", action);
        params.set("record", record);
        params.set("field", field);
        params.set_opt("event", event);
        if let Some(instance) = repeat_instance {
            params.set("repeat_instance", &instance.to_string());
        }
        Ok(params)
    }

    // ---- plumbing -----------------------------------------------------

    async fn call_checked(&self, params: RequestParameters) -> Result<String> {
        checked_text(&self.client, params).await
    }
}

/// Super-token entry point: project creation and project handles.
///
/// # Example
///
/// ```no_run
/// use redcapi::{Format, Redcap, RedcapClient};
///
/// # async fn example() -> redcapi::Result<()> {
/// let client = RedcapClient::new("https://redcap.example.edu/api/")?;
/// let redcap = Redcap::new(
///     client,
///     "1234567890ABCDEF1234567890ABCDEF1234567890ABCDEF1234567890ABCDEF",
/// )?;
///
/// let data = r#"[{"project_title": "Diet Study", "purpose": 0}]"#;
/// let project = redcap.create_project(data, Format::Json, None).await?;
/// println!("created project, version {}", project.export_version().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Redcap {
    client: RedcapClient,
    super_token: ApiToken,
}

impl Redcap {
    /// Create the entry point. The token must be a 64-character super
    /// token.
    pub fn new(client: RedcapClient, super_token: &str) -> Result<Self> {
        Ok(Self {
            client,
            super_token: ApiToken::super_token(super_token)?,
        })
    }

    /// The connection project-creation calls are issued through.
    pub fn client(&self) -> &RedcapClient {
        &self.client
    }

    /// Create a project from encoded settings in `format` (`odm`
    /// optionally supplies an ODM document to seed the project's
    /// structure).
    ///
    /// The server answers with the new project's API token; the returned
    /// [`RedcapProject`] shares this connection.
    #[tracing::instrument(skip(self, data, odm))]
    pub async fn create_project(
        &self,
        data: &str,
        format: Format,
        odm: Option<&str>,
    ) -> Result<RedcapProject> {
        let format = format.check_allowed(PROJECT_DATA_FORMATS, "project creation")?;
        validate::required("data", data)?;

        let mut params = RequestParameters::new(&self.super_token, "project");
        params.set_format(format);
        params.set("data", data);
        params.set_opt("odm", odm);

        let body = checked_text(&self.client, params).await?;
        RedcapProject::new(self.client.clone(), body.trim())
    }

    /// A handle for an existing project, reusing this connection.
    pub fn get_project(&self, token: &str) -> Result<RedcapProject> {
        RedcapProject::new(self.client.clone(), token)
    }
}

async fn checked_text(client: &RedcapClient, params: RequestParameters) -> Result<String> {
    let outcome = client.call(params).await?;
    let text = outcome.text().into_owned();
    if let Some(message) = application_error(&text) {
        return Err(RedcapError::ApiError {
            message,
            status_code: Some(outcome.info.status_code),
        });
    }
    Ok(text)
}

/// Decode a JSON array body; an empty successful body means "no data".
fn decode_array(body: &str) -> Result<Vec<Value>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Decode a count reply: either `{"count": n}` or a bare number.
fn decode_count(body: &str) -> Result<u64> {
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct CountEnvelope {
        count: u64,
    }

    let trimmed = body.trim();
    if let Ok(envelope) = serde_json::from_str::<CountEnvelope>(trimmed) {
        return Ok(envelope.count);
    }
    Ok(serde_json::from_str::<u64>(trimmed)?)
}

/// Read a local file for import, mapping each failure mode to its own
/// error kind.
async fn read_input_file(path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(content) => Ok(content),
        Err(e) => {
            let path = path.display().to_string();
            Err(match e.kind() {
                std::io::ErrorKind::NotFound => RedcapError::InputFileNotFound(path),
                std::io::ErrorKind::PermissionDenied => {
                    RedcapError::InputFileUnreadable { path, source: e }
                }
                _ => RedcapError::InputFileError { path, source: e },
            })
        }
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
