//! Conversion of one change record into a bulk action.

use std::sync::Arc;

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, IndexerResult};
use crate::field::{FieldSpec, resolve, resolve_list, value_to_string};
use crate::options::{IdSource, IndexTarget, PipelineConfig, TypeTarget, VersionSource};
use crate::types::{
    ActionDescriptor, BulkAction, ChangeRecord, Document, EventName, ExternalVersion,
    ParsedRecord, RecordMeta,
};

/// Label of resolver-computed versions in validation errors.
const RESOLVED_VERSION_LABEL: &str = "resolved version";

/// Transforms `record` into the action it contributes to the batch.
///
/// Returns `Ok(None)` when the record-transform hook drops the record. Inserts and
/// modifications become index actions followed by their document, removals become delete
/// actions whose version, if any, is incremented by one.
pub async fn transform_record(
    record: &ChangeRecord,
    config: &PipelineConfig,
) -> IndexerResult<Option<RecordMeta>> {
    let parsed = Arc::new(ParsedRecord::decode(&record.dynamodb)?);

    let mut document = parsed.new_image.clone().unwrap_or_default();
    if let Some(pick_fields) = &config.pick_fields {
        document.retain(|key, _| pick_fields.iter().any(|field| field == key));
    }

    let id = resolve_id(&parsed, &document, config)?;
    let index = resolve_index(&parsed, &config.index)?;
    let doc_type = resolve_type(&parsed, config.doc_type.as_ref())?;
    let parent = config
        .parent_field
        .as_deref()
        .map(|field| resolve(&parsed, field).map(value_to_string))
        .transpose()?;
    let version = config
        .version
        .as_ref()
        .map(|source| resolve_version(&parsed, &document, source))
        .transpose()?;

    let mut descriptor = ActionDescriptor {
        index,
        doc_type,
        id,
        parent,
        version,
    };

    if let Some(transform) = &config.hooks.transform_record {
        match transform(document, parsed.clone()).await? {
            Some(transformed) => document = transformed,
            None => {
                debug!(
                    event_name = %record.event_name,
                    id = %descriptor.id,
                    "record dropped by transform hook"
                );

                return Ok(None);
            }
        }
    }

    let (action, document) = match record.event_name() {
        EventName::Insert | EventName::Modify => (BulkAction::index(descriptor), Some(document)),
        EventName::Remove => {
            descriptor.version = descriptor
                .version
                .as_ref()
                .map(ExternalVersion::next)
                .transpose()?;

            (BulkAction::delete(descriptor), None)
        }
        EventName::Unknown(name) => bail!(
            ErrorKind::UnknownEventName,
            "Unknown event name",
            format!("event name `{name}` is not supported, record: {}", record.to_json())
        ),
    };

    debug!(
        event_name = %record.event_name,
        op = %action.op,
        index = %action.descriptor.index,
        id = %action.descriptor.id,
        "record transformed"
    );

    Ok(Some(RecordMeta {
        record: record.clone(),
        parsed,
        action,
        document,
    }))
}

fn resolve_index(parsed: &ParsedRecord, target: &IndexTarget) -> IndexerResult<String> {
    match target {
        IndexTarget::Literal(index) => Ok(index.clone()),
        IndexTarget::Field { field, prefix } => {
            let value = resolve(parsed, field)?;
            Ok(format!("{prefix}{}", value_to_string(value)))
        }
    }
}

/// Blank types are omitted rather than sent empty.
fn resolve_type(
    parsed: &ParsedRecord,
    target: Option<&TypeTarget>,
) -> IndexerResult<Option<String>> {
    let doc_type = match target {
        None => return Ok(None),
        Some(TypeTarget::Literal(doc_type)) => doc_type.clone(),
        Some(TypeTarget::Field(field)) => value_to_string(resolve(parsed, field)?),
    };

    if doc_type.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(doc_type))
}

fn resolve_id(
    parsed: &ParsedRecord,
    document: &Document,
    config: &PipelineConfig,
) -> IndexerResult<String> {
    match &config.id {
        IdSource::Resolver(resolver) => resolver(document, parsed.old_image.as_ref()),
        IdSource::Fields(spec) => resolve_list(parsed, spec, &config.separator),
        IdSource::Keys => {
            let mut names = parsed.keys.keys().cloned().collect::<Vec<_>>();
            names.sort();

            resolve_list(parsed, &FieldSpec::List(names), &config.separator)
        }
    }
}

fn resolve_version(
    parsed: &ParsedRecord,
    document: &Document,
    source: &VersionSource,
) -> IndexerResult<ExternalVersion> {
    match source {
        VersionSource::Field(field) => ExternalVersion::parse(resolve(parsed, field)?, field),
        VersionSource::Resolver(resolver) => {
            let version = resolver(document, parsed.old_image.as_ref())?;
            ExternalVersion::parse(&version, RESOLVED_VERSION_LABEL)
        }
    }
}
