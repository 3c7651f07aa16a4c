use log::{ debug, warn };
use thiserror::Error;

use crate::annotation::{ self, ParseError };
use crate::schema::{ IndexPlan, IndexSpec, RecordDescriptor };

/// A parse failure tied to the field that carried the annotation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("index annotation on field '{field}' (stored as '{storage_name}'): {cause}")]
pub struct FieldIndexError {
    pub field: String,
    pub storage_name: String,
    #[source]
    pub cause: ParseError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Field(FieldIndexError),
    #[error("{} index annotations failed to parse; first: {}", .0.len(), first(.0))]
    Fields(Vec<FieldIndexError>),
}

fn first(errors: &[FieldIndexError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

/// How planning reacts to an invalid annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanMode {
    /// Stop at the first invalid field.
    #[default]
    FailFast,
    /// Parse every field and report all failures in declaration order.
    CollectAll,
}

/// Builds the index plan of a record, one spec per annotated field, in
/// declaration order.
pub fn plan(descriptor: &RecordDescriptor) -> Result<IndexPlan, PlanError> {
    plan_with(descriptor, PlanMode::FailFast)
}

pub fn plan_with(descriptor: &RecordDescriptor, mode: PlanMode) -> Result<IndexPlan, PlanError> {
    let mut specs = IndexPlan::new();
    let mut failures = Vec::new();

    for field in &descriptor.fields {
        let Some(raw) = field.annotation.as_deref() else {
            continue;
        };
        match annotation::parse(raw) {
            Ok(option) => specs.push(IndexSpec::from_option(&field.storage_name, &option)),
            Err(cause) => {
                warn!(
                    "Invalid index annotation '{}' on {}.{}: {}",
                    raw,
                    descriptor.record,
                    field.field,
                    cause
                );
                let err = FieldIndexError {
                    field: field.field.clone(),
                    storage_name: field.storage_name.clone(),
                    cause,
                };
                if mode == PlanMode::FailFast {
                    return Err(PlanError::Field(err));
                }
                failures.push(err);
            }
        }
    }

    if failures.len() == 1 {
        return Err(PlanError::Field(failures.remove(0)));
    }
    if !failures.is_empty() {
        return Err(PlanError::Fields(failures));
    }

    debug!("Planned {} index specs for record '{}'", specs.len(), descriptor.record);
    Ok(specs)
}
