//! Field path resolution against nested Avro records.
//!
//! A path is `$.` followed by dot-separated field names (`$.address.city`);
//! a bare name addresses a top-level field. A union of `null` and one
//! other branch is traversed as that branch. Every path must end at
//! exactly one scalar field.

use super::AvroSchema;
use crate::error::{FormatError, FormatResult};
use crate::schema::legacy;

/// A resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldHandle {
    /// Child index at each record level, outermost first.
    pub path: Vec<usize>,
    /// The scalar leaf schema (null branch removed).
    pub leaf: AvroSchema,
    /// Whether the leaf or any record on the way is nullable.
    pub nullable: bool,
}

/// Resolves `path` against `root`.
///
/// With `legacy` set, compound field names are matched on their plain
/// name part.
///
/// # Errors
///
/// Returns [`FormatError::PathResolution`] for malformed paths, missing
/// or ambiguous children, non-record intermediates and non-scalar leaves.
pub fn resolve(path: &str, root: &AvroSchema, legacy: bool) -> FormatResult<FieldHandle> {
    let segments = split_path(path)?;
    let mut current = root;
    let mut indices = Vec::with_capacity(segments.len());
    let mut nullable = false;

    for segment in segments {
        let (node, null_branch) = current
            .non_null()
            .ok_or_else(|| FormatError::path(path, "union has more than one non-null branch"))?;
        nullable |= null_branch;
        let record = node
            .as_record()
            .ok_or_else(|| FormatError::path(path, format!("'{segment}' is not inside a record")))?;
        let mut matches = record.fields.iter().enumerate().filter(|(_, f)| {
            f.name == segment || (legacy && legacy::plain_name(&f.name) == segment)
        });
        let (idx, field) = matches
            .next()
            .ok_or_else(|| FormatError::path(path, format!("no field named '{segment}'")))?;
        if matches.next().is_some() {
            return Err(FormatError::path(path, format!("'{segment}' matches more than one field")));
        }
        indices.push(idx);
        current = &field.schema;
    }

    let (leaf, null_branch) = current
        .non_null()
        .ok_or_else(|| FormatError::path(path, "union has more than one non-null branch"))?;
    if !leaf.is_scalar() {
        return Err(FormatError::path(
            path,
            format!("target is a {}, not a scalar", leaf.avro_type()),
        ));
    }
    Ok(FieldHandle {
        path: indices,
        leaf: leaf.clone(),
        nullable: nullable || null_branch,
    })
}

fn split_path(path: &str) -> FormatResult<Vec<&str>> {
    if path.contains(['[', ']', '*']) {
        return Err(FormatError::path(path, "wildcards and array indices are not supported"));
    }
    let segments: Vec<&str> = match path.strip_prefix("$.") {
        Some(rest) => rest.split('.').collect(),
        None if path.starts_with('$') => {
            return Err(FormatError::path(path, "expected '$.' prefix"));
        }
        None => vec![path],
    };
    if segments.iter().any(|s| s.is_empty()) {
        return Err(FormatError::path(path, "empty path segment"));
    }
    Ok(segments)
}
