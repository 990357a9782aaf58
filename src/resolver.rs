//! Header to field resolution.
//!
//! Resolution turns a schema plus a header into designators: `(field, column)`
//! pairs that a [`Mapper`](crate::mapper::Mapper) applies to every data row.
//! It runs once per distinct header and is a pure function of its inputs.

use std::collections::HashMap;

use log::debug;

use crate::{schema::Schema, sheet::Row};

/// Binds a schema field to a column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Designator {
    pub field: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderResolver {
    /// Uses the schema's fixed column order, or declaration order when none
    /// was declared. The header is never inspected.
    Static,
    /// Matches observed header texts against field labels. `None` entries are
    /// missing or blank header cells.
    Dynamic(Vec<Option<String>>),
}

/// Designators plus the header columns and fields that were left over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    pub designators: Vec<Designator>,
    /// Columns whose header text matched no label.
    pub unmatched_columns: Vec<(usize, String)>,
    /// Columns that matched a label claimed again by a later column.
    pub shadowed_columns: Vec<(usize, String)>,
    /// Fields with no column, by field index.
    pub unbound_fields: Vec<usize>,
}

impl HeaderResolver {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        HeaderResolver::Dynamic(
            labels
                .into_iter()
                .map(|label| {
                    let label = label.as_ref();
                    (!label.is_empty()).then(|| label.to_string())
                })
                .collect(),
        )
    }

    pub fn from_row<W: Row + ?Sized>(row: &W) -> Self {
        HeaderResolver::Dynamic(row.header_texts())
    }

    pub fn resolve<R>(&self, schema: &Schema<R>) -> Vec<Designator> {
        self.report(schema).designators
    }

    pub fn report<R>(&self, schema: &Schema<R>) -> ResolutionReport {
        match self {
            HeaderResolver::Static => {
                let designators: Vec<Designator> = schema
                    .column_order()
                    .iter()
                    .enumerate()
                    .map(|(column, &field)| Designator { field, column })
                    .collect();
                let unbound_fields = (0..schema.len())
                    .filter(|idx| !schema.column_order().contains(idx))
                    .collect();
                ResolutionReport {
                    designators,
                    unbound_fields,
                    ..ResolutionReport::default()
                }
            }
            HeaderResolver::Dynamic(header) => resolve_dynamic(schema, header),
        }
    }
}

fn resolve_dynamic<R>(schema: &Schema<R>, header: &[Option<String>]) -> ResolutionReport {
    let mut report = ResolutionReport::default();
    let mut bound: HashMap<usize, usize> = HashMap::with_capacity(schema.len());
    for (column, text) in header.iter().enumerate() {
        let Some(text) = text.as_deref().filter(|text| !text.is_empty()) else {
            continue;
        };
        match schema.field_index(text) {
            Some(field) => {
                if let Some(previous) = bound.insert(field, column)
                    && let Some(Some(previous_text)) = header.get(previous)
                {
                    report
                        .shadowed_columns
                        .push((previous, previous_text.clone()));
                }
            }
            None => report.unmatched_columns.push((column, text.to_string())),
        }
    }

    report.designators = bound
        .into_iter()
        .map(|(field, column)| Designator { field, column })
        .collect();
    report.designators.sort_by_key(|designator| designator.column);
    report.shadowed_columns.sort();
    report.unbound_fields = (0..schema.len())
        .filter(|idx| !report.designators.iter().any(|d| d.field == *idx))
        .collect();

    debug!(
        "Resolved {} of {} header column(s) for '{}' ({} unmatched, {} unbound field(s))",
        report.designators.len(),
        header.len(),
        schema.record_type(),
        report.unmatched_columns.len(),
        report.unbound_fields.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;

    #[derive(Default)]
    struct Pair {
        left: String,
        right: String,
    }

    fn pair_schema(case_sensitive: bool) -> Schema<Pair> {
        let codecs = CodecRegistry::new();
        Schema::<Pair>::builder("Pair", &codecs)
            .case_sensitive(case_sensitive)
            .field("left", "Left", |p| &p.left, |p| &mut p.left)
            .field("right", "Right", |p| &p.right, |p| &mut p.right)
            .build()
            .expect("schema")
    }

    #[test]
    fn static_resolution_uses_declaration_order() {
        let schema = pair_schema(true);
        assert_eq!(
            HeaderResolver::Static.resolve(&schema),
            vec![
                Designator { field: 0, column: 0 },
                Designator { field: 1, column: 1 },
            ]
        );
    }

    #[test]
    fn dynamic_resolution_skips_blank_and_unknown_cells() {
        let schema = pair_schema(true);
        let resolver = HeaderResolver::from_labels(["", "Right", "Other", "Left"]);
        let report = resolver.report(&schema);
        assert_eq!(
            report.designators,
            vec![
                Designator { field: 1, column: 1 },
                Designator { field: 0, column: 3 },
            ]
        );
        assert_eq!(report.unmatched_columns, vec![(2, "Other".to_string())]);
        assert!(report.unbound_fields.is_empty());
    }

    #[test]
    fn later_duplicate_header_wins() {
        let schema = pair_schema(false);
        let report = HeaderResolver::from_labels(["left", "LEFT"]).report(&schema);
        assert_eq!(report.designators, vec![Designator { field: 0, column: 1 }]);
        assert_eq!(report.shadowed_columns, vec![(0, "left".to_string())]);
        assert_eq!(report.unbound_fields, vec![1]);
    }

    #[test]
    fn case_sensitive_schemas_ignore_case_variants() {
        let schema = pair_schema(true);
        assert!(HeaderResolver::from_labels(["LEFT", "right"])
            .resolve(&schema)
            .is_empty());
    }
}
