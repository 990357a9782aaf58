//! Row mapper: applies resolved designators to data rows.
//!
//! A [`Mapper`] is immutable once built and can be shared between threads.
//! Each cell is coerced on its own: a fault is reported to the caller's
//! handler and the rest of the row is still processed.

use std::{borrow::Cow, sync::Arc};

use log::trace;

use crate::{
    error::CellFault,
    resolver::{Designator, HeaderResolver},
    schema::Schema,
    sheet::{Cell, CellValue, Row},
};

pub struct Mapper<R> {
    schema: Arc<Schema<R>>,
    designators: Vec<Designator>,
}

impl<R> Clone for Mapper<R> {
    fn clone(&self) -> Self {
        Mapper {
            schema: Arc::clone(&self.schema),
            designators: self.designators.clone(),
        }
    }
}

impl<R> std::fmt::Debug for Mapper<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("record_type", &self.schema.record_type())
            .field("designators", &self.designators)
            .finish()
    }
}

impl<R> Mapper<R> {
    pub fn new(schema: Arc<Schema<R>>, resolver: &HeaderResolver) -> Self {
        let designators = resolver.resolve(&schema);
        Mapper {
            schema,
            designators,
        }
    }

    /// Mapper for the schema's static column layout.
    pub fn fixed(schema: Arc<Schema<R>>) -> Self {
        Self::new(schema, &HeaderResolver::Static)
    }

    pub fn for_header<I, S>(schema: Arc<Schema<R>>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(schema, &HeaderResolver::from_labels(labels))
    }

    pub fn for_header_row<W: Row + ?Sized>(schema: Arc<Schema<R>>, header: &W) -> Self {
        Self::new(schema, &HeaderResolver::from_row(header))
    }

    pub fn schema(&self) -> &Arc<Schema<R>> {
        &self.schema
    }

    pub fn designators(&self) -> &[Designator] {
        &self.designators
    }

    /// Highest designated column plus one; the width a written row needs.
    pub fn columns(&self) -> usize {
        self.designators
            .iter()
            .map(|designator| designator.column + 1)
            .max()
            .unwrap_or(0)
    }

    /// Reads a new record from `row`, dropping cell faults.
    pub fn read<W: Row + ?Sized>(&self, row: &W) -> R {
        self.read_with(row, |_, _, _| {})
    }

    /// Reads a new record from `row`. Missing cells read as empty text. Each
    /// fault is passed to `on_fault` with the field's label and the offending
    /// cell; the field keeps the value the record factory gave it.
    pub fn read_with<W, F>(&self, row: &W, mut on_fault: F) -> R
    where
        W: Row + ?Sized,
        F: FnMut(&str, Option<&W::Cell>, &CellFault),
    {
        let mut record = self.schema.new_record();
        for designator in &self.designators {
            let Some(field) = self.schema.field(designator.field) else {
                continue;
            };
            let cell = row.cell(designator.column);
            let text = cell.map_or(Cow::Borrowed(""), Cell::text);
            if let Err(fault) = field.binding().read(&mut record, &text) {
                trace!(
                    "Cell fault in '{}' column {}: {fault}",
                    field.label(),
                    designator.column
                );
                on_fault(field.label(), cell, &fault);
            }
        }
        record
    }

    /// Writes `record` into `row`, dropping cell faults.
    pub fn write<W: Row + ?Sized>(&self, row: &mut W, record: &R) {
        self.write_with(row, record, |_, _, _| {})
    }

    /// Writes every designated field of `record` into `row`, creating cells as
    /// needed. Absent values leave their cell untouched.
    pub fn write_with<W, F>(&self, row: &mut W, record: &R, mut on_fault: F)
    where
        W: Row + ?Sized,
        F: FnMut(&str, Option<&W::Cell>, &CellFault),
    {
        for designator in &self.designators {
            let Some(field) = self.schema.field(designator.field) else {
                continue;
            };
            match field.binding().write(record) {
                Ok(Some(value)) => row.create_cell(designator.column).set_value(value),
                Ok(None) => {}
                Err(fault) => {
                    trace!(
                        "Cell fault in '{}' column {}: {fault}",
                        field.label(),
                        designator.column
                    );
                    on_fault(field.label(), row.cell(designator.column), &fault);
                }
            }
        }
    }

    /// Writes each designated field's label into its column.
    pub fn write_header<W: Row + ?Sized>(&self, row: &mut W) {
        for designator in &self.designators {
            if let Some(field) = self.schema.field(designator.field) {
                row.create_cell(designator.column)
                    .set_value(CellValue::from(field.label()));
            }
        }
    }
}
