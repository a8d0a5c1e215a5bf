//! Schema-evolving transposition of long-format rows into wide records.
//!
//! A [`Transposer`] folds `(field, value)` rows from one or more inputs into
//! records. Field names are appended to a [`FieldSchema`] in order of first
//! appearance; whenever a new field shows up, every record closed so far gets
//! an empty value for it so the resulting table stays rectangular.
//!
//! Record boundaries are implicit. Under the default [`BoundaryRule::Sentinel`]
//! the first field ever seen acts as the anchor: seeing it again while the
//! record in progress already holds a non-empty value for it closes that record.
//! The non-empty check matters; a bare name match would split records that
//! merely mention the anchor field twice.

use std::collections::HashMap;

use itertools::Itertools;

/// How the transposer decides that an incoming row starts a new record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BoundaryRule {
    /// The first discovered field reappears while already filled.
    #[default]
    Sentinel,
    /// The named field appears while the current record holds any value.
    IdField(String),
    /// Any field reappears while already filled in the current record.
    RepeatedField,
}

/// Ordered, append-only set of discovered field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FieldSchema {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn sentinel(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }

    /// Returns the field's position and whether it was newly added.
    fn intern(&mut self, field: &str) -> (usize, bool) {
        if let Some(idx) = self.position(field) {
            return (idx, false);
        }
        let idx = self.fields.len();
        self.fields.push(field.to_string());
        self.positions.insert(field.to_string(), idx);
        (idx, true)
    }
}

/// One wide row. Values are stored by schema position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    fn blank(width: usize) -> Self {
        Self {
            values: vec![String::new(); width],
        }
    }

    /// Value at a schema position, `""` when the record never saw it.
    pub fn get(&self, position: usize) -> &str {
        self.values.get(position).map(String::as_str).unwrap_or("")
    }

    pub fn value_of<'a>(&'a self, schema: &FieldSchema, field: &str) -> Option<&'a str> {
        schema.position(field).map(|idx| self.get(idx))
    }

    pub fn has_values(&self) -> bool {
        self.values.iter().any(|value| !value.is_empty())
    }

    fn set(&mut self, position: usize, value: String) {
        if self.values.len() <= position {
            self.values.resize(position + 1, String::new());
        }
        self.values[position] = value;
    }

    fn widen(&mut self) {
        self.values.push(String::new());
    }
}

/// Row occurrences per field, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCounts {
    entries: Vec<(String, usize)>,
}

impl FieldCounts {
    pub fn get(&self, field: &str) -> usize {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    /// Descending by count; equal counts keep first-seen order.
    pub fn most_common(&self) -> Vec<(&str, usize)> {
        self.entries
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Default)]
pub struct TransposeOutput {
    schema: FieldSchema,
    records: Vec<Record>,
    counts: FieldCounts,
}

impl TransposeOutput {
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn headers(&self) -> &[String] {
        self.schema.fields()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn counts(&self) -> &FieldCounts {
        &self.counts
    }

    /// Wide rows in record order, each exactly `headers().len()` long.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        let width = self.schema.len();
        self.records
            .iter()
            .map(move |record| (0..width).map(|idx| record.get(idx)).collect())
    }
}

/// Single-run accumulator. Each run owns its own instance; nothing is shared.
#[derive(Debug, Clone, Default)]
pub struct Transposer {
    boundary: BoundaryRule,
    schema: FieldSchema,
    records: Vec<Record>,
    counts: Vec<usize>,
    current: Record,
}

impl Transposer {
    pub fn new(boundary: BoundaryRule) -> Self {
        Self {
            boundary,
            ..Self::default()
        }
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Starts a new input. The record in progress is reset to the known
    /// schema with every value empty; records never span inputs.
    pub fn begin_input(&mut self) {
        self.flush_current();
    }

    /// Folds one `(field, value)` row into the run. Both parts are trimmed.
    pub fn push_row(&mut self, field: &str, value: &str) {
        let field = field.trim();
        let value = value.trim();

        if self.opens_record(field) {
            let closed = std::mem::replace(&mut self.current, Record::blank(self.schema.len()));
            self.records.push(closed);
        }

        let (position, added) = self.schema.intern(field);
        if added {
            self.counts.push(0);
            for record in &mut self.records {
                record.widen();
            }
            self.current.widen();
        }
        self.counts[position] += 1;
        self.current.set(position, value.to_string());
    }

    /// Ends the current input, keeping the record in progress if it holds
    /// at least one non-empty value.
    pub fn end_input(&mut self) {
        self.flush_current();
    }

    pub fn finish(mut self) -> TransposeOutput {
        self.flush_current();
        let entries = self
            .schema
            .fields()
            .iter()
            .cloned()
            .zip(self.counts)
            .collect();
        TransposeOutput {
            schema: self.schema,
            records: self.records,
            counts: FieldCounts { entries },
        }
    }

    fn opens_record(&self, field: &str) -> bool {
        match &self.boundary {
            BoundaryRule::Sentinel => {
                self.schema.sentinel() == Some(field) && !self.current.get(0).is_empty()
            }
            BoundaryRule::IdField(id) => field == id.as_str() && self.current.has_values(),
            BoundaryRule::RepeatedField => self
                .schema
                .position(field)
                .is_some_and(|idx| !self.current.get(idx).is_empty()),
        }
    }

    fn flush_current(&mut self) {
        let finished = std::mem::replace(&mut self.current, Record::blank(self.schema.len()));
        if finished.has_values() {
            self.records.push(finished);
        }
    }
}

/// Convenience for a single in-memory input.
pub fn transpose_rows<'a, I>(rows: I, boundary: BoundaryRule) -> TransposeOutput
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut transposer = Transposer::new(boundary);
    transposer.begin_input();
    for (field, value) in rows {
        transposer.push_row(field, value);
    }
    transposer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_of(output: &TransposeOutput) -> Vec<Vec<String>> {
        output
            .rows()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn sentinel_splits_name_value_pairs() {
        let output = transpose_rows(
            [
                ("Name", "Account"),
                ("Value", "user1@mail.com"),
                ("Name", "cn"),
                ("Value", "User One"),
            ],
            BoundaryRule::Sentinel,
        );
        assert_eq!(output.headers(), ["Name", "Value"]);
        assert_eq!(
            rows_of(&output),
            vec![
                vec!["Account", "user1@mail.com"],
                vec!["cn", "User One"],
            ]
        );
    }

    #[test]
    fn immediately_repeated_sentinel_opens_new_record() {
        let output = transpose_rows(
            [("Account", "user1@mail.com"), ("Account", "user2@mail.com")],
            BoundaryRule::Sentinel,
        );
        assert_eq!(
            rows_of(&output),
            vec![vec!["user1@mail.com"], vec!["user2@mail.com"]]
        );
        assert_eq!(output.counts().most_common(), vec![("Account", 2)]);
    }

    #[test]
    fn empty_sentinel_value_does_not_open_record() {
        let output = transpose_rows(
            [("id", ""), ("name", "a"), ("id", "1"), ("extra", "x")],
            BoundaryRule::Sentinel,
        );
        assert_eq!(output.records().len(), 1);
        assert_eq!(rows_of(&output), vec![vec!["1", "a", "x"]]);
    }

    #[test]
    fn new_field_backfills_every_closed_record() {
        let output = transpose_rows(
            [
                ("id", "1"),
                ("id", "2"),
                ("id", "3"),
                ("email", "c@example.com"),
            ],
            BoundaryRule::Sentinel,
        );
        assert_eq!(output.headers(), ["id", "email"]);
        assert_eq!(
            rows_of(&output),
            vec![
                vec!["1", ""],
                vec!["2", ""],
                vec!["3", "c@example.com"],
            ]
        );
    }

    #[test]
    fn duplicate_field_within_record_keeps_last_value() {
        let output = transpose_rows(
            [("id", "1"), ("name", "first"), ("name", "second")],
            BoundaryRule::Sentinel,
        );
        assert_eq!(rows_of(&output), vec![vec!["1", "second"]]);
        assert_eq!(output.counts().get("name"), 2);
    }

    #[test]
    fn values_and_fields_are_trimmed() {
        let output = transpose_rows([("  id ", "  7  ")], BoundaryRule::Sentinel);
        assert_eq!(output.headers(), ["id"]);
        assert_eq!(rows_of(&output), vec![vec!["7"]]);
    }

    #[test]
    fn all_empty_record_is_not_emitted() {
        let output = transpose_rows([("id", ""), ("name", "")], BoundaryRule::Sentinel);
        assert_eq!(output.headers(), ["id", "name"]);
        assert!(output.records().is_empty());
    }

    #[test]
    fn schema_carries_across_inputs() {
        let mut transposer = Transposer::new(BoundaryRule::Sentinel);
        transposer.begin_input();
        for (field, value) in [("A", "1"), ("B", "2"), ("A", "3"), ("B", "4")] {
            transposer.push_row(field, value);
        }
        transposer.end_input();
        transposer.begin_input();
        for (field, value) in [("A", "5"), ("C", "6")] {
            transposer.push_row(field, value);
        }
        transposer.end_input();
        let output = transposer.finish();

        assert_eq!(output.headers(), ["A", "B", "C"]);
        assert_eq!(
            rows_of(&output),
            vec![
                vec!["1", "2", ""],
                vec!["3", "4", ""],
                vec!["5", "", "6"],
            ]
        );
    }

    #[test]
    fn records_do_not_span_inputs() {
        let mut transposer = Transposer::new(BoundaryRule::Sentinel);
        transposer.begin_input();
        transposer.push_row("A", "1");
        transposer.end_input();
        transposer.begin_input();
        transposer.push_row("B", "2");
        transposer.end_input();
        let output = transposer.finish();
        assert_eq!(
            rows_of(&output),
            vec![vec!["1", ""], vec!["", "2"]]
        );
    }

    #[test]
    fn id_field_rule_splits_on_named_field() {
        let output = transpose_rows(
            [
                ("uid", "1"),
                ("kind", "user"),
                ("kind", "admin"),
                ("uid", "2"),
                ("kind", "group"),
            ],
            BoundaryRule::IdField("uid".to_string()),
        );
        assert_eq!(
            rows_of(&output),
            vec![vec!["1", "admin"], vec!["2", "group"]]
        );
    }

    #[test]
    fn id_field_rule_ignores_first_field_repeats() {
        let output = transpose_rows(
            [("kind", "user"), ("kind", "admin"), ("uid", "1")],
            BoundaryRule::IdField("uid".to_string()),
        );
        assert_eq!(rows_of(&output), vec![vec!["admin", ""], vec!["", "1"]]);
    }

    #[test]
    fn repeated_field_rule_splits_on_any_refilled_field() {
        let output = transpose_rows(
            [("a", "1"), ("b", "2"), ("b", "3"), ("a", "4")],
            BoundaryRule::RepeatedField,
        );
        assert_eq!(rows_of(&output), vec![vec!["1", "2"], vec!["4", "3"]]);
    }

    #[test]
    fn most_common_breaks_ties_by_first_appearance() {
        let output = transpose_rows(
            [("b", "1"), ("a", "1"), ("c", "1"), ("c", "2"), ("a", "2")],
            BoundaryRule::Sentinel,
        );
        assert_eq!(
            output.counts().most_common(),
            vec![("a", 2), ("c", 2), ("b", 1)]
        );
        assert_eq!(output.counts().total(), 5);
    }
}
