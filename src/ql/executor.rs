//! Query executor
//!
//! Runs the commands of a [`Query`] in the order they were written over the
//! records of a store. The whole plan is checked against the schema before
//! any record is read, and any error aborts the query without a result.

use std::sync::Arc;

use log::debug;

use crate::core::errors::{Result, StoreError};
use crate::core::record::Record;
use crate::core::schema::Schema;
use crate::core::store::Store;
use crate::ql::aggregate;
use crate::ql::ast::{Aggregate, CommandKind, Query, SelectField, Stage};
use crate::ql::evaluator::Filter;

/// Rows produced by a query
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column labels, in select order
    pub columns: Vec<String>,
    /// Result rows, each projected onto the selected fields
    pub rows: Vec<Record>,
}

impl Table {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display form of every row
    pub fn lines(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.to_string()).collect()
    }
}

/// Execute a parsed query against the store
pub fn execute_query<S: Store + ?Sized>(store: &mut S, query: &Query) -> Result<Table> {
    let executor = QueryExecutor::new(Arc::clone(store.schema()), query)?;
    executor.run(store.records()?)
}

/// Executes one checked query
pub struct QueryExecutor<'q> {
    schema: Arc<Schema>,
    query: &'q Query,
    select: &'q [SelectField],
}

impl<'q> QueryExecutor<'q> {
    /// Check `query` against `schema` and prepare to run it
    pub fn new(schema: Arc<Schema>, query: &'q Query) -> Result<Self> {
        let select = query
            .select()
            .ok_or_else(|| StoreError::MissingSelect("select statement is missing".to_string()))?;

        let executor = QueryExecutor { schema, query, select };
        executor.check()?;
        Ok(executor)
    }

    fn check(&self) -> Result<()> {
        let select_position = self.query.select_position().unwrap_or_default();
        for command in &self.query.commands[..select_position] {
            if matches!(command.kind(), CommandKind::Order | CommandKind::Group) {
                return Err(StoreError::MissingSelect(format!("{} must follow -s", command.kind())));
            }
        }

        for selected in self.select {
            self.schema.position(&selected.field)?;
        }

        for command in &self.query.commands {
            match &command.stage {
                Stage::Select(_) => {},
                Stage::Order(fields) => {
                    for field in fields {
                        self.check_selected(field)?;
                    }
                },
                Stage::Filter(filter) => {
                    for field in filter.fields() {
                        self.check_selected(field)?;
                    }
                },
                Stage::Group(field) => self.check_group(field)?,
            }
        }

        Ok(())
    }

    fn check_selected(&self, field: &str) -> Result<()> {
        self.schema.position(field)?;
        if self.select.iter().any(|s| s.field == field) {
            Ok(())
        } else {
            Err(StoreError::FieldNotSelected(field.to_string()))
        }
    }

    /// The group field must be selected without an aggregate, and every
    /// other selected field must carry one
    fn check_group(&self, group_field: &str) -> Result<()> {
        self.schema.position(group_field)?;

        let mut has_group_field = false;
        for selected in self.select {
            match (selected.field == group_field, selected.aggregate) {
                (true, None) => has_group_field = true,
                (true, Some(aggregate)) => {
                    return Err(StoreError::InvalidGroupSpec(format!(
                        "group field {} cannot carry the {} aggregate",
                        group_field,
                        aggregate.key()
                    )))
                },
                (false, None) => {
                    return Err(StoreError::InvalidGroupSpec(format!(
                        "{} is not part of an aggregate function",
                        selected.field
                    )))
                },
                (false, Some(aggregate)) => {
                    let field = self.schema.field(&selected.field)?;
                    if aggregate == Aggregate::Sum && !field.kind.is_numeric() {
                        return Err(StoreError::InvalidGroupSpec(format!(
                            "cannot sum {:?} field {}",
                            field.kind, field.name
                        )));
                    }
                },
            }
        }

        if has_group_field {
            Ok(())
        } else {
            Err(StoreError::InvalidGroupSpec(format!(
                "{} is not one of the select specifiers",
                group_field
            )))
        }
    }

    /// Run the pipeline over `records`
    pub fn run<I>(&self, records: I) -> Result<Table>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let mut records = Some(records);
        let mut rows: Option<Vec<Record>> = None;
        let mut pending_filters: Vec<&Filter> = Vec::new();

        for command in &self.query.commands {
            debug!("Running {} {}", command.kind(), command.args);
            match (&command.stage, rows.as_mut()) {
                (Stage::Select(_), None) => {
                    let source = records.take().into_iter().flatten();
                    rows = Some(self.select(source, &pending_filters)?);
                },
                (Stage::Filter(filter), None) => pending_filters.push(filter),
                (Stage::Filter(filter), Some(rows)) => Self::filter(rows, filter)?,
                (Stage::Order(fields), Some(rows)) => self.order(rows, fields)?,
                (Stage::Group(field), Some(rows)) => {
                    let grouped = self.group(std::mem::take(rows), field)?;
                    *rows = grouped;
                },
                (Stage::Select(_), Some(_)) => {
                    return Err(StoreError::MalformedQuery("command -s given more than once".to_string()))
                },
                (_, None) => {
                    return Err(StoreError::MissingSelect(format!("{} must follow -s", command.kind())))
                },
            }
        }

        let rows = rows.ok_or_else(|| StoreError::MissingSelect("select statement is missing".to_string()))?;
        Ok(Table {
            columns: self.select.iter().map(|s| s.label()).collect(),
            rows,
        })
    }

    /// Read and project every record, applying filters given before `-s`
    fn select<I>(&self, records: I, filters: &[&Filter]) -> Result<Vec<Record>>
    where
        I: Iterator<Item = Result<Record>>,
    {
        let fields: Vec<&str> = self.select.iter().map(|s| s.field.as_str()).collect();

        let mut rows = Vec::new();
        for record in records {
            let mut record = record?;
            record.project(&fields)?;

            let mut keep = true;
            for filter in filters {
                if !filter.evaluate(&record)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                rows.push(record);
            }
        }

        debug!("Selected {} rows", rows.len());
        Ok(rows)
    }

    /// Drop the rows the filter rejects, keeping the order of the rest
    fn filter(rows: &mut Vec<Record>, filter: &Filter) -> Result<()> {
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows.drain(..) {
            if filter.evaluate(&row)? {
                kept.push(row);
            }
        }
        *rows = kept;
        Ok(())
    }

    /// Stable sort on `fields`, leftmost field dominating
    fn order<S: AsRef<str>>(&self, rows: &mut [Record], fields: &[S]) -> Result<()> {
        let positions = fields
            .iter()
            .map(|f| self.schema.position(f.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        rows.sort_by(|a, b| {
            positions
                .iter()
                .map(|&i| a.values()[i].cmp(&b.values()[i]))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(())
    }

    /// Order by the group field, then fold each run of equal values into one row
    fn group(&self, mut rows: Vec<Record>, group_field: &str) -> Result<Vec<Record>> {
        self.order(&mut rows, &[group_field])?;
        let group_index = self.schema.position(group_field)?;

        let mut aggregates = Vec::new();
        for selected in self.select {
            if let Some(aggregate) = selected.aggregate {
                let index = self.schema.position(&selected.field)?;
                aggregates.push((index, &self.schema.fields()[index], aggregate));
            }
        }

        let mut grouped = Vec::new();
        let mut start = 0;
        while start < rows.len() {
            let value = &rows[start].values()[group_index];
            let len = rows[start..]
                .iter()
                .take_while(|r| &r.values()[group_index] == value)
                .count();
            let run = &rows[start..start + len];

            let mut row = run[0].clone();
            for &(index, field, aggregate) in &aggregates {
                let values: Vec<&str> = run.iter().map(|r| r.values()[index].as_str()).collect();
                row.set_field(&field.name, aggregate::fold(aggregate, field, &values)?)?;
            }
            grouped.push(row);
            start += len;
        }

        debug!("Grouped {} rows into {} by {}", rows.len(), grouped.len(), group_field);
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ql::parser::parse_query;
    use crate::storage::MemoryStore;

    fn store(lines: &[&str]) -> MemoryStore {
        let schema = Arc::new(Schema::media_views());
        let mut store = MemoryStore::new(Arc::clone(&schema));
        for line in lines {
            store.upsert(&Record::parse(&schema, line).unwrap()).unwrap();
        }
        store
    }

    fn sample() -> MemoryStore {
        store(&[
            "stb1|the matrix|warner bros|2014-04-01|4.00|1:30",
            "stb1|unbreakable|buena vista|2014-04-03|6.00|2:05",
            "stb2|the hobbit|warner bros|2014-04-02|8.00|2:45",
            "stb3|the matrix|warner bros|2014-04-02|4.00|1:05",
        ])
    }

    fn run(store: &mut MemoryStore, query: &str) -> Result<Table> {
        execute_query(store, &parse_query(query)?)
    }

    #[test]
    fn test_select_projects_fields() {
        let table = run(&mut sample(), "-s title,date").unwrap();

        assert_eq!(table.columns, vec!["title", "date"]);
        assert_eq!(table.len(), 4);
        assert_eq!(table.rows[0].to_string(), "the matrix,2014-04-01");
        assert_eq!(table.rows[0].get_field("stb").unwrap(), "");
    }

    #[test]
    fn test_filter_selects_matching_rows() {
        let mut store = store(&[
            "A|T1|P|2020-01-01|1.00|1:00",
            "A|T2|P|2020-01-01|1.00|1:00",
            "B|T1|P|2020-01-02|1.00|1:00",
        ]);
        let table = run(&mut store, "-s title,date -f title=\"T1\"").unwrap();

        assert_eq!(table.lines(), vec!["T1,2020-01-01", "T1,2020-01-02"]);
    }

    #[test]
    fn test_filter_before_select_runs_inline() {
        let table = run(&mut sample(), "-f provider=\"warner bros\" -s title,provider").unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let query = "-s stb,title -f stb=\"stb1\" OR title=\"the matrix\"";
        let once = run(&mut sample(), query).unwrap();

        let filter = Filter::parse("stb=\"stb1\" OR title=\"the matrix\"").unwrap();
        let mut rows = once.rows.clone();
        QueryExecutor::filter(&mut rows, &filter).unwrap();

        assert_eq!(rows, once.rows);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_order_by_multiple_fields() {
        let table = run(&mut sample(), "-s title,date,stb -o title,date").unwrap();

        assert_eq!(
            table.lines(),
            vec![
                "the hobbit,2014-04-02,stb2",
                "the matrix,2014-04-01,stb1",
                "the matrix,2014-04-02,stb3",
                "unbreakable,2014-04-03,stb1",
            ]
        );

        let table = run(&mut sample(), "-s date,stb -o date").unwrap();
        // Stable: stb2 was stored before stb3
        assert_eq!(table.lines()[1..3], ["2014-04-02,stb2", "2014-04-02,stb3"]);
    }

    #[test]
    fn test_group_sum() {
        let mut store = store(&["A|T1|P|2020-01-01|1.00|1:00", "B|T1|P|2020-01-01|2.00|1:00"]);
        let table = run(&mut store, "-s title,rev:sum -g title").unwrap();

        assert_eq!(table.columns, vec!["title", "rev:sum"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get_field("title").unwrap(), "T1");
        assert_eq!(table.rows[0].get_field("rev").unwrap(), "3.00");
    }

    #[test]
    fn test_group_aggregates() {
        let table = run(&mut sample(), "-s title,stb:collect,rev:max,viewtime:sum,date:count -g title").unwrap();

        assert_eq!(
            table.lines(),
            vec![
                "the hobbit,[stb2],8.00,2:45,1",
                "the matrix,[stb1,stb3],4.00,2:35,2",
                "unbreakable,[stb1],6.00,2:05,1",
            ]
        );
    }

    #[test]
    fn test_group_output_bounded_by_distinct_values() {
        let table = run(&mut sample(), "-s provider,stb:count -f stb=\"stb1\" OR stb=\"stb2\" -g provider").unwrap();

        assert_eq!(table.lines(), vec!["buena vista,1", "warner bros,2"]);
    }

    #[test]
    fn test_order_after_group() {
        let table = run(&mut sample(), "-s stb,rev:sum -g stb -o rev").unwrap();
        // Ordering compares strings, not numbers
        assert_eq!(table.lines(), vec!["stb1,10.00", "stb3,4.00", "stb2,8.00"]);
    }

    #[test]
    fn test_invalid_group_specs() {
        for query in [
            "-s title,rev -g title",
            "-s rev:sum -g title",
            "-s title:count -g title",
            "-s stb,title:sum -g stb",
        ] {
            assert!(
                matches!(run(&mut sample(), query), Err(StoreError::InvalidGroupSpec(_))),
                "expected {:?} to be rejected",
                query
            );
        }
    }

    #[test]
    fn test_missing_select() {
        assert!(matches!(run(&mut sample(), "-o title"), Err(StoreError::MissingSelect(_))));
        assert!(matches!(run(&mut sample(), "-o title -s title"), Err(StoreError::MissingSelect(_))));
    }

    #[test]
    fn test_fields_must_be_known_and_selected() {
        assert!(matches!(run(&mut sample(), "-s price"), Err(StoreError::UnknownField(_))));
        assert!(matches!(run(&mut sample(), "-s title -o date"), Err(StoreError::FieldNotSelected(_))));
        assert!(matches!(
            run(&mut sample(), "-s title -f stb=\"stb1\""),
            Err(StoreError::FieldNotSelected(_))
        ));
        assert!(matches!(run(&mut sample(), "-s title -o price"), Err(StoreError::UnknownField(_))));
    }

    #[test]
    fn test_group_failure_returns_no_rows() {
        let mut store = store(&["A|T1|P|2020-01-01|1.00|1:00"]);
        let schema = Arc::clone(store.schema());
        let mut broken = Record::new(&schema);
        broken.set_field("stb", "B").unwrap();
        broken.set_field("title", "T1").unwrap();
        broken.set_field("rev", "free").unwrap();
        store.upsert(&broken).unwrap();

        assert!(matches!(
            run(&mut store, "-s title,rev:sum -g title"),
            Err(StoreError::InvalidFieldValue { .. })
        ));
    }
}
