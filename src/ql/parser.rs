//! Parser for query command strings
//!
//! This module turns strings such as `-s title,rev:sum -g title` into a
//! [`Query`]. Syntax problems are reported here; checks that need the
//! schema happen when the query is executed.

use std::collections::HashSet;
use std::str::FromStr;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::core::errors::{Result, StoreError};
use crate::ql::ast::{Aggregate, Command, CommandKind, Query, SelectField, Stage};
use crate::ql::evaluator::Filter;

#[derive(Parser)]
#[grammar = "ql/grammar.pest"]
pub struct CommandParser;

pub fn parse_query(input: &str) -> Result<Query> {
    if input.trim().is_empty() {
        return Err(StoreError::EmptyQuery);
    }

    let query_pair = CommandParser::parse(Rule::query, input)
        .map_err(|e| StoreError::MalformedQuery(format!("Parse error: {}", e)))?
        .next()
        .ok_or(StoreError::EmptyQuery)?;

    let mut commands = Vec::new();
    let mut seen = HashSet::new();
    for pair in query_pair.into_inner() {
        if pair.as_rule() != Rule::command {
            continue;
        }

        let command = parse_command(pair)?;
        if !seen.insert(command.kind()) {
            return Err(StoreError::MalformedQuery(format!(
                "command {} given more than once",
                command.kind()
            )));
        }
        commands.push(command);
    }

    let select = commands.iter().find_map(|c| match &c.stage {
        Stage::Select(fields) => Some(fields.clone()),
        _ => None,
    });

    Ok(Query { commands, select })
}

fn parse_command(pair: Pair<Rule>) -> Result<Command> {
    let mut inner = pair.into_inner();
    let key = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let args = inner.next().map(|p| p.as_str().trim()).unwrap_or_default().to_string();

    let kind = CommandKind::from_key(key)
        .ok_or_else(|| StoreError::UnknownCommand(format!("-{}", key)))?;

    let stage = match kind {
        CommandKind::Select => Stage::Select(parse_select_args(&args)?),
        CommandKind::Order => Stage::Order(parse_field_list(kind, &args)?),
        CommandKind::Group => Stage::Group(parse_group_args(&args)?),
        CommandKind::Filter => Stage::Filter(Filter::parse(&args)?),
    };

    Ok(Command { args, stage })
}

/// Parse `field[:aggregate],...` into a select list
fn parse_select_args(args: &str) -> Result<Vec<SelectField>> {
    let mut select = Vec::new();
    for token in parse_field_list(CommandKind::Select, args)? {
        let (field, aggregate) = match token.split_once(':') {
            Some((field, key)) => {
                let aggregate = Aggregate::from_key(key.trim())
                    .ok_or_else(|| StoreError::UnknownCommand(format!("aggregate '{}'", key.trim())))?;
                (field.trim().to_string(), Some(aggregate))
            },
            None => (token.clone(), None),
        };

        if select.iter().any(|s: &SelectField| s.field == field) {
            return Err(StoreError::MalformedQuery(format!("field {} selected more than once", field)));
        }
        select.push(SelectField { field, aggregate });
    }

    Ok(select)
}

/// Split a comma-separated field list, rejecting empty entries
fn parse_field_list(kind: CommandKind, args: &str) -> Result<Vec<String>> {
    if args.is_empty() {
        return Err(StoreError::MalformedQuery(format!("{} requires at least one field", kind)));
    }

    args.split(',')
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                Err(StoreError::MalformedQuery(format!("empty field in {} {}", kind, args)))
            } else {
                Ok(token.to_string())
            }
        })
        .collect()
}

fn parse_group_args(args: &str) -> Result<String> {
    if args.is_empty() {
        return Err(StoreError::InvalidGroupSpec("-g requires a field".to_string()));
    }
    if args.contains(',') || args.contains(char::is_whitespace) {
        return Err(StoreError::InvalidGroupSpec(format!("-g takes a single field, got '{}'", args)));
    }
    Ok(args.to_string())
}

impl FromStr for Query {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        parse_query(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_command_order() {
        let query = parse_query("-s title,date:collect -o title -f date=\"2014-04-21\"").unwrap();

        let kinds: Vec<CommandKind> = query.commands.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![CommandKind::Select, CommandKind::Order, CommandKind::Filter]);
        assert_eq!(query.commands[2].args, "date=\"2014-04-21\"");

        let select = query.select().unwrap();
        assert_eq!(select.len(), 2);
        assert_eq!(select[0], SelectField { field: "title".to_string(), aggregate: None });
        assert_eq!(select[1].aggregate, Some(Aggregate::Collect));
        assert_eq!(select[1].label(), "date:collect");

        let query = parse_query("-f title=\"T1\" -s title").unwrap();
        assert_eq!(query.commands[0].kind(), CommandKind::Filter);
        assert_eq!(query.select_position(), Some(1));
    }

    #[test]
    fn test_parse_order_and_group() {
        let query = parse_query("  -s stb,rev:sum   -g stb -o  rev, stb ").unwrap();

        assert_eq!(query.commands[1].stage, Stage::Group("stb".to_string()));
        assert_eq!(query.commands[2].stage, Stage::Order(vec!["rev".to_string(), "stb".to_string()]));
        assert_eq!(query.selected_fields(), vec!["stb", "rev"]);
    }

    #[test]
    fn test_dashes_inside_quotes_do_not_start_commands() {
        let query = parse_query("-s date -f date=\"2014-04-21\" OR title=\"a -o b\"").unwrap();

        assert_eq!(query.commands.len(), 2);
        assert_eq!(query.commands[1].args, "date=\"2014-04-21\" OR title=\"a -o b\"");
    }

    #[test]
    fn test_empty_query() {
        assert!(matches!(parse_query(""), Err(StoreError::EmptyQuery)));
        assert!(matches!(parse_query("   "), Err(StoreError::EmptyQuery)));
    }

    #[test]
    fn test_unknown_commands() {
        assert!(matches!(parse_query("-z foo"), Err(StoreError::UnknownCommand(_))));
        assert!(matches!(parse_query("-s title -sum rev"), Err(StoreError::UnknownCommand(_))));
        assert!(matches!(parse_query("-s rev:avg"), Err(StoreError::UnknownCommand(_))));
    }

    #[test]
    fn test_malformed_queries() {
        assert!(matches!(parse_query("s title"), Err(StoreError::MalformedQuery(_))));
        assert!(matches!(parse_query("-s title -s date"), Err(StoreError::MalformedQuery(_))));
        assert!(matches!(parse_query("-s title,,date"), Err(StoreError::MalformedQuery(_))));
        assert!(matches!(parse_query("-s title,title:count"), Err(StoreError::MalformedQuery(_))));
        assert!(matches!(parse_query("-s"), Err(StoreError::MalformedQuery(_))));
        assert!(matches!(parse_query("-s title -g a,b"), Err(StoreError::InvalidGroupSpec(_))));
        assert!(matches!(parse_query("-s title -f title=T1"), Err(StoreError::MalformedFilter(_))));
    }

    #[test]
    fn test_query_without_select_still_parses() {
        let query: Query = "-o title".parse().unwrap();
        assert!(query.select().is_none());
        assert!(query.selected_fields().is_empty());
    }
}
