//! Parsed form of a query command string
//!
//! A [`Query`] is the ordered list of commands the user wrote, each carrying
//! its raw argument string and its parsed [`Stage`], plus a cached copy of
//! the select list.

use std::fmt;

use crate::ql::evaluator::Filter;

/// Kinds of pipeline commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `-s`: select and project fields
    Select,
    /// `-o`: order by one or more fields
    Order,
    /// `-g`: group by a field
    Group,
    /// `-f`: filter rows with a boolean expression
    Filter,
}

impl CommandKind {
    /// Map a command key (without its dash) to a command kind
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "s" => Some(CommandKind::Select),
            "o" => Some(CommandKind::Order),
            "g" => Some(CommandKind::Group),
            "f" => Some(CommandKind::Filter),
            _ => None,
        }
    }

    /// The command key, without its dash
    pub fn key(&self) -> &'static str {
        match self {
            CommandKind::Select => "s",
            CommandKind::Order => "o",
            CommandKind::Group => "g",
            CommandKind::Filter => "f",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.key())
    }
}

/// Aggregate functions applied to fields when grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregate {
    Min,
    Max,
    Sum,
    Count,
    Collect,
}

impl Aggregate {
    /// Map an aggregate suffix (`field:<key>`) to an aggregate
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            "sum" => Some(Aggregate::Sum),
            "count" => Some(Aggregate::Count),
            "collect" => Some(Aggregate::Collect),
            _ => None,
        }
    }

    /// The aggregate suffix key
    pub fn key(&self) -> &'static str {
        match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Sum => "sum",
            Aggregate::Count => "count",
            Aggregate::Collect => "collect",
        }
    }
}

/// One entry of the select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    /// The selected field
    pub field: String,
    /// Aggregate applied when grouping, if any
    pub aggregate: Option<Aggregate>,
}

impl SelectField {
    /// Column label: `field` or `field:aggregate`
    pub fn label(&self) -> String {
        match self.aggregate {
            Some(aggregate) => format!("{}:{}", self.field, aggregate.key()),
            None => self.field.clone(),
        }
    }
}

/// Parsed arguments of a command
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Select(Vec<SelectField>),
    Order(Vec<String>),
    Group(String),
    Filter(Filter),
}

/// A command as written in the query string
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// The argument string, trimmed
    pub args: String,
    /// The parsed arguments
    pub stage: Stage,
}

impl Command {
    /// The kind of this command
    pub fn kind(&self) -> CommandKind {
        match self.stage {
            Stage::Select(_) => CommandKind::Select,
            Stage::Order(_) => CommandKind::Order,
            Stage::Group(_) => CommandKind::Group,
            Stage::Filter(_) => CommandKind::Filter,
        }
    }
}

/// A complete query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Commands in the order they were written, which is also execution order
    pub commands: Vec<Command>,
    /// The select list, if a select command was given
    pub select: Option<Vec<SelectField>>,
}

impl Query {
    /// The select list, if any
    pub fn select(&self) -> Option<&[SelectField]> {
        self.select.as_deref()
    }

    /// Names of the selected fields, in select order
    pub fn selected_fields(&self) -> Vec<&str> {
        self.select()
            .map(|fields| fields.iter().map(|s| s.field.as_str()).collect())
            .unwrap_or_default()
    }

    /// Position of the select command in the pipeline
    pub fn select_position(&self) -> Option<usize> {
        self.commands.iter().position(|c| c.kind() == CommandKind::Select)
    }
}
