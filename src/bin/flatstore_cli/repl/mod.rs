mod history;

use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use log::warn;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands;
use crate::context::Context;
use crate::formatters::OutputFormat;
use crate::utils::error::CliError;
use self::history::History;

/// Interactive mode
pub struct Repl {
    /// Execution context
    context: Context,

    /// Line editor
    editor: DefaultEditor,

    /// Persistent command history
    history: History,
}

impl Repl {
    pub fn new(context: Context) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        let config = context.config();
        let mut history = History::new(&config.history_path, config.history_size);
        if let Err(e) = history.load() {
            warn!("Unable to load history from {}: {}", config.history_path.display(), e);
        }

        for cmd in history.get_all() {
            let _ = editor.add_history_entry(cmd.as_str());
        }

        Ok(Repl {
            context,
            editor,
            history,
        })
    }

    /// Run the read-eval-print loop until `.exit` or end of input
    pub fn run(&mut self) -> Result<()> {
        println!("{}", self.context.formatter().format_info("flatstore interactive mode"));
        println!("{}", self.context.formatter().format_info("Type .help for help or .exit to quit"));

        loop {
            match self.editor.readline("flatstore> ") {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    self.history.add(&line);

                    match self.process_line(line.trim()) {
                        Ok(true) => {},
                        Ok(false) => break,
                        Err(e) => println!("{}", self.context.formatter().format_error(&format!("{:#}", e))),
                    }
                },
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted (Ctrl-C)");
                    continue;
                },
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("{}", self.context.formatter().format_error(&format!("Error: {}", err)));
                    break;
                },
            }
        }

        self.history.save()?;
        self.context.close()?;
        Ok(())
    }

    /// Handle one line; returns false when the REPL should stop
    fn process_line(&mut self, line: &str) -> Result<bool> {
        if line.is_empty() {
            return Ok(true);
        }

        match line.strip_prefix('.') {
            Some(cmd) => self.process_special_command(cmd),
            None => {
                commands::query::execute(&mut self.context, line)?;
                Ok(true)
            },
        }
    }

    /// Handle commands starting with '.'
    fn process_special_command(&mut self, cmd: &str) -> Result<bool> {
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (cmd, None),
        };

        match (name, arg) {
            ("help", _) => self.print_help(),
            ("exit" | "quit", _) => return Ok(false),
            ("import", Some(file)) => commands::import::execute(&mut self.context, &[PathBuf::from(file)])?,
            ("import", None) => return Err(CliError::Usage(".import <file>").into()),
            ("get", Some(key)) => commands::get::execute(&mut self.context, key)?,
            ("get", None) => return Err(CliError::Usage(".get <key>").into()),
            ("delete", Some(key)) => commands::delete::execute(&mut self.context, key)?,
            ("delete", None) => return Err(CliError::Usage(".delete <key>").into()),
            ("format", Some(format)) => {
                let format = OutputFormat::from_str(format, true)
                    .map_err(|_| CliError::UnknownFormat(format.to_string()))?;
                self.context.set_format(format);
                println!(
                    "{}",
                    self.context.formatter().format_success(&format!("Output format set to {:?}", format))
                );
            },
            ("format", None) => return Err(CliError::Usage(".format <text|json|table>").into()),
            ("history", pattern) => {
                let commands = match pattern {
                    Some(pattern) => self.history.search(pattern),
                    None => self.history.get_all().to_vec(),
                };

                if commands.is_empty() {
                    println!("{}", self.context.formatter().format_info("History is empty"));
                } else {
                    for (i, cmd) in commands.iter().enumerate() {
                        println!("{}: {}", i + 1, cmd);
                    }
                }
            },
            _ => return Err(CliError::UnknownCommand(name.to_string()).into()),
        }

        Ok(true)
    }

    fn print_help(&self) {
        println!("Available commands:");
        println!("  .help                      Show this help");
        println!("  .exit, .quit               Leave the REPL");
        println!("  .import <file>             Import delimited records from a file");
        println!("  .get <key>                 Show the record stored under a composite key");
        println!("  .delete <key>              Delete the record stored under a composite key");
        println!("  .format <text|json|table>  Set the output format");
        println!("  .history [pattern]         Show command history, optionally filtered");
        println!();
        println!("Anything else is run as a query, e.g. -s title,rev:sum -g title -o title");
    }
}
