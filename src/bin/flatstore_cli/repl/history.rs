use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

/// REPL command history kept in a file
pub struct History {
    /// History file
    file_path: PathBuf,

    /// Commands in memory, oldest first
    commands: Vec<String>,

    /// Maximum number of commands kept
    max_size: usize,
}

impl History {
    pub fn new<P: AsRef<Path>>(file_path: P, max_size: usize) -> Self {
        History {
            file_path: file_path.as_ref().to_path_buf(),
            commands: Vec::new(),
            max_size,
        }
    }

    /// Load the history file, if there is one
    pub fn load(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&self.file_path)?);

        self.commands.clear();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                self.commands.push(line);
            }
        }

        if self.commands.len() > self.max_size {
            self.commands.drain(..self.commands.len() - self.max_size);
        }

        Ok(())
    }

    /// Write the history file
    pub fn save(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.file_path)?;

        for cmd in &self.commands {
            writeln!(file, "{}", cmd)?;
        }

        Ok(())
    }

    /// Add a command, skipping blanks and consecutive duplicates
    pub fn add(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }

        if self.commands.last().map_or(false, |last| last == command) {
            return;
        }

        self.commands.push(command.to_string());
        if self.commands.len() > self.max_size {
            self.commands.remove(0);
        }
    }

    pub fn get_all(&self) -> &[String] {
        &self.commands
    }

    /// Commands containing `pattern`
    pub fn search(&self, pattern: &str) -> Vec<String> {
        self.commands
            .iter()
            .filter(|cmd| cmd.contains(pattern))
            .cloned()
            .collect()
    }
}
