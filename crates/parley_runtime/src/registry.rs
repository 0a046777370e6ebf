//! Command registry.
//!
//! Stores validated commands under their canonical (lower-cased) names and
//! aliases. Reads load an immutable snapshot; registration is serialized
//! and publishes a new one.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use parley_foundation::{Error, Result};
use parley_parser::{ArgumentBuilder, ArgumentSchema, ParserRegistry, usage_lines};

use crate::runner::Execution;

/// A command as its author declares it.
#[derive(Clone, Debug)]
pub struct CommandDefinition {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    overloads: Vec<ArgumentBuilder>,
    permission: Option<String>,
    execution: Execution,
}

impl CommandDefinition {
    /// Starts a definition with a name and a handler.
    #[must_use]
    pub fn new(name: impl Into<String>, execution: Execution) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            overloads: Vec::new(),
            permission: None,
            execution,
        }
    }

    /// Adds an alternative name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Adds an overload. Overloads are tried in the order they are added.
    ///
    /// A command with no overloads takes no arguments.
    #[must_use]
    pub fn overload(mut self, arguments: ArgumentBuilder) -> Self {
        self.overloads.push(arguments);
        self
    }

    /// Requires the invoker to hold `permission`.
    #[must_use]
    pub fn requires(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// The declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A validated, registered command.
#[derive(Debug)]
pub struct RegisteredCommand {
    /// Canonical, lower-cased name.
    pub name: String,
    /// Lower-cased aliases.
    pub aliases: Vec<String>,
    /// Help text.
    pub description: Option<String>,
    /// Built overloads, in declaration order.
    pub overloads: Vec<ArgumentSchema>,
    /// Permission the invoker must hold.
    pub permission: Option<String>,
    /// The handler.
    pub execution: Execution,
}

impl RegisteredCommand {
    /// One usage line per overload.
    #[must_use]
    pub fn usage(&self) -> String {
        usage_lines(&self.overloads, &self.name)
    }
}

#[derive(Clone, Default)]
struct Tables {
    commands: im::OrdMap<String, Arc<RegisteredCommand>>,
    aliases: im::HashMap<String, String>,
}

/// All registered commands.
pub struct CommandRegistry {
    tables: ArcSwap<Tables>,
    write_lock: Mutex<()>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: ArcSwap::from_pointee(Tables::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Validates and registers a command, replacing any earlier command of
    /// the same name.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name is invalid, an overload fails to
    /// build, or an alias belongs to another command.
    pub fn register(&self, definition: CommandDefinition, parsers: &ParserRegistry) -> Result<Arc<RegisteredCommand>> {
        let name = definition.name.trim().to_lowercase();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::schema(
                &definition.name,
                "command names must be a single non-empty word",
            ));
        }

        let mut overloads = Vec::with_capacity(definition.overloads.len().max(1));
        for (index, builder) in definition.overloads.iter().enumerate() {
            let schema = builder
                .build(parsers)
                .map_err(|err| Error::schema(&name, format!("overload {index}: {err}")))?;
            overloads.push(schema);
        }
        if overloads.is_empty() {
            overloads.push(ArgumentSchema::default());
        }

        let aliases: Vec<String> = definition
            .aliases
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty() && *a != name)
            .collect();

        let command = Arc::new(RegisteredCommand {
            name: name.clone(),
            aliases,
            description: definition.description,
            overloads,
            permission: definition.permission,
            execution: definition.execution,
        });

        let _guard = self.write_lock.lock();
        let mut tables = (**self.tables.load()).clone();
        for alias in &command.aliases {
            let taken_by_command = tables.commands.contains_key(alias);
            let taken_by_alias = tables.aliases.get(alias).is_some_and(|owner| *owner != name);
            if taken_by_command || taken_by_alias {
                return Err(Error::schema(&name, format!("alias `{alias}` is already taken")));
            }
        }
        if tables.aliases.contains_key(&name) {
            return Err(Error::schema(&name, "name is already an alias of another command"));
        }

        if let Some(previous) = tables.commands.remove(&name) {
            for alias in &previous.aliases {
                tables.aliases.remove(alias);
            }
        }
        for alias in &command.aliases {
            tables.aliases.insert(alias.clone(), name.clone());
        }
        tables.commands.insert(name.clone(), Arc::clone(&command));
        self.tables.store(Arc::new(tables));

        tracing::info!(
            command = %name,
            overloads = command.overloads.len(),
            strategy = command.execution.strategy(),
            "registered command"
        );
        Ok(command)
    }

    /// Removes a command and its aliases.
    pub fn unregister(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        let name = name.to_lowercase();
        let _guard = self.write_lock.lock();
        let mut tables = (**self.tables.load()).clone();
        let removed = tables.commands.remove(&name)?;
        for alias in &removed.aliases {
            tables.aliases.remove(alias);
        }
        self.tables.store(Arc::new(tables));
        Some(removed)
    }

    /// Finds a command by name or alias (case-insensitive).
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<RegisteredCommand>> {
        let name = name.to_lowercase();
        let tables = self.tables.load();
        let canonical = tables.aliases.get(&name).unwrap_or(&name);
        tables.commands.get(canonical).cloned()
    }

    /// Canonical names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tables.load().commands.keys().cloned().collect()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.load().commands.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.load().commands.is_empty()
    }

    /// Help text for every command: usage lines, then description and
    /// aliases, sorted by name.
    #[must_use]
    pub fn describe(&self) -> String {
        let tables = self.tables.load();
        let mut out = String::new();
        for command in tables.commands.values() {
            for schema in &command.overloads {
                out.push_str(&schema.usage(&command.name));
                out.push('\n');
            }
            if let Some(description) = &command.description {
                out.push_str("    ");
                out.push_str(description);
                out.push('\n');
            }
            if !command.aliases.is_empty() {
                out.push_str("    aliases: ");
                out.push_str(&command.aliases.join(", "));
                out.push('\n');
            }
        }
        out
    }
}
