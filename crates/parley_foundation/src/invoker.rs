//! The identity a command line is executed on behalf of.
//!
//! Parley does not own sessions or permissions. Front-ends hand it an
//! [`Invoker`] and every identity or authorization question is asked of it.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identity of whoever typed (or forwarded) a command line.
pub trait Invoker: Send + Sync + fmt::Debug {
    /// Display name of the invoker.
    fn name(&self) -> &str;

    /// Key identifying the conversation this invoker's next line belongs to.
    ///
    /// Continued responses wait for the next line carrying the same key.
    fn conversation_key(&self) -> String {
        self.name().to_owned()
    }

    /// Whether the invoker holds the given permission.
    fn has_permission(&self, permission: &str) -> bool;

    /// Looks up a `${name}` property relative to this invoker.
    fn property(&self, _name: &str) -> Option<String> {
        None
    }
}

/// A name → value table used to substitute `${name}` property tokens.
pub trait PropertySource {
    /// Resolves a property, or `None` if it is unknown.
    fn resolve(&self, name: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A property source that knows nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProperties;

impl PropertySource for NoProperties {
    fn resolve(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Adapts an invoker's properties into a [`PropertySource`].
#[derive(Clone, Copy, Debug)]
pub struct InvokerProperties<'a>(pub &'a dyn Invoker);

impl PropertySource for InvokerProperties<'_> {
    fn resolve(&self, name: &str) -> Option<String> {
        self.0.property(name)
    }
}

/// A simple invoker with a fixed permission set and property table.
///
/// Serves local server consoles (which hold every permission) and tests.
#[derive(Clone, Debug)]
pub struct ConsoleInvoker {
    name: String,
    conversation: Option<String>,
    permissions: Option<HashSet<String>>,
    properties: HashMap<String, String>,
}

impl ConsoleInvoker {
    /// Creates an invoker that holds every permission.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conversation: None,
            permissions: None,
            properties: HashMap::new(),
        }
    }

    /// Restricts the invoker to exactly the given permissions.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a property available as `${name}`.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Overrides the conversation key (defaults to the name).
    #[must_use]
    pub fn with_conversation(mut self, key: impl Into<String>) -> Self {
        self.conversation = Some(key.into());
        self
    }
}

impl Invoker for ConsoleInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    fn conversation_key(&self) -> String {
        self.conversation.clone().unwrap_or_else(|| self.name.clone())
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_ref()
            .is_none_or(|set| set.contains(permission))
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}
