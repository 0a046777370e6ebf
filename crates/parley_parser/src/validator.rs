//! Value validators attached to argument definitions.
//!
//! A validator sees the already-parsed value and either approves it or
//! explains the rejection. Closures of the right shape are validators too.

use std::fmt;

use parley_foundation::{Invoker, Value};

/// What a validator knows about the invocation.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Who is running the command.
    pub invoker: &'a dyn Invoker,
    /// Name of the argument being validated.
    pub argument: &'a str,
    /// The full raw input line.
    pub input: &'a str,
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("invoker", &self.invoker.name())
            .field("argument", &self.argument)
            .finish_non_exhaustive()
    }
}

/// Checks a bound value.
pub trait Validator: Send + Sync {
    /// Returns `Err(reason)` to reject the value.
    ///
    /// # Errors
    ///
    /// Returns a human-readable rejection reason.
    fn validate(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&Value, &ValidationContext<'_>) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<(), String> {
        self(value, ctx)
    }
}

/// Bounds the length (in characters) of a string value.
#[derive(Clone, Copy, Debug)]
pub struct StringLength {
    /// Minimum length, inclusive.
    pub min: usize,
    /// Maximum length, inclusive.
    pub max: usize,
}

impl StringLength {
    /// Accepts lengths in `min..=max`.
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Accepts lengths up to `max`.
    #[must_use]
    pub const fn at_most(max: usize) -> Self {
        Self { min: 0, max }
    }
}

impl Validator for StringLength {
    fn validate(&self, value: &Value, _ctx: &ValidationContext<'_>) -> Result<(), String> {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        let len = text.chars().count();
        if len < self.min {
            Err(format!("must be at least {} characters", self.min))
        } else if len > self.max {
            Err(format!("must be at most {} characters", self.max))
        } else {
            Ok(())
        }
    }
}

/// Bounds an integer value.
#[derive(Clone, Copy, Debug)]
pub struct IntRange {
    /// Smallest accepted value.
    pub min: i64,
    /// Largest accepted value.
    pub max: i64,
}

impl IntRange {
    /// Accepts values in `min..=max`.
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Validator for IntRange {
    fn validate(&self, value: &Value, _ctx: &ValidationContext<'_>) -> Result<(), String> {
        match value.as_int() {
            Some(n) if n < self.min || n > self.max => {
                Err(format!("must be between {} and {}", self.min, self.max))
            }
            _ => Ok(()),
        }
    }
}

/// Bounds a float value.
#[derive(Clone, Copy, Debug)]
pub struct FloatRange {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
}

impl FloatRange {
    /// Accepts values in `min..=max`.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Validator for FloatRange {
    fn validate(&self, value: &Value, _ctx: &ValidationContext<'_>) -> Result<(), String> {
        match value.as_float() {
            Some(n) if n < self.min || n > self.max => {
                Err(format!("must be between {} and {}", self.min, self.max))
            }
            _ => Ok(()),
        }
    }
}

/// Restricts a string to one of a fixed set (case-insensitive).
#[derive(Clone, Debug)]
pub struct OneOf(pub Vec<String>);

impl OneOf {
    /// Accepts any of the given choices.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(choices.into_iter().map(Into::into).collect())
    }
}

impl Validator for OneOf {
    fn validate(&self, value: &Value, _ctx: &ValidationContext<'_>) -> Result<(), String> {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        if self.0.iter().any(|c| c.eq_ignore_ascii_case(text)) {
            Ok(())
        } else {
            Err(format!("must be one of: {}", self.0.join(", ")))
        }
    }
}

/// Bounds the number of items in a list or dictionary.
#[derive(Clone, Copy, Debug)]
pub struct CollectionSize {
    /// Minimum item count.
    pub min: usize,
    /// Maximum item count.
    pub max: usize,
}

impl CollectionSize {
    /// Accepts sizes in `min..=max`.
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Rejects empty collections.
    #[must_use]
    pub const fn non_empty() -> Self {
        Self {
            min: 1,
            max: usize::MAX,
        }
    }
}

impl Validator for CollectionSize {
    fn validate(&self, value: &Value, _ctx: &ValidationContext<'_>) -> Result<(), String> {
        let len = match value {
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            _ => return Ok(()),
        };
        if len < self.min {
            Err(format!("needs at least {} item(s)", self.min))
        } else if len > self.max {
            Err(format!("allows at most {} item(s)", self.max))
        } else {
            Ok(())
        }
    }
}

/// Rejects the value unless the invoker holds a permission.
///
/// Lets one argument of a command be gated more tightly than the command.
#[derive(Clone, Debug)]
pub struct RequiresPermission(pub String);

impl Validator for RequiresPermission {
    fn validate(&self, _value: &Value, ctx: &ValidationContext<'_>) -> Result<(), String> {
        if ctx.invoker.has_permission(&self.0) {
            Ok(())
        } else {
            Err(format!("requires permission {}", self.0))
        }
    }
}
