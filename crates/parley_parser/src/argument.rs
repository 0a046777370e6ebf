//! Argument declarations and overload schemas.
//!
//! Command authors describe each overload with an [`ArgumentBuilder`]:
//!
//! ```
//! use parley_foundation::ArgType;
//! use parley_parser::{ArgumentBuilder, IntRange, ParserRegistry};
//!
//! let registry = ParserRegistry::new();
//! let schema = ArgumentBuilder::new()
//!     .with_arg("name", ArgType::String)
//!     .with_optional("length", ArgType::Int, 10)
//!     .validated_by(IntRange::new(1, 60))
//!     .build(&registry)
//!     .unwrap();
//! assert_eq!(schema.usage("duration"), "duration <name:string> [length:int=10]");
//! ```
//!
//! Building validates every declaration against the parser registry and
//! freezes the result into an [`ArgumentSchema`] of [`ArgumentDefinition`]s.

use std::fmt;
use std::sync::Arc;

use parley_foundation::{ArgType, Value};
use thiserror::Error;

use crate::parsers::{ParserRegistry, ResolvedParser, ValueParser};
use crate::token::Token;
use crate::validator::{ValidationContext, Validator};

/// A declaration that failed validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{prefix}{message}", prefix = .argument.as_ref().map(|a| format!("argument `{a}`: ")).unwrap_or_default())]
pub struct SchemaError {
    /// Argument the problem belongs to, if any.
    pub argument: Option<String>,
    /// Description of the problem.
    pub message: String,
}

impl SchemaError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            argument: None,
            message: message.into(),
        }
    }

    fn for_argument(argument: &str, message: impl Into<String>) -> Self {
        Self {
            argument: Some(argument.to_owned()),
            message: message.into(),
        }
    }
}

/// A mutable, not yet validated argument declaration.
#[derive(Clone, Default)]
pub struct ArgumentSpec {
    name: String,
    ty: Option<ArgType>,
    optional: bool,
    default: Option<Value>,
    description: Option<String>,
    validators: Vec<Arc<dyn Validator>>,
    remainder: bool,
    parser: Option<Arc<dyn ValueParser>>,
}

impl fmt::Debug for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentSpec")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .field("remainder", &self.remainder)
            .finish_non_exhaustive()
    }
}

impl ArgumentSpec {
    /// Starts a declaration with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the declared type.
    #[must_use]
    pub fn of_type(mut self, ty: ArgType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Marks the argument optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the value bound when the argument is omitted.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Makes the argument consume the rest of the line verbatim.
    #[must_use]
    pub fn remainder(mut self) -> Self {
        self.remainder = true;
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn described(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Appends a validator.
    #[must_use]
    pub fn validated_by(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Uses this parser instead of resolving one from the registry.
    #[must_use]
    pub fn with_parser(mut self, parser: impl ValueParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Checks the declaration and resolves its parser.
    ///
    /// # Errors
    ///
    /// Rejects an empty name, a missing type, a type with no parser, an
    /// optional argument without a default, a default of the wrong shape,
    /// and a remainder that is not a string.
    pub fn validate(&self, registry: &ParserRegistry) -> Result<ArgumentDefinition, SchemaError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SchemaError::new("argument name must not be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(SchemaError::for_argument(name, "name must not contain whitespace"));
        }

        let Some(ty) = self.ty.clone() else {
            return Err(SchemaError::for_argument(name, "no type declared"));
        };

        let parser = match &self.parser {
            Some(parser) => ResolvedParser {
                parser: Arc::clone(parser),
                nullable: ty.is_optional(),
            },
            None => registry
                .resolve(&ty)
                .map_err(|reason| SchemaError::for_argument(name, reason))?,
        };

        if self.remainder && ty != ArgType::String {
            return Err(SchemaError::for_argument(
                name,
                format!("remainder must be of type string, not `{ty}`"),
            ));
        }
        if self.remainder && self.optional {
            return Err(SchemaError::for_argument(name, "remainder cannot be optional"));
        }

        let default = match (&self.default, self.optional) {
            (Some(value), true) => Some(value.clone()),
            (None, true) if ty.is_optional() => Some(Value::Nil),
            (None, true) => {
                return Err(SchemaError::for_argument(name, "optional argument needs a default"));
            }
            (Some(_), false) => {
                return Err(SchemaError::for_argument(
                    name,
                    "default given for a required argument",
                ));
            }
            (None, false) => None,
        };
        if let Some(value) = &default {
            if !ty.accepts(value) {
                return Err(SchemaError::for_argument(
                    name,
                    format!("default `{value}` does not match type `{ty}`"),
                ));
            }
        }
        let default = default.map(|value| ty.coerce(value));

        Ok(ArgumentDefinition {
            inner: Arc::new(DefinitionInner {
                key: name.to_lowercase(),
                name: name.to_owned(),
                ty,
                default,
                description: self.description.clone(),
                validators: self.validators.clone(),
                remainder: self.remainder,
                parser,
            }),
        })
    }
}

struct DefinitionInner {
    name: String,
    key: String,
    ty: ArgType,
    default: Option<Value>,
    description: Option<String>,
    validators: Vec<Arc<dyn Validator>>,
    remainder: bool,
    parser: ResolvedParser,
}

/// A validated argument declaration.
///
/// Cheap to clone; the resolved parser is shared.
#[derive(Clone)]
pub struct ArgumentDefinition {
    inner: Arc<DefinitionInner>,
}

impl fmt::Debug for ArgumentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDefinition")
            .field("name", &self.inner.name)
            .field("ty", &self.inner.ty)
            .field("default", &self.inner.default)
            .field("remainder", &self.inner.remainder)
            .field("validators", &self.inner.validators.len())
            .finish()
    }
}

impl ArgumentDefinition {
    /// Declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Lower-cased name used as the collection key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Declared type.
    #[must_use]
    pub fn ty(&self) -> &ArgType {
        &self.inner.ty
    }

    /// Whether the argument may be omitted.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.inner.default.is_some()
    }

    /// Value bound when omitted.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.inner.default.as_ref()
    }

    /// Help text.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// Number of attached validators.
    #[must_use]
    pub fn validator_count(&self) -> usize {
        self.inner.validators.len()
    }

    /// Whether the argument takes the rest of the line.
    #[must_use]
    pub fn is_remainder(&self) -> bool {
        self.inner.remainder
    }

    /// The resolved parser.
    #[must_use]
    pub fn parser(&self) -> &ResolvedParser {
        &self.inner.parser
    }

    /// Human-readable form of the expected type.
    #[must_use]
    pub fn expected(&self) -> String {
        self.inner.ty.to_string()
    }

    /// Parses a token with the resolved parser.
    ///
    /// # Errors
    ///
    /// Returns the parser's rejection reason.
    pub fn parse(&self, token: &Token) -> Result<Value, String> {
        self.inner.parser.parser.parse(token)
    }

    /// Runs the validators in order, stopping at the first rejection.
    ///
    /// # Errors
    ///
    /// Returns the first validator's rejection reason.
    pub fn check(&self, value: &Value, ctx: &ValidationContext<'_>) -> Result<(), String> {
        self.inner
            .validators
            .iter()
            .try_for_each(|validator| validator.validate(value, ctx))
    }

    fn usage(&self) -> String {
        let name = &self.inner.name;
        let ty = &self.inner.ty;
        if self.inner.remainder {
            return format!("<{name}...>");
        }
        match &self.inner.default {
            None => format!("<{name}:{ty}>"),
            Some(Value::Nil) => format!("[{name}:{ty}]"),
            Some(value) => format!("[{name}:{ty}={value}]"),
        }
    }
}

/// One validated overload: an ordered list of argument definitions.
#[derive(Clone, Debug, Default)]
pub struct ArgumentSchema {
    arguments: Vec<ArgumentDefinition>,
    required: usize,
    optional: usize,
    remainder: bool,
}

impl ArgumentSchema {
    /// The definitions in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[ArgumentDefinition] {
        &self.arguments
    }

    /// Number of required arguments (a remainder counts as required).
    #[must_use]
    pub const fn required(&self) -> usize {
        self.required
    }

    /// Number of optional arguments.
    #[must_use]
    pub const fn optional(&self) -> usize {
        self.optional
    }

    /// Whether the last argument is a remainder.
    #[must_use]
    pub const fn has_remainder(&self) -> bool {
        self.remainder
    }

    /// Whether this overload can take `provided` raw arguments.
    #[must_use]
    pub const fn accepts(&self, provided: usize) -> bool {
        provided >= self.required && (self.remainder || provided <= self.required + self.optional)
    }

    /// Finds a definition by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgumentDefinition> {
        let key = name.to_lowercase();
        self.arguments.iter().find(|a| a.key() == key)
    }

    /// One-line usage such as `tag <colors:list<string>> [note:string]`.
    #[must_use]
    pub fn usage(&self, command: &str) -> String {
        let mut line = command.to_owned();
        for argument in &self.arguments {
            line.push(' ');
            line.push_str(&argument.usage());
        }
        line
    }
}

/// Fluent builder for one overload.
#[derive(Clone, Debug, Default)]
pub struct ArgumentBuilder {
    specs: Vec<ArgumentSpec>,
    dangling: Option<&'static str>,
}

impl ArgumentBuilder {
    /// Creates an empty builder (an overload taking no arguments).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required argument.
    #[must_use]
    pub fn with_arg(self, name: impl Into<String>, ty: ArgType) -> Self {
        self.with_spec(ArgumentSpec::named(name).of_type(ty))
    }

    /// Adds an optional argument bound to `default` when omitted.
    #[must_use]
    pub fn with_optional(self, name: impl Into<String>, ty: ArgType, default: impl Into<Value>) -> Self {
        self.with_spec(
            ArgumentSpec::named(name)
                .of_type(ty)
                .optional()
                .with_default(default),
        )
    }

    /// Adds a string argument that takes the rest of the line verbatim.
    #[must_use]
    pub fn with_remainder(self, name: impl Into<String>) -> Self {
        self.with_spec(ArgumentSpec::named(name).of_type(ArgType::String).remainder())
    }

    /// Adds a hand-built declaration.
    #[must_use]
    pub fn with_spec(mut self, spec: ArgumentSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Sets the help text of the last argument.
    #[must_use]
    pub fn described(self, text: impl Into<String>) -> Self {
        self.modify_last("described", |spec| spec.described(text))
    }

    /// Adds a validator to the last argument.
    #[must_use]
    pub fn validated_by(self, validator: impl Validator + 'static) -> Self {
        self.modify_last("validated_by", |spec| spec.validated_by(validator))
    }

    /// Overrides the parser of the last argument.
    #[must_use]
    pub fn with_parser(self, parser: impl ValueParser + 'static) -> Self {
        self.modify_last("with_parser", |spec| spec.with_parser(parser))
    }

    fn modify_last(mut self, modifier: &'static str, f: impl FnOnce(ArgumentSpec) -> ArgumentSpec) -> Self {
        match self.specs.pop() {
            Some(spec) => self.specs.push(f(spec)),
            None => self.dangling = self.dangling.or(Some(modifier)),
        }
        self
    }

    /// Validates every declaration and freezes the overload.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: an invalid declaration, a duplicate
    /// name, a required argument after an optional one, or a misplaced
    /// remainder.
    pub fn build(&self, registry: &ParserRegistry) -> Result<ArgumentSchema, SchemaError> {
        if let Some(modifier) = self.dangling {
            return Err(SchemaError::new(format!(
                "`{modifier}` called before any argument was added"
            )));
        }

        let mut schema = ArgumentSchema::default();
        for (index, spec) in self.specs.iter().enumerate() {
            let definition = spec.validate(registry)?;
            let name = definition.name();

            if schema.get(name).is_some() {
                return Err(SchemaError::for_argument(name, "declared more than once"));
            }
            if definition.is_remainder() {
                if schema.remainder {
                    return Err(SchemaError::for_argument(name, "only one remainder is allowed"));
                }
                if index + 1 != self.specs.len() {
                    return Err(SchemaError::for_argument(name, "remainder must be the last argument"));
                }
            }
            if definition.is_optional() {
                schema.optional += 1;
            } else if schema.optional > 0 {
                return Err(SchemaError::for_argument(
                    name,
                    "required argument follows an optional one",
                ));
            } else {
                schema.required += 1;
            }

            schema.remainder |= definition.is_remainder();
            schema.arguments.push(definition);
        }
        Ok(schema)
    }
}
