//! Type parser registry.
//!
//! Maps an [`ArgType`] to a [`ValueParser`]. Scalars and custom domain types
//! are looked up by key; enums, optionals, lists, and maps are composed from
//! their parts. Resolution happens once per argument definition, when a
//! schema is built.
//!
//! The registry is read on every resolution and written only while commands
//! and parsers are being registered. Readers load an immutable snapshot
//! without locking; writers are serialized and publish a new snapshot.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use parley_foundation::{ArgType, EnumType, EnumValue, Value};

use crate::token::Token;

/// Converts a token into a value of one type.
pub trait ValueParser: Send + Sync {
    /// Parses the token, or explains why it does not fit.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason on failure.
    fn parse(&self, token: &Token) -> Result<Value, String>;

    /// Short description of what this parser accepts, used in messages.
    fn expected(&self) -> String;
}

/// A parser resolved for one declared type.
#[derive(Clone)]
pub struct ResolvedParser {
    /// The parser to apply.
    pub parser: Arc<dyn ValueParser>,
    /// Whether the declared type was optional.
    pub nullable: bool,
}

impl fmt::Debug for ResolvedParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedParser")
            .field("expected", &self.parser.expected())
            .field("nullable", &self.nullable)
            .finish()
    }
}

type ParserTable = im::HashMap<String, Arc<dyn ValueParser>>;

/// Registry of parsers keyed by type.
pub struct ParserRegistry {
    parsers: ArcSwap<ParserTable>,
    write_lock: Mutex<()>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.parsers.load();
        let mut keys: Vec<&String> = table.keys().collect();
        keys.sort();
        f.debug_struct("ParserRegistry")
            .field("types", &keys)
            .finish()
    }
}

impl ParserRegistry {
    /// Creates a registry with the built-in scalar parsers.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(ArgType::Bool.key(), BoolParser);
        registry.register(ArgType::Int.key(), IntParser);
        registry.register(ArgType::Float.key(), FloatParser);
        registry.register(ArgType::String.key(), StringParser);
        registry
    }

    /// Creates a registry with no parsers at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: ArcSwap::from_pointee(ParserTable::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Registers (or replaces) the parser for a type key.
    ///
    /// Keys are the display form of an [`ArgType`]: `int`, `list<string>`,
    /// or the name of a custom type.
    pub fn register(&self, key: impl Into<String>, parser: impl ValueParser + 'static) {
        self.register_arc(key, Arc::new(parser));
    }

    /// Registers a shared parser for a type key.
    pub fn register_arc(&self, key: impl Into<String>, parser: Arc<dyn ValueParser>) {
        let key = key.into();
        let _guard = self.write_lock.lock();
        let mut table = (**self.parsers.load()).clone();
        table.insert(key.clone(), parser);
        self.parsers.store(Arc::new(table));
        tracing::debug!(ty = %key, "registered argument parser");
    }

    /// Registers a parser for a custom scalar type from a text conversion.
    pub fn register_scalar<F>(&self, name: impl Into<String>, parse: F)
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        let name = name.into();
        self.register(
            name.clone(),
            ScalarFn {
                expected: name,
                parse,
            },
        );
    }

    /// Returns the parser registered for exactly this key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn ValueParser>> {
        self.parsers.load().get(key).cloned()
    }

    /// Returns true if a parser is registered under this key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.parsers.load().contains_key(key)
    }

    /// Resolves a parser for a declared type.
    ///
    /// 1. an exact registration for the type's key wins;
    /// 2. enums get a case-insensitive name/ordinal parser;
    /// 3. optionals recurse on the inner type and become nullable;
    /// 4. lists and 5. maps recurse on their element types;
    /// 6. anything else is unsupported.
    ///
    /// # Errors
    ///
    /// Returns a description of the first type without a parser.
    pub fn resolve(&self, ty: &ArgType) -> Result<ResolvedParser, String> {
        if let Some(parser) = self.get(&ty.key()) {
            return Ok(ResolvedParser {
                parser,
                nullable: ty.is_optional(),
            });
        }

        let parser: Arc<dyn ValueParser> = match ty {
            ArgType::Enum(def) => Arc::new(EnumParser { def: def.clone() }),
            ArgType::Optional(inner) => {
                let inner = self.resolve(inner)?;
                return Ok(ResolvedParser {
                    parser: Arc::new(OptionalParser {
                        inner: inner.parser,
                    }),
                    nullable: true,
                });
            }
            ArgType::List(element) => Arc::new(ListParser {
                element: self.resolve(element)?.parser,
            }),
            ArgType::Map(key, value) => Arc::new(MapParser {
                key: self.resolve(key)?.parser,
                value: self.resolve(value)?.parser,
            }),
            ArgType::Bool | ArgType::Int | ArgType::Float | ArgType::String | ArgType::Custom(_) => {
                return Err(format!("no parser registered for type `{ty}`"));
            }
        };

        Ok(ResolvedParser {
            parser,
            nullable: false,
        })
    }
}

fn scalar<'t>(token: &'t Token, expected: &str) -> Result<&'t str, String> {
    token
        .scalar_text()
        .ok_or_else(|| format!("expected {expected}, got a {}", token.kind_name()))
}

/// Parses `true/false`, `yes/no`, `on/off`, and `1/0`.
#[derive(Clone, Copy, Debug)]
pub struct BoolParser;

impl ValueParser for BoolParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let text = scalar(token, "bool")?;
        match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err("expected true or false".to_owned()),
        }
    }

    fn expected(&self) -> String {
        "bool".to_owned()
    }
}

/// Parses a 64-bit signed integer.
#[derive(Clone, Copy, Debug)]
pub struct IntParser;

impl ValueParser for IntParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let text = scalar(token, "int")?;
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| "not a valid integer".to_owned())
    }

    fn expected(&self) -> String {
        "int".to_owned()
    }
}

/// Parses a finite 64-bit float.
#[derive(Clone, Copy, Debug)]
pub struct FloatParser;

impl ValueParser for FloatParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let text = scalar(token, "float")?;
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Float(n)),
            _ => Err("not a valid number".to_owned()),
        }
    }

    fn expected(&self) -> String {
        "float".to_owned()
    }
}

/// Accepts the text of any scalar token.
#[derive(Clone, Copy, Debug)]
pub struct StringParser;

impl ValueParser for StringParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        scalar(token, "string").map(Value::from)
    }

    fn expected(&self) -> String {
        "string".to_owned()
    }
}

/// Matches variant names case-insensitively, or their ordinals.
#[derive(Clone, Debug)]
pub struct EnumParser {
    def: EnumType,
}

impl ValueParser for EnumParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let text = scalar(token, &self.def.name)?.trim();
        let ordinal = self
            .def
            .position(text)
            .or_else(|| {
                text.parse::<usize>()
                    .ok()
                    .filter(|n| *n < self.def.variants.len())
            })
            .ok_or_else(|| format!("expected one of: {}", self.def.variants.join(", ")))?;

        Ok(Value::Enum(EnumValue {
            type_name: self.def.name.clone(),
            variant: self.def.variants[ordinal].clone(),
            ordinal,
        }))
    }

    fn expected(&self) -> String {
        self.def.name.to_string()
    }
}

/// Accepts `null`/`nil` as nil, otherwise defers to the inner parser.
pub struct OptionalParser {
    inner: Arc<dyn ValueParser>,
}

impl ValueParser for OptionalParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        match token {
            Token::Plain(text)
                if text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("nil") =>
            {
                Ok(Value::Nil)
            }
            other => self.inner.parse(other),
        }
    }

    fn expected(&self) -> String {
        format!("option<{}>", self.inner.expected())
    }
}

/// Parses a `[…]` collection item by item.
pub struct ListParser {
    element: Arc<dyn ValueParser>,
}

impl ValueParser for ListParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let Token::Collection(items) = token else {
            return Err(format!(
                "expected a [..] collection, got a {}",
                token.kind_name()
            ));
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.element
                    .parse(item)
                    .map_err(|reason| format!("item {index} (`{item}`): {reason}"))
            })
            .collect::<Result<im::Vector<Value>, String>>()
            .map(Value::List)
    }

    fn expected(&self) -> String {
        format!("list<{}>", self.element.expected())
    }
}

/// Parses a `{…}` dictionary pair by pair.
pub struct MapParser {
    key: Arc<dyn ValueParser>,
    value: Arc<dyn ValueParser>,
}

impl ValueParser for MapParser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let Token::Dictionary(pairs) = token else {
            return Err(format!(
                "expected a {{..}} dictionary, got a {}",
                token.kind_name()
            ));
        };
        let mut map = IndexMap::with_capacity(pairs.len());
        for (raw_key, raw_value) in pairs {
            let key = self
                .key
                .parse(raw_key)
                .map_err(|reason| format!("key `{raw_key}`: {reason}"))?;
            let value = self
                .value
                .parse(raw_value)
                .map_err(|reason| format!("value for key `{raw_key}`: {reason}"))?;
            if map.insert(key, value).is_some() {
                return Err(format!("duplicate key `{raw_key}`"));
            }
        }
        Ok(Value::Map(Arc::new(map)))
    }

    fn expected(&self) -> String {
        format!("map<{}, {}>", self.key.expected(), self.value.expected())
    }
}

/// A custom scalar parser built from a closure over the token text.
struct ScalarFn<F> {
    expected: String,
    parse: F,
}

impl<F> ValueParser for ScalarFn<F>
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync,
{
    fn parse(&self, token: &Token) -> Result<Value, String> {
        (self.parse)(scalar(token, &self.expected)?)
    }

    fn expected(&self) -> String {
        self.expected.clone()
    }
}
