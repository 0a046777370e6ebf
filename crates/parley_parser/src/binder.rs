//! Binding raw arguments to an overload.
//!
//! Given the overloads of a command and the raw arguments of one line, the
//! binder picks an overload, scans and parses each argument, runs the
//! validators, and fills omitted optional arguments with their defaults.
//! Every failure comes back as an [`Error`] value.

use parley_foundation::{Error, ErrorContext, ErrorKind, Invoker, InvokerProperties, Result, Value};

use crate::argument::ArgumentSchema;
use crate::arguments::{ArgumentCollection, ArgumentPool};
use crate::overload::select_overload;
use crate::scanner::{RawArgument, Scanner};
use crate::validator::ValidationContext;

/// Everything the binder needs to know about one line.
#[derive(Clone, Copy, Debug)]
pub struct BindRequest<'a> {
    /// Canonical command name, used in usage lines.
    pub command: &'a str,
    /// The full input line the raw arguments were split from.
    pub line: &'a str,
    /// Raw arguments, command name excluded.
    pub args: &'a [RawArgument],
    /// Who is running the command; also the `${name}` property source.
    pub invoker: &'a dyn Invoker,
    /// Delimiter problem found while splitting the line. It only stands if
    /// it falls before the chosen overload's remainder.
    pub split_error: Option<&'a Error>,
}

/// A successful bind.
#[derive(Debug)]
pub struct Bound {
    /// Index of the chosen overload.
    pub overload: usize,
    /// The bound arguments.
    pub arguments: ArgumentCollection,
}

/// Binds the raw arguments of `request` against the best-fitting overload.
///
/// Every error carries an [`ErrorContext`] naming the command and the line;
/// errors past overload selection also note the chosen usage line.
///
/// # Errors
///
/// - `NoOverload` with every overload's usage line when none accepts the
///   argument count
/// - `Scan` when an argument is malformed, or the split error when no
///   remainder takes the malformed text
/// - `Bind` when a parser or validator rejects an argument
pub fn bind(overloads: &[ArgumentSchema], request: &BindRequest<'_>, pool: &ArgumentPool) -> Result<Bound> {
    let context = ErrorContext::new()
        .with_command(request.command)
        .with_input(request.line);

    let provided = request.args.len();
    let Some(overload) = select_overload(overloads, provided) else {
        let err = match request.split_error {
            Some(err) => err.clone(),
            None => Error::new(ErrorKind::NoOverload {
                provided,
                usage: usage_lines(overloads, request.command),
            }),
        };
        return Err(err.with_context(context));
    };
    let schema = &overloads[overload];

    bind_overload(schema, request, pool)
        .map(|arguments| Bound { overload, arguments })
        .map_err(|err| {
            err.with_context(context.with_note(format!("usage: {}", schema.usage(request.command))))
        })
}

fn bind_overload(schema: &ArgumentSchema, request: &BindRequest<'_>, pool: &ArgumentPool) -> Result<ArgumentCollection> {
    if let Some(err) = request.split_error {
        let covered = err
            .scan_position()
            .is_some_and(|position| remainder_covers(schema, request.args, position));
        if !covered {
            return Err(err.clone());
        }
    }

    let properties = InvokerProperties(request.invoker);
    let mut arguments = pool.rent();

    for (index, definition) in schema.arguments().iter().enumerate() {
        let ctx = ValidationContext {
            invoker: request.invoker,
            argument: definition.name(),
            input: request.line,
        };

        let Some(raw) = request.args.get(index) else {
            let Some(default) = definition.default() else {
                return Err(Error::new(ErrorKind::Internal(format!(
                    "required argument `{}` left unbound",
                    definition.name()
                ))));
            };
            arguments.insert(definition.name(), default.clone(), definition.ty().clone());
            continue;
        };

        let (value, raw_text) = if definition.is_remainder() {
            let rest = request.line.get(raw.start..).unwrap_or(&raw.text).trim_end();
            (Value::from(rest), rest)
        } else {
            let token = Scanner::scan_argument(raw, &properties)?;
            let value = definition.parse(&token).map_err(|reason| {
                Error::bind(definition.name(), definition.expected(), &raw.text, reason)
            })?;
            (value, raw.text.as_str())
        };

        definition
            .check(&value, &ctx)
            .map_err(|reason| Error::bind(definition.name(), definition.expected(), raw_text, reason))?;

        arguments.insert(definition.name(), value, definition.ty().clone());
    }

    Ok(arguments)
}

/// Returns true if the remainder of `schema` starts at or before `position`.
fn remainder_covers(schema: &ArgumentSchema, args: &[RawArgument], position: usize) -> bool {
    schema.has_remainder()
        && schema
            .arguments()
            .len()
            .checked_sub(1)
            .and_then(|index| args.get(index))
            .is_some_and(|raw| raw.start <= position)
}

/// Usage lines of every overload, one per line.
#[must_use]
pub fn usage_lines(overloads: &[ArgumentSchema], command: &str) -> String {
    overloads
        .iter()
        .map(|schema| format!("usage: {}", schema.usage(command)))
        .collect::<Vec<_>>()
        .join("\n")
}
