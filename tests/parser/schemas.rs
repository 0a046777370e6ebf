//! Integration tests for schema building and the parser registry

use parley_foundation::{ArgType, Opaque, Value};
use parley_parser::{ArgumentBuilder, ArgumentSpec, ParserRegistry, StringLength, Token, ValueParser};

fn build_err(builder: ArgumentBuilder) -> String {
    builder.build(&ParserRegistry::new()).unwrap_err().to_string()
}

// =============================================================================
// Schema Validation
// =============================================================================

#[test]
fn rejects_malformed_declarations() {
    assert_eq!(
        build_err(ArgumentBuilder::new().with_spec(ArgumentSpec::named("x"))),
        "argument `x`: no type declared"
    );
    assert_eq!(
        build_err(ArgumentBuilder::new().with_spec(ArgumentSpec::named("x").of_type(ArgType::Int).optional())),
        "argument `x`: optional argument needs a default"
    );
    assert!(build_err(ArgumentBuilder::new().with_arg("", ArgType::Int)).contains("must not be empty"));
}

#[test]
fn rejects_bad_ordering() {
    let optional_first = ArgumentBuilder::new()
        .with_optional("a", ArgType::Int, 1)
        .with_arg("b", ArgType::Int);
    assert!(build_err(optional_first).contains("follows an optional"));

    let remainder_first = ArgumentBuilder::new()
        .with_remainder("text")
        .with_arg("b", ArgType::Int);
    assert!(build_err(remainder_first).contains("must be the last"));

    let duplicate = ArgumentBuilder::new()
        .with_arg("Name", ArgType::String)
        .with_arg("name", ArgType::String);
    assert!(build_err(duplicate).contains("declared more than once"));
}

#[test]
fn remainders_must_be_strings() {
    let spec = ArgumentSpec::named("rest").of_type(ArgType::Int).remainder();
    assert!(build_err(ArgumentBuilder::new().with_spec(spec)).contains("remainder must be of type string"));
}

#[test]
fn defaults_must_match_the_type() {
    let builder = ArgumentBuilder::new().with_optional("n", ArgType::Int, "many");
    assert!(build_err(builder).contains("does not match type `int`"));
}

#[test]
fn modifiers_need_an_argument() {
    let builder = ArgumentBuilder::new().validated_by(StringLength::between(1, 3));
    assert_eq!(build_err(builder), "`validated_by` called before any argument was added");
}

#[test]
fn usage_strings() {
    let schema = ArgumentBuilder::new()
        .with_arg("who", ArgType::String)
        .with_optional("times", ArgType::Int, 1)
        .with_optional("note", ArgType::optional(ArgType::String), Value::Nil)
        .build(&ParserRegistry::new())
        .unwrap();
    assert_eq!(schema.usage("poke"), "poke <who:string> [times:int=1] [note:option<string>]");
    assert_eq!((schema.required(), schema.optional()), (1, 2));
    assert!(schema.accepts(3));
    assert!(!schema.accepts(4));
}

// =============================================================================
// Parser Registry
// =============================================================================

#[derive(Debug, PartialEq)]
struct Vec3([f64; 3]);

struct Vec3Parser;

impl ValueParser for Vec3Parser {
    fn parse(&self, token: &Token) -> Result<Value, String> {
        let Token::Collection(items) = token else {
            return Err("expected [x,y,z]".to_string());
        };
        let coords: Vec<f64> = items
            .iter()
            .map(|t| t.scalar_text().and_then(|s| s.parse().ok()).ok_or("bad coordinate"))
            .collect::<Result<_, _>>()?;
        let [x, y, z] = coords[..] else {
            return Err("expected three coordinates".to_string());
        };
        Ok(Value::Opaque(Opaque::new("vec3", Vec3([x, y, z]))))
    }

    fn expected(&self) -> String {
        "vec3".to_string()
    }
}

#[test]
fn custom_types_need_a_parser() {
    let registry = ParserRegistry::new();
    let builder = ArgumentBuilder::new().with_arg("pos", ArgType::custom("vec3"));
    assert!(builder.build(&registry).unwrap_err().to_string().contains("no parser registered for type `vec3`"));

    registry.register("vec3", Vec3Parser);
    let schema = builder.build(&registry).unwrap();
    let value = schema.get("pos").unwrap().parse(&Token::Collection(vec![
        Token::Plain("1".into()),
        Token::Plain("2".into()),
        Token::Plain("3".into()),
    ]));
    assert_eq!(value.unwrap().downcast_ref::<Vec3>(), Some(&Vec3([1.0, 2.0, 3.0])));
}

#[test]
fn composite_types_resolve_recursively() {
    let registry = ParserRegistry::new();
    registry.register("vec3", Vec3Parser);

    let resolved = registry.resolve(&ArgType::list(ArgType::custom("vec3"))).unwrap();
    assert_eq!(resolved.parser.expected(), "list<vec3>");
    assert!(!resolved.nullable);

    let optional = registry.resolve(&ArgType::optional(ArgType::map(ArgType::String, ArgType::Int))).unwrap();
    assert!(optional.nullable);

    assert!(registry.resolve(&ArgType::list(ArgType::custom("color"))).is_err());
}

#[test]
fn scalar_closures_register_as_parsers() {
    let registry = ParserRegistry::new();
    registry.register_scalar("percent", |text| {
        let n: i64 = text.trim_end_matches('%').parse().map_err(|_| "expected a percentage".to_string())?;
        Ok(Value::Int(n))
    });
    let parser = registry.get("percent").unwrap();
    assert_eq!(parser.parse(&Token::Plain("40%".into())), Ok(Value::Int(40)));
    assert!(parser.parse(&Token::Collection(Vec::new())).is_err());
}
