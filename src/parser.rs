//! Parser for `.flow` scripts.
//!
//! The top-level entry points are [`parse_str`] and [`parse_file`]. A script
//! is a list of lines; each line is either a directive or a step:
//!
//! ```text
//! global visits = 0
//! flowchart intro
//! var name: string = "ada"
//! sequence main pause 100ms
//! set global.visits += 1
//! log "hello {$name}"
//! ```
//!
//! Steps and `var` lines that appear before any `flowchart` directive go to
//! an implicit flowchart called `main`; steps before any `sequence`
//! directive go to an implicit sequence called `main`.

use crate::binding::{AuthoringScope, Binding};
use crate::engine::Engine;
use crate::flowchart::Flowchart;
use crate::sequence::Sequence;
use crate::step::Step;
use crate::steps::{
    Await, Break, Call, CountItems, Else, ElseIf, End, ForEach, GetItem, If, Log, PriorityShift,
    PushItem, Reset, SetItem, SetVariable, Stop, Wait, While,
};
use crate::value::{Color, Value, ValueKind, Vec2, Vec3};
use crate::variable::{Scope, VariableStore};
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Name of the implicit flowchart and sequence.
pub const DEFAULT_NAME: &str = "main";

/// A parsed script: globals plus flowcharts, ready to load into an
/// [`Engine`].
#[derive(Debug)]
pub struct Script {
    pub globals: VariableStore,
    pub flowcharts: Vec<Flowchart>,
}

impl Script {
    /// Authoring problems across every flowchart.
    pub fn diagnostics(&self) -> Vec<String> {
        self.flowcharts
            .iter()
            .flat_map(Flowchart::diagnostics)
            .collect()
    }
}

impl From<Script> for Engine {
    fn from(script: Script) -> Self {
        let mut engine = Engine::new();
        engine.globals = script.globals;
        for flowchart in script.flowcharts {
            engine
                .flowcharts
                .insert(flowchart.name().to_string(), flowchart);
        }
        engine
    }
}

/// Parse a script from a string slice.
///
/// Lines that are empty or start with `#` are ignored. Inline comments (` # …`)
/// are stripped while preserving `#` characters inside quoted strings.
/// Unpaired blocks and misconfigured steps do not fail the parse; they are
/// logged and available from [`Script::diagnostics`].
///
/// # Errors
///
/// Returns an error if any line contains an unknown step, a malformed
/// argument, a reference to an undeclared variable, or a value of the wrong
/// kind.
///
/// # Example
///
/// ```
/// use stepflow::parse_str;
///
/// let script = parse_str("var n = 0\nset n += 1\nlog \"n is {$n}\"\n").unwrap();
/// assert_eq!(script.flowcharts.len(), 1);
/// ```
pub fn parse_str(content: &str) -> Result<Script> {
    let mut builder = Builder {
        globals: VariableStore::new(Scope::Global),
        flowcharts: Vec::new(),
        sequence: None,
    };
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = strip_inline_comment(line);
        builder
            .parse_line(line)
            .with_context(|| format!("Failed to parse line {}: {}", line_num + 1, line))?;
    }

    let script = Script {
        globals: builder.globals,
        flowcharts: builder.flowcharts,
    };
    for problem in script.diagnostics() {
        warn!("{problem}");
    }
    Ok(script)
}

/// Parse a script from a file.
///
/// Reads the entire file into memory and delegates to [`parse_str`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or if the script is malformed.
pub fn parse_file(path: impl AsRef<Path>) -> Result<Script> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script file: {}", path.display()))?;
    parse_str(&content)
}

type ParseFn = fn(&str, &AuthoringScope<'_>) -> Result<Box<dyn Step>>;

static REGISTRY: &[(&str, ParseFn)] = &[
    (SetVariable::NAME, SetVariable::parse_boxed),
    (If::NAME, If::parse_boxed),
    (ElseIf::NAME, ElseIf::parse_boxed),
    (Else::NAME, Else::parse_boxed),
    (End::NAME, End::parse_boxed),
    (While::NAME, While::parse_boxed),
    (ForEach::NAME, ForEach::parse_boxed),
    (Break::NAME, Break::parse_boxed),
    (Call::NAME, Call::parse_boxed),
    (Wait::NAME, Wait::parse_boxed),
    (Log::NAME, Log::parse_boxed),
    (Stop::NAME, Stop::parse_boxed),
    (Await::NAME, Await::parse_boxed),
    (PriorityShift::NAME, PriorityShift::parse_boxed),
    (GetItem::NAME, GetItem::parse_boxed),
    (SetItem::NAME, SetItem::parse_boxed),
    (PushItem::NAME, PushItem::parse_boxed),
    (CountItems::NAME, CountItems::parse_boxed),
    (Reset::NAME, Reset::parse_boxed),
];

struct Builder {
    globals: VariableStore,
    flowcharts: Vec<Flowchart>,
    /// Sequence steps are currently appended to.
    sequence: Option<String>,
}

impl Builder {
    fn parse_line(&mut self, line: &str) -> Result<()> {
        let (keyword, args) = split_word(line);
        match keyword {
            "flowchart" => self.open_flowchart(args),
            "sequence" => self.open_sequence(args),
            "var" => self.declare(args, Scope::Local),
            "global" => self.declare(args, Scope::Global),
            _ => self.add_step(keyword, args),
        }
    }

    /// Index of the flowchart being built, creating the implicit one.
    fn current(&mut self) -> usize {
        if self.flowcharts.is_empty() {
            self.flowcharts.push(Flowchart::new(DEFAULT_NAME));
        }
        self.flowcharts.len() - 1
    }

    fn open_flowchart(&mut self, args: &str) -> Result<()> {
        let name = args.trim();
        if !is_identifier(name) || name.contains('.') {
            return Err(anyhow!("Invalid flowchart name: {}", name));
        }
        if self.flowcharts.iter().any(|fc| fc.name() == name) {
            return Err(anyhow!("Flowchart declared twice: {}", name));
        }
        self.flowcharts.push(Flowchart::new(name));
        self.sequence = None;
        Ok(())
    }

    fn open_sequence(&mut self, args: &str) -> Result<()> {
        let (name, rest) = split_word(args);
        if !is_identifier(name) || name.contains('.') {
            return Err(anyhow!("Invalid sequence name: {}", name));
        }
        let mut sequence = Sequence::new(name);
        match split_word(rest) {
            ("", _) => {}
            ("pause", delay) => sequence = sequence.with_step_delay(parse_duration(delay)?),
            (other, _) => return Err(anyhow!("Unexpected sequence option: {}", other)),
        }
        let index = self.current();
        self.flowcharts[index].add_sequence(sequence)?;
        self.sequence = Some(name.to_string());
        Ok(())
    }

    /// `name = literal`, `name: kind = literal` or `name: list<kind> = [...]`.
    fn declare(&mut self, args: &str, scope: Scope) -> Result<()> {
        let (head, literal) = args
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected `<name> = <value>`"))?;
        let (name, kind, element) = match head.split_once(':') {
            Some((name, kind)) => {
                let (kind, element) = parse_kind(kind)?;
                (name.trim(), Some(kind), element)
            }
            None => (head.trim(), None, None),
        };
        if !is_identifier(name) || name.contains('.') {
            return Err(anyhow!("Invalid variable name: {}", name));
        }

        let store = match scope {
            Scope::Global => &mut self.globals,
            Scope::Local => {
                let index = self.current();
                &mut self.flowcharts[index].variables
            }
        };
        if let Some(element) = element {
            let items = parse_list_literal(literal, Some(element))?;
            store.declare_list(name, element, items)?;
            return Ok(());
        }

        let value = parse_literal(literal, kind)?;
        if let Some(kind) = kind.filter(|k| *k != value.kind()) {
            return Err(anyhow!(
                "Variable `{}` is declared {} but initialised with a {} value",
                name,
                kind,
                value.kind()
            ));
        }
        if matches!(&value, Value::List(items) if items.is_empty()) {
            return Err(anyhow!(
                "Cannot infer the element kind of `{}`, declare it as `{}: list<kind> = []`",
                name,
                name
            ));
        }
        store.declare(name, value)?;
        Ok(())
    }

    /// Dispatch a step line to the matching step's parser.
    ///
    /// To add a new step, add one entry to [`REGISTRY`] using the step's
    /// `NAME` constant and `parse_boxed` function pointer.
    fn add_step(&mut self, name: &str, args: &str) -> Result<()> {
        let parse = REGISTRY
            .iter()
            .find(|(step_name, _)| *step_name == name)
            .map(|(_, parse)| *parse)
            .ok_or_else(|| anyhow!("Unknown step: {}", name))?;

        let index = self.current();
        let sequence = match &self.sequence {
            Some(sequence) => sequence.clone(),
            None => {
                let flowchart = &mut self.flowcharts[index];
                if flowchart.sequence(DEFAULT_NAME).is_err() {
                    flowchart.add_sequence(Sequence::new(DEFAULT_NAME))?;
                }
                self.sequence = Some(DEFAULT_NAME.to_string());
                DEFAULT_NAME.to_string()
            }
        };

        let step = parse(args, &self.flowcharts[index].scope(&self.globals))?;
        self.flowcharts[index].add_step(&sequence, step)?;
        Ok(())
    }
}

/// Strip inline comments from a line, preserving `#` inside quoted strings.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if ch == '#' && !in_quotes {
            return line[..i].trim();
        }
    }
    line
}

/// Split off the first whitespace-separated word; both parts are trimmed.
pub(crate) fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

/// A variable name, optionally prefixed with `global.`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let name = s.strip_prefix("global.").unwrap_or(s);
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a duration string: `1s`, `500ms`, `1.5s`.
pub(crate) fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if let Some(ms_str) = s.strip_suffix("ms") {
        let ms: u64 = ms_str
            .trim()
            .parse()
            .context("Invalid milliseconds value")?;
        Ok(Duration::from_millis(ms))
    } else if let Some(s_str) = s.strip_suffix('s') {
        let secs: f64 = s_str.trim().parse().context("Invalid seconds value")?;
        Duration::try_from_secs_f64(secs).context("Invalid seconds value")
    } else {
        Err(anyhow!("Duration must end with 's' or 'ms', got: {}", s))
    }
}

/// Parse a double-quoted string, processing `\n`, `\t`, `\"`, and `\\`.
pub(crate) fn parse_quoted_string(s: &str) -> Result<String> {
    let s = s.trim();
    if !s.starts_with('"') {
        return Err(anyhow!("Expected string to start with '\"'"));
    }
    if s.len() < 2 || !s.ends_with('"') {
        return Err(anyhow!("Expected string to end with '\"'"));
    }
    Ok(s[1..s.len() - 1]
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\"))
}

/// Parse a literal value.
///
/// `true`/`false`, integers, floats, `"strings"`, `(x, y)` and `(x, y, z)`
/// vectors, `rgba(r, g, b[, a])` colors, `@handle` or `none` objects and
/// `[a, b, ...]` lists. An integer literal becomes a float when `hint`
/// asks for one.
pub(crate) fn parse_literal(text: &str, hint: Option<ValueKind>) -> Result<Value> {
    let text = text.trim();
    let value = match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "none" => Value::Object(None),
        _ if text.starts_with('"') => Value::String(parse_quoted_string(text)?),
        _ if text.starts_with('@') => {
            let handle = &text[1..];
            if !is_identifier(handle) {
                return Err(anyhow!("Invalid object handle: {}", text));
            }
            Value::Object(Some(handle.to_string()))
        }
        _ if text.starts_with('[') => Value::List(parse_list_literal(text, None)?),
        _ if text.starts_with("rgba(") => match parse_numbers(text, "rgba(")?[..] {
            [r, g, b, a] => Value::Color(Color::rgba(r, g, b, a)),
            [r, g, b] => Value::Color(Color::rgba(r, g, b, 1.0)),
            _ => return Err(anyhow!("A color needs 3 or 4 components: {}", text)),
        },
        _ if text.starts_with('(') => match parse_numbers(text, "(")?[..] {
            [x, y] => Value::Vector2(Vec2::new(x, y)),
            [x, y, z] => Value::Vector3(Vec3::new(x, y, z)),
            _ => return Err(anyhow!("A vector needs 2 or 3 components: {}", text)),
        },
        _ => match text.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::Float(
                text.parse()
                    .with_context(|| format!("Invalid literal: {}", text))?,
            ),
        },
    };
    Ok(match (value, hint) {
        (Value::Integer(i), Some(ValueKind::Float)) => Value::Float(i as f64),
        (value, _) => value,
    })
}

/// Parse a `[a, b, ...]` literal whose elements share one kind.
///
/// Elements take the kind of `element` when given, otherwise the kind of
/// the first element. Integers widen to floats when the list is a float
/// list or mixes the two.
pub(crate) fn parse_list_literal(text: &str, element: Option<ValueKind>) -> Result<Vec<Value>> {
    let text = text.trim();
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| anyhow!("Expected a list literal: {}", text))?;
    let mut items = split_top_level(inner)
        .into_iter()
        .map(|item| parse_literal(item, element))
        .collect::<Result<Vec<_>>>()?;

    let widen = element == Some(ValueKind::Float)
        || (element.is_none()
            && items.iter().any(|v| v.kind() == ValueKind::Float)
            && items
                .iter()
                .all(|v| matches!(v.kind(), ValueKind::Float | ValueKind::Integer)));
    if widen {
        for item in &mut items {
            if let Value::Integer(i) = *item {
                *item = Value::Float(i as f64);
            }
        }
    }

    if let Some(expected) = element.or_else(|| items.first().map(Value::kind)) {
        if let Some(other) = items.iter().find(|v| v.kind() != expected) {
            return Err(anyhow!(
                "List elements must all be {} values, found {} value {}",
                expected,
                other.kind(),
                other
            ));
        }
    }
    Ok(items)
}

/// `kind` or `list<kind>`.
fn parse_kind(text: &str) -> Result<(ValueKind, Option<ValueKind>)> {
    let text = text.trim();
    if let Some(element) = text
        .strip_prefix("list<")
        .and_then(|rest| rest.strip_suffix('>'))
    {
        let element: ValueKind = element.trim().parse().map_err(|e: String| anyhow!(e))?;
        return Ok((ValueKind::List, Some(element)));
    }
    let kind: ValueKind = text.parse().map_err(|e: String| anyhow!(e))?;
    Ok((kind, None))
}

/// Parse a list operand for a list variable holding `element` values: a
/// list variable with the same element kind, or a list literal.
pub(crate) fn parse_list_operand(
    text: &str,
    element: Option<ValueKind>,
    scope: &AuthoringScope<'_>,
) -> Result<Binding<Value>> {
    let text = text.trim();
    if is_identifier(text) {
        let (_, found) = scope.resolve_list(text)?;
        if element.is_some() && found != element {
            return Err(anyhow!(
                "`{}` holds {} values, expected {} values",
                text,
                found.map_or("untyped", ValueKind::as_str),
                element.map_or("untyped", ValueKind::as_str)
            ));
        }
        return Ok(scope.bind_kind(text, ValueKind::List)?);
    }
    let items = parse_list_literal(text, element)?;
    Ok(Binding::literal(Value::List(items)))
}

/// Parse an operand for a variable of `kind`: a variable name (bound and
/// kind-checked) or a literal of that kind.
pub(crate) fn parse_operand(
    text: &str,
    kind: ValueKind,
    scope: &AuthoringScope<'_>,
) -> Result<Binding<Value>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(anyhow!("Expected an operand"));
    }
    if is_identifier(text) && !matches!(text, "true" | "false" | "none") {
        return Ok(scope.bind_kind(text, kind)?);
    }
    let value = parse_literal(text, Some(kind))?;
    if value.kind() != kind {
        return Err(anyhow!(
            "Expected a {} operand, got {} value: {}",
            kind,
            value.kind(),
            text
        ));
    }
    Ok(Binding::literal(value))
}

fn parse_numbers(text: &str, prefix: &str) -> Result<Vec<f64>> {
    let inner = text
        .strip_prefix(prefix)
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| anyhow!("Unclosed parenthesis: {}", text))?;
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid number: {}", part.trim()))
        })
        .collect()
}

/// Split on commas that are not inside quotes, brackets or parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes => depth += 1,
            ']' | ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::SequenceId;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(
            parse_duration("1.5s").unwrap(),
            Duration::from_secs_f64(1.5)
        );
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_quoted_string() {
        assert_eq!(parse_quoted_string("\"hello\"").unwrap(), "hello");
        assert_eq!(
            parse_quoted_string("\"hello world\"").unwrap(),
            "hello world"
        );
        assert_eq!(
            parse_quoted_string("\"hello\\nworld\"").unwrap(),
            "hello\nworld"
        );
        assert!(parse_quoted_string("\"").is_err());
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("true", None).unwrap(), Value::Boolean(true));
        assert_eq!(parse_literal("-4", None).unwrap(), Value::Integer(-4));
        assert_eq!(parse_literal("4", Some(ValueKind::Float)).unwrap(), Value::Float(4.0));
        assert_eq!(parse_literal("0.5", None).unwrap(), Value::Float(0.5));
        assert_eq!(
            parse_literal("(1, 2.5)", None).unwrap(),
            Value::Vector2(Vec2::new(1.0, 2.5))
        );
        assert_eq!(
            parse_literal("rgba(1, 0, 0)", None).unwrap(),
            Value::Color(Color::rgba(1.0, 0.0, 0.0, 1.0))
        );
        assert_eq!(parse_literal("none", None).unwrap(), Value::Object(None));
        assert_eq!(
            parse_literal("@door", None).unwrap(),
            Value::Object(Some("door".into()))
        );
        assert_eq!(
            parse_literal(r#"["a, b", "c"]"#, None).unwrap(),
            Value::List(vec![Value::String("a, b".into()), Value::String("c".into())])
        );
        assert_eq!(
            parse_literal("[[2, 3], [4]]", None).unwrap(),
            Value::List(vec![
                Value::List(vec![Value::Integer(2), Value::Integer(3)]),
                Value::List(vec![Value::Integer(4)]),
            ])
        );
        assert_eq!(parse_literal("[]", None).unwrap(), Value::List(Vec::new()));
        assert!(parse_literal(r#"[1, "a"]"#, None).is_err());
        assert!(parse_literal("[1, 2", None).is_err());
        assert!(parse_literal("(1)", None).is_err());
        assert!(parse_literal("words", None).is_err());
    }

    #[test]
    fn test_parse_str() {
        let script = parse_str("var n = 0\nset n += 1\nwait 500ms\nlog \"n={$n}\"\n").unwrap();
        assert_eq!(script.flowcharts.len(), 1);
        let main = script.flowcharts[0].sequence(DEFAULT_NAME).unwrap();
        assert_eq!(main.len(), 3);
        assert_eq!(main.step(0).unwrap().name(), "set");
        assert_eq!(main.step(1).unwrap().name(), "wait");
        assert_eq!(main.step(2).unwrap().name(), "log");
    }

    #[test]
    fn test_parse_all_steps() {
        let script = parse_str(
            r#"
var n = 0
var cur = 0
var xs = [1, 2]
set n = 1
if n == 1
elseif n == 2
else
end
while n < 3
  break
end
foreach cur in [1, 2]
end
call other continue
wait 1s
log "x"
stop
await "go"
priority up
item cur = xs[0]
put xs[n] = cur
push xs 3
count n = xs
reset
sequence other
"#,
        )
        .unwrap();
        let names: Vec<_> = script.flowcharts[0]
            .sequence(DEFAULT_NAME)
            .unwrap()
            .steps()
            .map(|s| s.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "set", "if", "elseif", "else", "end", "while", "break", "end", "foreach", "end",
                "call", "wait", "log", "stop", "await", "priority", "item", "put", "push",
                "count", "reset"
            ]
        );
        assert!(script.diagnostics().is_empty());
    }

    #[test]
    fn test_directives() {
        let script = parse_str(
            r#"
global score: float = 3
flowchart intro
var name: string = "ada"   # the hero
sequence main pause 100ms
log "hi {$name}"
sequence outro
set global.score += 1
"#,
        )
        .unwrap();
        assert_eq!(
            script.globals.get("score").unwrap().value(),
            &Value::Float(3.0)
        );
        let intro = &script.flowcharts[0];
        assert_eq!(intro.name(), "intro");
        assert_eq!(
            intro.sequence("main").unwrap().step_delay(),
            Some(Duration::from_millis(100))
        );
        assert_eq!(intro.sequence("outro").unwrap().len(), 1);

        let engine = Engine::from(script);
        assert!(engine.sequence(&SequenceId::new("intro", "outro")).is_ok());
    }

    #[test]
    fn test_list_declarations() {
        let script = parse_str(
            "var speeds = [1.5, 2]
var names: list<string> = []
global ids: list<integer> = [4]
",
        )
        .unwrap();
        let locals = script.flowcharts[0].variables();
        let speeds = locals.get("speeds").unwrap();
        assert_eq!(
            speeds.value(),
            &Value::List(vec![Value::Float(1.5), Value::Float(2.0)])
        );
        assert_eq!(speeds.element_kind(), Some(ValueKind::Float));
        assert_eq!(
            locals.get("names").unwrap().element_kind(),
            Some(ValueKind::String)
        );
        assert_eq!(
            script.globals.get("ids").unwrap().element_kind(),
            Some(ValueKind::Integer)
        );

        assert!(parse_str("var xs = []").is_err());
        assert!(parse_str("var xs = [1, \"a\"]").is_err());
        assert!(parse_str("var xs: list<integer> = [1.5]").is_err());
        assert!(parse_str("var xs: list<float> = [1, 2]").is_ok());
        assert!(parse_str("var xs: list<thing> = []").is_err());
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = parse_str("var n = 0\nset n += \"x\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));

        assert!(parse_str("jump 3").is_err());
        assert!(parse_str("var n: integer = 1.5").is_err());
        assert!(parse_str("var n: number = 1").is_err());
        assert!(parse_str("var n = 1\nvar n = 2").is_err());
        assert!(parse_str("flowchart a\nflowchart a").is_err());
        assert!(parse_str("sequence s\nsequence s").is_err());
        assert!(parse_str("sequence s slowly").is_err());
        assert!(parse_str("log \"{$x}\"\nset missing = 1").is_err());
    }

    #[test]
    fn test_unpaired_blocks_are_diagnostics_not_errors() {
        let script = parse_str("var n = 0\nif n == 0\nset n = 1\n").unwrap();
        let problems = script.diagnostics();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("never closed"));
    }
}
