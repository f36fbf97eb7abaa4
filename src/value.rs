//! The closed family of value kinds a variable can hold.
//!
//! Every kind lives in one [`Value`] sum type; adding a kind means adding a
//! variant and extending the exhaustive matches in [`Value::apply`] and
//! [`Value::evaluate`]. Each kind declares the operators it supports through
//! [`ValueKind::set_operators`] and [`ValueKind::compare_operators`]; any
//! other operator is an [`Error::UnsupportedOperation`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            a: 1.0,
        }
    }
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Color {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add for Color {
    type Output = Color;
    fn add(self, rhs: Color) -> Color {
        Color::rgba(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b, self.a + rhs.a)
    }
}

impl Sub for Color {
    type Output = Color;
    fn sub(self, rhs: Color) -> Color {
        Color::rgba(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b, self.a - rhs.a)
    }
}

impl Mul for Color {
    type Output = Color;
    fn mul(self, rhs: Color) -> Color {
        Color::rgba(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }
}

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
    Vector2,
    Vector3,
    Color,
    Object,
    List,
}

impl ValueKind {
    pub const ALL: [ValueKind; 9] = [
        ValueKind::Boolean,
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Vector2,
        ValueKind::Vector3,
        ValueKind::Color,
        ValueKind::Object,
        ValueKind::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Vector2 => "vector2",
            ValueKind::Vector3 => "vector3",
            ValueKind::Color => "color",
            ValueKind::Object => "object",
            ValueKind::List => "list",
        }
    }

    /// Set operators this kind accepts in [`Value::apply`].
    pub fn set_operators(self) -> &'static [SetOperator] {
        use SetOperator as Op;
        match self {
            ValueKind::Boolean => &[Op::Assign, Op::Negate],
            ValueKind::Integer | ValueKind::Float => &[
                Op::Assign,
                Op::Add,
                Op::Subtract,
                Op::Multiply,
                Op::Divide,
            ],
            ValueKind::Vector2 | ValueKind::Vector3 => &[Op::Assign, Op::Add, Op::Subtract],
            ValueKind::Color => &[Op::Assign, Op::Add, Op::Subtract, Op::Multiply],
            ValueKind::String | ValueKind::Object | ValueKind::List => &[Op::Assign],
        }
    }

    /// Comparison operators this kind accepts in [`Value::evaluate`].
    pub fn compare_operators(self) -> &'static [CompareOperator] {
        use CompareOperator as Cmp;
        match self {
            ValueKind::Integer | ValueKind::Float => &[
                Cmp::Equals,
                Cmp::NotEquals,
                Cmp::LessThan,
                Cmp::GreaterThan,
                Cmp::LessThanOrEquals,
                Cmp::GreaterThanOrEquals,
            ],
            _ => &[Cmp::Equals, Cmp::NotEquals],
        }
    }

    pub fn supports_set(self, op: SetOperator) -> bool {
        self.set_operators().contains(&op)
    }

    pub fn supports_compare(self, op: CompareOperator) -> bool {
        self.compare_operators().contains(&op)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ValueKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown variable type: {s}"))
    }
}

/// Arithmetic applied by a `set` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOperator {
    /// `=`
    Assign,
    /// `=!`
    Negate,
    /// `+=`
    Add,
    /// `-=`
    Subtract,
    /// `*=`
    Multiply,
    /// `/=`
    Divide,
}

impl SetOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            SetOperator::Assign => "=",
            SetOperator::Negate => "=!",
            SetOperator::Add => "+=",
            SetOperator::Subtract => "-=",
            SetOperator::Multiply => "*=",
            SetOperator::Divide => "/=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        [
            SetOperator::Assign,
            SetOperator::Negate,
            SetOperator::Add,
            SetOperator::Subtract,
            SetOperator::Multiply,
            SetOperator::Divide,
        ]
        .into_iter()
        .find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOperator {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
}

impl CompareOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Equals => "==",
            CompareOperator::NotEquals => "!=",
            CompareOperator::LessThan => "<",
            CompareOperator::GreaterThan => ">",
            CompareOperator::LessThanOrEquals => "<=",
            CompareOperator::GreaterThanOrEquals => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        [
            CompareOperator::Equals,
            CompareOperator::NotEquals,
            CompareOperator::LessThan,
            CompareOperator::GreaterThan,
            CompareOperator::LessThanOrEquals,
            CompareOperator::GreaterThanOrEquals,
        ]
        .into_iter()
        .find(|op| op.symbol() == symbol)
    }

    fn test<T: PartialOrd>(self, lhs: T, rhs: T) -> bool {
        match self {
            CompareOperator::Equals => lhs == rhs,
            CompareOperator::NotEquals => lhs != rhs,
            CompareOperator::LessThan => lhs < rhs,
            CompareOperator::GreaterThan => lhs > rhs,
            CompareOperator::LessThanOrEquals => lhs <= rhs,
            CompareOperator::GreaterThanOrEquals => lhs >= rhs,
        }
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A variable's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Vector2(Vec2),
    Vector3(Vec3),
    Color(Color),
    /// Opaque handle to something owned by the host, or nothing.
    Object(Option<String>),
    List(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Vector2(_) => ValueKind::Vector2,
            Value::Vector3(_) => ValueKind::Vector3,
            Value::Color(_) => ValueKind::Color,
            Value::Object(_) => ValueKind::Object,
            Value::List(_) => ValueKind::List,
        }
    }

    /// The zero value a freshly declared variable of `kind` starts with.
    pub fn default_for(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Boolean => Value::Boolean(false),
            ValueKind::Integer => Value::Integer(0),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::String => Value::String(String::new()),
            ValueKind::Vector2 => Value::Vector2(Vec2::default()),
            ValueKind::Vector3 => Value::Vector3(Vec3::default()),
            ValueKind::Color => Value::Color(Color::default()),
            ValueKind::Object => Value::Object(None),
            ValueKind::List => Value::List(Vec::new()),
        }
    }

    /// Compute `self <op> operand` and return the new value.
    ///
    /// # Errors
    ///
    /// [`Error::OperandMismatch`] when the operand kind differs,
    /// [`Error::UnsupportedOperation`] when the kind does not define `op`,
    /// [`Error::Arithmetic`] on integer overflow or division by zero.
    pub fn apply(&self, op: SetOperator, operand: &Value) -> Result<Value> {
        let kind = self.kind();
        if operand.kind() != kind {
            return Err(Error::OperandMismatch {
                expected: kind,
                found: operand.kind(),
            });
        }
        if !kind.supports_set(op) {
            return Err(unsupported(op.symbol(), kind));
        }
        if op == SetOperator::Assign {
            return Ok(operand.clone());
        }

        let result = match (self, operand) {
            (Value::Boolean(_), Value::Boolean(rhs)) => Value::Boolean(!rhs),
            (Value::Integer(lhs), Value::Integer(rhs)) => {
                Value::Integer(integer_arithmetic(op, *lhs, *rhs)?)
            }
            (Value::Float(lhs), Value::Float(rhs)) => Value::Float(match op {
                SetOperator::Add => lhs + rhs,
                SetOperator::Subtract => lhs - rhs,
                SetOperator::Multiply => lhs * rhs,
                SetOperator::Divide => lhs / rhs,
                _ => return Err(unsupported(op.symbol(), kind)),
            }),
            (Value::Vector2(lhs), Value::Vector2(rhs)) => Value::Vector2(match op {
                SetOperator::Add => *lhs + *rhs,
                SetOperator::Subtract => *lhs - *rhs,
                _ => return Err(unsupported(op.symbol(), kind)),
            }),
            (Value::Vector3(lhs), Value::Vector3(rhs)) => Value::Vector3(match op {
                SetOperator::Add => *lhs + *rhs,
                SetOperator::Subtract => *lhs - *rhs,
                _ => return Err(unsupported(op.symbol(), kind)),
            }),
            (Value::Color(lhs), Value::Color(rhs)) => Value::Color(match op {
                SetOperator::Add => *lhs + *rhs,
                SetOperator::Subtract => *lhs - *rhs,
                SetOperator::Multiply => *lhs * *rhs,
                _ => return Err(unsupported(op.symbol(), kind)),
            }),
            _ => return Err(unsupported(op.symbol(), kind)),
        };
        Ok(result)
    }

    /// Evaluate `self <op> operand`.
    pub fn evaluate(&self, op: CompareOperator, operand: &Value) -> Result<bool> {
        let kind = self.kind();
        if operand.kind() != kind {
            return Err(Error::OperandMismatch {
                expected: kind,
                found: operand.kind(),
            });
        }
        if !kind.supports_compare(op) {
            return Err(unsupported(op.symbol(), kind));
        }

        Ok(match (self, operand) {
            (Value::Integer(lhs), Value::Integer(rhs)) => op.test(lhs, rhs),
            (Value::Float(lhs), Value::Float(rhs)) => op.test(lhs, rhs),
            (lhs, rhs) => match op {
                CompareOperator::Equals => lhs == rhs,
                CompareOperator::NotEquals => lhs != rhs,
                _ => return Err(unsupported(op.symbol(), kind)),
            },
        })
    }

    /// Read element `index` of a list value.
    pub fn get_item(&self, index: i64) -> Result<&Value> {
        let items = self.as_list()?;
        let slot = checked_index(index, items.len())?;
        Ok(&items[slot])
    }

    /// Replace element `index` of a list value.
    pub fn set_item(&mut self, index: i64, item: Value) -> Result<()> {
        let items = self.as_list_mut()?;
        let slot = checked_index(index, items.len())?;
        items[slot] = item;
        Ok(())
    }

    pub fn push_item(&mut self, item: Value) -> Result<()> {
        self.as_list_mut()?.push(item);
        Ok(())
    }

    /// Number of elements of a list value.
    pub fn len(&self) -> Result<usize> {
        Ok(self.as_list()?.len())
    }

    fn as_list(&self) -> Result<&Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::OperandMismatch {
                expected: ValueKind::List,
                found: other.kind(),
            }),
        }
    }

    fn as_list_mut(&mut self) -> Result<&mut Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::OperandMismatch {
                expected: ValueKind::List,
                found: other.kind(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Value::Object(Some(name)) => write!(f, "@{name}"),
            Value::Object(None) => f.write_str("none"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "{s:?}")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

fn unsupported(operator: &str, kind: ValueKind) -> Error {
    Error::UnsupportedOperation {
        operator: operator.to_string(),
        kind,
    }
}

fn integer_arithmetic(op: SetOperator, lhs: i64, rhs: i64) -> Result<i64> {
    let result = match op {
        SetOperator::Add => lhs.checked_add(rhs),
        SetOperator::Subtract => lhs.checked_sub(rhs),
        SetOperator::Multiply => lhs.checked_mul(rhs),
        SetOperator::Divide => {
            if rhs == 0 {
                return Err(Error::Arithmetic("integer division by zero".to_string()));
            }
            lhs.checked_div(rhs)
        }
        _ => return Err(unsupported(op.symbol(), ValueKind::Integer)),
    };
    result.ok_or_else(|| Error::Arithmetic(format!("integer overflow: {lhs} {op} {rhs}")))
}

fn checked_index(index: i64, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|slot| *slot < len)
        .ok_or(Error::Index { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        let x = Value::Integer(7);
        assert_eq!(
            x.apply(SetOperator::Add, &Value::Integer(3)).unwrap(),
            Value::Integer(10)
        );
        assert_eq!(
            x.apply(SetOperator::Divide, &Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            x.apply(SetOperator::Assign, &Value::Integer(1)).unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn test_integer_division_by_zero() {
        let err = Value::Integer(1)
            .apply(SetOperator::Divide, &Value::Integer(0))
            .unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let err = Value::Integer(i64::MAX)
            .apply(SetOperator::Add, &Value::Integer(1))
            .unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));
    }

    #[test]
    fn test_boolean_negate_inverts_operand() {
        let flag = Value::Boolean(true);
        assert_eq!(
            flag.apply(SetOperator::Negate, &Value::Boolean(true)).unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn test_unsupported_operator() {
        let err = Value::String("a".into())
            .apply(SetOperator::Add, &Value::String("b".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperation {
                kind: ValueKind::String,
                ..
            }
        ));

        let err = Value::Integer(1)
            .apply(SetOperator::Negate, &Value::Integer(1))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_operand_kind_must_match() {
        let err = Value::Float(1.0)
            .apply(SetOperator::Add, &Value::Integer(1))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OperandMismatch {
                expected: ValueKind::Float,
                found: ValueKind::Integer
            }
        ));
    }

    #[test]
    fn test_vector_and_color_arithmetic() {
        let v = Value::Vector2(Vec2::new(1.0, 2.0));
        assert_eq!(
            v.apply(SetOperator::Subtract, &Value::Vector2(Vec2::new(1.0, 1.0)))
                .unwrap(),
            Value::Vector2(Vec2::new(0.0, 1.0))
        );
        assert!(
            v.apply(SetOperator::Multiply, &Value::Vector2(Vec2::new(2.0, 2.0)))
                .is_err()
        );

        let c = Value::Color(Color::rgba(0.5, 0.5, 1.0, 1.0));
        assert_eq!(
            c.apply(
                SetOperator::Multiply,
                &Value::Color(Color::rgba(0.5, 1.0, 0.0, 1.0))
            )
            .unwrap(),
            Value::Color(Color::rgba(0.25, 0.5, 0.0, 1.0))
        );
    }

    #[test]
    fn test_numeric_comparisons() {
        let x = Value::Float(2.5);
        assert!(
            x.evaluate(CompareOperator::GreaterThan, &Value::Float(1.0))
                .unwrap()
        );
        assert!(
            !x.evaluate(CompareOperator::LessThanOrEquals, &Value::Float(2.0))
                .unwrap()
        );
        assert!(
            Value::Integer(3)
                .evaluate(CompareOperator::Equals, &Value::Integer(3))
                .unwrap()
        );
    }

    #[test]
    fn test_ordering_unsupported_for_strings() {
        let err = Value::String("a".into())
            .evaluate(CompareOperator::LessThan, &Value::String("b".into()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation { .. }));
        assert!(
            Value::String("a".into())
                .evaluate(CompareOperator::NotEquals, &Value::String("b".into()))
                .unwrap()
        );
    }

    #[test]
    fn test_list_item_access() {
        let mut list = Value::List(vec![Value::Integer(10), Value::Integer(20)]);
        assert_eq!(list.get_item(1).unwrap(), &Value::Integer(20));
        list.set_item(0, Value::Integer(5)).unwrap();
        assert_eq!(list.get_item(0).unwrap(), &Value::Integer(5));
        assert!(matches!(
            list.get_item(2),
            Err(Error::Index { index: 2, len: 2 })
        ));
        assert!(matches!(
            list.set_item(-1, Value::Integer(0)),
            Err(Error::Index { index: -1, .. })
        ));
        list.push_item(Value::Integer(30)).unwrap();
        assert_eq!(list.len().unwrap(), 3);
    }

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in ValueKind::ALL {
            assert_eq!(kind.as_str().parse::<ValueKind>().unwrap(), kind);
        }
        assert!("decimal".parse::<ValueKind>().is_err());
    }

    #[test]
    fn test_display() {
        let list = Value::List(vec![Value::Integer(1), Value::String("a".into())]);
        assert_eq!(list.to_string(), "[1, \"a\"]");
        assert_eq!(Value::Object(None).to_string(), "none");
        assert_eq!(Value::Vector2(Vec2::new(1.0, 2.5)).to_string(), "(1, 2.5)");
    }
}
