//! Value-or-reference parameter cells.
//!
//! A [`Binding<T>`] holds a literal and, optionally, a reference to a
//! variable. While the reference is set it wins for both reads and writes
//! and the literal is ignored. The kind check happens once, when the
//! binding is created against an [`AuthoringScope`]; reads and writes at
//! run time never fail on kind.

use crate::error::{Error, Result};
use crate::value::{Color, Value, ValueKind, Vec2, Vec3};
use crate::variable::{Scope, VarRef, VariableStore, Vars};
use tracing::warn;

/// A Rust type that can be stored in, and read back from, a [`Value`].
pub trait BindingValue: Clone {
    /// Whether a variable of `kind` can back a binding of this type.
    fn admits(kind: ValueKind) -> bool;
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

macro_rules! binding_value {
    ($ty:ty, $variant:ident) => {
        impl BindingValue for $ty {
            fn admits(kind: ValueKind) -> bool {
                kind == ValueKind::$variant
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

binding_value!(bool, Boolean);
binding_value!(i64, Integer);
binding_value!(f64, Float);
binding_value!(String, String);
binding_value!(Vec2, Vector2);
binding_value!(Vec3, Vector3);
binding_value!(Color, Color);
binding_value!(Option<String>, Object);
binding_value!(Vec<Value>, List);

/// Dynamically typed binding. Callers that need a specific kind check it
/// when authoring (see [`AuthoringScope::bind_kind`]).
impl BindingValue for Value {
    fn admits(_kind: ValueKind) -> bool {
        true
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn into_value(self) -> Value {
        self
    }
}

/// A literal, or a live reference to a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    reference: Option<VarRef>,
    literal: T,
}

impl<T: BindingValue> Binding<T> {
    pub fn literal(value: T) -> Self {
        Self {
            reference: None,
            literal: value,
        }
    }

    /// Bind to `reference`, whose variable was declared with `declared`.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `T` cannot hold a `declared` value.
    pub fn bind(reference: VarRef, declared: ValueKind, fallback: T) -> Result<Self> {
        if !T::admits(declared) {
            let expected = fallback.clone().into_value().kind();
            return Err(Error::TypeMismatch {
                key: reference.key,
                expected,
                found: declared,
            });
        }
        Ok(Self {
            reference: Some(reference),
            literal: fallback,
        })
    }

    pub fn reference(&self) -> Option<&VarRef> {
        self.reference.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.reference.is_some()
    }

    pub fn references(&self, var: &VarRef) -> bool {
        self.reference.as_ref() == Some(var)
    }

    /// Read through the reference, or return the literal.
    ///
    /// A reference that no longer resolves falls back to the literal.
    pub fn get(&self, vars: &Vars<'_>) -> T {
        let Some(var) = &self.reference else {
            return self.literal.clone();
        };
        match vars.value(var) {
            Ok(value) => T::from_value(value).unwrap_or_else(|| self.literal.clone()),
            Err(err) => {
                warn!(%err, binding = %var, "binding lookup failed, using literal");
                self.literal.clone()
            }
        }
    }

    /// Write through the reference, or replace the literal.
    pub fn set(&mut self, vars: &mut Vars<'_>, value: T) -> Result<()> {
        let Some(var) = &self.reference else {
            self.literal = value;
            return Ok(());
        };
        match vars.assign(var, value.into_value()) {
            Err(Error::Lookup(key)) => {
                warn!(key = %key, "binding target missing, write dropped");
                Ok(())
            }
            other => other,
        }
    }

    /// Short text for summaries: the variable name, or the literal.
    pub fn describe(&self) -> String {
        match &self.reference {
            Some(var) => var.to_string(),
            None => match self.literal.clone().into_value() {
                Value::String(s) => format!("{s:?}"),
                other => other.to_string(),
            },
        }
    }
}

impl<T: BindingValue> From<T> for Binding<T> {
    fn from(value: T) -> Self {
        Binding::literal(value)
    }
}

/// The declarations a step can bind against while it is being authored.
#[derive(Clone, Copy)]
pub struct AuthoringScope<'a> {
    locals: &'a VariableStore,
    globals: &'a VariableStore,
}

impl<'a> AuthoringScope<'a> {
    pub fn new(locals: &'a VariableStore, globals: &'a VariableStore) -> Self {
        Self { locals, globals }
    }

    /// Resolve a variable name. `global.key` forces the global scope;
    /// a bare key looks in the locals first.
    pub fn resolve(&self, name: &str) -> Result<(VarRef, ValueKind)> {
        if let Some(key) = name.strip_prefix("global.") {
            let variable = self.globals.get(key)?;
            return Ok((VarRef::global(key), variable.kind()));
        }
        if let Ok(variable) = self.locals.get(name) {
            return Ok((VarRef::local(name), variable.kind()));
        }
        let variable = self.globals.get(name)?;
        Ok((
            VarRef {
                scope: Scope::Global,
                key: name.to_string(),
            },
            variable.kind(),
        ))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Create a type-checked binding to the variable called `name`.
    pub fn bind<T: BindingValue>(&self, name: &str, fallback: T) -> Result<Binding<T>> {
        let (var, kind) = self.resolve(name)?;
        Binding::bind(var, kind, fallback)
    }

    /// Resolve a list variable and the kind of its elements.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] if `name` is not a list.
    pub fn resolve_list(&self, name: &str) -> Result<(VarRef, Option<ValueKind>)> {
        let (var, kind) = self.resolve(name)?;
        if kind != ValueKind::List {
            return Err(Error::TypeMismatch {
                key: var.key,
                expected: ValueKind::List,
                found: kind,
            });
        }
        let store = match var.scope {
            Scope::Local => self.locals,
            Scope::Global => self.globals,
        };
        let element = store.get(&var.key)?.element_kind();
        Ok((var, element))
    }

    /// Create a dynamically typed binding that must hold `expected` values.
    pub fn bind_kind(&self, name: &str, expected: ValueKind) -> Result<Binding<Value>> {
        let (var, kind) = self.resolve(name)?;
        if kind != expected {
            return Err(Error::TypeMismatch {
                key: var.key,
                expected,
                found: kind,
            });
        }
        Binding::bind(var, kind, Value::default_for(kind))
    }
}
