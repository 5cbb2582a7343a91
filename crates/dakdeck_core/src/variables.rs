//! Deck variables
//!
//! Each variable is one input dimension of the study. The four kinds are
//! separate structs gathered in the closed [`Variable`] enum; the deck keeps
//! one container per kind and renders each kind as its own sub-block.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DeckError, Result};
use crate::format::{self, Fields};
use crate::validate::{Bound, Interval};

/// Characters that would break descriptor quoting in the deck
pub const FORBIDDEN_KEY_CHARS: [char; 4] = [' ', '\'', '"', ','];

/// Checks a variable or function descriptor
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(DeckError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty".to_string(),
        });
    }
    if let Some(c) = key.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c)) {
        return Err(DeckError::InvalidKey {
            key: key.to_string(),
            reason: format!("key must not contain {c:?}"),
        });
    }
    Ok(())
}

/// String values are written as one quoted token and may not close it early
fn validate_value(key: &str, value: &Value) -> Result<()> {
    let Value::String(s) = value else {
        return Ok(());
    };
    match s.chars().find(|c| matches!(c, '"' | '\n' | '\r')) {
        Some(c) => Err(DeckError::InvalidValue {
            key: key.to_string(),
            value: s.clone(),
            reason: format!("string value must not contain {c:?}"),
        }),
        None => Ok(()),
    }
}

/// Data type of a variable's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float,
    Integer,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Float => write!(f, "float"),
            DataType::Integer => write!(f, "int"),
            DataType::String => write!(f, "str"),
        }
    }
}

/// A variable's representative value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn dtype(&self) -> DataType {
        match self {
            Value::Float(_) => DataType::Float,
            Value::Integer(_) => DataType::Integer,
            Value::String(_) => DataType::String,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Display form used in variable rows
    fn field(&self) -> String {
        match self {
            Value::Float(x) => format::number(*x),
            Value::Integer(i) => format::integer(*i),
            Value::String(s) => format::quoted(s),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

fn expect_float(key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| DeckError::TypeMismatch {
        key: key.to_string(),
        expected: DataType::Float,
        found: value.dtype(),
    })
}

/// The kinds of variable, in the order their blocks appear in the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    State,
    NormalUncertain,
    UniformUncertain,
    Design,
}

impl VariableKind {
    pub const ORDER: [VariableKind; 4] = [
        VariableKind::State,
        VariableKind::NormalUncertain,
        VariableKind::UniformUncertain,
        VariableKind::Design,
    ];

    /// Header keyword of the kind's sub-block
    pub fn block_name(self) -> &'static str {
        match self {
            VariableKind::State => "discrete_state_set",
            VariableKind::NormalUncertain => "normal_uncertain",
            VariableKind::UniformUncertain => "uniform_uncertain",
            VariableKind::Design => "continuous_design",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A fixed nominal value, listed under the discrete state set
#[derive(Debug, Clone, PartialEq)]
pub struct StateVariable {
    key: String,
    dtype: DataType,
    value: Value,
}

impl StateVariable {
    /// Fails with `TypeMismatch` if `value` is not of type `dtype`, and with
    /// `InvalidValue` for strings holding a double quote or a line break
    pub fn new(key: impl Into<String>, dtype: DataType, value: impl Into<Value>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        if value.dtype() != dtype {
            return Err(DeckError::TypeMismatch {
                key,
                expected: dtype,
                found: value.dtype(),
            });
        }
        validate_value(&key, &value)?;
        Ok(Self { key, dtype, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if value.dtype() != self.dtype {
            return Err(DeckError::TypeMismatch {
                key: self.key.clone(),
                expected: self.dtype,
                found: value.dtype(),
            });
        }
        validate_value(&self.key, &value)?;
        self.value = value;
        Ok(())
    }

    pub fn format_fields(&self) -> Fields {
        vec![
            ("descriptors", format::quoted(&self.key)),
            ("elements_per_variable", format::integer(1)),
            ("elements", self.value.field()),
        ]
    }
}

/// Normally distributed uncertain variable
#[derive(Debug, Clone, PartialEq)]
pub struct NormalUncertainVariable {
    key: String,
    mean: f64,
    std_deviation: f64,
}

impl NormalUncertainVariable {
    pub fn new(key: impl Into<String>, mean: f64, std_deviation: f64) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            mean: Interval::ANY.check("mean", mean)?,
            std_deviation: Interval::POSITIVE.check("std_deviation", std_deviation)?,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_deviation(&self) -> f64 {
        self.std_deviation
    }

    pub fn set_mean(&mut self, mean: f64) -> Result<()> {
        self.mean = Interval::ANY.check("mean", mean)?;
        Ok(())
    }

    pub fn set_std_deviation(&mut self, std_deviation: f64) -> Result<()> {
        self.std_deviation = Interval::POSITIVE.check("std_deviation", std_deviation)?;
        Ok(())
    }

    pub fn format_fields(&self) -> Fields {
        vec![
            ("descriptors", format::quoted(&self.key)),
            ("means", format::number(self.mean)),
            ("std_deviations", format::number(self.std_deviation)),
        ]
    }
}

/// Uniformly distributed uncertain variable; its value is the midpoint
#[derive(Debug, Clone, PartialEq)]
pub struct UniformUncertainVariable {
    key: String,
    lower_bound: f64,
    upper_bound: f64,
    value: f64,
}

impl UniformUncertainVariable {
    /// Fails with `OutOfRange` unless `lower_bound < upper_bound`
    pub fn new(key: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Result<Self> {
        let mut variable = Self {
            key: key.into(),
            lower_bound: 0.0,
            upper_bound: 0.0,
            value: 0.0,
        };
        variable.set_bounds(lower_bound, upper_bound)?;
        Ok(variable)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_lower_bound(&mut self, lower_bound: f64) -> Result<()> {
        self.set_bounds(lower_bound, self.upper_bound)
    }

    pub fn set_upper_bound(&mut self, upper_bound: f64) -> Result<()> {
        self.set_bounds(self.lower_bound, upper_bound)
    }

    /// Replaces both bounds at once; nothing changes on error
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) -> Result<()> {
        Interval::ANY.check("lower_bound", lower_bound)?;
        Interval::ANY.check("upper_bound", upper_bound)?;
        Interval::above(lower_bound).check("upper_bound", upper_bound)?;
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        self.recenter();
        Ok(())
    }

    /// Moves the interval so it is centred on `value`, keeping its width
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        Interval::ANY.check("value", value)?;
        let half_width = 0.5 * (self.upper_bound - self.lower_bound);
        self.set_bounds(value - half_width, value + half_width)
    }

    fn recenter(&mut self) {
        self.value = 0.5 * (self.lower_bound + self.upper_bound);
    }

    pub fn format_fields(&self) -> Fields {
        vec![
            ("descriptors", format::quoted(&self.key)),
            ("lower_bounds", format::number(self.lower_bound)),
            ("upper_bounds", format::number(self.upper_bound)),
        ]
    }
}

/// Design variable explored by optimizers
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVariable {
    key: String,
    lower_bound: f64,
    upper_bound: f64,
    initial_point: f64,
}

impl DesignVariable {
    /// Requires `lower_bound < initial_point <= upper_bound`
    pub fn new(
        key: impl Into<String>,
        lower_bound: f64,
        upper_bound: f64,
        initial_point: f64,
    ) -> Result<Self> {
        Interval::ANY.check("lower_bound", lower_bound)?;
        Interval::above(lower_bound).check("upper_bound", upper_bound)?;
        let initial_point =
            initial_interval(lower_bound, upper_bound).check("initial_point", initial_point)?;
        Ok(Self {
            key: key.into(),
            lower_bound,
            upper_bound,
            initial_point,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn initial_point(&self) -> f64 {
        self.initial_point
    }

    pub fn set_initial_point(&mut self, initial_point: f64) -> Result<()> {
        self.initial_point = initial_interval(self.lower_bound, self.upper_bound)
            .check("initial_point", initial_point)?;
        Ok(())
    }

    /// The current initial point must stay inside the new bounds
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) -> Result<()> {
        Interval::ANY.check("lower_bound", lower_bound)?;
        Interval::above(lower_bound).check("upper_bound", upper_bound)?;
        initial_interval(lower_bound, upper_bound).check("initial_point", self.initial_point)?;
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        Ok(())
    }

    pub fn format_fields(&self) -> Fields {
        vec![
            ("descriptors", format::quoted(&self.key)),
            ("initial_point", format::number(self.initial_point)),
            ("lower_bounds", format::number(self.lower_bound)),
            ("upper_bounds", format::number(self.upper_bound)),
        ]
    }
}

fn initial_interval(lower: f64, upper: f64) -> Interval {
    Interval::new(Bound::Open(lower), Bound::Closed(upper))
}

/// Any variable a deck can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    State(StateVariable),
    NormalUncertain(NormalUncertainVariable),
    UniformUncertain(UniformUncertainVariable),
    Design(DesignVariable),
}

impl Variable {
    pub fn key(&self) -> &str {
        match self {
            Variable::State(v) => v.key(),
            Variable::NormalUncertain(v) => v.key(),
            Variable::UniformUncertain(v) => v.key(),
            Variable::Design(v) => v.key(),
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Variable::State(_) => VariableKind::State,
            Variable::NormalUncertain(_) => VariableKind::NormalUncertain,
            Variable::UniformUncertain(_) => VariableKind::UniformUncertain,
            Variable::Design(_) => VariableKind::Design,
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Variable::State(v) => v.dtype(),
            _ => DataType::Float,
        }
    }

    /// Current representative value
    pub fn value(&self) -> Value {
        match self {
            Variable::State(v) => v.value().clone(),
            Variable::NormalUncertain(v) => Value::Float(v.mean()),
            Variable::UniformUncertain(v) => Value::Float(v.value()),
            Variable::Design(v) => Value::Float(v.initial_point()),
        }
    }

    /// Type-checked assignment of the representative value.
    ///
    /// Normal variables take it as the mean, uniform variables re-centre
    /// their bounds on it and design variables take it as the initial point.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self {
            Variable::State(v) => v.set_value(value),
            Variable::NormalUncertain(v) => {
                let mean = expect_float(v.key(), &value)?;
                v.set_mean(mean)
            }
            Variable::UniformUncertain(v) => {
                let midpoint = expect_float(v.key(), &value)?;
                v.set_value(midpoint)
            }
            Variable::Design(v) => {
                let initial_point = expect_float(v.key(), &value)?;
                v.set_initial_point(initial_point)
            }
        }
    }

    pub fn format_fields(&self) -> Fields {
        match self {
            Variable::State(v) => v.format_fields(),
            Variable::NormalUncertain(v) => v.format_fields(),
            Variable::UniformUncertain(v) => v.format_fields(),
            Variable::Design(v) => v.format_fields(),
        }
    }

    /// [`Variable::format_fields`], left-justified to a common width
    pub fn justified_fields(&self) -> Fields {
        let mut fields = self.format_fields();
        format::justify(&mut fields);
        fields
    }

    pub fn as_state(&self) -> Option<&StateVariable> {
        match self {
            Variable::State(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_normal(&self) -> Option<&NormalUncertainVariable> {
        match self {
            Variable::NormalUncertain(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uniform(&self) -> Option<&UniformUncertainVariable> {
        match self {
            Variable::UniformUncertain(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_design(&self) -> Option<&DesignVariable> {
        match self {
            Variable::Design(v) => Some(v),
            _ => None,
        }
    }
}

impl From<StateVariable> for Variable {
    fn from(v: StateVariable) -> Self {
        Variable::State(v)
    }
}

impl From<NormalUncertainVariable> for Variable {
    fn from(v: NormalUncertainVariable) -> Self {
        Variable::NormalUncertain(v)
    }
}

impl From<UniformUncertainVariable> for Variable {
    fn from(v: UniformUncertainVariable) -> Self {
        Variable::UniformUncertain(v)
    }
}

impl From<DesignVariable> for Variable {
    fn from(v: DesignVariable) -> Self {
        Variable::Design(v)
    }
}
