//! Deck assembly
//!
//! A [`Deck`] owns the variables, the method, the optional derivative
//! settings and the ordered response names of one study. Entities are
//! validated when they are created or changed; [`Deck::get_deck`] only adds
//! the cross-entity derivative check and then renders the text:
//!
//! ```text
//! <header>
//!
//! method ...
//!
//! interface ...
//!
//! variables ...
//!
//! responses ...
//! ```

use rustc_hash::FxHashMap;

use crate::derivatives::{Gradients, Hessians};
use crate::error::{DeckError, DerivativeOrder, Result};
use crate::format::{self, Fields};
use crate::methods::Method;
use crate::names;
use crate::validate::positive_count;
use crate::variables::{DataType, Value, Variable, VariableKind, validate_key};

/// Identifier of the single interface block
pub const INTERFACE_ID: &str = "DAKDECK_INTERFACE";

/// Ordered response names; a single name converts into a one-element list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionNames(Vec<String>);

impl FunctionNames {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for FunctionNames {
    fn from(name: &str) -> Self {
        FunctionNames(vec![name.to_string()])
    }
}

impl From<String> for FunctionNames {
    fn from(name: String) -> Self {
        FunctionNames(vec![name])
    }
}

impl From<Vec<String>> for FunctionNames {
    fn from(names: Vec<String>) -> Self {
        FunctionNames(names)
    }
}

impl From<Vec<&str>> for FunctionNames {
    fn from(names: Vec<&str>) -> Self {
        FunctionNames(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FunctionNames {
    fn from(names: [&str; N]) -> Self {
        FunctionNames(names.into_iter().map(str::to_string).collect())
    }
}

/// Where a key lives: which per-kind container and at which position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    kind: VariableKind,
    position: usize,
}

/// A registered variable, open for value and bound updates.
///
/// The entry itself cannot be replaced, so its key keeps matching the deck
/// index:
///
/// ```compile_fail
/// use dakdeck_core::{Deck, Method, NormalUncertainVariable, UniformUncertainVariable};
///
/// let mut deck = Deck::new(Method::monte_carlo(10, 1).unwrap(), "f").unwrap();
/// deck.add_variable(UniformUncertainVariable::new("u", 0.0, 1.0).unwrap()).unwrap();
/// *deck.get_mut("u").unwrap() = NormalUncertainVariable::new("n", 0.0, 1.0).unwrap().into();
/// ```
#[derive(Debug)]
pub struct VariableMut<'a> {
    variable: &'a mut Variable,
}

impl VariableMut<'_> {
    /// See [`Variable::set_value`]
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        self.variable.set_value(value)
    }

    /// Bounds of a uniform-uncertain or design variable
    pub fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) -> Result<()> {
        match &mut *self.variable {
            Variable::UniformUncertain(v) => v.set_bounds(lower_bound, upper_bound),
            Variable::Design(v) => v.set_bounds(lower_bound, upper_bound),
            _ => Err(DeckError::prerequisite(
                "bounds",
                "uniform uncertain or design variables",
            )),
        }
    }

    pub fn set_std_deviation(&mut self, std_deviation: f64) -> Result<()> {
        match &mut *self.variable {
            Variable::NormalUncertain(v) => v.set_std_deviation(std_deviation),
            _ => Err(DeckError::prerequisite(
                "std_deviation",
                "normal uncertain variables",
            )),
        }
    }
}

impl std::ops::Deref for VariableMut<'_> {
    type Target = Variable;

    fn deref(&self) -> &Variable {
        &*self.variable
    }
}

/// The complete configuration of one solver run
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    index: FxHashMap<String, Slot>,
    variables: [Vec<Variable>; 4],
    method: Method,
    gradients: Option<Gradients>,
    hessians: Option<Hessians>,
    functions: Vec<String>,
}

impl Deck {
    pub fn new(method: impl Into<Method>, functions: impl Into<FunctionNames>) -> Result<Self> {
        let mut deck = Self {
            index: FxHashMap::default(),
            variables: Default::default(),
            method: method.into(),
            gradients: None,
            hessians: None,
            functions: Vec::new(),
        };
        let functions = functions.into().into_inner();
        if functions.is_empty() {
            return Err(DeckError::prerequisite("functions", "at least one response name"));
        }
        for name in functions {
            deck.add_function(name)?;
        }
        Ok(deck)
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Registers a variable. Keys share one namespace across every kind; a
    /// rejected variable leaves the deck unchanged.
    pub fn add_variable(&mut self, variable: impl Into<Variable>) -> Result<()> {
        let variable = variable.into();
        let key = variable.key().to_string();
        validate_key(&key)?;
        if self.index.contains_key(&key) {
            return Err(DeckError::DuplicateKey {
                what: "variable",
                key,
            });
        }

        let kind = variable.kind();
        let container = &mut self.variables[kind.index()];
        let slot = Slot {
            kind,
            position: container.len(),
        };
        container.push(variable);
        tracing::debug!(key = %key, ?kind, "registered variable");
        self.index.insert(key, slot);
        Ok(())
    }

    /// Registers every variable in order, stopping at the first failure
    pub fn add_variables<V: Into<Variable>>(
        &mut self,
        variables: impl IntoIterator<Item = V>,
    ) -> Result<()> {
        for variable in variables {
            self.add_variable(variable)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Variable> {
        let slot = self.index.get(key)?;
        self.variables[slot.kind.index()].get(slot.position)
    }

    /// Mutable access for value and bound updates; the key and kind of the
    /// entry stay fixed
    pub fn get_mut(&mut self, key: &str) -> Option<VariableMut<'_>> {
        let slot = *self.index.get(key)?;
        let variable = self.variables[slot.kind.index()].get_mut(slot.position)?;
        Some(VariableMut { variable })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Variables of one kind, in insertion order
    pub fn variables_of(&self, kind: VariableKind) -> &[Variable] {
        &self.variables[kind.index()]
    }

    /// Every variable, grouped by kind in block order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.variables
            .iter()
            .flatten()
            .map(|variable| (variable.key(), variable))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // =========================================================================
    // Method, derivatives and responses
    // =========================================================================

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn set_method(&mut self, method: impl Into<Method>) {
        self.method = method.into();
    }

    pub fn gradients(&self) -> Option<&Gradients> {
        self.gradients.as_ref()
    }

    pub fn set_gradients(&mut self, gradients: Gradients) {
        self.gradients = Some(gradients);
    }

    pub fn clear_gradients(&mut self) {
        self.gradients = None;
    }

    pub fn hessians(&self) -> Option<&Hessians> {
        self.hessians.as_ref()
    }

    pub fn set_hessians(&mut self, hessians: Hessians) {
        self.hessians = Some(hessians);
    }

    pub fn clear_hessians(&mut self) {
        self.hessians = None;
    }

    /// Response names in the order the solver reports them
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn add_function(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_key(&name)?;
        if self.functions.contains(&name) {
            return Err(DeckError::DuplicateKey {
                what: "function",
                key: name,
            });
        }
        self.functions.push(name);
        Ok(())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Fails when the method needs derivative directives that are missing
    /// or explicitly `none`
    pub fn validate(&self) -> Result<()> {
        let method = self.method.id_method();
        if self.method.requires_gradients()
            && !self.gradients.as_ref().is_some_and(Gradients::is_provided)
        {
            return Err(DeckError::MissingDerivatives {
                method: method.to_string(),
                derivative: DerivativeOrder::Gradients,
            });
        }
        if self.method.requires_hessians()
            && !self.hessians.as_ref().is_some_and(Hessians::is_provided)
        {
            return Err(DeckError::MissingDerivatives {
                method: method.to_string(),
                derivative: DerivativeOrder::Hessians,
            });
        }
        Ok(())
    }

    /// Full deck text. `label` is the command line recorded in the header;
    /// `concurrency` must be positive and only takes effect together with
    /// `asynchronous`.
    pub fn get_deck(
        &self,
        label: Option<&str>,
        asynchronous: bool,
        concurrency: Option<u32>,
    ) -> Result<String> {
        self.validate()?;
        if let Some(n) = concurrency {
            positive_count("evaluation_concurrency", n)?;
        }
        let blocks = [
            self.render_header(label),
            format!("{}\n", self.method),
            self.render_interface(asynchronous, concurrency),
            self.render_variables(),
            self.render_responses(),
        ];
        tracing::debug!(
            variables = self.len(),
            functions = self.functions.len(),
            method = self.method.id_method(),
            "rendered deck"
        );
        Ok(blocks.join("\n"))
    }

    pub fn render_header(&self, label: Option<&str>) -> String {
        let mut out = format!(
            "# Dakota input deck\n# Generated by dakdeck {}\n",
            env!("CARGO_PKG_VERSION")
        );
        if let Some(label) = label {
            out.push_str(&format!("# Usage:\n#   {label}\n"));
        }
        out
    }

    pub fn render_interface(&self, asynchronous: bool, concurrency: Option<u32>) -> String {
        let mut out = format!(
            "interface\n\
             \tid_interface = {}\n\
             \tanalysis_drivers = {}\n\
             \t\tfork\n\
             \t\tparameters_file = {}\n\
             \t\tresults_file = {}\n",
            format::quoted(INTERFACE_ID),
            format::quoted(names::DRIVER_SCRIPT),
            format::quoted(names::PARAMS_FILE),
            format::quoted(names::RESULTS_FILE),
        );
        if asynchronous {
            out.push_str("\tasynchronous\n");
            if let Some(n) = concurrency {
                out.push_str(&format!("\t\tevaluation_concurrency = {n}\n"));
            }
        } else if let Some(n) = concurrency {
            tracing::warn!(
                concurrency = n,
                "evaluation_concurrency ignored without asynchronous evaluation"
            );
        }
        out
    }

    pub fn render_variables(&self) -> String {
        let mut out = String::from("variables\n");
        for kind in VariableKind::ORDER {
            let variables = self.variables_of(kind);
            if variables.is_empty() {
                continue;
            }
            match kind {
                VariableKind::State => render_state_block(&mut out, variables),
                VariableKind::Design if !self.method.uses_design_variables() => {
                    tracing::debug!(
                        count = variables.len(),
                        "design variables skipped for a sampling method"
                    );
                }
                _ => {
                    out.push_str(&format!("\n\t{}  {}\n", kind.block_name(), variables.len()));
                    let columns: Vec<Fields> =
                        variables.iter().map(Variable::justified_fields).collect();
                    format::write_rows(&mut out, "\t\t", &columns);
                }
            }
        }
        out
    }

    pub fn render_responses(&self) -> String {
        let mut out = String::from("responses\n");
        let fields: Fields = vec![
            ("objective_functions", self.functions.len().to_string()),
            ("descriptors", self.functions.join(" ")),
        ];
        format::write_rows(&mut out, "\t", &[fields]);
        let gradients = self.gradients.clone().unwrap_or_else(Gradients::none);
        let hessians = self.hessians.clone().unwrap_or_else(Hessians::none);
        out.push_str(&gradients.to_string());
        out.push_str(&hessians.to_string());
        out
    }
}

/// State variables are grouped by data type below a single
/// `discrete_state_set` header, one sub-block per type
fn render_state_block(out: &mut String, variables: &[Variable]) {
    out.push_str(&format!("\n\t{}\n", VariableKind::State.block_name()));
    let groups = [
        (DataType::Integer, "integer"),
        (DataType::String, "string"),
        (DataType::Float, "real"),
    ];
    for (dtype, set_name) in groups {
        let columns: Vec<Fields> = variables
            .iter()
            .filter(|v| v.dtype() == dtype)
            .map(Variable::justified_fields)
            .collect();
        if columns.is_empty() {
            continue;
        }
        out.push_str(&format!("\t\t{set_name}  {}\n", columns.len()));
        format::write_rows(out, "\t\t\t", &columns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::NormalUncertainVariable;

    #[test]
    fn test_function_names_from_single_string() {
        let names: FunctionNames = "f".into();
        assert_eq!(names.into_inner(), vec!["f".to_string()]);
    }

    #[test]
    fn test_get_resolves_through_index() {
        let mut deck = Deck::new(Method::monte_carlo(10, 1).unwrap(), "f").unwrap();
        deck.add_variable(NormalUncertainVariable::new("a", 0.0, 1.0).unwrap())
            .unwrap();
        deck.add_variable(NormalUncertainVariable::new("b", 2.0, 1.0).unwrap())
            .unwrap();
        assert_eq!(deck.get("b").unwrap().key(), "b");
        assert!(deck.get("c").is_none());
        assert_eq!(deck.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
