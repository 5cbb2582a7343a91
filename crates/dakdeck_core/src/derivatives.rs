//! Gradient and Hessian directives for the responses block
//!
//! A `none` type renders as the solver's explicit `no_gradients` /
//! `no_hessians` line. Every other type renders a header line followed by
//! the optional sub-items that were set. Conditional fields are validated
//! when they are set.

use std::fmt;

use crate::error::{DeckError, Result};
use crate::format;
use crate::validate::{Interval, Keyword, keyword_enum};

keyword_enum! {
    /// How first derivatives are obtained
    pub enum GradientType as "gradient_type" {
        None => "none" | "no",
        Numerical => "numerical",
        Analytic => "analytic",
        Mixed => "mixed",
    }
}

keyword_enum! {
    /// How second derivatives are obtained
    pub enum HessianType as "hessian_type" {
        None => "none" | "no",
        Numerical => "numerical",
        Analytic => "analytic",
        Mixed => "mixed",
        Quasi => "quasi",
    }
}

keyword_enum! {
    /// Who computes finite differences
    pub enum MethodSource as "method_source" {
        Dakota => "dakota",
        Vendor => "vendor",
    }
}

keyword_enum! {
    /// Finite-difference stencil
    pub enum IntervalType as "interval_type" {
        Central => "central",
        Forward => "forward",
    }
}

keyword_enum! {
    /// Quasi-Newton Hessian update
    pub enum QuasiApproximation as "quasi_approximation" {
        Bfgs => "bfgs",
        Sr1 => "sr1",
    }
}

keyword_enum! {
    /// How Hessian finite-difference steps are scaled
    pub enum StepScaling as "step_scaling" {
        Relative => "relative",
        Absolute => "absolute",
        Bounds => "bounds",
    }
}

/// Prefix of the header keyword; `none` is spelled `no` by the solver
fn type_prefix<K: Keyword>(kind: K) -> &'static str {
    match kind.as_str() {
        "none" => "no",
        other => other,
    }
}

fn step_sizes(steps: Vec<f64>) -> Result<Vec<f64>> {
    for step in &steps {
        Interval::POSITIVE.check("fd_step_size", *step)?;
    }
    Ok(steps)
}

/// Response indices are 1-based
fn response_ids(attribute: &'static str, ids: Vec<u32>) -> Result<Vec<u32>> {
    for id in &ids {
        Interval::at_least(1.0).check_count(attribute, *id)?;
    }
    Ok(ids)
}

fn write_ids(f: &mut fmt::Formatter<'_>, key: &str, ids: &[u32]) -> fmt::Result {
    if ids.is_empty() {
        return Ok(());
    }
    writeln!(f, "\t\t{key} {}", format::join(ids))
}

fn write_steps(f: &mut fmt::Formatter<'_>, key: &str, steps: &[f64]) -> fmt::Result {
    if steps.is_empty() {
        return Ok(());
    }
    let steps: Vec<String> = steps.iter().map(|s| format::float(*s)).collect();
    writeln!(f, "\t\t{key} {}", steps.join(" "))
}

/// First-derivative settings
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    gradient_type: GradientType,
    method_source: Option<MethodSource>,
    interval_type: Option<IntervalType>,
    fd_step_size: Vec<f64>,
    id_numerical: Vec<u32>,
    id_analytic: Vec<u32>,
}

impl Gradients {
    #[must_use]
    pub fn new(gradient_type: GradientType) -> Self {
        Self {
            gradient_type,
            method_source: None,
            interval_type: None,
            fd_step_size: Vec::new(),
            id_numerical: Vec::new(),
            id_analytic: Vec::new(),
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::new(GradientType::None)
    }

    #[must_use]
    pub fn numerical() -> Self {
        Self::new(GradientType::Numerical)
    }

    #[must_use]
    pub fn analytic() -> Self {
        Self::new(GradientType::Analytic)
    }

    #[must_use]
    pub fn mixed() -> Self {
        Self::new(GradientType::Mixed)
    }

    pub fn gradient_type(&self) -> GradientType {
        self.gradient_type
    }

    /// Whether any derivative information will be supplied
    pub fn is_provided(&self) -> bool {
        self.gradient_type != GradientType::None
    }

    fn require_finite_differences(&self, attribute: &'static str) -> Result<()> {
        match self.gradient_type {
            GradientType::Numerical | GradientType::Mixed => Ok(()),
            _ => Err(DeckError::prerequisite(
                attribute,
                "gradient_type = numerical or mixed",
            )),
        }
    }

    fn require_mixed(&self, attribute: &'static str) -> Result<()> {
        match self.gradient_type {
            GradientType::Mixed => Ok(()),
            _ => Err(DeckError::prerequisite(attribute, "gradient_type = mixed")),
        }
    }

    pub fn method_source(mut self, source: MethodSource) -> Result<Self> {
        self.require_finite_differences(MethodSource::ATTRIBUTE)?;
        self.method_source = Some(source);
        Ok(self)
    }

    pub fn interval_type(mut self, interval: IntervalType) -> Result<Self> {
        self.require_finite_differences(IntervalType::ATTRIBUTE)?;
        self.interval_type = Some(interval);
        Ok(self)
    }

    pub fn fd_step_size(mut self, steps: Vec<f64>) -> Result<Self> {
        self.require_finite_differences("fd_gradient_step_size")?;
        self.fd_step_size = step_sizes(steps)?;
        Ok(self)
    }

    pub fn id_numerical(mut self, ids: Vec<u32>) -> Result<Self> {
        self.require_mixed("id_numerical_gradients")?;
        self.id_numerical = response_ids("id_numerical_gradients", ids)?;
        Ok(self)
    }

    pub fn id_analytic(mut self, ids: Vec<u32>) -> Result<Self> {
        self.require_mixed("id_analytic_gradients")?;
        self.id_analytic = response_ids("id_analytic_gradients", ids)?;
        Ok(self)
    }
}

impl fmt::Display for Gradients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t{}_gradients", type_prefix(self.gradient_type))?;
        if !self.is_provided() {
            return Ok(());
        }
        write_ids(f, "id_analytic_gradients", &self.id_analytic)?;
        write_ids(f, "id_numerical_gradients", &self.id_numerical)?;
        if let Some(source) = self.method_source {
            writeln!(f, "\t\tmethod_source {source}")?;
        }
        if let Some(interval) = self.interval_type {
            writeln!(f, "\t\tinterval_type {interval}")?;
        }
        write_steps(f, "fd_gradient_step_size", &self.fd_step_size)
    }
}

/// Second-derivative settings
#[derive(Debug, Clone, PartialEq)]
pub struct Hessians {
    hessian_type: HessianType,
    interval_type: Option<IntervalType>,
    step_scaling: Option<StepScaling>,
    quasi_approximation: Option<QuasiApproximation>,
    fd_step_size: Vec<f64>,
    id_numerical: Vec<u32>,
    id_analytic: Vec<u32>,
    id_quasi: Vec<u32>,
    damped: bool,
}

impl Hessians {
    /// Validating constructor for keyword-driven callers.
    ///
    /// `quasi` needs an approximation; every other type must not carry
    /// one (mixed Hessians attach theirs through [`Hessians::id_quasi`]).
    pub fn new(
        hessian_type: HessianType,
        quasi_approximation: Option<QuasiApproximation>,
    ) -> Result<Self> {
        match (hessian_type, quasi_approximation) {
            (HessianType::Quasi, Some(approximation)) => Ok(Self::quasi(approximation)),
            (HessianType::Quasi, None) => Err(DeckError::prerequisite(
                "hessian_type = quasi",
                "a quasi_approximation",
            )),
            (_, Some(_)) => Err(DeckError::prerequisite(
                QuasiApproximation::ATTRIBUTE,
                "hessian_type = quasi or mixed Hessians with id_quasi_hessians",
            )),
            (kind, None) => Ok(Self::bare(kind)),
        }
    }

    fn bare(hessian_type: HessianType) -> Self {
        Self {
            hessian_type,
            interval_type: None,
            step_scaling: None,
            quasi_approximation: None,
            fd_step_size: Vec::new(),
            id_numerical: Vec::new(),
            id_analytic: Vec::new(),
            id_quasi: Vec::new(),
            damped: false,
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::bare(HessianType::None)
    }

    #[must_use]
    pub fn numerical() -> Self {
        Self::bare(HessianType::Numerical)
    }

    #[must_use]
    pub fn analytic() -> Self {
        Self::bare(HessianType::Analytic)
    }

    #[must_use]
    pub fn mixed() -> Self {
        Self::bare(HessianType::Mixed)
    }

    #[must_use]
    pub fn quasi(approximation: QuasiApproximation) -> Self {
        Self {
            quasi_approximation: Some(approximation),
            ..Self::bare(HessianType::Quasi)
        }
    }

    pub fn hessian_type(&self) -> HessianType {
        self.hessian_type
    }

    pub fn is_provided(&self) -> bool {
        self.hessian_type != HessianType::None
    }

    pub fn quasi_approximation_kind(&self) -> Option<QuasiApproximation> {
        self.quasi_approximation
    }

    pub fn is_damped(&self) -> bool {
        self.damped
    }

    fn require_finite_differences(&self, attribute: &'static str) -> Result<()> {
        match self.hessian_type {
            HessianType::Numerical | HessianType::Mixed => Ok(()),
            _ => Err(DeckError::prerequisite(
                attribute,
                "hessian_type = numerical or mixed",
            )),
        }
    }

    fn require_mixed(&self, attribute: &'static str) -> Result<()> {
        match self.hessian_type {
            HessianType::Mixed => Ok(()),
            _ => Err(DeckError::prerequisite(attribute, "hessian_type = mixed")),
        }
    }

    pub fn interval_type(mut self, interval: IntervalType) -> Result<Self> {
        self.require_finite_differences(IntervalType::ATTRIBUTE)?;
        self.interval_type = Some(interval);
        Ok(self)
    }

    pub fn step_scaling(mut self, scaling: StepScaling) -> Result<Self> {
        self.require_finite_differences(StepScaling::ATTRIBUTE)?;
        self.step_scaling = Some(scaling);
        Ok(self)
    }

    pub fn fd_step_size(mut self, steps: Vec<f64>) -> Result<Self> {
        self.require_finite_differences("fd_hessian_step_size")?;
        self.fd_step_size = step_sizes(steps)?;
        Ok(self)
    }

    pub fn id_numerical(mut self, ids: Vec<u32>) -> Result<Self> {
        self.require_mixed("id_numerical_hessians")?;
        self.id_numerical = response_ids("id_numerical_hessians", ids)?;
        Ok(self)
    }

    pub fn id_analytic(mut self, ids: Vec<u32>) -> Result<Self> {
        self.require_mixed("id_analytic_hessians")?;
        self.id_analytic = response_ids("id_analytic_hessians", ids)?;
        Ok(self)
    }

    /// Quasi-Newton ids always come with their approximation
    pub fn id_quasi(mut self, ids: Vec<u32>, approximation: QuasiApproximation) -> Result<Self> {
        self.require_mixed("id_quasi_hessians")?;
        if ids.is_empty() {
            return Err(DeckError::prerequisite(
                QuasiApproximation::ATTRIBUTE,
                "a non-empty id_quasi_hessians list",
            ));
        }
        self.id_quasi = response_ids("id_quasi_hessians", ids)?;
        self.quasi_approximation = Some(approximation);
        if approximation != QuasiApproximation::Bfgs {
            self.damped = false;
        }
        Ok(self)
    }

    /// Replaces the approximation of quasi or mixed-with-quasi-ids Hessians
    pub fn quasi_approximation(mut self, approximation: QuasiApproximation) -> Result<Self> {
        let quasi_selected = self.hessian_type == HessianType::Quasi
            || (self.hessian_type == HessianType::Mixed && !self.id_quasi.is_empty());
        if !quasi_selected {
            return Err(DeckError::prerequisite(
                QuasiApproximation::ATTRIBUTE,
                "hessian_type = quasi or mixed Hessians with id_quasi_hessians",
            ));
        }
        self.quasi_approximation = Some(approximation);
        if approximation != QuasiApproximation::Bfgs {
            self.damped = false;
        }
        Ok(self)
    }

    pub fn damped(mut self, damped: bool) -> Result<Self> {
        if damped && self.quasi_approximation != Some(QuasiApproximation::Bfgs) {
            return Err(DeckError::prerequisite("damped", "quasi_approximation = bfgs"));
        }
        self.damped = damped;
        Ok(self)
    }

    fn approximation_suffix(&self) -> String {
        let Some(approximation) = self.quasi_approximation else {
            return String::new();
        };
        if self.damped {
            format!(" {approximation} damped")
        } else {
            format!(" {approximation}")
        }
    }
}

impl fmt::Display for Hessians {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_provided() {
            return writeln!(f, "\t{}_hessians", type_prefix(self.hessian_type));
        }
        if self.hessian_type == HessianType::Quasi && self.id_quasi.is_empty() {
            writeln!(f, "\tquasi_hessians{}", self.approximation_suffix())?;
        } else {
            writeln!(f, "\t{}_hessians", type_prefix(self.hessian_type))?;
        }
        write_ids(f, "id_analytic_hessians", &self.id_analytic)?;
        write_ids(f, "id_numerical_hessians", &self.id_numerical)?;
        if !self.id_quasi.is_empty() {
            writeln!(
                f,
                "\t\tid_quasi_hessians {}{}",
                format::join(&self.id_quasi),
                self.approximation_suffix()
            )?;
        }
        if let Some(scaling) = self.step_scaling {
            writeln!(f, "\t\t{scaling}")?;
        }
        if let Some(interval) = self.interval_type {
            writeln!(f, "\t\t{interval}")?;
        }
        write_steps(f, "fd_hessian_step_size", &self.fd_step_size)
    }
}
