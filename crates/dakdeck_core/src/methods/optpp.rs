use std::fmt;

use super::{write_opt, write_opt_float};
use crate::error::{DeckError, Result};
use crate::validate::{Interval, Keyword, keyword_enum, positive_count};

keyword_enum! {
    /// Globalization strategy of the Newton-family solvers
    pub enum SearchMethod as "search_method" {
        ValueBasedLineSearch => "value_based_line_search",
        GradientBasedLineSearch => "gradient_based_line_search",
        TrustRegion => "trust_region",
        TrPds => "tr_pds",
    }
}

keyword_enum! {
    /// Merit function of the interior-point Newton solvers
    pub enum MeritFunction as "merit_function" {
        ElBakry => "el_bakry",
        ArgaezTapia => "argaez_tapia",
        VanShanno => "van_shanno",
    }
}

/// Member of the OPT++ family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptPpKind {
    /// Parallel direct search
    Pds,
    /// Conjugate gradient
    Cg,
    /// Full Newton
    Newton,
    /// Quasi-Newton
    QNewton,
    /// Finite-difference Newton
    FdNewton,
}

impl OptPpKind {
    pub fn keyword(self) -> &'static str {
        match self {
            OptPpKind::Pds => "optpp_pds",
            OptPpKind::Cg => "optpp_cg",
            OptPpKind::Newton => "optpp_newton",
            OptPpKind::QNewton => "optpp_q_newton",
            OptPpKind::FdNewton => "optpp_fd_newton",
        }
    }

    pub fn requires_gradients(self) -> bool {
        self != OptPpKind::Pds
    }

    pub fn requires_hessians(self) -> bool {
        self == OptPpKind::Newton
    }

    pub fn is_newton_family(self) -> bool {
        matches!(
            self,
            OptPpKind::Newton | OptPpKind::QNewton | OptPpKind::FdNewton
        )
    }
}

/// OPT++ optimizer; fields a member does not accept are rejected when set
#[derive(Debug, Clone, PartialEq)]
pub struct OptPp {
    kind: OptPpKind,
    search_scheme_size: Option<u32>,
    search_method: Option<SearchMethod>,
    merit_function: Option<MeritFunction>,
    steplength_to_boundary: Option<f64>,
    centering_parameter: Option<f64>,
    max_step: Option<f64>,
    gradient_tolerance: Option<f64>,
}

impl OptPp {
    #[must_use]
    pub fn new(kind: OptPpKind) -> Self {
        Self {
            kind,
            search_scheme_size: None,
            search_method: None,
            merit_function: None,
            steplength_to_boundary: None,
            centering_parameter: None,
            max_step: None,
            gradient_tolerance: None,
        }
    }

    #[must_use]
    pub fn pds() -> Self {
        Self::new(OptPpKind::Pds)
    }

    #[must_use]
    pub fn cg() -> Self {
        Self::new(OptPpKind::Cg)
    }

    #[must_use]
    pub fn newton() -> Self {
        Self::new(OptPpKind::Newton)
    }

    #[must_use]
    pub fn q_newton() -> Self {
        Self::new(OptPpKind::QNewton)
    }

    #[must_use]
    pub fn fd_newton() -> Self {
        Self::new(OptPpKind::FdNewton)
    }

    pub fn kind(&self) -> OptPpKind {
        self.kind
    }

    fn require_newton(&self, attribute: &'static str) -> Result<()> {
        if self.kind.is_newton_family() {
            Ok(())
        } else {
            Err(DeckError::prerequisite(
                attribute,
                "optpp_newton, optpp_q_newton or optpp_fd_newton",
            ))
        }
    }

    fn require_gradient_based(&self, attribute: &'static str) -> Result<()> {
        if self.kind == OptPpKind::Pds {
            Err(DeckError::prerequisite(attribute, "a gradient-based OPT++ method"))
        } else {
            Ok(())
        }
    }

    /// Number of points in the PDS search pattern
    pub fn search_scheme_size(mut self, n: u32) -> Result<Self> {
        if self.kind != OptPpKind::Pds {
            return Err(DeckError::prerequisite("search_scheme_size", "optpp_pds"));
        }
        self.search_scheme_size = Some(positive_count("search_scheme_size", n)?);
        Ok(self)
    }

    pub fn search_method(mut self, method: SearchMethod) -> Result<Self> {
        self.require_newton(SearchMethod::ATTRIBUTE)?;
        self.search_method = Some(method);
        Ok(self)
    }

    pub fn merit_function(mut self, merit: MeritFunction) -> Result<Self> {
        self.require_newton(MeritFunction::ATTRIBUTE)?;
        self.merit_function = Some(merit);
        Ok(self)
    }

    /// Fraction of the distance to the boundary a step may cover, in (0, 1)
    pub fn steplength_to_boundary(mut self, fraction: f64) -> Result<Self> {
        self.require_newton("steplength_to_boundary")?;
        self.steplength_to_boundary =
            Some(Interval::UNIT_OPEN.check("steplength_to_boundary", fraction)?);
        Ok(self)
    }

    pub fn centering_parameter(mut self, sigma: f64) -> Result<Self> {
        self.require_newton("centering_parameter")?;
        self.centering_parameter = Some(Interval::UNIT.check("centering_parameter", sigma)?);
        Ok(self)
    }

    pub fn max_step(mut self, step: f64) -> Result<Self> {
        self.require_gradient_based("max_step")?;
        self.max_step = Some(Interval::POSITIVE.check("max_step", step)?);
        Ok(self)
    }

    pub fn gradient_tolerance(mut self, tolerance: f64) -> Result<Self> {
        self.require_gradient_based("gradient_tolerance")?;
        self.gradient_tolerance = Some(Interval::POSITIVE.check("gradient_tolerance", tolerance)?);
        Ok(self)
    }

    pub(super) fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt(f, "search_scheme_size", self.search_scheme_size)?;
        write_opt(f, SearchMethod::ATTRIBUTE, self.search_method)?;
        write_opt(f, MeritFunction::ATTRIBUTE, self.merit_function)?;
        write_opt_float(f, "steplength_to_boundary", self.steplength_to_boundary)?;
        write_opt_float(f, "centering_parameter", self.centering_parameter)?;
        write_opt_float(f, "max_step", self.max_step)?;
        write_opt_float(f, "gradient_tolerance", self.gradient_tolerance)
    }
}
