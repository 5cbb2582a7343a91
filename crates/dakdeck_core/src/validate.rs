//! Parameter validation shared by variables, methods and derivative settings
//!
//! Numeric parameters are checked against an [`Interval`] with open or closed
//! ends. Keyword-valued parameters are closed enums implementing [`Keyword`];
//! they parse case-insensitively and can be further restricted to the subset
//! a particular method accepts.

use std::fmt;

use crate::error::{DeckError, Result};

/// One end of an [`Interval`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Unbounded,
    Open(f64),
    Closed(f64),
}

/// Range of legal values for a numeric parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: Bound,
    pub upper: Bound,
}

impl Interval {
    /// (-inf, inf); only rejects non-finite values
    pub const ANY: Interval = Interval::new(Bound::Unbounded, Bound::Unbounded);
    /// (0, inf)
    pub const POSITIVE: Interval = Interval::new(Bound::Open(0.0), Bound::Unbounded);
    /// [0, 1]
    pub const UNIT: Interval = Interval::new(Bound::Closed(0.0), Bound::Closed(1.0));
    /// (0, 1)
    pub const UNIT_OPEN: Interval = Interval::new(Bound::Open(0.0), Bound::Open(1.0));
    /// (0, 1]
    pub const UNIT_LEFT_OPEN: Interval = Interval::new(Bound::Open(0.0), Bound::Closed(1.0));

    pub const fn new(lower: Bound, upper: Bound) -> Self {
        Self { lower, upper }
    }

    /// (lower, inf)
    pub const fn above(lower: f64) -> Self {
        Self::new(Bound::Open(lower), Bound::Unbounded)
    }

    /// [lower, inf)
    pub const fn at_least(lower: f64) -> Self {
        Self::new(Bound::Closed(lower), Bound::Unbounded)
    }

    /// (-inf, upper)
    pub const fn below(upper: f64) -> Self {
        Self::new(Bound::Unbounded, Bound::Open(upper))
    }

    pub fn contains(&self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        let lower_ok = match self.lower {
            Bound::Unbounded => true,
            Bound::Open(lo) => x > lo,
            Bound::Closed(lo) => x >= lo,
        };
        let upper_ok = match self.upper {
            Bound::Unbounded => true,
            Bound::Open(hi) => x < hi,
            Bound::Closed(hi) => x <= hi,
        };
        lower_ok && upper_ok
    }

    /// Returns `value` unchanged if it lies inside the interval
    pub fn check(&self, attribute: &'static str, value: f64) -> Result<f64> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(DeckError::OutOfRange {
                attribute,
                value: value.to_string(),
                interval: *self,
            })
        }
    }

    /// Integer flavour of [`Interval::check`]
    pub fn check_count(&self, attribute: &'static str, value: u32) -> Result<u32> {
        if self.contains(f64::from(value)) {
            Ok(value)
        } else {
            Err(DeckError::OutOfRange {
                attribute,
                value: value.to_string(),
                interval: *self,
            })
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Bound::Unbounded => write!(f, "(-inf")?,
            Bound::Open(lo) => write!(f, "({lo}")?,
            Bound::Closed(lo) => write!(f, "[{lo}")?,
        }
        match self.upper {
            Bound::Unbounded => write!(f, ", inf)"),
            Bound::Open(hi) => write!(f, ", {hi})"),
            Bound::Closed(hi) => write!(f, ", {hi}]"),
        }
    }
}

/// Counts such as samples or population sizes must be positive
pub(crate) fn positive_count(attribute: &'static str, value: u32) -> Result<u32> {
    Interval::above(0.0).check_count(attribute, value)
}

/// A closed set of solver keywords
pub trait Keyword: Copy + PartialEq + fmt::Debug + 'static {
    /// Name of the attribute the keyword is assigned to
    const ATTRIBUTE: &'static str;
    /// Every member, in declaration order
    const ALL: &'static [Self];

    /// The keyword exactly as the solver spells it
    fn as_str(self) -> &'static str;

    /// Alternate spellings accepted when parsing
    fn aliases(self) -> &'static [&'static str] {
        &[]
    }

    /// Case-insensitive lookup against the full set
    fn parse_keyword(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized || k.aliases().contains(&normalized.as_str()))
            .ok_or_else(|| DeckError::InvalidEnumValue {
                attribute: Self::ATTRIBUTE,
                value: value.to_string(),
                allowed: Self::ALL.iter().map(|k| k.as_str()).collect(),
            })
    }
}

/// Restricts a keyword to the subset a particular method accepts
pub(crate) fn ensure_allowed<K: Keyword>(value: K, allowed: &[K]) -> Result<K> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(DeckError::InvalidEnumValue {
            attribute: K::ATTRIBUTE,
            value: value.as_str().to_string(),
            allowed: allowed.iter().map(|k| k.as_str()).collect(),
        })
    }
}

/// Declares a [`Keyword`] enum with `Display` and `FromStr`
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $attribute:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $keyword:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::validate::Keyword for $name {
            const ATTRIBUTE: &'static str = $attribute;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $keyword),+
                }
            }

            fn aliases(self) -> &'static [&'static str] {
                match self {
                    $($name::$variant => &[$($alias),*]),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::validate::Keyword::as_str(*self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::DeckError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                <$name as $crate::validate::Keyword>::parse_keyword(s)
            }
        }
    };
}

pub(crate) use keyword_enum;
