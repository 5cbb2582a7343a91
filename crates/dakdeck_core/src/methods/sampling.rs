use std::fmt;

use super::write_param;
use crate::error::{DeckError, Result};
use crate::format;
use crate::validate::{Bound, Interval, keyword_enum, positive_count};

keyword_enum! {
    /// Sampling design
    pub enum SampleType as "sample_type" {
        Random => "random" | "monte_carlo",
        Lhs => "lhs" | "latin_hypercube",
    }
}

/// Sampling study (Monte Carlo or Latin hypercube)
#[derive(Debug, Clone, PartialEq)]
pub struct Sampling {
    pub(super) id_method: String,
    sample_type: SampleType,
    samples: u32,
    seed: u64,
    refinements: Vec<u32>,
}

impl Sampling {
    pub const DEFAULT_ID: &'static str = "UQ";

    pub fn new(sample_type: SampleType, samples: u32, seed: u64) -> Result<Self> {
        Ok(Self {
            id_method: Self::DEFAULT_ID.to_string(),
            sample_type,
            samples: positive_count("samples", samples)?,
            seed,
            refinements: Vec::new(),
        })
    }

    pub fn monte_carlo(samples: u32, seed: u64) -> Result<Self> {
        Self::new(SampleType::Random, samples, seed)
    }

    pub fn latin_hypercube(samples: u32, seed: u64) -> Result<Self> {
        Self::new(SampleType::Lhs, samples, seed)
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn refinements(&self) -> &[u32] {
        &self.refinements
    }

    /// Sample count the next refinement takes when none is given.
    ///
    /// Latin hypercube refinements double the previous batch (the first one
    /// repeats the initial count); Monte Carlo repeats the previous batch.
    /// Fails with `OutOfRange` once the doubled batch no longer fits a `u32`.
    pub fn next_refinement(&self) -> Result<u32> {
        let previous = self.refinements.last().copied();
        match (self.sample_type, previous) {
            (SampleType::Lhs, Some(last)) => {
                last.checked_mul(2).ok_or_else(|| DeckError::OutOfRange {
                    attribute: "refinement_samples",
                    value: (u64::from(last) * 2).to_string(),
                    interval: Interval::new(Bound::Open(0.0), Bound::Closed(f64::from(u32::MAX))),
                })
            }
            (_, Some(last)) => Ok(last),
            (_, None) => Ok(self.samples),
        }
    }

    /// Appends a refinement batch and returns its sample count.
    ///
    /// For Latin hypercube sampling an explicit count must equal
    /// [`Sampling::next_refinement`], otherwise the incremental design cannot
    /// reuse the earlier samples.
    pub fn add_refinement(&mut self, samples: Option<u32>) -> Result<u32> {
        let expected = self.next_refinement()?;
        let samples = match samples {
            None => expected,
            Some(given) => positive_count("refinement_samples", given)?,
        };
        if self.sample_type == SampleType::Lhs && samples != expected {
            return Err(DeckError::RefinementSequence {
                expected,
                given: samples,
            });
        }
        self.refinements.push(samples);
        tracing::debug!(
            id_method = %self.id_method,
            samples,
            "added refinement batch"
        );
        Ok(samples)
    }

    pub(super) fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n\tsampling")?;
        write_param(f, "sample_type", self.sample_type)?;
        write_param(f, "seed", self.seed)?;
        write_param(f, "samples", self.samples)?;
        if !self.refinements.is_empty() {
            write_param(f, "refinement_samples", format::join(&self.refinements))?;
        }
        Ok(())
    }
}
