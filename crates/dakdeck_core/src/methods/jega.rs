//! Genetic algorithms (single- and multi-objective)
//!
//! SOGA and MOGA share the population, initialization, crossover and
//! mutation settings held in [`Jega`]; the builder methods for those live on
//! the [`GeneticAlgorithm`] trait so both variants expose them identically.
//! Fitness, replacement and convergence keywords come from one pool, and
//! each variant accepts only its own subset.

use std::fmt;

use super::{write_opt, write_opt_float, write_param};
use crate::error::{DeckError, Result};
use crate::format;
use crate::validate::{Interval, Keyword, ensure_allowed, keyword_enum, positive_count};

keyword_enum! {
    pub enum InitializationType as "initialization_type" {
        SimpleRandom => "simple_random",
        UniqueRandom => "unique_random",
        FlatFile => "flat_file",
    }
}

keyword_enum! {
    pub enum CrossoverType as "crossover_type" {
        MultiPointBinary => "multi_point_binary",
        MultiPointParameterizedBinary => "multi_point_parameterized_binary",
        MultiPointReal => "multi_point_real",
        ShuffleRandom => "shuffle_random",
    }
}

keyword_enum! {
    pub enum MutationType as "mutation_type" {
        BitRandom => "bit_random",
        ReplaceUniform => "replace_uniform",
        OffsetNormal => "offset_normal",
        OffsetCauchy => "offset_cauchy",
        OffsetUniform => "offset_uniform",
    }
}

keyword_enum! {
    pub enum FitnessType as "fitness_type" {
        MeritFunction => "merit_function",
        ConstraintPenalty => "constraint_penalty",
        LayerRank => "layer_rank",
        DominationCount => "domination_count",
    }
}

keyword_enum! {
    pub enum ReplacementType as "replacement_type" {
        Elitist => "elitist",
        FavorFeasible => "favor_feasible",
        RouletteWheel => "roulette_wheel",
        UniqueRouletteWheel => "unique_roulette_wheel",
        BelowLimit => "below_limit",
    }
}

keyword_enum! {
    pub enum ConvergenceType as "convergence_type" {
        BestFitnessTracker => "best_fitness_tracker",
        AverageFitnessTracker => "average_fitness_tracker",
        MetricTracker => "metric_tracker",
    }
}

impl CrossoverType {
    fn is_multi_point(self) -> bool {
        self != CrossoverType::ShuffleRandom
    }
}

impl MutationType {
    fn is_offset(self) -> bool {
        matches!(
            self,
            MutationType::OffsetNormal | MutationType::OffsetCauchy | MutationType::OffsetUniform
        )
    }
}

const SOGA_FITNESS: &[FitnessType] = &[FitnessType::MeritFunction, FitnessType::ConstraintPenalty];
const SOGA_REPLACEMENT: &[ReplacementType] = &[
    ReplacementType::Elitist,
    ReplacementType::FavorFeasible,
    ReplacementType::RouletteWheel,
    ReplacementType::UniqueRouletteWheel,
];
const SOGA_CONVERGENCE: &[ConvergenceType] = &[
    ConvergenceType::BestFitnessTracker,
    ConvergenceType::AverageFitnessTracker,
];

const MOGA_FITNESS: &[FitnessType] = &[FitnessType::LayerRank, FitnessType::DominationCount];
const MOGA_REPLACEMENT: &[ReplacementType] = &[
    ReplacementType::Elitist,
    ReplacementType::RouletteWheel,
    ReplacementType::UniqueRouletteWheel,
    ReplacementType::BelowLimit,
];
const MOGA_CONVERGENCE: &[ConvergenceType] = &[ConvergenceType::MetricTracker];

/// Settings shared by every genetic algorithm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Jega {
    population_size: Option<u32>,
    seed: Option<u64>,
    initialization_type: Option<InitializationType>,
    flat_file: Option<String>,
    crossover_type: Option<CrossoverType>,
    num_crossover_points: Option<u32>,
    num_parents: Option<u32>,
    num_offspring: Option<u32>,
    crossover_rate: Option<f64>,
    mutation_type: Option<MutationType>,
    mutation_scale: Option<f64>,
    mutation_rate: Option<f64>,
}

impl Jega {
    pub fn initialization(&self) -> Option<InitializationType> {
        self.initialization_type
    }

    pub fn flat_file(&self) -> Option<&str> {
        self.flat_file.as_deref()
    }

    pub fn crossover(&self) -> Option<CrossoverType> {
        self.crossover_type
    }

    pub fn mutation(&self) -> Option<MutationType> {
        self.mutation_type
    }

    fn set_initialization_type(&mut self, kind: InitializationType) -> Result<()> {
        if kind == InitializationType::FlatFile {
            if self.flat_file.is_none() {
                return Err(DeckError::prerequisite(
                    "initialization_type = flat_file",
                    "a flat file path",
                ));
            }
        } else {
            self.flat_file = None;
        }
        self.initialization_type = Some(kind);
        Ok(())
    }

    fn set_flat_file(&mut self, path: String) -> Result<()> {
        if path.is_empty() || path.contains('"') {
            return Err(DeckError::InvalidKey {
                key: path,
                reason: "flat file path must be non-empty and must not contain '\"'".to_string(),
            });
        }
        self.flat_file = Some(path);
        self.initialization_type = Some(InitializationType::FlatFile);
        Ok(())
    }

    fn set_crossover_type(&mut self, kind: CrossoverType) {
        if kind.is_multi_point() {
            self.num_parents = None;
            self.num_offspring = None;
        } else {
            self.num_crossover_points = None;
        }
        self.crossover_type = Some(kind);
    }

    fn require_crossover(&self, attribute: &'static str, shuffle: bool) -> Result<()> {
        match self.crossover_type {
            Some(kind) if kind.is_multi_point() != shuffle => Ok(()),
            _ if shuffle => Err(DeckError::prerequisite(
                attribute,
                "crossover_type = shuffle_random",
            )),
            _ => Err(DeckError::prerequisite(
                attribute,
                "crossover_type = multi_point_*",
            )),
        }
    }

    fn set_mutation_type(&mut self, kind: MutationType) {
        if !kind.is_offset() {
            self.mutation_scale = None;
        }
        self.mutation_type = Some(kind);
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt(f, "population_size", self.population_size)?;
        write_opt(f, "seed", self.seed)?;
        match (&self.initialization_type, &self.flat_file) {
            (Some(InitializationType::FlatFile), Some(path)) => {
                write!(f, "\n\t\tinitialization_type flat_file = {}", format::quoted(path))?;
            }
            (kind, _) => write_opt(f, InitializationType::ATTRIBUTE, *kind)?,
        }
        write_opt(f, CrossoverType::ATTRIBUTE, self.crossover_type)?;
        write_opt(f, "num_crossover_points", self.num_crossover_points)?;
        write_opt(f, "num_parents", self.num_parents)?;
        write_opt(f, "num_offspring", self.num_offspring)?;
        write_opt_float(f, "crossover_rate", self.crossover_rate)?;
        write_opt(f, MutationType::ATTRIBUTE, self.mutation_type)?;
        write_opt_float(f, "mutation_scale", self.mutation_scale)?;
        write_opt_float(f, "mutation_rate", self.mutation_rate)
    }
}

/// Builder methods common to [`Soga`] and [`Moga`]
pub trait GeneticAlgorithm: Sized {
    fn jega(&self) -> &Jega;

    fn jega_mut(&mut self) -> &mut Jega;

    fn population_size(mut self, n: u32) -> Result<Self> {
        self.jega_mut().population_size = Some(positive_count("population_size", n)?);
        Ok(self)
    }

    fn seed(mut self, seed: u64) -> Self {
        self.jega_mut().seed = Some(seed);
        self
    }

    /// `flat_file` is only reachable through [`GeneticAlgorithm::flat_file_initialization`]
    fn initialization_type(mut self, kind: InitializationType) -> Result<Self> {
        self.jega_mut().set_initialization_type(kind)?;
        Ok(self)
    }

    fn flat_file_initialization(mut self, path: impl Into<String>) -> Result<Self> {
        self.jega_mut().set_flat_file(path.into())?;
        Ok(self)
    }

    /// Drops the counts that do not apply to the new operator
    fn crossover_type(mut self, kind: CrossoverType) -> Self {
        self.jega_mut().set_crossover_type(kind);
        self
    }

    fn num_crossover_points(mut self, n: u32) -> Result<Self> {
        let jega = self.jega_mut();
        jega.require_crossover("num_crossover_points", false)?;
        jega.num_crossover_points = Some(positive_count("num_crossover_points", n)?);
        Ok(self)
    }

    fn num_parents(mut self, n: u32) -> Result<Self> {
        let jega = self.jega_mut();
        jega.require_crossover("num_parents", true)?;
        jega.num_parents = Some(positive_count("num_parents", n)?);
        Ok(self)
    }

    fn num_offspring(mut self, n: u32) -> Result<Self> {
        let jega = self.jega_mut();
        jega.require_crossover("num_offspring", true)?;
        jega.num_offspring = Some(positive_count("num_offspring", n)?);
        Ok(self)
    }

    fn crossover_rate(mut self, rate: f64) -> Result<Self> {
        self.jega_mut().crossover_rate = Some(Interval::UNIT.check("crossover_rate", rate)?);
        Ok(self)
    }

    fn mutation_type(mut self, kind: MutationType) -> Self {
        self.jega_mut().set_mutation_type(kind);
        self
    }

    fn mutation_scale(mut self, scale: f64) -> Result<Self> {
        let jega = self.jega_mut();
        if !jega.mutation_type.is_some_and(MutationType::is_offset) {
            return Err(DeckError::prerequisite(
                "mutation_scale",
                "mutation_type = offset_*",
            ));
        }
        jega.mutation_scale = Some(Interval::UNIT_LEFT_OPEN.check("mutation_scale", scale)?);
        Ok(self)
    }

    fn mutation_rate(mut self, rate: f64) -> Result<Self> {
        self.jega_mut().mutation_rate = Some(Interval::UNIT.check("mutation_rate", rate)?);
        Ok(self)
    }
}

/// Convergence settings; the tracker must be chosen before its parameters
#[derive(Debug, Clone, Default, PartialEq)]
struct Convergence {
    kind: Option<ConvergenceType>,
    percent_change: Option<f64>,
    num_generations: Option<u32>,
}

impl Convergence {
    fn set_kind(&mut self, kind: ConvergenceType, allowed: &[ConvergenceType]) -> Result<()> {
        self.kind = Some(ensure_allowed(kind, allowed)?);
        Ok(())
    }

    fn set_percent_change(&mut self, percent: f64) -> Result<()> {
        self.require_kind("percent_change")?;
        self.percent_change = Some(Interval::UNIT.check("percent_change", percent)?);
        Ok(())
    }

    fn set_num_generations(&mut self, n: u32) -> Result<()> {
        self.require_kind("num_generations")?;
        self.num_generations = Some(positive_count("num_generations", n)?);
        Ok(())
    }

    fn require_kind(&self, attribute: &'static str) -> Result<()> {
        match self.kind {
            Some(_) => Ok(()),
            None => Err(DeckError::prerequisite(attribute, "a convergence_type")),
        }
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_opt(f, ConvergenceType::ATTRIBUTE, self.kind)?;
        write_opt_float(f, "percent_change", self.percent_change)?;
        write_opt(f, "num_generations", self.num_generations)
    }
}

/// Single-objective genetic algorithm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Soga {
    jega: Jega,
    fitness_type: Option<FitnessType>,
    replacement_type: Option<ReplacementType>,
    convergence: Convergence,
}

impl Soga {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `merit_function` or `constraint_penalty`
    pub fn fitness_type(mut self, kind: FitnessType) -> Result<Self> {
        self.fitness_type = Some(ensure_allowed(kind, SOGA_FITNESS)?);
        Ok(self)
    }

    pub fn replacement_type(mut self, kind: ReplacementType) -> Result<Self> {
        self.replacement_type = Some(ensure_allowed(kind, SOGA_REPLACEMENT)?);
        Ok(self)
    }

    pub fn convergence_type(mut self, kind: ConvergenceType) -> Result<Self> {
        self.convergence.set_kind(kind, SOGA_CONVERGENCE)?;
        Ok(self)
    }

    pub fn percent_change(mut self, percent: f64) -> Result<Self> {
        self.convergence.set_percent_change(percent)?;
        Ok(self)
    }

    pub fn num_generations(mut self, n: u32) -> Result<Self> {
        self.convergence.set_num_generations(n)?;
        Ok(self)
    }

    pub(super) fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.jega.write_lines(f)?;
        write_opt(f, FitnessType::ATTRIBUTE, self.fitness_type)?;
        write_opt(f, ReplacementType::ATTRIBUTE, self.replacement_type)?;
        self.convergence.write_lines(f)
    }
}

impl GeneticAlgorithm for Soga {
    fn jega(&self) -> &Jega {
        &self.jega
    }

    fn jega_mut(&mut self) -> &mut Jega {
        &mut self.jega
    }
}

/// Multi-objective genetic algorithm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Moga {
    jega: Jega,
    fitness_type: Option<FitnessType>,
    replacement_type: Option<ReplacementType>,
    shrinkage_fraction: Option<f64>,
    convergence: Convergence,
}

impl Moga {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `layer_rank` or `domination_count`
    pub fn fitness_type(mut self, kind: FitnessType) -> Result<Self> {
        self.fitness_type = Some(ensure_allowed(kind, MOGA_FITNESS)?);
        Ok(self)
    }

    /// Leaving `below_limit` drops the shrinkage fraction
    pub fn replacement_type(mut self, kind: ReplacementType) -> Result<Self> {
        let kind = ensure_allowed(kind, MOGA_REPLACEMENT)?;
        if kind != ReplacementType::BelowLimit {
            self.shrinkage_fraction = None;
        }
        self.replacement_type = Some(kind);
        Ok(self)
    }

    pub fn shrinkage_fraction(mut self, fraction: f64) -> Result<Self> {
        if self.replacement_type != Some(ReplacementType::BelowLimit) {
            return Err(DeckError::prerequisite(
                "shrinkage_fraction",
                "replacement_type = below_limit",
            ));
        }
        self.shrinkage_fraction = Some(Interval::UNIT.check("shrinkage_fraction", fraction)?);
        Ok(self)
    }

    pub fn convergence_type(mut self, kind: ConvergenceType) -> Result<Self> {
        self.convergence.set_kind(kind, MOGA_CONVERGENCE)?;
        Ok(self)
    }

    pub fn percent_change(mut self, percent: f64) -> Result<Self> {
        self.convergence.set_percent_change(percent)?;
        Ok(self)
    }

    pub fn num_generations(mut self, n: u32) -> Result<Self> {
        self.convergence.set_num_generations(n)?;
        Ok(self)
    }

    pub(super) fn write_lines(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.jega.write_lines(f)?;
        write_opt(f, FitnessType::ATTRIBUTE, self.fitness_type)?;
        if let Some(kind) = self.replacement_type {
            write_param(f, ReplacementType::ATTRIBUTE, kind)?;
            write_opt_float(f, "shrinkage_fraction", self.shrinkage_fraction)?;
        }
        self.convergence.write_lines(f)
    }
}

impl GeneticAlgorithm for Moga {
    fn jega(&self) -> &Jega {
        &self.jega
    }

    fn jega_mut(&mut self) -> &mut Jega {
        &mut self.jega
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_file_needs_a_path() {
        let err = Soga::new()
            .initialization_type(InitializationType::FlatFile)
            .unwrap_err();
        assert!(matches!(err, DeckError::MissingPrerequisite { .. }));

        let soga = Soga::new().flat_file_initialization("pop.dat").unwrap();
        assert_eq!(soga.jega().initialization(), Some(InitializationType::FlatFile));
        assert_eq!(soga.jega().flat_file(), Some("pop.dat"));

        let soga = soga.initialization_type(InitializationType::UniqueRandom).unwrap();
        assert_eq!(soga.jega().flat_file(), None);
    }

    #[test]
    fn test_parent_counts_only_under_shuffle_random() {
        assert!(Soga::new().num_parents(2).is_err());
        assert!(
            Soga::new()
                .crossover_type(CrossoverType::MultiPointReal)
                .num_parents(2)
                .is_err()
        );
        let soga = Soga::new()
            .crossover_type(CrossoverType::ShuffleRandom)
            .num_parents(2)
            .unwrap()
            .num_offspring(3)
            .unwrap();
        assert!(soga.clone().num_crossover_points(2).is_err());

        // switching operators drops counts that no longer apply
        let soga = soga.crossover_type(CrossoverType::MultiPointBinary);
        assert_eq!(soga.jega().num_parents, None);
        assert!(soga.num_crossover_points(2).is_ok());
    }

    #[test]
    fn test_mutation_scale_needs_offset_operator() {
        assert!(Moga::new().mutation_scale(0.1).is_err());
        assert!(
            Moga::new()
                .mutation_type(MutationType::BitRandom)
                .mutation_scale(0.1)
                .is_err()
        );
        let moga = Moga::new().mutation_type(MutationType::OffsetCauchy);
        assert!(moga.clone().mutation_scale(0.0).is_err());
        assert!(moga.mutation_scale(1.0).is_ok());
    }

    #[test]
    fn test_variant_keyword_subsets() {
        assert!(Soga::new().fitness_type(FitnessType::MeritFunction).is_ok());
        assert!(matches!(
            Soga::new().fitness_type(FitnessType::LayerRank),
            Err(DeckError::InvalidEnumValue { attribute: "fitness_type", .. })
        ));
        assert!(Moga::new().replacement_type(ReplacementType::BelowLimit).is_ok());
        assert!(Soga::new().replacement_type(ReplacementType::BelowLimit).is_err());
        assert!(Moga::new().convergence_type(ConvergenceType::BestFitnessTracker).is_err());
    }

    #[test]
    fn test_convergence_parameters_need_tracker() {
        assert!(Soga::new().percent_change(0.05).is_err());
        let soga = Soga::new()
            .convergence_type(ConvergenceType::AverageFitnessTracker)
            .unwrap();
        assert!(soga.clone().percent_change(1.5).is_err());
        assert!(soga.percent_change(0.05).unwrap().num_generations(10).is_ok());
    }

    #[test]
    fn test_shrinkage_fraction_under_below_limit() {
        assert!(Moga::new().shrinkage_fraction(0.9).is_err());
        let moga = Moga::new()
            .replacement_type(ReplacementType::BelowLimit)
            .unwrap()
            .shrinkage_fraction(0.9)
            .unwrap();
        let moga = moga.replacement_type(ReplacementType::Elitist).unwrap();
        assert_eq!(moga.shrinkage_fraction, None);
    }
}
