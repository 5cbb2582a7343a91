//! Tests for deck assembly
//!
//! These tests verify:
//! - Key uniqueness across every variable kind
//! - The exact variables, responses and interface blocks
//! - Derivative gating at `get_deck` time
//! - Block order of the complete deck

use crate::deck::Deck;
use crate::derivatives::{Gradients, Hessians};
use crate::error::{DeckError, DerivativeOrder};
use crate::methods::{Cobyla, Method, OptPp, Optimize};
use crate::variables::{
    DataType, DesignVariable, NormalUncertainVariable, StateVariable, UniformUncertainVariable,
    VariableKind,
};

const REF_VARIABLES: &str = "\
variables

\tnormal_uncertain  2
\t\tdescriptors     \"nuv\"   \"NormalVariable\"
\t\tmeans            1.0     -1234000.0
\t\tstd_deviations   0.05    1e-05

\tuniform_uncertain  1
\t\tdescriptors     \"u\"
\t\tlower_bounds     -3.33
\t\tupper_bounds     0.33
";

fn uq_deck() -> Deck {
    Deck::new(Method::monte_carlo(100, 42).unwrap(), "f").unwrap()
}

fn reference_deck() -> Deck {
    let mut deck = uq_deck();
    deck.add_variable(NormalUncertainVariable::new("nuv", 1.0, 0.05).unwrap())
        .unwrap();
    deck.add_variable(NormalUncertainVariable::new("NormalVariable", -1.234e6, 0.00001).unwrap())
        .unwrap();
    deck.add_variable(UniformUncertainVariable::new("u", -3.33, 0.33).unwrap())
        .unwrap();
    deck
}

#[test]
fn test_reference_variables_block() {
    assert_eq!(reference_deck().render_variables(), REF_VARIABLES);
}

#[test]
fn test_lookup_by_key() {
    let deck = reference_deck();
    assert_eq!(deck.len(), 3);
    assert_eq!(
        deck.get("NormalVariable").and_then(|v| v.as_normal()).map(|v| v.mean()),
        Some(-1.234e6)
    );
    assert!(deck.get("Z~Z").is_none());
    assert_eq!(
        deck.keys().collect::<Vec<_>>(),
        vec!["nuv", "NormalVariable", "u"]
    );
    assert_eq!(deck.variables_of(VariableKind::NormalUncertain).len(), 2);
}

#[test]
fn test_duplicate_key_across_kinds_leaves_deck_unchanged() {
    let mut deck = reference_deck();
    let before = deck.clone();

    let err = deck
        .add_variable(UniformUncertainVariable::new("nuv", 0.0, 1.0).unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        DeckError::DuplicateKey {
            what: "variable",
            key: "nuv".to_string()
        }
    );

    let err = deck
        .add_variable(StateVariable::new("u", DataType::Integer, 1).unwrap())
        .unwrap_err();
    assert!(matches!(err, DeckError::DuplicateKey { .. }));
    assert_eq!(deck, before);
}

#[test]
fn test_invalid_key_rejected_on_add() {
    let mut deck = uq_deck();
    let badboy = StateVariable::new("boy ain't good", DataType::String, "b").unwrap();
    assert!(matches!(
        deck.add_variable(badboy),
        Err(DeckError::InvalidKey { .. })
    ));
    assert!(deck.is_empty());
}

#[test]
fn test_get_mut_updates_in_place() {
    let mut deck = reference_deck();
    deck.get_mut("u").unwrap().set_value(1.0).unwrap();
    let u = deck.get("u").unwrap().as_uniform().unwrap();
    assert!((u.value() - 1.0).abs() < 1e-12);
    assert!((u.upper_bound() - u.lower_bound() - 3.66).abs() < 1e-12);
}

#[test]
fn test_get_mut_keeps_key_and_index() {
    let mut deck = reference_deck();
    {
        let mut u = deck.get_mut("u").unwrap();
        assert_eq!(u.key(), "u");
        u.set_bounds(0.0, 2.0).unwrap();
        assert!(matches!(
            u.set_std_deviation(1.0),
            Err(DeckError::MissingPrerequisite { .. })
        ));
    }
    let mut nuv = deck.get_mut("nuv").unwrap();
    nuv.set_std_deviation(0.5).unwrap();
    assert!(nuv.set_bounds(0.0, 1.0).is_err());
    assert!(nuv.set_value("text").is_err());

    assert_eq!(deck.keys().collect::<Vec<_>>(), ["nuv", "NormalVariable", "u"]);
    assert_eq!(deck.get("u").unwrap().key(), "u");
    assert_eq!(deck.get("u").unwrap().as_uniform().unwrap().value(), 1.0);
    assert_eq!(deck.get("nuv").unwrap().as_normal().unwrap().std_deviation(), 0.5);
    assert!(deck.get_mut("missing").is_none());
}

#[test]
fn test_function_names() {
    let deck = Deck::new(Method::monte_carlo(1, 1).unwrap(), ["f", "g"]).unwrap();
    assert_eq!(deck.functions(), ["f", "g"]);

    assert!(matches!(
        Deck::new(Method::monte_carlo(1, 1).unwrap(), ["f", "f"]),
        Err(DeckError::DuplicateKey { what: "function", .. })
    ));
    assert!(matches!(
        Deck::new(Method::monte_carlo(1, 1).unwrap(), Vec::<String>::new()),
        Err(DeckError::MissingPrerequisite { .. })
    ));
    assert!(Deck::new(Method::monte_carlo(1, 1).unwrap(), "a b").is_err());
}

#[test]
fn test_responses_block_without_derivatives() {
    assert_eq!(
        uq_deck().render_responses(),
        "responses\n\tobjective_functions  1\n\tdescriptors          f\n\tno_gradients\n\tno_hessians\n"
    );
}

#[test]
fn test_responses_block_with_derivatives() {
    let mut deck = Deck::new(Method::monte_carlo(1, 1).unwrap(), ["f", "g"]).unwrap();
    deck.set_gradients(Gradients::analytic());
    deck.set_hessians(Hessians::numerical());
    assert_eq!(
        deck.render_responses(),
        "responses\n\tobjective_functions  2\n\tdescriptors          f g\n\tanalytic_gradients\n\tnumerical_hessians\n"
    );
}

#[test]
fn test_interface_block() {
    let deck = uq_deck();
    let base = "interface\n\
                \tid_interface = \"DAKDECK_INTERFACE\"\n\
                \tanalysis_drivers = \"driver.sh\"\n\
                \t\tfork\n\
                \t\tparameters_file = \"params.in\"\n\
                \t\tresults_file = \"results.out\"\n";
    assert_eq!(deck.render_interface(false, None), base);
    assert_eq!(deck.render_interface(false, Some(4)), base);
    assert_eq!(
        deck.render_interface(true, Some(4)),
        format!("{base}\tasynchronous\n\t\tevaluation_concurrency = 4\n")
    );
    assert_eq!(
        deck.render_interface(true, None),
        format!("{base}\tasynchronous\n")
    );
}

#[test]
fn test_zero_concurrency_rejected() {
    let deck = uq_deck();
    assert!(matches!(
        deck.get_deck(None, true, Some(0)),
        Err(DeckError::OutOfRange {
            attribute: "evaluation_concurrency",
            ..
        })
    ));
    assert!(deck.get_deck(None, false, Some(0)).is_err());
    assert!(deck.get_deck(None, true, Some(1)).is_ok());
}

#[test]
fn test_state_variables_grouped_by_type() {
    let mut deck = uq_deck();
    deck.add_variable(StateVariable::new("r", DataType::Float, 1.5).unwrap())
        .unwrap();
    deck.add_variable(StateVariable::new("n", DataType::Integer, 3).unwrap())
        .unwrap();
    deck.add_variable(StateVariable::new("s", DataType::String, "abc").unwrap())
        .unwrap();
    deck.add_variable(StateVariable::new("m", DataType::Integer, 10).unwrap())
        .unwrap();

    let d = "descriptors";
    let e = "elements_per_variable";
    let v = "elements";
    let expected = format!(
        "variables\n\
         \n\
         \tdiscrete_state_set\n\
         \t\tinteger  2\n\
         \t\t\t{d:<23}\"n\"   \"m\"\n\
         \t\t\t{e:<23} 1     1\n\
         \t\t\t{v:<23} 3     10\n\
         \t\tstring  1\n\
         \t\t\t{d:<23}\"s\"\n\
         \t\t\t{e:<23} 1\n\
         \t\t\t{v:<23}\"abc\"\n\
         \t\treal  1\n\
         \t\t\t{d:<23}\"r\"\n\
         \t\t\t{e:<23} 1\n\
         \t\t\t{v:<23} 1.5\n"
    );
    assert_eq!(deck.render_variables(), expected);
}

#[test]
fn test_design_variables_only_for_optimizers() {
    let design = DesignVariable::new("d", 0.0, 2.0, 1.0).unwrap();

    let mut uq = uq_deck();
    uq.add_variable(design.clone()).unwrap();
    assert_eq!(uq.render_variables(), "variables\n");

    let mut opt = Deck::new(Optimize::new(Cobyla::new()), "f").unwrap();
    opt.add_variable(design).unwrap();
    assert_eq!(
        opt.render_variables(),
        "variables\n\
         \n\
         \tcontinuous_design  1\n\
         \t\tdescriptors     \"d\"\n\
         \t\tinitial_point    1.0\n\
         \t\tlower_bounds     0.0\n\
         \t\tupper_bounds     2.0\n"
    );
}

#[test]
fn test_gradient_gating() {
    let mut deck = Deck::new(Optimize::new(OptPp::q_newton()), "f").unwrap();
    assert_eq!(
        deck.get_deck(None, false, None).unwrap_err(),
        DeckError::MissingDerivatives {
            method: "OPT".to_string(),
            derivative: DerivativeOrder::Gradients,
        }
    );

    // an explicit `none` does not count
    deck.set_gradients(Gradients::none());
    assert!(deck.get_deck(None, false, None).is_err());

    deck.set_gradients(Gradients::numerical());
    assert!(deck.get_deck(None, false, None).is_ok());

    deck.clear_gradients();
    assert!(deck.validate().is_err());
}

#[test]
fn test_full_newton_needs_hessians() {
    let mut deck = Deck::new(Optimize::new(OptPp::newton()), "f").unwrap();
    deck.set_gradients(Gradients::analytic());
    assert!(matches!(
        deck.get_deck(None, false, None),
        Err(DeckError::MissingDerivatives {
            derivative: DerivativeOrder::Hessians,
            ..
        })
    ));
    deck.set_hessians(Hessians::analytic());
    assert!(deck.get_deck(None, false, None).is_ok());
}

#[test]
fn test_header_usage_line() {
    let deck = uq_deck();
    let header = deck.render_header(Some("dakota -i dak.in -o dak.out"));
    assert!(header.starts_with("# Dakota input deck\n# Generated by dakdeck "));
    assert!(header.ends_with("# Usage:\n#   dakota -i dak.in -o dak.out\n"));
    assert!(!deck.render_header(None).contains("Usage"));
}

#[test]
fn test_complete_deck() {
    let mut deck = uq_deck();
    deck.add_variable(UniformUncertainVariable::new("u", -1.0, 1.0).unwrap())
        .unwrap();
    let expected = format!(
        "# Dakota input deck\n\
         # Generated by dakdeck {}\n\
         \n\
         method\n\
         \tid_method = \"UQ\"\n\
         \tsampling\n\
         \t\tsample_type = random\n\
         \t\tseed = 42\n\
         \t\tsamples = 100\n\
         \n\
         interface\n\
         \tid_interface = \"DAKDECK_INTERFACE\"\n\
         \tanalysis_drivers = \"driver.sh\"\n\
         \t\tfork\n\
         \t\tparameters_file = \"params.in\"\n\
         \t\tresults_file = \"results.out\"\n\
         \tasynchronous\n\
         \t\tevaluation_concurrency = 2\n\
         \n\
         variables\n\
         \n\
         \tuniform_uncertain  1\n\
         \t\tdescriptors     \"u\"\n\
         \t\tlower_bounds     -1.0\n\
         \t\tupper_bounds     1.0\n\
         \n\
         responses\n\
         \tobjective_functions  1\n\
         \tdescriptors          f\n\
         \tno_gradients\n\
         \tno_hessians\n",
        env!("CARGO_PKG_VERSION")
    );
    let text = deck.get_deck(None, true, Some(2)).unwrap();
    assert_eq!(text, expected);
    // rendering has no side effects
    assert_eq!(deck.get_deck(None, true, Some(2)).unwrap(), text);
}
