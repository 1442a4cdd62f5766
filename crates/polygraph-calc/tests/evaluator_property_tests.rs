use polygraph_calc::{check_equality, evaluate, InvalidExpressionKind, DEFAULT_EPSILON};
use proptest::prelude::*;

/// An expression rendered as text together with its directly computed value.
#[derive(Debug, Clone)]
struct Sample {
    text: String,
    value: f64,
}

fn leaf() -> impl Strategy<Value = Sample> {
    (0u32..1000).prop_map(|n| Sample {
        text: n.to_string(),
        value: n as f64,
    })
}

fn sample() -> impl Strategy<Value = Sample> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Sample {
                text: format!("({} + {})", a.text, b.text),
                value: a.value + b.value,
            }),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Sample {
                text: format!("({} - {})", a.text, b.text),
                value: a.value - b.value,
            }),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Sample {
                text: format!("({} * {})", a.text, b.text),
                value: a.value * b.value,
            }),
            (inner.clone(), 1u32..50).prop_map(|(a, d)| Sample {
                text: format!("({} / {})", a.text, d),
                value: a.value / d as f64,
            }),
            (inner.clone(), 0u32..4).prop_map(|(a, e)| Sample {
                text: format!("({} ^ {})", a.text, e),
                value: a.value.powf(e as f64),
            }),
            inner.clone().prop_map(|a| Sample {
                text: format!("(-{})", a.text),
                value: -a.value,
            }),
            inner.clone().prop_map(|a| Sample {
                text: format!("sin({})", a.text),
                value: a.value.to_radians().sin(),
            }),
            inner.prop_map(|a| Sample {
                text: format!("cos({})", a.text),
                value: a.value.to_radians().cos(),
            }),
        ]
    })
}

fn disallowed_identifier() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,8}")
        .unwrap()
        .prop_filter("sin and cos are allowed", |s| s != "sin" && s != "cos")
}

proptest! {
    #[test]
    fn evaluate_matches_direct_computation(s in sample()) {
        prop_assume!(s.value.is_finite());
        let got = evaluate(&s.text).unwrap();
        let tolerance = 1e-9 * s.value.abs().max(1.0);
        prop_assert!((got - s.value).abs() <= tolerance, "{} => {} != {}", s.text, got, s.value);
    }

    #[test]
    fn expression_equals_its_own_value(s in sample()) {
        prop_assume!(s.value.is_finite() && s.value.abs() < 1e6);
        let claim = format!("{} = {}", s.text, s.value);
        prop_assert!(check_equality(&claim, DEFAULT_EPSILON).unwrap());
    }

    #[test]
    fn evaluation_is_idempotent(s in sample()) {
        prop_assume!(s.value.is_finite());
        let first = check_equality(&s.text, DEFAULT_EPSILON);
        let second = check_equality(&s.text, DEFAULT_EPSILON);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn other_identifiers_are_rejected(id in disallowed_identifier(), n in 0u32..100) {
        for text in [
            id.clone(),
            format!("{n} + {id}"),
            format!("{id}({n})"),
            format!("({n} * {id}) = {n}"),
        ] {
            let err = check_equality(&text, DEFAULT_EPSILON).unwrap_err();
            prop_assert_eq!(err.kind(), InvalidExpressionKind::DisallowedIdentifier, "{}", text);
        }
    }
}
