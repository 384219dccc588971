use formula_dax_syntax::{find_statement_spans, parse, parse_script, Keyword, ParseOptions};
use proptest::prelude::*;

fn plain_table() -> impl Strategy<Value = String> {
    // Any other keyword (`Order`, `Property`, `Blank`, ...) is a valid table name before `[`.
    "[A-Za-z_][A-Za-z0-9_]{0,8}".prop_filter("statement keywords split the script", |name| {
        !Keyword::from_ident(name).is_some_and(Keyword::starts_statement)
            && !name.eq_ignore_ascii_case("ALTER")
    })
}

/// `(raw source spelling, unquoted name)`
fn table_ref() -> impl Strategy<Value = (String, String)> {
    prop_oneof![
        plain_table().prop_map(|name| (name.clone(), name)),
        "[A-Za-z0-9 ']{1,10}".prop_map(|name| (format!("'{}'", name.replace('\'', "''")), name)),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..100_000).prop_map(|n| n.to_string()),
        Just("SUM(T[x])".to_string()),
        Just("[a] + [b] * 2".to_string()),
        Just("IF([a] > 0, \"pos\", BLANK())".to_string()),
        Just("VAR x = 1 RETURN x + 1".to_string()),
        Just("CALCULATE([m], ALL('T T'))".to_string()),
        Just("-.5".to_string()),
        Just("NOT [flag] && TRUE".to_string()),
        Just("{1, 2, 3}".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn measure_fields_reproduce_source(
        (raw_table, table) in table_ref(),
        name in "[A-Za-z0-9 _]{1,12}",
        expr in expression(),
        terminated in any::<bool>(),
    ) {
        let full_text = format!("CREATE MEASURE {raw_table}[{name}]={expr}");
        let src = if terminated { format!("  {full_text} ;\n") } else { full_text.clone() };

        let measures = parse_script(&src).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(measures.len(), 1);
        let measure = &measures[0];
        prop_assert_eq!(&measure.table_name, &table);
        prop_assert_eq!(&measure.name, &name);
        prop_assert_eq!(&measure.expression, &expr);
        prop_assert_eq!(&measure.full_text, &full_text);
        prop_assert_eq!(measure.span.slice(&src), full_text.as_str());

        let spans = find_statement_spans(&src);
        prop_assert_eq!(spans.len(), 1);
        let expected_label = format!("{raw_table}[{name}]");
        prop_assert_eq!(spans[0].label.as_deref(), Some(expected_label.as_str()));
        prop_assert_eq!(spans[0].hint.as_deref(), Some(full_text.as_str()));
    }

    #[test]
    fn statements_keep_source_order(count in 1usize..6) {
        let src: String = (0..count)
            .map(|idx| format!("CREATE MEASURE T[m{idx}] = {idx};\n\n"))
            .collect();
        let measures = parse_script(&src).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let names: Vec<_> = measures.iter().map(|m| m.name.clone()).collect();
        let expected: Vec<_> = (0..count).map(|idx| format!("m{idx}")).collect();
        prop_assert_eq!(names, expected);
        prop_assert_eq!(find_statement_spans(&src).len(), count);
    }

    #[test]
    fn arbitrary_input_never_panics(src in "\\PC{0,200}|[(){}\\[\\]'\"a1 -]{0,2000}") {
        let result = parse(&src, &ParseOptions::new().with_max_errors(8));
        prop_assert!(result.diagnostics.error_count() <= 8);
        if result.has_errors() {
            prop_assert!(!result.report().is_empty());
        }

        let spans = find_statement_spans(&src);
        let mut previous_end = 0;
        for span in &spans {
            prop_assert!(span.start >= previous_end);
            prop_assert!(span.start < span.end);
            prop_assert!(span.end <= src.len());
            prop_assert!(src.is_char_boundary(span.start) && src.is_char_boundary(span.end));
            previous_end = span.end;
        }
    }

    #[test]
    fn nesting_is_bounded_without_overflowing(
        depth in 0usize..400,
        open in prop_oneof![Just("("), Just("ABS("), Just("- "), Just("NOT ")],
    ) {
        let close = if open.ends_with('(') { ")" } else { "" };
        let src = format!("EVALUATE {}1{}", open.repeat(depth), close.repeat(depth));
        let result = parse(&src, &ParseOptions::default());
        if depth < 128 {
            prop_assert!(!result.has_errors(), "{}", result.report());
        } else {
            prop_assert_eq!(result.diagnostics.error_count(), 1);
            prop_assert!(result.report().contains("expression nesting exceeds 128 levels"));
        }
    }
}
