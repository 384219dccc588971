use formula_dax_syntax::{parse_script, CalcProperty, FormatType, Measure};
use pretty_assertions::assert_eq;

fn single_measure(src: &str) -> Measure {
    let mut measures = match parse_script(src) {
        Ok(measures) => measures,
        Err(err) => panic!("failed to parse {src:?}:\n{err}"),
    };
    assert_eq!(measures.len(), 1, "{measures:?}");
    measures.remove(0)
}

#[test]
fn number_decimal_with_all_attributes() {
    let measure = single_measure(
        "CREATE MEASURE 'Table1'[C]=1 CALCULATION PROPERTY NumberDecimal Accuracy=5 ThousandSeparator=True Format='#,0.00000'",
    );
    assert_eq!(measure.table_name, "Table1");
    assert_eq!(measure.name, "C");
    assert_eq!(measure.expression, "1");
    assert_eq!(measure.full_text, "CREATE MEASURE 'Table1'[C]=1");
    assert_eq!(
        measure.calc_property,
        Some(CalcProperty {
            format: FormatType::NumberDecimal,
            calculation_type: "Member".to_string(),
            accuracy: Some(5),
            thousand_separator: Some(true),
            format_string: Some("#,0.00000".to_string()),
        })
    );
}

#[test]
fn attributes_in_any_order() {
    let measure = single_measure(
        "CREATE MEASURE T[P] = [a] / [b] CALCULATION PROPERTY percentage Format=\"0.00 %\" ThousandSeparator=False Accuracy=2;",
    );
    let property = measure.calc_property.expect("calc property");
    assert_eq!(property.format, FormatType::Percentage);
    assert_eq!(property.accuracy, Some(2));
    assert_eq!(property.thousand_separator, Some(false));
    assert_eq!(property.format_string.as_deref(), Some("0.00 %"));
    assert_eq!(measure.expression, "[a] / [b]");
}

#[test]
fn format_type_without_attributes() {
    let measure = single_measure("CREATE MEASURE T[G]=SUM(T[x]) CALCULATION PROPERTY General");
    assert_eq!(
        measure.calc_property,
        Some(CalcProperty::new(FormatType::General))
    );
    assert_eq!(measure.full_text, "CREATE MEASURE T[G]=SUM(T[x])");
}

#[test]
fn calc_property_then_next_statement() {
    let measures = parse_script(
        "CREATE MEASURE T[a]=1 CALCULATION PROPERTY Currency Accuracy=2\nCREATE MEASURE T[b]=2",
    )
    .unwrap();
    assert_eq!(measures.len(), 2);
    assert_eq!(
        measures[0].calc_property.as_ref().map(|p| p.format),
        Some(FormatType::Currency)
    );
    assert_eq!(measures[1].calc_property, None);
}

#[test]
fn wrong_format_type() {
    let err = parse_script("CREATE MEASURE 'Table1'[C]=1 CALCULATION PROPERTY WrongFormatType")
        .unwrap_err();
    assert_eq!(
        err.report(),
        "1:51: Wrong calculation property type 'WrongFormatType'"
    );
}

#[test]
fn unknown_and_duplicate_attributes() {
    let err = parse_script("CREATE MEASURE T[C]=1 CALCULATION PROPERTY Text Colour=1").unwrap_err();
    assert!(
        err.report()
            .contains("syntax error, unknown calculation property attribute 'Colour'"),
        "{err}"
    );

    let err = parse_script("CREATE MEASURE T[C]=1 CALCULATION PROPERTY Text Accuracy=1 Accuracy=2")
        .unwrap_err();
    assert!(
        err.report()
            .contains("syntax error, duplicate calculation property attribute 'Accuracy'"),
        "{err}"
    );
}

#[test]
fn attribute_values_are_typed() {
    let err = parse_script("CREATE MEASURE T[C]=1 CALCULATION PROPERTY Currency Accuracy=1.5")
        .unwrap_err();
    assert!(
        err.report()
            .contains("Accuracy expects a non-negative integer"),
        "{err}"
    );

    let err = parse_script("CREATE MEASURE T[C]=1 CALCULATION PROPERTY Currency ThousandSeparator=1")
        .unwrap_err();
    assert!(
        err.report().contains("ThousandSeparator expects True or False"),
        "{err}"
    );
}
