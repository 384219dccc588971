use formula_dax_syntax::{find_statement_spans, StatementSpan};
use pretty_assertions::assert_eq;

fn ranges(src: &str) -> Vec<(usize, usize)> {
    find_statement_spans(src)
        .iter()
        .map(|span| (span.start, span.end))
        .collect()
}

#[test]
fn empty_input() {
    assert_eq!(find_statement_spans(""), Vec::new());
    assert_eq!(find_statement_spans("  \r\n\t "), Vec::new());
}

#[test]
fn comment_only_input() {
    assert_eq!(find_statement_spans("-- this is comment only"), Vec::new());
    assert_eq!(find_statement_spans("// one\n-- two\n"), Vec::new());
}

#[test]
fn free_text_is_not_a_statement() {
    assert_eq!(find_statement_spans("asd"), Vec::new());
    assert_eq!(find_statement_spans("asd; qwe;"), Vec::new());
}

#[test]
fn one_line_query() {
    assert_eq!(
        find_statement_spans("EVALUATE T"),
        vec![StatementSpan {
            start: 0,
            end: 10,
            label: None,
            hint: None,
        }]
    );
}

#[test]
fn two_unterminated_measures() {
    let src = "CREATE MEASURE T[M1] = 1\r\nCREATE MEASURE 'T T'[M2] = 2";
    assert_eq!(
        find_statement_spans(src),
        vec![
            StatementSpan {
                start: 0,
                end: 24,
                label: Some("T[M1]".to_string()),
                hint: Some("CREATE MEASURE T[M1] = 1".to_string()),
            },
            StatementSpan {
                start: 26,
                end: 54,
                label: Some("'T T'[M2]".to_string()),
                hint: Some("CREATE MEASURE 'T T'[M2] = 2".to_string()),
            },
        ]
    );
}

#[test]
fn three_terminated_measures() {
    let src = "CREATE MEASURE T[M1] = 1;\r\n\r\nCREATE MEASURE T[m3] = \r\n (3 + 9) / 12\r\n\r\n;\r\n\r\nCREATE MEASURE T[M2] = 2\r\n;\r\n\r\n";
    assert_eq!(ranges(src), vec![(0, 25), (29, 72), (76, 103)]);

    let spans = find_statement_spans(src);
    assert_eq!(spans[1].label.as_deref(), Some("T[m3]"));
    assert_eq!(
        spans[1].hint.as_deref(),
        Some("CREATE MEASURE T[m3] = \r\n (3 + 9) / 12")
    );
}

#[test]
fn cube_script_with_comment_banners() {
    let src = "CALCULATE;\n\
CREATE MEMBER CURRENTCUBE.Measures.[__XL_Count of Models] AS 1, VISIBLE = 0;\n\
ALTER CUBE CURRENTCUBE UPDATE DIMENSION Measures, Default_Member = [__XL_Count of Models];\n\
-- PowerPivot measures command (do not modify manually) --\n\
CREATE MEASURE 'Table1'[MeasureCountRows]=COUNTROWS(Table1);\n";
    let spans = find_statement_spans(src);
    let labels: Vec<_> = spans.iter().map(|span| span.label.as_deref()).collect();
    assert_eq!(labels, vec![None, None, Some("'Table1'[MeasureCountRows]")]);
    assert!(src[spans[0].start..].starts_with("CREATE MEMBER"));
    assert!(src[spans[1].start..].starts_with("ALTER CUBE"));
}

#[test]
fn spans_are_ordered_and_in_bounds() {
    let src = "EVALUATE {1;2} ; DEFINE MEASURE T[a] = 1 EVALUATE ROW(\"x\", [a]) EVALUATE T;";
    let spans = find_statement_spans(src);
    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{pair:?}");
    }
    assert!(spans.iter().all(|span| span.start < span.end && span.end <= src.len()));
    assert_eq!(spans[1].label.as_deref(), Some("T[a]"));
}

#[test]
fn unterminated_string_runs_to_end() {
    let src = "EVALUATE ROW(\"a; EVALUATE T";
    assert_eq!(ranges(src), vec![(0, src.len())]);
}

#[test]
fn repeated_calls_agree() {
    let src = "CREATE MEASURE T[M1] = 1\r\nCREATE MEASURE 'T T'[M2] = 2";
    assert_eq!(find_statement_spans(src), find_statement_spans(src));
}
