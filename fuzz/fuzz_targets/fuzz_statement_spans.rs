#![no_main]

use formula_dax_syntax::find_statement_spans;
use libfuzzer_sys::fuzz_target;

const MAX_INPUT_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };
    let text = String::from_utf8_lossy(data);

    let spans = find_statement_spans(&text);
    let mut previous_end = 0usize;
    for span in &spans {
        assert!(span.start >= previous_end, "spans overlap: {spans:?}");
        assert!(span.start < span.end);
        assert!(span.end <= text.len());
        assert!(text.is_char_boundary(span.start) && text.is_char_boundary(span.end));
        assert_eq!(span.label.is_some(), span.hint.is_some());
        previous_end = span.end;
    }

    assert_eq!(spans, find_statement_spans(&text));
});
