#![no_main]

use formula_dax_syntax::{parse, parse_expression, ParseOptions};
use libfuzzer_sys::fuzz_target;

/// Measure scripts exported from a model rarely exceed a few hundred KB; keep the harness
/// well below that so iterations stay fast.
const MAX_FUZZ_SCRIPT_CHARS: usize = 16_384;
const MAX_INPUT_BYTES: usize = MAX_FUZZ_SCRIPT_CHARS * 4; // max UTF-8 bytes per char

fn truncate_to_chars(s: &str, max_chars: usize) -> &str {
    let mut count = 0usize;
    for (idx, _) in s.char_indices() {
        if count == max_chars {
            return &s[..idx];
        }
        count += 1;
    }
    s
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let data = if data.len() > MAX_INPUT_BYTES {
        &data[..MAX_INPUT_BYTES]
    } else {
        data
    };

    let input = String::from_utf8_lossy(data);
    let script = truncate_to_chars(&input, MAX_FUZZ_SCRIPT_CHARS);

    // Small caps exercise the early-stop path.
    let max_errors = usize::from(data[0] % 16);
    let result = parse(script, &ParseOptions::new().with_max_errors(max_errors));

    assert!(result.diagnostics.error_count() <= max_errors.max(1));
    if !result.complete {
        assert!(result.diagnostics.is_overflowed());
    }
    for measure in &result.measures {
        assert!(!measure.table_name.is_empty());
        assert!(!measure.name.is_empty());
        let full_text = script
            .get(measure.span.start..measure.span.end)
            .expect("measure span must lie on char boundaries");
        assert_eq!(full_text.trim(), measure.full_text);
    }

    let _ = parse_expression(script);
});
