#![no_main]

use libfuzzer_sys::fuzz_target;
use ysql_creds::statement::{is_multi_statement, scan_quoted, split_outside_quotes};

fuzz_target!(|text: &str| {
    if let Ok(spans) = scan_quoted(text) {
        let mut last_end = 0;
        for span in &spans {
            assert!(span.start >= last_end && span.start < span.end && span.end <= text.len());
            assert!(text.is_char_boundary(span.start) && text.is_char_boundary(span.end));
            last_end = span.end;
        }

        let units = split_outside_quotes(text).expect("scan succeeded");
        assert!(units.iter().all(|u| !u.is_empty()));
    }

    let _ = is_multi_statement(text);
});
