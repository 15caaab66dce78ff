// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Property tests: arbitrary input never panics and junk never parses.

use padlock_common::{Claims, SignedToken};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = SignedToken::parse(&bytes);
        let _ = Claims::from_json_slice(&bytes);
    }

    #[test]
    fn segments_without_a_json_header_are_malformed(
        a in "[A-Za-z0-9_-]{0,40}",
        b in "[A-Za-z0-9_-]{0,40}",
        c in "[A-Za-z0-9_-]{0,40}",
    ) {
        // A JSON object header starts with `{` or whitespace, which encode to a leading `e`, `I`, `C` or `D`.
        prop_assume!(!a.starts_with(['e', 'I', 'C', 'D']));
        let t = format!("{a}.{b}.{c}");
        let err = SignedToken::parse(t.as_bytes()).unwrap_err();
        prop_assert_eq!(err.error_code(), "MALFORMED_TOKEN");
    }
}
