use proptest::prelude::*;

use ebnfpeg::{compile, compile_with_config, ParseNode, ParserConfig};

use super::ARITHMETIC;

fn check_spans(node: &ParseNode) {
    let mut pos = node.start;

    for child in &node.children {
        assert!(child.start >= pos, "{:?} overlaps its sibling", child.span());
        assert!(child.end <= node.end, "{:?} outside {:?}", child.span(), node.span());
        pos = child.end;

        check_spans(child);
    }
}

proptest! {
    #[test]
    fn arithmetic_spans(input in "[1-9][0-9]{0,2}( [-+*/] ([1-9][0-9]{0,2}|[a-z])){0,6}") {
        let p = compile(ARITHMETIC).unwrap();

        let tree = p.parse(&input).unwrap();

        prop_assert_eq!(tree.span(), 0..input.len());
        check_spans(&tree);

        prop_assert_eq!(p.parse(&input).unwrap(), tree);
    }

    #[test]
    fn memoization_is_transparent(input in "[1-9]( [-+*/] (\\(?[a-z]\\)?|[0-9])){0,8}") {
        let memo = compile(ARITHMETIC).unwrap();
        let plain = compile_with_config(
            ARITHMETIC,
            ParserConfig {
                memoize: false,
                ..ParserConfig::default()
            },
        )
        .unwrap();

        prop_assert_eq!(memo.parse(&input), plain.parse(&input));
    }
}
