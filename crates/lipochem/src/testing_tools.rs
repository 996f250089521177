macro_rules! assert_error_labels {
    ($diag:expr, $expected:expr) => {{
        use miette::Diagnostic;

        let diag = $diag.unwrap_err();
        let labels: Vec<_> = diag
            .labels()
            .into_iter()
            .flatten()
            .map(|l| (l.label().unwrap_or_default().to_owned(), l.offset(), l.len()))
            .collect();
        let expected: Vec<(&str, usize, usize)> = $expected;
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(label, offset, len)| (label.to_owned(), offset, len))
            .collect();
        assert_eq!(labels, expected, "{}", stringify!($diag));
    }};
}

pub(crate) use assert_error_labels;
