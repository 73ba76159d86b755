use std::collections::BTreeMap;
use std::sync::LazyLock;

/// A named table of test cases, looked up from within `rstest` cases by function name.
///
/// Usage pattern:
///
/// ```ignore
/// static MY_TEST_CASES: LazyTestCases<MyCase> = test_case_map!(
///     "basic", MyCase { ... },
///     "edge", MyCase { ... },
/// );
///
/// #[googletest::test]
/// #[rstest]
/// #[case::basic(function_name!())]
/// #[case::edge(function_name!())]
/// fn test_something(#[case] test_function_name: &str) {
///     let tc = MY_TEST_CASES.get_test_case(test_function_name);
///     ...
/// }
/// ```
///
/// `rstest` generates one function per `#[case::name]` inside a module named after the test, so
/// `function_name!` evaluates to a path ending in `case_<n>_<name>`; `get_test_case` recovers
/// `<name>` from it.
#[derive(Debug)]
pub(crate) struct TestCases<T: 'static> {
    cases: BTreeMap<&'static str, T>,
}

pub(crate) type LazyTestCases<T> = LazyLock<TestCases<T>>;

impl<T> TestCases<T> {
    pub(crate) fn new(cases: Vec<(&'static str, T)>) -> Self {
        let mut map = BTreeMap::new();
        for (name, case) in cases {
            let previous = map.insert(name, case);
            assert!(previous.is_none(), "duplicate test case name {name:?}");
        }
        TestCases { cases: map }
    }

    /// Look up the test case for the currently running `rstest` case.
    pub(crate) fn get_test_case(&self, function_name: &str) -> &T {
        let case_fn = function_name.rsplit("::").next().unwrap_or(function_name);
        let case_name = case_fn
            .strip_prefix("case_")
            .map(|rest| rest.trim_start_matches(|c: char| c.is_ascii_digit()))
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(case_fn);
        self.cases.get(case_name).unwrap_or_else(|| {
            panic!("no test case named {case_name:?} (from function {function_name:?})")
        })
    }

    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.cases.len()
    }
}

/// Builds a [`LazyTestCases`] table from `"name", case` pairs.
macro_rules! test_case_map {
    ($($name:literal, $case:expr),+ $(,)?) => {
        std::sync::LazyLock::new(|| {
            $crate::testutil::TestCases::new(vec![$(($name, $case)),+])
        })
    };
}

pub(crate) use test_case_map;
