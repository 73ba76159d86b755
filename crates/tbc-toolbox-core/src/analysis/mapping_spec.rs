use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::field::FieldId;

use super::{AnalysisError, AnalyzerResult};

/// One item of a field-mapping specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingItem {
    /// An inclusive run of source field IDs to pass through in order.
    Range {
        /// First field of the run.
        first: FieldId,
        /// Last field of the run (inclusive).
        last: FieldId,
    },
    /// A run of synthesized black fields.
    Pad {
        /// Number of fields to pad; always even (two per padded frame).
        fields: u32,
    },
}

impl fmt::Display for MappingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingItem::Range { first, last } => write!(f, "{first}-{last}"),
            MappingItem::Pad { fields } => write!(f, "PAD_{fields}"),
        }
    }
}

/// A field-mapping specification: the ordered recipe a field-map stage follows to rebuild a
/// playable sequence from a raw capture.
///
/// The grammar is `Item ("," Item)*` where an item is either an inclusive field range `A-B`
/// (`A <= B`) or a padding token `PAD_N` (`N` even and positive).  [`MappingSpec::parse`] and
/// the [`fmt::Display`] impl round-trip canonically.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingSpec {
    items: Vec<MappingItem>,
}

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("range regex"));
static PAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^PAD_(\d+)$").expect("pad regex"));

impl MappingSpec {
    /// Builds a spec from items, validating each.
    pub fn new(items: Vec<MappingItem>) -> AnalyzerResult<Self> {
        for item in &items {
            match *item {
                MappingItem::Range { first, last } => {
                    snafu::ensure!(
                        first.is_valid() && last.is_valid() && first <= last,
                        super::SpecSyntaxSnafu { item: item.to_string() }
                    );
                }
                MappingItem::Pad { fields } => {
                    snafu::ensure!(
                        fields > 0 && fields % 2 == 0,
                        super::SpecSyntaxSnafu { item: item.to_string() }
                    );
                }
            }
        }
        Ok(MappingSpec { items })
    }

    /// Parses the textual grammar.
    pub fn parse(text: &str) -> AnalyzerResult<Self> {
        snafu::ensure!(
            !text.trim().is_empty(),
            super::SpecSyntaxSnafu { item: String::from("<empty>") }
        );
        let mut items = Vec::new();
        for raw in text.split(',') {
            let token = raw.trim();
            if let Some(captures) = RANGE_RE.captures(token) {
                let first: u64 = captures[1]
                    .parse()
                    .map_err(|_| spec_syntax_error(token))?;
                let last: u64 = captures[2]
                    .parse()
                    .map_err(|_| spec_syntax_error(token))?;
                items.push(MappingItem::Range {
                    first: FieldId::new(first),
                    last: FieldId::new(last),
                });
            } else if let Some(captures) = PAD_RE.captures(token) {
                let fields: u32 = captures[1]
                    .parse()
                    .map_err(|_| spec_syntax_error(token))?;
                items.push(MappingItem::Pad { fields });
            } else {
                return Err(spec_syntax_error(token));
            }
        }
        Self::new(items)
    }

    /// The items in order.
    pub fn items(&self) -> &[MappingItem] {
        &self.items
    }

    /// Whether the spec contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of output fields the spec describes.
    pub fn total_fields(&self) -> u64 {
        self.items
            .iter()
            .map(|item| match *item {
                MappingItem::Range { first, last } => last.value() - first.value() + 1,
                MappingItem::Pad { fields } => u64::from(fields),
            })
            .sum()
    }
}

fn spec_syntax_error(token: &str) -> AnalysisError {
    super::SpecSyntaxSnafu { item: token.to_owned() }.build()
}

impl fmt::Display for MappingSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.items {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{item}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for MappingSpec {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
