use glob::Pattern;

/// Which sheets of a workbook to read.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name patterns, `None` accepts every sheet
    pub(crate) sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read
    pub(crate) sheet_limit: Option<usize>,
}

impl Criteria {
    /// Returns true if no patterns are set or the name matches any of them.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }

    /// Returns true once `count` accepted sheets reach the limit.
    pub(crate) fn is_full(&self, count: usize) -> bool {
        self.sheet_limit.map(|limit| count >= limit).unwrap_or(false)
    }
}
