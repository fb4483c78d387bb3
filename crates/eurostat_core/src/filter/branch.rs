use crate::catalog::DimensionCatalog;

/// Allowed values for a single dimension within a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskEntry {
    /// Dimension has no place in the filter path.
    Virtual,
    /// Allowed values, empty for a wildcard.
    Values(Vec<String>),
}

impl MaskEntry {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, MaskEntry::Values(values) if values.is_empty())
    }
}

/// One alternative of a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBranch {
    /// Mask indexed by catalog index, same length as the catalog.
    pub mask: Vec<MaskEntry>,
    pub start_period: Option<String>,
    pub end_period: Option<String>,
}

impl FilterBranch {
    /// Create a branch matching everything.
    pub fn new(catalog: &DimensionCatalog) -> Self {
        let mask = catalog
            .dimensions()
            .iter()
            .map(|dim| {
                if dim.is_virtual() {
                    MaskEntry::Virtual
                } else {
                    MaskEntry::Values(Vec::new())
                }
            })
            .collect();

        FilterBranch {
            mask,
            start_period: None,
            end_period: None,
        }
    }

    /// If this branch doesn't restrict anything.
    pub fn is_empty(&self) -> bool {
        self.start_period.is_none()
            && self.end_period.is_none()
            && self
                .mask
                .iter()
                .all(|entry| matches!(entry, MaskEntry::Virtual) || entry.is_wildcard())
    }

    /// Add a value to the mask of a dimension.
    ///
    /// Values accumulate, so repeated calls for the same dimension widen the
    /// branch to any of the values. Returns false if the dimension is virtual.
    pub fn push_value(&mut self, idx: usize, value: String) -> bool {
        match self.mask.get_mut(idx) {
            Some(MaskEntry::Values(values)) => {
                values.push(value);
                true
            }
            _ => false,
        }
    }
}

/// Ordered branches with a cursor on the branch currently being written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBranchSet {
    branches: Vec<FilterBranch>,
    cursor: usize,
    supported: bool,
}

impl FilterBranchSet {
    /// Create a set with a single empty branch.
    pub fn new(catalog: &DimensionCatalog) -> Self {
        FilterBranchSet {
            branches: vec![FilterBranch::new(catalog)],
            cursor: 0,
            supported: true,
        }
    }

    pub fn current_mut(&mut self) -> &mut FilterBranch {
        &mut self.branches[self.cursor]
    }

    /// Start a new empty branch and move the cursor to it.
    pub fn push_branch(&mut self, catalog: &DimensionCatalog) {
        self.branches.push(FilterBranch::new(catalog));
        self.cursor = self.branches.len() - 1;
    }

    pub fn branches(&self) -> &[FilterBranch] {
        &self.branches
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub(crate) fn set_supported(&mut self, supported: bool) {
        self.supported = supported;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testutil::population_catalog;

    #[test]
    fn new_branch_masks_virtual() {
        let catalog = population_catalog();
        let branch = FilterBranch::new(&catalog);

        assert_eq!(catalog.len(), branch.mask.len());
        assert_eq!(MaskEntry::Virtual, branch.mask[5]);
        assert_eq!(MaskEntry::Virtual, branch.mask[6]);
        assert!(branch.mask[4].is_wildcard());
        assert!(branch.is_empty());
    }

    #[test]
    fn push_values() {
        let catalog = population_catalog();
        let mut branch = FilterBranch::new(&catalog);

        assert!(branch.push_value(4, "AL".to_string()));
        assert!(branch.push_value(4, "DE".to_string()));
        assert!(!branch.push_value(5, "country".to_string()));
        assert!(!branch.push_value(100, "x".to_string()));

        assert_eq!(
            MaskEntry::Values(vec!["AL".to_string(), "DE".to_string()]),
            branch.mask[4]
        );
        assert!(!branch.is_empty());
    }

    #[test]
    fn time_bounds_not_empty() {
        let catalog = population_catalog();
        let mut branch = FilterBranch::new(&catalog);
        branch.end_period = Some("2001".to_string());
        assert!(!branch.is_empty());
    }

    #[test]
    fn cursor_follows_pushed_branch() {
        let catalog = population_catalog();
        let mut set = FilterBranchSet::new(&catalog);
        set.current_mut().push_value(0, "A".to_string());
        set.push_branch(&catalog);
        set.current_mut().push_value(0, "M".to_string());

        assert_eq!(2, set.branches().len());
        assert_eq!(MaskEntry::Values(vec!["A".to_string()]), set.branches()[0].mask[0]);
        assert_eq!(MaskEntry::Values(vec!["M".to_string()]), set.branches()[1].mask[0]);
    }
}
