// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Split planning: cut points between pages, fixed-size chunks, and page
// range extraction strings like "1-3,5".

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use blattwerk_core::BlattwerkError;
use blattwerk_core::error::Result;

/// Where a document is cut into parts. A cut point `n` ends a part after
/// page `n` (1-indexed), so valid cuts lie in `1..page_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    page_count: u32,
    cuts: BTreeSet<u32>,
}

impl SplitPlan {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            cuts: BTreeSet::new(),
        }
    }

    /// Cut after every `pages_per_part` pages.
    pub fn every(page_count: u32, pages_per_part: u32) -> Result<Self> {
        if pages_per_part == 0 {
            return Err(BlattwerkError::validation("Parts must hold at least one page."));
        }
        let mut plan = Self::new(page_count);
        plan.cuts = (1..page_count)
            .filter(|page| page % pages_per_part == 0)
            .collect();
        Ok(plan)
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn cuts(&self) -> impl Iterator<Item = u32> + '_ {
        self.cuts.iter().copied()
    }

    fn is_valid_cut(&self, after_page: u32) -> bool {
        after_page >= 1 && after_page < self.page_count
    }

    /// Returns whether the cut was added (false if invalid or present).
    pub fn add_cut(&mut self, after_page: u32) -> bool {
        self.is_valid_cut(after_page) && self.cuts.insert(after_page)
    }

    pub fn remove_cut(&mut self, after_page: u32) -> bool {
        self.cuts.remove(&after_page)
    }

    /// Flip a cut point; out-of-range pages are ignored. Returns whether the
    /// cut is now present.
    pub fn toggle_cut(&mut self, after_page: u32) -> bool {
        if self.cuts.remove(&after_page) {
            return false;
        }
        self.add_cut(after_page)
    }

    /// Number of output files the plan produces.
    pub fn part_count(&self) -> usize {
        if self.page_count == 0 {
            0
        } else {
            self.cuts.len() + 1
        }
    }

    /// The 1-indexed page ranges of each part, in order.
    pub fn groups(&self) -> Vec<RangeInclusive<u32>> {
        if self.page_count == 0 {
            return Vec::new();
        }
        let mut groups = Vec::with_capacity(self.part_count());
        let mut start = 1;
        for cut in &self.cuts {
            groups.push(start..=*cut);
            start = cut + 1;
        }
        groups.push(start..=self.page_count);
        groups
    }
}

/// Parse a page selection such as `"1-3, 5, 8-"` against a document of
/// `page_count` pages. An open end runs to the last page. Pages keep the
/// order written; duplicates are kept once, at their first mention.
pub fn parse_page_ranges(ranges: &str, page_count: u32) -> Result<Vec<u32>> {
    let invalid = |part: &str| {
        BlattwerkError::validation(format!(
            "'{part}' is not a page or range between 1 and {page_count}"
        ))
    };
    let page = |text: &str, part: &str| -> Result<u32> {
        let value: u32 = text.trim().parse().map_err(|_| invalid(part))?;
        if (1..=page_count).contains(&value) {
            Ok(value)
        } else {
            Err(invalid(part))
        }
    };

    let mut seen = BTreeSet::new();
    let mut pages = Vec::new();
    for part in ranges.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let range = match part.split_once('-') {
            Some((start, end)) => {
                let start = if start.trim().is_empty() { 1 } else { page(start, part)? };
                let end = if end.trim().is_empty() { page_count } else { page(end, part)? };
                if start > end {
                    return Err(invalid(part));
                }
                start..=end
            }
            None => {
                let single = page(part, part)?;
                single..=single
            }
        };
        pages.extend(range.filter(|number| seen.insert(*number)));
    }
    if pages.is_empty() {
        return Err(BlattwerkError::validation("Choose at least one page."));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_partition_the_document() {
        let mut plan = SplitPlan::new(8);
        assert!(plan.add_cut(2));
        assert!(plan.add_cut(5));
        assert_eq!(plan.groups(), vec![1..=2, 3..=5, 6..=8]);
        assert_eq!(plan.part_count(), 3);
    }

    #[test]
    fn boundary_cuts_are_rejected() {
        let mut plan = SplitPlan::new(4);
        assert!(!plan.add_cut(0));
        assert!(!plan.add_cut(4));
        assert!(!plan.toggle_cut(9));
        assert_eq!(plan.groups(), vec![1..=4]);
    }

    #[test]
    fn toggle_flips_a_cut() {
        let mut plan = SplitPlan::new(5);
        assert!(plan.toggle_cut(3));
        assert!(!plan.toggle_cut(3));
        assert_eq!(plan.cuts().count(), 0);
        assert!(!plan.remove_cut(3));
    }

    #[test]
    fn every_n_pages() {
        let plan = SplitPlan::every(7, 3).expect("plan");
        assert_eq!(plan.groups(), vec![1..=3, 4..=6, 7..=7]);
        assert!(SplitPlan::every(7, 0).is_err());
        assert_eq!(SplitPlan::every(3, 5).expect("plan").groups(), vec![1..=3]);
    }

    #[test]
    fn page_ranges_parse_in_written_order() {
        assert_eq!(parse_page_ranges("1-3,5", 8).expect("parse"), vec![1, 2, 3, 5]);
        assert_eq!(parse_page_ranges(" 7- , 2 ,2", 8).expect("parse"), vec![7, 8, 2]);
        assert_eq!(parse_page_ranges("-2", 8).expect("parse"), vec![1, 2]);
    }

    #[test]
    fn bad_page_ranges_are_validation_errors() {
        for ranges in ["", "0", "9", "3-1", "a-b", " , "] {
            assert!(
                matches!(parse_page_ranges(ranges, 8), Err(BlattwerkError::Validation(_))),
                "{ranges:?}"
            );
        }
    }
}
