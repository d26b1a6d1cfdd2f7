//! # Page Break Decisions
//!
//! Where to split a run of equal-height lines (a code block's body) that
//! does not fit in the space left on the page.

/// What to do with a line run that may not fit on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// All remaining lines fit here.
    Place,
    /// Start the run on the next page.
    MoveToNextPage,
    /// Put this many lines here and continue on the next page.
    Split { lines_on_current_page: usize },
}

/// Decide how many of `line_count` lines of `line_height` go into
/// `available` points.
///
/// Never leaves fewer than `min_orphan_lines` at the bottom of this page or
/// fewer than `min_widow_lines` at the top of the next one, unless the run
/// is too short to satisfy both.
pub fn decide_break(
    available: f64,
    line_height: f64,
    line_count: usize,
    min_orphan_lines: usize,
    min_widow_lines: usize,
) -> BreakDecision {
    if line_count == 0 || line_height <= 0.0 {
        return BreakDecision::Place;
    }

    let fit = if available <= 0.0 {
        0
    } else {
        // Tolerate rounding when the space is an exact multiple.
        ((available + 1e-9) / line_height).floor() as usize
    };

    if fit >= line_count {
        return BreakDecision::Place;
    }

    if fit == 0 || fit < min_orphan_lines {
        return BreakDecision::MoveToNextPage;
    }

    let carried = line_count - fit;
    if carried < min_widow_lines {
        let adjusted = fit.saturating_sub(min_widow_lines - carried);
        if adjusted == 0 || adjusted < min_orphan_lines {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split {
            lines_on_current_page: adjusted,
        };
    }

    BreakDecision::Split {
        lines_on_current_page: fit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_fits() {
        assert_eq!(decide_break(120.0, 12.0, 10, 2, 2), BreakDecision::Place);
    }

    #[test]
    fn split_at_capacity() {
        assert_eq!(
            decide_break(60.0, 12.0, 10, 2, 2),
            BreakDecision::Split {
                lines_on_current_page: 5
            }
        );
    }

    #[test]
    fn orphan_control() {
        // One line fits but at least two must stay together.
        assert_eq!(decide_break(15.0, 12.0, 10, 2, 2), BreakDecision::MoveToNextPage);
    }

    #[test]
    fn widow_control() {
        // 9 of 10 fit, leaving 1 widow (min=2): pull one back.
        assert_eq!(
            decide_break(108.0, 12.0, 10, 2, 2),
            BreakDecision::Split {
                lines_on_current_page: 8
            }
        );
    }

    #[test]
    fn no_space_moves() {
        assert_eq!(decide_break(-3.0, 12.0, 4, 1, 1), BreakDecision::MoveToNextPage);
    }

    #[test]
    fn empty_run_is_placed() {
        assert_eq!(decide_break(0.0, 12.0, 0, 2, 2), BreakDecision::Place);
    }
}
