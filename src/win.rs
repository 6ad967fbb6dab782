//! Win detection for m,n,k,p,q games.
//!
//! Given a finished board, computes the set of cells the UI should highlight
//! as part of a winning line, as opposed to merely occupied.

use crate::model::{Board, RuleSet};
use std::collections::BTreeSet;
use tracing::instrument;

/// The four line families scanned through each cell.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Returns every cell that lies on a winning line for `winner`.
///
/// A stone belongs to a winning line when the maximal run of `winner`'s
/// stones through it — horizontally, vertically, or along either diagonal —
/// reaches length `k`. With `exact` rule sets the run must be exactly `k`;
/// otherwise `k` or more qualifies.
///
/// Runs O(m·n·k): each occupied cell scans a window of radius `k − 1`
/// (radius `k` for exact rule sets, to rule out over-long runs) in four
/// directions, and cells already classified by an earlier run are skipped.
#[instrument(skip(board, rules), fields(k = *rules.k(), exact = *rules.exact()))]
pub fn winning_cells(board: &Board, rules: &RuleSet, winner: u32) -> BTreeSet<(usize, usize)> {
    let mut winning = BTreeSet::new();
    let k = *rules.k();
    if k == 0 {
        return winning;
    }
    let stone = winner as u8;

    for x in 0..board.width() {
        for y in 0..board.height() {
            if board.get(x, y) != Some(stone) || winning.contains(&(x, y)) {
                continue;
            }
            for (dx, dy) in DIRECTIONS {
                let run = run_through(board, stone, x, y, dx, dy, rules);
                let qualifies = if *rules.exact() {
                    run.len() == k
                } else {
                    run.len() >= k
                };
                if qualifies {
                    winning.extend(run);
                    break;
                }
            }
        }
    }

    winning
}

/// Collects the maximal consecutive run of `stone` through `(x, y)` along
/// `(dx, dy)`, walking at most `reach` steps each way.
fn run_through(
    board: &Board,
    stone: u8,
    x: usize,
    y: usize,
    dx: isize,
    dy: isize,
    rules: &RuleSet,
) -> Vec<(usize, usize)> {
    // One extra step of reach in exact mode: a run of k + 1 must be seen in
    // full to be rejected.
    let reach = if *rules.exact() { *rules.k() } else { *rules.k() - 1 };

    let mut run = vec![(x, y)];
    for sign in [-1isize, 1] {
        for step in 1..=reach as isize {
            let tx = x as isize + dx * step * sign;
            let ty = y as isize + dy * step * sign;
            if tx < 0 || ty < 0 {
                break;
            }
            if board.get(tx as usize, ty as usize) != Some(stone) {
                break;
            }
            run.push((tx as usize, ty as usize));
        }
    }
    run
}
