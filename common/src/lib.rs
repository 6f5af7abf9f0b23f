use anyhow::bail;
use itertools::iproduct;
use rand::Rng;
use rand::prelude::IndexedRandom;
use std::collections::HashSet;

/// A (row, column) coordinate on the puzzle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

/// A logical assertion that exactly `count` of `cells` are mines.
///
/// Statements shrink in place as cells are resolved: a confirmed mine is
/// removed and the count decremented, a confirmed safe cell is removed with
/// the count untouched. A statement that drains to an empty cell set stays
/// in the knowledge base but can never contribute anything again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    cells: HashSet<Point>,
    count: i32,
}

impl Statement {
    pub fn new(cells: HashSet<Point>, count: i32) -> Self {
        Statement { cells, count }
    }

    /// Every member cell is a mine when the count covers the whole set.
    pub fn implied_mines(&self) -> Option<&HashSet<Point>> {
        if self.count > 0 && self.count as usize == self.cells.len() {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// Every member cell is safe when no mines remain among them.
    pub fn implied_safe(&self) -> Option<&HashSet<Point>> {
        if self.count == 0 { Some(&self.cells) } else { None }
    }

    /// Narrows the statement given that `cell` is a mine. The caller must
    /// have confirmed that fact independently; the statement doesn't check.
    pub fn mark_mine(&mut self, cell: Point) {
        if self.cells.remove(&cell) {
            self.count -= 1;
        }
    }

    /// Narrows the statement given that `cell` is safe.
    pub fn mark_safe(&mut self, cell: Point) {
        self.cells.remove(&cell);
    }

    pub fn cells(&self) -> &HashSet<Point> {
        &self.cells
    }

    pub fn count(&self) -> i32 {
        self.count
    }
}

/// Everything the solver has concluded so far about one puzzle instance:
/// the cells it has opened, the cells resolved either way, and the open
/// statements that still constrain the rest.
#[derive(Debug, Default, Clone)]
pub struct KnowledgeBase {
    moves_made: HashSet<Point>,
    known_mines: HashSet<Point>,
    known_safe: HashSet<Point>,
    statements: Vec<Statement>,
}

impl KnowledgeBase {
    /// Records that `cell` is a mine and purges it from every statement.
    /// Idempotent; returns whether the fact was new.
    pub fn confirm_mine(&mut self, cell: Point) -> bool {
        let new = self.known_mines.insert(cell);
        if new {
            for statement in &mut self.statements {
                statement.mark_mine(cell);
            }
        }
        new
    }

    /// Records that `cell` is safe and purges it from every statement.
    /// Idempotent; returns whether the fact was new.
    pub fn confirm_safe(&mut self, cell: Point) -> bool {
        let new = self.known_safe.insert(cell);
        if new {
            for statement in &mut self.statements {
                statement.mark_safe(cell);
            }
        }
        new
    }

    /// Appends `statement` unless a structurally equal one is stored.
    /// The statement list stays small enough that a linear scan beats
    /// maintaining a canonical index.
    pub fn add_statement(&mut self, statement: Statement) -> bool {
        if self.statements.contains(&statement) {
            return false;
        }
        self.statements.push(statement);
        true
    }

    /// Runs direct extraction and subset elimination to a fixed point.
    ///
    /// Each pass first resolves every trivial statement, then derives the
    /// difference statement for every superset/subset pair. Derivation only
    /// ever adds statements and duplicates are dropped, so the number of
    /// passes is finite for any finite grid. Returns the pass count.
    pub fn infer(&mut self) -> usize {
        let mut passes = 0;
        loop {
            passes += 1;
            let extracted = self.extract();
            let derived = self.eliminate_subsets();
            if !extracted && !derived {
                break;
            }
        }
        passes
    }

    /// Direct extraction: a statement whose count is zero resolves all of
    /// its cells safe; one whose count equals its size resolves them all
    /// mines. Confirming a cell narrows the other statements in place, so
    /// later statements in the same sweep see the update.
    fn extract(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.statements.len() {
            let safe: Vec<Point> = self.statements[i]
                .implied_safe()
                .map_or_else(Vec::new, |cells| cells.iter().copied().collect());
            for cell in safe {
                changed |= self.confirm_safe(cell);
            }
            let mines: Vec<Point> = self.statements[i]
                .implied_mines()
                .map_or_else(Vec::new, |cells| cells.iter().copied().collect());
            for cell in mines {
                changed |= self.confirm_mine(cell);
            }
        }
        changed
    }

    /// Subset elimination: when B's cells are contained in A's and both
    /// counts are nonzero, "exactly A.count of A" minus "exactly B.count
    /// of B" yields "exactly A.count - B.count of A - B". Zero-count
    /// operands are skipped; extraction has already exhausted them.
    ///
    /// Inconsistent observations can push a derived count negative. Such a
    /// statement is stored like any other and stays inert: neither
    /// extraction guard can ever fire on it.
    fn eliminate_subsets(&mut self) -> bool {
        let mut derived: Vec<Statement> = Vec::new();
        for (a, b) in iproduct!(&self.statements, &self.statements) {
            if a == b || a.count == 0 || b.count == 0 || !b.cells.is_subset(&a.cells) {
                continue;
            }
            let candidate = Statement::new(
                a.cells.difference(&b.cells).copied().collect(),
                a.count - b.count,
            );
            if !self.statements.contains(&candidate) && !derived.contains(&candidate) {
                derived.push(candidate);
            }
        }
        let changed = !derived.is_empty();
        self.statements.extend(derived);
        changed
    }

    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    pub fn known_mines(&self) -> &HashSet<Point> {
        &self.known_mines
    }

    pub fn known_safe(&self) -> &HashSet<Point> {
        &self.known_safe
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }
}

/// The solver facade. Owns the knowledge base for one board and exposes
/// the three operations the driver loop needs: feed an observation back
/// in, ask for a certain move, ask for a guess.
pub struct Solver {
    height: usize,
    width: usize,
    kb: KnowledgeBase,
}

impl Solver {
    pub fn new(height: usize, width: usize) -> Self {
        Solver {
            height,
            width,
            kb: KnowledgeBase::default(),
        }
    }

    /// Records that opening `cell` revealed `count` mines among its
    /// neighbors, then derives every conclusion reachable by direct
    /// extraction and subset elimination.
    ///
    /// The new statement covers the in-bounds neighbors that are still
    /// unresolved; neighbors already confirmed as mines are dropped and
    /// debit the count, neighbors already safe or already opened are
    /// dropped without touching it.
    ///
    /// Fails on an out-of-bounds `cell` without touching any state.
    pub fn record_observation(&mut self, cell: Point, count: usize) -> anyhow::Result<()> {
        if cell.row >= self.height || cell.col >= self.width {
            bail!(
                "cell ({}, {}) is outside the {}x{} grid",
                cell.row,
                cell.col,
                self.height,
                self.width
            );
        }

        self.kb.moves_made.insert(cell);
        self.kb.confirm_safe(cell);

        let mut count = count as i32;
        let mut frontier = HashSet::new();
        for neighbor in neighbors(self.height, self.width, cell) {
            if self.kb.known_mines.contains(&neighbor) {
                count -= 1;
            } else if !self.kb.known_safe.contains(&neighbor)
                && !self.kb.moves_made.contains(&neighbor)
            {
                frontier.insert(neighbor);
            }
        }

        self.kb.add_statement(Statement::new(frontier, count));
        self.kb.infer();
        Ok(())
    }

    /// Returns a cell known to be safe that hasn't been opened yet.
    /// Which one is unspecified when several qualify.
    pub fn choose_safe_move(&self) -> Option<Point> {
        self.kb
            .known_safe
            .iter()
            .find(|cell| !self.kb.moves_made.contains(cell))
            .copied()
    }

    /// Returns a uniformly random cell that hasn't been opened and isn't
    /// a known mine, or `None` when no such cell remains.
    pub fn choose_random_move(&self, rng: &mut impl Rng) -> Option<Point> {
        let candidates: Vec<Point> = iproduct!(0..self.height, 0..self.width)
            .map(|(row, col)| Point { row, col })
            .filter(|cell| {
                !self.kb.moves_made.contains(cell) && !self.kb.known_mines.contains(cell)
            })
            .collect();
        candidates.choose(rng).copied()
    }

    pub fn moves_made(&self) -> &HashSet<Point> {
        self.kb.moves_made()
    }

    pub fn known_mines(&self) -> &HashSet<Point> {
        self.kb.known_mines()
    }

    pub fn known_safe(&self) -> &HashSet<Point> {
        self.kb.known_safe()
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }
}

// --- The board environment ---

/// The game environment: holds the ground-truth mine layout and answers
/// neighbor-count queries. The solver never reads this directly; the
/// driver relays counts one observation at a time.
pub struct Board {
    pub height: usize,
    pub width: usize,
    mines: HashSet<Point>,
    flagged: HashSet<Point>,
}

impl Board {
    /// Lays out `n_mines` distinct mines uniformly at random.
    pub fn new(height: usize, width: usize, n_mines: usize, rng: &mut impl Rng) -> Self {
        if n_mines >= height * width {
            panic!("Mine count must be less than the number of cells on the board.");
        }
        let mut mines = HashSet::new();
        while mines.len() < n_mines {
            mines.insert(Point {
                row: rng.random_range(0..height),
                col: rng.random_range(0..width),
            });
        }
        Board {
            height,
            width,
            mines,
            flagged: HashSet::new(),
        }
    }

    /// Builds a board with a fixed mine layout.
    pub fn with_mines(height: usize, width: usize, mines: HashSet<Point>) -> Self {
        Board {
            height,
            width,
            mines,
            flagged: HashSet::new(),
        }
    }

    pub fn is_mine(&self, cell: Point) -> bool {
        self.mines.contains(&cell)
    }

    /// The number of mines within one row and column of `cell`, not
    /// counting the cell itself.
    pub fn nearby_mines(&self, cell: Point) -> usize {
        neighbors(self.height, self.width, cell)
            .filter(|neighbor| self.mines.contains(neighbor))
            .count()
    }

    pub fn flag(&mut self, cell: Point) {
        self.flagged.insert(cell);
    }

    pub fn is_flagged(&self, cell: Point) -> bool {
        self.flagged.contains(&cell)
    }

    /// The game is won once the flags match the true mine set exactly.
    pub fn won(&self) -> bool {
        self.flagged == self.mines
    }

    pub fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }
}

/// All valid neighbor coordinates of `cell` on a `height` x `width` grid,
/// clipped at the edges and excluding the cell itself.
pub fn neighbors(height: usize, width: usize, cell: Point) -> impl Iterator<Item = Point> {
    iproduct!(-1isize..=1, -1isize..=1).filter_map(move |(dr, dc)| {
        if dr == 0 && dc == 0 {
            return None;
        }
        let row = cell.row as isize + dr;
        let col = cell.col as isize + dc;
        if row >= 0 && row < height as isize && col >= 0 && col < width as isize {
            Some(Point {
                row: row as usize,
                col: col as usize,
            })
        } else {
            None
        }
    })
}
