use rooks_search::{Checkpoint, Directive, Grid, Job, Outcome};

/// Exhaustive search over every pillar and height, checking legality with
/// `Grid::place` only.
fn brute(size: usize) -> u32 {
    fn go(grid: &Grid, cell: usize, size: usize, best: &mut u32) {
        let cells = size * size;
        let placed = grid.rook_count();
        if placed + (cells - cell) as u32 <= *best {
            return;
        }
        if cell == cells {
            *best = placed;
            return;
        }
        let (x, y) = ((cell / size) as u8, (cell % size) as u8);
        for z in 0..size as u8 {
            let mut next = grid.clone();
            if next.place(x, y, z).is_ok() {
                go(&next, cell + 1, size, best);
            }
        }
        go(grid, cell + 1, size, best);
    }

    let mut best = 0;
    go(&Grid::new(size).unwrap(), 0, size, &mut best);
    best
}

#[derive(Default)]
struct Recorder {
    reports: Vec<u32>,
    grids: Vec<Grid>,
}

impl Checkpoint for Recorder {
    fn poll(&mut self, _grid: &Grid, _optimum: &mut u32) -> Directive {
        Directive::Continue
    }

    fn improved(&mut self, grid: &Grid, optimum: u32) -> Directive {
        self.reports.push(optimum);
        self.grids.push(grid.clone());
        Directive::Continue
    }
}

fn solve(size: usize, guess: u32) -> (u32, Recorder) {
    let mut recorder = Recorder::default();
    let report = Job::initial(size, guess).unwrap().run(&mut recorder);
    assert!(matches!(report.outcome, Outcome::Completed));
    (report.optimum, recorder)
}

#[test]
fn engine_agrees_with_brute_force() {
    for size in 1..=4 {
        assert_eq!(solve(size, 0).0, brute(size), "size {size}");
    }
}

#[test]
fn known_optima() {
    let optima: Vec<u32> = (1..=5).map(|size| solve(size, 0).0).collect();
    assert_eq!(optima, vec![1, 2, 6, 9, 12]);
}

#[test]
fn reported_optima_strictly_increase() {
    let (_, recorder) = solve(5, 0);
    assert_eq!(recorder.reports, vec![5, 10, 11, 12]);
    assert!(recorder.reports.windows(2).all(|w| w[0] < w[1]));

    let (_, recorder) = solve(4, 0);
    assert_eq!(recorder.reports, vec![4, 8, 9]);
}

#[test]
fn improved_grids_are_legal_placements() {
    let (_, recorder) = solve(5, 0);
    for (grid, &reported) in recorder.grids.iter().zip(&recorder.reports) {
        let rooks = grid.rooks();
        assert_eq!(rooks.len() as u32, reported);
        assert_eq!(grid.rook_count(), reported);

        let mut replay = Grid::new(grid.size() as usize).unwrap();
        for &(x, y, z) in &rooks {
            replay.place(x, y, z).unwrap();
        }
        assert_eq!(replay.rooks(), rooks);
    }
}

#[test]
fn guess_at_or_above_optimum_reports_nothing() {
    let (optimum, recorder) = solve(4, 9);
    assert_eq!(optimum, 9);
    assert!(recorder.reports.is_empty());

    let (optimum, recorder) = solve(3, 20);
    assert_eq!(optimum, 20);
    assert!(recorder.grids.is_empty());
}

#[test]
fn guess_below_optimum_still_finds_it() {
    let (optimum, recorder) = solve(5, 10);
    assert_eq!(optimum, 12);
    assert_eq!(recorder.reports, vec![11, 12]);
}
