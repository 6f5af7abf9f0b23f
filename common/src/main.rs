use minededuce::*;

const HEIGHT: usize = 8;
const WIDTH: usize = 8;
const MINES: usize = 8;

fn main() {
    // --- 1. Initialization ---
    let mut rng = rand::rng();
    let mut board = Board::new(HEIGHT, WIDTH, MINES, &mut rng);
    let mut solver = Solver::new(HEIGHT, WIDTH);

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: play deduced-safe cells, guess randomly otherwise.");

    // --- 2. Game Loop ---
    let mut move_count = 0;
    loop {
        // Flag every mine the solver has deduced so far.
        for &mine in solver.known_mines() {
            board.flag(mine);
        }
        if board.won() {
            print_board(&board, &solver);
            println!("\n--- Game Over ---");
            println!("Result: all {} mines flagged. The bot won!", MINES);
            break;
        }

        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        // --- 3. Bot's Decision Logic ---
        let cell = match solver.choose_safe_move() {
            Some(cell) => {
                println!("Logic found a guaranteed safe cell.");
                cell
            }
            None => match solver.choose_random_move(&mut rng) {
                Some(cell) => {
                    println!("No deduced-safe move available. Making a random guess...");
                    cell
                }
                None => {
                    println!("No valid moves left for the bot to make.");
                    println!("\n--- Game Over ---");
                    println!("Result: the game ended unexpectedly.");
                    break;
                }
            },
        };

        // --- 4. Execute the Chosen Move ---
        println!("Bot opens ({}, {})...", cell.row, cell.col);
        if board.is_mine(cell) {
            print_board(&board, &solver);
            println!("\n--- Game Over ---");
            println!("Result: the bot hit a mine and lost.");
            break;
        }

        let count = board.nearby_mines(cell);
        solver.record_observation(cell, count).unwrap();
        print_board(&board, &solver);
    }
}

/// Renders the bot's view of the board: opened cells show their neighbor
/// count, deduced mines show a flag, everything else stays hidden.
fn print_board(board: &Board, solver: &Solver) {
    print!("   ");
    for col in 0..board.width {
        print!("{:^3}", col);
    }
    println!("\n  +{}", "---".repeat(board.width));

    for row in 0..board.height {
        print!("{:^2}|", row);
        for col in 0..board.width {
            let cell = Point { row, col };
            let display = if solver.moves_made().contains(&cell) {
                format!(" {} ", board.nearby_mines(cell))
            } else if board.is_flagged(cell) {
                " ⚑ ".to_string()
            } else {
                " ■ ".to_string()
            };
            print!("{}", display);
        }
        println!();
    }
}
