use std::path::Path;

use kilo::config::RESERVED_ROWS;
use kilo::terminal::{clear_screen, window_size, RawModeGuard};
use kilo::{Editor, Error};

fn main() {
    let code = match try_main() {
        Ok(()) => 0,
        Err(e) => {
            let _ = clear_screen();
            eprintln!("{e}");
            1
        }
    };
    std::process::exit(code);
}

fn try_main() -> Result<(), Error> {
    let _raw_guard = RawModeGuard::enable()?;
    let (rows, cols) = window_size()?;
    let screenrows = rows.saturating_sub(RESERVED_ROWS);

    let mut editor = Editor::new(screenrows, cols);

    if let Some(path) = std::env::args().nth(1) {
        editor.open(Path::new(&path))?;
    }

    editor.run()?;
    clear_screen()?;
    Ok(())
}
