use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use log::{error, info};

use pagedb::repl::{process_line, ReplAction, PROMPT};
use pagedb::Table;

const DEFAULT_DB_FILE: &str = "database.db";

struct InputBuffer {
    buffer: String,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Prints the prompt and reads one line. Returns `false` at end of input.
    fn read_input(&mut self, input: &mut impl BufRead) -> io::Result<bool> {
        self.buffer.clear();
        print!("{}", PROMPT);
        io::stdout().flush()?;

        let bytes_read = input.read_line(&mut self.buffer)?;
        let trimmed_len = self.buffer.trim_end().len();
        self.buffer.truncate(trimmed_len);
        Ok(bytes_read > 0)
    }
}

fn run(table: &mut Table) -> io::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut input_buffer = InputBuffer::new();

    while input_buffer.read_input(&mut input)? {
        match process_line(&input_buffer.buffer, table) {
            ReplAction::Exit => break,
            ReplAction::Output(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let filename = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DB_FILE.to_string());
    info!("table file: {}", filename);

    let mut table = match Table::open(&filename) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Unable to open {}: {}", filename, e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&mut table) {
        error!("error reading input: {}", e);
    }

    if let Err(e) = table.close() {
        eprintln!("Error closing database: {}", e);
        process::exit(1);
    }
}
