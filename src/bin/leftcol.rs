//! CLI driver for left-column extraction

use pdf_leftcol::{extract_left_column_from_file, DEFAULT_LEFT_RATIO};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <pdf_file> [start-end] [ratio]", args[0]);
        eprintln!();
        eprintln!("Prints the left-column text of each page in the range");
        eprintln!("(default pages 5-10, left region 40% of page width).");
        process::exit(1);
    }

    let pdf_path = &args[1];
    let range = args.get(2).map(|s| s.as_str()).unwrap_or("5-10");
    let (start_page, end_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(5), b.parse().unwrap_or(10))
    } else {
        (1, range.parse().unwrap_or(10))
    };
    let left_ratio = args
        .get(3)
        .and_then(|r| r.parse().ok())
        .unwrap_or(DEFAULT_LEFT_RATIO);

    match extract_left_column_from_file(pdf_path, start_page, end_page, left_ratio) {
        Ok(pages) => {
            for (page, text) in &pages {
                println!();
                println!("--- Page {} ---", page);
                println!("{}", text);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
