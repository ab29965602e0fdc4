use lopdf::Document;
use pdf_leftcol::{LopdfSource, PageSource};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_blocks <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1-3");
    let (min_page, max_page) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(3))
    } else {
        (1, range.parse().unwrap_or(3))
    };

    let doc = Document::load(&args[1]).expect("Failed to load");
    let source = LopdfSource::new(doc);

    for page in min_page..=max_page {
        let content = source.load_page(page).expect("Failed to load page");
        println!(
            "=== PAGE {} (width {:.1}, {} blocks) ===",
            page,
            content.width,
            content.blocks.len()
        );
        for block in &content.blocks {
            println!(
                "  x0={:7.1} y0={:7.1} x1={:7.1} y1={:7.1} text={:?}",
                block.x0, block.y0, block.x1, block.y1, block.text
            );
        }
        println!();
    }
}
