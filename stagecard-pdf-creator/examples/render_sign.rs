use stagecard_pdf_creator::{fonts, sign_file_name, SignOptions, SignPdfGenerator};

fn main() {
    println!("Rendering stage cards...");

    let font_context = match fonts::initialize_fonts() {
        Ok(fc) => fc,
        Err(e) => {
            eprintln!("Failed to load a display font: {}", e);
            return;
        }
    };

    let options = SignOptions {
        debug_guides: std::env::args().any(|a| a == "--debug"),
        ..SignOptions::default()
    };
    let mut generator = SignPdfGenerator::new(font_context, options);

    let names = [
        "Max & Ruby",
        "Charlie Quinn and Friends",
        "The Midnight Owls featuring Special Guests",
        "",
        "Solo Act",
    ];

    for name in names {
        let Some(file_name) = sign_file_name(name) else {
            println!("(blank line skipped)");
            continue;
        };
        match generator.generate_sign(name, &file_name) {
            Ok(report) if report.overflowed => {
                println!("{} -> {} (overflows the page)", name, file_name)
            }
            Ok(report) => println!(
                "{} -> {} ({} lines, main {:?} pt)",
                name, file_name, report.line_count, report.main_font_pt
            ),
            Err(e) => eprintln!("{} failed: {}", name, e),
        }
    }
}
