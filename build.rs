//! Build script to generate embedded word lists
//!
//! Reads `data/words-<n>.txt` and `data/answers-<n>.txt` for every supported
//! length and generates Rust source code with const arrays.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Word lengths shipped in `data/`
const LENGTHS: [usize; 3] = [4, 5, 6];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("wordlists.rs");

    let mut output = fs::File::create(&output_path)
        .unwrap_or_else(|e| panic!("Failed to create {}: {e}", output_path.display()));

    writeln!(output, "// Generated word lists").unwrap();
    writeln!(output).unwrap();

    for len in LENGTHS {
        generate_word_list(
            &mut output,
            &format!("data/words-{len}.txt"),
            &format!("WORDS_{len}"),
            &format!("Valid {len}-letter guesses"),
        );
        generate_word_list(
            &mut output,
            &format!("data/answers-{len}.txt"),
            &format!("ANSWERS_{len}"),
            &format!("{len}-letter words in play"),
        );
    }

    // Rebuild if word lists change
    println!("cargo:rerun-if-changed=data");
}

fn generate_word_list(output: &mut fs::File, input_path: &str, const_name: &str, doc_comment: &str) {
    let content = fs::read_to_string(input_path)
        .unwrap_or_else(|e| panic!("Failed to read {input_path}: {e}"));

    let words: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    writeln!(output, "/// {doc_comment} ({} words)", words.len()).unwrap();
    writeln!(output, "pub const {const_name}: &[&str] = &[").unwrap();

    for word in words {
        writeln!(output, "    \"{word}\",").unwrap();
    }

    writeln!(output, "];").unwrap();
    writeln!(output).unwrap();
}
