// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with some content that wraps once the column gets narrow enough.\n\n- Bullet point\n  - Nested item\n- Another item\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

/// Block heights in a loose mix of short paragraphs and tall figures
#[allow(dead_code)]
pub fn generate_block_heights(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| match i % 7 {
            0 => 48.0,
            3 => 320.0,
            5 => 96.0,
            _ => 24.0 + (i % 5) as f64 * 18.0,
        })
        .collect()
}
