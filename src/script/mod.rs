//! Server side code blocks embedded in HTML pages.
//!
//! A page may contain spans such as
//!
//! ```html
//! <p>Today is <code interpreteur="sh">date +%A</code></p>
//! ```
//!
//! Each span is replaced by whatever the named interpreter prints when fed the
//! enclosed code on stdin. Blocks run one after another in document order and
//! do not nest: the first closing tag ends a block.
//!
//! The interpreter name comes straight from the served file, so which programs
//! may run is decided by [`ScriptPolicy`]. Nothing is sandboxed.

pub mod runner;

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

pub use runner::{FAILURE_PREFIX, ProcessRunner, ScriptPolicy};

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<code\s+interpret(?:eur|er)="(.*?)">(.*?)</code>"#)
        .expect("code block pattern is valid")
});

/// One `(interpreter, code)` pair and where it sits in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock<'a> {
    pub interpreter: &'a str,
    pub code: &'a str,
    /// Byte range of the whole element, tags included.
    pub span: Range<usize>,
}

/// Finds every code block in `html`, left to right, without overlap.
pub fn scan(html: &str) -> Vec<CodeBlock<'_>> {
    CODE_BLOCK
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(CodeBlock {
                interpreter: caps.get(1)?.as_str(),
                code: caps.get(2)?.as_str(),
                span: whole.range(),
            })
        })
        .collect()
}

/// Replaces every code block in `html` with the output of running it.
///
/// Text outside blocks is copied unchanged. Output is inserted literally.
/// With scripting disabled the page is returned as is.
pub async fn substitute(html: &str, runner: &ProcessRunner) -> String {
    if !runner.policy().enabled {
        return html.to_string();
    }

    let blocks = scan(html);
    if blocks.is_empty() {
        return html.to_string();
    }

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    for block in &blocks {
        out.push_str(&html[cursor..block.span.start]);

        tracing::debug!(interpreter = block.interpreter, bytes = block.code.len(), "Running code block");
        let output = runner.run(block.interpreter, block.code).await;
        out.push_str(&output);

        cursor = block.span.end;
    }

    out.push_str(&html[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_is_non_greedy() {
        let html = r#"a<code interpreteur="sh">echo 1</code>b<code interpreteur="cat">2</code>c"#;
        let blocks = scan(html);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].interpreter, "sh");
        assert_eq!(blocks[0].code, "echo 1");
        assert_eq!(blocks[1].interpreter, "cat");
        assert_eq!(blocks[1].code, "2");
        assert_eq!(&html[blocks[1].span.end..], "c");
    }

    #[test]
    fn scan_accepts_english_attribute_and_multiline_body() {
        let html = "<code\n interpreter=\"python3\">print(1)\nprint(2)</code>";
        let blocks = scan(html);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].interpreter, "python3");
        assert_eq!(blocks[0].code, "print(1)\nprint(2)");
    }

    #[test]
    fn plain_code_tags_are_ignored() {
        assert!(scan("<code>let x = 1;</code>").is_empty());
    }
}
