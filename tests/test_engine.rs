use std::time::Duration;

use splice::script::{FAILURE_PREFIX, ProcessRunner, ScriptPolicy, scan, substitute};

fn runner(interpreters: &[&str]) -> ProcessRunner {
    ProcessRunner::new(ScriptPolicy::allowing(interpreters.iter().copied()))
}

#[tokio::test]
async fn test_blocks_substituted_in_document_order() {
    let html = concat!(
        "<html><body>\n",
        "<p>first: <code interpreteur=\"sh\">echo alpha</code></p>\n",
        "<p>second: <code interpreteur=\"cat\">beta</code></p>\n",
        "</body></html>",
    );

    let out = substitute(html, &runner(&["sh", "cat"])).await;

    assert_eq!(
        out,
        concat!(
            "<html><body>\n",
            "<p>first: alpha\n</p>\n",
            "<p>second: beta\n</p>\n",
            "</body></html>",
        )
    );
}

#[tokio::test]
async fn test_page_without_blocks_is_unchanged() {
    let html = "<html><body><code>not run</code></body></html>";
    assert_eq!(substitute(html, &runner(&["sh"])).await, html);
}

#[tokio::test]
async fn test_multiline_output_is_reassembled() {
    let html = "[<code interpreteur=\"sh\">printf 'a\\r\\nb\\nc'</code>]";
    assert_eq!(substitute(html, &runner(&["sh"])).await, "[a\nb\nc\n]");
}

#[tokio::test]
async fn test_multiline_code_body() {
    let html = "<code interpreter=\"sh\">\nx=4\necho $((x * 2))\n</code>";
    assert_eq!(substitute(html, &runner(&["sh"])).await, "8\n");
}

#[tokio::test]
async fn test_dollar_signs_in_output_are_literal() {
    let html = "<code interpreteur=\"cat\">cost: $1 and ${2}</code>";
    assert_eq!(
        substitute(html, &runner(&["cat"])).await,
        "cost: $1 and ${2}\n"
    );
}

#[tokio::test]
async fn test_interpreter_name_is_trimmed() {
    let html = "<code interpreteur=\" cat \">x</code>";
    assert_eq!(substitute(html, &runner(&["cat"])).await, "x\n");
}

#[tokio::test]
async fn test_interpreter_not_on_allow_list_is_reported_inline() {
    let html = "a<code interpreteur=\"sh\">echo hi</code>b";
    let out = substitute(html, &runner(&["cat"])).await;

    assert!(out.starts_with('a'));
    assert!(out.ends_with('b'));
    assert!(out.contains(FAILURE_PREFIX));
    assert!(out.contains("not permitted"));
    assert!(!out.contains("hi"));
}

#[tokio::test]
async fn test_missing_interpreter_is_reported_inline() {
    let name = "splice-no-such-interpreter";
    let html = format!("<code interpreteur=\"{name}\">1</code><code interpreteur=\"cat\">ok</code>");
    let out = substitute(&html, &runner(&[name, "cat"])).await;

    assert!(out.starts_with(FAILURE_PREFIX));
    assert!(out.contains(name));
    assert!(out.ends_with("ok\n"));
}

#[tokio::test]
async fn test_non_zero_exit_is_reported_inline() {
    let html = "<code interpreteur=\"sh\">echo partial; exit 3</code>";
    let out = substitute(html, &runner(&["sh"])).await;

    assert!(out.starts_with(FAILURE_PREFIX));
    assert!(out.contains("exited"));
}

#[tokio::test]
async fn test_timeout_is_reported_inline() {
    let policy = ScriptPolicy {
        timeout: Duration::from_millis(200),
        ..ScriptPolicy::allowing(["sh"])
    };
    let html = "<code interpreteur=\"sh\">sleep 5</code>";
    let out = substitute(html, &ProcessRunner::new(policy)).await;

    assert!(out.starts_with(FAILURE_PREFIX));
    assert!(out.contains("timed out"));
}

#[tokio::test]
async fn test_timeout_kills_background_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("late");
    let policy = ScriptPolicy {
        timeout: Duration::from_millis(200),
        ..ScriptPolicy::allowing(["sh"])
    };
    let html = format!(
        "<code interpreteur=\"sh\">(sleep 1; echo late > {}) & sleep 5</code>",
        marker.display()
    );

    let out = substitute(&html, &ProcessRunner::new(policy)).await;
    assert!(out.contains("timed out"));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_background_jobs_end_with_their_block() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("late");
    let html = format!(
        "<code interpreteur=\"sh\">(sleep 1; echo late > {}) >/dev/null 2>&1 & echo done</code>",
        marker.display()
    );

    let out = substitute(&html, &runner(&["sh"])).await;
    assert_eq!(out, "done\n");

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_output_cap_is_enforced() {
    let policy = ScriptPolicy {
        max_output_bytes: 16,
        ..ScriptPolicy::allowing(["sh"])
    };
    let html = "<code interpreteur=\"sh\">yes | head -c 4096</code>";
    let out = substitute(html, &ProcessRunner::new(policy)).await;

    assert!(out.starts_with(FAILURE_PREFIX));
    assert!(out.contains("more than 16 bytes"));
}

#[tokio::test]
async fn test_unrestricted_runs_any_interpreter() {
    let policy = ScriptPolicy {
        unrestricted: true,
        ..ScriptPolicy::allowing(Vec::<String>::new())
    };
    let html = "<code interpreteur=\"sh\">echo free</code>";
    assert_eq!(substitute(html, &ProcessRunner::new(policy)).await, "free\n");
}

#[tokio::test]
async fn test_disabled_scripting_leaves_blocks_in_place() {
    let policy = ScriptPolicy {
        enabled: false,
        ..ScriptPolicy::allowing(["sh"])
    };
    let html = "<code interpreteur=\"sh\">echo hi</code>";
    assert_eq!(substitute(html, &ProcessRunner::new(policy)).await, html);
}

#[test]
fn test_scan_spans_cover_whole_elements() {
    let html = "x<code interpreteur=\"sh\">a</code>y";
    let blocks = scan(html);

    assert_eq!(blocks.len(), 1);
    assert_eq!(&html[blocks[0].span.clone()], "<code interpreteur=\"sh\">a</code>");
}
