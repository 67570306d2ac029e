fn expect_contents(manpage: &str, patterns: &[&str]) -> anyhow::Result<()> {
    for pat in patterns.iter().copied() {
        anyhow::ensure!(manpage.contains(pat), "man page lacks {pat:?}")
    }
    Ok(())
}

/// Spot tests about man page generation; these are by far not exhaustive.
#[test]
fn main_fn_generates_manpages() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::with_prefix("pqc-results-test-main-fn-generates-manpages")?;
    let cmd_out = test_bin::get_test_bin("pqc-results")
        .arg("--generate-manpage")
        .arg(dir.path())
        .output()?;
    assert!(cmd_out.status.success());

    let expected_manpages = [
        "pqc-results.1",
        "pqc-results-parse.1",
        "pqc-results-average.1",
        "pqc-results-gen-alg-lists.1",
        "pqc-results-gen-config.1",
        "pqc-results-validate.1",
    ];

    for name in expected_manpages {
        let body = std::fs::read_to_string(dir.path().join(name))?;
        expect_contents(&body, &[".TH", ".SH NAME", ".SH SYNOPSIS"])?;
    }

    let body = std::fs::read_to_string(dir.path().join("pqc-results-parse.1"))?;
    expect_contents(&body, &["machine", "total", "collision"])?;

    Ok(())
}

#[test]
fn main_fn_prints_completions() -> anyhow::Result<()> {
    let out = test_bin::get_test_bin("pqc-results")
        .args(["--print-completions", "bash"])
        .output()?;
    assert!(out.status.success());
    assert!(String::from_utf8(out.stdout)?.contains("pqc-results"));
    Ok(())
}
