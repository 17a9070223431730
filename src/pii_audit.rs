// PII audit — static analysis tests that scan all Rust source files for
// tracing:: calls containing raw-content field patterns. Prevents
// unsanitized user text from leaking back into logs via regression.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    /// Field and interpolation patterns that MUST NOT appear in tracing
    /// macro arguments. Each would put pre-sanitization content, or the
    /// token maps that reverse it, into the process log.
    const PII_PATTERNS: &[&str] = &[
        // Raw user input
        "request.query",
        "req.query",
        "raw_query",
        "user_query",
        "query_text",
        // Extracted document content before masking
        "result.text",
        "extracted_text",
        "raw_text",
        "raw_bytes",
        "page_text",
        // Model side, pre-masking
        "response_text",
        "rehydrated",
        "user_turn",
        "system_instruction",
        // Sanitizer internals that map tokens back to values
        "token_to_value",
        "value_to_token",
        "session_map",
        "session.values",
    ];

    /// Files allowed to mention the patterns in non-tracing contexts.
    const ALLOWLIST: &[&str] = &["pii_audit.rs"];

    #[test]
    fn no_raw_content_in_tracing_calls() {
        let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        assert!(src_dir.exists(), "source directory not found: {}", src_dir.display());

        let mut violations = Vec::new();
        scan_directory(&src_dir, &mut violations);

        if !violations.is_empty() {
            let report = violations
                .iter()
                .map(|(file, line_num, line, pattern)| {
                    format!("  {}:{}: found '{}' in: {}", file, line_num, pattern, line.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");
            panic!(
                "PII AUDIT FAILED — {} violation(s) found in tracing calls:\n{}\n\n\
                 Fix: log ids, counts, and masked previews, never raw content.",
                violations.len(),
                report
            );
        }
    }

    #[test]
    fn pii_patterns_list_is_not_empty() {
        assert!(
            PII_PATTERNS.len() >= 10,
            "PII_PATTERNS should contain at least 10 patterns, found {}",
            PII_PATTERNS.len()
        );
    }

    #[test]
    fn scanner_detects_known_violation() {
        let test_line = r#"tracing::info!(text = %result.text, "document parsed");"#;
        let found = PII_PATTERNS.iter().any(|p| test_line.contains(p));
        assert!(found, "scanner should detect pattern in: {}", test_line);
    }

    #[test]
    fn scanner_passes_clean_tracing() {
        let clean_line = r#"tracing::info!(record_id = %record_id, chars = n, "document parsed");"#;
        let found = PII_PATTERNS.iter().any(|p| clean_line.contains(p));
        assert!(!found, "clean tracing line should not trigger: {}", clean_line);
    }

    fn scan_directory(dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                scan_directory(&path, violations);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                scan_file(&path, violations);
            }
        }
    }

    fn scan_file(path: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        if ALLOWLIST.iter().any(|a| filename.contains(a)) {
            return;
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };

        let relative_path = path
            .strip_prefix(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))
            .unwrap_or(path)
            .display()
            .to_string();

        // Extract tracing macro call spans (may be multi-line)
        let lines: Vec<&str> = content.lines().collect();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();

            if trimmed.starts_with("tracing::info!")
                || trimmed.starts_with("tracing::warn!")
                || trimmed.starts_with("tracing::error!")
                || trimmed.starts_with("tracing::debug!")
                || trimmed.starts_with("tracing::trace!")
            {
                let mut call = String::from(trimmed);
                let start_line = i + 1; // 1-indexed
                let mut depth: i32 = 0;
                for ch in trimmed.chars() {
                    if ch == '(' { depth += 1; }
                    if ch == ')' { depth -= 1; }
                }

                let mut j = i + 1;
                while depth > 0 && j < lines.len() {
                    let next = lines[j].trim();
                    call.push(' ');
                    call.push_str(next);
                    for ch in next.chars() {
                        if ch == '(' { depth += 1; }
                        if ch == ')' { depth -= 1; }
                    }
                    j += 1;
                }

                for pattern in PII_PATTERNS {
                    if call.contains(pattern) {
                        violations.push((
                            relative_path.clone(),
                            start_line,
                            call.clone(),
                            pattern.to_string(),
                        ));
                    }
                }

                i = j.max(i + 1);
            } else {
                i += 1;
            }
        }
    }
}
