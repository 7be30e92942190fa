//! Namespaced tool names: `mcp__{server}__{tool}`.

/// Prefix shared by every bridged tool.
pub const TOOL_PREFIX: &str = "mcp__";

/// Separator between the server and tool segments.
pub const SEGMENT_SEPARATOR: &str = "__";

/// Replace characters outside `[A-Za-z0-9_]` with `_` and collapse runs.
pub fn sanitize_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else {
            '_'
        };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Build the host-facing name for a server operation.
pub fn build_tool_name(server: &str, tool: &str) -> String {
    format!(
        "{TOOL_PREFIX}{}{SEGMENT_SEPARATOR}{}",
        sanitize_segment(server),
        sanitize_segment(tool)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_namespaced_name() {
        assert_eq!(
            build_tool_name("chrome-devtools", "new_page"),
            "mcp__chrome_devtools__new_page"
        );
    }

    #[test]
    fn collapses_runs_of_invalid_characters() {
        assert_eq!(sanitize_segment("a--b..c"), "a_b_c");
        assert_eq!(sanitize_segment("a__b"), "a_b");
        assert_eq!(sanitize_segment("héllo wörld"), "h_llo_w_rld");
    }

    #[test]
    fn output_only_contains_identifier_characters() {
        let inputs = ["", "weird/name", "x y z", "日本語", "ok_name"];
        for server in inputs {
            for tool in inputs {
                let name = build_tool_name(server, tool);
                assert!(name.starts_with(TOOL_PREFIX));
                assert!(name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_'));
                assert_eq!(name, build_tool_name(server, tool));
            }
        }
    }

    #[test]
    fn distinct_pairs_can_collide_after_sanitization() {
        assert_eq!(build_tool_name("my.server", "t"), build_tool_name("my-server", "t"));
    }
}
