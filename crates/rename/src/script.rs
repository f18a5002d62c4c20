use std::fmt::Write;

use crate::model::RenamePlan;

const PREAMBLE: &str = "#!/bin/bash\nset -e\nset -u\nset -o pipefail\nset -o noclobber\n";

/// Bash script performing the planned moves. `mv -n` refuses to
/// overwrite, so rerunning the script is harmless.
pub fn render_script(plan: &RenamePlan) -> String {
    let mut out = String::from(PREAMBLE);
    if !plan.moves.is_empty() {
        out.push('\n');
    }
    for mv in &plan.moves {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "mv -n -- {} {}",
            shell_quote(&mv.from.to_string_lossy()),
            shell_quote(&mv.to.to_string_lossy())
        );
    }
    out
}

/// Single-quote `s` for POSIX shells. Embedded quotes become `'\''`.
pub fn shell_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlannedMove;
    use proptest::prelude::*;

    #[test]
    fn preamble_only_when_empty() {
        let script = render_script(&RenamePlan::default());
        assert_eq!(script, PREAMBLE);
    }

    #[test]
    fn one_line_per_move() {
        let plan = RenamePlan {
            moves: vec![
                PlannedMove {
                    from: "/photos/India/IMG 1.jpg".into(),
                    to: "/photos/2025-03-14-09-30-00.JPG".into(),
                },
                PlannedMove {
                    from: "/photos/India/Raj's.jpg".into(),
                    to: "/photos/2025-03-14-09-30-01.JPG".into(),
                },
            ],
            ..RenamePlan::default()
        };
        let script = render_script(&plan);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines[0], "#!/bin/bash");
        assert!(lines.contains(&"set -o noclobber"));
        assert_eq!(
            lines[lines.len() - 2],
            "mv -n -- '/photos/India/IMG 1.jpg' '/photos/2025-03-14-09-30-00.JPG'"
        );
        assert_eq!(
            lines[lines.len() - 1],
            r"mv -n -- '/photos/India/Raj'\''s.jpg' '/photos/2025-03-14-09-30-01.JPG'"
        );
    }

    #[test]
    fn quoting_neutralizes_expansion() {
        assert_eq!(shell_quote("$(rm -rf ~)"), "'$(rm -rf ~)'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("'"), r"''\'''");
    }

    proptest! {
        #[test]
        fn quoted_has_no_bare_quote(s in ".*") {
            let q = shell_quote(&s);
            prop_assert!(q.starts_with('\'') && q.ends_with('\''));
            // Undo the escaping and the outer quotes.
            let inner = &q[1..q.len() - 1];
            prop_assert_eq!(inner.replace(r"'\''", "'"), s);
        }
    }
}
