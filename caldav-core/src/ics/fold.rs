//! Content line folding (RFC 5545 §3.1).

/// Maximum line length in octets, excluding the line break.
const MAX_LINE_OCTETS: usize = 75;

/// Remove folding: every line break (CRLF or bare LF) immediately followed by
/// a space or tab is dropped together with that single whitespace character.
///
/// Line breaks that are not followed by whitespace are kept as they are.
pub fn unfold(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                if matches!(chars.peek(), Some(' ') | Some('\t')) {
                    chars.next();
                } else {
                    result.push_str("\r\n");
                }
            }
            '\n' => {
                if matches!(chars.peek(), Some(' ') | Some('\t')) {
                    chars.next();
                } else {
                    result.push('\n');
                }
            }
            other => result.push(other),
        }
    }

    result
}

/// Fold a single logical line to 75 octets per physical line.
///
/// Continuations are introduced with CRLF + space and never split a UTF-8
/// character, so `unfold(fold(line)) == line`.
pub fn fold(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut result = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut current_len = 0;
    let mut first_segment = true;

    for c in line.chars() {
        let char_len = c.len_utf8();

        let effective_max = if first_segment {
            MAX_LINE_OCTETS
        } else {
            MAX_LINE_OCTETS - 1
        };

        if current_len + char_len > effective_max {
            result.push_str("\r\n ");
            current_len = 1;
            first_segment = false;
        }

        result.push(c);
        current_len += char_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfold_removes_crlf_and_single_space() {
        assert_eq!(
            unfold("DESCRIPTION:Hello \r\n world and \r\n more text"),
            "DESCRIPTION:Hello world and more text"
        );
    }

    #[test]
    fn unfold_handles_tab_and_bare_lf() {
        assert_eq!(unfold("SUMMARY:Team\n\tSync"), "SUMMARY:TeamSync");
    }

    #[test]
    fn unfold_keeps_real_line_breaks() {
        let input = "UID:1\r\nSUMMARY:x\r\n";
        assert_eq!(unfold(input), input);
    }

    #[test]
    fn short_line_unchanged() {
        assert_eq!(fold("SUMMARY:Lunch"), "SUMMARY:Lunch");
    }

    #[test]
    fn fold_at_75_octets() {
        let line = format!("DESCRIPTION:{}", "x".repeat(100));
        let folded = fold(&line);
        let first = folded.split("\r\n").next().unwrap();
        assert_eq!(first.len(), 75);
        for part in folded.split("\r\n") {
            assert!(part.len() <= 75);
        }
    }

    #[test]
    fn fold_respects_utf8() {
        let line = format!("LOCATION:{}", "ü".repeat(60));
        let folded = fold(&line);
        for part in folded.split("\r\n ") {
            assert!(part.is_char_boundary(part.len()));
        }
    }

    #[test]
    fn unfold_of_fold_is_identity() {
        let samples = [
            "SUMMARY:short".to_string(),
            format!("DESCRIPTION:{}", "Lorem ipsum dolor sit amet, ".repeat(12)),
            format!("LOCATION:{}", "日本語".repeat(40)),
            format!("X-LONG:{}", " ".repeat(160)),
        ];
        for line in samples {
            assert_eq!(unfold(&fold(&line)), line);
        }
    }
}
