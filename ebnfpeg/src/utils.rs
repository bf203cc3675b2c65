pub fn escape_string(str: &str) -> String {
    let mut res = String::new();

    for ch in str.chars() {
        match ch {
            '\\' => res.push_str("\\\\"),
            '\t' => res.push_str("\\t"),
            '\n' => res.push_str("\\n"),
            '\r' => res.push_str("\\r"),
            '"' => res.push_str("\\\""),
            ch => res.push(ch),
        }
    }

    res
}

/// Convert a byte offset into a 0-based (line, column) pair. A position
/// right after a line feed is reported at the end of that line.
pub fn line_col(input: &str, pos: usize) -> (usize, usize) {
    let mut line_no = 0;
    let mut col_no = pos;

    for l in input
        .char_indices()
        .filter_map(|(index, c)| if c == '\n' { Some(index + 1) } else { None })
    {
        if pos < l {
            break;
        }

        if pos == l {
            // chomp off new line
            col_no -= 1;
            break;
        }

        col_no = pos - l;

        line_no += 1;
    }

    (line_no, col_no)
}

/// Start of the character that ends right before `pos`.
pub(crate) fn prev_char_boundary(input: &str, pos: usize) -> usize {
    input[..pos]
        .char_indices()
        .next_back()
        .map(|(off, _)| off)
        .unwrap_or(0)
}
