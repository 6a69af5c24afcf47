// ── Numeric Answer Parser ────────────────────────────────────────────────────
// Ported from the weighting/validation logic in
// `checkin_dynamic_manager.py::_parse_numerical_response`. Supports written
// numerals, "and a half"/"and half", "X point Y" (including multi-word
// decimal tails), and percentage suffixes. Explicitly rejects ambiguous
// phrasings such as "three and a quarter" rather than guessing.

fn written_numeral(word: &str) -> Option<f64> {
    let table: &[(&str, f64)] = &[
        ("zero", 0.0), ("one", 1.0), ("two", 2.0), ("three", 3.0), ("four", 4.0),
        ("five", 5.0), ("six", 6.0), ("seven", 7.0), ("eight", 8.0), ("nine", 9.0),
        ("ten", 10.0), ("eleven", 11.0), ("twelve", 12.0), ("thirteen", 13.0),
        ("fourteen", 14.0), ("fifteen", 15.0), ("sixteen", 16.0), ("seventeen", 17.0),
        ("eighteen", 18.0), ("nineteen", 19.0), ("twenty", 20.0),
    ];
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

/// A single digit word or literal digit, used for "point" decimal tails.
fn single_digit(word: &str) -> Option<u8> {
    if let Ok(d) = word.parse::<u8>() {
        if d <= 9 {
            return Some(d);
        }
    }
    written_numeral(word).and_then(|v| if v <= 9.0 { Some(v as u8) } else { None })
}

fn base_number(word: &str) -> Option<f64> {
    word.parse::<f64>().ok().or_else(|| written_numeral(word))
}

/// Parse a free-text numeric answer per SPEC_FULL.md §4.1.
pub fn parse_numerical_response(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    // 1. direct float
    if let Ok(v) = cleaned.parse::<f64>() {
        return Some(v);
    }

    // 2. bare written numeral
    if let Some(v) = written_numeral(&cleaned) {
        return Some(v);
    }

    // percentage suffix — strip and recurse as a raw magnitude, never divided.
    if let Some(stripped) = cleaned.strip_suffix('%') {
        return parse_numerical_response(stripped.trim());
    }
    if let Some(stripped) = cleaned.strip_suffix(" percent") {
        return parse_numerical_response(stripped.trim());
    }

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    // "<n> and a half" / "<n> and half"
    if tokens.len() >= 3 && tokens[1] == "and" {
        let half_tail = if tokens.len() == 4 && tokens[2] == "a" && tokens[3] == "half" {
            Some(())
        } else if tokens.len() == 3 && tokens[2] == "half" {
            Some(())
        } else {
            None
        };
        if half_tail.is_some() {
            if let Some(base) = base_number(tokens[0]) {
                return Some(base + 0.5);
            }
        } else {
            // "<n> and a <fraction other than half>" — explicitly rejected.
            return None;
        }
    }

    // "<n> point <tail words>" — tail may be multiple single-digit words.
    if tokens.len() >= 3 && tokens[1] == "point" {
        if let Some(base) = base_number(tokens[0]) {
            let mut frac = String::new();
            for tail_word in &tokens[2..] {
                match single_digit(tail_word) {
                    Some(d) => frac.push_str(&d.to_string()),
                    None => return None,
                }
            }
            if frac.is_empty() {
                return None;
            }
            let decimal: f64 = format!("0.{}", frac).parse().ok()?;
            return Some(base + decimal);
        }
    }

    None
}
