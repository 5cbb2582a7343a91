//! Text layout helpers for deck fragments
//!
//! The solver reads whitespace-separated tokens, so alignment is cosmetic,
//! but reference decks are compared byte for byte and every fragment goes
//! through these helpers.

/// Ordered `field name -> display string` pairs for one entity
pub type Fields = Vec<(&'static str, String)>;

/// Row labels are padded to at least this width
pub const MIN_LABEL_WIDTH: usize = 16;

/// Shortest round-trip rendering of a float.
///
/// Integral values keep a trailing `.0`; magnitudes below `1e-4` or at or
/// above `1e16` switch to scientific notation with a signed, two-digit
/// exponent (`1e-05`, `1.5e+16`).
pub fn float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{x:e}");
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = exponent as usize + 1;
            if digits.len() <= int_len {
                let zeros = "0".repeat(int_len - digits.len());
                format!("{sign}{digits}{zeros}.0")
            } else {
                let (int, frac) = digits.split_at(int_len);
                format!("{sign}{int}.{frac}")
            }
        } else {
            let zeros = "0".repeat((-exponent - 1) as usize);
            format!("{sign}0.{zeros}{digits}")
        }
    } else {
        let (lead, rest) = digits.split_at(1);
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        let exp_abs = exponent.abs();
        if rest.is_empty() {
            format!("{sign}{lead}e{exp_sign}{exp_abs:02}")
        } else {
            format!("{sign}{lead}.{rest}e{exp_sign}{exp_abs:02}")
        }
    }
}

/// Numeric field value: one leading space, whatever the sign
pub fn number(x: f64) -> String {
    format!(" {}", float(x))
}

/// Integer field value: one leading space, whatever the sign
pub fn integer(i: i64) -> String {
    format!(" {i}")
}

/// Descriptor or string field value
pub fn quoted(s: &str) -> String {
    format!("\"{s}\"")
}

/// Space-joined list, as used by id and step-size lists
pub fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Left-justifies every value to two characters past the longest one
pub fn justify(fields: &mut Fields) {
    let width = fields.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0) + 2;
    for (_, value) in fields.iter_mut() {
        *value = format!("{value:<width$}");
    }
}

/// Writes one aligned row per field, one column per entity.
///
/// Every entry of `columns` must carry the same labels in the same order;
/// the labels of the first entry are used. Rows are right-trimmed.
pub fn write_rows(out: &mut String, indent: &str, columns: &[Fields]) {
    let Some(first) = columns.first() else {
        return;
    };
    let label_width = first
        .iter()
        .map(|(label, _)| label.len() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_LABEL_WIDTH);

    for (row, (label, _)) in first.iter().enumerate() {
        let values: Vec<&str> = columns
            .iter()
            .filter_map(|column| column.get(row).map(|(_, v)| v.as_str()))
            .collect();
        let line = format!("{indent}{label:<label_width$}{}", values.join(" "));
        out.push_str(line.trim_end());
        out.push('\n');
    }
}
