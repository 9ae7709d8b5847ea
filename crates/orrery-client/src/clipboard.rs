//! Cell selection ↔ text serialization for clipboard transfer.
//!
//! A selection serializes as, per cell, a delimiter line embedding the cell id
//! followed by the cell's code and a blank separator line — close to the
//! on-disk script form, though not topologically sorted, so it won't
//! necessarily run as-is. Ids are **not** round-tripped: pasting mints fresh
//! ids, so copying within one notebook never collides.

use std::sync::LazyLock;

use orrery_types::CellData;
use regex::Regex;

/// Marker prefix of a cell delimiter line.
pub const CELL_DELIMITER: &str = "# ╔═╡ ";

static DELIMITER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"# ╔═╡ \S+\n").expect("delimiter pattern compiles"));

/// Serialize a selection of cells into clipboard text.
pub fn serialize_cells(cells: &[CellData]) -> String {
    cells
        .iter()
        .map(|cell| format!("{CELL_DELIMITER}{}\n{}\n", cell.cell_id, cell.code))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split clipboard text back into plain code strings.
///
/// Segments are trimmed and empty ones dropped. A payload containing no
/// delimiter at all is treated as a single opaque code block (whole-file
/// paste). Strict inverse of [`serialize_cells`] on the code component:
/// `deserialize_cells(serialize_cells(cells))` yields the codes in order.
pub fn deserialize_cells(payload: &str) -> Vec<String> {
    let normalized = payload.replace("\r\n", "\n");
    DELIMITER_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_codes_in_order() {
        let cells = vec![CellData::new("x = 1"), CellData::new("y = 2")];
        let text = serialize_cells(&cells);
        assert_eq!(deserialize_cells(&text), vec!["x = 1", "y = 2"]);
    }

    #[test]
    fn test_serialized_form_embeds_ids() {
        let cell = CellData::new("x = 1");
        let text = serialize_cells(std::slice::from_ref(&cell));
        assert!(text.starts_with(CELL_DELIMITER));
        assert!(text.contains(&cell.cell_id.to_string()));
    }

    #[test]
    fn test_multiline_code_survives() {
        let code = "function f(x)\n\n    x + 1\nend";
        let cells = vec![CellData::new(code), CellData::new("f(2)")];
        assert_eq!(deserialize_cells(&serialize_cells(&cells)), vec![code, "f(2)"]);
    }

    #[test]
    fn test_payload_without_delimiter_is_one_block() {
        let pasted = "a = 1\nb = a + 1\n";
        assert_eq!(deserialize_cells(pasted), vec!["a = 1\nb = a + 1"]);
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        assert!(deserialize_cells("").is_empty());
        assert!(deserialize_cells("   \n\n ").is_empty());
    }

    #[test]
    fn test_crlf_input_normalized() {
        let cells = vec![CellData::new("x = 1")];
        let text = serialize_cells(&cells).replace('\n', "\r\n");
        assert_eq!(deserialize_cells(&text), vec!["x = 1"]);
    }

    #[test]
    fn test_empty_cells_are_dropped() {
        let cells = vec![CellData::new(""), CellData::new("x = 1")];
        assert_eq!(deserialize_cells(&serialize_cells(&cells)), vec!["x = 1"]);
    }
}
