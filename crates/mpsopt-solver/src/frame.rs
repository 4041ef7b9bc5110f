use std::collections::BTreeMap;
use std::fmt;

/// Section keywords in the order they appear in an encoded frame
pub const SECTIONS: [&str; 7] = ["NAME", "ROWS", "COLUMNS", "RHS", "RANGES", "BOUNDS", "ENDATA"];

/// A single cell of an MPS row
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Empty,
    Text(String),
    Number(f64),
}

impl Field {
    pub fn text(value: impl Into<String>) -> Self {
        Field::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Field::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Field::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Field::Empty
        } else {
            Field::Text(value.to_string())
        }
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Field::Empty
        } else {
            Field::Text(value)
        }
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Number(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Empty => Ok(()),
            Field::Text(s) => write!(f, "{}", s),
            Field::Number(n) => write_number(f, *n),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n == f64::INFINITY {
        write!(f, "Infinity")
    } else if n == f64::NEG_INFINITY {
        write!(f, "-Infinity")
    } else {
        write!(f, "{}", n)
    }
}

/// One record of the MPS artifact: six fields plus a provenance id
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MpsRow {
    pub fields: [Field; 6],
    /// Position of the row within its frame, starting at 1.
    /// Not part of the MPS content; downstream readers must ignore it.
    pub id: usize,
}

impl MpsRow {
    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    /// True for the keyword rows that open a section
    pub fn is_section_header(&self) -> bool {
        match &self.fields[0] {
            Field::Text(keyword) => SECTIONS.contains(&keyword.as_str()) && self.fields[1].is_empty(),
            _ => false,
        }
    }

    fn words(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
            .collect()
    }
}

/// The tabular MPS artifact handed to a solver backend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MpsFrame {
    rows: Vec<MpsRow>,
    /// (variable, row) -> id of the COLUMNS row holding that coefficient
    #[cfg_attr(feature = "serde", serde(skip))]
    columns: BTreeMap<(String, String), usize>,
}

impl MpsFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row and return its id
    pub fn push(&mut self, fields: [Field; 6]) -> usize {
        let id = self.rows.len() + 1;
        self.rows.push(MpsRow { fields, id });
        id
    }

    /// Remember which row carries the coefficient of `variable` in `row`
    pub fn record_column(&mut self, variable: &str, row: &str, id: usize) {
        self.columns.insert((variable.to_string(), row.to_string()), id);
    }

    /// Id of the COLUMNS row holding the coefficient of `variable` in `row`
    pub fn column_row_id(&self, variable: &str, row: &str) -> Option<usize> {
        self.columns.get(&(variable.to_string(), row.to_string())).copied()
    }

    /// Whether any COLUMNS entry was emitted for `variable`
    pub fn has_columns(&self, variable: &str) -> bool {
        self.columns
            .range((variable.to_string(), String::new())..)
            .next()
            .is_some_and(|((v, _), _)| v == variable)
    }

    pub fn rows(&self) -> &[MpsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MpsRow> {
        self.rows.iter()
    }

    /// The row contents with the provenance column stripped
    pub fn without_ids(&self) -> Vec<[Field; 6]> {
        self.rows.iter().map(|r| r.fields.clone()).collect()
    }

    /// Entries of a section, excluding its header row
    pub fn section(&self, keyword: &str) -> &[MpsRow] {
        let Some(start) = self.rows.iter().position(|r| {
            r.is_section_header() && r.fields[0].as_text() == Some(keyword)
        }) else {
            return &[];
        };
        let end = self.rows[start + 1..]
            .iter()
            .position(|r| r.is_section_header())
            .map(|offset| start + 1 + offset)
            .unwrap_or(self.rows.len());
        &self.rows[start + 1..end]
    }

    /// Render as free-format MPS text.
    ///
    /// The objective row is written as an `N` row, with the sense carried by
    /// an `OBJSENSE` section, so that standard free-MPS readers accept it.
    pub fn to_free_mps(&self) -> String {
        let mut out = String::new();
        let mut section = "";
        for row in &self.rows {
            if row.is_section_header() {
                section = row.fields[0].as_text().unwrap_or("");
                match section {
                    "NAME" => {
                        out.push_str(&format!("NAME {}\n", row.fields[2]));
                        if let Some(sense) = self.objective_sense() {
                            out.push_str(&format!("OBJSENSE\n    {}\n", sense));
                        }
                    }
                    _ => {
                        out.push_str(section);
                        out.push('\n');
                    }
                }
                continue;
            }
            let mut words = row.words();
            if section == "ROWS" && matches!(words.first().map(String::as_str), Some("MIN" | "MAX")) {
                words[0] = "N".to_string();
            }
            out.push_str(&format!(" {}\n", words.join(" ")));
        }
        out
    }

    fn objective_sense(&self) -> Option<&str> {
        self.section("ROWS")
            .iter()
            .filter_map(|r| r.fields[0].as_text())
            .find(|code| matches!(*code, "MIN" | "MAX"))
    }
}

impl fmt::Display for MpsFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = ["Field1", "Field2", "Field3", "Field4", "Field5", "Field6", "_id_"];
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                let mut line: Vec<String> = r.fields.iter().map(|c| c.to_string()).collect();
                line.push(r.id.to_string());
                line
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
        for line in &cells {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let header_line: Vec<String> = header
            .iter()
            .zip(&widths)
            .map(|(h, w)| format!("{:>w$}", h, w = *w))
            .collect();
        writeln!(f, "{}", header_line.join(" "))?;
        for line in &cells {
            let padded: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>w$}", c, w = *w))
                .collect();
            writeln!(f, "{}", padded.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: [&str; 6]) -> [Field; 6] {
        values.map(Field::from)
    }

    fn sample() -> MpsFrame {
        let mut frame = MpsFrame::new();
        frame.push([
            Field::text("NAME"),
            Field::Empty,
            Field::text("demo"),
            Field::Number(0.0),
            Field::Empty,
            Field::Number(0.0),
        ]);
        frame.push(row(["ROWS", "", "", "", "", ""]));
        frame.push(row(["MAX", "obj", "", "", "", ""]));
        frame.push(row(["G", "c1", "", "", "", ""]));
        frame.push(row(["COLUMNS", "", "", "", "", ""]));
        let id = frame.push([
            Field::Empty,
            Field::text("x"),
            Field::text("obj"),
            Field::Number(4.0),
            Field::text("c1"),
            Field::Number(1.0),
        ]);
        frame.record_column("x", "obj", id);
        frame.record_column("x", "c1", id);
        frame.push(row(["RHS", "", "", "", "", ""]));
        frame.push([
            Field::Empty,
            Field::text("RHS"),
            Field::text("c1"),
            Field::Number(3.0),
            Field::Empty,
            Field::Empty,
        ]);
        frame.push(row(["RANGES", "", "", "", "", ""]));
        frame.push(row(["BOUNDS", "", "", "", "", ""]));
        frame.push([
            Field::text("ENDATA"),
            Field::Empty,
            Field::Empty,
            Field::Number(0.0),
            Field::Empty,
            Field::Number(0.0),
        ]);
        frame
    }

    #[test]
    fn test_row_ids_are_sequential() {
        let frame = sample();
        let ids: Vec<usize> = frame.iter().map(|r| r.id).collect();
        assert_eq!(ids, (1..=frame.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_section_lookup() {
        let frame = sample();
        assert_eq!(frame.section("ROWS").len(), 2);
        assert_eq!(frame.section("COLUMNS").len(), 1);
        assert_eq!(frame.section("RANGES").len(), 0);
        assert_eq!(frame.section("BOUNDS").len(), 0);
        assert_eq!(frame.section("RHS")[0].field(3).as_number(), Some(3.0));
    }

    #[test]
    fn test_column_provenance() {
        let frame = sample();
        assert_eq!(frame.column_row_id("x", "c1"), Some(6));
        assert_eq!(frame.column_row_id("x", "c2"), None);
        assert!(frame.has_columns("x"));
        assert!(!frame.has_columns("y"));
    }

    #[test]
    fn test_free_mps_text() {
        let text = sample().to_free_mps();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NAME demo");
        assert_eq!(lines[1], "OBJSENSE");
        assert_eq!(lines[2], "    MAX");
        assert_eq!(lines[3], "ROWS");
        assert_eq!(lines[4], " N obj");
        assert_eq!(lines[5], " G c1");
        assert!(lines.contains(&" x obj 4 c1 1"));
        assert!(lines.contains(&" RHS c1 3"));
        assert_eq!(*lines.last().unwrap(), "ENDATA");
    }

    #[test]
    fn test_number_rendering() {
        assert_eq!(Field::Number(2.5).to_string(), "2.5");
        assert_eq!(Field::Number(10.0).to_string(), "10");
        assert_eq!(Field::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Field::from("").to_string(), "");
    }

    #[test]
    fn test_table_display_has_header() {
        let rendered = sample().to_string();
        let first = rendered.lines().next().unwrap();
        assert!(first.contains("Field1"));
        assert!(first.trim_end().ends_with("_id_"));
        assert_eq!(rendered.lines().count(), sample().len() + 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_keeps_rows_but_not_provenance() {
        let frame = sample();
        let json = serde_json::to_string(&frame).unwrap();
        assert!(!json.contains("\"columns\""));
        let back: MpsFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rows(), frame.rows());
        assert_eq!(back.column_row_id("x", "c1"), None);
        assert_eq!(back.to_free_mps(), frame.to_free_mps());
    }
}
