//! MPS encoding of a [`Model`].
//!
//! Sections are written in the fixed order NAME, ROWS, COLUMNS, RHS, RANGES,
//! BOUNDS, ENDATA. Encoding reads the model only, so it can be repeated
//! freely and always yields the same rows.

use mpsopt_solver::{Field, MpsFrame};

use crate::{Direction, Model, VariableKind};

const AUXILIARY_VARIABLE: &str = "obj_constant";

const MARKER_START: [&str; 6] = ["", "MARK0000", "'MARKER'", "", "'INTORG'", ""];
const MARKER_END: [&str; 6] = ["", "MARK0001", "'MARKER'", "", "'INTEND'", ""];

/// The objective as written to the frame
struct ObjectiveRow {
    name: Option<String>,
    /// Auxiliary variable name and the constant it is fixed at
    hoisted: Option<(String, f64)>,
}

/// One column of the COLUMNS section
struct Column {
    name: String,
    kind: VariableKind,
    lower: f64,
    upper: f64,
    /// (row, coefficient), objective first
    entries: Vec<(String, f64)>,
}

impl Model {
    /// Encode the model as an MPS frame.
    ///
    /// A nonzero objective constant is hoisted into an auxiliary variable
    /// fixed at that constant, and the objective row is renamed
    /// `<objective>_constant`. Both exist only in the frame.
    pub fn to_frame(&self) -> MpsFrame {
        tracing::debug!(
            component = "encoder",
            operation = "to_frame",
            model = %self.name(),
            "Converting model {} to MPS",
            self.name()
        );
        let objective = objective_row(self);
        let columns = collect_columns(self, &objective);

        let mut frame = MpsFrame::new();
        frame.push([
            Field::from("NAME"),
            Field::Empty,
            Field::text(self.name()),
            Field::from(0.0),
            Field::Empty,
            Field::from(0.0),
        ]);
        write_rows(&mut frame, self, &objective);
        write_columns(&mut frame, &columns);
        write_rhs(&mut frame, self);
        write_ranges(&mut frame, self);
        write_bounds(&mut frame, &columns);
        frame.push([
            Field::from("ENDATA"),
            Field::Empty,
            Field::Empty,
            Field::from(0.0),
            Field::Empty,
            Field::from(0.0),
        ]);
        frame
    }
}

fn header(keyword: &str) -> [Field; 6] {
    [keyword, "", "", "", "", ""].map(Field::from)
}

fn objective_row(model: &Model) -> ObjectiveRow {
    let objective = model.objective();
    let constant = objective.constant();
    match objective.name() {
        Some(name) if constant != 0.0 => {
            let auxiliary = auxiliary_name(model);
            tracing::warn!(
                component = "encoder",
                operation = "to_frame",
                objective = %name,
                constant,
                "The objective function contains a constant term; auxiliary variable {} added",
                auxiliary
            );
            ObjectiveRow {
                name: Some(hoisted_row_name(model, name)),
                hoisted: Some((auxiliary, constant)),
            }
        }
        name => ObjectiveRow {
            name: name.map(str::to_string),
            hoisted: None,
        },
    }
}

fn auxiliary_name(model: &Model) -> String {
    first_free(AUXILIARY_VARIABLE, |name| {
        model.registry().contains(name) || model.get_variable(name).is_some()
    })
}

/// `<objective>_constant`, suffixed until it clashes with no registered name or row
fn hoisted_row_name(model: &Model, objective: &str) -> String {
    first_free(&format!("{}_constant", objective), |name| {
        model.registry().contains(name) || model.constraint(name).is_some()
    })
}

/// `base`, else the first of `base_1`, `base_2`, ... not `taken`
fn first_free(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut name = base.to_string();
    let mut counter = 0;
    while taken(&name) {
        counter += 1;
        name = format!("{}_{}", base, counter);
    }
    name
}

fn collect_columns(model: &Model, objective: &ObjectiveRow) -> Vec<Column> {
    let mut columns: Vec<Column> = model
        .variables()
        .map(|var| {
            let mut entries = Vec::new();
            if let Some(row) = &objective.name {
                if let Some(coef) = model.objective().coefficient(var.name()) {
                    entries.push((row.clone(), coef));
                }
            }
            for row in var.constraint_refs() {
                let coef = model
                    .constraint(row)
                    .and_then(|c| c.body().coefficient(var.name()));
                if let Some(coef) = coef {
                    entries.push((row.to_string(), coef));
                }
            }
            entries.retain(|(_, coef)| *coef != 0.0);
            Column {
                name: var.name().to_string(),
                kind: var.kind(),
                lower: var.lower(),
                upper: var.upper(),
                entries,
            }
        })
        .collect();

    if let (Some(row), Some((auxiliary, constant))) = (&objective.name, &objective.hoisted) {
        columns.push(Column {
            name: auxiliary.clone(),
            kind: VariableKind::Continuous,
            lower: *constant,
            upper: *constant,
            entries: vec![(row.clone(), 1.0)],
        });
    }
    columns
}

fn write_rows(frame: &mut MpsFrame, model: &Model, objective: &ObjectiveRow) {
    frame.push(header("ROWS"));
    if let Some(name) = &objective.name {
        frame.push([model.sense().as_str(), name.as_str(), "", "", "", ""].map(Field::from));
    }
    for c in model.constraints() {
        if let Some(name) = c.name() {
            frame.push([c.direction().code(), name, "", "", "", ""].map(Field::from));
        }
    }
}

/// Integer runs are bracketed by markers; a marker is written only when
/// the running type changes, plus a closing one for a trailing run.
fn write_columns(frame: &mut MpsFrame, columns: &[Column]) {
    frame.push(header("COLUMNS"));
    let mut in_integer_run = false;
    for column in columns {
        let is_integer = column.kind == VariableKind::Integer;
        if is_integer && !in_integer_run {
            frame.push(MARKER_START.map(Field::from));
            in_integer_run = true;
        } else if !is_integer && in_integer_run {
            frame.push(MARKER_END.map(Field::from));
            in_integer_run = false;
        }
        for pair in column.entries.chunks(2) {
            let (row, coef) = &pair[0];
            let (row2, coef2) = match pair.get(1) {
                Some((row2, coef2)) => (Field::text(row2), Field::from(*coef2)),
                None => (Field::Empty, Field::Empty),
            };
            let id = frame.push([
                Field::Empty,
                Field::text(&column.name),
                Field::text(row),
                Field::from(*coef),
                row2,
                coef2,
            ]);
            for (row, _) in pair {
                frame.record_column(&column.name, row, id);
            }
        }
    }
    if in_integer_run {
        frame.push(MARKER_END.map(Field::from));
    }
}

fn write_rhs(frame: &mut MpsFrame, model: &Model) {
    frame.push(header("RHS"));
    let mut entries = Vec::new();
    for c in model.constraints() {
        let Some(name) = c.name() else { continue };
        let constant = c.body().constant();
        let suppressed = match c.direction() {
            Direction::Le => constant == f64::NEG_INFINITY,
            Direction::Ge => constant == 0.0,
            Direction::Eq => false,
        };
        let rhs = -constant;
        if !suppressed && rhs != 0.0 {
            entries.push((name, rhs));
        }
    }
    for pair in entries.chunks(2) {
        let (row, value) = pair[0];
        let (row2, value2) = match pair.get(1) {
            Some((row2, value2)) => (Field::from(*row2), Field::from(*value2)),
            None => (Field::Empty, Field::Empty),
        };
        frame.push([Field::Empty, Field::from("RHS"), Field::from(row), Field::from(value), row2, value2]);
    }
}

fn write_ranges(frame: &mut MpsFrame, model: &Model) {
    frame.push(header("RANGES"));
    for c in model.constraints() {
        if let (Some(name), range) = (c.name(), c.range()) {
            if range != 0.0 {
                frame.push([
                    Field::Empty,
                    Field::from("rng"),
                    Field::from(name),
                    Field::from(range),
                    Field::Empty,
                    Field::Empty,
                ]);
            }
        }
    }
}

fn push_bound(frame: &mut MpsFrame, kind: &str, column: &str, value: Field) {
    frame.push([
        Field::from(kind),
        Field::from("BND"),
        Field::from(column),
        value,
        Field::Empty,
        Field::Empty,
    ]);
}

/// Columns without any COLUMNS entry get no bounds
fn write_bounds(frame: &mut MpsFrame, columns: &[Column]) {
    frame.push(header("BOUNDS"));
    for column in columns {
        if !frame.has_columns(&column.name) {
            continue;
        }
        let name = column.name.as_str();
        if column.lower == f64::NEG_INFINITY && column.upper == f64::INFINITY {
            push_bound(frame, "FR", name, Field::Empty);
        } else if column.lower != 0.0 {
            push_bound(frame, "LO", name, Field::from(column.lower));
        }
        let binary = column.kind == VariableKind::Binary;
        if column.upper.is_finite() && !(binary && column.upper == 1.0) {
            push_bound(frame, "UP", name, Field::from(column.upper));
        }
        if binary {
            push_bound(frame, "BV", name, Field::from(1.0));
        }
        if column.kind == VariableKind::Integer && column.lower == 0.0 {
            push_bound(frame, "LO", name, Field::from(0.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expression, NameRegistry, VarRef, VariableSpec};
    use mpsopt_solver::ObjectiveSense;

    fn words(frame: &MpsFrame, section: &str) -> Vec<String> {
        frame
            .section(section)
            .iter()
            .map(|r| {
                r.fields
                    .iter()
                    .filter(|f| !f.is_empty())
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    fn model_with(specs: Vec<VariableSpec>) -> (Model, Vec<VarRef>) {
        let mut m = Model::new(&NameRegistry::new(), Some("m")).unwrap();
        let refs = specs.into_iter().map(|s| m.add_variable(s).unwrap()).collect();
        (m, refs)
    }

    #[test]
    fn test_empty_model() {
        let (m, _) = model_with(vec![]);
        let frame = m.to_frame();
        let keywords: Vec<String> = frame.iter().map(|r| r.fields[0].to_string()).collect();
        assert_eq!(keywords, vec!["NAME", "ROWS", "COLUMNS", "RHS", "RANGES", "BOUNDS", "ENDATA"]);
        assert_eq!(frame.rows()[0].fields[2], Field::text("m"));
        assert_eq!(frame.rows()[0].fields[3], Field::Number(0.0));
        assert_eq!(frame.rows()[6].id, 7);
    }

    #[test]
    fn test_columns_are_paired() {
        let (mut m, v) = model_with(vec![VariableSpec::new("x")]);
        for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
            let c = (Expression::from(&v[0]) * (i as f64 + 1.0)).leq(10.0);
            m.add_constraint(c, Some(name)).unwrap();
        }
        m.set_objective(5.0 * &v[0], ObjectiveSense::Minimize, Some("cost")).unwrap();
        let frame = m.to_frame();
        assert_eq!(words(&frame, "COLUMNS"), vec!["x cost 5 a 1", "x b 2 c 3"]);
        assert_eq!(frame.column_row_id("x", "a"), frame.column_row_id("x", "cost"));
        assert_ne!(frame.column_row_id("x", "b"), frame.column_row_id("x", "a"));
    }

    #[test]
    fn test_odd_entry_is_flushed_alone() {
        let (mut m, v) = model_with(vec![VariableSpec::new("x"), VariableSpec::new("y")]);
        m.add_constraint((&v[0] + &v[1]).leq(4.0), Some("c1")).unwrap();
        m.add_constraint(Expression::from(&v[1]).leq(3.0), Some("c2")).unwrap();
        m.add_constraint(Expression::from(&v[1]).geq(1.0), Some("c3")).unwrap();
        let frame = m.to_frame();
        assert_eq!(words(&frame, "COLUMNS"), vec!["x c1 1", "y c1 1 c2 1", "y c3 1"]);
        assert_eq!(words(&frame, "RHS"), vec!["RHS c1 4 c2 3", "RHS c3 1"]);
    }

    #[test]
    fn test_markers_follow_type_changes() {
        let (mut m, v) = model_with(vec![
            VariableSpec::new("i1").integer(),
            VariableSpec::new("i2").integer(),
            VariableSpec::new("c1"),
            VariableSpec::new("b1").binary(),
            VariableSpec::new("i3").integer(),
        ]);
        m.set_objective(Expression::sum(v.iter()), ObjectiveSense::Minimize, Some("obj")).unwrap();
        let frame = m.to_frame();
        assert_eq!(
            words(&frame, "COLUMNS"),
            vec![
                "MARK0000 'MARKER' 'INTORG'",
                "i1 obj 1",
                "i2 obj 1",
                "MARK0001 'MARKER' 'INTEND'",
                "c1 obj 1",
                "b1 obj 1",
                "MARK0000 'MARKER' 'INTORG'",
                "i3 obj 1",
                "MARK0001 'MARKER' 'INTEND'",
            ]
        );
    }

    #[test]
    fn test_bounds_selection() {
        let (mut m, v) = model_with(vec![
            VariableSpec::new("free").free(),
            VariableSpec::new("shifted").bounds(2.0, 8.0),
            VariableSpec::new("flag").binary(),
            VariableSpec::new("count").integer(),
            VariableSpec::new("unused").upper(3.0),
        ]);
        let used = Expression::sum(v[..4].iter());
        m.set_objective(used, ObjectiveSense::Minimize, Some("obj")).unwrap();
        let frame = m.to_frame();
        assert_eq!(
            words(&frame, "BOUNDS"),
            vec![
                "FR BND free",
                "LO BND shifted 2",
                "UP BND shifted 8",
                "BV BND flag 1",
                "LO BND count 0",
            ]
        );
    }

    #[test]
    fn test_rhs_suppression_and_ranges() {
        let (mut m, v) = model_with(vec![VariableSpec::new("x"), VariableSpec::new("y")]);
        m.add_constraint(Expression::from(&v[0]).geq(0.0), Some("nonneg")).unwrap();
        m.add_constraint((&v[0] - &v[1]).between(4.0, 10.0), Some("band")).unwrap();
        m.add_constraint(Expression::from(&v[1]).equals(0.0), Some("pin")).unwrap();
        let frame = m.to_frame();
        assert_eq!(words(&frame, "ROWS"), vec!["G nonneg", "E band", "E pin"]);
        assert_eq!(words(&frame, "RHS"), vec!["RHS band 4"]);
        assert_eq!(words(&frame, "RANGES"), vec!["rng band 6"]);
    }

    #[test]
    fn test_constant_hoist_lives_only_in_frame() {
        let (mut m, v) = model_with(vec![VariableSpec::new("sales"), VariableSpec::new("material")]);
        m.set_objective(5.0 * &v[0] - 2.0 * &v[1] + 100.0, ObjectiveSense::Maximize, Some("profit"))
            .unwrap();
        let frame = m.to_frame();
        assert_eq!(words(&frame, "ROWS"), vec!["MAX profit_constant"]);
        let columns = words(&frame, "COLUMNS");
        assert_eq!(columns.last().map(String::as_str), Some("obj_constant profit_constant 1"));
        assert_eq!(
            words(&frame, "BOUNDS"),
            vec!["LO BND obj_constant 100", "UP BND obj_constant 100"]
        );
        assert_eq!(m.num_variables(), 2);
        assert_eq!(m.objective().name(), Some("profit"));
        assert_eq!(m.objective().constant(), 100.0);
    }

    #[test]
    fn test_auxiliary_name_avoids_collisions() {
        let (mut m, v) = model_with(vec![VariableSpec::new("obj_constant")]);
        m.set_objective(Expression::from(&v[0]) + 1.0, ObjectiveSense::Minimize, Some("o"))
            .unwrap();
        let frame = m.to_frame();
        assert!(frame.has_columns("obj_constant_1"));
    }

    #[test]
    fn test_hoisted_row_avoids_constraint_names() {
        let (mut m, v) = model_with(vec![VariableSpec::new("x")]);
        m.add_constraint(Expression::from(&v[0]).leq(4.0), Some("profit_constant"))
            .unwrap();
        m.set_objective(2.0 * &v[0] + 5.0, ObjectiveSense::Maximize, Some("profit"))
            .unwrap();
        let frame = m.to_frame();
        assert_eq!(
            words(&frame, "ROWS"),
            vec!["MAX profit_constant_1", "L profit_constant"]
        );
        assert_eq!(
            words(&frame, "COLUMNS"),
            vec![
                "x profit_constant_1 2 profit_constant 1",
                "obj_constant profit_constant_1 1",
            ]
        );
    }

    #[test]
    fn test_all_zero_column_gets_no_bounds() {
        let (mut m, v) = model_with(vec![
            VariableSpec::new("x").upper(3.0),
            VariableSpec::new("idle").bounds(1.0, 2.0),
        ]);
        m.add_constraint(Expression::from(&v[0]).leq(1.0), Some("c1")).unwrap();
        m.set_coef("idle", "c1", 0.0).unwrap();
        m.set_objective(Expression::from(&v[0]), ObjectiveSense::Minimize, Some("obj"))
            .unwrap();
        assert!(m.constraint("c1").unwrap().body().contains("idle"));

        let frame = m.to_frame();
        assert_eq!(words(&frame, "COLUMNS"), vec!["x obj 1 c1 1"]);
        assert!(!frame.has_columns("idle"));
        assert_eq!(words(&frame, "BOUNDS"), vec!["UP BND x 3"]);
    }

    #[test]
    fn test_encoding_is_repeatable() {
        let (mut m, v) = model_with(vec![VariableSpec::new("x").integer().upper(4.0), VariableSpec::new("y")]);
        m.add_constraint((&v[0] + 2.0 * &v[1]).leq(7.0), Some("c1")).unwrap();
        m.set_objective(&v[0] - &v[1] + 3.0, ObjectiveSense::Minimize, None).unwrap();
        let first = m.to_frame();
        let second = m.to_frame();
        assert_eq!(first.without_ids(), second.without_ids());
        assert_eq!(first, second);
    }
}
