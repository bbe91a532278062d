//! Shape walker.
//!
//! Both translation passes go through these two functions, so the set and
//! order of visited units is the same for counting and for mutation:
//! group children in child order, runs paragraph by paragraph, table cells
//! row-major, and one unit for every other shape. A group contributes no
//! unit of its own.

use crate::types::{Cell, OpaqueKind, Presentation, Run, Shape, Slide};

/// A translatable unit, borrowed for reading.
#[derive(Debug, Clone, Copy)]
pub enum Unit<'a> {
    Run(&'a Run),
    Cell(&'a Cell),
    Opaque(OpaqueKind),
}

/// A translatable unit, borrowed for mutation.
#[derive(Debug)]
pub enum UnitMut<'a> {
    Run(&'a mut Run),
    Cell(&'a mut Cell),
    Opaque(OpaqueKind),
}

impl UnitMut<'_> {
    /// Current text of the unit; `None` for opaque units.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Run(run) => Some(run.text().to_string()),
            Self::Cell(cell) => Some(cell.text()),
            Self::Opaque(_) => None,
        }
    }

    /// Overwrite the unit's text. Opaque units are left untouched.
    pub fn set_text(&mut self, text: String) {
        match self {
            Self::Run(run) => run.set_text(text),
            Self::Cell(cell) => cell.set_text(text),
            Self::Opaque(_) => {}
        }
    }
}

/// Visit every unit of the presentation in walk order.
pub fn visit_units<'a, F>(presentation: &'a Presentation, mut visit: F)
where
    F: FnMut(Unit<'a>),
{
    for slide in &presentation.slides {
        visit_slide_units(slide, &mut visit);
    }
}

/// Visit the units of a single slide in walk order.
pub fn visit_slide_units<'a, F>(slide: &'a Slide, mut visit: F)
where
    F: FnMut(Unit<'a>),
{
    for shape in &slide.shapes {
        visit_shape(shape, &mut visit);
    }
}

fn visit_shape<'a, F>(shape: &'a Shape, visit: &mut F)
where
    F: FnMut(Unit<'a>),
{
    match shape {
        Shape::Group(children) => {
            for child in children {
                visit_shape(child, visit);
            }
        }
        Shape::Text(frame) => {
            for paragraph in &frame.paragraphs {
                for run in &paragraph.runs {
                    visit(Unit::Run(run));
                }
            }
        }
        Shape::Table(table) => {
            for row in &table.rows {
                for cell in &row.cells {
                    visit(Unit::Cell(cell));
                }
            }
        }
        Shape::Opaque(kind) => visit(Unit::Opaque(*kind)),
    }
}

/// Visit every unit mutably in walk order, stopping at the first error.
pub fn visit_units_mut<F, E>(presentation: &mut Presentation, mut visit: F) -> Result<(), E>
where
    F: FnMut(UnitMut<'_>) -> Result<(), E>,
{
    for slide in &mut presentation.slides {
        for shape in &mut slide.shapes {
            visit_shape_mut(shape, &mut visit)?;
        }
    }
    Ok(())
}

fn visit_shape_mut<F, E>(shape: &mut Shape, visit: &mut F) -> Result<(), E>
where
    F: FnMut(UnitMut<'_>) -> Result<(), E>,
{
    match shape {
        Shape::Group(children) => {
            for child in children {
                visit_shape_mut(child, visit)?;
            }
        }
        Shape::Text(frame) => {
            for paragraph in &mut frame.paragraphs {
                for run in &mut paragraph.runs {
                    visit(UnitMut::Run(run))?;
                }
            }
        }
        Shape::Table(table) => {
            for row in &mut table.rows {
                for cell in &mut row.cells {
                    visit(UnitMut::Cell(cell))?;
                }
            }
        }
        Shape::Opaque(kind) => visit(UnitMut::Opaque(*kind))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Paragraph, Slide, Table, TableRow, TextFrame};

    fn text_box(runs: &[&str]) -> Shape {
        Shape::Text(TextFrame::new(vec![Paragraph::new(
            runs.iter().map(|t| Run::new(*t)).collect(),
        )]))
    }

    fn label(unit: &Unit<'_>) -> String {
        match unit {
            Unit::Run(run) => run.text().to_string(),
            Unit::Cell(cell) => cell.text(),
            Unit::Opaque(kind) => format!("<{}>", kind),
        }
    }

    fn sample() -> Presentation {
        let table = Table {
            rows: vec![
                TableRow {
                    cells: vec![
                        Cell::new(vec![Paragraph::new(vec![Run::new("r1c1")])]),
                        Cell::new(vec![Paragraph::new(vec![Run::new("r1c2")])]),
                    ],
                },
                TableRow {
                    cells: vec![
                        Cell::new(vec![Paragraph::new(vec![Run::new("r2c1")])]),
                        Cell::new(vec![Paragraph::new(vec![Run::new("r2c2")])]),
                    ],
                },
            ],
        };

        let mut first = Slide::new(1, "ppt/slides/slide1.xml");
        first.add_shape(Shape::Group(vec![
            text_box(&["g1"]),
            Shape::Group(vec![text_box(&["g2a", "g2b"])]),
            Shape::Opaque(OpaqueKind::Picture),
        ]));
        first.add_shape(text_box(&["top"]));

        let mut second = Slide::new(2, "ppt/slides/slide2.xml");
        second.add_shape(Shape::Table(table));

        let mut presentation = Presentation::new();
        presentation.add_slide(first);
        presentation.add_slide(second);
        presentation
    }

    #[test]
    fn test_walk_order() {
        let presentation = sample();
        let mut seen = Vec::new();
        visit_units(&presentation, |unit| seen.push(label(&unit)));

        assert_eq!(
            seen,
            vec!["g1", "g2a", "g2b", "<picture>", "top", "r1c1", "r1c2", "r2c1", "r2c2"]
        );
    }

    #[test]
    fn test_mutable_walk_matches_read_only_walk() {
        let mut presentation = sample();
        let mut expected = Vec::new();
        visit_units(&presentation, |unit| expected.push(label(&unit)));

        let mut seen = Vec::new();
        visit_units_mut(&mut presentation, |unit| {
            seen.push(unit.text().unwrap_or_else(|| "<picture>".to_string()));
            Ok::<_, ()>(())
        })
        .unwrap();

        assert_eq!(seen, expected);
    }

    #[test]
    fn test_mutable_walk_stops_on_error() {
        let mut presentation = sample();
        let mut visited = 0;
        let result = visit_units_mut(&mut presentation, |_| {
            visited += 1;
            if visited == 3 {
                Err("boom")
            } else {
                Ok(())
            }
        });

        assert_eq!(result, Err("boom"));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_empty_group_has_no_units() {
        let mut slide = Slide::new(1, "ppt/slides/slide1.xml");
        slide.add_shape(Shape::Group(Vec::new()));
        let mut presentation = Presentation::new();
        presentation.add_slide(slide);

        let mut count = 0;
        visit_units(&presentation, |_| count += 1);
        assert_eq!(count, 0);
    }
}
