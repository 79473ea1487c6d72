//! Table output for coverage listings, using comfy-table.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::domain::models::FileStats;

use super::truncate_path;

const PATH_WIDTH: usize = 60;

fn coverage_color(coverage: f64) -> Color {
    if coverage < 50.0 {
        Color::Red
    } else if coverage < 80.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Ranked listing of the least-covered files.
pub fn least_covered_table(files: &[FileStats]) -> String {
    let use_colors = console::colors_enabled();
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("File").add_attribute(Attribute::Bold),
        Cell::new("Coverage").add_attribute(Attribute::Bold),
        Cell::new("Lines").add_attribute(Attribute::Bold),
    ]);

    for (rank, file) in files.iter().enumerate() {
        let coverage = Cell::new(format!("{:.2}%", file.coverage)).set_alignment(CellAlignment::Right);
        let coverage = if use_colors {
            coverage.fg(coverage_color(file.coverage))
        } else {
            coverage
        };

        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(truncate_path(&file.path, PATH_WIDTH)),
            coverage,
            Cell::new(format!("{}/{}", file.covered, file.total)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FileCoverage;

    #[test]
    fn table_lists_files_in_given_order() {
        let files: Vec<_> = [("src/b.rs", 2, 10), ("src/a.rs", 9, 10)]
            .iter()
            .filter_map(|(p, c, t)| FileStats::from_entry(&FileCoverage::with_lines(*p, *c, *t)))
            .collect();

        let rendered = least_covered_table(&files);
        let b = rendered.find("src/b.rs").unwrap();
        let a = rendered.find("src/a.rs").unwrap();
        assert!(b < a);
        assert!(rendered.contains("20.00%"));
        assert!(rendered.contains("9/10"));
    }

    #[test]
    fn colors_follow_thresholds() {
        assert_eq!(coverage_color(10.0), Color::Red);
        assert_eq!(coverage_color(65.0), Color::Yellow);
        assert_eq!(coverage_color(95.0), Color::Green);
    }
}
