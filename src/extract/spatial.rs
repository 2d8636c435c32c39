//! Table detection from element layout.
//!
//! Elements with bounding boxes are grouped into rows by vertical center.
//! A run of at least `min_rows` consecutive rows, each with at least
//! `min_columns` cells and separated by small vertical gaps, is reported
//! as a table.

use crate::models::{BoundingBox, ExtractedElement, SpatialTable};

#[derive(Debug, Clone)]
pub struct SpatialAnalyzer {
    pub min_rows: usize,
    pub min_columns: usize,
    /// Row centers closer than this fraction of the median element height
    /// belong to the same row.
    pub row_tolerance: f64,
    /// Rows further apart than this multiple of the median height end a table.
    pub max_row_gap: f64,
}

impl Default for SpatialAnalyzer {
    fn default() -> Self {
        Self {
            min_rows: 3,
            min_columns: 2,
            row_tolerance: 0.5,
            max_row_gap: 2.5,
        }
    }
}

struct Row<'a> {
    center: f64,
    cells: Vec<&'a ExtractedElement>,
}

impl SpatialAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect tables on every page, in page order.
    pub fn detect_tables(&self, elements: &[ExtractedElement]) -> Vec<SpatialTable> {
        let mut pages: Vec<u32> = elements
            .iter()
            .filter(|e| e.bbox.is_some())
            .map(|e| e.page_number)
            .collect();
        pages.sort_unstable();
        pages.dedup();

        pages
            .into_iter()
            .flat_map(|page| {
                let on_page: Vec<&ExtractedElement> = elements
                    .iter()
                    .filter(|e| e.page_number == page && e.bbox.is_some())
                    .collect();
                self.detect_on_page(page, &on_page)
            })
            .collect()
    }

    fn detect_on_page(&self, page: u32, elements: &[&ExtractedElement]) -> Vec<SpatialTable> {
        let median_height = median(elements.iter().filter_map(|e| e.bbox.map(|b| b.height)));
        if median_height <= 0.0 {
            return Vec::new();
        }
        let rows = self.group_rows(elements, median_height);

        let mut tables = Vec::new();
        let mut run: Vec<&Row> = Vec::new();
        for row in &rows {
            let continues = row.cells.len() >= self.min_columns
                && run.last().map_or(true, |prev| {
                    row.center - prev.center <= self.max_row_gap * median_height
                });
            if continues {
                run.push(row);
                continue;
            }
            if let Some(table) = self.build_table(page, &run) {
                tables.push(table);
            }
            run.clear();
            if row.cells.len() >= self.min_columns {
                run.push(row);
            }
        }
        if let Some(table) = self.build_table(page, &run) {
            tables.push(table);
        }
        tables
    }

    fn group_rows<'a>(&self, elements: &[&'a ExtractedElement], median_height: f64) -> Vec<Row<'a>> {
        let mut sorted: Vec<&ExtractedElement> = elements.to_vec();
        sorted.sort_by(|a, b| center_y(a).total_cmp(&center_y(b)));

        let mut rows: Vec<Row> = Vec::new();
        for element in sorted {
            let y = center_y(element);
            match rows.last_mut() {
                Some(row) if (y - row.center).abs() <= self.row_tolerance * median_height => {
                    row.cells.push(element);
                    let n = row.cells.len() as f64;
                    row.center += (y - row.center) / n;
                }
                _ => rows.push(Row {
                    center: y,
                    cells: vec![element],
                }),
            }
        }
        for row in &mut rows {
            row.cells.sort_by(|a, b| left(a).total_cmp(&left(b)));
        }
        rows
    }

    fn build_table(&self, page: u32, run: &[&Row]) -> Option<SpatialTable> {
        if run.len() < self.min_rows {
            return None;
        }
        let cells: Vec<&ExtractedElement> = run.iter().flat_map(|r| r.cells.iter().copied()).collect();
        let bbox = cells
            .iter()
            .filter_map(|e| e.bbox)
            .reduce(|acc, b| acc.union(&b));
        let confidence = cells.iter().map(|e| e.confidence).sum::<f64>() / cells.len() as f64;
        Some(SpatialTable {
            page_number: page,
            rows: run
                .iter()
                .map(|r| r.cells.iter().map(|e| e.text.clone()).collect())
                .collect(),
            bbox: bbox.map(|b| BoundingBox { confidence, ..b }),
            confidence,
        })
    }
}

fn center_y(element: &ExtractedElement) -> f64 {
    element.bbox.map(|b| b.center_y()).unwrap_or(0.0)
}

fn left(element: &ExtractedElement) -> f64 {
    element.bbox.map(|b| b.x).unwrap_or(0.0)
}

fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}
