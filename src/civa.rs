// CIVA simulation text exports (C-scan, true C-scan, B-scan, beam profile)

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::axis::AxisBuilder;
use crate::decoder::FormatDecoder;
use crate::error::{DecodeError, Location, Result};
use crate::header::{parse_number, split_unit, Separator, TextHeaderParser};
use crate::model::{Axis, InfoMap, LabeledArray};

/// Which CIVA export a text file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    CScan,
    TrueCScan,
    BScan,
    Beam,
}

impl ScanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanKind::CScan => "cscan",
            ScanKind::TrueCScan => "true_cscan",
            ScanKind::BScan => "bscan",
            ScanKind::Beam => "beam",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cscan" => Ok(ScanKind::CScan),
            "true_cscan" | "tcscan" => Ok(ScanKind::TrueCScan),
            "bscan" => Ok(ScanKind::BScan),
            "beam" => Ok(ScanKind::Beam),
            other => Err(format!(
                "unknown CIVA scan kind '{}' (expected cscan, true_cscan, bscan or beam)",
                other
            )),
        }
    }
}

/// Line holding the column labels of a B-scan export.
const BSCAN_LABEL_LINE: usize = 18;
/// Line holding the column labels of a beam profile export.
const BEAM_LABEL_LINE: usize = 9;
/// Line of the first true C-scan cell.
const TRUE_CSCAN_DATA_LINE: usize = 6;
const DEFAULT_UNIT: &str = "mm";

/// Where the values of each data row go.
#[derive(Debug)]
enum Cells {
    /// One value per row, stored at `targets[i]` of the flattened grid.
    Scattered { value_column: usize, targets: Vec<usize> },
    /// One array row per data row, taken from these columns.
    Profile { columns: Vec<usize> },
}

struct CivaHeader {
    rows: Axis,
    columns: Axis,
    cells: Cells,
    /// 0-based index of the first data line.
    data_start: usize,
    attrs: InfoMap,
}

struct GridDecoder {
    kind: ScanKind,
}

impl FormatDecoder for GridDecoder {
    type Source = str;
    type Header = CivaHeader;
    type Output = LabeledArray;

    const FORMAT: &'static str = "civa";

    fn parse_header(&self, content: &str) -> Result<CivaHeader> {
        match self.kind {
            ScanKind::CScan => parse_table(content),
            ScanKind::TrueCScan => parse_indexed(content),
            ScanKind::BScan => parse_profile(content, BSCAN_LABEL_LINE, Some(1e-6)),
            ScanKind::Beam => parse_profile(content, BEAM_LABEL_LINE, None),
        }
    }

    fn decode_payload(&self, content: &str, header: &CivaHeader) -> Result<Vec<f64>> {
        let rows = data_rows(content, header.data_start);
        match &header.cells {
            Cells::Scattered {
                value_column,
                targets,
            } => {
                let mut grid = vec![0.0; targets.len()];
                for ((line_no, row), &target) in rows.zip(targets) {
                    grid[target] = sample(line_no, cell(&row, *value_column))?;
                }
                Ok(grid)
            }
            Cells::Profile { columns } => {
                let mut data = Vec::with_capacity(columns.len() * header.rows.len());
                for (line_no, row) in rows {
                    for &j in columns {
                        data.push(sample(line_no, cell(&row, j))?);
                    }
                }
                Ok(data)
            }
        }
    }

    fn axes(&self, header: &CivaHeader) -> Result<Vec<Axis>> {
        Ok(vec![header.rows.clone(), header.columns.clone()])
    }

    fn assemble(&self, header: CivaHeader, samples: Vec<f64>, axes: Vec<Axis>) -> Result<LabeledArray> {
        let mut attrs = header.attrs;
        attrs.insert("kind".to_string(), self.kind.as_str().into());
        LabeledArray::new(samples, axes, attrs)
    }

    fn describe(&self, header: &CivaHeader) -> String {
        format!(
            "{} grid of {} {} x {} {}, data from line {}",
            self.kind,
            header.rows.len(),
            header.rows.name(),
            header.columns.len(),
            header.columns.name(),
            header.data_start + 1
        )
    }
}

/// C-scan long table: Y, X and amplitude in columns 1, 2 and 5 of every row,
/// one row per grid cell in any order, after a line of column labels.
fn parse_table(content: &str) -> Result<CivaHeader> {
    const Y: usize = 0;
    const X: usize = 1;
    const VALUE: usize = 4;

    let data_start = content
        .lines()
        .position(|line| {
            let row = columns(line);
            [Y, X, VALUE].iter().all(|&j| parse_number(cell(&row, j)).is_some())
        })
        .ok_or_else(|| DecodeError::malformed(Location::Line(1), "no C-scan data rows"))?;
    debug!("civa: C-scan table starts at line {}", data_start + 1);

    let mut points = Vec::new();
    for (line_no, row) in data_rows(content, data_start) {
        require_columns(line_no, &row, VALUE + 1)?;
        points.push((line_no, sample(line_no, row[Y])?, sample(line_no, row[X])?));
    }

    let ys = distinct(points.iter().map(|p| p.1));
    let xs = distinct(points.iter().map(|p| p.2));
    let placed: Vec<_> = points
        .iter()
        .map(|&(line_no, y, x)| {
            (
                line_no,
                ys.partition_point(|&v| v < y),
                xs.partition_point(|&v| v < x),
            )
        })
        .collect();
    let targets = fill_grid(&placed, ys.len(), xs.len())?;

    Ok(CivaHeader {
        rows: AxisBuilder::new("Y", DEFAULT_UNIT).explicit(ys)?,
        columns: AxisBuilder::new("X", DEFAULT_UNIT).explicit(xs)?,
        cells: Cells::Scattered {
            value_column: VALUE,
            targets,
        },
        data_start,
        attrs: InfoMap::new(),
    })
}

/// True C-scan: `;xmin;xmax;ymin;ymax` on line 1, the X and Y steps on lines
/// 3 and 4, then one row per cell holding its X index, Y index and value in
/// columns 1, 2 and 6.
fn parse_indexed(content: &str) -> Result<CivaHeader> {
    const X_INDEX: usize = 0;
    const Y_INDEX: usize = 1;
    const VALUE: usize = 5;

    let head: Vec<Vec<&str>> = content.lines().take(4).map(columns).collect();
    let line = |n: usize| {
        head.get(n - 1).ok_or_else(|| {
            DecodeError::malformed(Location::Line(n), "true C-scan header ends early")
        })
    };
    let limits = line(1)?;
    let (x_min, x_max) = (header_number(limits, 1, 1)?, header_number(limits, 2, 1)?);
    let (y_min, y_max) = (header_number(limits, 3, 1)?, header_number(limits, 4, 1)?);
    let x_step = header_number(line(3)?, 1, 3)?;
    let y_step = header_number(line(4)?, 1, 4)?;
    let nx = extent("X", x_max - x_min, x_step, 3)?;
    let ny = extent("Y", y_max - y_min, y_step, 4)?;

    let data_start = TRUE_CSCAN_DATA_LINE - 1;
    let mut placed = Vec::new();
    for (line_no, row) in data_rows(content, data_start) {
        require_columns(line_no, &row, VALUE + 1)?;
        let ix = cell_index(line_no, row[X_INDEX], nx, "X")?;
        let iy = cell_index(line_no, row[Y_INDEX], ny, "Y")?;
        placed.push((line_no, iy, ix));
    }
    // axes are only built once the file has shown it holds nx * ny cells
    let targets = fill_grid(&placed, ny, nx)?;

    Ok(CivaHeader {
        rows: AxisBuilder::new("Y", DEFAULT_UNIT)
            .origin(y_min)
            .step(y_step)
            .build(ny),
        columns: AxisBuilder::new("X", DEFAULT_UNIT)
            .origin(x_min)
            .step(x_step)
            .build(nx),
        cells: Cells::Scattered {
            value_column: VALUE,
            targets,
        },
        data_start,
        attrs: InfoMap::new(),
    })
}

/// B-scan and beam profile: a label line names every column, the `val`
/// columns carry their X position in the label, and column 1 of each data
/// row holds the time (B-scan, in µs) or depth of that row.
fn parse_profile(content: &str, label_line: usize, time_scale: Option<f64>) -> Result<CivaHeader> {
    let labels = content
        .lines()
        .nth(label_line - 1)
        .map(columns)
        .ok_or_else(|| DecodeError::malformed(Location::Line(label_line), "column label line missing"))?;

    let mut value_columns = Vec::new();
    let mut xs = Vec::new();
    for (j, label) in labels.iter().enumerate().skip(1) {
        if !label.contains("val") {
            continue;
        }
        let x = first_number(label).ok_or_else(|| {
            DecodeError::malformed(
                Location::Line(label_line),
                format!("column label '{}' has no position", label),
            )
        })?;
        value_columns.push(j);
        xs.push(x);
    }
    let Some(&last) = value_columns.last() else {
        return Err(DecodeError::malformed(
            Location::Line(label_line),
            "no 'val' columns in the column labels",
        ));
    };

    let (z_scale, z_unit) = match time_scale {
        Some(scale) => (scale, "s".to_string()),
        None => {
            let unit = labels.first().and_then(|l| split_unit(l).1);
            (1.0, unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()))
        }
    };
    let mut zs = Vec::new();
    for (line_no, row) in data_rows(content, label_line) {
        require_columns(line_no, &row, last + 1)?;
        zs.push(sample(line_no, row[0])? * z_scale);
    }

    Ok(CivaHeader {
        rows: AxisBuilder::new("Z", z_unit).explicit(zs)?,
        columns: AxisBuilder::new("X", DEFAULT_UNIT).explicit(xs)?,
        cells: Cells::Profile {
            columns: value_columns,
        },
        data_start: label_line,
        attrs: preamble(content, label_line - 1),
    })
}

/// `key;value` (or blank separated) lines above the column labels.
fn preamble(content: &str, count: usize) -> InfoMap {
    let lines = || content.lines().take(count).enumerate().map(|(i, l)| (i + 1, l));
    let separator = if lines().any(|(_, l)| l.contains(';')) {
        Separator::Char(';')
    } else {
        Separator::Whitespace
    };
    let fields = TextHeaderParser::new(separator).parse(lines());
    debug!("civa: {} preamble fields using {:?}", fields.len(), separator);
    fields
        .metas()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn columns(line: &str) -> Vec<&str> {
    line.split(';').map(str::trim).collect()
}

fn cell<'a>(row: &[&'a str], j: usize) -> &'a str {
    row.get(j).copied().unwrap_or("")
}

/// Non-blank lines from `start` (0-based) on, split into columns, with 1-based line numbers.
fn data_rows(content: &str, start: usize) -> impl Iterator<Item = (usize, Vec<&str>)> {
    content
        .lines()
        .enumerate()
        .skip(start)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, columns(line)))
}

fn require_columns(line: usize, row: &[&str], expected: usize) -> Result<()> {
    if row.len() < expected {
        return Err(DecodeError::RowLengthMismatch {
            line,
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

fn sample(line: usize, token: &str) -> Result<f64> {
    parse_number(token)
        .filter(|v| v.is_finite())
        .ok_or_else(|| DecodeError::InvalidSample {
            line,
            token: token.to_string(),
        })
}

fn header_number(row: &[&str], j: usize, line: usize) -> Result<f64> {
    parse_number(cell(row, j))
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            DecodeError::malformed(
                Location::Line(line),
                format!("column {} is not a number: '{}'", j + 1, cell(row, j)),
            )
        })
}

/// Number of `step`s in `span`, rounded; at least one.
fn extent(axis: &str, span: f64, step: f64, line: usize) -> Result<usize> {
    let points = (span / step).round();
    if !points.is_finite() || points < 1.0 || points >= usize::MAX as f64 {
        return Err(DecodeError::malformed(
            Location::Line(line),
            format!("{} limits and step {} give {} points", axis, step, points),
        ));
    }
    Ok(points as usize)
}

fn cell_index(line: usize, token: &str, extent: usize, axis: &str) -> Result<usize> {
    let value = sample(line, token)?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(DecodeError::InvalidSample {
            line,
            token: token.to_string(),
        });
    }
    if value >= extent as f64 {
        return Err(DecodeError::DimensionMismatch {
            what: format!("{} cell index on line {}", axis, line),
            expected: extent,
            actual: value as usize,
        });
    }
    Ok(value as usize)
}

fn distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Flat index of every `(line, row, column)` placement. The rows must cover
/// the `nrows x ncols` grid exactly once.
fn fill_grid(placed: &[(usize, usize, usize)], nrows: usize, ncols: usize) -> Result<Vec<usize>> {
    let cells = nrows
        .checked_mul(ncols)
        .filter(|&cells| cells == placed.len())
        .ok_or_else(|| DecodeError::DimensionMismatch {
            what: format!("CIVA data rows for a {} x {} grid", nrows, ncols),
            expected: nrows.saturating_mul(ncols),
            actual: placed.len(),
        })?;

    let mut seen = vec![false; cells];
    let mut targets = Vec::with_capacity(cells);
    for &(line, row, column) in placed {
        let flat = row * ncols + column;
        if std::mem::replace(&mut seen[flat], true) {
            return Err(DecodeError::InvalidAxis {
                axis: "Y, X".to_string(),
                reason: format!("line {} repeats grid cell ({}, {})", line, row, column),
            });
        }
        targets.push(flat);
    }
    Ok(targets)
}

/// First number in a column label, sign included: `val X=-1.5` gives -1.5.
fn first_number(label: &str) -> Option<f64> {
    let digit = label.find(|c: char| c.is_ascii_digit())?;
    let bytes = label.as_bytes();
    let mut start = digit;
    while start > 0 && matches!(bytes[start - 1], b'-' | b'+' | b'.') {
        start -= 1;
    }
    let end = label[digit..]
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+')))
        .map_or(label.len(), |n| digit + n);
    (start + 1..=end)
        .rev()
        .find_map(|e| label[start..e].parse::<f64>().ok())
}

/// Decode a CIVA text export into a 2-D array.
///
/// `cscan` and `true_cscan` produce dimensions `(Y, X)` in millimetres.
/// `bscan` and `beam` produce `(Z, X)`: the B-scan time axis is converted
/// from microseconds to seconds, the beam depth keeps the unit of its column
/// label (`mm` when there is none).
pub fn decode_civa_scan(content: &str, kind: ScanKind) -> Result<LabeledArray> {
    GridDecoder { kind }.decode(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetaValue;

    // rows deliberately out of grid order
    const CSCAN: &str = "\
Y (mm);X (mm);Z (mm);Time (us);Amplitude
2;1;0;0;6
0;-1;0;0;1
0;0;0;0;2
2;-1;0;0;4
0;1;0;0;3
2;0;0;0;5
";

    fn true_cscan(x_max: &str, y_max: &str, step: &str) -> String {
        let mut text = format!(
            "Limits;0;{};10;{}\nSteps\nX step;{}\nY step;{}\nX index;Y index;X;Y;Z;Amplitude\n",
            x_max, y_max, step, step
        );
        for iy in 0..2 {
            for ix in 0..4 {
                text.push_str(&format!("{};{};0;0;0;{}\n", ix, iy, 10 * iy + ix));
            }
        }
        text
    }

    /// Preamble lines, the column labels on `label_line`, then two rows.
    fn profile(label_line: usize, z_label: &str) -> String {
        let mut text = String::from("Gain (dB);12\nFrequency (MHz);2,25\n");
        for _ in 3..label_line {
            text.push_str("-\n");
        }
        text.push_str(&format!("{};val X=-1.5;val X=0;val X=1.5;\n", z_label));
        text.push_str("10;1;2;3\n10.5;4;5;6\n");
        text
    }

    #[test]
    fn test_cscan_long_table() {
        let scan = decode_civa_scan(CSCAN, ScanKind::CScan).unwrap();

        assert_eq!(scan.dims(), vec!["Y", "X"]);
        assert_eq!(scan.shape(), &[2, 3]);
        assert_eq!(scan.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(scan.axis("X").unwrap().values, vec![-1.0, 0.0, 1.0]);
        assert_eq!(scan.axis("Y").unwrap().values, vec![0.0, 2.0]);
        assert_eq!(scan.axis("X").unwrap().unit(), "mm");
        assert_eq!(scan.attrs()["kind"], MetaValue::Text("cscan".to_string()));
    }

    #[test]
    fn test_cscan_missing_cell() {
        let text = CSCAN.replace("2;0;0;0;5\n", "");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::CScan),
            Err(DecodeError::DimensionMismatch { expected: 6, actual: 5, .. })
        ));
    }

    #[test]
    fn test_cscan_repeated_cell() {
        let text = CSCAN.replace("2;0;0;0;5", "2;1;0;0;5");
        // X = 0 still exists at Y = 0, so the grid stays 2 x 3 with a hole
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::CScan),
            Err(DecodeError::InvalidAxis { .. })
        ));
    }

    #[test]
    fn test_short_row() {
        let text = CSCAN.replace("0;0;0;0;2", "0;0;0;0");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::CScan),
            Err(DecodeError::RowLengthMismatch { line: 4, expected: 5, actual: 4 })
        ));
    }

    #[test]
    fn test_bad_sample() {
        let text = CSCAN.replace("0;1;0;0;3", "0;1;0;0;n/a");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::CScan),
            Err(DecodeError::InvalidSample { line: 6, .. })
        ));
    }

    #[test]
    fn test_true_cscan_indexed_cells() {
        let scan = decode_civa_scan(&true_cscan("2", "11", "0,5"), ScanKind::TrueCScan).unwrap();

        assert_eq!(scan.dims(), vec!["Y", "X"]);
        assert_eq!(scan.shape(), &[2, 4]);
        assert_eq!(scan.axis("X").unwrap().values, vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(scan.axis("Y").unwrap().values, vec![10.0, 10.5]);
        // column 1 indexes X, column 2 indexes Y
        assert_eq!(scan.get(&[1, 3]), Some(13.0));
        assert_eq!(scan.get(&[0, 2]), Some(2.0));
    }

    #[test]
    fn test_true_cscan_bad_limits() {
        let text = true_cscan("2", "11", "0.5").replacen("Limits;0;2", "Limits;0;x", 1);
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::TrueCScan),
            Err(DecodeError::MalformedHeader { location: Location::Line(1), .. })
        ));

        let text = true_cscan("2", "11", "0");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::TrueCScan),
            Err(DecodeError::MalformedHeader { location: Location::Line(3), .. })
        ));
    }

    #[test]
    fn test_true_cscan_index_out_of_range() {
        let text = true_cscan("2", "11", "0.5").replacen("3;1;0;0;0;13", "4;1;0;0;0;13", 1);
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::TrueCScan),
            Err(DecodeError::DimensionMismatch { expected: 4, actual: 4, .. })
        ));
    }

    #[test]
    fn test_true_cscan_huge_extents_need_matching_rows() {
        // 1e11 x 2 cells declared, 8 present: rejected before any grid is built
        let text = true_cscan("1e11", "12", "1");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::TrueCScan),
            Err(DecodeError::DimensionMismatch { expected: 200_000_000_000, actual: 8, .. })
        ));

        // cell count does not fit in usize
        let text = true_cscan("1e12", "1e12", "0.001");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::TrueCScan),
            Err(DecodeError::DimensionMismatch { expected: usize::MAX, actual: 8, .. })
        ));
    }

    #[test]
    fn test_bscan_time_in_seconds() {
        let scan = decode_civa_scan(&profile(18, "Time (us)"), ScanKind::BScan).unwrap();

        assert_eq!(scan.dims(), vec!["Z", "X"]);
        assert_eq!(scan.shape(), &[2, 3]);
        assert_eq!(scan.axis("X").unwrap().values, vec![-1.5, 0.0, 1.5]);
        assert_eq!(scan.axis("X").unwrap().unit(), "mm");

        let z = scan.axis("Z").unwrap();
        assert_eq!(z.unit(), "s");
        assert!((z.values[0] - 10e-6).abs() < 1e-18);
        assert!((z.values[1] - 10.5e-6).abs() < 1e-18);
        assert_eq!(scan.get(&[1, 2]), Some(6.0));

        assert_eq!(scan.attrs()["Gain"], MetaValue::Integer(12));
        assert_eq!(scan.attrs()["Frequency"], MetaValue::Float(2.25));
    }

    #[test]
    fn test_beam_depth_unit_from_label() {
        let scan = decode_civa_scan(&profile(9, "Depth [in]"), ScanKind::Beam).unwrap();
        let z = scan.axis("Z").unwrap();
        assert_eq!(z.unit(), "in");
        assert_eq!(z.values, vec![10.0, 10.5]);

        let scan = decode_civa_scan(&profile(9, "Depth"), ScanKind::Beam).unwrap();
        assert_eq!(scan.axis("Z").unwrap().unit(), "mm");
    }

    #[test]
    fn test_blank_separated_preamble() {
        let text = profile(9, "Depth").replacen("Gain (dB);12", "Gain (dB) 12", 1).replacen(
            "Frequency (MHz);2,25",
            "Frequency (MHz)\t2,25",
            1,
        );
        let scan = decode_civa_scan(&text, ScanKind::Beam).unwrap();
        assert_eq!(scan.attrs()["Gain"], MetaValue::Integer(12));
        assert_eq!(scan.attrs()["Frequency"], MetaValue::Float(2.25));
    }

    #[test]
    fn test_profile_short_row() {
        let text = profile(18, "Time (us)").replacen("10;1;2;3", "10;1;2", 1);
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::BScan),
            Err(DecodeError::RowLengthMismatch { line: 19, expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_profile_label_line_missing() {
        let text = profile(9, "Depth");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::BScan),
            Err(DecodeError::MalformedHeader { location: Location::Line(18), .. })
        ));

        let text = profile(9, "Depth").replace("val", "amp");
        assert!(matches!(
            decode_civa_scan(&text, ScanKind::Beam),
            Err(DecodeError::MalformedHeader { location: Location::Line(9), .. })
        ));
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("val X=-1.5"), Some(-1.5));
        assert_eq!(first_number("val(.5mm)"), Some(0.5));
        assert_eq!(first_number("val 2e-1"), Some(0.2));
        assert_eq!(first_number("val"), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("true_cscan".parse::<ScanKind>().unwrap(), ScanKind::TrueCScan);
        assert_eq!("BSCAN".parse::<ScanKind>().unwrap(), ScanKind::BScan);
        assert!("ascan".parse::<ScanKind>().is_err());
    }
}
