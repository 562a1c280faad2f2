// Ultravision (Zetec) multi-channel text export reader

use std::marker::PhantomData;

use log::warn;

use crate::axis::AxisBuilder;
use crate::decoder::FormatDecoder;
use crate::error::{DecodeError, Result};
use crate::header::{parse_number, HeaderFieldMap, Separator, TextHeaderParser};
use crate::model::{Axis, ChannelSet, InfoMap, LabeledArray, MetaValue};

const DEFAULT_SPATIAL_UNIT: &str = "mm";
/// Header keys a channel section is decoded from; other header lines are ignored.
const HEADER_MARKERS: &[&str] = &["Channel", "Focal Law", "Scan", "Index", "USound"];

/// Lines of one channel: its `key = value` header and the sample rows after it.
#[derive(Debug, Default)]
struct ChannelSection<'a> {
    header: Vec<(usize, &'a str)>,
    rows: Vec<(usize, &'a str)>,
}

impl ChannelSection<'_> {
    fn first_line(&self) -> usize {
        self.header.first().map(|&(n, _)| n).unwrap_or(1)
    }
}

/// Split the file into channel sections. A section starts at every header
/// line that follows sample rows (or the start of the file).
fn split_sections(content: &str) -> Result<Vec<ChannelSection<'_>>> {
    let parser = TextHeaderParser::new(Separator::Char('='));
    let mut sections: Vec<ChannelSection<'_>> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        if parser.is_header_line(line) {
            let starts_section = sections.last().map_or(true, |s| !s.rows.is_empty());
            if starts_section {
                sections.push(ChannelSection::default());
            }
            if let Some(section) = sections.last_mut() {
                section.header.push((line_no, line));
            }
        } else {
            match sections.last_mut() {
                Some(section) => section.rows.push((line_no, line)),
                None => {
                    return Err(DecodeError::UnknownChannelMarker {
                        line: line_no,
                        reason: "sample data before any channel header".to_string(),
                    })
                }
            }
        }
    }

    if sections.is_empty() {
        return Err(DecodeError::UnknownChannelMarker {
            line: 1,
            reason: "no channel header found".to_string(),
        });
    }
    Ok(sections)
}

struct ChannelHeader {
    name: String,
    nx: usize,
    ny: usize,
    nz: usize,
    /// A-scan count, `nx * ny`.
    cells: usize,
    x_origin: f64,
    x_step: f64,
    x_unit: String,
    y_origin: f64,
    y_step: f64,
    y_unit: String,
    attrs: InfoMap,
}

struct ChannelDecoder<'a> {
    sampling_frequency: f64,
    section: PhantomData<ChannelSection<'a>>,
}

impl<'a> ChannelDecoder<'a> {
    fn new(sampling_frequency: f64) -> Self {
        ChannelDecoder {
            sampling_frequency,
            section: PhantomData,
        }
    }
}

impl<'a> FormatDecoder for ChannelDecoder<'a> {
    type Source = ChannelSection<'a>;
    type Header = ChannelHeader;
    type Output = (String, LabeledArray);

    const FORMAT: &'static str = "ultravision";

    fn parse_header(&self, section: &ChannelSection<'a>) -> Result<ChannelHeader> {
        let fields = TextHeaderParser::new(Separator::Char('='))
            .with_markers(HEADER_MARKERS)
            .parse(section.header.iter().copied());
        if !fields.contains("Channel") {
            return Err(DecodeError::UnknownChannelMarker {
                line: section.first_line(),
                reason: "header block has no Channel field".to_string(),
            });
        }
        let name = fields.text("Channel")?.to_string();

        let mut attrs = InfoMap::new();
        attrs.insert("channel".to_string(), MetaValue::Text(name.clone()));
        if let Some(law) = fields.meta("Focal Law") {
            attrs.insert("focal_law".to_string(), law);
        }
        attrs.insert("projection".to_string(), projection(section).into());
        // kept for reference only, the time axis comes from the sampling frequency
        for (key, attr) in [("USoundStart", "usound_start"), ("USoundResol", "usound_resolution")] {
            if let Some(value) = fields.meta(key) {
                attrs.insert(attr.to_string(), value);
            }
            if let Some(unit) = fields.unit(key) {
                attrs.insert(format!("{}_unit", attr), unit.into());
            }
        }

        let nx = fields.usize("ScanQty")?;
        let ny = fields.usize("IndexQty")?;
        let cells = match nx.checked_mul(ny) {
            Some(cells) if cells > 0 => cells,
            _ => {
                return Err(DecodeError::malformed(
                    fields.field("IndexQty")?.location,
                    format!("ScanQty {} x IndexQty {} is not a usable grid", nx, ny),
                ))
            }
        };

        Ok(ChannelHeader {
            nx,
            ny,
            nz: fields.usize("USoundQty")?,
            cells,
            x_origin: fields.f64("ScanStart")?,
            x_step: fields.f64("ScanResol")?,
            x_unit: spatial_unit(&fields, "ScanResol", "ScanStart"),
            y_origin: fields.f64("IndexStart")?,
            y_step: fields.f64("IndexResol")?,
            y_unit: spatial_unit(&fields, "IndexResol", "IndexStart"),
            name,
            attrs,
        })
    }

    fn decode_payload(&self, section: &ChannelSection<'a>, header: &ChannelHeader) -> Result<Vec<f64>> {
        let (nx, ny, nz) = (header.nx, header.ny, header.nz);
        if section.rows.len() != header.cells {
            return Err(DecodeError::DimensionMismatch {
                what: format!("sample rows of channel '{}'", header.name),
                expected: header.cells,
                actual: section.rows.len(),
            });
        }

        // samples in file order, one validated row at a time
        let mut samples = Vec::new();
        for &(line_no, line) in &section.rows {
            let row: Vec<&str> = line.split(['\t', ' ']).filter(|t| !t.is_empty()).collect();
            if row.len() != nz {
                return Err(DecodeError::RowLengthMismatch {
                    line: line_no,
                    expected: nz,
                    actual: row.len(),
                });
            }
            for token in row {
                samples.push(parse_number(token).ok_or_else(|| DecodeError::InvalidSample {
                    line: line_no,
                    token: token.to_string(),
                })?);
            }
        }

        // rows run along X first, then Y; the volume is laid out (X, Y, Z)
        let mut volume = vec![0.0; samples.len()];
        for (r, row) in samples.chunks_exact(nz.max(1)).enumerate() {
            let (ix, iy) = (r % nx, r / nx);
            let base = (ix * ny + iy) * nz;
            volume[base..base + nz].copy_from_slice(row);
        }
        Ok(volume)
    }

    fn axes(&self, header: &ChannelHeader) -> Result<Vec<Axis>> {
        Ok(vec![
            AxisBuilder::new("X", header.x_unit.as_str())
                .origin(header.x_origin)
                .step(header.x_step)
                .build(header.nx),
            AxisBuilder::new("Y", header.y_unit.as_str())
                .origin(header.y_origin)
                .step(header.y_step)
                .build(header.ny),
            AxisBuilder::new("Z", "s")
                .sampling_frequency(self.sampling_frequency)
                .build(header.nz),
        ])
    }

    fn assemble(&self, header: ChannelHeader, samples: Vec<f64>, axes: Vec<Axis>) -> Result<(String, LabeledArray)> {
        let array = LabeledArray::new(samples, axes, header.attrs)?;
        Ok((header.name, array))
    }

    fn describe(&self, header: &ChannelHeader) -> String {
        format!(
            "channel '{}' with {} x {} A-scans of {} samples",
            header.name, header.nx, header.ny, header.nz
        )
    }
}

fn spatial_unit(fields: &HeaderFieldMap, resolution: &str, start: &str) -> String {
    fields
        .unit(resolution)
        .or_else(|| fields.unit(start))
        .unwrap_or(DEFAULT_SPATIAL_UNIT)
        .to_string()
}

fn projection(section: &ChannelSection<'_>) -> &'static str {
    let text = section
        .header
        .iter()
        .map(|&(_, l)| l.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    if text.contains("half path") {
        "half path"
    } else if text.contains("true depth") {
        "true depth"
    } else {
        "unknown"
    }
}

/// Keys must stay unique; repeated channel names get the focal law, or
/// failing that their position in the file, appended.
fn unique_name(set: &ChannelSet, name: String, array: &LabeledArray, ordinal: usize) -> String {
    if !set.contains(&name) {
        return name;
    }
    let mut renamed = match array.attrs().get("focal_law") {
        Some(law) => format!("{} (focal law {})", name, law),
        None => format!("{} #{}", name, ordinal + 1),
    };
    let mut n = ordinal + 1;
    while set.contains(&renamed) {
        renamed = format!("{} #{}", name, n);
        n += 1;
    }
    warn!("ultravision: duplicate channel '{}' stored as '{}'", name, renamed);
    renamed
}

/// Decode an Ultravision text export into one 3-D `(X, Y, Z)` array per channel.
///
/// The time axis is rebuilt as `i / sampling_frequency` seconds because the
/// timing fields embedded in the export are rounded. A file with a single
/// channel still yields a one-entry [`ChannelSet`]. All channels must share
/// the spatial grid of the first one.
pub fn decode_ultravision(content: &str, sampling_frequency: Option<f64>) -> Result<ChannelSet> {
    let fs = sampling_frequency.ok_or(DecodeError::SamplingFrequencyRequired)?;
    if !fs.is_finite() || fs <= 0.0 {
        return Err(DecodeError::InvalidSamplingFrequency(fs));
    }

    let decoder = ChannelDecoder::new(fs);
    let mut channels = ChannelSet::new();
    let mut grid: Option<(usize, usize)> = None;
    for (ordinal, section) in split_sections(content)?.iter().enumerate() {
        let (name, array) = decoder.decode(section)?;
        // every channel covers the same scan/index grid
        let shape = (array.shape()[0], array.shape()[1]);
        match grid {
            None => grid = Some(shape),
            Some(first) if first != shape => {
                return Err(DecodeError::DimensionMismatch {
                    what: format!("ScanQty x IndexQty of channel '{}'", name),
                    expected: first.0 * first.1,
                    actual: shape.0 * shape.1,
                })
            }
            Some(_) => {}
        }
        let name = unique_name(&channels, name, &array, ordinal);
        channels
            .insert(name, array)
            .map_err(|_| DecodeError::UnknownChannelMarker {
                line: section.first_line(),
                reason: "channel name already taken".to_string(),
            })?;
    }
    Ok(channels)
}
