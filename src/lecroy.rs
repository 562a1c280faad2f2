// LeCroy binary waveform (.trc) reader

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use memchr::memmem;

use crate::axis::AxisBuilder;
use crate::decoder::FormatDecoder;
use crate::error::{DecodeError, Location, Result};
use crate::header::{parse_binary_header, Endian, FieldKind, FieldSpec, HeaderFieldMap};
use crate::model::{Axis, InfoMap, MetaValue, UnitTag, Waveform};

const WAVEDESC: &[u8] = b"WAVEDESC";
/// The descriptor marker must start within this many bytes of the file.
const SEARCH_WINDOW: usize = 50;
const COMM_ORDER: usize = 34;
const TRIGTIME_ENTRY: usize = 16;

/// Templates sharing the descriptor layout below.
const KNOWN_TEMPLATES: &[&str] = &["LECROY_2_2", "LECROY_2_3"];

/// Descriptor fields, offsets relative to the `WAVEDESC` marker.
const DESCRIPTOR: &[FieldSpec] = &[
    FieldSpec::new("template_name", 16, 16, FieldKind::Text),
    FieldSpec::new("comm_type", 32, 2, FieldKind::I16),
    FieldSpec::new("wave_descriptor", 36, 4, FieldKind::I32),
    FieldSpec::new("user_text", 40, 4, FieldKind::I32),
    FieldSpec::new("trigtime_array", 48, 4, FieldKind::I32),
    FieldSpec::new("wave_array_1", 60, 4, FieldKind::I32),
    FieldSpec::new("instrument_name", 76, 16, FieldKind::Text),
    FieldSpec::new("instrument_number", 92, 4, FieldKind::I32),
    FieldSpec::new("wave_array_count", 116, 4, FieldKind::I32),
    FieldSpec::new("subarray_count", 144, 4, FieldKind::I32),
    FieldSpec::new("vertical_gain", 156, 4, FieldKind::F32),
    FieldSpec::new("vertical_offset", 160, 4, FieldKind::F32),
    FieldSpec::new("nominal_bits", 172, 2, FieldKind::I16),
    FieldSpec::new("horiz_interval", 176, 4, FieldKind::F32),
    FieldSpec::new("horiz_offset", 180, 8, FieldKind::F64),
    FieldSpec::new("vertunit", 196, 48, FieldKind::Text),
    FieldSpec::new("horunit", 244, 48, FieldKind::Text),
    FieldSpec::new("trigger_seconds", 296, 8, FieldKind::F64),
    FieldSpec::new("trigger_minutes", 304, 1, FieldKind::U8),
    FieldSpec::new("trigger_hours", 305, 1, FieldKind::U8),
    FieldSpec::new("trigger_days", 306, 1, FieldKind::U8),
    FieldSpec::new("trigger_months", 307, 1, FieldKind::U8),
    FieldSpec::new("trigger_year", 308, 2, FieldKind::I16),
    FieldSpec::new("record_type", 316, 2, FieldKind::I16),
    FieldSpec::new("processing_done", 318, 2, FieldKind::I16),
    FieldSpec::new("timebase", 324, 2, FieldKind::I16),
    FieldSpec::new("vert_coupling", 326, 2, FieldKind::I16),
    FieldSpec::new("probe_att", 328, 4, FieldKind::F32),
    FieldSpec::new("fixed_vert_gain", 332, 2, FieldKind::I16),
    FieldSpec::new("bandwidth_limit", 334, 2, FieldKind::I16),
    FieldSpec::new("wave_source", 344, 2, FieldKind::I16),
];

const COUPLINGS: &[&str] = &["DC_50ohms", "Ground", "DC_10Mohm", "Ground", "AC_1Mohm"];

const RECORD_TYPES: &[&str] = &[
    "single_sweep",
    "interleaved",
    "histogram",
    "graph",
    "filter_coefficient",
    "complex",
    "extrema",
    "sequence_obsolete",
    "centered_RIS",
    "peak_detect",
];

const PROCESSING: &[&str] = &[
    "no_processing",
    "fir_filter",
    "interpolated",
    "sparsed",
    "autoscaled",
    "no_result",
    "rolling",
    "cumulative",
];

/// Traces decoded from one LeCroy file plus the acquisition info they share.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LecroyCapture {
    pub info: InfoMap,
    pub waveforms: Vec<Waveform>,
}

struct LecroyHeader {
    endian: Endian,
    sample_width: usize,
    payload_offset: usize,
    sample_count: usize,
    segments: usize,
    vertical_gain: f64,
    vertical_offset: f64,
    horizontal_interval: f64,
    horizontal_offset: f64,
    /// (trigger time, trigger offset) per segment, when the file has them.
    segment_times: Vec<(f64, f64)>,
    info: InfoMap,
}

struct LecroyDecoder;

impl FormatDecoder for LecroyDecoder {
    type Source = [u8];
    type Header = LecroyHeader;
    type Output = LecroyCapture;

    const FORMAT: &'static str = "lecroy";

    fn parse_header(&self, content: &[u8]) -> Result<LecroyHeader> {
        let window = &content[..content.len().min(SEARCH_WINDOW)];
        let base = memmem::find(window, WAVEDESC).ok_or_else(|| {
            DecodeError::malformed(
                Location::Byte(0),
                format!("no WAVEDESC marker in the first {} bytes", SEARCH_WINDOW),
            )
        })?;

        let endian = match content.get(base + COMM_ORDER..base + COMM_ORDER + 2) {
            Some([0, 0]) => Endian::Big,
            Some([1, 0]) => Endian::Little,
            Some(bytes) => {
                return Err(DecodeError::UnsupportedEncoding(format!(
                    "byte order marker {:02x?} at byte {}",
                    bytes,
                    base + COMM_ORDER
                )))
            }
            None => {
                return Err(DecodeError::malformed(
                    Location::Byte(content.len()),
                    "file ends inside the descriptor block",
                ))
            }
        };

        let fields = parse_binary_header(&content[base..], DESCRIPTOR, endian, base)?;

        let template = fields.text("template_name")?;
        if !KNOWN_TEMPLATES.contains(&template) {
            return Err(DecodeError::UnsupportedEncoding(format!(
                "descriptor template '{}'",
                template
            )));
        }

        let sample_width = match fields.i64("comm_type")? {
            0 => 1,
            1 => 2,
            other => {
                return Err(DecodeError::UnsupportedEncoding(format!(
                    "sample type COMM_TYPE={}",
                    other
                )))
            }
        };

        let sample_count = fields.usize("wave_array_count")?;
        let array_bytes = fields.usize("wave_array_1")?;
        if array_bytes != sample_count * sample_width {
            warn!(
                "lecroy: WAVE_ARRAY_1 is {} bytes but {} samples of {} bytes were declared",
                array_bytes, sample_count, sample_width
            );
        }

        let segments = match fields.i64("subarray_count")? {
            n if n >= 1 => n as usize,
            n => {
                warn!("lecroy: segment count {} treated as a single trace", n);
                1
            }
        };
        if sample_count % segments != 0 {
            return Err(DecodeError::malformed(
                fields.field("subarray_count")?.location,
                format!("{} samples cannot be split into {} segments", sample_count, segments),
            ));
        }

        let horizontal_interval = fields.f64("horiz_interval")?;
        if horizontal_interval <= 0.0 {
            return Err(DecodeError::malformed(
                fields.field("horiz_interval")?.location,
                format!("horizontal interval must be positive, got {}", horizontal_interval),
            ));
        }

        let trigtime_offset = base + fields.usize("wave_descriptor")? + fields.usize("user_text")?;
        let trigtime_len = fields.usize("trigtime_array")?;
        let payload_offset = trigtime_offset + trigtime_len;
        let segment_times = read_trigtimes(content, trigtime_offset, trigtime_len, endian)?;

        let info = build_info(&fields, template)?;

        Ok(LecroyHeader {
            endian,
            sample_width,
            payload_offset,
            sample_count,
            segments,
            vertical_gain: fields.f64("vertical_gain")?,
            vertical_offset: fields.f64("vertical_offset")?,
            horizontal_interval,
            horizontal_offset: fields.f64("horiz_offset")?,
            segment_times,
            info,
        })
    }

    fn decode_payload(&self, content: &[u8], header: &LecroyHeader) -> Result<Vec<f64>> {
        let needed = header.sample_count * header.sample_width;
        let available = content.len().saturating_sub(header.payload_offset);
        if needed > available {
            return Err(DecodeError::TruncatedPayload {
                expected: needed,
                available,
            });
        }

        let payload = &content[header.payload_offset..header.payload_offset + needed];
        let raw: Vec<f64> = match (header.sample_width, header.endian) {
            (1, _) => payload.iter().map(|&b| b as i8 as f64).collect(),
            (_, Endian::Little) => payload
                .chunks_exact(2)
                .map(|c| LittleEndian::read_i16(c) as f64)
                .collect(),
            (_, Endian::Big) => payload
                .chunks_exact(2)
                .map(|c| BigEndian::read_i16(c) as f64)
                .collect(),
        };

        Ok(raw
            .into_iter()
            .map(|v| v * header.vertical_gain - header.vertical_offset)
            .collect())
    }

    fn axes(&self, header: &LecroyHeader) -> Result<Vec<Axis>> {
        let axis = AxisBuilder::new("t", "s")
            .origin(header.horizontal_offset)
            .step(header.horizontal_interval)
            .build(header.sample_count / header.segments);
        Ok(vec![axis])
    }

    fn assemble(&self, header: LecroyHeader, samples: Vec<f64>, axes: Vec<Axis>) -> Result<LecroyCapture> {
        let Some(horizontal) = axes.into_iter().next() else {
            return Err(DecodeError::InvalidAxis {
                axis: "t".to_string(),
                reason: "no horizontal axis".to_string(),
            });
        };
        let segment_len = horizontal.len();

        let waveforms = samples
            .chunks(segment_len.max(1))
            .enumerate()
            .map(|(segment, vertical)| {
                let mut info = header.info.clone();
                info.insert("segment".to_string(), MetaValue::Integer(segment as i64));
                if let Some(&(time, offset)) = header.segment_times.get(segment) {
                    info.insert("segment_trigger_time".to_string(), time.into());
                    info.insert("segment_trigger_offset".to_string(), offset.into());
                }
                Waveform {
                    horizontal: horizontal.clone(),
                    vertical: vertical.to_vec(),
                    vertical_tag: UnitTag::new("amplitude", "V"),
                    info,
                }
            })
            .collect();

        Ok(LecroyCapture {
            info: header.info,
            waveforms,
        })
    }

    fn describe(&self, header: &LecroyHeader) -> String {
        format!(
            "{:?}-endian, {}-byte samples, {} samples in {} segment(s), payload at byte {}",
            header.endian,
            header.sample_width,
            header.sample_count,
            header.segments,
            header.payload_offset
        )
    }
}

fn read_trigtimes(content: &[u8], offset: usize, len: usize, endian: Endian) -> Result<Vec<(f64, f64)>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let block = content.get(offset..offset + len).ok_or(DecodeError::TruncatedPayload {
        expected: offset + len,
        available: content.len(),
    })?;
    Ok(block
        .chunks_exact(TRIGTIME_ENTRY)
        .map(|entry| match endian {
            Endian::Little => (
                LittleEndian::read_f64(&entry[..8]),
                LittleEndian::read_f64(&entry[8..]),
            ),
            Endian::Big => (BigEndian::read_f64(&entry[..8]), BigEndian::read_f64(&entry[8..])),
        })
        .collect())
}

fn build_info(fields: &HeaderFieldMap, template: &str) -> Result<InfoMap> {
    let mut info = InfoMap::new();
    let mut put = |key: &str, value: MetaValue| {
        info.insert(key.to_string(), value);
    };

    put("template", template.into());
    put("instrument_name", fields.text("instrument_name")?.into());
    put("instrument_number", fields.i64("instrument_number")?.into());
    put("channel", (fields.i64("wave_source")? + 1).into());
    put("coupling", lookup(fields, "vert_coupling", COUPLINGS)?.into());
    put("bandwidth_limit", (fields.i64("bandwidth_limit")? != 0).into());
    put("record_type", lookup(fields, "record_type", RECORD_TYPES)?.into());
    put("processing", lookup(fields, "processing_done", PROCESSING)?.into());
    put("nominal_bits", fields.i64("nominal_bits")?.into());

    let vertical_gain = fields.f64("vertical_gain")?;
    put("vertical_gain", vertical_gain.into());
    put("vertical_offset", fields.f64("vertical_offset")?.into());
    let fixed_gain = decade_scale(fields, "fixed_vert_gain", -6)?;
    put("gain_with_probe", (fixed_gain * fields.f64("probe_att")?).into());

    let timebase = match fields.i64("timebase")? {
        100 => MetaValue::Text("external".to_string()),
        _ => decade_scale(fields, "timebase", -12)?.into(),
    };
    put("timebase", timebase);

    let interval = fields.f64("horiz_interval")?;
    put("sample_interval", interval.into());
    put("sampling_frequency", (1.0 / interval).into());
    put("horizontal_offset", fields.f64("horiz_offset")?.into());
    put("vertical_unit", fields.text("vertunit")?.into());
    put("horizontal_unit", fields.text("horunit")?.into());
    put("segments", fields.i64("subarray_count")?.max(1).into());

    match trigger_time(fields)? {
        Some(t) => put("trigger_time", t.into()),
        None => warn!("lecroy: trigger timestamp is not a valid date, omitted"),
    }

    Ok(info)
}

fn lookup(fields: &HeaderFieldMap, name: &str, table: &[&'static str]) -> Result<&'static str> {
    let index = fields.i64(name)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i).copied())
        .ok_or_else(|| {
            DecodeError::malformed(
                fields.field(name).map(|f| f.location).unwrap_or(Location::Byte(0)),
                format!("{} value {} is outside the known range", name, index),
            )
        })
}

/// LeCroy encodes gains and timebases as an index into the 1-2-5 sequence.
fn decade_scale(fields: &HeaderFieldMap, name: &str, exponent_base: i32) -> Result<f64> {
    let e = fields.i64(name)?;
    if e < 0 {
        return Err(DecodeError::malformed(
            fields.field(name)?.location,
            format!("{} index {} is negative", name, e),
        ));
    }
    let mantissa = [1.0, 2.0, 5.0][(e % 3) as usize];
    Ok(mantissa * 10f64.powi((e / 3) as i32 + exponent_base))
}

fn trigger_time(fields: &HeaderFieldMap) -> Result<Option<NaiveDateTime>> {
    let seconds = fields.f64("trigger_seconds")?;
    let year = fields.i64("trigger_year")?;
    let month = fields.i64("trigger_months")?;
    let day = fields.i64("trigger_days")?;
    let hour = fields.i64("trigger_hours")?;
    let minute = fields.i64("trigger_minutes")?;

    if !(0.0..60.0).contains(&seconds) {
        return Ok(None);
    }
    let micros = ((seconds.fract()) * 1e6).floor() as u32;
    Ok(NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|d| d.and_hms_micro_opt(hour as u32, minute as u32, seconds as u32, micros)))
}

/// Decode a LeCroy `.trc` file.
///
/// Vertical values are `raw * vertical_gain - vertical_offset` volts and the
/// time of sample `i` is `i * horizontal_interval + horizontal_offset`
/// seconds, counting `i` from 0: the first sample sits at the horizontal
/// offset itself, not one interval after it. Sequence-mode files yield one
/// waveform per segment, in file order.
pub fn decode_lecroy(content: &[u8]) -> Result<LecroyCapture> {
    LecroyDecoder.decode(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: usize = 11;
    const DESC_LEN: usize = 346;

    fn fixture(endian: Endian, comm_type: i16, samples: &[i16], segments: i32, trigtime: usize) -> Vec<u8> {
        let mut buf = vec![0u8; PREFIX + DESC_LEN];
        buf[..PREFIX].copy_from_slice(b"#9000001234");
        let d = PREFIX;
        buf[d..d + 8].copy_from_slice(WAVEDESC);
        buf[d + 16..d + 26].copy_from_slice(b"LECROY_2_3");
        buf[d + 76..d + 83].copy_from_slice(b"LECROY1");
        buf[d + 196] = b'V';
        buf[d + 244] = b'S';

        let width = if comm_type == 0 { 1 } else { 2 };
        macro_rules! put {
            ($order:ty) => {{
                <$order>::write_i16(&mut buf[d + 32..d + 34], comm_type);
                <$order>::write_i32(&mut buf[d + 36..d + 40], DESC_LEN as i32);
                <$order>::write_i32(&mut buf[d + 48..d + 52], trigtime as i32);
                <$order>::write_i32(&mut buf[d + 60..d + 64], (samples.len() * width) as i32);
                <$order>::write_i32(&mut buf[d + 92..d + 96], 4242);
                <$order>::write_i32(&mut buf[d + 116..d + 120], samples.len() as i32);
                <$order>::write_i32(&mut buf[d + 144..d + 148], segments);
                <$order>::write_f32(&mut buf[d + 156..d + 160], 0.002);
                <$order>::write_f32(&mut buf[d + 160..d + 164], 0.1);
                <$order>::write_i16(&mut buf[d + 172..d + 174], 8);
                <$order>::write_f32(&mut buf[d + 176..d + 180], 1e-8);
                <$order>::write_f64(&mut buf[d + 180..d + 188], -1e-6);
                <$order>::write_f64(&mut buf[d + 296..d + 304], 12.5);
                buf[d + 304] = 30;
                buf[d + 305] = 14;
                buf[d + 306] = 2;
                buf[d + 307] = 3;
                <$order>::write_i16(&mut buf[d + 308..d + 310], 2021);
                <$order>::write_i16(&mut buf[d + 324..d + 326], 9);
                <$order>::write_i16(&mut buf[d + 326..d + 328], 2);
                <$order>::write_f32(&mut buf[d + 328..d + 332], 10.0);
                <$order>::write_i16(&mut buf[d + 332..d + 334], 15);
                <$order>::write_i16(&mut buf[d + 344..d + 346], 1);
                for k in 0..trigtime / TRIGTIME_ENTRY {
                    let mut entry = [0u8; TRIGTIME_ENTRY];
                    <$order>::write_f64(&mut entry[..8], k as f64 * 1e-3);
                    <$order>::write_f64(&mut entry[8..], -1e-6);
                    buf.extend_from_slice(&entry);
                }
                for &s in samples {
                    if width == 1 {
                        buf.push(s as i8 as u8);
                    } else {
                        let mut w = [0u8; 2];
                        <$order>::write_i16(&mut w, s);
                        buf.extend_from_slice(&w);
                    }
                }
            }};
        }
        match endian {
            Endian::Little => {
                buf[d + COMM_ORDER] = 1;
                put!(LittleEndian);
            }
            Endian::Big => put!(BigEndian),
        }
        buf
    }

    #[test]
    fn test_vertical_scaling() {
        let content = fixture(Endian::Little, 1, &[150, 0, -50], 1, 0);
        let capture = decode_lecroy(&content).unwrap();

        assert_eq!(capture.waveforms.len(), 1);
        let wave = &capture.waveforms[0];
        assert!((wave.vertical[0] - 0.2).abs() < 1e-6);
        assert!((wave.vertical[1] + 0.1).abs() < 1e-6);
        assert!((wave.vertical[2] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_time_axis() {
        let content = fixture(Endian::Big, 0, &[1, 2, 3, 4], 1, 0);
        let capture = decode_lecroy(&content).unwrap();
        let t = &capture.waveforms[0].horizontal;

        assert_eq!(t.unit(), "s");
        assert_eq!(t.len(), 4);
        // index 0 sits at the horizontal offset
        assert!((t.values[0] + 1e-6).abs() < 1e-12);
        assert!((t.values[3] - (3.0 * 1e-8 - 1e-6)).abs() < 1e-12);
    }

    #[test]
    fn test_big_endian_matches_little_endian() {
        let samples = [-300, 7, 12000, 5];
        let le = decode_lecroy(&fixture(Endian::Little, 1, &samples, 1, 0)).unwrap();
        let be = decode_lecroy(&fixture(Endian::Big, 1, &samples, 1, 0)).unwrap();
        assert_eq!(le.waveforms[0].vertical, be.waveforms[0].vertical);
    }

    #[test]
    fn test_segments_split_in_file_order() {
        let samples: Vec<i16> = (0..12).collect();
        let content = fixture(Endian::Little, 1, &samples, 3, 3 * TRIGTIME_ENTRY);
        let capture = decode_lecroy(&content).unwrap();

        assert_eq!(capture.waveforms.len(), 3);
        for (k, wave) in capture.waveforms.iter().enumerate() {
            assert_eq!(wave.len(), 4);
            assert_eq!(wave.horizontal.len(), 4);
            let first_raw = (k * 4) as f64;
            assert!((wave.vertical[0] - (first_raw * 0.002 - 0.1)).abs() < 1e-6);
            assert_eq!(wave.info["segment"], MetaValue::Integer(k as i64));
            assert_eq!(
                wave.info["segment_trigger_time"],
                MetaValue::Float(k as f64 * 1e-3)
            );
        }
    }

    #[test]
    fn test_info_map() {
        let capture = decode_lecroy(&fixture(Endian::Little, 0, &[0; 8], 1, 0)).unwrap();
        let info = &capture.info;

        assert_eq!(info["instrument_name"], MetaValue::Text("LECROY1".to_string()));
        assert_eq!(info["instrument_number"], MetaValue::Integer(4242));
        assert_eq!(info["channel"], MetaValue::Integer(2));
        assert_eq!(info["coupling"], MetaValue::Text("DC_10Mohm".to_string()));
        assert_eq!(info["record_type"], MetaValue::Text("single_sweep".to_string()));
        assert_eq!(info["vertical_unit"], MetaValue::Text("V".to_string()));

        let gain = info["gain_with_probe"].as_f64().unwrap();
        assert!((gain - 1.0).abs() < 1e-9);
        let timebase = info["timebase"].as_f64().unwrap();
        assert!((timebase - 1e-9).abs() < 1e-21);
        let fs = info["sampling_frequency"].as_f64().unwrap();
        assert!((fs - 1e8).abs() < 1.0);

        let expected = NaiveDate::from_ymd_opt(2021, 3, 2)
            .unwrap()
            .and_hms_micro_opt(14, 30, 12, 500_000)
            .unwrap();
        assert_eq!(info["trigger_time"], MetaValue::Timestamp(expected));
    }

    #[test]
    fn test_truncated_payload() {
        let mut content = fixture(Endian::Little, 1, &[1, 2, 3, 4], 1, 0);
        content.pop();
        let result = decode_lecroy(&content);
        assert!(matches!(
            result,
            Err(DecodeError::TruncatedPayload { expected: 8, available: 7 })
        ));
    }

    #[test]
    fn test_unknown_comm_type() {
        let mut content = fixture(Endian::Little, 1, &[1, 2], 1, 0);
        LittleEndian::write_i16(&mut content[PREFIX + 32..PREFIX + 34], 3);
        assert!(matches!(
            decode_lecroy(&content),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_unknown_byte_order_marker() {
        let mut content = fixture(Endian::Little, 1, &[1, 2], 1, 0);
        content[PREFIX + COMM_ORDER] = 7;
        assert!(matches!(
            decode_lecroy(&content),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_unknown_template() {
        let mut content = fixture(Endian::Little, 1, &[1, 2], 1, 0);
        content[PREFIX + 16..PREFIX + 26].copy_from_slice(b"LECROY_9_9");
        assert!(matches!(
            decode_lecroy(&content),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_missing_marker() {
        let result = decode_lecroy(&[0u8; 400]);
        assert!(matches!(
            result,
            Err(DecodeError::MalformedHeader { location: Location::Byte(0), .. })
        ));
    }
}
