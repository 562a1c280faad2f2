// SAFT scanner volume reader

use byteorder::{ByteOrder, LittleEndian};

use crate::axis::AxisBuilder;
use crate::decoder::FormatDecoder;
use crate::error::{DecodeError, Location, Result};
use crate::header::FieldKind::{Text, TextAuto as Auto, TextFloat as Float, TextInt as Int};
use crate::header::{packed, parse_binary_header, Endian, FieldKind, HeaderFieldMap};
use crate::model::{Axis, InfoMap, LabeledArray, MetaValue};

/// Size of the ASCII file header.
const HEADER_LEN: usize = 2048;
/// Bytes of per-A-scan header preceding every trace in the payload.
const ASCAN_HEADER_LEN: usize = 32;
const INCH: f64 = 25.4e-3;

/// Header fields in file order, each starting where the previous one ends.
const FIELDS: &[(&str, usize, FieldKind)] = &[
    // general
    ("ascii", 10, Text),
    ("title", 81, Text),
    ("date", 9, Text),
    ("time", 9, Text),
    // data
    ("data_domain", 2, Int),
    ("data_nsets", 12, Auto),
    ("data_min", 7, Auto),
    ("data_max", 7, Auto),
    ("data_avg", 17, Auto),
    ("data_projection", 4, Auto),
    ("data_units", 2, Auto),
    ("data_16bit", 7, Int),
    ("data_scal_filename", 51, Text),
    // probe
    ("probe_comment", 81, Text),
    ("probe_freq_mhz", 17, Auto),
    ("probe_rx_wedge_path_in", 17, Auto),
    ("probe_tx_wedge_path_in", 17, Auto),
    ("probe_rx_wedge_vel_in_s", 17, Auto),
    ("probe_tx_wedge_vel_in_s", 17, Auto),
    ("probe_beam_dia_in", 17, Auto),
    ("probe_refracted_deg", 17, Auto),
    ("probe_incident_deg", 17, Auto),
    ("probe_skew_deg", 17, Auto),
    ("probe_mode", 2, Auto),
    ("probe_init_xoffset_in", 17, Auto),
    ("probe_fnumber", 17, Auto),
    ("probe_xoffset_wedge", 17, Auto),
    ("probe_yoffset_wedge", 17, Auto),
    ("probe_reserved", 13, Text),
    // material
    ("mat_comment", 81, Text),
    ("mat_velocity_in_s", 17, Auto),
    ("mat_refracted_deg", 17, Auto),
    ("mat_thickness_in", 17, Auto),
    ("mat_pipe_dia_in", 17, Auto),
    ("mat_track_dia_in", 17, Auto),
    ("mat_type", 7, Auto),
    ("mat_reserved", 23, Text),
    // sampling
    ("samp_comment", 81, Text),
    ("samp_delayinc_ns", 17, Auto),
    ("samp_initdelay_ns", 17, Auto),
    ("samp_ascan_length", 7, Int),
    ("samp_start_in", 17, Auto),
    ("samp_stop_in", 17, Auto),
    ("samp_averages", 7, Auto),
    ("samp_pulsetime", 17, Auto),
    ("samp_step_wavepath_in", 17, Auto),
    ("samp_windowstart_ns", 11, Float),
    ("samp_windowstop_ns", 11, Float),
    ("samp_depthend_window", 1, Text),
    // scan
    ("scan_comment", 81, Text),
    ("scan_dir_deg", 17, Auto),
    ("scan_xstart_in", 17, Float),
    ("scan_ystart_in", 17, Float),
    ("scan_xstop_in", 17, Auto),
    ("scan_ystop_in", 17, Auto),
    ("scan_xstep_in", 17, Float),
    ("scan_ystep_in", 17, Float),
    ("scan_xpoints", 7, Int),
    ("scan_ypoints", 7, Int),
    ("scan_isdownstream", 2, Text),
    ("scan_tx_half_vees", 12, Auto),
    ("scan_rx_half_vees", 12, Auto),
    ("scan_num_halfvees", 17, Auto),
    ("scan_init_pos", 17, Auto),
    ("scan_final_pos", 17, Auto),
    ("scan_toward_track", 2, Text),
    ("scan_scannertype", 4, Text),
    ("scan_pattern", 7, Text),
    ("scan_zincrement", 17, Auto),
    // hardware
    ("processing", 308, Text),
    ("nozzle", 68, Text),
    ("other", 86, Text),
    ("tvg", 90, Text),
    ("digi_type", 7, Auto),
    ("tvg_type", 7, Auto),
    ("pulser_type", 7, Auto),
    ("vpp", 17, Auto),
    ("sync_mode", 7, Auto),
    ("other2", 179, Text),
];

/// Header fields copied onto the decoded volume.
const ATTR_FIELDS: &[&str] = &[
    "title",
    "date",
    "time",
    "probe_freq_mhz",
    "probe_refracted_deg",
    "mat_velocity_in_s",
    "mat_thickness_in",
];

struct SaftHeader {
    nx: usize,
    ny: usize,
    nt: usize,
    /// Bytes expected after the file header.
    payload_len: usize,
    sample_bits: u32,
    sampling_rate: f64,
    window_start_s: f64,
    x_origin: f64,
    x_step: f64,
    y_origin: f64,
    y_step: f64,
    fields: HeaderFieldMap,
}

impl SaftHeader {
    fn sample_width(&self) -> usize {
        (self.sample_bits / 8) as usize
    }
}

struct SaftDecoder;

impl FormatDecoder for SaftDecoder {
    type Source = [u8];
    type Header = SaftHeader;
    type Output = LabeledArray;

    const FORMAT: &'static str = "saft";

    fn parse_header(&self, content: &[u8]) -> Result<SaftHeader> {
        let head = &content[..content.len().min(HEADER_LEN)];
        let fields = parse_binary_header(head, &packed(FIELDS), Endian::Little, 0)?;

        let domain = fields.i64("data_domain")?;
        if domain != 0 {
            return Err(DecodeError::UnsupportedEncoding(format!(
                "data domain {} (only time-domain volumes are supported)",
                domain
            )));
        }
        let sample_bits = match fields.i64("data_16bit")? {
            0 => 8,
            1 => 16,
            other => {
                return Err(DecodeError::UnsupportedEncoding(format!(
                    "sample width flag data_16bit={}",
                    other
                )))
            }
        };

        let nt = fields.usize("samp_ascan_length")?;
        let start_ns = fields.f64("samp_windowstart_ns")?;
        let stop_ns = fields.f64("samp_windowstop_ns")?;
        if stop_ns <= start_ns {
            return Err(DecodeError::malformed(
                fields.field("samp_windowstop_ns")?.location,
                format!("sampling window stop {} ns is not after start {} ns", stop_ns, start_ns),
            ));
        }

        let nx = fields.usize("scan_xpoints")?;
        let ny = fields.usize("scan_ypoints")?;
        for (name, n) in [("samp_ascan_length", nt), ("scan_xpoints", nx), ("scan_ypoints", ny)] {
            if n == 0 {
                return Err(DecodeError::malformed(
                    fields.field(name)?.location,
                    format!("{} must be at least 1", name),
                ));
            }
        }
        let payload_len = nt
            .checked_mul(sample_bits as usize / 8)
            .and_then(|n| n.checked_add(ASCAN_HEADER_LEN))
            .and_then(|record| record.checked_mul(nx))
            .and_then(|n| n.checked_mul(ny))
            .ok_or_else(|| {
                DecodeError::malformed(
                    Location::Byte(HEADER_LEN),
                    format!(
                        "{} x {} A-scans of {} samples overflow the addressable size",
                        nx, ny, nt
                    ),
                )
            })?;

        Ok(SaftHeader {
            nx,
            ny,
            nt,
            payload_len,
            sample_bits,
            sampling_rate: nt as f64 * 1e9 / (stop_ns - start_ns),
            window_start_s: start_ns * 1e-9,
            x_origin: fields.f64("scan_xstart_in")? * INCH,
            x_step: fields.f64("scan_xstep_in")? * INCH,
            y_origin: fields.f64("scan_ystart_in")? * INCH,
            y_step: fields.f64("scan_ystep_in")? * INCH,
            fields,
        })
    }

    fn decode_payload(&self, content: &[u8], header: &SaftHeader) -> Result<Vec<f64>> {
        let width = header.sample_width();
        let record_len = header.nt * width + ASCAN_HEADER_LEN;
        let expected = header.payload_len;
        let payload = &content[HEADER_LEN.min(content.len())..];
        if payload.len() != expected {
            return Err(DecodeError::DimensionMismatch {
                what: format!(
                    "SAFT payload bytes ({} x {} A-scans of {} samples)",
                    header.nx, header.ny, header.nt
                ),
                expected,
                actual: payload.len(),
            });
        }

        let (nx, nt) = (header.nx, header.nt);
        let bias = (1u32 << (header.sample_bits - 1)) as f64;
        // payload size checked above, so this cannot exceed the file
        let mut volume = vec![0.0; header.nx * header.ny * nt];

        // file order is (Y, X, T); the volume is laid out (Y, T, X)
        for (record_index, record) in payload.chunks_exact(record_len).enumerate() {
            let (y, x) = (record_index / nx, record_index % nx);
            let samples = &record[ASCAN_HEADER_LEN..];
            for t in 0..nt {
                let raw = match width {
                    1 => samples[t] as f64,
                    _ => LittleEndian::read_u16(&samples[2 * t..2 * t + 2]) as f64,
                };
                volume[(y * nt + t) * nx + x] = raw - bias;
            }
        }
        Ok(volume)
    }

    fn axes(&self, header: &SaftHeader) -> Result<Vec<Axis>> {
        Ok(vec![
            AxisBuilder::new("Y", "m")
                .origin(header.y_origin)
                .step(header.y_step)
                .build(header.ny),
            AxisBuilder::new("Z", "s")
                .origin(header.window_start_s)
                .sampling_frequency(header.sampling_rate)
                .build(header.nt),
            AxisBuilder::new("X", "m")
                .origin(header.x_origin)
                .step(header.x_step)
                .build(header.nx),
        ])
    }

    fn assemble(&self, header: SaftHeader, samples: Vec<f64>, axes: Vec<Axis>) -> Result<LabeledArray> {
        let mut attrs = InfoMap::new();
        for &name in ATTR_FIELDS {
            if let Some(value) = header.fields.meta(name) {
                attrs.insert(name.to_string(), value);
            }
        }
        attrs.insert("sampling_rate".to_string(), header.sampling_rate.into());
        attrs.insert(
            "sample_bits".to_string(),
            MetaValue::Integer(header.sample_bits as i64),
        );
        LabeledArray::new(samples, axes, attrs)
    }

    fn describe(&self, header: &SaftHeader) -> String {
        format!(
            "{} x {} A-scans of {} {}-bit samples at {:.3} MHz",
            header.nx,
            header.ny,
            header.nt,
            header.sample_bits,
            header.sampling_rate / 1e6
        )
    }
}

/// Decode a SAFT volume into a 3-D array with dimensions `(Y, Z, X)`:
/// index position (m), time (s) and scan position (m).
pub fn decode_saft(content: &[u8]) -> Result<LabeledArray> {
    if content.len() < HEADER_LEN {
        return Err(DecodeError::malformed(
            Location::Byte(content.len()),
            format!("SAFT header needs {} bytes, file has {}", HEADER_LEN, content.len()),
        ));
    }
    SaftDecoder.decode(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(header: &mut [u8], name: &str, value: &str) {
        let spec = packed(FIELDS)
            .into_iter()
            .find(|f| f.name == name)
            .unwrap();
        assert!(value.len() <= spec.len);
        header[spec.offset..spec.offset + value.len()].copy_from_slice(value.as_bytes());
        for b in &mut header[spec.offset + value.len()..spec.offset + spec.len] {
            *b = b' ';
        }
    }

    fn fixture(nx: usize, ny: usize, nt: usize, wide: bool) -> Vec<u8> {
        let mut buf = vec![0xcdu8; HEADER_LEN];
        set(&mut buf, "ascii", "SAFT");
        set(&mut buf, "title", "weld test block");
        set(&mut buf, "data_domain", "0");
        set(&mut buf, "data_16bit", if wide { "1" } else { "0" });
        set(&mut buf, "probe_freq_mhz", "2.25");
        set(&mut buf, "samp_ascan_length", &nt.to_string());
        set(&mut buf, "samp_windowstart_ns", "1000");
        set(&mut buf, "samp_windowstop_ns", &(1000 + 10 * nt).to_string());
        set(&mut buf, "scan_xstart_in", "0");
        set(&mut buf, "scan_ystart_in", "1");
        set(&mut buf, "scan_xstep_in", "0.1");
        set(&mut buf, "scan_ystep_in", "0.2");
        set(&mut buf, "scan_xpoints", &nx.to_string());
        set(&mut buf, "scan_ypoints", &ny.to_string());

        for y in 0..ny {
            for x in 0..nx {
                buf.extend_from_slice(&[0xaa; ASCAN_HEADER_LEN]);
                for t in 0..nt {
                    let v = (100 * y + 10 * x + t) as u16;
                    if wide {
                        let mut w = [0u8; 2];
                        LittleEndian::write_u16(&mut w, v + 32768);
                        buf.extend_from_slice(&w);
                    } else {
                        buf.push((v + 128) as u8);
                    }
                }
            }
        }
        buf
    }

    #[test]
    fn test_layout_fills_header() {
        let end = packed(FIELDS).last().map(|f| f.offset + f.len).unwrap();
        assert_eq!(end, HEADER_LEN);
    }

    #[test]
    fn test_volume_shape_and_order() {
        let (nx, ny, nt) = (3, 2, 4);
        let volume = decode_saft(&fixture(nx, ny, nt, false)).unwrap();

        assert_eq!(volume.dims(), vec!["Y", "Z", "X"]);
        assert_eq!(volume.shape(), &[ny, nt, nx]);
        assert_eq!(volume.len(), nx * ny * nt);
        assert_eq!(volume.get(&[1, 3, 2]), Some(123.0));
        assert_eq!(volume.get(&[0, 1, 0]), Some(1.0));
    }

    #[test]
    fn test_sixteen_bit_samples() {
        let volume = decode_saft(&fixture(2, 2, 5, true)).unwrap();
        assert_eq!(volume.get(&[1, 4, 1]), Some(114.0));
        assert_eq!(volume.attrs()["sample_bits"], MetaValue::Integer(16));
    }

    #[test]
    fn test_axes() {
        let volume = decode_saft(&fixture(3, 2, 4, false)).unwrap();

        let x = volume.axis("X").unwrap();
        assert_eq!(x.unit(), "m");
        assert!((x.values[2] - 0.2 * INCH).abs() < 1e-12);

        let y = volume.axis("Y").unwrap();
        assert!((y.values[0] - INCH).abs() < 1e-12);
        assert!((y.spacing().unwrap() - 0.2 * INCH).abs() < 1e-12);

        // 4 samples over a 40 ns window starting at 1 us
        let z = volume.axis("Z").unwrap();
        assert_eq!(z.unit(), "s");
        assert!((z.values[0] - 1e-6).abs() < 1e-15);
        assert!((z.spacing().unwrap() - 10e-9).abs() < 1e-15);
    }

    #[test]
    fn test_attrs_from_header() {
        let volume = decode_saft(&fixture(1, 1, 2, false)).unwrap();
        let attrs = volume.attrs();
        assert_eq!(attrs["title"], MetaValue::Text("weld test block".to_string()));
        assert_eq!(attrs["probe_freq_mhz"], MetaValue::Float(2.25));
    }

    #[test]
    fn test_truncated_payload_is_dimension_mismatch() {
        let mut content = fixture(3, 2, 4, true);
        content.pop();
        assert!(matches!(
            decode_saft(&content),
            Err(DecodeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_overflowing_extents_rejected() {
        let mut content = fixture(1, 1, 2, false);
        set(&mut content, "samp_ascan_length", "9999999");
        set(&mut content, "samp_windowstop_ns", "100000990");
        set(&mut content, "scan_xpoints", "9999999");
        set(&mut content, "scan_ypoints", "9999999");
        assert!(matches!(
            decode_saft(&content),
            Err(DecodeError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let mut content = fixture(1, 1, 2, false);
        set(&mut content, "scan_ypoints", "0");
        set(&mut content, "scan_xpoints", "9999999");
        assert!(matches!(
            decode_saft(&content),
            Err(DecodeError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_huge_extents_checked_before_allocation() {
        let mut content = fixture(1, 1, 2, false);
        set(&mut content, "scan_xpoints", "9999999");
        set(&mut content, "scan_ypoints", "9999999");
        match decode_saft(&content) {
            Err(DecodeError::DimensionMismatch { expected, actual, .. }) => {
                assert_eq!(expected, 9999999 * 9999999 * 34);
                assert_eq!(actual, 34);
            }
            other => panic!("unexpected result {:?}", other.map(|a| a.shape().to_vec())),
        }
    }

    #[test]
    fn test_frequency_domain_rejected() {
        let mut content = fixture(1, 1, 2, false);
        set(&mut content, "data_domain", "1");
        assert!(matches!(
            decode_saft(&content),
            Err(DecodeError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            decode_saft(&[0u8; 100]),
            Err(DecodeError::MalformedHeader { .. })
        ));
    }
}
