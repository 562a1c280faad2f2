// Common decode skeleton: header -> payload -> axes -> entity

use log::debug;

use crate::error::Result;
use crate::model::Axis;

/// Steps every format reader goes through. Implementors only describe each
/// step; [`FormatDecoder::decode`] runs them in order.
pub(crate) trait FormatDecoder {
    /// Raw file content: bytes for binary formats, `str` for text formats.
    type Source: ?Sized;
    /// Typed header values the later steps need.
    type Header;
    type Output;

    const FORMAT: &'static str;

    fn parse_header(&self, source: &Self::Source) -> Result<Self::Header>;

    /// Samples in the order expected by [`FormatDecoder::assemble`].
    fn decode_payload(&self, source: &Self::Source, header: &Self::Header) -> Result<Vec<f64>>;

    /// Coordinate axes, units attached.
    fn axes(&self, header: &Self::Header) -> Result<Vec<Axis>>;

    fn assemble(&self, header: Self::Header, samples: Vec<f64>, axes: Vec<Axis>) -> Result<Self::Output>;

    /// One-line description of a parsed header for logging.
    fn describe(&self, header: &Self::Header) -> String;

    fn decode(&self, source: &Self::Source) -> Result<Self::Output> {
        let header = self.parse_header(source)?;
        debug!("{}: {}", Self::FORMAT, self.describe(&header));

        let samples = self.decode_payload(source, &header)?;
        let axes = self.axes(&header)?;
        debug!(
            "{}: decoded {} samples on axes {:?}",
            Self::FORMAT,
            samples.len(),
            axes.iter().map(|a| (a.name(), a.len())).collect::<Vec<_>>()
        );

        self.assemble(header, samples, axes)
    }
}
