//! Wire encoding of measurements

pub mod codec;

pub use codec::{CodecError, MeasurementCodec, WirePosition, WireRange, WireRecord};
