pub mod kind;
pub mod codec;
pub mod envelope;
pub mod resolver;
pub mod pipeline;
pub mod error;

pub use kind::{FileKind, PointerWidth};
pub use codec::{FormatCodec, CodecError, TableCodec, MbmCodec};
pub use envelope::{Envelope, EnvelopeLayout};
pub use resolver::{ConversionRequest, Invocation, Mode, UsageError};
pub use pipeline::{ConvertOptions, Pipeline};
pub use error::EximError;
