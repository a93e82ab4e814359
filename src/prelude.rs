pub use crate::dprintln; // Make the macro available
pub use crate::error::{WavError, WavResult};
pub use crate::metadata::{MetadataExt, MetadataMap};
pub use anyhow::{Context, Result as R, anyhow};
pub use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use memmap2::MmapOptions;
pub use rayon::prelude::*;
pub use std::io::{Cursor, Read, Seek, SeekFrom, Write};
