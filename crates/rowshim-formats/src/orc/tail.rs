//! ORC file tail patching.
//!
//! The `orc-rust` writer always emits an empty user metadata list. Once it
//! has closed a file, [`append_user_metadata`] extends the footer with
//! extra entries and rewrites the postscript to the new footer length.
//!
//! The writer never compresses the tail, so the footer is a plain protobuf
//! message, and repeated fields appended to an encoded message merge into
//! the existing list. Only the messages needed for that are declared here.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use prost::Message;

use crate::error::{FormatError, FormatResult};
use crate::metadata::UserMetadata;

const FORMAT: &str = "orc";

/// `CompressionKind::NONE`.
const COMPRESSION_NONE: i32 = 0;

/// The ORC `PostScript`, complete so re-encoding keeps every field.
#[derive(Clone, PartialEq, Message)]
struct PostScriptLite {
    #[prost(uint64, optional, tag = "1")]
    footer_length: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    compression: Option<i32>,
    #[prost(uint64, optional, tag = "3")]
    compression_block_size: Option<u64>,
    #[prost(uint32, repeated, tag = "4")]
    version: Vec<u32>,
    #[prost(uint64, optional, tag = "5")]
    metadata_length: Option<u64>,
    #[prost(uint32, optional, tag = "6")]
    writer_version: Option<u32>,
    #[prost(uint64, optional, tag = "7")]
    stripe_statistics_length: Option<u64>,
    #[prost(string, optional, tag = "8000")]
    magic: Option<String>,
}

/// The `metadata` list of the ORC `Footer`, alone.
#[derive(Clone, PartialEq, Message)]
struct FooterMetadataLite {
    #[prost(message, repeated, tag = "5")]
    metadata: Vec<UserMetadataItemLite>,
}

#[derive(Clone, PartialEq, Message)]
struct UserMetadataItemLite {
    #[prost(string, optional, tag = "1")]
    name: Option<String>,
    #[prost(bytes = "vec", optional, tag = "2")]
    value: Option<Vec<u8>>,
}

/// Appends `entries` to the footer user metadata of the closed ORC file at
/// `path`. Stripes are left untouched.
///
/// # Errors
///
/// Returns I/O errors, or [`FormatError::Native`] when the tail is
/// malformed, compressed, or would outgrow the one-byte postscript length.
pub(crate) fn append_user_metadata(path: &Path, entries: &UserMetadata) -> FormatResult<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let (tail_start, mut postscript) = read_postscript(&mut file)?;
    if postscript.compression.unwrap_or(COMPRESSION_NONE) != COMPRESSION_NONE {
        return Err(FormatError::native(FORMAT, "cannot extend a compressed footer"));
    }
    let footer_length = postscript
        .footer_length
        .ok_or_else(|| FormatError::native(FORMAT, "postscript has no footer length"))?;

    let appended = FooterMetadataLite {
        metadata: entries
            .iter()
            .map(|(name, value)| UserMetadataItemLite {
                name: Some(name.clone()),
                value: Some(value.clone()),
            })
            .collect(),
    }
    .encode_to_vec();
    postscript.footer_length = Some(footer_length + appended.len() as u64);
    let encoded = postscript.encode_to_vec();
    let postscript_len = u8::try_from(encoded.len())
        .map_err(|_| FormatError::native(FORMAT, "postscript exceeds 255 bytes"))?;

    file.set_len(tail_start)?;
    file.seek(SeekFrom::Start(tail_start))?;
    file.write_all(&appended)?;
    file.write_all(&encoded)?;
    file.write_all(&[postscript_len])?;
    file.sync_all()?;
    Ok(())
}

/// Reads the postscript, returning it with its starting offset.
fn read_postscript(file: &mut File) -> FormatResult<(u64, PostScriptLite)> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Err(FormatError::native(FORMAT, "empty file"));
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    let postscript_len = u64::from(last[0]);
    let start = (len - 1)
        .checked_sub(postscript_len)
        .ok_or_else(|| FormatError::native(FORMAT, "postscript longer than file"))?;

    file.seek(SeekFrom::Start(start))?;
    let mut buf = vec![0_u8; usize::from(last[0])];
    file.read_exact(&mut buf)?;
    let postscript =
        PostScriptLite::decode(buf.as_slice()).map_err(|e| FormatError::native(FORMAT, e))?;
    Ok((start, postscript))
}
