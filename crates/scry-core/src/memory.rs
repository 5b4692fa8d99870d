//! Typed memory reads and writes
//!
//! Converts between wire scalars and little-endian byte images for every
//! primitive type the reader/writer operations support. Byte spans cross
//! the wire hex-encoded; strings are NUL-terminated UTF-8.

use crate::host::MemoryAccess;
use scry_common::{Error, PrimType, Result, Value};

/// Default length for untyped byte reads.
pub const DEFAULT_BYTES_LEN: usize = 8;

/// Cap on NUL-terminated string reads.
const MAX_STRING_LEN: usize = 4096;

/// Chunk size for incremental string reads.
const STRING_CHUNK: usize = 64;

/// Read one typed value from memory.
///
/// `len` applies to `Bytes` (defaults to [`DEFAULT_BYTES_LEN`]) and caps
/// `String` reads; fixed-width types ignore it.
pub fn read_typed(
    mem: &dyn MemoryAccess,
    ty: PrimType,
    addr: usize,
    len: Option<usize>,
) -> Result<Value> {
    match ty {
        PrimType::Byte => Ok(Value::UInt(read_array::<1>(mem, addr)?[0] as u64)),
        PrimType::Short => Ok(Value::Int(
            i16::from_le_bytes(read_array(mem, addr)?) as i64
        )),
        PrimType::UShort => Ok(Value::UInt(
            u16::from_le_bytes(read_array(mem, addr)?) as u64
        )),
        PrimType::Int => Ok(Value::Int(i32::from_le_bytes(read_array(mem, addr)?) as i64)),
        PrimType::UInt => Ok(Value::UInt(
            u32::from_le_bytes(read_array(mem, addr)?) as u64
        )),
        PrimType::Long => Ok(Value::Int(i64::from_le_bytes(read_array(mem, addr)?))),
        PrimType::ULong => Ok(Value::UInt(u64::from_le_bytes(read_array(mem, addr)?))),
        PrimType::Float => Ok(Value::Float(
            f32::from_le_bytes(read_array(mem, addr)?) as f64
        )),
        PrimType::Double => Ok(Value::Float(f64::from_le_bytes(read_array(mem, addr)?))),
        PrimType::String => read_string(mem, addr, len.unwrap_or(MAX_STRING_LEN)),
        PrimType::Bytes => {
            let data = mem.read(addr, len.unwrap_or(DEFAULT_BYTES_LEN))?;
            Ok(Value::Str(hex::encode(data)))
        }
    }
}

/// Write one typed value to memory.
pub fn write_typed(mem: &dyn MemoryAccess, ty: PrimType, addr: usize, value: &Value) -> Result<()> {
    let bytes = value_to_bytes(ty, value)?;
    mem.write(addr, &bytes)
}

/// Encode a wire scalar as the little-endian byte image of a primitive type.
///
/// Numeric types parse from the scalar's string representation, so a
/// controller may send either a JSON number or a decimal string.
pub fn value_to_bytes(ty: PrimType, value: &Value) -> Result<Vec<u8>> {
    let text = value.to_string();
    match ty {
        PrimType::Byte => Ok(parse_num::<u8>(&text)?.to_le_bytes().to_vec()),
        PrimType::Short => Ok(parse_num::<i16>(&text)?.to_le_bytes().to_vec()),
        PrimType::UShort => Ok(parse_num::<u16>(&text)?.to_le_bytes().to_vec()),
        PrimType::Int => Ok(parse_num::<i32>(&text)?.to_le_bytes().to_vec()),
        PrimType::UInt => Ok(parse_num::<u32>(&text)?.to_le_bytes().to_vec()),
        PrimType::Long => Ok(parse_num::<i64>(&text)?.to_le_bytes().to_vec()),
        PrimType::ULong => Ok(parse_num::<u64>(&text)?.to_le_bytes().to_vec()),
        PrimType::Float => Ok(parse_num::<f32>(&text)?.to_le_bytes().to_vec()),
        PrimType::Double => Ok(parse_num::<f64>(&text)?.to_le_bytes().to_vec()),
        PrimType::String => {
            let mut bytes = text.into_bytes();
            bytes.push(0);
            Ok(bytes)
        }
        PrimType::Bytes => {
            // Accept "488b05" as well as "48 8b 05"
            let compact: String = text.split_whitespace().collect();
            hex::decode(&compact)
                .map_err(|e| Error::InvalidArgument(format!("Invalid hex bytes: {}", e)))
        }
    }
}

fn parse_num<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!(
            "Invalid {} value: {}",
            std::any::type_name::<T>(),
            text
        ))
    })
}

fn read_array<const N: usize>(mem: &dyn MemoryAccess, addr: usize) -> Result<[u8; N]> {
    let data = mem.read(addr, N)?;
    data.try_into().map_err(|_| Error::MemoryAccess {
        address: addr,
        message: format!("short read, expected {} bytes", N),
    })
}

/// Read a NUL-terminated UTF-8 string in chunks.
///
/// Stops at the terminator, the cap, or the first unreadable chunk after at
/// least one successful read - strings frequently sit near the end of a
/// mapping.
fn read_string(mem: &dyn MemoryAccess, addr: usize, cap: usize) -> Result<Value> {
    let cap = cap.min(MAX_STRING_LEN);
    let mut collected: Vec<u8> = Vec::new();

    while collected.len() < cap {
        let want = STRING_CHUNK.min(cap - collected.len());
        let chunk = match mem.read(addr + collected.len(), want) {
            Ok(c) => c,
            Err(e) if collected.is_empty() => return Err(e),
            Err(_) => break,
        };
        if let Some(nul) = chunk.iter().position(|&b| b == 0) {
            collected.extend_from_slice(&chunk[..nul]);
            break;
        }
        collected.extend_from_slice(&chunk);
    }

    let text = String::from_utf8(collected).map_err(|_| Error::MemoryAccess {
        address: addr,
        message: "string is not valid UTF-8".to_string(),
    })?;
    Ok(Value::Str(text))
}
