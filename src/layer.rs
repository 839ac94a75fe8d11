use crate::error::{IndexError, LayerDecodeError};
use crate::gid::TileId;
use crate::properties::PropertyTable;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use std::str::FromStr;

/// `<data encoding>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// No attribute: one `<tile gid>` element per cell
    Xml,
    Csv,
    Base64,
}

impl FromStr for Encoding {
    type Err = LayerDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Encoding::Csv),
            "base64" => Ok(Encoding::Base64),
            other => Err(LayerDecodeError::UnsupportedEncoding(other.to_owned())),
        }
    }
}

/// `<data compression>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
    Gzip,
}

impl FromStr for Compression {
    type Err = LayerDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zlib" => Ok(Compression::Zlib),
            "gzip" => Ok(Compression::Gzip),
            other => Err(LayerDecodeError::UnsupportedCompression(other.to_owned())),
        }
    }
}

/// Dense row-major grid of raw GIDs for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGrid {
    width: u32,
    height: u32,
    gids: Vec<TileId>,
}

impl LayerGrid {
    /// Wraps already-decoded GIDs, checking the count.
    pub fn from_gids(width: u32, height: u32, gids: Vec<u32>) -> Result<Self, LayerDecodeError> {
        let expected = cell_count(width, height);
        if gids.len() != expected {
            return Err(LayerDecodeError::TileCount {
                expected,
                found: gids.len(),
            });
        }
        Ok(LayerGrid {
            width,
            height,
            gids: gids.into_iter().map(TileId).collect(),
        })
    }

    /// Decodes a text payload (the body of `<data>`).
    pub fn decode(
        width: u32,
        height: u32,
        encoding: Encoding,
        compression: Compression,
        payload: &str,
    ) -> Result<Self, LayerDecodeError> {
        match (encoding, compression) {
            (Encoding::Base64, compression) => {
                let bytes = decode_base64(payload)?;
                let bytes = inflate(bytes, compression)?;
                Self::from_le_bytes(width, height, &bytes)
            }
            (Encoding::Csv, Compression::None) => Self::from_gids(width, height, parse_csv(payload)?),
            (Encoding::Xml, Compression::None) => Err(LayerDecodeError::UnsupportedEncoding(
                "xml payloads are decoded from <tile> elements".into(),
            )),
            (_, Compression::Zlib) => Err(LayerDecodeError::CompressionWithoutBase64("zlib".into())),
            (_, Compression::Gzip) => Err(LayerDecodeError::CompressionWithoutBase64("gzip".into())),
        }
    }

    /// Reinterprets `bytes` as little-endian u32 GIDs; needs exactly 4 * w * h bytes.
    pub fn from_le_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self, LayerDecodeError> {
        const BYTE_SIZE: usize = std::mem::size_of::<u32>();
        let expected = cell_count(width, height) * BYTE_SIZE;
        if bytes.len() != expected {
            return Err(LayerDecodeError::ByteCount {
                expected,
                found: bytes.len(),
            });
        }

        let gids = bytes
            .chunks_exact(BYTE_SIZE)
            .map(|c| TileId(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect();
        Ok(LayerGrid { width, height, gids })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw GID at `(col, row)`.
    pub fn get(&self, col: u32, row: u32) -> Result<TileId, IndexError> {
        if col >= self.width || row >= self.height {
            return Err(IndexError {
                col,
                row,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.gids[row as usize * self.width as usize + col as usize])
    }

    /// Non-empty cells in row-major order as `(col, row, gid)`.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, u32, TileId)> + '_ {
        let w = self.width.max(1) as usize;
        self.gids
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.is_empty())
            .map(move |(i, id)| ((i % w) as u32, (i / w) as u32, *id))
    }
}

fn cell_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, LayerDecodeError> {
    // Tiled wraps the payload in indentation and newlines.
    let compact: String = payload.split_ascii_whitespace().collect();
    Ok(STANDARD.decode(compact)?)
}

fn inflate(bytes: Vec<u8>, compression: Compression) -> Result<Vec<u8>, LayerDecodeError> {
    let mut out = Vec::new();
    match compression {
        Compression::None => return Ok(bytes),
        Compression::Zlib => ZlibDecoder::new(&bytes[..]).read_to_end(&mut out),
        Compression::Gzip => GzDecoder::new(&bytes[..]).read_to_end(&mut out),
    }
    .map_err(LayerDecodeError::Decompress)?;
    Ok(out)
}

/// Comma separated GIDs. Rows may end with one trailing comma, as Tiled
/// writes them; any other empty field is an error.
fn parse_csv(payload: &str) -> Result<Vec<u32>, LayerDecodeError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(Vec::new());
    }

    let mut gids = Vec::new();
    for line in payload.lines() {
        let line = line.trim();
        let line = line.strip_suffix(',').unwrap_or(line);
        for field in line.split(',').map(str::trim) {
            gids.push(
                field
                    .parse::<u32>()
                    .map_err(|_| LayerDecodeError::InvalidGid(field.to_owned()))?,
            );
        }
    }
    Ok(gids)
}

/// A `<layer>`: a full-map grid of GIDs drawn in definition order.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub opacity: f32,
    pub visible: bool,
    pub properties: PropertyTable,
    pub grid: LayerGrid,
}

impl Layer {
    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }
}
