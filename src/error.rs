use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for everything that can go wrong while loading or querying a map.
#[derive(Debug, Error)]
pub enum MapError {
    /// The `<map version>` is not `1.0`.
    #[error("unsupported map version '{0}': only version 1.0 maps are supported")]
    UnsupportedVersion(String),

    /// The `<map orientation>` is not `orthogonal`.
    #[error("unsupported map orientation '{0}': only orthogonal maps are supported")]
    UnsupportedOrientation(String),

    /// A required attribute is missing or malformed.
    #[error("malformed <{tag}>: {msg}")]
    Structure {
        /// Element the problem was found on
        tag: String,
        /// What was wrong with it
        msg: String,
    },

    /// The document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// File I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// The options could not be parsed or failed validation.
    #[error("invalid map options: {0}")]
    Options(String),

    /// Two tile sets, layers, object groups or properties share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// "tile set", "layer", "object group" or "property"
        kind: &'static str,
        /// The repeated name
        name: String,
    },

    /// Two tile sets claim the same GIDs.
    #[error("tile sets '{first}' and '{second}' have overlapping GID ranges")]
    OverlappingTileSets {
        /// Tile set with the lower `first_gid`
        first: String,
        /// Tile set whose `first_gid` falls inside `first`'s range
        second: String,
    },

    /// An external tile set was referenced but the map was not loaded from a file.
    #[error("external tile set '{0}' can only be resolved when loading from a file")]
    ExternalTileSet(String),

    /// A typed property literal did not parse.
    #[error(transparent)]
    Property(#[from] PropertyFormatError),

    /// A GID has no owning tile set.
    #[error(transparent)]
    Gid(#[from] GidResolutionError),

    /// A layer's tile data could not be decoded.
    #[error("layer '{layer}': {source}")]
    LayerDecode {
        /// Name of the offending layer
        layer: String,
        /// What went wrong
        source: LayerDecodeError,
    },

    /// A cell query was out of range.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The collection was dropped after the tile cache was built.
    #[error("{0} were discarded after the tile cache was built")]
    Discarded(&'static str),

    /// Runtime map editing is not implemented.
    #[error("{0} is not supported in this version")]
    Unsupported(&'static str),
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Options(err.to_string())
    }
}

/// A `<property>` whose declared type does not match its literal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyFormatError {
    /// The `type` attribute names something we don't know how to parse.
    #[error("property '{name}' has unsupported type '{kind}'")]
    UnsupportedType {
        /// Property name
        name: String,
        /// Declared type
        kind: String,
    },
    /// The literal is not a valid value of the declared type.
    #[error("property '{name}' of type {kind} has malformed value '{value}'")]
    Malformed {
        /// Property name
        name: String,
        /// Declared type
        kind: &'static str,
        /// Raw text
        value: String,
    },
}

/// A GID that does not belong to any tile set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GidResolutionError {
    /// No tile set has a `first_gid` at or below the GID.
    #[error("GID {gid} has no owning tile set")]
    NoTileSet {
        /// Flip-masked GID
        gid: u32,
    },
    /// The GID falls past the end of the tile set that should own it.
    #[error("GID {gid} is local tile {local} of tile set '{tile_set}', which only has {tile_count} tiles")]
    OutOfRange {
        /// Flip-masked GID
        gid: u32,
        /// Name of the closest tile set
        tile_set: String,
        /// Computed local index
        local: u32,
        /// Tiles in that set
        tile_count: u32,
    },
}

/// Malformed `<data>` payload.
#[derive(Debug, Error)]
pub enum LayerDecodeError {
    /// `encoding` attribute we can't decode
    #[error("unsupported tile data encoding '{0}'")]
    UnsupportedEncoding(String),
    /// `compression` attribute we can't decode
    #[error("unsupported tile data compression '{0}'")]
    UnsupportedCompression(String),
    /// Compression is only valid together with base64.
    #[error("compression '{0}' requires base64 encoding")]
    CompressionWithoutBase64(String),
    /// Bad base64 text
    #[error("invalid base64 tile data: {0}")]
    Base64(#[from] base64::DecodeError),
    /// zlib/gzip stream could not be inflated
    #[error("could not decompress tile data: {0}")]
    Decompress(#[source] io::Error),
    /// Binary payload is not exactly 4 * width * height bytes.
    #[error("expected {expected} bytes of tile data, found {found}")]
    ByteCount {
        /// 4 * width * height
        expected: usize,
        /// Decoded length
        found: usize,
    },
    /// CSV/XML payload does not hold exactly width * height cells.
    #[error("expected {expected} tiles, found {found}")]
    TileCount {
        /// width * height
        expected: usize,
        /// Cells actually present
        found: usize,
    },
    /// A CSV entry or `<tile gid>` is not a u32.
    #[error("invalid tile id '{0}'")]
    InvalidGid(String),
    /// The layer's size differs from the map's.
    #[error("layer is {found_w}x{found_h} but the map is {width}x{height}")]
    SizeMismatch {
        /// Map width in tiles
        width: u32,
        /// Map height in tiles
        height: u32,
        /// Layer width in tiles
        found_w: u32,
        /// Layer height in tiles
        found_h: u32,
    },
    /// The layer has no `<data>` child.
    #[error("layer has no <data> element")]
    MissingData,
}

/// Cell query outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cell ({col}, {row}) is outside the {width}x{height} grid")]
pub struct IndexError {
    /// Requested column
    pub col: u32,
    /// Requested row
    pub row: u32,
    /// Grid width
    pub width: u32,
    /// Grid height
    pub height: u32,
}
