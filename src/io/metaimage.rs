use crate::core::volume::VolumeGrid;
use crate::types::{Extents, Geometry, VolumeError, VolumeResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const ELEMENT_DATA_FILE: &str = "ElementDataFile";

/// Where the voxel data of a MetaImage lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataFile {
    /// Inline, directly after the header (`.mha`)
    Local,
    /// Separate file, relative to the header's directory (`.mhd`)
    External(PathBuf),
}

/// Parsed MetaImage header
#[derive(Debug, Clone, PartialEq)]
pub struct MetaImageHeader {
    pub extents: Extents,
    pub geometry: Geometry,
    pub compressed: bool,
    pub compressed_size: Option<usize>,
    /// Bytes to skip in an external data file; `None` means the data is at its end
    pub header_size: Option<usize>,
    pub data_file: DataFile,
}

impl MetaImageHeader {
    /// Parse the `Key = Value` lines of a header
    ///
    /// Only single-channel `MET_UCHAR` images with two or three dimensions
    /// are accepted; a 2-D image becomes a volume with one slice.
    pub fn parse(text: &str) -> VolumeResult<Self> {
        let mut dims: Option<Vec<usize>> = None;
        let mut ndims: Option<usize> = None;
        let mut spacing: Option<Vec<f64>> = None;
        let mut origin: Option<Vec<f64>> = None;
        let mut element_type: Option<String> = None;
        let mut compressed = false;
        let mut compressed_size = None;
        let mut header_size = Some(0);
        let mut data_file = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                VolumeError::InvalidFormat(format!("Malformed MetaImage header line: '{}'", line))
            })?;
            let (key, value) = (key.trim(), value.trim());

            match key.to_ascii_lowercase().as_str() {
                "objecttype" if !value.eq_ignore_ascii_case("image") => {
                    return Err(VolumeError::InvalidFormat(format!(
                        "Unsupported MetaImage object type: {}",
                        value
                    )));
                }
                "ndims" => ndims = Some(parse_number(key, value)?),
                "dimsize" => dims = Some(parse_list(key, value)?),
                "elementspacing" => spacing = Some(parse_list(key, value)?),
                "elementsize" if spacing.is_none() => spacing = Some(parse_list(key, value)?),
                "offset" | "origin" | "position" => origin = Some(parse_list(key, value)?),
                "elementtype" => element_type = Some(value.to_string()),
                "elementnumberofchannels" => {
                    let channels: usize = parse_number(key, value)?;
                    if channels != 1 {
                        return Err(VolumeError::InvalidFormat(format!(
                            "Only single-channel volumes are supported, got {} channels",
                            channels
                        )));
                    }
                }
                "binarydata" if !is_true(value) => {
                    return Err(VolumeError::InvalidFormat(
                        "ASCII MetaImage data is not supported".to_string(),
                    ));
                }
                "compresseddata" => compressed = is_true(value),
                "compresseddatasize" => compressed_size = Some(parse_number(key, value)?),
                "headersize" => {
                    let size: i64 = parse_number(key, value)?;
                    header_size = usize::try_from(size).ok();
                }
                "elementdatafile" => {
                    data_file = Some(if value.eq_ignore_ascii_case("LOCAL") {
                        DataFile::Local
                    } else {
                        DataFile::External(PathBuf::from(value))
                    });
                    break;
                }
                _ => log::debug!("Ignoring MetaImage key {}", key),
            }
        }

        let dims = dims.ok_or_else(|| VolumeError::InvalidFormat("Missing DimSize".to_string()))?;
        let ndims = ndims.unwrap_or(dims.len());
        if ndims != dims.len() || !(2..=3).contains(&ndims) {
            return Err(VolumeError::InvalidFormat(format!(
                "Expected a 2-D or 3-D image, got NDims = {} with DimSize {:?}",
                ndims, dims
            )));
        }

        match element_type.as_deref() {
            Some("MET_UCHAR") => {}
            Some(other) => {
                return Err(VolumeError::InvalidFormat(format!(
                    "Unsupported element type {}, expected MET_UCHAR",
                    other
                )))
            }
            None => return Err(VolumeError::InvalidFormat("Missing ElementType".to_string())),
        }

        let data_file =
            data_file.ok_or_else(|| VolumeError::InvalidFormat("Missing ElementDataFile".to_string()))?;

        let extents = Extents::new(dims[0], dims[1], dims.get(2).copied().unwrap_or(1));
        match extents.checked_len() {
            None => {
                return Err(VolumeError::InvalidFormat(format!(
                    "Volume extents {} overflow the addressable voxel count",
                    extents
                )))
            }
            Some(0) => {
                return Err(VolumeError::InvalidFormat(format!(
                    "Volume extents must be positive, got {}",
                    extents
                )))
            }
            Some(_) => {}
        }

        Ok(Self {
            extents,
            geometry: Geometry {
                spacing: to_triple(spacing, 1.0),
                origin: to_triple(origin, 0.0),
            },
            compressed,
            compressed_size,
            header_size,
            data_file,
        })
    }
}

/// MetaImage volume reader
pub struct MetaImageReader;

impl MetaImageReader {
    /// Read a `.mha` or `.mhd` volume
    pub fn read<P: AsRef<Path>>(path: P) -> VolumeResult<VolumeGrid> {
        let path = path.as_ref();
        log::info!("Reading MetaImage volume from: {}", path.display());

        let bytes = std::fs::read(path)?;
        let header_end = find_header_end(&bytes).ok_or_else(|| {
            VolumeError::InvalidFormat(format!("No ElementDataFile entry in {}", path.display()))
        })?;
        let header = MetaImageHeader::parse(&String::from_utf8_lossy(&bytes[..header_end]))?;
        log::debug!("MetaImage header: {:?}", header);

        let payload = match &header.data_file {
            DataFile::Local => bytes[header_end..].to_vec(),
            DataFile::External(name) => {
                let data_path = path.parent().map(|dir| dir.join(name)).unwrap_or_else(|| name.clone());
                log::debug!("Reading voxel data from: {}", data_path.display());
                std::fs::read(&data_path)?
            }
        };

        let samples = Self::decode_payload(&header, payload)?;
        let grid = VolumeGrid::from_shape_vec(header.extents, samples)?.with_geometry(header.geometry);

        log::info!("Loaded {} volume", grid.extents());
        Ok(grid)
    }

    fn decode_payload(header: &MetaImageHeader, payload: Vec<u8>) -> VolumeResult<Vec<u8>> {
        let expected = header.extents.len();

        let samples = if header.compressed {
            let compressed = match header.compressed_size {
                Some(size) if size <= payload.len() => &payload[..size],
                _ => &payload[..],
            };
            // One byte past the volume is enough to detect oversized data
            let mut samples = Vec::new();
            ZlibDecoder::new(compressed)
                .take(expected as u64 + 1)
                .read_to_end(&mut samples)
                .map_err(|e| VolumeError::InvalidFormat(format!("Failed to inflate voxel data: {}", e)))?;
            samples
        } else {
            let start = match (&header.data_file, header.header_size) {
                (DataFile::External(_), None) => payload.len().saturating_sub(expected),
                (DataFile::External(_), Some(skip)) => skip,
                (DataFile::Local, _) => 0,
            };
            payload.get(start..).map(|s| s.to_vec()).unwrap_or_default()
        };

        if samples.len() < expected {
            return Err(VolumeError::InvalidFormat(format!(
                "Voxel data holds {} bytes, {} volume needs {}",
                samples.len(),
                header.extents,
                expected
            )));
        }

        let mut samples = samples;
        samples.truncate(expected);
        Ok(samples)
    }
}

/// MetaImage volume writer
#[derive(Debug, Clone, Default)]
pub struct MetaImageWriter {
    compress: bool,
}

impl MetaImageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store voxel data zlib-compressed
    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Write `grid` to `path`
    ///
    /// A `.mhd` path gets its data in a sibling `.raw` (or `.zraw`) file;
    /// any other extension is written as a single `.mha`-style file.
    pub fn write<P: AsRef<Path>>(&self, path: P, grid: &VolumeGrid) -> VolumeResult<()> {
        let path = path.as_ref();
        log::info!("Writing {} MetaImage volume to: {}", grid.extents(), path.display());

        let payload = self.encode_payload(grid)?;
        let detached = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mhd"))
            .unwrap_or(false);

        let data_name = if detached {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "volume".to_string());
            Some(format!("{}.{}", stem, if self.compress { "zraw" } else { "raw" }))
        } else {
            None
        };

        let header = self.header_text(grid, payload.len(), data_name.as_deref());

        match data_name {
            Some(name) => {
                let data_path = path.parent().map(|dir| dir.join(&name)).unwrap_or_else(|| PathBuf::from(&name));
                std::fs::write(&data_path, &payload)?;
                std::fs::write(path, header.as_bytes())?;
            }
            None => {
                let mut bytes = header.into_bytes();
                bytes.extend_from_slice(&payload);
                std::fs::write(path, bytes)?;
            }
        }

        Ok(())
    }

    fn encode_payload(&self, grid: &VolumeGrid) -> VolumeResult<Vec<u8>> {
        let samples = grid.to_vec();
        if !self.compress {
            return Ok(samples);
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&samples)?;
        Ok(encoder.finish()?)
    }

    fn header_text(&self, grid: &VolumeGrid, payload_len: usize, data_name: Option<&str>) -> String {
        let extents = grid.extents();
        let geometry = grid.geometry();
        let mut lines = vec![
            "ObjectType = Image".to_string(),
            "NDims = 3".to_string(),
            "BinaryData = True".to_string(),
            "BinaryDataByteOrderMSB = False".to_string(),
            format!("CompressedData = {}", if self.compress { "True" } else { "False" }),
        ];
        if self.compress {
            lines.push(format!("CompressedDataSize = {}", payload_len));
        }
        lines.extend([
            "TransformMatrix = 1 0 0 0 1 0 0 0 1".to_string(),
            format!("Offset = {} {} {}", geometry.origin[0], geometry.origin[1], geometry.origin[2]),
            format!(
                "ElementSpacing = {} {} {}",
                geometry.spacing[0], geometry.spacing[1], geometry.spacing[2]
            ),
            format!("DimSize = {} {} {}", extents.x, extents.y, extents.z),
            "ElementType = MET_UCHAR".to_string(),
            format!("{} = {}", ELEMENT_DATA_FILE, data_name.unwrap_or("LOCAL")),
        ]);

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

/// Byte offset just past the `ElementDataFile` line
fn find_header_end(bytes: &[u8]) -> Option<usize> {
    let mut start = 0;
    while start < bytes.len() {
        let end = bytes[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| start + p + 1)
            .unwrap_or(bytes.len());
        let line = String::from_utf8_lossy(&bytes[start..end]);
        let key = line.split('=').next().unwrap_or_default().trim();
        if key.eq_ignore_ascii_case(ELEMENT_DATA_FILE) {
            return Some(end);
        }
        start = end;
    }
    None
}

fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> VolumeResult<T> {
    value
        .parse()
        .map_err(|_| VolumeError::InvalidFormat(format!("Invalid value for {}: '{}'", key, value)))
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> VolumeResult<Vec<T>> {
    value.split_whitespace().map(|v| parse_number(key, v)).collect()
}

fn to_triple(values: Option<Vec<f64>>, fill: f64) -> [f64; 3] {
    let mut triple = [fill; 3];
    for (slot, v) in triple.iter_mut().zip(values.unwrap_or_default()) {
        *slot = v;
    }
    triple
}
