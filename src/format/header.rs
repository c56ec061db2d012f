//! NIfTI-1 header parsing
//!
//! The header is a fixed 348-byte structure at the start of a `.nii` file (or
//! the whole of a `.hdr` file). Byte order is not declared explicitly; it is
//! recovered from the `sizeof_hdr` field, which must read as 348 in exactly
//! one of the two byte orders.
//!
//! Only the fields the volume pipeline consumes are decoded: dimensions,
//! element encoding, voxel spacing, payload offset, intensity scaling and
//! orientation.

use crate::error::{LoadReport, LoadWarning, Result, VolumeError};
use bytes::{Buf, BufMut, BytesMut};

/// Field byte offsets within the 348-byte header
mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const DIM: usize = 40;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const XYZT_UNITS: usize = 123;
    pub const DESCRIP: usize = 148;
    pub const QFORM_CODE: usize = 252;
    pub const SFORM_CODE: usize = 254;
    pub const QUATERN_B: usize = 256;
    pub const QOFFSET_X: usize = 268;
    pub const SROW_X: usize = 280;
    pub const MAGIC: usize = 344;
}

const MAGIC_SINGLE: &[u8; 4] = b"n+1\0";
const MAGIC_PAIRED: &[u8; 4] = b"ni1\0";
const DESCRIP_LEN: usize = 80;

/// Element encoding of the voxel payload
///
/// The set is closed; unknown datatype codes are read as [`ElementEncoding::Float32`]
/// with a [`LoadWarning::UnsupportedEncoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEncoding {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ElementEncoding {
    /// Get size in bytes
    pub fn size(&self) -> usize {
        match self {
            ElementEncoding::Int8 | ElementEncoding::UInt8 => 1,
            ElementEncoding::Int16 | ElementEncoding::UInt16 => 2,
            ElementEncoding::Int32 | ElementEncoding::UInt32 | ElementEncoding::Float32 => 4,
            ElementEncoding::Float64 => 8,
        }
    }

    /// Create from NIfTI datatype code
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            2 => Some(ElementEncoding::UInt8),
            4 => Some(ElementEncoding::Int16),
            8 => Some(ElementEncoding::Int32),
            16 => Some(ElementEncoding::Float32),
            64 => Some(ElementEncoding::Float64),
            256 => Some(ElementEncoding::Int8),
            512 => Some(ElementEncoding::UInt16),
            768 => Some(ElementEncoding::UInt32),
            _ => None,
        }
    }

    /// NIfTI datatype code
    pub fn code(&self) -> i16 {
        match self {
            ElementEncoding::UInt8 => 2,
            ElementEncoding::Int16 => 4,
            ElementEncoding::Int32 => 8,
            ElementEncoding::Float32 => 16,
            ElementEncoding::Float64 => 64,
            ElementEncoding::Int8 => 256,
            ElementEncoding::UInt16 => 512,
            ElementEncoding::UInt32 => 768,
        }
    }
}

/// Byte order of the header and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Where the voxel payload lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    /// Header and payload in one `.nii` file (magic `n+1`)
    SingleFile,
    /// Header in `.hdr`, payload in a sibling `.img` (magic `ni1`)
    Paired,
}

/// Orientation metadata
///
/// `affine` maps voxel indices `(i, j, k, 1)` to scanner coordinates in
/// millimetres; it holds the first three rows of the 4x4 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub qform_code: i16,
    pub sform_code: i16,
    pub affine: [[f32; 4]; 3],
}

/// Validated volume header
///
/// Dimensions are always at least 1 and spacing components always positive;
/// violating values are replaced during [`VolumeHeader::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeHeader {
    /// Grid size `[nx, ny, nz]`
    pub dimensions: [usize; 3],
    /// Voxel size in millimetres `[dx, dy, dz]`
    pub spacing: [f32; 3],
    /// Payload element encoding used for decoding
    pub encoding: ElementEncoding,
    /// Datatype code as found in the file
    pub datatype_code: i16,
    pub byte_order: ByteOrder,
    pub layout: StorageLayout,
    /// Byte offset of the payload within its file
    pub vox_offset: usize,
    /// Intensity scaling slope (0 means unscaled)
    pub scl_slope: f32,
    /// Intensity scaling intercept
    pub scl_inter: f32,
    pub orientation: Option<Orientation>,
    /// Free-text description
    pub description: String,
}

/// Reads fixed-offset fields in the byte order detected for the header
struct FieldReader<'a> {
    bytes: &'a [u8],
    byte_order: ByteOrder,
}

impl FieldReader<'_> {
    fn i16_at(&self, offset: usize) -> i16 {
        let mut buf = &self.bytes[offset..offset + 2];
        match self.byte_order {
            ByteOrder::Little => buf.get_i16_le(),
            ByteOrder::Big => buf.get_i16(),
        }
    }

    fn f32_at(&self, offset: usize) -> f32 {
        let mut buf = &self.bytes[offset..offset + 4];
        match self.byte_order {
            ByteOrder::Little => buf.get_f32_le(),
            ByteOrder::Big => buf.get_f32(),
        }
    }

    fn f32_array<const N: usize>(&self, offset: usize) -> [f32; N] {
        let mut out = [0.0f32; N];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.f32_at(offset + i * 4);
        }
        out
    }
}

impl VolumeHeader {
    /// Header size in bytes
    pub const SIZE: usize = 348;

    /// Default payload offset for single-file volumes (header + 4-byte extension flag)
    pub const DEFAULT_VOX_OFFSET: usize = 352;

    /// Create a header for an uncompressed single-file volume with unit spacing
    pub fn new(dimensions: [usize; 3], encoding: ElementEncoding) -> Self {
        VolumeHeader {
            dimensions: dimensions.map(|d| d.max(1)),
            spacing: [1.0; 3],
            encoding,
            datatype_code: encoding.code(),
            byte_order: ByteOrder::Little,
            layout: StorageLayout::SingleFile,
            vox_offset: Self::DEFAULT_VOX_OFFSET,
            scl_slope: 0.0,
            scl_inter: 0.0,
            orientation: None,
            description: String::new(),
        }
    }

    /// Set voxel spacing
    pub fn with_spacing(mut self, spacing: [f32; 3]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Set storage layout, adjusting the payload offset to match
    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self.vox_offset = match layout {
            StorageLayout::SingleFile => Self::DEFAULT_VOX_OFFSET,
            StorageLayout::Paired => 0,
        };
        self
    }

    /// Set intensity scaling
    pub fn with_scaling(mut self, slope: f32, inter: f32) -> Self {
        self.scl_slope = slope;
        self.scl_inter = inter;
        self
    }

    /// Set orientation metadata
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Total number of voxels
    pub fn num_voxels(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Expected payload size in bytes
    pub fn payload_size(&self) -> usize {
        self.num_voxels() * self.encoding.size()
    }

    /// Decode a header from a byte slice
    ///
    /// # Arguments
    /// * `buf` - Byte slice containing at least 348 bytes
    /// * `report` - Collects recoverable problems (coerced dimensions, spacing, encoding)
    ///
    /// # Returns
    /// Decoded header, or an error if the size field or magic do not match
    pub fn decode(buf: &[u8], report: &mut LoadReport) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(VolumeError::HeaderSize {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }

        let mut size_field = &buf[offsets::SIZEOF_HDR..offsets::SIZEOF_HDR + 4];
        let size_le = size_field.get_i32_le();
        let byte_order = if size_le == Self::SIZE as i32 {
            ByteOrder::Little
        } else if size_le.swap_bytes() == Self::SIZE as i32 {
            ByteOrder::Big
        } else {
            return Err(VolumeError::HeaderSize {
                expected: Self::SIZE,
                actual: size_le.max(0) as usize,
            });
        };

        let magic = &buf[offsets::MAGIC..offsets::MAGIC + 4];
        let layout = if magic == MAGIC_SINGLE {
            StorageLayout::SingleFile
        } else if magic == MAGIC_PAIRED {
            StorageLayout::Paired
        } else {
            return Err(VolumeError::InvalidMagic([
                magic[0], magic[1], magic[2], magic[3],
            ]));
        };

        let fields = FieldReader { bytes: buf, byte_order };

        let mut dim = [0i16; 8];
        for (i, value) in dim.iter_mut().enumerate() {
            *value = fields.i16_at(offsets::DIM + i * 2);
        }
        let dimensions = resolve_dimensions(&dim, report);

        let pixdim: [f32; 8] = fields.f32_array(offsets::PIXDIM);
        let spacing = resolve_spacing(&pixdim, report);

        let datatype_code = fields.i16_at(offsets::DATATYPE);
        let encoding = match ElementEncoding::from_code(datatype_code) {
            Some(encoding) => encoding,
            None => {
                report.warn(LoadWarning::UnsupportedEncoding {
                    code: datatype_code,
                });
                ElementEncoding::Float32
            }
        };

        let declared_offset = fields.f32_at(offsets::VOX_OFFSET);
        let vox_offset = match layout {
            StorageLayout::SingleFile => {
                if declared_offset.is_finite()
                    && declared_offset >= Self::DEFAULT_VOX_OFFSET as f32
                {
                    declared_offset as usize
                } else {
                    report.warn(LoadWarning::VoxOffsetAdjusted {
                        declared: declared_offset,
                        used: Self::DEFAULT_VOX_OFFSET,
                    });
                    Self::DEFAULT_VOX_OFFSET
                }
            }
            StorageLayout::Paired => {
                if declared_offset.is_finite() && declared_offset > 0.0 {
                    declared_offset as usize
                } else {
                    0
                }
            }
        };

        let orientation = decode_orientation(&fields, &pixdim, spacing);

        let descrip = &buf[offsets::DESCRIP..offsets::DESCRIP + DESCRIP_LEN];
        let description = String::from_utf8_lossy(descrip)
            .trim_end_matches('\0')
            .to_string();

        Ok(VolumeHeader {
            dimensions,
            spacing,
            encoding,
            datatype_code,
            byte_order,
            layout,
            vox_offset,
            scl_slope: fields.f32_at(offsets::SCL_SLOPE),
            scl_inter: fields.f32_at(offsets::SCL_INTER),
            orientation,
            description,
        })
    }

    /// Encode the header into a 348-byte little-endian buffer
    ///
    /// Orientation is written as an sform; the qform is left unset.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);

        buf.put_i32_le(Self::SIZE as i32);
        buf.put_bytes(0, offsets::DIM - buf.len());

        // dim[0..8]
        buf.put_i16_le(3);
        for &d in &self.dimensions {
            buf.put_i16_le(d.min(i16::MAX as usize) as i16);
        }
        for _ in 0..4 {
            buf.put_i16_le(1);
        }

        buf.put_bytes(0, offsets::DATATYPE - buf.len());
        buf.put_i16_le(self.encoding.code());
        buf.put_i16_le((self.encoding.size() * 8) as i16);

        buf.put_bytes(0, offsets::PIXDIM - buf.len());
        buf.put_f32_le(1.0); // qfac
        for &s in &self.spacing {
            buf.put_f32_le(s);
        }
        for _ in 0..4 {
            buf.put_f32_le(0.0);
        }

        buf.put_f32_le(self.vox_offset as f32);
        buf.put_f32_le(self.scl_slope);
        buf.put_f32_le(self.scl_inter);

        buf.put_bytes(0, offsets::XYZT_UNITS - buf.len());
        buf.put_u8(2); // millimetres

        buf.put_bytes(0, offsets::DESCRIP - buf.len());
        let descrip = self.description.as_bytes();
        let len = descrip.len().min(DESCRIP_LEN - 1);
        buf.put_slice(&descrip[..len]);
        buf.put_bytes(0, DESCRIP_LEN - len);

        buf.put_bytes(0, offsets::QFORM_CODE - buf.len());
        match &self.orientation {
            Some(orientation) => {
                buf.put_i16_le(0);
                buf.put_i16_le(orientation.sform_code.max(1));
                buf.put_bytes(0, offsets::SROW_X - buf.len());
                for row in &orientation.affine {
                    for &value in row {
                        buf.put_f32_le(value);
                    }
                }
            }
            None => {
                buf.put_i16_le(0);
                buf.put_i16_le(0);
            }
        }

        buf.put_bytes(0, offsets::MAGIC - buf.len());
        match self.layout {
            StorageLayout::SingleFile => buf.put_slice(MAGIC_SINGLE),
            StorageLayout::Paired => buf.put_slice(MAGIC_PAIRED),
        }

        buf.to_vec()
    }
}

/// Recover `[nx, ny, nz]` from the raw `dim` array
///
/// When `dim[0]` declares exactly three dimensions, `dim[1..=3]` are used.
/// Otherwise the first three positive entries of `dim[1..=7]` are taken.
/// Any axis left at zero or below is coerced to 1.
pub fn resolve_dimensions(dim: &[i16; 8], report: &mut LoadReport) -> [usize; 3] {
    let mut raw = [0i64; 3];

    if dim[0] == 3 {
        for (slot, &value) in raw.iter_mut().zip(&dim[1..4]) {
            *slot = value as i64;
        }
    } else {
        let positives = dim[1..].iter().filter(|&&d| d > 0).take(3);
        for (slot, &value) in raw.iter_mut().zip(positives) {
            *slot = value as i64;
        }
    }

    let mut dimensions = [1usize; 3];
    for (axis, (&value, out)) in raw.iter().zip(dimensions.iter_mut()).enumerate() {
        if value > 0 {
            *out = value as usize;
        } else {
            report.warn(LoadWarning::DimensionCoerced { axis, value });
        }
    }
    dimensions
}

/// Voxel spacing from `pixdim[1..=3]`, defaulting bad entries to 1.0
pub fn resolve_spacing(pixdim: &[f32; 8], report: &mut LoadReport) -> [f32; 3] {
    let mut spacing = [1.0f32; 3];
    for (axis, out) in spacing.iter_mut().enumerate() {
        let value = pixdim[axis + 1];
        if value.is_finite() && value > 0.0 {
            *out = value;
        } else {
            report.warn(LoadWarning::SpacingDefaulted { axis, value });
        }
    }
    spacing
}

fn decode_orientation(
    fields: &FieldReader<'_>,
    pixdim: &[f32; 8],
    spacing: [f32; 3],
) -> Option<Orientation> {
    let qform_code = fields.i16_at(offsets::QFORM_CODE);
    let sform_code = fields.i16_at(offsets::SFORM_CODE);

    let affine = if sform_code > 0 {
        let mut affine = [[0.0f32; 4]; 3];
        for (r, row) in affine.iter_mut().enumerate() {
            *row = fields.f32_array(offsets::SROW_X + r * 16);
        }
        affine
    } else if qform_code > 0 {
        let quatern: [f32; 3] = fields.f32_array(offsets::QUATERN_B);
        let qoffset: [f32; 3] = fields.f32_array(offsets::QOFFSET_X);
        let qfac = if pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        quaternion_affine(quatern, qoffset, spacing, qfac)
    } else {
        return None;
    };

    Some(Orientation {
        qform_code,
        sform_code,
        affine,
    })
}

/// Affine from the qform quaternion (b, c, d), offsets and voxel size
fn quaternion_affine(
    quatern: [f32; 3],
    qoffset: [f32; 3],
    spacing: [f32; 3],
    qfac: f32,
) -> [[f32; 4]; 3] {
    let [b, c, d] = quatern.map(f64::from);
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

    let rotation = [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - b * b - c * c,
        ],
    ];
    let scale = [
        spacing[0] as f64,
        spacing[1] as f64,
        spacing[2] as f64 * qfac as f64,
    ];

    let mut affine = [[0.0f32; 4]; 3];
    for r in 0..3 {
        for c in 0..3 {
            affine[r][c] = (rotation[r][c] * scale[c]) as f32;
        }
        affine[r][3] = qoffset[r];
    }
    affine
}
