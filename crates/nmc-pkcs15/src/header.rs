use crc::{CRC_16_XMODEM, Crc};

use crate::error::Pkcs15Error;

/// Size of the header written before a key and certificate bundle.
pub const HEADER_LEN: usize = 228;
/// Identifies the creating tool, as the vendor's own CLI writes it.
pub const TOOL_NAME: &str = "NMCSecurityWizardCLI100";

const TOOL_NAME_OFFSET: usize = 8;
const TOOL_NAME_MAX: usize = 200;
const BUNDLE_LEN_OFFSET: usize = 216;
const BUNDLE_CRC_OFFSET: usize = 220;
const HEADER_CRC_OFFSET: usize = 224;

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC16/XMODEM of `data`.
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    XMODEM.checksum(data)
}

/// The checksum is stored as a signed 16-bit value widened to 32 bits.
fn sign_extended(crc: u16) -> [u8; 4] {
    i32::from(crc as i16).to_le_bytes()
}

fn put_u32(header: &mut [u8; HEADER_LEN], offset: usize, value: [u8; 4]) {
    header[offset..offset + 4].copy_from_slice(&value);
}

/// The fixed header older NMC loaders expect in front of a bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader([u8; HEADER_LEN]);

impl FileHeader {
    /// Build the header for `bundle`.
    pub fn new(bundle: &[u8]) -> Result<Self, Pkcs15Error> {
        Self::with_tool_name(TOOL_NAME, bundle)
    }

    /// Build the header for `bundle` with a custom tool name.
    pub fn with_tool_name(tool_name: &str, bundle: &[u8]) -> Result<Self, Pkcs15Error> {
        if tool_name.len() > TOOL_NAME_MAX {
            return Err(Pkcs15Error::HeaderOverflow {
                field: "tool name",
                max: TOOL_NAME_MAX,
                actual: tool_name.len(),
            });
        }
        let bundle_len = u32::try_from(bundle.len()).map_err(|_| Pkcs15Error::HeaderOverflow {
            field: "bundle",
            max: u32::MAX as usize,
            actual: bundle.len(),
        })?;

        let mut header = [0u8; HEADER_LEN];
        put_u32(&mut header, 0, 1u32.to_le_bytes());
        put_u32(&mut header, 4, 1u32.to_le_bytes());
        header[TOOL_NAME_OFFSET..TOOL_NAME_OFFSET + tool_name.len()]
            .copy_from_slice(tool_name.as_bytes());
        put_u32(&mut header, 208, 1u32.to_le_bytes());
        put_u32(&mut header, 212, 1u32.to_le_bytes());
        put_u32(&mut header, BUNDLE_LEN_OFFSET, bundle_len.to_le_bytes());
        put_u32(&mut header, BUNDLE_CRC_OFFSET, sign_extended(crc16_xmodem(bundle)));
        let header_crc = crc16_xmodem(&header[..HEADER_CRC_OFFSET]);
        put_u32(&mut header, HEADER_CRC_OFFSET, sign_extended(header_crc));

        Ok(FileHeader(header))
    }

    #[allow(missing_docs)]
    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.0
    }

    fn read_u32(&self, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.0[offset..offset + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Bundle length recorded in the header.
    pub fn bundle_len(&self) -> u32 {
        self.read_u32(BUNDLE_LEN_OFFSET)
    }

    /// Bundle checksum, with the sign extension removed.
    pub fn bundle_crc(&self) -> u16 {
        self.read_u32(BUNDLE_CRC_OFFSET) as u16
    }

    /// Header checksum, with the sign extension removed.
    pub fn header_crc(&self) -> u16 {
        self.read_u32(HEADER_CRC_OFFSET) as u16
    }

    /// Prepend the header to `bundle`.
    pub fn prepend_to(&self, bundle: &[u8]) -> Vec<u8> {
        [&self.0[..], bundle].concat()
    }
}

/// `header ++ bundle`, ready to be written to disk.
pub fn with_header(bundle: &[u8]) -> Result<Vec<u8>, Pkcs15Error> {
    Ok(FileHeader::new(bundle)?.prepend_to(bundle))
}
