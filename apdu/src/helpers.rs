// Copyright (c) 2023 The X1 Card Developers

/// Encoding helper for fixed-size array fields (pending nightly array constructors)
pub(crate) mod arr {
    use encdec::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::Length);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::Length);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Length-prefixed (single byte) value helpers
pub(crate) mod lv {
    use crate::ApduError;

    /// Write a `LEN || VALUE` field, returning the encoded length
    pub fn enc(v: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
        if v.len() > u8::MAX as usize || buff.len() < v.len() + 1 {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = v.len() as u8;
        buff[1..][..v.len()].copy_from_slice(v);

        Ok(v.len() + 1)
    }

    /// Read a `LEN || VALUE` field, returning the value and the consumed length
    pub fn dec(buff: &[u8]) -> Result<(&[u8], usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let n = buff[0] as usize;
        if buff.len() < n + 1 {
            return Err(ApduError::InvalidLength);
        }

        Ok((&buff[1..][..n], n + 1))
    }
}

/// Tag-length-value helpers for variable response payloads
pub(crate) mod tlv {
    use super::lv;
    use crate::ApduError;

    /// Write a `TAG || LEN || VALUE` field
    pub fn enc(tag: u8, v: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }
        buff[0] = tag;

        let n = lv::enc(v, &mut buff[1..])?;

        Ok(n + 1)
    }

    /// Read a `TAG || LEN || VALUE` field
    pub fn dec(buff: &[u8]) -> Result<(u8, &[u8], usize), ApduError> {
        if buff.is_empty() {
            return Err(ApduError::InvalidLength);
        }

        let (v, n) = lv::dec(&buff[1..])?;

        Ok((buff[0], v, n + 1))
    }
}
