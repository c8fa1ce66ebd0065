use netcdf_sys::{nc_type, NC_MAX_NAME};

use crate::error;

/// Buffer large enough for any name libnetcdf hands out
pub(crate) type NameBuffer = [u8; NC_MAX_NAME as usize + 1];

/// Takes the process wide libnetcdf lock. libnetcdf (and non-threadsafe
/// hdf5 builds below it) keeps global state, so every call goes through here
pub(crate) fn lock() -> parking_lot::ReentrantMutexGuard<'static, ()> {
    netcdf_sys::libnetcdf_lock.lock()
}

/// All native calls should be wrapped in this locker
pub(crate) fn with_lock<F: FnOnce() -> nc_type>(f: F) -> nc_type {
    let _l = lock();
    f()
}

/// Validates a user supplied name and copies it into a nul-terminated
/// buffer, avoiding the allocation of a `CString`
pub(crate) fn short_name_to_bytes(name: &str) -> error::Result<NameBuffer> {
    if name.is_empty() {
        return Err(error::Error::validation("Expected a non-empty name"));
    }
    if name.len() > NC_MAX_NAME as usize {
        return Err(error::Error::validation(format!(
            "Name \"{name}\" is longer than {NC_MAX_NAME} bytes"
        )));
    }
    if name.bytes().any(|b| b == 0) {
        return Err(error::Error::validation(format!(
            "Name \"{}\" contains a nul byte",
            name.escape_default()
        )));
    }
    let mut bytes = [0_u8; NC_MAX_NAME as usize + 1];
    bytes[..name.len()].copy_from_slice(name.as_bytes());
    Ok(bytes)
}

/// Reads a nul-terminated name written by libnetcdf
pub(crate) fn name_from_bytes(buf: &[u8]) -> error::Result<String> {
    let zeropos = buf.iter().position(|&x| x == 0).unwrap_or(buf.len());
    Ok(std::str::from_utf8(&buf[..zeropos])?.to_owned())
}

#[cfg(unix)]
pub(crate) fn get_ffi_from_path(path: &std::path::Path) -> error::Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    let bytes = path.as_os_str().as_bytes();
    if bytes.contains(&0) {
        return Err(error::Error::validation("Path contains a nul byte"));
    }
    let mut bytes = bytes.to_vec();
    bytes.push(0);
    Ok(bytes)
}

#[cfg(not(unix))]
pub(crate) fn get_ffi_from_path(path: &std::path::Path) -> error::Result<Vec<u8>> {
    let path = path
        .to_str()
        .ok_or_else(|| error::Error::validation("Path is not valid unicode"))?;
    Ok(std::ffi::CString::new(path)?.into_bytes_with_nul())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_validated() {
        assert!(short_name_to_bytes("").is_err());
        assert!(short_name_to_bytes("a\0b").is_err());
        assert!(short_name_to_bytes(&"x".repeat(NC_MAX_NAME as usize + 1)).is_err());

        let buf = short_name_to_bytes("recNum").unwrap();
        assert_eq!(name_from_bytes(&buf).unwrap(), "recNum");
    }

    #[test]
    fn lock_is_reentrant() {
        let _outer = lock();
        let _inner = lock();
        let status = with_lock(|| netcdf_sys::NC_NOERR);
        assert_eq!(status, netcdf_sys::NC_NOERR);
    }
}
